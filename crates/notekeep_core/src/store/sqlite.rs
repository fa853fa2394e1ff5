//! SQLite-backed note store.
//!
//! # Responsibility
//! - Serve the `NoteStore` contract from a local SQLite database.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - The connection must be migrated to `latest_version()` before use.
//! - Label links are replaced in a single transaction.
//! - Listing order is `created_at ASC, id ASC`.

use super::{matches_search_words, NoteFilter, NoteFlags, NoteStore, StoreError, StoreResult};
use crate::db::migrations::ensure_latest;
use crate::model::note::{Note, Tag};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    text,
    color,
    archived,
    trashed,
    pinned
FROM notes";

/// `NoteStore` backed by one migrated SQLite connection.
pub struct SqliteNoteStore {
    conn: Connection,
}

impl SqliteNoteStore {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_latest(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts a note with a caller-chosen id and flags.
    pub fn insert_note(&self, note: &Note, flags: &NoteFlags) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO notes (id, title, text, color, archived, trashed, pinned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                note.id.as_str(),
                note.title.as_str(),
                note.text.as_str(),
                flags.color.as_deref(),
                bool_to_int(flags.archived),
                bool_to_int(flags.trashed),
                bool_to_int(flags.pinned),
            ],
        )?;
        Ok(())
    }

    /// Returns the underlying connection for read-only inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn labels_of(&self, note_id: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.name
             FROM note_labels nl
             INNER JOIN labels l ON l.id = nl.label_id
             WHERE nl.note_id = ?1
             ORDER BY l.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }
}

impl NoteStore for SqliteNoteStore {
    fn create_note(&self, title: &str, text: &str) -> StoreResult<Note> {
        let note = Note::new(Uuid::new_v4().to_string(), title, text);
        self.insert_note(&note, &NoteFlags::default())?;
        debug!("event=note_create module=store.sqlite status=ok");
        Ok(note)
    }

    fn get_note(&self, id: &str) -> StoreResult<Note> {
        let sql = format!("{NOTE_SELECT_SQL} WHERE id = ?1;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(parse_note_row(row)?.0),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn update_note(&self, note: &Note) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET title = ?2,
                 text = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![note.id.as_str(), note.title.as_str(), note.text.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(note.id.clone()));
        }
        Ok(())
    }

    fn list_notes(&self, filter: &NoteFilter) -> StoreResult<Vec<Note>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(labels) = filter.labels.as_ref() {
            if labels.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; labels.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1
                    FROM note_labels nl
                    INNER JOIN labels l ON l.id = nl.label_id
                    WHERE nl.note_id = notes.id
                      AND l.name COLLATE NOCASE IN ({placeholders})
                )"
            ));
            bind_values.extend(labels.iter().cloned().map(Value::Text));
        }
        for (column, wanted) in [
            ("archived", filter.archived),
            ("trashed", filter.trashed),
            ("pinned", filter.pinned),
        ] {
            if let Some(wanted) = wanted {
                sql.push_str(&format!(" AND {column} = ?"));
                bind_values.push(Value::Integer(bool_to_int(wanted)));
            }
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let (note, flags) = parse_note_row(row)?;
            if !flags.matches(filter) {
                continue;
            }
            if let Some(words) = filter.search_words.as_deref() {
                if !matches_search_words(&note, words) {
                    continue;
                }
            }
            notes.push(note);
        }
        Ok(notes)
    }

    fn count_all(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("invalid note count `{count}`")))
    }

    fn list_labels(&self) -> StoreResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM labels ORDER BY name COLLATE NOCASE ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?));
        }
        Ok(tags)
    }

    fn set_note_labels(&self, id: &str, names: &[String]) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        tx.execute("DELETE FROM note_labels WHERE note_id = ?1;", [id])?;
        for name in names {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                warn!("event=label_skip module=store.sqlite status=skipped reason=blank_name");
                continue;
            }
            tx.execute(
                "INSERT OR IGNORE INTO labels (id, name) VALUES (?1, ?2);",
                params![Uuid::new_v4().to_string(), trimmed],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO note_labels (note_id, label_id)
                 SELECT ?1, id
                 FROM labels
                 WHERE name = ?2 COLLATE NOCASE;",
                params![id, trimmed],
            )?;
        }

        tx.commit()?;
        debug!(
            "event=note_labels_set module=store.sqlite status=ok label_count={}",
            self.labels_of(id)?.len()
        );
        Ok(())
    }
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<(Note, NoteFlags)> {
    let note = Note::new(
        row.get::<_, String>("id")?,
        row.get::<_, String>("title")?,
        row.get::<_, String>("text")?,
    );
    let flags = NoteFlags {
        color: row.get("color")?,
        archived: int_to_bool(row.get("archived")?, "notes.archived")?,
        trashed: int_to_bool(row.get("trashed")?, "notes.trashed")?,
        pinned: int_to_bool(row.get("pinned")?, "notes.pinned")?,
    };
    Ok((note, flags))
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn int_to_bool(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteNoteStore;
    use crate::db::migrations::latest_version;
    use crate::db::{open_db_in_memory, DbError};
    use crate::model::note::Note;
    use crate::store::{NoteFilter, NoteFlags, NoteStore, StoreError};

    fn store() -> SqliteNoteStore {
        SqliteNoteStore::try_new(open_db_in_memory().expect("open memory db"))
            .expect("store should accept migrated connection")
    }

    #[test]
    fn rejects_unmigrated_connection() {
        let conn = rusqlite::Connection::open_in_memory().expect("open raw db");
        let err = SqliteNoteStore::try_new(conn)
            .err()
            .expect("unmigrated connection must fail");
        match err {
            StoreError::Db(DbError::SchemaMismatch { found, expected }) => {
                assert_eq!(found, 0);
                assert_eq!(expected, latest_version());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn create_get_update_round_trip() {
        let store = store();
        let created = store.create_note("Title", "Body").expect("create");
        let mut loaded = store.get_note(&created.id).expect("get");
        assert_eq!(loaded, created);

        loaded.title = "Renamed".to_string();
        store.update_note(&loaded).expect("update");
        assert_eq!(store.get_note(&created.id).expect("reload").title, "Renamed");
    }

    #[test]
    fn get_unknown_note_is_not_found() {
        let err = store().get_note("nope").expect_err("missing note");
        assert!(matches!(err, StoreError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn listing_applies_flag_and_label_filters() {
        let store = store();
        store
            .insert_note(&Note::new("a", "plain", ""), &NoteFlags::default())
            .expect("insert a");
        store
            .insert_note(
                &Note::new("b", "archived", ""),
                &NoteFlags {
                    archived: true,
                    ..NoteFlags::default()
                },
            )
            .expect("insert b");
        store
            .set_note_labels("b", &["Work".to_string(), "  ".to_string()])
            .expect("label b");

        let listing = store
            .list_notes(&NoteFilter::unlabeled_listing())
            .expect("list");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, "a");

        let work = store.list_notes(&NoteFilter::labeled("WORK")).expect("list");
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].id, "b");

        let labels = store.list_labels().expect("labels");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].name, "Work");
        assert_eq!(store.count_all().expect("count"), 2);
    }

    #[test]
    fn search_matches_title_or_text() {
        let store = store();
        store.create_note("Shopping", "eggs and milk").expect("create");
        store.create_note("Travel", "passport").expect("create");

        let found = store.list_notes(&NoteFilter::search("MILK")).expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Shopping");
    }
}
