//! Note schema migrations.
//!
//! # Responsibility
//! - List the note schema steps in order.
//! - Upgrade a connection to the newest step inside one transaction.
//! - Verify the schema version before a store touches the tables.
//!
//! # Invariants
//! - Step versions start at 1 and increase by one.
//! - A failed upgrade leaves `user_version` and the tables untouched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Ordered schema steps; entry `i` upgrades to version `i + 1`.
const SCHEMA_STEPS: &[&str] = &[include_str!("0001_init.sql")];

/// Newest schema version this build knows.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Upgrades the connection to `latest_version()`.
///
/// Databases written by a newer build are rejected with `SchemaMismatch`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = current_user_version(conn)?;
    let expected = latest_version();
    if found > expected {
        return Err(DbError::SchemaMismatch { found, expected });
    }

    let pending = SCHEMA_STEPS
        .iter()
        .zip(1u32..)
        .skip(found as usize)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (sql, version) in pending {
        tx.execute_batch(sql)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration { version, source })?;
        info!("event=schema_migrate module=db.migrations status=ok version={version}");
    }
    tx.commit()?;
    Ok(())
}

/// Fails with `SchemaMismatch` unless the connection is fully migrated.
pub fn ensure_latest(conn: &Connection) -> DbResult<()> {
    let found = current_user_version(conn)?;
    let expected = latest_version();
    if found != expected {
        return Err(DbError::SchemaMismatch { found, expected });
    }
    Ok(())
}

/// Schema version recorded on the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_user_version, ensure_latest, latest_version};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn upgrade_runs_once_and_records_version() {
        let mut conn = Connection::open_in_memory().expect("open memory db");
        assert!(matches!(
            ensure_latest(&conn),
            Err(DbError::SchemaMismatch { found: 0, .. })
        ));

        apply_migrations(&mut conn).expect("first upgrade");
        apply_migrations(&mut conn).expect("second upgrade is a no-op");
        assert_eq!(
            current_user_version(&conn).expect("read version"),
            latest_version()
        );
        ensure_latest(&conn).expect("schema is current");
    }

    #[test]
    fn newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().expect("open memory db");
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .expect("bump version");

        let err = apply_migrations(&mut conn).expect_err("newer schema must fail");
        assert!(matches!(err, DbError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("newer build"));
    }

    #[test]
    fn failing_step_reports_its_version_and_rolls_back() {
        let mut conn = Connection::open_in_memory().expect("open memory db");
        conn.execute_batch("CREATE TABLE notes (id TEXT);")
            .expect("conflicting table");

        let err = apply_migrations(&mut conn).expect_err("conflicting schema must fail");
        assert!(matches!(err, DbError::Migration { version: 1, .. }));
        assert_eq!(current_user_version(&conn).expect("read version"), 0);
    }
}
