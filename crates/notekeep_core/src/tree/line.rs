//! Rendered line grammar.
//!
//! Every structural line of the explorer buffer has the shape
//! `<label padded to key_col> X[<key>]` where `X` is `n` for notes and `T` for
//! tags. Headers, separators and blank lines carry no key and decode to `None`.
//! This is the only module that knows the grammar.

use once_cell::sync::Lazy;
use regex::Regex;

static STRUCTURAL_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<label>.*?)\s+(?P<kind>[nT])\[(?P<key>[^\[\]]+)\]\s*$")
        .expect("valid structural line regex")
});

/// Spaces emitted per tree depth.
pub const INDENT_WIDTH: usize = 4;

/// Kind marker written in front of a key bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Note,
    Tag,
}

impl LineKind {
    pub fn marker(self) -> char {
        match self {
            Self::Note => 'n',
            Self::Tag => 'T',
        }
    }

    fn from_marker(value: &str) -> Option<Self> {
        match value {
            "n" => Some(Self::Note),
            "T" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// One structural line split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedLine<'a> {
    pub kind: LineKind,
    /// Everything in front of the key, including indentation and padding.
    pub label: &'a str,
    pub key: &'a str,
}

impl DecodedLine<'_> {
    /// Label without indentation or padding.
    pub fn text(&self) -> &str {
        self.label.trim()
    }
}

/// Splits a buffer line into kind, label and key.
///
/// Returns `None` for decorative lines and for lines edited out of shape.
pub fn decode_line(line: &str) -> Option<DecodedLine<'_>> {
    let caps = STRUCTURAL_LINE_RE.captures(line)?;
    let kind = LineKind::from_marker(caps.name("kind")?.as_str())?;
    Some(DecodedLine {
        kind,
        label: caps.name("label")?.as_str(),
        key: caps.name("key")?.as_str(),
    })
}

/// Returns the trailing bracketed key of a structural line.
pub fn extract_key(line: &str) -> Option<&str> {
    decode_line(line).map(|decoded| decoded.key)
}

/// Formats one structural line with its key bracket starting after `key_col`.
pub fn encode_line(label: &str, key_col: usize, kind: LineKind, key: &str) -> String {
    format!("{label:<key_col$} {}[{key}]", kind.marker())
}

/// Leading whitespace for a node at `depth`.
pub fn indentation(depth: usize) -> String {
    " ".repeat(depth * INDENT_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::{decode_line, encode_line, extract_key, indentation, LineKind};

    #[test]
    fn decodes_note_line() {
        let decoded = decode_line("    Old Title          n[abc(0)]").expect("note line");
        assert_eq!(decoded.kind, LineKind::Note);
        assert_eq!(decoded.text(), "Old Title");
        assert_eq!(decoded.key, "abc(0)");
    }

    #[test]
    fn decodes_tag_line_with_glyph_and_count() {
        let decoded = decode_line("\u{25bd} Work (2)    T[t1(0)]").expect("tag line");
        assert_eq!(decoded.kind, LineKind::Tag);
        assert_eq!(decoded.text(), "\u{25bd} Work (2)");
        assert_eq!(decoded.key, "t1(0)");
    }

    #[test]
    fn ignores_decorative_and_damaged_lines() {
        assert!(decode_line("").is_none());
        assert!(decode_line("Notes:").is_none());
        assert!(decode_line("=========").is_none());
        assert!(decode_line("    Title n[abc(0)").is_none());
        assert!(decode_line("    Titlen[abc(0)]").is_none());
        assert!(decode_line("    Title x[abc(0)]").is_none());
    }

    #[test]
    fn key_is_taken_from_the_last_bracket() {
        assert_eq!(extract_key("  see [docs] here  n[k(3)]"), Some("k(3)"));
    }

    #[test]
    fn empty_title_still_decodes() {
        let line = encode_line("", 6, LineKind::Note, "k(0)");
        assert_eq!(line, "       n[k(0)]");
        let decoded = decode_line(&line).expect("padded empty label");
        assert_eq!(decoded.text(), "");
    }

    #[test]
    fn encode_pads_label_to_key_column() {
        let line = encode_line(&format!("{}Title", indentation(1)), 12, LineKind::Note, "k(0)");
        assert_eq!(line, "    Title    n[k(0)]");
        assert_eq!(decode_line(&line).expect("round trip").text(), "Title");
    }
}
