//! Field-path codec: dotted/bracketed strings ⇄ structural paths.
//!
//! A path string like `"a.b[2].c"` addresses a control inside a form tree.
//! Its structural form is an ordered sequence of segments, each a property
//! name or a list index. `FieldPath::parse` and `Display` are mutual
//! inverses for well-formed strings; malformed input degrades gracefully
//! (non-digit bracket contents stay string keys) rather than failing.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One step in a structural path: a property name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Property name inside a group, e.g. `addresses` in `addresses[0].street`.
    Key(String),
    /// Position inside a list, e.g. `0` in `addresses[0].street`.
    Index(usize),
}

impl Segment {
    /// Property-name segment.
    pub fn key(name: impl Into<String>) -> Self {
        Segment::Key(name.into())
    }

    /// List-index segment.
    pub fn index(index: usize) -> Self {
        Segment::Index(index)
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Segment::Key(name.to_string())
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// A structural field path: the parsed form of `"a.b[2].c"`.
///
/// Paths are constructed on demand (from a string or from a control's
/// position in the tree) and never mutated afterwards; `child` returns a new
/// path. The string form, via `Display`, doubles as the map key used
/// throughout the validation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// The empty path, addressing the tree root.
    pub fn root() -> Self {
        FieldPath(Vec::new())
    }

    /// Parse a dotted/bracketed path string.
    ///
    /// Splits on `.`, normalizes `[n]` bracket groups into index segments,
    /// drops the empty segment a leading bracket produces, and coerces
    /// all-digit dot segments (`"a.0"`) to indices. The empty string parses
    /// to the empty path. Never fails.
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        for piece in path.split('.') {
            if piece.is_empty() {
                continue;
            }
            let mut chunks = piece.split('[');
            if let Some(head) = chunks.next()
                && !head.is_empty()
            {
                segments.push(coerce_segment(head));
            }
            for chunk in chunks {
                let inner = chunk.strip_suffix(']').unwrap_or(chunk);
                if inner.is_empty() {
                    continue;
                }
                segments.push(coerce_segment(inner));
            }
        }
        FieldPath(segments)
    }

    /// The path's segments, in order.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        FieldPath(segments)
    }
}

/// All-digit segments become indices; everything else stays a string key.
fn coerce_segment(raw: &str) -> Segment {
    if raw.bytes().all(|b| b.is_ascii_digit())
        && let Ok(index) = raw.parse::<usize>()
    {
        return Segment::Index(index);
    }
    Segment::Key(raw.to_string())
}

impl fmt::Display for FieldPath {
    /// Render the canonical string form: indices as `[n]` with no preceding
    /// dot, keys joined with `.` except before the first segment.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<Segment>> for FieldPath {
    fn from(segments: Vec<Segment>) -> Self {
        FieldPath(segments)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::parse(path)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldPath::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_path() {
        let path = FieldPath::parse("a.b.c");
        assert_eq!(
            path.segments(),
            &[Segment::key("a"), Segment::key("b"), Segment::key("c")]
        );
    }

    #[test]
    fn parses_bracket_indices() {
        let path = FieldPath::parse("a.b[2].c");
        assert_eq!(
            path.segments(),
            &[
                Segment::key("a"),
                Segment::key("b"),
                Segment::index(2),
                Segment::key("c")
            ]
        );
    }

    #[test]
    fn parses_leading_bracket() {
        let path = FieldPath::parse("[0].name");
        assert_eq!(path.segments(), &[Segment::index(0), Segment::key("name")]);
    }

    #[test]
    fn coerces_all_digit_dot_segment() {
        let path = FieldPath::parse("rows.0.id");
        assert_eq!(
            path.segments(),
            &[Segment::key("rows"), Segment::index(0), Segment::key("id")]
        );
    }

    #[test]
    fn empty_string_is_root() {
        assert!(FieldPath::parse("").is_empty());
        assert_eq!(FieldPath::parse("").to_string(), "");
    }

    #[test]
    fn malformed_bracket_stays_string() {
        let path = FieldPath::parse("a[x]");
        assert_eq!(path.segments(), &[Segment::key("a"), Segment::key("x")]);
    }

    #[test]
    fn stringify_round_trip() {
        for raw in ["a.b[2].c", "[0].name", "password", "items[10][3]", ""] {
            let path = FieldPath::parse(raw);
            assert_eq!(path.to_string(), raw, "round-trip failed for {raw:?}");
            assert_eq!(FieldPath::parse(&path.to_string()), path);
        }
    }

    #[test]
    fn child_appends_segment() {
        let base = FieldPath::parse("addresses");
        assert_eq!(base.child(1_usize).to_string(), "addresses[1]");
        assert_eq!(base.child("street").to_string(), "addresses.street");
    }

    #[test]
    fn serde_uses_string_form() {
        let path = FieldPath::parse("a.b[2]");
        let json = serde_json::to_string(&path).expect("serialize path");
        assert_eq!(json, "\"a.b[2]\"");
        let round: FieldPath = serde_json::from_str(&json).expect("deserialize path");
        assert_eq!(round, path);
    }

    #[test]
    fn overlong_digits_stay_string() {
        // Larger than usize: degrades to a string key instead of failing.
        let raw = "a.99999999999999999999999999";
        let path = FieldPath::parse(raw);
        assert_eq!(
            path.segments(),
            &[
                Segment::key("a"),
                Segment::key("99999999999999999999999999")
            ]
        );
    }
}
