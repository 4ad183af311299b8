use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::path::Path;

use compact_str::{CompactString, ToCompactString};

use crate::error::DocumentError;

/// A half-open character range `[position, position + length)` into a
/// document.
///
/// References drawn from different documents are not comparable; the
/// relation algebra in [`crate::relation`] assumes both operands come from
/// the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Reference {
    position: u32,
    length: u32,
}

impl Reference {
    pub const fn new(position: u32, length: u32) -> Self {
        Self { position, length }
    }

    /// A reference spanning `[start, end)`.
    pub const fn between(start: u32, end: u32) -> Self {
        Self {
            position: start,
            length: end - start,
        }
    }

    /// The smallest reference covering both `a` and `b`.
    pub fn inclusive(a: Reference, b: Reference) -> Self {
        let start = a.position.min(b.position);
        let end = a.end().max(b.end());
        Self::between(start, end)
    }

    pub const fn position(&self) -> u32 {
        self.position
    }

    pub const fn length(&self) -> u32 {
        self.length
    }

    pub const fn end(&self) -> u32 {
        self.position + self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// A sub-range of this reference, clamped to its bounds.
    pub fn subreference(&self, offset: u32, length: u32) -> Reference {
        let position = self.position + offset.min(self.length);
        let available = self.end() - position;
        Reference::new(position, length.min(available))
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.position, self.end())
    }
}

/// A source of template text, identified by a stable name.
///
/// Equality and hashing go by name alone; two documents with identical
/// content but different names are distinct, and vice versa.
#[derive(Debug, Clone)]
pub enum Document {
    /// An in-memory document.
    Pseudo {
        name: CompactString,
        content: String,
    },
    /// A document backed by a file on disk. The content is read once at
    /// construction so later reads cannot fail mid-pipeline.
    File {
        path: CompactString,
        content: String,
    },
}

impl Document {
    pub fn pseudo(name: impl Into<CompactString>, content: impl Into<String>) -> Self {
        Document::Pseudo {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::NotFound {
            name: path.display().to_compact_string(),
            source,
        })?;
        Ok(Document::File {
            path: path.display().to_compact_string(),
            content,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Document::Pseudo { name, .. } => name,
            Document::File { path, .. } => path,
        }
    }

    /// The whole content of this document.
    pub fn read(&self) -> &str {
        match self {
            Document::Pseudo { content, .. } | Document::File { content, .. } => content,
        }
    }

    /// The text under `reference`, clamped to the document bounds.
    pub fn read_at(&self, reference: Reference) -> &str {
        let content = self.read();
        let start = (reference.position() as usize).min(content.len());
        let end = (reference.end() as usize).min(content.len());
        content.get(start..end).unwrap_or_default()
    }

    /// A reference covering the whole document.
    pub fn reference(&self) -> Reference {
        Reference::new(0, self.read().len() as u32)
    }

    /// The 1-based line number at `position`.
    pub fn line_at(&self, position: u32) -> u32 {
        let content = self.read();
        let position = (position as usize).min(content.len());
        content[..position].bytes().filter(|b| *b == b'\n').count() as u32 + 1
    }

    /// The 1-based column number at `position`.
    pub fn column_at(&self, position: u32) -> u32 {
        let content = self.read();
        let position = (position as usize).min(content.len());
        let line_start = content[..position].rfind('\n').map_or(0, |i| i + 1);
        content[line_start..position].chars().count() as u32 + 1
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Reference::new(0, 5), 0, 5)]
    #[case(Reference::new(3, 0), 3, 3)]
    #[case(Reference::between(2, 7), 2, 7)]
    fn test_reference_bounds(#[case] r: Reference, #[case] position: u32, #[case] end: u32) {
        assert_eq!(r.position(), position);
        assert_eq!(r.end(), end);
    }

    #[test]
    fn test_inclusive() {
        let a = Reference::new(2, 3);
        let b = Reference::new(7, 4);
        assert_eq!(Reference::inclusive(a, b), Reference::between(2, 11));
        assert_eq!(Reference::inclusive(b, a), Reference::between(2, 11));
    }

    #[test]
    fn test_subreference_clamps() {
        let r = Reference::new(10, 5);
        assert_eq!(r.subreference(2, 2), Reference::new(12, 2));
        assert_eq!(r.subreference(4, 10), Reference::new(14, 1));
        assert_eq!(r.subreference(9, 1), Reference::new(15, 0));
    }

    #[test]
    fn test_document_identity_is_by_name() {
        let a = Document::pseudo("a", "same");
        let b = Document::pseudo("b", "same");
        let a2 = Document::pseudo("a", "different");
        assert_ne!(a, b);
        assert_eq!(a, a2);
    }

    #[rstest]
    #[case(0, 1, 1)]
    #[case(6, 2, 1)]
    #[case(9, 2, 4)]
    fn test_line_column(#[case] position: u32, #[case] line: u32, #[case] column: u32) {
        let doc = Document::pseudo("d", "hello\nwords here");
        assert_eq!(doc.line_at(position), line);
        assert_eq!(doc.column_at(position), column);
    }

    #[test]
    fn test_read_at() {
        let doc = Document::pseudo("d", "hello world");
        assert_eq!(doc.read_at(Reference::new(6, 5)), "world");
        assert_eq!(doc.read_at(Reference::new(6, 100)), "world");
    }
}
