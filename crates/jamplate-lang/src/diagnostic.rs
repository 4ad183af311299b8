use std::fmt::{self, Display, Formatter};

use compact_str::CompactString;

use crate::document::{Document, Reference};

/// How serious a recorded diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One recorded `(severity, message, location)` triple.
///
/// Line and column are derived from the document at record time, so the
/// diagnostic stays printable after the compilation is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub document: CompactString,
    pub reference: Option<Reference>,
    pub line: u32,
    pub column: u32,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        document: &Document,
        reference: Option<Reference>,
    ) -> Self {
        let position = reference.map(|r| r.position()).unwrap_or(0);
        Self {
            severity,
            message: message.into(),
            document: document.name().into(),
            reference,
            line: document.line_at(position),
            column: document.column_at(position),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.document, self.line, self.column, self.severity, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_is_derived_at_record_time() {
        let doc = Document::pseudo("main.jp", "first\nsecond line");
        let d = Diagnostic::new(
            Severity::Error,
            "unexpected token",
            &doc,
            Some(Reference::new(13, 4)),
        );
        assert_eq!(d.line, 2);
        assert_eq!(d.column, 8);
        assert_eq!(
            d.to_string(),
            "main.jp:2:8: error: unexpected token"
        );
    }
}
