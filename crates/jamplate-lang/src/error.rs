use compact_str::CompactString;
use miette::SourceSpan;

use crate::document::{Document, Reference};

/// Malformed range inputs to the relation algebra.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelationError {
    #[error("invalid range: [{i}, {j}) vs [{s}, {e})")]
    InvalidRange { i: u32, j: u32, s: u32, e: u32 },
}

/// I/O failure while reading a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document \"{name}\" is not available for reading")]
    NotFound {
        name: CompactString,
        #[source]
        source: std::io::Error,
    },
}

/// An attempted tree placement that violates the structure contract.
///
/// Every failure leaves the tree unchanged.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    /// The offered tree does not fit in any ancestor.
    #[error("{context}: {host} does not enclose {tree}")]
    OutOfBounds {
        context: &'static str,
        host: Reference,
        tree: Reference,
    },
    /// The offered tree coincides with a placed tree of equal weight.
    #[error("{context}: {host} is already occupied at weight {weight}")]
    Takeover {
        context: &'static str,
        host: Reference,
        weight: i32,
    },
    /// The offered tree partially overlaps a placed tree.
    #[error("{context}: {host} clashes with {tree}")]
    Clash {
        context: &'static str,
        host: Reference,
        tree: Reference,
    },
    /// The placement request itself was inconsistent.
    #[error("{context}: {host} cannot relate to {tree}")]
    Illegal {
        context: &'static str,
        host: Reference,
        tree: Reference,
    },
}

/// A parser produced a tree that could not be placed. The drivers swallow
/// this as "no progress"; it surfaces only in logs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("cannot place parsed tree at {reference}: {cause}")]
pub struct ParseError {
    pub reference: Reference,
    #[source]
    pub cause: TreeError,
}

/// A compiler could not produce an instruction for a required component.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub document: CompactString,
    pub reference: Reference,
}

impl CompileError {
    pub fn new(
        message: impl Into<String>,
        document: impl Into<CompactString>,
        reference: Reference,
    ) -> Self {
        Self {
            message: message.into(),
            document: document.into(),
            reference,
        }
    }
}

/// Instruction misuse at run time; aborts the current execute action.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("expected {expected} but got: {got}")]
    UnexpectedValue { expected: &'static str, got: String },
    #[error("the operand stack is empty")]
    StackUnderflow,
    #[error("no frame left to pop")]
    FrameUnderflow,
    #[error("value evaluation exceeded {0} levels")]
    EvalDepth(u32),
    #[error("document inclusion exceeded {0} levels")]
    IncludeDepth(u32),
    #[error("no compilation for document \"{0}\"")]
    UnknownDocument(CompactString),
}

/// The cause slot of a top-level [`Error`].
#[derive(Debug, thiserror::Error)]
pub enum InnerError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// A diagnostic-ready error bound to a location in a document.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("jamplate error in {document}")]
pub struct Error {
    pub cause: InnerError,
    pub document: CompactString,
    #[source_code]
    source_code: String,
    #[label("{cause}")]
    location: SourceSpan,
}

impl Error {
    pub fn new(cause: impl Into<InnerError>, document: &Document, reference: Reference) -> Self {
        let source_code = document.read().to_string();
        let start = (reference.position() as usize).min(source_code.len());
        let length = (reference.length() as usize).min(source_code.len() - start);
        Self {
            cause: cause.into(),
            document: document.name().into(),
            source_code,
            location: SourceSpan::new(start.into(), length),
        }
    }
}
