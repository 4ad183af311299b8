//! `jamplate-lang` is the parser, analyzer, compiler and stack-machine
//! runtime for the Jamplate template language.
//!
//! A document flows through five actions: *initialize* wraps it in a
//! compilation, *parse* grows an ordered interval tree of syntactic
//! regions, *analyze* folds flat tokens into contextual structures,
//! *compile* lowers the tree to an instruction, and *execute* runs it
//! against a frame-stack memory whose root console becomes the rendered
//! output.
//!
//! ## Examples
//!
//! ```
//! use jamplate_lang::Engine;
//!
//! let mut engine = Engine::new();
//! let output = engine.render("sum.jp", "1 + 2 * (3 + 5)").unwrap();
//! assert_eq!(output, "17");
//! ```
//!
//! The pipeline can also be driven action by action:
//!
//! ```
//! use jamplate_lang::{specs, Document, Unit};
//!
//! let mut unit = Unit::new(specs::default_spec());
//! assert!(unit.initialize(Document::pseudo("doc.jp", "x=#{'1'}#")));
//! assert!(unit.parse("doc.jp"));
//! assert!(unit.analyze("doc.jp"));
//! assert!(unit.compile("doc.jp"));
//! assert!(unit.execute("doc.jp"));
//! let output = unit.environment().get("doc.jp").unwrap().output();
//! assert_eq!(output, Some("x=1"));
//! ```

pub mod analyze;
pub mod compilation;
pub mod compile;
pub mod diagnostic;
pub mod document;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod memory;
pub mod number;
pub mod parse;
pub mod relation;
pub mod sketch;
pub mod spec;
pub mod specs;
pub mod tree;
pub mod unit;
pub mod value;

pub use compilation::{Compilation, Environment};
pub use diagnostic::{Diagnostic, Severity};
pub use document::{Document, Reference};
pub use engine::{Engine, RenderError};
pub use error::{
    CompileError, DocumentError, Error, ExecutionError, ParseError, RelationError, TreeError,
};
pub use instruction::{Instruction, InstructionKind};
pub use memory::{Frame, Location, Memory};
pub use number::Number;
pub use relation::{Dominance, Intersection};
pub use sketch::{Sketch, SketchArena, SketchId};
pub use spec::{Action, Event, Spec};
pub use tree::{TreeArena, TreeId};
pub use unit::Unit;
pub use value::Value;
