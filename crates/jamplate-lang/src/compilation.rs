use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::diagnostic::{Diagnostic, Severity};
use crate::document::{Document, Reference};
use crate::error::TreeError;
use crate::instruction::Instruction;
use crate::memory::Location;
use crate::sketch::SketchArena;
use crate::tree::{TreeArena, TreeId};

/// One document's compilation unit: the tree arenas, the root tree, and
/// the artifacts of the later pipeline stages.
#[derive(Debug)]
pub struct Compilation {
    document: Document,
    trees: TreeArena,
    sketches: SketchArena,
    root: TreeId,
    instruction: Option<Instruction>,
    output: Option<String>,
}

impl Compilation {
    /// Wrap `document` with a root tree of the given kind and weight.
    pub fn new(document: Document, kind: &str, weight: i32) -> Self {
        let mut trees = TreeArena::new();
        let mut sketches = SketchArena::new();
        let sketch = sketches.alloc(kind);
        let root = trees.alloc(document.reference(), weight, sketch);
        sketches.set_tree(sketch, root);
        Self {
            document,
            trees,
            sketches,
            root,
            instruction: None,
            output: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn root(&self) -> TreeId {
        self.root
    }

    pub fn trees(&self) -> &TreeArena {
        &self.trees
    }

    pub fn trees_mut(&mut self) -> &mut TreeArena {
        &mut self.trees
    }

    pub fn sketches(&self) -> &SketchArena {
        &self.sketches
    }

    pub fn sketches_mut(&mut self) -> &mut SketchArena {
        &mut self.sketches
    }

    /// Allocate a free-standing tree with a fresh sketch of `kind`.
    pub fn tree(&mut self, reference: Reference, kind: &str, weight: i32) -> TreeId {
        let sketch = self.sketches.alloc(kind);
        let tree = self.trees.alloc(reference, weight, sketch);
        self.sketches.set_tree(sketch, tree);
        tree
    }

    /// Offer `tree` into the structure of `host`.
    pub fn offer(&mut self, host: TreeId, tree: TreeId) -> Result<(), TreeError> {
        self.trees.offer(host, tree)
    }

    /// The document text under `tree`.
    pub fn read(&self, tree: TreeId) -> &str {
        self.document.read_at(self.trees.reference(tree))
    }

    /// The sketch kind of `tree`.
    pub fn kind(&self, tree: TreeId) -> &str {
        self.sketches.kind(self.trees.sketch(tree))
    }

    /// A diagnostics-ready location for `tree`.
    pub fn location(&self, tree: TreeId) -> Location {
        Location {
            document: self.document.name().into(),
            reference: self.trees.reference(tree),
        }
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        self.instruction.as_ref()
    }

    pub fn set_instruction(&mut self, instruction: Instruction) {
        self.instruction = Some(instruction);
    }

    /// The rendered output of the last execution.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn set_output(&mut self, output: String) {
        self.output = Some(output);
    }
}

/// The per-run set of compilations plus the diagnostic sink.
///
/// Compilations iterate in insertion order.
#[derive(Debug, Default)]
pub struct Environment {
    compilations: Vec<Compilation>,
    index: FxHashMap<CompactString, usize>,
    diagnostics: Vec<Diagnostic>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compilation, replacing any previous one for the same
    /// document.
    pub fn insert(&mut self, compilation: Compilation) {
        let name: CompactString = compilation.document().name().into();
        match self.index.get(&name) {
            Some(&slot) => self.compilations[slot] = compilation,
            None => {
                self.index.insert(name, self.compilations.len());
                self.compilations.push(compilation);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Compilation> {
        self.index.get(name).map(|&slot| &self.compilations[slot])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Compilation> {
        self.index
            .get(name)
            .map(|&slot| &mut self.compilations[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compilation> {
        self.compilations.iter()
    }

    pub fn names(&self) -> Vec<CompactString> {
        self.compilations
            .iter()
            .map(|c| c.document().name().into())
            .collect()
    }

    /// Record a diagnostic bound to a document position.
    pub fn diagnose(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        document: &Document,
        reference: Option<Reference>,
    ) {
        self.diagnostics
            .push(Diagnostic::new(severity, message, document, reference));
    }

    /// Record a diagnostic from an instruction location, resolving the
    /// document through the registered compilations.
    pub fn diagnose_at(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        location: Option<&Location>,
    ) {
        match location.and_then(|l| self.get(&l.document).map(|c| (c.document().clone(), l))) {
            Some((document, location)) => {
                self.diagnose(severity, message, &document, Some(location.reference));
            }
            None => {
                let placeholder = Document::pseudo("<unknown>", "");
                self.diagnose(severity, message, &placeholder, None);
            }
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_tree_spans_the_document() {
        let compilation = Compilation::new(Document::pseudo("d", "hello"), "root", -1);
        let root = compilation.root();
        assert_eq!(compilation.trees().reference(root), Reference::new(0, 5));
        assert_eq!(compilation.kind(root), "root");
        assert_eq!(compilation.read(root), "hello");
    }

    #[test]
    fn test_environment_iterates_in_insertion_order() {
        let mut environment = Environment::new();
        for name in ["b", "a", "c"] {
            environment.insert(Compilation::new(Document::pseudo(name, ""), "root", -1));
        }
        assert_eq!(environment.names(), vec!["b", "a", "c"]);
        assert!(environment.get("a").is_some());
        assert!(environment.get("missing").is_none());
    }

    #[test]
    fn test_reinsertion_replaces_in_place() {
        let mut environment = Environment::new();
        environment.insert(Compilation::new(Document::pseudo("a", "old"), "root", -1));
        environment.insert(Compilation::new(Document::pseudo("b", ""), "root", -1));
        environment.insert(Compilation::new(Document::pseudo("a", "new"), "root", -1));
        assert_eq!(environment.names(), vec!["a", "b"]);
        assert_eq!(environment.get("a").unwrap().document().read(), "new");
    }
}
