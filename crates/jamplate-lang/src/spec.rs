//! Composable pipeline units.
//!
//! A spec contributes at most one function per pipeline phase plus an
//! ordered collection of sub-specs. The effective function of a phase is
//! the ordered composition of the spec's own contribution followed by
//! each sub-spec's, depth first.

use std::fmt::{self, Debug, Formatter};

use crate::analyze::Analyzer;
use crate::compilation::Compilation;
use crate::compile::Compiler;
use crate::document::Document;
use crate::memory::Memory;
use crate::parse::Parser;

/// Wraps a document into a fresh compilation.
pub type Initializer = Box<dyn Fn(&Document) -> Compilation>;

/// A tree-level hook run before a pipeline stage; returns whether it did
/// something, and is re-run until it settles.
pub type Processor = Box<dyn Fn(&mut Compilation) -> bool>;

/// A hook observing pipeline events.
pub type Listener = Box<dyn Fn(&Event)>;

/// The pipeline actions events are fired around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PreInitialize,
    PostInitialize,
    PreParse,
    PostParse,
    PreAnalyze,
    PostAnalyze,
    PreCompile,
    PostCompile,
    PreExecute,
    PostExecute,
}

/// A pipeline event delivered to listeners.
pub struct Event<'a> {
    pub action: Action,
    pub document: &'a str,
    /// The execution memory, for the execute events.
    pub memory: Option<&'a Memory>,
}

#[derive(Default)]
pub struct Spec {
    name: &'static str,
    initializer: Option<Initializer>,
    parser: Option<Box<dyn Parser>>,
    analyzer: Option<Box<dyn Analyzer>>,
    compiler: Option<Box<dyn Compiler>>,
    pre_analyze: Option<Processor>,
    pre_compile: Option<Processor>,
    listener: Option<Listener>,
    subs: Vec<Spec>,
}

impl Debug for Spec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("name", &self.name)
            .field("subs", &self.subs)
            .finish_non_exhaustive()
    }
}

impl Spec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn with_parser(mut self, parser: Box<dyn Parser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_compiler(mut self, compiler: Box<dyn Compiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_pre_analyze(mut self, processor: Processor) -> Self {
        self.pre_analyze = Some(processor);
        self
    }

    pub fn with_pre_compile(mut self, processor: Processor) -> Self {
        self.pre_compile = Some(processor);
        self
    }

    pub fn with_listener(mut self, listener: Listener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Append a sub-spec.
    pub fn add(mut self, sub: Spec) -> Self {
        self.subs.push(sub);
        self
    }

    /// The first initializer contributed by this spec tree.
    pub fn initializer(&self) -> Option<&Initializer> {
        self.initializer
            .as_ref()
            .or_else(|| self.subs.iter().find_map(|sub| sub.initializer()))
    }

    /// Every parser, in declared order, depth first.
    pub fn parsers(&self) -> Vec<&dyn Parser> {
        let mut out: Vec<&dyn Parser> = Vec::new();
        self.collect(&mut out, &|spec| spec.parser.as_deref());
        out
    }

    pub fn analyzers(&self) -> Vec<&dyn Analyzer> {
        let mut out: Vec<&dyn Analyzer> = Vec::new();
        self.collect(&mut out, &|spec| spec.analyzer.as_deref());
        out
    }

    pub fn compilers(&self) -> Vec<&dyn Compiler> {
        let mut out: Vec<&dyn Compiler> = Vec::new();
        self.collect(&mut out, &|spec| spec.compiler.as_deref());
        out
    }

    pub fn pre_analyze_processors(&self) -> Vec<&Processor> {
        let mut out = Vec::new();
        self.collect(&mut out, &|spec| spec.pre_analyze.as_ref());
        out
    }

    pub fn pre_compile_processors(&self) -> Vec<&Processor> {
        let mut out = Vec::new();
        self.collect(&mut out, &|spec| spec.pre_compile.as_ref());
        out
    }

    pub fn listeners(&self) -> Vec<&Listener> {
        let mut out = Vec::new();
        self.collect(&mut out, &|spec| spec.listener.as_ref());
        out
    }

    fn collect<'a, T: ?Sized>(
        &'a self,
        out: &mut Vec<&'a T>,
        pick: &impl Fn(&'a Spec) -> Option<&'a T>,
    ) {
        if let Some(item) = pick(self) {
            out.push(item);
        }
        for sub in &self.subs {
            sub.collect(out, pick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::IdleParser;

    #[test]
    fn test_composition_order_is_depth_first() {
        let spec = Spec::new("a")
            .with_parser(Box::new(IdleParser))
            .add(
                Spec::new("b")
                    .with_parser(Box::new(IdleParser))
                    .add(Spec::new("c").with_parser(Box::new(IdleParser))),
            )
            .add(Spec::new("d").with_parser(Box::new(IdleParser)));
        assert_eq!(spec.parsers().len(), 4);
        assert!(spec.initializer().is_none());
    }
}
