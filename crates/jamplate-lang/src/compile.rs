//! Tree-to-instruction lowering combinators.
//!
//! A compiler maps one tree to at most one instruction; combinators build
//! dispatch chains out of small per-kind compilers. The `root` argument is
//! always the top-level dispatcher, so nested content can re-enter it
//! through [`FallbackCompiler`].

use std::fmt::Debug;

use crate::analyze::Query;
use crate::compilation::Compilation;
use crate::error::CompileError;
use crate::instruction::Instruction;
use crate::tree::TreeId;

pub type Compiled = Result<Option<Instruction>, CompileError>;

pub trait Compiler: Debug {
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled;
}

/// A compiler from a plain function.
pub struct FnCompiler<F>(pub F);

impl<F> Debug for FnCompiler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnCompiler")
    }
}

impl<F> Compiler for FnCompiler<F>
where
    F: Fn(&dyn Compiler, &Compilation, TreeId) -> Compiled,
{
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled {
        (self.0)(root, compilation, tree)
    }
}

/// Invokes the inner compiler only when the tree matches the query.
#[derive(Debug)]
pub struct FilterCompiler {
    inner: Box<dyn Compiler>,
    query: Query,
}

impl FilterCompiler {
    pub fn new(inner: Box<dyn Compiler>, query: Query) -> Self {
        Self { inner, query }
    }
}

impl Compiler for FilterCompiler {
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled {
        if self.query.test(compilation, tree) {
            self.inner.compile(root, compilation, tree)
        } else {
            Ok(None)
        }
    }
}

/// Returns the first non-empty result of the sub-compilers.
#[derive(Debug)]
pub struct FirstCompiler {
    compilers: Vec<Box<dyn Compiler>>,
}

impl FirstCompiler {
    pub fn new(compilers: Vec<Box<dyn Compiler>>) -> Self {
        Self { compilers }
    }
}

impl Compiler for FirstCompiler {
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled {
        for compiler in &self.compilers {
            if let Some(instruction) = compiler.compile(root, compilation, tree)? {
                return Ok(Some(instruction));
            }
        }
        Ok(None)
    }
}

/// Emits a block of every sub-compiler's result, dropping empty ones.
#[derive(Debug)]
pub struct CombineCompiler {
    compilers: Vec<Box<dyn Compiler>>,
}

impl CombineCompiler {
    pub fn new(compilers: Vec<Box<dyn Compiler>>) -> Self {
        Self { compilers }
    }
}

impl Compiler for CombineCompiler {
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled {
        let mut children = Vec::new();
        for compiler in &self.compilers {
            if let Some(instruction) = compiler.compile(root, compilation, tree)? {
                children.push(instruction);
            }
        }
        if children.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Instruction::block(
                Some(compilation.location(tree)),
                children,
            )))
        }
    }
}

/// Applies the inner compiler to each direct child of the tree (not the
/// tree itself) and blocks the results.
#[derive(Debug)]
pub struct FlattenCompiler {
    inner: Box<dyn Compiler>,
}

impl FlattenCompiler {
    pub fn new(inner: Box<dyn Compiler>) -> Self {
        Self { inner }
    }
}

impl Compiler for FlattenCompiler {
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled {
        let mut children = Vec::new();
        for child in compilation.trees().children(tree) {
            if let Some(instruction) = self.inner.compile(root, compilation, child)? {
                children.push(instruction);
            }
        }
        Ok(Some(Instruction::block(
            Some(compilation.location(tree)),
            children,
        )))
    }
}

/// Re-enters the top-level dispatcher.
#[derive(Debug)]
pub struct FallbackCompiler;

impl Compiler for FallbackCompiler {
    fn compile(&self, root: &dyn Compiler, compilation: &Compilation, tree: TreeId) -> Compiled {
        root.compile(root, compilation, tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Reference};
    use crate::instruction::InstructionKind;
    use crate::value::Value;

    fn compilation(content: &str) -> Compilation {
        Compilation::new(Document::pseudo("test", content), "root", -1)
    }

    fn push(n: i64) -> Box<dyn Compiler> {
        Box::new(FnCompiler(move |_: &dyn Compiler, _: &Compilation, _| {
            Ok(Some(Instruction::bare(InstructionKind::PushConst(
                Value::number(n),
            ))))
        }))
    }

    fn idle() -> Box<dyn Compiler> {
        Box::new(FnCompiler(|_: &dyn Compiler, _: &Compilation, _| Ok(None)))
    }

    #[test]
    fn test_first_returns_the_first_producer() {
        let c = compilation("x");
        let first = FirstCompiler::new(vec![idle(), push(1), push(2)]);
        let compiled = first.compile(&first, &c, c.root()).unwrap().unwrap();
        assert_eq!(
            compiled.kind(),
            &InstructionKind::PushConst(Value::number(1))
        );
    }

    #[test]
    fn test_combine_blocks_all_producers() {
        let c = compilation("x");
        let combine = CombineCompiler::new(vec![push(1), idle(), push(2)]);
        let compiled = combine.compile(&combine, &c, c.root()).unwrap().unwrap();
        assert_eq!(compiled.sub_instructions().len(), 2);
    }

    #[test]
    fn test_filter_gates_by_kind() {
        let c = compilation("x");
        let filtered = FilterCompiler::new(push(1), Query::is("something-else"));
        assert!(matches!(
            filtered.compile(&filtered, &c, c.root()),
            Ok(None)
        ));
    }

    #[test]
    fn test_flatten_compiles_children_with_the_root_dispatcher() {
        let mut c = compilation("ab");
        let root = c.root();
        for (i, range) in [Reference::new(0, 1), Reference::new(1, 1)].iter().enumerate() {
            let t = c.tree(*range, if i == 0 { "a" } else { "b" }, 0);
            c.offer(root, t).unwrap();
        }
        // the dispatcher handles kind "a" only; flatten(fallback) re-enters
        // it per child
        let dispatcher = FirstCompiler::new(vec![
            Box::new(FilterCompiler::new(push(7), Query::is("a"))),
            Box::new(FilterCompiler::new(
                Box::new(FlattenCompiler::new(Box::new(FallbackCompiler))),
                Query::is("root"),
            )),
        ]);
        let compiled = dispatcher.compile(&dispatcher, &c, root).unwrap().unwrap();
        // only the "a" child produced an instruction
        assert_eq!(compiled.sub_instructions().len(), 1);
    }
}
