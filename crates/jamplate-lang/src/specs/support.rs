//! Compile helpers shared across the builtin catalog.

use crate::analyze::Query;
use crate::compilation::Compilation;
use crate::compile::{Compiled, Compiler};
use crate::document::Reference;
use crate::error::CompileError;
use crate::instruction::{Instruction, InstructionKind};
use crate::memory::Location;
use crate::sketch::component;
use crate::tree::TreeId;
use crate::value::Value;

use super::kind;

/// An instruction located at `tree`.
pub fn at(compilation: &Compilation, tree: TreeId, kind: InstructionKind) -> Instruction {
    Instruction::new(kind, Some(compilation.location(tree)))
}

pub fn block(compilation: &Compilation, tree: TreeId, children: Vec<Instruction>) -> Instruction {
    Instruction::block(Some(compilation.location(tree)), children)
}

pub fn push_text(compilation: &Compilation, tree: TreeId, text: &str) -> Instruction {
    at(
        compilation,
        tree,
        InstructionKind::PushConst(Value::text(text)),
    )
}

/// The tree bound to a sketch component of `tree`.
pub fn component_tree(compilation: &Compilation, tree: TreeId, key: &str) -> Option<TreeId> {
    let sketch = compilation.trees().sketch(tree);
    compilation.sketches().component_tree(sketch, key)
}

/// A required component; missing means the analyzer contract was broken.
pub fn required_component(
    compilation: &Compilation,
    tree: TreeId,
    key: &str,
    what: &str,
) -> Result<TreeId, CompileError> {
    component_tree(compilation, tree, key).ok_or_else(|| {
        CompileError::new(
            format!("{what} is missing its {key} component"),
            compilation.document().name(),
            compilation.trees().reference(tree),
        )
    })
}

/// How the flat compilers treat text not covered by any child tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gaps {
    /// Print gap text verbatim (document bodies).
    Print,
    /// Push gap text as values, dropping blank runs at the region edges
    /// (parameters).
    Push,
}

/// Whether a tree's compiled form pushes a value that a surrounding body
/// should print in place.
fn pushes_value(compilation: &Compilation, tree: TreeId) -> bool {
    let kind = compilation.kind(tree);
    kind.starts_with("value:") || kind.starts_with("operator:")
}

/// Compile the children of `tree` that fall inside `region`, in document
/// order, interleaved with the uncovered gap text.
pub fn compile_flat(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
    region: Reference,
    gaps: Gaps,
) -> Result<Vec<Instruction>, CompileError> {
    struct Gap {
        start: u32,
        end: u32,
    }

    let mut out = Vec::new();
    let mut pending: Vec<(usize, Gap)> = Vec::new();
    let mut cursor = region.position();

    let emit_gap = |out: &mut Vec<Instruction>, pending: &mut Vec<(usize, Gap)>, start, end| {
        if start >= end {
            return;
        }
        let text = compilation
            .document()
            .read_at(Reference::between(start, end));
        match gaps {
            Gaps::Print => {
                let location = Location {
                    document: compilation.document().name().into(),
                    reference: Reference::between(start, end),
                };
                out.push(Instruction::block(
                    Some(location.clone()),
                    vec![
                        Instruction::new(
                            InstructionKind::PushConst(Value::text(text)),
                            Some(location),
                        ),
                        Instruction::bare(InstructionKind::Print),
                    ],
                ));
            }
            Gaps::Push => {
                // remember the slot so blank edge gaps can be pruned later
                pending.push((
                    out.len(),
                    Gap { start, end },
                ));
                out.push(Instruction::bare(InstructionKind::PushConst(Value::text(
                    text,
                ))));
            }
        }
    };

    for child in compilation.trees().children(tree) {
        let reference = compilation.trees().reference(child);
        if reference.end() <= region.position() || reference.position() >= region.end() {
            continue;
        }
        emit_gap(&mut out, &mut pending, cursor, reference.position());
        if let Some(compiled) = root.compile(root, compilation, child)? {
            if gaps == Gaps::Print && pushes_value(compilation, child) {
                out.push(block(
                    compilation,
                    child,
                    vec![compiled, Instruction::bare(InstructionKind::Print)],
                ));
            } else {
                out.push(compiled);
            }
        }
        cursor = cursor.max(reference.end());
    }
    emit_gap(&mut out, &mut pending, cursor, region.end());

    if gaps == Gaps::Push {
        // drop blank gap text at the region edges so lone operands stay
        // single values
        let blank = |index: &usize, gap: &Gap| {
            compilation
                .document()
                .read_at(Reference::between(gap.start, gap.end))
                .trim()
                .is_empty()
                && (*index == 0 || *index == out.len() - 1)
        };
        let doomed: Vec<usize> = pending
            .iter()
            .filter(|(index, gap)| blank(index, gap))
            .map(|(index, _)| *index)
            .collect();
        for index in doomed.into_iter().rev() {
            out.remove(index);
        }
    }

    Ok(out)
}

/// Compile a parameter-like tree: its contents evaluate in an isolated
/// frame and fold to exactly one pushed value.
pub fn compile_parameter(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
) -> Result<Instruction, CompileError> {
    compile_parameter_region(root, compilation, tree, compilation.trees().reference(tree))
}

pub fn compile_parameter_region(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
    region: Reference,
) -> Result<Instruction, CompileError> {
    let mut children = vec![at(compilation, tree, InstructionKind::PushFrame)];
    children.extend(compile_flat(root, compilation, tree, region, Gaps::Push)?);
    children.push(Instruction::bare(InstructionKind::GlueFrame));
    children.push(Instruction::bare(InstructionKind::DumpFrame));
    Ok(block(compilation, tree, children))
}

/// Compile a body-like tree: contents print into the current console.
pub fn compile_body(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
) -> Result<Instruction, CompileError> {
    let children = compile_flat(
        root,
        compilation,
        tree,
        compilation.trees().reference(tree),
        Gaps::Print,
    )?;
    Ok(block(compilation, tree, children))
}

/// The inner region of a bracket-like tree, from its open/close sketch
/// components.
pub fn body_region(compilation: &Compilation, tree: TreeId) -> Reference {
    component_tree(compilation, tree, component::BODY)
        .map(|body| compilation.trees().reference(body))
        .unwrap_or_else(|| {
            // fall back to trimming one delimiter character on each side
            let reference = compilation.trees().reference(tree);
            reference.subreference(1, reference.length().saturating_sub(2))
        })
}

/// Ancestors that make a tree part of an evaluated parameter.
pub fn parameter_context() -> Query {
    Query::within(Query::or(vec![
        Query::is(kind::INJECTION),
        Query::is(kind::COMMAND_VALUE),
        Query::is(kind::PARAMETER),
        Query::is(kind::SLOT),
        Query::is(kind::GROUP),
        Query::is(kind::ARRAY),
        Query::is(kind::OBJECT),
    ]))
}
