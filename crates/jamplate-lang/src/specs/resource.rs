//! Value resources: references, numeric literals, and the contextual
//! re-kinding of brackets into groups, arrays, objects and index
//! accesses.

use crate::analyze::{FilterAnalyzer, FnAnalyzer, HierarchyAnalyzer, Query};
use crate::compile::{Compiler, FilterCompiler, FnCompiler};
use crate::compilation::Compilation;
use crate::document::Reference;
use crate::instruction::{Instruction, InstructionKind};
use crate::number::Number;
use crate::parse::TermParser;
use crate::sketch::component;
use crate::spec::Spec;
use crate::tree::TreeId;
use crate::value::Value;

use super::support::{
    at, block, body_region, compile_parameter, compile_parameter_region, parameter_context,
    push_text, required_component,
};
use super::{kind, weight};

fn compiled(
    name: &'static str,
    target: &'static str,
    compiler: impl Fn(&dyn Compiler, &Compilation, TreeId) -> crate::compile::Compiled + 'static,
) -> Spec {
    Spec::new(name).with_compiler(Box::new(FilterCompiler::new(
        Box::new(FnCompiler(compiler)),
        Query::is(target),
    )))
}

fn analyzed(spec: Spec, query: Query, body: impl Fn(&mut Compilation, TreeId) -> bool + 'static) -> Spec {
    spec.with_analyzer(Box::new(HierarchyAnalyzer::new(Box::new(
        FilterAnalyzer::new(Box::new(FnAnalyzer(body)), query),
    ))))
}

/// A name; resolves through the heap, falling back to its own text so
/// unknown names pass through the output untouched.
pub fn reference() -> Spec {
    compiled("reference", kind::REFERENCE, |_, c, t| {
        Ok(Some(block(
            c,
            t,
            vec![
                push_text(c, t, c.read(t)),
                Instruction::bare(InstructionKind::Access),
            ],
        )))
    })
    .with_parser(Box::new(TermParser::new(
        r"\b[A-Za-z_][A-Za-z0-9_$]*",
        kind::REFERENCE,
        weight::DEFAULT,
    )))
}

/// A numeric literal in any of the supported radixes.
pub fn number() -> Spec {
    compiled("number", kind::NUMBER, |_, c, t| {
        let text = c.read(t);
        let value = Number::parse(text).map(Value::Number).unwrap_or_else(|| {
            // the literal pattern guarantees this parses; stay text-safe
            // anyway
            Value::text(text)
        });
        Ok(Some(at(c, t, InstructionKind::PushConst(value))))
    })
    .with_parser(Box::new(TermParser::new(
        r"\b(?:0[xX][0-9A-Fa-f]+[Ll]?|0[bB][01]+[Ll]?|[0-9]+\.[0-9]+[FfDd]?|[0-9]+[LlFfDd]?)",
        kind::NUMBER,
        weight::DEFAULT,
    )))
}

/// Parentheses inside a parameter evaluate their content to one value.
pub fn group() -> Spec {
    let spec = compiled("group", kind::GROUP, |root, c, t| {
        Ok(Some(compile_parameter_region(
            root,
            c,
            t,
            body_region(c, t),
        )?))
    });
    analyzed(
        spec,
        Query::and(vec![Query::is(kind::ROUND), parameter_context()]),
        |c, t| {
            let sketch = c.trees().sketch(t);
            c.sketches_mut().set_kind(sketch, kind::GROUP);
            true
        },
    )
}

/// Split a bracket region into comma-separated slot trees. Returns false
/// when nothing was created.
fn split_slots(compilation: &mut Compilation, tree: TreeId) -> bool {
    let region = body_region(compilation, tree);
    let commas: Vec<Reference> = compilation
        .trees()
        .children(tree)
        .into_iter()
        .filter(|&child| compilation.kind(child) == kind::COMMA)
        .map(|child| compilation.trees().reference(child))
        .collect();

    let mut bounds = vec![region.position()];
    for comma in &commas {
        bounds.push(comma.position());
        bounds.push(comma.end());
    }
    bounds.push(region.end());

    let mut changed = false;
    for slot in bounds.chunks(2) {
        let [start, end] = slot else { continue };
        if start >= end {
            continue;
        }
        let reference = Reference::between(*start, *end);
        if compilation.document().read_at(reference).trim().is_empty() {
            continue;
        }
        let slot_tree = compilation.tree(reference, kind::SLOT, weight::SLOT);
        if compilation.offer(tree, slot_tree).is_ok() {
            changed = true;
        }
    }
    changed
}

fn slots(compilation: &Compilation, tree: TreeId) -> Vec<TreeId> {
    compilation
        .trees()
        .children(tree)
        .into_iter()
        .filter(|&child| compilation.kind(child) == kind::SLOT)
        .collect()
}

/// Square brackets inside a parameter with nothing to index become an
/// array literal.
pub fn array() -> Spec {
    let spec = compiled("array", kind::ARRAY, |root, c, t| {
        let mut children = vec![at(c, t, InstructionKind::PushFrame)];
        for slot in slots(c, t) {
            children.push(compile_parameter(root, c, slot)?);
        }
        children.push(Instruction::bare(InstructionKind::GlueFrame));
        children.push(Instruction::bare(InstructionKind::CastArray));
        children.push(Instruction::bare(InstructionKind::DumpFrame));
        Ok(Some(block(c, t, children)))
    });
    analyzed(
        spec,
        Query::and(vec![Query::is(kind::SQUARE), parameter_context()]),
        |c, t| {
            if previous_operand(c, t).is_some() {
                return false;
            }
            let sketch = c.trees().sketch(t);
            c.sketches_mut().set_kind(sketch, kind::ARRAY);
            split_slots(c, t);
            true
        },
    )
}

/// Curly braces inside a parameter become an object literal.
pub fn object() -> Spec {
    let spec = compiled("object", kind::OBJECT, |root, c, t| {
        let mut children = vec![at(c, t, InstructionKind::PushFrame)];
        for slot in slots(c, t) {
            children.push(compile_parameter(root, c, slot)?);
            children.push(Instruction::bare(InstructionKind::CastPair));
        }
        children.push(Instruction::bare(InstructionKind::BuildObject));
        children.push(Instruction::bare(InstructionKind::DumpFrame));
        Ok(Some(block(c, t, children)))
    });
    analyzed(
        spec,
        Query::and(vec![Query::is(kind::CURLY), parameter_context()]),
        |c, t| {
            let sketch = c.trees().sketch(t);
            c.sketches_mut().set_kind(sketch, kind::OBJECT);
            split_slots(c, t);
            true
        },
    )
}

/// A value-producing sibling directly before `tree`, if any.
fn previous_operand(compilation: &Compilation, tree: TreeId) -> Option<TreeId> {
    let previous = compilation.trees().previous(tree)?;
    let kind = compilation.kind(previous);
    (kind.starts_with("value:") || kind.starts_with("operator:") || kind == kind::PARAMETER)
        .then_some(previous)
}

/// `value[index]`: square brackets directly after a value select a
/// member.
pub fn indexer() -> Spec {
    let spec = compiled("indexer", "operator:indexer", |root, c, t| {
        let left = required_component(c, t, component::LEFT, "the index operation")?;
        let index = required_component(c, t, component::RIGHT, "the index operation")?;
        let left = compile_parameter(root, c, left)?;
        let index = compile_parameter_region(root, c, index, body_region(c, index))?;
        Ok(Some(block(
            c,
            t,
            vec![
                left,
                index,
                Instruction::bare(InstructionKind::Eval),
                Instruction::bare(InstructionKind::Get),
            ],
        )))
    });
    analyzed(
        spec,
        Query::and(vec![
            Query::is(kind::SQUARE),
            parameter_context(),
            Query::parent(Query::not(Query::is("operator:indexer"))),
        ]),
        |c, t| {
            let Some(previous) = previous_operand(c, t) else {
                return false;
            };
            let head = crate::analyze::operand_head(c, previous);
            let span = Reference::inclusive(
                c.trees().reference(head),
                c.trees().reference(t),
            );
            let wrapper = c.tree(span, "operator:indexer", weight::DEFAULT);
            if c.offer(t, wrapper).is_err() {
                return false;
            }
            let wrapper_sketch = c.trees().sketch(wrapper);

            let left_span = Reference::inclusive(
                c.trees().reference(head),
                c.trees().reference(previous),
            );
            let left = c.tree(left_span, kind::PARAMETER, weight::PARAMETER);
            if c.offer(wrapper, left).is_ok() {
                let slot = c.sketches_mut().component(wrapper_sketch, component::LEFT);
                c.sketches_mut().set_tree(slot, left);
            }
            let slot = c.sketches_mut().component(wrapper_sketch, component::RIGHT);
            c.sketches_mut().set_tree(slot, t);
            true
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn test_square_in_plain_text_stays_literal() {
        let mut c = Compilation::new(Document::pseudo("d", "a [1] b"), "root", -1);
        let root = c.root();
        let square = c.tree(Reference::new(2, 3), kind::SQUARE, 0);
        c.offer(root, square).unwrap();
        // no parameter ancestor, so the array analyzer must not claim it
        let spec = array();
        let analyzers = spec.analyzers();
        assert!(!analyzers[0].analyze(&mut c, root));
        assert_eq!(c.kind(square), kind::SQUARE);
    }
}
