//! Line-anchored `#name …` commands.
//!
//! One generic parser recognizes every command and publishes its `type`
//! and `parameter` regions. Each command spec then claims its own type
//! tag during analysis, re-kinding the tree and binding the `key`/`value`
//! components its compiler needs.

use crate::analyze::{FilterAnalyzer, FnAnalyzer, HierarchyAnalyzer, Query};
use crate::compilation::Compilation;
use crate::compile::{Compiled, Compiler, FilterCompiler, FnCompiler};
use crate::document::Reference;
use crate::error::CompileError;
use crate::instruction::{Instruction, InstructionKind};
use crate::parse::PatternParser;
use crate::sketch::component;
use crate::spec::Spec;
use crate::tree::TreeId;

use super::support::{at, block, compile_parameter, component_tree, required_component};
use super::{kind, weight};

/// Recognizes `#name …` at line starts. The line terminator belongs to
/// the command region, so command lines leave no stray newline in the
/// output; the command word and the rest of the line are published as the
/// `type` and `parameter` components.
pub fn parser_spec() -> Spec {
    Spec::new("command").with_parser(Box::new(
        PatternParser::new(
            r"(?m)^#([A-Za-z]+)([^\r\n]*)(?:\r\n|\r|\n|$)",
            kind::COMMAND,
            weight::DEFAULT,
        )
        .group(1, component::TYPE, kind::COMMAND_TYPE, weight::COMMAND_PART)
        .group(
            2,
            component::PARAMETER,
            kind::COMMAND_PARAMETER,
            weight::COMMAND_PART,
        ),
    ))
}

/// How a command's parameter binds to components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterShape {
    /// The whole parameter is the `value`.
    Value,
    /// The first word is the `key`, the rest the `value`.
    KeyValue,
    /// No parameter expected.
    None,
}

/// The command word of a generic command tree.
fn type_of(compilation: &Compilation, tree: TreeId) -> Option<String> {
    let type_tree = component_tree(compilation, tree, component::TYPE)?;
    Some(compilation.read(type_tree).to_string())
}

/// An analyzer claiming `#name` commands: re-kinds the tree and binds the
/// parameter per `shape`.
pub fn claim(name: &'static str, target: &'static str, shape: ParameterShape) -> Spec {
    Spec::new(name).with_analyzer(Box::new(HierarchyAnalyzer::new(Box::new(
        FilterAnalyzer::new(
            Box::new(FnAnalyzer(move |c: &mut Compilation, t| {
                if type_of(c, t).as_deref() != Some(name) {
                    return false;
                }
                let sketch = c.trees().sketch(t);
                c.sketches_mut().set_kind(sketch, target);
                bind_parameter(c, t, shape);
                true
            })),
            Query::is(kind::COMMAND),
        ),
    ))))
}

fn bind_parameter(compilation: &mut Compilation, tree: TreeId, shape: ParameterShape) {
    let Some(parameter) = component_tree(compilation, tree, component::PARAMETER) else {
        return;
    };
    let sketch = compilation.trees().sketch(tree);
    match shape {
        ParameterShape::None => {}
        ParameterShape::Value => {
            let slot = compilation
                .sketches_mut()
                .component(sketch, component::VALUE);
            compilation.sketches_mut().set_tree(slot, parameter);
        }
        ParameterShape::KeyValue => {
            let region = compilation.trees().reference(parameter);
            let text = compilation.document().read_at(region).to_string();
            let indent = text.len() - text.trim_start().len();
            let key_start = region.position() + indent as u32;
            let key_len = text.trim_start().find(' ').unwrap_or(text.trim_start().len());
            let key_end = key_start + key_len as u32;

            let key = compilation.tree(
                Reference::between(key_start, key_end),
                kind::COMMAND_KEY,
                weight::COMMAND_PART,
            );
            if key_start < key_end {
                let _ = compilation.offer(parameter, key);
            }
            let slot = compilation.sketches_mut().component(sketch, component::KEY);
            compilation.sketches_mut().set_tree(slot, key);

            let value = compilation.tree(
                Reference::between(key_end, region.end()),
                kind::COMMAND_VALUE,
                weight::COMMAND_PART,
            );
            if key_end < region.end() {
                let _ = compilation.offer(parameter, value);
            }
            let slot = compilation
                .sketches_mut()
                .component(sketch, component::VALUE);
            compilation.sketches_mut().set_tree(slot, value);
        }
    }
}

/// The raw text of a command's key component.
pub fn key_text(compilation: &Compilation, tree: TreeId) -> Result<String, CompileError> {
    let key = required_component(compilation, tree, component::KEY, "the command")?;
    Ok(compilation.read(key).trim().to_string())
}

/// Compile a command's value component to one pushed value.
pub fn value_parameter(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
    what: &str,
) -> Result<Instruction, CompileError> {
    let value = required_component(compilation, tree, component::VALUE, what)?;
    compile_parameter(root, compilation, value)
}

fn compiled(
    name: &'static str,
    target: &'static str,
    shape: ParameterShape,
    compiler: impl Fn(&dyn Compiler, &Compilation, TreeId) -> Compiled + 'static,
) -> Spec {
    claim(name, target, shape).with_compiler(Box::new(FilterCompiler::new(
        Box::new(FnCompiler(compiler)),
        Query::is(target),
    )))
}

/// `#declare name value`: evaluate and allocate globally; a dotted name
/// touches a nested member.
pub fn declare() -> Spec {
    compiled(
        "declare",
        "command:declare",
        ParameterShape::KeyValue,
        |root, c, t| {
            let key = key_text(c, t)?;
            let value = value_parameter(root, c, t, "#declare")?;
            let instruction = match key.split_once('.') {
                None => block(
                    c,
                    t,
                    vec![
                        at(c, t, InstructionKind::PushConst(crate::value::Value::text(key))),
                        value,
                        Instruction::bare(InstructionKind::Eval),
                        Instruction::bare(InstructionKind::Alloc),
                    ],
                ),
                Some((base, path)) => {
                    let path = crate::value::Value::Array(
                        path.split('.')
                            .map(crate::value::Value::text)
                            .collect(),
                    );
                    block(
                        c,
                        t,
                        vec![
                            at(
                                c,
                                t,
                                InstructionKind::PushConst(crate::value::Value::text(base)),
                            ),
                            at(
                                c,
                                t,
                                InstructionKind::PushConst(crate::value::Value::text(base)),
                            ),
                            Instruction::bare(InstructionKind::Access),
                            at(c, t, InstructionKind::PushConst(path)),
                            value,
                            Instruction::bare(InstructionKind::Eval),
                            Instruction::bare(InstructionKind::Touch),
                            Instruction::bare(InstructionKind::Alloc),
                        ],
                    )
                }
            };
            Ok(Some(instruction))
        },
    )
}

/// `#define name value`: allocate the raw glued text.
pub fn define() -> Spec {
    compiled(
        "define",
        "command:define",
        ParameterShape::KeyValue,
        |root, c, t| {
            let key = key_text(c, t)?;
            let value = required_component(c, t, component::VALUE, "#define")?;
            let text = super::support::compile_flat(
                root,
                c,
                value,
                c.trees().reference(value),
                super::support::Gaps::Push,
            )?;
            let mut body = vec![at(c, t, InstructionKind::PushFrame)];
            body.extend(text);
            body.push(Instruction::bare(InstructionKind::JoinFrame));
            body.push(Instruction::bare(InstructionKind::DumpFrame));
            Ok(Some(block(
                c,
                t,
                vec![
                    at(c, t, InstructionKind::PushConst(crate::value::Value::text(key))),
                    block(c, value, body),
                    Instruction::bare(InstructionKind::Alloc),
                ],
            )))
        },
    )
}

/// `#include document`: execute another compilation in place.
pub fn include() -> Spec {
    compiled(
        "include",
        "command:include",
        ParameterShape::Value,
        |root, c, t| {
            let value = value_parameter(root, c, t, "#include")?;
            Ok(Some(block(
                c,
                t,
                vec![
                    value,
                    Instruction::bare(InstructionKind::Eval),
                    at(c, t, InstructionKind::Include),
                ],
            )))
        },
    )
}

/// `#error message`: write to the diagnostic error stream.
pub fn error() -> Spec {
    compiled(
        "error",
        "command:error",
        ParameterShape::Value,
        |root, c, t| {
            let value = value_parameter(root, c, t, "#error")?;
            Ok(Some(block(
                c,
                t,
                vec![value, at(c, t, InstructionKind::Serr)],
            )))
        },
    )
}

/// `#message text`: print to the console.
pub fn message() -> Spec {
    compiled(
        "message",
        "command:message",
        ParameterShape::Value,
        |root, c, t| {
            let value = value_parameter(root, c, t, "#message")?;
            Ok(Some(block(
                c,
                t,
                vec![
                    value,
                    Instruction::bare(InstructionKind::Eval),
                    Instruction::bare(InstructionKind::Print),
                ],
            )))
        },
    )
}

/// `#console target`: record the console target name.
pub fn console() -> Spec {
    compiled(
        "console",
        "command:console",
        ParameterShape::Value,
        |root, c, t| {
            let value = value_parameter(root, c, t, "#console")?;
            Ok(Some(block(
                c,
                t,
                vec![value, at(c, t, InstructionKind::Console)],
            )))
        },
    )
}

/// `#spread object`: allocate every entry of an object.
pub fn spread() -> Spec {
    compiled(
        "spread",
        "command:spread",
        ParameterShape::Value,
        |root, c, t| {
            let value = value_parameter(root, c, t, "#spread")?;
            Ok(Some(block(
                c,
                t,
                vec![
                    value,
                    Instruction::bare(InstructionKind::Eval),
                    Instruction::bare(InstructionKind::CastObject),
                    at(c, t, InstructionKind::Spread),
                ],
            )))
        },
    )
}

/// `#make name value`: allocate the value cast to an object.
pub fn make() -> Spec {
    compiled(
        "make",
        "command:make",
        ParameterShape::KeyValue,
        |root, c, t| {
            let key = key_text(c, t)?;
            let value = value_parameter(root, c, t, "#make")?;
            Ok(Some(block(
                c,
                t,
                vec![
                    at(c, t, InstructionKind::PushConst(crate::value::Value::text(key))),
                    value,
                    Instruction::bare(InstructionKind::Eval),
                    Instruction::bare(InstructionKind::CastObject),
                    Instruction::bare(InstructionKind::Alloc),
                ],
            )))
        },
    )
}

/// Commands nothing else claimed: unknown names and unbalanced flow
/// anchors.
pub fn leftovers() -> Spec {
    Spec::new("command-leftovers").with_compiler(Box::new(FnCompiler(
        |_: &dyn Compiler, c: &Compilation, t| -> Compiled {
            let tag = c.kind(t);
            if tag == kind::COMMAND {
                let name = type_of(c, t).unwrap_or_default();
                return Err(CompileError::new(
                    format!("unknown command #{name}"),
                    c.document().name(),
                    c.trees().reference(t),
                ));
            }
            if tag.starts_with("command:") {
                return Err(CompileError::new(
                    format!("unbalanced flow command {}", c.read(t).trim_end()),
                    c.document().name(),
                    c.trees().reference(t),
                ));
            }
            Ok(None)
        },
    )))
}
