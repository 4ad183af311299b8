//! Flow regions: `#if`, `#for`, `#while` and `#capture` fused with their
//! end commands.

use crate::analyze::{
    BinaryFlowAnalyzer, FilterAnalyzer, HierarchyAnalyzer, Query, SeparatorsAnalyzer,
};
use crate::compilation::Compilation;
use crate::compile::{Compiled, Compiler, FilterCompiler, FnCompiler};
use crate::error::CompileError;
use crate::instruction::{Instruction, InstructionKind};
use crate::sketch::component;
use crate::spec::Spec;
use crate::tree::TreeId;
use crate::value::Value;

use super::command::{claim, key_text, ParameterShape};
use super::support::{at, block, compile_body, compile_parameter, required_component};
use super::{kind, weight};

/// The analyzer fusing `start … end` pairs into `wrapper`.
fn fuse(start: &'static str, end: &'static str, wrapper: &'static str) -> Box<dyn crate::analyze::Analyzer> {
    Box::new(HierarchyAnalyzer::new(Box::new(FilterAnalyzer::new(
        Box::new(BinaryFlowAnalyzer {
            start: Query::is(start),
            end: Query::is(end),
            wrapper_kind: wrapper,
            wrapper_weight: weight::DEFAULT,
            body_kind: kind::FLOW_BODY,
            body_weight: weight::FLOW_BODY,
        }),
        Query::and(vec![
            Query::not(Query::is(wrapper)),
            Query::child(Query::or(vec![Query::is(start), Query::is(end)])),
        ]),
    ))))
}

/// Compile a region in its own frame so its console merges upward and its
/// stack leftovers vanish.
fn framed_body(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
) -> Result<Instruction, CompileError> {
    Ok(block(
        compilation,
        tree,
        vec![
            at(compilation, tree, InstructionKind::PushFrame),
            compile_body(root, compilation, tree)?,
            Instruction::bare(InstructionKind::PopFrame),
        ],
    ))
}

/// Compile a command's value into a boolean condition.
fn condition(
    root: &dyn Compiler,
    compilation: &Compilation,
    command: TreeId,
    what: &str,
) -> Result<Instruction, CompileError> {
    let value = required_component(compilation, command, component::VALUE, what)?;
    let compiled = compile_parameter(root, compilation, value)?;
    Ok(block(
        compilation,
        value,
        vec![
            compiled,
            Instruction::bare(InstructionKind::Eval),
            Instruction::bare(InstructionKind::CastBoolean),
        ],
    ))
}

/// `#if c … #elif c … #else … #endif` compiles to a branch chain; the
/// branch regions are the slots split around the `#elif`/`#else` anchors.
pub fn if_spec() -> Spec {
    let separators = Box::new(HierarchyAnalyzer::new(Box::new(FilterAnalyzer::new(
        Box::new(SeparatorsAnalyzer {
            separator: Query::or(vec![
                Query::is("command:elif"),
                Query::is("command:else"),
            ]),
            slot_kind: kind::FLOW_BRANCH,
            slot_weight: weight::FLOW_BRANCH,
        }),
        Query::and(vec![
            Query::is(kind::FLOW_BODY),
            Query::parent(Query::is(kind::FLOW_IF)),
        ]),
    ))));

    Spec::new("flow-if")
        .add(claim("if", "command:if", ParameterShape::Value))
        .add(claim("elif", "command:elif", ParameterShape::Value))
        .add(claim("else", "command:else", ParameterShape::None))
        .add(claim("endif", "command:endif", ParameterShape::None))
        .with_analyzer(fuse("command:if", "command:endif", kind::FLOW_IF))
        .add(Spec::new("flow-if-branches").with_analyzer(separators))
        .with_compiler(Box::new(FilterCompiler::new(
            Box::new(FnCompiler(compile_if)),
            Query::is(kind::FLOW_IF),
        )))
}

fn compile_if(root: &dyn Compiler, c: &Compilation, t: TreeId) -> Compiled {
    let start = required_component(c, t, component::START, "#if")?;
    let body = required_component(c, t, component::BODY, "#if")?;

    // partition the body into (condition, branch) arms
    let mut arms: Vec<(Option<TreeId>, Option<TreeId>)> = Vec::new();
    let mut current: (Option<TreeId>, Option<TreeId>) = (Some(start), None);
    let mut plain_body = true;
    for child in c.trees().children(body) {
        match c.kind(child) {
            k if k == kind::FLOW_BRANCH => {
                if current.1.is_none() {
                    current.1 = Some(child);
                }
                plain_body = false;
            }
            "command:elif" => {
                arms.push(current);
                current = (Some(child), None);
                plain_body = false;
            }
            "command:else" => {
                arms.push(current);
                current = (None, None);
                plain_body = false;
            }
            _ => {}
        }
    }
    if plain_body {
        // no anchors at all; the whole body is the then-branch
        current.1 = Some(body);
    }
    arms.push(current);

    let mut compiled = Instruction::idle();
    for (cond, branch) in arms.into_iter().rev() {
        let branch_instruction = match branch {
            Some(branch) => framed_body(root, c, branch)?,
            None => Instruction::idle(),
        };
        compiled = match cond {
            Some(command) => block(
                c,
                t,
                vec![
                    condition(root, c, command, "#if")?,
                    Instruction::branch(
                        Some(c.location(t)),
                        branch_instruction,
                        compiled,
                    ),
                ],
            ),
            None => branch_instruction,
        };
    }
    Ok(Some(compiled))
}

/// `#for key value … #endfor`: spread the value as an array and run the
/// body once per item with `key` set in the loop frame.
pub fn for_spec() -> Spec {
    Spec::new("flow-for")
        .add(claim("for", "command:for", ParameterShape::KeyValue))
        .add(claim("endfor", "command:endfor", ParameterShape::None))
        .with_analyzer(fuse("command:for", "command:endfor", kind::FLOW_FOR))
        .with_compiler(Box::new(FilterCompiler::new(
            Box::new(FnCompiler(compile_for)),
            Query::is(kind::FLOW_FOR),
        )))
}

fn compile_for(root: &dyn Compiler, c: &Compilation, t: TreeId) -> Compiled {
    let start = required_component(c, t, component::START, "#for")?;
    let body = required_component(c, t, component::BODY, "#for")?;
    let key = key_text(c, start)?;
    let value = required_component(c, start, component::VALUE, "#for")?;
    let value = compile_parameter(root, c, value)?;
    let body = framed_body(root, c, body)?;

    let key_const = at(c, start, InstructionKind::PushConst(Value::text(key)));
    Ok(Some(block(
        c,
        t,
        vec![
            // the loop frame, holding the iteration variable
            at(c, t, InstructionKind::PushFrame),
            // the anchor ending the iteration
            at(c, t, InstructionKind::PushConst(Value::Null)),
            value,
            Instruction::bare(InstructionKind::Eval),
            Instruction::bare(InstructionKind::CastArray),
            Instruction::bare(InstructionKind::Reverse),
            Instruction::bare(InstructionKind::Split),
            Instruction::bare(InstructionKind::Dup),
            Instruction::bare(InstructionKind::Defined),
            Instruction::repeat(
                Some(c.location(t)),
                block(
                    c,
                    t,
                    vec![
                        key_const.clone(),
                        Instruction::bare(InstructionKind::Swap),
                        Instruction::bare(InstructionKind::Set),
                        body,
                        Instruction::bare(InstructionKind::Dup),
                        Instruction::bare(InstructionKind::Defined),
                    ],
                ),
            ),
            // retire the iteration variable before leaving
            key_const,
            Instruction::bare(InstructionKind::Swap),
            Instruction::bare(InstructionKind::Set),
            Instruction::bare(InstructionKind::PopFrame),
        ],
    )))
}

/// `#while condition … #endwhile`.
pub fn while_spec() -> Spec {
    Spec::new("flow-while")
        .add(claim("while", "command:while", ParameterShape::Value))
        .add(claim("endwhile", "command:endwhile", ParameterShape::None))
        .with_analyzer(fuse("command:while", "command:endwhile", kind::FLOW_WHILE))
        .with_compiler(Box::new(FilterCompiler::new(
            Box::new(FnCompiler(compile_while)),
            Query::is(kind::FLOW_WHILE),
        )))
}

fn compile_while(root: &dyn Compiler, c: &Compilation, t: TreeId) -> Compiled {
    let start = required_component(c, t, component::START, "#while")?;
    let body = required_component(c, t, component::BODY, "#while")?;
    let cond = condition(root, c, start, "#while")?;
    let body = framed_body(root, c, body)?;

    Ok(Some(block(
        c,
        t,
        vec![
            at(c, t, InstructionKind::PushFrame),
            cond.clone(),
            Instruction::repeat(
                Some(c.location(t)),
                block(c, t, vec![body, cond]),
            ),
            Instruction::bare(InstructionKind::PopFrame),
        ],
    )))
}

/// `#capture name … #endcapture`: the body's console output becomes the
/// value of `name`.
pub fn capture_spec() -> Spec {
    Spec::new("flow-capture")
        .add(claim("capture", "command:capture", ParameterShape::KeyValue))
        .add(claim("endcapture", "command:endcapture", ParameterShape::None))
        .with_analyzer(fuse("command:capture", "command:endcapture", kind::FLOW_CAPTURE))
        .with_compiler(Box::new(FilterCompiler::new(
            Box::new(FnCompiler(compile_capture)),
            Query::is(kind::FLOW_CAPTURE),
        )))
}

fn compile_capture(root: &dyn Compiler, c: &Compilation, t: TreeId) -> Compiled {
    let start = required_component(c, t, component::START, "#capture")?;
    let body = required_component(c, t, component::BODY, "#capture")?;
    let key = key_text(c, start)?;
    let body = compile_body(root, c, body)?;

    Ok(Some(block(
        c,
        t,
        vec![
            at(c, start, InstructionKind::PushConst(Value::text(key))),
            Instruction::capture(Some(c.location(t)), body),
            Instruction::bare(InstructionKind::Set),
        ],
    )))
}
