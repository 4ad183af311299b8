//! Low-level syntax specs: newlines, comments, strings, brackets.

use crate::analyze::Query;
use crate::compile::{Compiler, FilterCompiler, FnCompiler};
use crate::compilation::Compilation;
use crate::instruction::{Instruction, InstructionKind};
use crate::number::Number;
use crate::parse::{DoublePatternParser, MergeParser, TermParser};
use crate::spec::Spec;
use crate::tree::TreeId;
use crate::value::Value;

use super::support::{at, block, push_text};
use super::{address, kind, weight};

/// The instructions that re-seed `__LINE__` with the line after `tree`.
fn track_line(compilation: &Compilation, tree: TreeId) -> Vec<Instruction> {
    let line = compilation
        .document()
        .line_at(compilation.trees().reference(tree).position())
        + 1;
    vec![
        push_text(compilation, tree, address::LINE),
        at(
            compilation,
            tree,
            InstructionKind::PushConst(Value::Number(Number::from(line))),
        ),
        Instruction::bare(InstructionKind::Alloc),
    ]
}

/// A spec whose compiler handles exactly one kind.
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

/// A line continuation: counts the line without printing it.
pub fn newline_escaped() -> Spec {
    compiled("newline-escaped", kind::NEWLINE_ESCAPED, |_, c, t| {
        Ok(Some(block(c, t, track_line(c, t))))
    })
    .with_parser(Box::new(TermParser::new(
        r"\\(?:\r\n|\r|\n)",
        kind::NEWLINE_ESCAPED,
        weight::DEFAULT,
    )))
}

/// A newline: prints itself and counts the line.
pub fn newline() -> Spec {
    compiled("newline", kind::NEWLINE, |_, c, t| {
        let mut children = vec![
            push_text(c, t, c.read(t)),
            Instruction::bare(InstructionKind::Print),
        ];
        children.extend(track_line(c, t));
        Ok(Some(block(c, t, children)))
    })
    .with_parser(Box::new(TermParser::new(
        r"\r\n|\r|\n",
        kind::NEWLINE,
        weight::DEFAULT,
    )))
}

pub fn comment_line() -> Spec {
    compiled("comment-line", kind::COMMENT_LINE, |_, c, t| {
        Ok(Some(at(c, t, InstructionKind::Idle)))
    })
    .with_parser(Box::new(TermParser::new(
        r"//[^\r\n]*",
        kind::COMMENT_LINE,
        weight::DEFAULT,
    )))
}

pub fn comment_block() -> Spec {
    compiled("comment-block", kind::COMMENT_BLOCK, |_, c, t| {
        Ok(Some(at(c, t, InstructionKind::Idle)))
    })
    .with_parser(Box::new(TermParser::new(
        r"(?s)/\*.*?\*/",
        kind::COMMENT_BLOCK,
        weight::DEFAULT,
    )))
}

/// Resolve `\\` and `\x` escapes in string content.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn string_compiler() -> Box<dyn Compiler> {
    Box::new(FilterCompiler::new(
        Box::new(FnCompiler(|_: &dyn Compiler, c: &Compilation, t| {
            let text = c.read(t);
            let content = if text.len() >= 2 {
                &text[1..text.len() - 1]
            } else {
                ""
            };
            Ok(Some(at(
                c,
                t,
                InstructionKind::PushConst(Value::quote(Value::text(unescape(content)))),
            )))
        })),
        Query::is(kind::STRING),
    ))
}

/// Quoted strings; both quote styles push their content behind a quote
/// barrier. The merge drops whichever pairing clashes when the styles
/// overlap.
pub fn strings() -> Spec {
    Spec::new("strings")
        .with_parser(Box::new(MergeParser::new(vec![
            Box::new(
                DoublePatternParser::new("'", "'", kind::STRING, weight::DEFAULT).skip_escaped(),
            ),
            Box::new(
                DoublePatternParser::new("\"", "\"", kind::STRING, weight::DEFAULT).skip_escaped(),
            ),
        ])))
        .with_compiler(string_compiler())
}

/// The element separator; the collection analyzers split slots around it.
pub fn comma() -> Spec {
    Spec::new("comma").with_parser(Box::new(TermParser::new(
        r",",
        kind::COMMA,
        weight::DEFAULT,
    )))
}

/// Brackets parse everywhere; analyzers re-kind them inside parameters,
/// and anywhere else they render literally through the text fallback.
pub fn brackets() -> Spec {
    Spec::new("brackets").with_parser(Box::new(MergeParser::new(vec![
        Box::new(DoublePatternParser::new(
            r"\{",
            r"\}",
            kind::CURLY,
            weight::DEFAULT,
        )),
        Box::new(DoublePatternParser::new(
            r"\[",
            r"\]",
            kind::SQUARE,
            weight::DEFAULT,
        )),
        Box::new(DoublePatternParser::new(
            r"\(",
            r"\)",
            kind::ROUND,
            weight::DEFAULT,
        )),
    ])))
}
