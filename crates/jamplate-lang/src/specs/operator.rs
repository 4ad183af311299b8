//! Parameter operators.
//!
//! Every operator spec contributes a symbol parser, a wrapping analyzer
//! and a compiler. The catalog order in [`super::default_spec`] is the
//! precedence: loosest binding first.

use crate::analyze::{BinaryOperatorAnalyzer, FilterAnalyzer, HierarchyAnalyzer, Query};
use crate::compile::{Compiled, Compiler, FilterCompiler, FnCompiler};
use crate::compilation::Compilation;
use crate::instruction::{Instruction, InstructionKind};
use crate::number::Number;
use crate::parse::TermParser;
use crate::sketch::component;
use crate::spec::Spec;
use crate::tree::TreeId;
use crate::value::Value;

use super::support::{at, block, compile_parameter, component_tree, required_component};
use super::{kind, weight};

/// Precedence groups; a chain mixing symbols of one group nests to the
/// left because the right-side operand walk stops before any of them.
const ADDITIVE: &[&str] = &["symbol:plus", "symbol:minus"];
const MULTIPLICATIVE: &[&str] = &["symbol:star", "symbol:slash", "symbol:percent"];
const COMPARISON: &[&str] = &[
    "symbol:less",
    "symbol:less-equal",
    "symbol:more",
    "symbol:more-equal",
];
const EQUALITY: &[&str] = &["symbol:equals", "symbol:not-equals"];

struct Operator {
    name: &'static str,
    symbol_pattern: &'static str,
    symbol_kind: &'static str,
    wrapper_kind: &'static str,
}

/// Knobs of the common operator assembly.
#[derive(Default)]
struct Options {
    /// Restrict wrapping to a context, e.g. object slots for pairs.
    context: Option<Query>,
    /// Wrap the rightmost symbol first (left-nesting chains).
    rightmost: bool,
    /// Let the operator stand without a left operand.
    allow_missing_left: bool,
    /// The operator's precedence group; bounds the right-side operand.
    bounds: &'static [&'static str],
}

impl Operator {
    /// Assemble the common parser + analyzer pair; the compiler is
    /// supplied per operator.
    fn spec(self, options: Options, compiler: Box<dyn Compiler>) -> Spec {
        let analyzer = BinaryOperatorAnalyzer {
            wrapper_kind: self.wrapper_kind,
            wrapper_weight: weight::DEFAULT,
            side_kind: kind::PARAMETER,
            side_weight: weight::PARAMETER,
            allow_missing_left: options.allow_missing_left,
            rightmost_of: options.rightmost.then_some(self.symbol_kind),
            operand_bounds: options.bounds,
        };
        let mut conditions = vec![
            Query::is(self.symbol_kind),
            Query::parent(Query::not(Query::is(self.wrapper_kind))),
        ];
        conditions.extend(options.context);
        let query = Query::and(conditions);
        Spec::new(self.name)
            .with_parser(Box::new(TermParser::new(
                self.symbol_pattern,
                self.symbol_kind,
                weight::DEFAULT,
            )))
            .with_analyzer(Box::new(HierarchyAnalyzer::new(Box::new(
                FilterAnalyzer::new(Box::new(analyzer), query),
            ))))
            .with_compiler(Box::new(FilterCompiler::new(
                compiler,
                Query::is(self.wrapper_kind),
            )))
    }
}

/// Compile the two side parameters; a missing left side becomes `base`
/// when given, otherwise the operator fails to compile.
fn sides(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
    base: Option<Value>,
    what: &str,
) -> Result<(Instruction, Instruction), crate::error::CompileError> {
    let right = required_component(compilation, tree, component::RIGHT, what)?;
    let right = compile_parameter(root, compilation, right)?;
    let left = match component_tree(compilation, tree, component::LEFT) {
        Some(left) => compile_parameter(root, compilation, left)?,
        None => match base {
            Some(base) => at(compilation, tree, InstructionKind::PushConst(base)),
            None => {
                return Err(crate::error::CompileError::new(
                    format!("{what} is missing its left operand"),
                    compilation.document().name(),
                    compilation.trees().reference(tree),
                ))
            }
        },
    };
    Ok((left, right))
}

/// A compiler emitting `left, right, tail…`.
fn binary_compiler(
    what: &'static str,
    base: Option<Value>,
    tail: Vec<InstructionKind>,
) -> Box<dyn Compiler> {
    Box::new(FnCompiler(
        move |root: &dyn Compiler, compilation: &Compilation, tree| -> Compiled {
            let (left, right) = sides(root, compilation, tree, base.clone(), what)?;
            let mut children = vec![left, right];
            children.extend(tail.iter().cloned().map(Instruction::bare));
            Ok(Some(block(compilation, tree, children)))
        },
    ))
}

pub fn adder() -> Spec {
    Operator {
        name: "adder",
        symbol_pattern: r"\+",
        symbol_kind: "symbol:plus",
        wrapper_kind: "operator:adder",
    }
    .spec(
        Options {
            allow_missing_left: true,
            bounds: ADDITIVE,
            ..Options::default()
        },
        binary_compiler(
            "the operator + ",
            Some(Value::Number(Number::from(0))),
            vec![InstructionKind::Sum],
        ),
    )
}

pub fn subtractor() -> Spec {
    Operator {
        name: "subtractor",
        symbol_pattern: r"-",
        symbol_kind: "symbol:minus",
        wrapper_kind: "operator:subtractor",
    }
    .spec(
        Options {
            allow_missing_left: true,
            bounds: ADDITIVE,
            ..Options::default()
        },
        binary_compiler(
            "the operator - ",
            Some(Value::Number(Number::from(0))),
            vec![InstructionKind::Difference],
        ),
    )
}

pub fn multiplier() -> Spec {
    Operator {
        name: "multiplier",
        symbol_pattern: r"\*",
        symbol_kind: "symbol:star",
        wrapper_kind: "operator:multiplier",
    }
    .spec(
        Options {
            bounds: MULTIPLICATIVE,
            ..Options::default()
        },
        binary_compiler("the operator * ", None, vec![InstructionKind::Multiply]),
    )
}

pub fn divider() -> Spec {
    Operator {
        name: "divider",
        symbol_pattern: r"/",
        symbol_kind: "symbol:slash",
        wrapper_kind: "operator:divider",
    }
    .spec(
        Options {
            bounds: MULTIPLICATIVE,
            ..Options::default()
        },
        binary_compiler("the operator / ", None, vec![InstructionKind::Quotient]),
    )
}

pub fn modulo() -> Spec {
    Operator {
        name: "modulo",
        symbol_pattern: r"%",
        symbol_kind: "symbol:percent",
        wrapper_kind: "operator:modulo",
    }
    .spec(
        Options {
            bounds: MULTIPLICATIVE,
            ..Options::default()
        },
        binary_compiler("the operator % ", None, vec![InstructionKind::Modulo]),
    )
}

pub fn logical_and() -> Spec {
    Operator {
        name: "logical-and",
        symbol_pattern: r"&&",
        symbol_kind: "symbol:and",
        wrapper_kind: "operator:and",
    }
    .spec(
        Options {
            bounds: &["symbol:and"],
            ..Options::default()
        },
        binary_compiler("the operator && ", None, vec![InstructionKind::And]),
    )
}

pub fn logical_or() -> Spec {
    Operator {
        name: "logical-or",
        symbol_pattern: r"\|\|",
        symbol_kind: "symbol:or",
        wrapper_kind: "operator:or",
    }
    .spec(
        Options {
            bounds: &["symbol:or"],
            ..Options::default()
        },
        binary_compiler("the operator || ", None, vec![InstructionKind::Or]),
    )
}

pub fn equals() -> Spec {
    Operator {
        name: "equals",
        symbol_pattern: r"==",
        symbol_kind: "symbol:equals",
        wrapper_kind: "operator:equals",
    }
    .spec(
        Options {
            bounds: EQUALITY,
            ..Options::default()
        },
        binary_compiler(
            "the operator == ",
            None,
            vec![
                InstructionKind::Compare,
                InstructionKind::CastBoolean,
                InstructionKind::Negate,
            ],
        ),
    )
}

pub fn not_equals() -> Spec {
    Operator {
        name: "not-equals",
        symbol_pattern: r"!=",
        symbol_kind: "symbol:not-equals",
        wrapper_kind: "operator:not-equals",
    }
    .spec(
        Options {
            bounds: EQUALITY,
            ..Options::default()
        },
        binary_compiler(
            "the operator != ",
            None,
            vec![InstructionKind::Compare, InstructionKind::CastBoolean],
        ),
    )
}

/// `a < b` is `compare(compare(a, b), -1) == 0`: the comparison result is
/// itself compared with the expected ordering, then negated through a
/// boolean cast.
fn comparison(expected: i64, negate: bool) -> Vec<InstructionKind> {
    let mut tail = vec![
        InstructionKind::Compare,
        InstructionKind::PushConst(Value::Number(Number::from(expected))),
        InstructionKind::Compare,
        InstructionKind::CastBoolean,
    ];
    if negate {
        tail.push(InstructionKind::Negate);
    }
    tail
}

pub fn less_than() -> Spec {
    Operator {
        name: "less-than",
        symbol_pattern: r"<",
        symbol_kind: "symbol:less",
        wrapper_kind: "operator:less",
    }
    .spec(
        Options {
            bounds: COMPARISON,
            ..Options::default()
        },
        binary_compiler("the operator < ", None, comparison(-1, true)),
    )
}

pub fn less_or_equal() -> Spec {
    Operator {
        name: "less-or-equal",
        symbol_pattern: r"<=",
        symbol_kind: "symbol:less-equal",
        wrapper_kind: "operator:less-equal",
    }
    .spec(
        Options {
            bounds: COMPARISON,
            ..Options::default()
        },
        binary_compiler("the operator <= ", None, comparison(1, false)),
    )
}

pub fn more_than() -> Spec {
    Operator {
        name: "more-than",
        symbol_pattern: r">",
        symbol_kind: "symbol:more",
        wrapper_kind: "operator:more",
    }
    .spec(
        Options {
            bounds: COMPARISON,
            ..Options::default()
        },
        binary_compiler("the operator > ", None, comparison(1, true)),
    )
}

pub fn more_or_equal() -> Spec {
    Operator {
        name: "more-or-equal",
        symbol_pattern: r">=",
        symbol_kind: "symbol:more-equal",
        wrapper_kind: "operator:more-equal",
    }
    .spec(
        Options {
            bounds: COMPARISON,
            ..Options::default()
        },
        binary_compiler("the operator >= ", None, comparison(-1, false)),
    )
}

/// `key:value` inside an object slot.
pub fn pair() -> Spec {
    Operator {
        name: "pair",
        symbol_pattern: r":",
        symbol_kind: kind::COLON,
        wrapper_kind: "operator:pair",
    }
    .spec(
        Options {
            context: Some(Query::within(Query::is(kind::SLOT))),
            bounds: &[kind::COLON],
            ..Options::default()
        },
        Box::new(FnCompiler(
            |root: &dyn Compiler, compilation: &Compilation, tree| -> Compiled {
                let (left, right) = sides(root, compilation, tree, None, "the pair")?;
                Ok(Some(block(
                    compilation,
                    tree,
                    vec![
                        at(compilation, tree, InstructionKind::PushFrame),
                        left,
                        right,
                        Instruction::bare(InstructionKind::GlueFrame),
                        Instruction::bare(InstructionKind::DumpFrame),
                        Instruction::bare(InstructionKind::CastPair),
                    ],
                )))
            },
        )),
    )
}

/// Boolean not: a prefix operator.
pub fn negation() -> Spec {
    let analyzer = BinaryOperatorAnalyzer {
        wrapper_kind: "operator:negation",
        wrapper_weight: weight::DEFAULT,
        side_kind: kind::PARAMETER,
        side_weight: weight::PARAMETER,
        allow_missing_left: true,
        rightmost_of: None,
        operand_bounds: &[],
    };
    Spec::new("negation")
        .with_parser(Box::new(TermParser::new(
            r"!",
            "symbol:not",
            weight::DEFAULT,
        )))
        .with_analyzer(Box::new(HierarchyAnalyzer::new(Box::new(
            FilterAnalyzer::new(
                Box::new(analyzer),
                Query::and(vec![
                    Query::is("symbol:not"),
                    Query::parent(Query::not(Query::is("operator:negation"))),
                ]),
            ),
        ))))
        .with_compiler(Box::new(FilterCompiler::new(
            Box::new(FnCompiler(
                |root: &dyn Compiler, compilation: &Compilation, tree| -> Compiled {
                    let operand =
                        required_component(compilation, tree, component::RIGHT, "the operator !")?;
                    let operand = compile_parameter(root, compilation, operand)?;
                    Ok(Some(block(
                        compilation,
                        tree,
                        vec![operand, Instruction::bare(InstructionKind::Negate)],
                    )))
                },
            )),
            Query::is("operator:negation"),
        )))
}

/// `value.member`: the rightmost dot wraps first so chains select from
/// the left.
pub fn getter() -> Spec {
    Operator {
        name: "getter",
        symbol_pattern: r"\.",
        symbol_kind: "symbol:dot",
        wrapper_kind: "operator:getter",
    }
    .spec(
        Options {
            rightmost: true,
            ..Options::default()
        },
        Box::new(FnCompiler(
            |root: &dyn Compiler, compilation: &Compilation, tree| -> Compiled {
                let left =
                    required_component(compilation, tree, component::LEFT, "the member access")?;
                let right =
                    required_component(compilation, tree, component::RIGHT, "the member access")?;
                let left = compile_parameter(root, compilation, left)?;
                let key = match single_reference(compilation, right) {
                    // a bare name keys the member directly
                    Some(name) => at(
                        compilation,
                        right,
                        InstructionKind::PushConst(Value::text(name)),
                    ),
                    None => {
                        let compiled = compile_parameter(root, compilation, right)?;
                        block(
                            compilation,
                            right,
                            vec![compiled, Instruction::bare(InstructionKind::Eval)],
                        )
                    }
                };
                Ok(Some(block(
                    compilation,
                    tree,
                    vec![left, key, Instruction::bare(InstructionKind::Get)],
                )))
            },
        )),
    )
}

/// The name under `tree` when its content is one bare reference.
fn single_reference(compilation: &Compilation, tree: TreeId) -> Option<String> {
    let children = compilation.trees().children(tree);
    let [only] = children.as_slice() else {
        return None;
    };
    if compilation.kind(*only) != kind::REFERENCE {
        return None;
    }
    let name = compilation.read(*only);
    (compilation.read(tree).trim() == name).then(|| name.to_string())
}
