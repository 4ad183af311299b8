//! The inline expression `#{ … }#`.

use crate::analyze::Query;
use crate::compile::{Compiler, FilterCompiler, FnCompiler};
use crate::compilation::Compilation;
use crate::instruction::{Instruction, InstructionKind};
use crate::parse::DoublePatternParser;
use crate::spec::Spec;

use super::support::{block, body_region, compile_parameter_region};
use super::{kind, weight};

pub fn spec() -> Spec {
    Spec::new("injection")
        .with_parser(Box::new(DoublePatternParser::new(
            r"#\{",
            r"\}#",
            kind::INJECTION,
            weight::DEFAULT,
        )))
        .with_compiler(Box::new(FilterCompiler::new(
            Box::new(FnCompiler(|root: &dyn Compiler, c: &Compilation, t| {
                let parameter = compile_parameter_region(root, c, t, body_region(c, t))?;
                Ok(Some(block(
                    c,
                    t,
                    vec![
                        parameter,
                        Instruction::bare(InstructionKind::Eval),
                        Instruction::bare(InstructionKind::Print),
                    ],
                )))
            })),
            Query::is(kind::INJECTION),
        )))
}
