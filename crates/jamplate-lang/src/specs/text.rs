//! The last-resort renderer: any tree no other compiler claimed prints
//! its children and raw gap text verbatim.

use crate::compile::{Compiler, FnCompiler};
use crate::compilation::Compilation;
use crate::spec::Spec;

use super::support::compile_body;

pub fn spec() -> Spec {
    Spec::new("text").with_compiler(Box::new(FnCompiler(
        |root: &dyn Compiler, c: &Compilation, t| Ok(Some(compile_body(root, c, t)?)),
    )))
}
