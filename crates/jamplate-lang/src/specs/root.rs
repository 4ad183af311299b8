//! The document root: seeds the builtin addresses, then renders every
//! child in document order.

use std::path::Path;

use crate::analyze::Query;
use crate::compilation::Compilation;
use crate::compile::{Compiler, FilterCompiler, FnCompiler};
use crate::instruction::{Instruction, InstructionKind};
use crate::number::Number;
use crate::spec::Spec;
use crate::value::Value;

use super::support::{at, block, compile_flat, push_text, Gaps};
use super::{address, kind, weight};

pub fn spec() -> Spec {
    Spec::new("root")
        .with_initializer(Box::new(|document| {
            Compilation::new(document.clone(), kind::ROOT, weight::ROOT)
        }))
        .with_compiler(Box::new(FilterCompiler::new(
            Box::new(FnCompiler(|root: &dyn Compiler, c: &Compilation, t| {
                let path = c.document().name().to_string();
                let file = Path::new(&path)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                let dir = Path::new(&path)
                    .parent()
                    .map(|d| d.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let mut children = Vec::new();
                for (name, value) in [
                    (address::FILE, Value::text(file)),
                    (address::PATH, Value::text(path)),
                    (address::DIR, Value::text(dir)),
                    (address::LINE, Value::Number(Number::from(1))),
                ] {
                    children.push(push_text(c, t, name));
                    children.push(at(c, t, InstructionKind::PushConst(value)));
                    children.push(Instruction::bare(InstructionKind::Alloc));
                }
                children.extend(compile_flat(
                    root,
                    c,
                    t,
                    c.trees().reference(t),
                    Gaps::Print,
                )?);
                Ok(Some(block(c, t, children)))
            })),
            Query::is(kind::ROOT),
        )))
}
