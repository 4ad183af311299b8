//! The stack-machine instruction set.
//!
//! Each instruction carries an optional source location for diagnostics
//! and executes against an environment and a memory. Compound
//! instructions expose their children through
//! [`Instruction::sub_instructions`].

use crate::compilation::Environment;
use crate::diagnostic::Severity;
use crate::error::ExecutionError;
use crate::memory::{Location, Memory};
use crate::number::Number;
use crate::value::{cast, Value};

/// An execution failure bound to the instruction that raised it.
#[derive(Debug, thiserror::Error)]
#[error("{cause}")]
pub struct ExecutionFault {
    pub cause: ExecutionError,
    pub location: Option<Location>,
}

/// One operation of the stack machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    location: Option<Location>,
    kind: InstructionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    // resource
    /// Push a constant value.
    PushConst(Value),
    /// Do nothing.
    Idle,

    // stack
    Pop,
    Dup,
    Swap,
    /// Pop, render against the memory, re-tokenize, unquote, push.
    Eval,

    // frame
    PushFrame,
    /// Pop the top frame; console merges down, the operand stack is
    /// discarded.
    PopFrame,
    /// Pop the top frame; console merges down, the operand stack moves
    /// down.
    DumpFrame,
    /// Fold the current frame's operand stack into a single glue.
    GlueFrame,
    /// Fold the current frame's operand stack into a single text.
    JoinFrame,

    // heap
    /// Pop a value then a name; store globally (root frame).
    Alloc,
    /// Pop a value then a name; store in the top frame.
    Set,
    /// Pop a name; push the addressed value, or the name itself as text
    /// when nothing is allocated under it.
    Access,
    /// Pop an object; allocate every entry globally.
    Spread,

    // cast
    CastText,
    CastBoolean,
    CastNumber,
    CastArray,
    CastObject,
    CastPair,
    CastQuote,
    CastGlue,
    /// Fold the run of pairs on top of the stack into an object.
    BuildObject,

    // math
    /// Numeric addition when both operands are numbers, text
    /// concatenation otherwise.
    Sum,
    Difference,
    Multiply,
    Quotient,
    Modulo,

    // logic
    /// Boolean not.
    Negate,
    And,
    Or,
    /// Push the comparison of the two popped values as -1, 0 or 1.
    Compare,
    /// Push whether the popped value is not null.
    Defined,

    // structure
    /// Pop a key then a structure; push the member under the key.
    Get,
    /// Pop a value, a key, then a structure; push the updated structure.
    Put,
    /// Pop a value, a key path (array), then a structure; push the
    /// structure with a nested put along the path.
    Touch,
    /// Pop an array; push its elements in order.
    Split,
    /// Pop an array; push it reversed.
    Reverse,

    // i/o
    /// Pop; append the rendering to the innermost console.
    Print,
    /// Pop an object of replacements then a value; print the rendering
    /// with the replacements applied.
    FPrint,
    /// Pop; record the rendering on the diagnostic error stream.
    Serr,
    /// Pop; record the rendering as the console target name.
    Console,

    // flow
    /// Execute children left to right in the current frame.
    Block(Vec<Instruction>),
    /// Pop a boolean; execute the first child when true, the second
    /// otherwise.
    Branch(Vec<Instruction>),
    /// Pop a boolean; stop when false, otherwise run the body (which must
    /// push the next boolean) and repeat.
    Repeat(Vec<Instruction>),
    /// Run the body with its console redirected onto the operand stack.
    Capture(Vec<Instruction>),
    /// Pop a document name; execute that compilation's instruction in the
    /// current memory.
    Include,
}

impl Instruction {
    pub fn new(kind: InstructionKind, location: Option<Location>) -> Self {
        Self { location, kind }
    }

    /// An instruction with no source location.
    pub fn bare(kind: InstructionKind) -> Self {
        Self {
            location: None,
            kind,
        }
    }

    pub fn block(location: Option<Location>, children: Vec<Instruction>) -> Self {
        Self::new(InstructionKind::Block(children), location)
    }

    pub fn branch(location: Option<Location>, then: Instruction, fallback: Instruction) -> Self {
        Self::new(InstructionKind::Branch(vec![then, fallback]), location)
    }

    pub fn repeat(location: Option<Location>, body: Instruction) -> Self {
        Self::new(InstructionKind::Repeat(vec![body]), location)
    }

    pub fn capture(location: Option<Location>, body: Instruction) -> Self {
        Self::new(InstructionKind::Capture(vec![body]), location)
    }

    pub fn idle() -> Self {
        Self::bare(InstructionKind::Idle)
    }

    pub fn kind(&self) -> &InstructionKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// The direct children of a compound instruction.
    pub fn sub_instructions(&self) -> &[Instruction] {
        match &self.kind {
            InstructionKind::Block(children)
            | InstructionKind::Branch(children)
            | InstructionKind::Repeat(children)
            | InstructionKind::Capture(children) => children,
            _ => &[],
        }
    }

    /// Execute this instruction.
    pub fn exec(
        &self,
        environment: &mut Environment,
        memory: &mut Memory,
    ) -> Result<(), ExecutionFault> {
        match &self.kind {
            InstructionKind::Block(children) => {
                for child in children {
                    child.exec(environment, memory)?;
                }
                Ok(())
            }
            InstructionKind::Branch(arms) => {
                let condition = self
                    .run(memory, |memory| {
                        let value = memory.pop()?;
                        cast::boolean(&value, memory)
                    })?;
                let arm = if condition { &arms[0] } else { &arms[1] };
                arm.exec(environment, memory)
            }
            InstructionKind::Repeat(body) => {
                loop {
                    let condition = self
                        .run(memory, |memory| {
                            let value = memory.pop()?;
                            cast::boolean(&value, memory)
                        })?;
                    if !condition {
                        return Ok(());
                    }
                    body[0].exec(environment, memory)?;
                }
            }
            InstructionKind::Capture(body) => {
                memory.push_frame(self.location.clone());
                let result = body[0].exec(environment, memory);
                let frame = memory.capture_frame().map_err(|cause| self.fault(cause))?;
                result?;
                let (_, console) = frame.into_parts();
                memory.push(Value::Text(console));
                Ok(())
            }
            InstructionKind::Include => {
                let name = self.run(memory, |memory| {
                    let value = memory.pop()?;
                    Ok(value.eval(memory)?.trim().to_string())
                })?;
                let instruction = environment
                    .get(&name)
                    .and_then(|compilation| compilation.instruction().cloned())
                    .ok_or_else(|| self.fault(ExecutionError::UnknownDocument(name.into())))?;
                self.run(memory, Memory::enter_include)?;
                let outcome = instruction.exec(environment, memory);
                memory.leave_include();
                outcome
            }
            InstructionKind::Serr => {
                let message = self.run(memory, |memory| {
                    let value = memory.pop()?;
                    Ok(value.eval(memory)?)
                })?;
                environment.diagnose_at(Severity::Error, message, self.location.as_ref());
                Ok(())
            }
            _ => self.run(memory, |memory| self.exec_simple(memory)),
        }
    }

    /// Run a closure over the memory, binding failures to this
    /// instruction's location.
    fn run<T>(
        &self,
        memory: &mut Memory,
        body: impl FnOnce(&mut Memory) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionFault> {
        body(memory).map_err(|cause| self.fault(cause))
    }

    fn fault(&self, cause: ExecutionError) -> ExecutionFault {
        ExecutionFault {
            cause,
            location: self.location.clone(),
        }
    }

    /// The instructions that touch only the memory.
    fn exec_simple(&self, memory: &mut Memory) -> Result<(), ExecutionError> {
        match &self.kind {
            InstructionKind::PushConst(value) => {
                memory.push(value.clone());
                Ok(())
            }
            InstructionKind::Idle => Ok(()),

            InstructionKind::Pop => memory.pop().map(|_| ()),
            InstructionKind::Dup => {
                let top = memory.peek().cloned().ok_or(ExecutionError::StackUnderflow)?;
                memory.push(top);
                Ok(())
            }
            InstructionKind::Swap => {
                let a = memory.pop()?;
                let b = memory.pop()?;
                memory.push(a);
                memory.push(b);
                Ok(())
            }
            InstructionKind::Eval => {
                let value = memory.pop()?;
                let rendered = value.eval(memory)?;
                memory.push(Value::parse(&rendered).unquote());
                Ok(())
            }

            InstructionKind::PushFrame => {
                memory.push_frame(self.location.clone());
                Ok(())
            }
            InstructionKind::PopFrame => memory.pop_frame(),
            InstructionKind::DumpFrame => memory.dump_frame(),
            InstructionKind::GlueFrame => {
                let stack = memory.replace_stack(Vec::new());
                memory.push(cast::fold_glue(stack));
                Ok(())
            }
            InstructionKind::JoinFrame => {
                let stack = memory.replace_stack(Vec::new());
                let joined: Result<Vec<_>, _> =
                    stack.iter().map(|value| value.eval(memory)).collect();
                memory.push(Value::Text(joined?.concat()));
                Ok(())
            }

            InstructionKind::Alloc => {
                let value = memory.pop()?;
                let name = memory.pop()?;
                let name = name.eval(memory)?.trim().to_string();
                memory.alloc(name, value);
                Ok(())
            }
            InstructionKind::Set => {
                let value = memory.pop()?;
                let name = memory.pop()?;
                let name = name.eval(memory)?.trim().to_string();
                memory.set(name, value);
                Ok(())
            }
            InstructionKind::Access => {
                let name = memory.pop()?;
                let name = name.eval(memory)?.trim().to_string();
                let value = memory
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| Value::Text(name));
                memory.push(value);
                Ok(())
            }
            InstructionKind::Spread => {
                let value = memory.pop()?;
                let Value::Object(entries) = cast::object(value, memory)? else {
                    unreachable!("cast::object yields an object");
                };
                for (key, value) in entries {
                    let name = key.eval(memory)?.trim().to_string();
                    memory.alloc(name, value);
                }
                Ok(())
            }

            InstructionKind::CastText => {
                let value = memory.pop()?;
                let text = cast::text(value, memory)?;
                memory.push(text);
                Ok(())
            }
            InstructionKind::CastBoolean => {
                let value = memory.pop()?;
                let boolean = cast::boolean(&value, memory)?;
                memory.push(Value::Boolean(boolean));
                Ok(())
            }
            InstructionKind::CastNumber => {
                let value = memory.pop()?;
                let number = cast::number(&value, memory)?;
                memory.push(Value::Number(number));
                Ok(())
            }
            InstructionKind::CastArray => {
                let value = memory.pop()?;
                let array = cast::array(value, memory)?;
                memory.push(array);
                Ok(())
            }
            InstructionKind::CastObject => {
                let value = memory.pop()?;
                let object = cast::object(value, memory)?;
                memory.push(object);
                Ok(())
            }
            InstructionKind::CastPair => {
                let value = memory.pop()?;
                let pair = cast::pair(value, memory)?;
                memory.push(pair);
                Ok(())
            }
            InstructionKind::CastQuote => {
                let value = memory.pop()?;
                memory.push(cast::quote(value));
                Ok(())
            }
            InstructionKind::CastGlue => {
                let value = memory.pop()?;
                memory.push(cast::glue(value));
                Ok(())
            }
            InstructionKind::BuildObject => {
                let mut entries = Vec::new();
                while matches!(memory.peek(), Some(Value::Pair(_, _))) {
                    let Value::Pair(key, value) = memory.pop()? else {
                        unreachable!("peeked a pair");
                    };
                    entries.push((*key, *value));
                }
                entries.reverse();
                memory.push(Value::Object(entries));
                Ok(())
            }

            InstructionKind::Sum => {
                let right = memory.pop()?;
                let left = memory.pop()?;
                match (&left, &right) {
                    (Value::Number(l), Value::Number(r)) => {
                        memory.push(Value::Number(*l + *r));
                    }
                    _ => {
                        let text = format!(
                            "{}{}",
                            cast::text_of(&left, memory)?,
                            cast::text_of(&right, memory)?
                        );
                        memory.push(Value::Text(text));
                    }
                }
                Ok(())
            }
            InstructionKind::Difference => self.arithmetic(memory, |l, r| l - r),
            InstructionKind::Multiply => self.arithmetic(memory, |l, r| l * r),
            InstructionKind::Quotient => self.arithmetic(memory, |l, r| l / r),
            InstructionKind::Modulo => self.arithmetic(memory, |l, r| l % r),

            InstructionKind::Negate => {
                let value = memory.pop()?;
                let boolean = cast::boolean(&value, memory)?;
                memory.push(Value::Boolean(!boolean));
                Ok(())
            }
            InstructionKind::And => {
                let right = memory.pop()?;
                let left = memory.pop()?;
                let result = cast::boolean(&left, memory)? && cast::boolean(&right, memory)?;
                memory.push(Value::Boolean(result));
                Ok(())
            }
            InstructionKind::Or => {
                let right = memory.pop()?;
                let left = memory.pop()?;
                let result = cast::boolean(&left, memory)? || cast::boolean(&right, memory)?;
                memory.push(Value::Boolean(result));
                Ok(())
            }
            InstructionKind::Compare => {
                let right = memory.pop()?;
                let left = memory.pop()?;
                let ordering = match (&left, &right) {
                    (Value::Number(l), Value::Number(r)) => l.cmp(r),
                    _ => left.eval(memory)?.cmp(&right.eval(memory)?),
                };
                memory.push(Value::Number(Number::from(ordering as i64)));
                Ok(())
            }
            InstructionKind::Defined => {
                let value = memory.pop()?;
                memory.push(Value::Boolean(!value.is_null()));
                Ok(())
            }

            InstructionKind::Get => {
                let key = memory.pop()?;
                let target = memory.pop()?;
                let member = structure_get(&target, &key, memory)?;
                memory.push(member);
                Ok(())
            }
            InstructionKind::Put => {
                let value = memory.pop()?;
                let key = memory.pop()?;
                let target = memory.pop()?;
                let updated = structure_put(target, key, value, memory)?;
                memory.push(updated);
                Ok(())
            }
            InstructionKind::Touch => {
                let value = memory.pop()?;
                let path = memory.pop()?;
                let target = memory.pop()?;
                let Value::Array(path) = cast::array(path, memory)? else {
                    unreachable!("cast::array yields an array");
                };
                let updated = structure_touch(target, &path, value, memory)?;
                memory.push(updated);
                Ok(())
            }
            InstructionKind::Split => {
                let value = memory.pop()?;
                let Value::Array(items) = cast::array(value, memory)? else {
                    unreachable!("cast::array yields an array");
                };
                for item in items {
                    memory.push(item);
                }
                Ok(())
            }
            InstructionKind::Reverse => {
                let value = memory.pop()?;
                let Value::Array(mut items) = cast::array(value, memory)? else {
                    unreachable!("cast::array yields an array");
                };
                items.reverse();
                memory.push(Value::Array(items));
                Ok(())
            }

            InstructionKind::Print => {
                let value = memory.pop()?;
                let text = value.eval(memory)?;
                memory.print(&text);
                Ok(())
            }
            InstructionKind::FPrint => {
                let replacements = memory.pop()?;
                let value = memory.pop()?;
                let Value::Object(entries) = cast::object(replacements, memory)? else {
                    unreachable!("cast::object yields an object");
                };
                let mut text = value.eval(memory)?;
                for (key, replacement) in entries {
                    let key = key.eval(memory)?;
                    let replacement = replacement.eval(memory)?;
                    text = text.replace(&key, &replacement);
                }
                memory.print(&text);
                Ok(())
            }
            InstructionKind::Console => {
                let value = memory.pop()?;
                let target = value.eval(memory)?.trim().to_string();
                memory.set_console_target(target);
                Ok(())
            }

            InstructionKind::Block(_)
            | InstructionKind::Branch(_)
            | InstructionKind::Repeat(_)
            | InstructionKind::Capture(_)
            | InstructionKind::Include
            | InstructionKind::Serr => unreachable!("handled by exec"),
        }
    }

    fn arithmetic(
        &self,
        memory: &mut Memory,
        op: impl FnOnce(Number, Number) -> Number,
    ) -> Result<(), ExecutionError> {
        let right = memory.pop()?;
        let left = memory.pop()?;
        let left = cast::number(&left, memory)?;
        let right = cast::number(&right, memory)?;
        memory.push(Value::Number(op(left, right)));
        Ok(())
    }
}

fn structure_get(
    target: &Value,
    key: &Value,
    memory: &Memory,
) -> Result<Value, ExecutionError> {
    match target {
        Value::Object(entries) => {
            let key = key.eval(memory)?;
            for (candidate, value) in entries {
                if candidate.eval(memory)? == key {
                    return Ok(value.clone());
                }
            }
            Ok(Value::Null)
        }
        Value::Array(items) => {
            let index = cast::number(key, memory)?.to_int();
            if index >= 0 {
                Ok(items.get(index as usize).cloned().unwrap_or(Value::Null))
            } else {
                Ok(Value::Null)
            }
        }
        Value::Text(_) | Value::Glue(_) | Value::Quote(_) => {
            let parsed = Value::parse(&target.eval(memory)?);
            match parsed {
                Value::Object(_) | Value::Array(_) => structure_get(&parsed, key, memory),
                _ => Ok(Value::Null),
            }
        }
        _ => Err(ExecutionError::UnexpectedValue {
            expected: "a structure",
            got: target.eval(memory)?,
        }),
    }
}

fn structure_put(
    target: Value,
    key: Value,
    value: Value,
    memory: &Memory,
) -> Result<Value, ExecutionError> {
    match target {
        Value::Object(mut entries) => {
            let rendered = key.eval(memory)?;
            for (candidate, slot) in entries.iter_mut() {
                if candidate.eval(memory)? == rendered {
                    *slot = value;
                    return Ok(Value::Object(entries));
                }
            }
            entries.push((key, value));
            Ok(Value::Object(entries))
        }
        Value::Array(mut items) => {
            let index = cast::number(&key, memory)?.to_int();
            let index = usize::try_from(index).map_err(|_| ExecutionError::UnexpectedValue {
                expected: "a non-negative index",
                got: key.eval(memory).unwrap_or_default(),
            })?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items[index] = value;
            Ok(Value::Array(items))
        }
        Value::Null => Ok(Value::Object(vec![(key, value)])),
        other => {
            let parsed = Value::parse(&other.eval(memory)?);
            match parsed {
                Value::Object(_) | Value::Array(_) => structure_put(parsed, key, value, memory),
                _ => Err(ExecutionError::UnexpectedValue {
                    expected: "a structure",
                    got: other.eval(memory)?,
                }),
            }
        }
    }
}

fn structure_touch(
    target: Value,
    path: &[Value],
    value: Value,
    memory: &Memory,
) -> Result<Value, ExecutionError> {
    match path {
        [] => Ok(value),
        [key, rest @ ..] => {
            let member = match &target {
                Value::Object(_) | Value::Array(_) => structure_get(&target, key, memory)?,
                _ => Value::Null,
            };
            let updated = structure_touch(member, rest, value, memory)?;
            // a non-structure base is replaced by a fresh object
            structure_put(
                match target {
                    Value::Object(_) | Value::Array(_) => target,
                    _ => Value::Object(Vec::new()),
                },
                key.clone(),
                updated,
                memory,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rstest::rstest;

    use InstructionKind as K;

    fn exec(instructions: Vec<InstructionKind>) -> (Environment, Memory) {
        let mut environment = Environment::new();
        let mut memory = Memory::new();
        let block = Instruction::block(None, instructions.into_iter().map(Instruction::bare).collect_vec());
        block.exec(&mut environment, &mut memory).unwrap();
        (environment, memory)
    }

    #[test]
    fn test_push_and_print() {
        let (_, memory) = exec(vec![K::PushConst(Value::number(17)), K::Print]);
        assert_eq!(memory.console(), "17");
    }

    #[test]
    fn test_sum_adds_numbers_and_concatenates_text() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::number(1)),
            K::PushConst(Value::number(2)),
            K::Sum,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::number(3));

        let (_, mut memory) = exec(vec![
            K::PushConst(Value::Boolean(true)),
            K::PushConst(Value::Boolean(false)),
            K::Sum,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::text("truefalse"));
    }

    #[rstest]
    #[case(K::Difference, 5.0, 2.0, 3.0)]
    #[case(K::Multiply, 5.0, 2.0, 10.0)]
    #[case(K::Quotient, 5.0, 2.0, 2.5)]
    #[case(K::Modulo, 5.0, 2.0, 1.0)]
    fn test_arithmetic(
        #[case] op: InstructionKind,
        #[case] left: f64,
        #[case] right: f64,
        #[case] expected: f64,
    ) {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::number(left)),
            K::PushConst(Value::number(right)),
            op,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::number(expected));
    }

    #[rstest]
    #[case(5.0, 3.0, 1)]
    #[case(3.0, 5.0, -1)]
    #[case(3.0, 3.0, 0)]
    fn test_compare(#[case] left: f64, #[case] right: f64, #[case] expected: i64) {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::number(left)),
            K::PushConst(Value::number(right)),
            K::Compare,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::number(expected));
    }

    #[test]
    fn test_access_falls_back_to_the_address_text() {
        let (_, mut memory) = exec(vec![K::PushConst(Value::text("missing")), K::Access]);
        assert_eq!(memory.pop().unwrap(), Value::text("missing"));
    }

    #[test]
    fn test_alloc_and_access() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::text("x")),
            K::PushConst(Value::number(4)),
            K::Alloc,
            K::PushConst(Value::text("x")),
            K::Access,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::number(4));
    }

    #[test]
    fn test_eval_unquotes() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::quote(Value::text("v"))),
            K::Eval,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::text("v"));
    }

    #[test]
    fn test_build_object_and_get() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::pair(Value::text("a"), Value::number(1))),
            K::PushConst(Value::pair(Value::text("b"), Value::number(2))),
            K::BuildObject,
            K::PushConst(Value::text("b")),
            K::Get,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::number(2));
    }

    #[test]
    fn test_split_then_build_object_round_trips() {
        let pairs = vec![
            Value::pair(Value::text("a"), Value::number(1)),
            Value::pair(Value::text("b"), Value::number(2)),
        ];
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::Array(pairs.clone())),
            K::Split,
            K::BuildObject,
        ]);
        let object = memory.pop().unwrap();
        assert_eq!(
            object,
            Value::Object(vec![
                (Value::text("a"), Value::number(1)),
                (Value::text("b"), Value::number(2)),
            ])
        );
    }

    #[test]
    fn test_put_replaces_and_appends() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::Object(vec![(Value::text("a"), Value::number(1))])),
            K::PushConst(Value::text("a")),
            K::PushConst(Value::number(2)),
            K::Put,
            K::PushConst(Value::text("b")),
            K::PushConst(Value::number(3)),
            K::Put,
        ]);
        assert_eq!(
            memory.pop().unwrap(),
            Value::Object(vec![
                (Value::text("a"), Value::number(2)),
                (Value::text("b"), Value::number(3)),
            ])
        );
    }

    #[test]
    fn test_touch_creates_nested_structure() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::Null),
            K::PushConst(Value::Array(vec![Value::text("a"), Value::text("b")])),
            K::PushConst(Value::number(9)),
            K::Touch,
        ]);
        let expected = Value::Object(vec![(
            Value::text("a"),
            Value::Object(vec![(Value::text("b"), Value::number(9))]),
        )]);
        assert_eq!(memory.pop().unwrap(), expected);
    }

    #[test]
    fn test_branch_takes_the_right_arm() {
        let mut environment = Environment::new();
        let mut memory = Memory::new();
        let instruction = Instruction::block(
            None,
            vec![
                Instruction::bare(K::PushConst(Value::Boolean(false))),
                Instruction::branch(
                    None,
                    Instruction::bare(K::PushConst(Value::text("then"))),
                    Instruction::bare(K::PushConst(Value::text("else"))),
                ),
            ],
        );
        instruction.exec(&mut environment, &mut memory).unwrap();
        assert_eq!(memory.pop().unwrap(), Value::text("else"));
    }

    #[test]
    fn test_repeat_drains_a_spread_array() {
        // mirror of the loop template: print items until the null anchor
        let mut environment = Environment::new();
        let mut memory = Memory::new();
        let body = Instruction::block(
            None,
            vec![
                Instruction::bare(K::Print),
                Instruction::bare(K::Dup),
                Instruction::bare(K::Defined),
            ],
        );
        let instruction = Instruction::block(
            None,
            vec![
                Instruction::bare(K::PushConst(Value::Null)),
                Instruction::bare(K::PushConst(Value::Array(vec![
                    Value::number(3),
                    Value::number(2),
                    Value::number(1),
                ]))),
                Instruction::bare(K::Split),
                Instruction::bare(K::Dup),
                Instruction::bare(K::Defined),
                Instruction::repeat(None, body),
            ],
        );
        instruction.exec(&mut environment, &mut memory).unwrap();
        assert_eq!(memory.console(), "123");
    }

    #[test]
    fn test_capture_redirects_console_to_the_stack() {
        let mut environment = Environment::new();
        let mut memory = Memory::new();
        let body = Instruction::block(
            None,
            vec![
                Instruction::bare(K::PushConst(Value::text("inside"))),
                Instruction::bare(K::Print),
            ],
        );
        let instruction = Instruction::capture(None, body);
        instruction.exec(&mut environment, &mut memory).unwrap();
        assert_eq!(memory.pop().unwrap(), Value::text("inside"));
        assert_eq!(memory.console(), "");
    }

    #[test]
    fn test_glue_frame_folds_the_stack() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::text("a")),
            K::PushConst(Value::text("b")),
            K::GlueFrame,
        ]);
        assert_eq!(
            memory.pop().unwrap(),
            Value::Glue(vec![Value::text("a"), Value::text("b")])
        );
        assert!(memory.peek().is_none());
    }

    #[test]
    fn test_join_frame_folds_to_text() {
        let (_, mut memory) = exec(vec![
            K::PushConst(Value::text("x=")),
            K::PushConst(Value::number(1)),
            K::JoinFrame,
        ]);
        assert_eq!(memory.pop().unwrap(), Value::text("x=1"));
    }

    #[test]
    fn test_serr_records_a_diagnostic() {
        let (environment, _) = exec(vec![K::PushConst(Value::text("boom")), K::Serr]);
        assert!(environment.has_errors());
        assert_eq!(environment.diagnostics()[0].message, "boom");
    }

    #[test]
    fn test_stack_underflow_is_an_error() {
        let mut environment = Environment::new();
        let mut memory = Memory::new();
        let result = Instruction::bare(K::Pop).exec(&mut environment, &mut memory);
        assert!(matches!(
            result,
            Err(ExecutionFault {
                cause: ExecutionError::StackUnderflow,
                ..
            })
        ));
    }

    #[test]
    fn test_fprint_applies_replacements() {
        let (_, memory) = exec(vec![
            K::PushConst(Value::text("hello NAME")),
            K::PushConst(Value::Object(vec![(
                Value::text("NAME"),
                Value::text("world"),
            )])),
            K::FPrint,
        ]);
        assert_eq!(memory.console(), "hello world");
    }

    #[test]
    fn test_sub_instructions_exposes_children() {
        let block = Instruction::block(
            None,
            vec![Instruction::idle(), Instruction::bare(K::Pop)],
        );
        assert_eq!(block.sub_instructions().len(), 2);
        assert!(Instruction::idle().sub_instructions().is_empty());
    }
}
