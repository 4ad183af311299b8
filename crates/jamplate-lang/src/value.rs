//! The polymorphic runtime values and their text pipe protocol.
//!
//! Values are pure data; `eval` renders a value to text against a memory,
//! recursing through composites with a bounded depth. Quotes act as
//! stringification barriers: their content re-tokenizes back into a quote
//! instead of being interpreted as a literal collection or number.

use itertools::Itertools;

use crate::error::ExecutionError;
use crate::memory::Memory;
use crate::number::Number;

/// The deepest composite nesting `eval` will follow.
const MAX_EVAL_DEPTH: u32 = 64;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The designated absent value; renders as the empty string.
    #[default]
    Null,
    Text(String),
    Number(Number),
    Boolean(bool),
    Array(Vec<Value>),
    /// An ordered list of key/value entries.
    Object(Vec<(Value, Value)>),
    Pair(Box<Value>, Box<Value>),
    /// A single-quote-like wrapper preserving the literal form of its
    /// content.
    Quote(Box<Value>),
    /// The fused contents of a frame's operand stack.
    Glue(Vec<Value>),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Value {
        Value::Text(text.into())
    }

    pub fn number(number: impl Into<Number>) -> Value {
        Value::Number(number.into())
    }

    pub fn pair(key: Value, value: Value) -> Value {
        Value::Pair(Box::new(key), Box::new(value))
    }

    pub fn quote(value: Value) -> Value {
        Value::Quote(Box::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render this value to text against `memory`.
    pub fn eval(&self, memory: &Memory) -> Result<String, ExecutionError> {
        self.eval_at(memory, 0)
    }

    fn eval_at(&self, memory: &Memory, depth: u32) -> Result<String, ExecutionError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(ExecutionError::EvalDepth(MAX_EVAL_DEPTH));
        }
        Ok(match self {
            Value::Null => String::new(),
            Value::Text(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Boolean(boolean) => boolean.to_string(),
            Value::Quote(inner) => format!("'{}'", inner.eval_at(memory, depth + 1)?),
            Value::Array(items) => {
                let rendered: Result<Vec<_>, _> =
                    items.iter().map(|v| v.eval_at(memory, depth + 1)).collect();
                format!("[{}]", rendered?.join(","))
            }
            Value::Object(entries) => {
                let rendered: Result<Vec<_>, _> = entries
                    .iter()
                    .map(|(k, v)| {
                        Ok(format!(
                            "{}:{}",
                            k.eval_at(memory, depth + 1)?,
                            v.eval_at(memory, depth + 1)?
                        ))
                    })
                    .collect();
                format!("{{{}}}", rendered?.join(","))
            }
            Value::Pair(key, value) => format!(
                "{}:{}",
                key.eval_at(memory, depth + 1)?,
                value.eval_at(memory, depth + 1)?
            ),
            Value::Glue(parts) => {
                let rendered: Result<Vec<_>, _> =
                    parts.iter().map(|v| v.eval_at(memory, depth + 1)).collect();
                rendered?.concat()
            }
        })
    }

    /// Re-tokenize rendered text back into a value.
    ///
    /// Classification looks at the trimmed text, but a plain-text result
    /// keeps the original untrimmed form.
    pub fn parse(text: &str) -> Value {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Value::Text(text.to_string());
        }
        if trimmed == "true" {
            return Value::Boolean(true);
        }
        if trimmed == "false" {
            return Value::Boolean(false);
        }
        if let Some(number) = Number::parse(trimmed) {
            return Value::Number(number);
        }
        if let Some(inner) = strip_delimiters(trimmed, '\'', '\'')
            .or_else(|| strip_delimiters(trimmed, '"', '"'))
        {
            return Value::quote(Value::Text(inner.to_string()));
        }
        if let Some(inner) = strip_delimiters(trimmed, '[', ']') {
            return Value::Array(
                split_top_level(inner, ',')
                    .into_iter()
                    .filter(|part| !part.trim().is_empty())
                    .map(|part| Value::parse(&part))
                    .collect(),
            );
        }
        if let Some(inner) = strip_delimiters(trimmed, '{', '}') {
            return Value::Object(
                split_top_level(inner, ',')
                    .into_iter()
                    .filter(|part| !part.trim().is_empty())
                    .map(|part| {
                        let mut halves = split_top_level(&part, ':');
                        if halves.len() < 2 {
                            (Value::parse(&part), Value::Null)
                        } else {
                            let value = halves.split_off(1).join(":");
                            (Value::parse(&halves[0]), Value::parse(&value))
                        }
                    })
                    .collect(),
            );
        }
        Value::Text(text.to_string())
    }

    /// Strip one quote layer, if present.
    pub fn unquote(self) -> Value {
        match self {
            Value::Quote(inner) => *inner,
            other => other,
        }
    }
}

fn strip_delimiters(text: &str, open: char, close: char) -> Option<&str> {
    if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
        Some(&text[open.len_utf8()..text.len() - close.len_utf8()])
    } else {
        None
    }
}

/// Split at `separator` occurrences that are outside brackets and quotes.
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '[' | '{' | '(' => {
                depth += 1;
                current.push(c);
            }
            ']' | '}' | ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c == separator && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Cast helpers shared by the cast and math instructions.
pub mod cast {
    use super::*;

    /// The text of a value; a quote contributes its content, not its
    /// literal form.
    pub fn text(value: Value, memory: &Memory) -> Result<Value, ExecutionError> {
        Ok(Value::Text(text_of(&value, memory)?))
    }

    /// Like [`Value::eval`], but strips one quote layer first.
    pub fn text_of(value: &Value, memory: &Memory) -> Result<String, ExecutionError> {
        match value {
            Value::Quote(inner) => inner.eval(memory),
            other => other.eval(memory),
        }
    }

    pub fn number(value: &Value, memory: &Memory) -> Result<Number, ExecutionError> {
        match value {
            Value::Number(n) => Ok(*n),
            Value::Boolean(b) => Ok(Number::from(i64::from(*b))),
            Value::Null => Ok(Number::from(0i64)),
            other => {
                let rendered = other.eval(memory)?;
                Number::parse(&rendered).ok_or_else(|| ExecutionError::UnexpectedValue {
                    expected: "a number",
                    got: rendered,
                })
            }
        }
    }

    pub fn boolean(value: &Value, memory: &Memory) -> Result<bool, ExecutionError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(!n.is_zero()),
            Value::Null => Ok(false),
            other => {
                let rendered = other.eval(memory)?;
                match rendered.trim() {
                    "true" | "1" => Ok(true),
                    "false" | "0" | "" => Ok(false),
                    got => Err(ExecutionError::UnexpectedValue {
                        expected: "a boolean",
                        got: got.to_string(),
                    }),
                }
            }
        }
    }

    pub fn array(value: Value, memory: &Memory) -> Result<Value, ExecutionError> {
        match value {
            Value::Array(items) => Ok(Value::Array(items)),
            Value::Object(entries) => Ok(Value::Array(
                entries
                    .into_iter()
                    .map(|(k, v)| Value::pair(k, v))
                    .collect(),
            )),
            Value::Glue(parts) => Ok(Value::Array(
                parts
                    .into_iter()
                    .filter(|part| !matches!(part, Value::Text(t) if t.trim().is_empty()))
                    .collect(),
            )),
            Value::Text(_) => {
                let rendered = value.eval(memory)?;
                match Value::parse(&rendered) {
                    Value::Array(items) => Ok(Value::Array(items)),
                    Value::Text(text) if text.trim().is_empty() => Ok(Value::Array(Vec::new())),
                    other => Ok(Value::Array(vec![other])),
                }
            }
            Value::Null => Ok(Value::Array(Vec::new())),
            other => Ok(Value::Array(vec![other])),
        }
    }

    pub fn object(value: Value, memory: &Memory) -> Result<Value, ExecutionError> {
        match value {
            Value::Object(entries) => Ok(Value::Object(entries)),
            Value::Pair(key, value) => Ok(Value::Object(vec![(*key, *value)])),
            Value::Array(items) => Ok(Value::Object(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Pair(k, v) => (*k, *v),
                        other => (other, Value::Null),
                    })
                    .collect(),
            )),
            Value::Null => Ok(Value::Object(Vec::new())),
            other => {
                let rendered = other.eval(memory)?;
                match Value::parse(&rendered) {
                    Value::Object(entries) => Ok(Value::Object(entries)),
                    Value::Text(text) if text.trim().is_empty() => Ok(Value::Object(Vec::new())),
                    _ => Err(ExecutionError::UnexpectedValue {
                        expected: "an object",
                        got: rendered,
                    }),
                }
            }
        }
    }

    pub fn pair(value: Value, memory: &Memory) -> Result<Value, ExecutionError> {
        match value {
            Value::Pair(key, value) => Ok(Value::Pair(key, value)),
            Value::Glue(parts) => {
                let mut parts = parts
                    .into_iter()
                    .filter(|part| !matches!(part, Value::Text(t) if t.trim().is_empty()))
                    .collect_vec();
                match parts.len() {
                    2 => {
                        let value = parts.pop().expect("two parts");
                        let key = parts.pop().expect("two parts");
                        Ok(Value::pair(key, value))
                    }
                    1 => Ok(Value::pair(parts.pop().expect("one part"), Value::Null)),
                    _ => {
                        let rendered = Value::Glue(parts).eval(memory)?;
                        Ok(Value::pair(Value::Text(rendered), Value::Null))
                    }
                }
            }
            other => Ok(Value::pair(other, Value::Null)),
        }
    }

    pub fn quote(value: Value) -> Value {
        match value {
            Value::Quote(inner) => Value::Quote(inner),
            other => Value::quote(other),
        }
    }

    pub fn glue(value: Value) -> Value {
        match value {
            Value::Glue(parts) => Value::Glue(parts),
            other => Value::Glue(vec![other]),
        }
    }

    /// Fold a stack of values (bottom to top) into one value.
    pub fn fold_glue(mut values: Vec<Value>) -> Value {
        match values.len() {
            0 => Value::Text(String::new()),
            1 => values.pop().expect("one value"),
            _ => Value::Glue(values),
        }
    }
}
