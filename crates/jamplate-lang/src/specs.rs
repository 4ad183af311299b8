//! The builtin spec catalog: the default template language.
//!
//! Sub-spec order is semantic. For parsing it is the fallback priority
//! (escaped newlines before newlines, `<=` before `<`). For analysis it
//! is operator precedence: the loosest-binding operator wraps first, so
//! tighter operators end up wrapping inside its side parameters.

mod command;
mod flow;
mod injection;
mod operator;
mod resource;
mod root;
mod support;
mod syntax;
mod text;

use crate::spec::Spec;

/// Sketch kind tags of the builtin catalog.
pub mod kind {
    pub const ROOT: &str = "root";

    pub const NEWLINE: &str = "newline";
    pub const NEWLINE_ESCAPED: &str = "newline:escaped";
    pub const COMMENT_LINE: &str = "comment:line";
    pub const COMMENT_BLOCK: &str = "comment:block";

    pub const CURLY: &str = "syntax:curly";
    pub const SQUARE: &str = "syntax:square";
    pub const ROUND: &str = "syntax:round";
    pub const COMMA: &str = "symbol:comma";
    pub const COLON: &str = "symbol:colon";

    pub const COMMAND: &str = "command";
    pub const COMMAND_TYPE: &str = "command:type";
    pub const COMMAND_PARAMETER: &str = "command:parameter";
    pub const COMMAND_KEY: &str = "command:key";
    pub const COMMAND_VALUE: &str = "command:value";

    pub const INJECTION: &str = "injection";

    pub const STRING: &str = "value:string";
    pub const NUMBER: &str = "value:number";
    pub const REFERENCE: &str = "value:reference";
    pub const ARRAY: &str = "value:array";
    pub const OBJECT: &str = "value:object";
    pub const GROUP: &str = "value:group";
    pub const SLOT: &str = "value:slot";

    pub const PARAMETER: &str = "parameter";

    pub const FLOW_IF: &str = "flow:if";
    pub const FLOW_FOR: &str = "flow:for";
    pub const FLOW_WHILE: &str = "flow:while";
    pub const FLOW_CAPTURE: &str = "flow:capture";
    pub const FLOW_BODY: &str = "flow:body";
    pub const FLOW_BRANCH: &str = "flow:branch";
}

/// Tree weights; on coinciding ranges the lower weight stays outside.
pub mod weight {
    pub const ROOT: i32 = -1;
    pub const FLOW_BODY: i32 = -3;
    pub const FLOW_BRANCH: i32 = -2;
    pub const PARAMETER: i32 = -1;
    pub const SLOT: i32 = -1;
    pub const COMMAND_PART: i32 = -1;
    pub const DEFAULT: i32 = 0;
}

/// Builtin heap addresses seeded by the root block.
pub mod address {
    pub const FILE: &str = "__FILE__";
    pub const PATH: &str = "__PATH__";
    pub const DIR: &str = "__DIR__";
    pub const LINE: &str = "__LINE__";
}

/// The full default language.
pub fn default_spec() -> Spec {
    Spec::new("default")
        .add(root::spec())
        .add(syntax::newline_escaped())
        .add(syntax::newline())
        .add(syntax::comment_line())
        .add(syntax::comment_block())
        .add(syntax::strings())
        .add(injection::spec())
        .add(command::parser_spec())
        .add(syntax::brackets())
        .add(syntax::comma())
        .add(resource::reference())
        .add(resource::number())
        .add(resource::group())
        .add(resource::array())
        .add(resource::object())
        .add(resource::indexer())
        .add(operator::pair())
        .add(operator::logical_or())
        .add(operator::logical_and())
        .add(operator::equals())
        .add(operator::not_equals())
        .add(operator::less_or_equal())
        .add(operator::more_or_equal())
        .add(operator::less_than())
        .add(operator::more_than())
        .add(operator::adder())
        .add(operator::subtractor())
        .add(operator::multiplier())
        .add(operator::divider())
        .add(operator::modulo())
        .add(operator::negation())
        .add(operator::getter())
        .add(flow::if_spec())
        .add(flow::for_spec())
        .add(flow::while_spec())
        .add(flow::capture_spec())
        .add(command::declare())
        .add(command::define())
        .add(command::include())
        .add(command::error())
        .add(command::message())
        .add(command::console())
        .add(command::spread())
        .add(command::make())
        .add(command::leftovers())
        .add(text::spec())
}
