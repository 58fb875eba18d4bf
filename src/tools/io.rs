//! Printing builtins and `format` destination handling

use std::io::Write;

use crate::error::{Error, Result};
use crate::runtime::context::EvalContext;
use crate::runtime::environment::{Environment, StreamRef};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::format::format_into;
use crate::runtime::node::PrintMode;
use crate::runtime::Node;

use super::define;

/// Registers the printing builtins.
pub fn register(env: &Environment) {
    define(env, "print", 1, Some(2), |_, _, env, args| {
        let mut text = args[0].to_prin1_string();
        text.push('\n');
        write_text(&destination(env, args.get(1))?, &text)?;
        Ok(args[0].clone())
    });
    define(env, "princ", 1, Some(2), |_, _, env, args| {
        write_text(
            &destination(env, args.get(1))?,
            &args[0].to_princ_string(),
        )?;
        Ok(args[0].clone())
    });
    define(env, "prin1", 1, Some(2), |_, _, env, args| {
        write_text(
            &destination(env, args.get(1))?,
            &args[0].to_prin1_string(),
        )?;
        Ok(args[0].clone())
    });
    define(env, "terpri", 0, Some(1), |_, _, env, args| {
        write_text(&destination(env, args.first())?, "\n")?;
        Ok(Node::Null)
    });
    define(env, "format", 2, None, builtin_format);
    define(env, "standard-output", 0, Some(0), |_, _, env, _| {
        Ok(Node::Stream(env.stdout()))
    });
    define(env, "error-output", 0, Some(0), |_, _, env, _| {
        Ok(Node::Stream(env.errout()))
    });
}

/// Resolves an optional stream argument; the default is standard output.
fn destination(env: &Environment, arg: Option<&Node>) -> Result<StreamRef> {
    match arg {
        None | Some(Node::True) => Ok(env.stdout()),
        Some(Node::Stream(stream)) => Ok(stream.clone()),
        Some(other) => Err(Error::expected("writer", other)),
    }
}

fn write_text(stream: &StreamRef, text: &str) -> Result<()> {
    stream
        .borrow_mut()
        .write_all(text.as_bytes())
        .map_err(|e| Error::Io(e.to_string()))
}

/// `(format destination control args...)`: `t` writes to standard output,
/// `nil` returns the rendering as a string, and a stream writes to it.
fn builtin_format(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    let control = args[1].as_str()?;
    let mut out = String::new();
    format_into(&mut out, control, &args[2..])?;
    match &args[0] {
        Node::Null => Ok(Node::Str(out)),
        Node::True => {
            write_text(&env.stdout(), &out)?;
            Ok(Node::Null)
        }
        Node::Stream(stream) => {
            write_text(stream, &out)?;
            Ok(Node::Null)
        }
        other => Err(Error::expected("writer", other)),
    }
}
