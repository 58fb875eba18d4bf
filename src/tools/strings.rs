//! String and sequence builtins

use crate::error::{Error, Result};
use crate::runtime::context::EvalContext;
use crate::runtime::environment::Environment;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::node::{list_from, list_to_vec};
use crate::runtime::Node;

use super::define;

/// Registers the string and sequence builtins.
pub fn register(env: &Environment) {
    define(env, "length", 1, Some(1), |_, _, _, args| match &args[0] {
        Node::Str(s) => Ok(Node::Int(s.chars().count() as i64)),
        Node::Null | Node::Cons(_) => Ok(Node::Int(list_to_vec(&args[0])?.len() as i64)),
        other => Err(Error::expected("sequence", other)),
    });
    define(env, "elt", 2, Some(2), builtin_elt);
    define(env, "subseq", 2, Some(3), builtin_subseq);
    define(env, "string-append", 0, None, |_, _, _, args| {
        let mut out = String::new();
        for arg in &args {
            out.push_str(arg.as_str()?);
        }
        Ok(Node::Str(out))
    });

    define(env, "string=", 2, None, |_, _, _, args| {
        string_compare(args, |o| o == std::cmp::Ordering::Equal)
    });
    define(env, "string/=", 2, None, |_, _, _, args| {
        string_compare(args, |o| o != std::cmp::Ordering::Equal)
    });
    define(env, "string<", 2, None, |_, _, _, args| {
        string_compare(args, |o| o == std::cmp::Ordering::Less)
    });
    define(env, "string<=", 2, None, |_, _, _, args| {
        string_compare(args, |o| o != std::cmp::Ordering::Greater)
    });
    define(env, "string>", 2, None, |_, _, _, args| {
        string_compare(args, |o| o == std::cmp::Ordering::Greater)
    });
    define(env, "string>=", 2, None, |_, _, _, args| {
        string_compare(args, |o| o != std::cmp::Ordering::Less)
    });

    define(env, "stringp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Str(_))))
    });
    define(env, "symbolp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Symbol(_))))
    });
    define(env, "keywordp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Keyword(_))))
    });
    define(env, "characterp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Rune(_))))
    });
    define(env, "functionp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(
            args[0],
            Node::Lambda(_) | Node::Builtin(_) | Node::Getter(_) | Node::Setter(_)
        )))
    });
}

fn boolean(value: bool) -> Node {
    if value {
        Node::True
    } else {
        Node::Null
    }
}

fn index_of(arg: &Node, limit: usize) -> Result<usize> {
    let index = arg.as_int()?;
    if index < 0 || index as usize >= limit {
        return Err(Error::expected("index in range", arg));
    }
    Ok(index as usize)
}

/// `(elt seq index)` on strings yields a character, on lists an element.
fn builtin_elt(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    match &args[0] {
        Node::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let index = index_of(&args[1], chars.len())?;
            Ok(Node::Rune(chars[index]))
        }
        Node::Null | Node::Cons(_) => {
            let items = list_to_vec(&args[0])?;
            let index = index_of(&args[1], items.len())?;
            Ok(items[index].clone())
        }
        other => Err(Error::expected("sequence", other)),
    }
}

/// `(subseq seq start [end])` on strings and lists; `end` defaults to the
/// sequence length.
fn builtin_subseq(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    match &args[0] {
        Node::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = bounds(&args, chars.len())?;
            Ok(Node::Str(chars[start..end].iter().collect()))
        }
        Node::Null | Node::Cons(_) => {
            let items = list_to_vec(&args[0])?;
            let (start, end) = bounds(&args, items.len())?;
            Ok(list_from(items[start..end].to_vec()))
        }
        other => Err(Error::expected("sequence", other)),
    }
}

fn bounds(args: &[Node], len: usize) -> Result<(usize, usize)> {
    let start = args[1].as_int()?;
    let end = match args.get(2) {
        Some(arg) => arg.as_int()?,
        None => len as i64,
    };
    if start < 0 || end < start || end as usize > len {
        return Err(Error::expected("index in range", &args[1]));
    }
    Ok((start as usize, end as usize))
}

fn string_compare(args: Vec<Node>, ok: fn(std::cmp::Ordering) -> bool) -> Result<Node> {
    for pair in args.windows(2) {
        let ordering = pair[0].as_str()?.cmp(pair[1].as_str()?);
        if !ok(ordering) {
            return Ok(Node::Null);
        }
    }
    Ok(Node::True)
}
