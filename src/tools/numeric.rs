//! Numeric builtins
//!
//! Arithmetic stays in integers until a float joins in, then widens to
//! `f64`. `+` doubles as the generic concatenation: given strings it
//! appends them.

use crate::error::{Error, Result};
use crate::runtime::context::EvalContext;
use crate::runtime::environment::Environment;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::Node;

use super::define;

/// Registers the numeric builtins.
pub fn register(env: &Environment) {
    define(env, "+", 1, None, builtin_add);
    define(env, "-", 1, None, builtin_sub);
    define(env, "*", 1, None, |_, _, _, args| {
        fold(args, |a, b| a.wrapping_mul(b), |a, b| a * b)
    });
    define(env, "/", 2, None, builtin_div);
    define(env, "mod", 2, Some(2), |_, _, _, args| {
        let (a, b) = int_pair(&args)?;
        if b == 0 {
            return Err(Error::DivisionByZero);
        }
        Ok(Node::Int(a.rem_euclid(b)))
    });
    define(env, "rem", 2, Some(2), |_, _, _, args| {
        let (a, b) = int_pair(&args)?;
        if b == 0 {
            return Err(Error::DivisionByZero);
        }
        Ok(Node::Int(a % b))
    });
    define(env, "1+", 1, Some(1), |_, _, _, args| step(&args[0], 1));
    define(env, "1-", 1, Some(1), |_, _, _, args| step(&args[0], -1));
    define(env, "abs", 1, Some(1), |_, _, _, args| match &args[0] {
        Node::Int(n) => Ok(Node::Int(n.wrapping_abs())),
        Node::Float(f) => Ok(Node::Float(f.abs())),
        other => Err(Error::expected("number", other)),
    });
    define(env, "min", 1, None, |_, _, _, args| extremum(args, false));
    define(env, "max", 1, None, |_, _, _, args| extremum(args, true));

    define(env, "floor", 1, Some(1), |_, _, _, args| {
        Ok(Node::Int(args[0].as_f64()?.floor() as i64))
    });
    define(env, "ceiling", 1, Some(1), |_, _, _, args| {
        Ok(Node::Int(args[0].as_f64()?.ceil() as i64))
    });
    define(env, "round", 1, Some(1), |_, _, _, args| {
        Ok(Node::Int(args[0].as_f64()?.round() as i64))
    });
    define(env, "truncate", 1, Some(1), |_, _, _, args| {
        Ok(Node::Int(args[0].as_f64()?.trunc() as i64))
    });

    define(env, "=", 2, None, |_, _, _, args| compare(args, |o| o == 0.0));
    define(env, "/=", 2, None, |_, _, _, args| compare(args, |o| o != 0.0));
    define(env, "<", 2, None, |_, _, _, args| compare(args, |o| o < 0.0));
    define(env, "<=", 2, None, |_, _, _, args| compare(args, |o| o <= 0.0));
    define(env, ">", 2, None, |_, _, _, args| compare(args, |o| o > 0.0));
    define(env, ">=", 2, None, |_, _, _, args| compare(args, |o| o >= 0.0));

    define(env, "zerop", 1, Some(1), |_, _, _, args| {
        Ok(boolean(args[0].as_f64()? == 0.0))
    });
    define(env, "plusp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(args[0].as_f64()? > 0.0))
    });
    define(env, "minusp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(args[0].as_f64()? < 0.0))
    });
    define(env, "evenp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(args[0].as_int()? % 2 == 0))
    });
    define(env, "oddp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(args[0].as_int()? % 2 != 0))
    });
    define(env, "numberp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Int(_) | Node::Float(_))))
    });
    define(env, "integerp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Int(_))))
    });
    define(env, "floatp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Float(_))))
    });
}

fn boolean(value: bool) -> Node {
    if value {
        Node::True
    } else {
        Node::Null
    }
}

/// Folds numeric arguments, staying integral until the first float.
fn fold(
    args: Vec<Node>,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Node> {
    let mut iter = args.iter();
    let mut acc = match iter.next() {
        Some(first) => first.clone(),
        None => return Err(Error::TooFewArguments),
    };
    acc.as_f64()?;
    for arg in iter {
        acc = match (&acc, arg) {
            (Node::Int(a), Node::Int(b)) => Node::Int(int_op(*a, *b)),
            (Node::Int(_) | Node::Float(_), Node::Int(_) | Node::Float(_)) => {
                Node::Float(float_op(acc.as_f64()?, arg.as_f64()?))
            }
            _ => return Err(Error::expected("number", arg)),
        };
    }
    Ok(acc)
}

fn builtin_add(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    if let Some(Node::Str(_)) = args.first() {
        let mut out = String::new();
        for arg in &args {
            out.push_str(arg.as_str()?);
        }
        return Ok(Node::Str(out));
    }
    fold(args, |a, b| a.wrapping_add(b), |a, b| a + b)
}

fn builtin_sub(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    if args.len() == 1 {
        return match &args[0] {
            Node::Int(n) => Ok(Node::Int(n.wrapping_neg())),
            Node::Float(f) => Ok(Node::Float(-f)),
            other => Err(Error::expected("number", other)),
        };
    }
    fold(args, |a, b| a.wrapping_sub(b), |a, b| a - b)
}

/// Integer division truncates; any float operand switches to float
/// division. Integer division by zero is an error.
fn builtin_div(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    let mut iter = args.into_iter();
    let mut acc = iter.next().ok_or(Error::TooFewArguments)?;
    acc.as_f64()?;
    for arg in iter {
        acc = match (&acc, &arg) {
            (Node::Int(a), Node::Int(b)) => {
                if *b == 0 {
                    return Err(Error::DivisionByZero);
                }
                Node::Int(a.wrapping_div(*b))
            }
            _ => {
                let divisor = arg.as_f64()?;
                if divisor == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Node::Float(acc.as_f64()? / divisor)
            }
        };
    }
    Ok(acc)
}

fn step(arg: &Node, delta: i64) -> Result<Node> {
    match arg {
        Node::Int(n) => Ok(Node::Int(n.wrapping_add(delta))),
        Node::Float(f) => Ok(Node::Float(f + delta as f64)),
        other => Err(Error::expected("number", other)),
    }
}

fn int_pair(args: &[Node]) -> Result<(i64, i64)> {
    Ok((args[0].as_int()?, args[1].as_int()?))
}

fn extremum(args: Vec<Node>, want_max: bool) -> Result<Node> {
    let mut iter = args.into_iter();
    let mut best = iter.next().ok_or(Error::TooFewArguments)?;
    best.as_f64()?;
    for arg in iter {
        let better = if want_max {
            arg.as_f64()? > best.as_f64()?
        } else {
            arg.as_f64()? < best.as_f64()?
        };
        if better {
            best = arg;
        }
    }
    Ok(best)
}

/// Chained numeric comparison: every adjacent pair must satisfy the
/// ordering predicate on their difference.
fn compare(args: Vec<Node>, ok: fn(f64) -> bool) -> Result<Node> {
    for pair in args.windows(2) {
        let delta = pair[0].as_f64()? - pair[1].as_f64()?;
        if !ok(delta) {
            return Ok(Node::Null);
        }
    }
    Ok(Node::True)
}
