//! List builtins

use crate::error::Result;
use crate::runtime::context::EvalContext;
use crate::runtime::environment::Environment;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::node::{cons, list_from, list_to_vec, shift, ListBuilder};
use crate::runtime::Node;

use super::define;

/// Registers the list builtins.
pub fn register(env: &Environment) {
    define(env, "cons", 2, Some(2), |_, _, _, mut args| {
        let cdr = args.remove(1);
        let car = args.remove(0);
        Ok(cons(car, cdr))
    });
    define(env, "car", 1, Some(1), |_, _, _, args| {
        Ok(args[0].as_cons()?.borrow().car.clone())
    });
    define(env, "cdr", 1, Some(1), |_, _, _, args| {
        Ok(args[0].as_cons()?.borrow().cdr.clone())
    });
    define(env, "first", 1, Some(1), |_, _, _, args| {
        Ok(args[0].as_cons()?.borrow().car.clone())
    });
    define(env, "rest", 1, Some(1), |_, _, _, args| {
        Ok(args[0].as_cons()?.borrow().cdr.clone())
    });
    define(env, "list", 0, None, |_, _, _, args| Ok(list_from(args)));
    define(env, "append", 0, None, builtin_append);
    define(env, "last", 1, Some(1), builtin_last);
    define(env, "reverse", 1, Some(1), |_, _, _, args| {
        let mut items = list_to_vec(&args[0])?;
        items.reverse();
        Ok(list_from(items))
    });
    define(env, "member", 2, Some(2), builtin_member);
    define(env, "assoc", 2, Some(2), builtin_assoc);

    // `replaca`/`replacd` take `(cons value)` and return the cons;
    // `set-car`/`set-cdr` take `(value cons)` and return the value.
    define(env, "replaca", 2, Some(2), |_, _, _, args| {
        args[0].as_cons()?.borrow_mut().car = args[1].clone();
        Ok(args[0].clone())
    });
    define(env, "replacd", 2, Some(2), |_, _, _, args| {
        args[0].as_cons()?.borrow_mut().cdr = args[1].clone();
        Ok(args[0].clone())
    });
    define(env, "set-car", 2, Some(2), |_, _, _, args| {
        args[1].as_cons()?.borrow_mut().car = args[0].clone();
        Ok(args[0].clone())
    });
    define(env, "set-cdr", 2, Some(2), |_, _, _, args| {
        args[1].as_cons()?.borrow_mut().cdr = args[0].clone();
        Ok(args[0].clone())
    });

    define(env, "atom", 1, Some(1), |_, _, _, args| {
        Ok(boolean(!matches!(args[0], Node::Cons(_))))
    });
    define(env, "consp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Cons(_))))
    });
    define(env, "listp", 1, Some(1), |_, _, _, args| {
        Ok(boolean(matches!(args[0], Node::Cons(_) | Node::Null)))
    });
    define(env, "null", 1, Some(1), |_, _, _, args| {
        Ok(boolean(args[0].is_null()))
    });

    define(env, "mapcar", 2, None, builtin_mapcar);
    define(env, "mapc", 2, None, builtin_mapc);
}

fn boolean(value: bool) -> Node {
    if value {
        Node::True
    } else {
        Node::Null
    }
}

/// Copies every list but splices the final argument as the result's tail.
fn builtin_append(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    mut args: Vec<Node>,
) -> Result<Node> {
    let tail = match args.pop() {
        Some(last) => last,
        None => return Ok(Node::Null),
    };
    let mut builder = ListBuilder::new();
    for list in &args {
        for item in list_to_vec(list)? {
            builder.push(item);
        }
    }
    Ok(builder.build_with_tail(tail))
}

/// Returns the last cons cell of a list (`nil` for the empty list).
fn builtin_last(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    let mut node = args[0].clone();
    if node.is_null() {
        return Ok(Node::Null);
    }
    loop {
        let cell = node.as_cons()?;
        let next = cell.borrow().cdr.clone();
        match next {
            Node::Cons(_) => node = next,
            _ => return Ok(node),
        }
    }
}

/// Returns the tail of the list starting at the first structural match.
fn builtin_member(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    let mut rest = args[1].clone();
    while !rest.is_null() {
        let (car, cdr) = shift(&rest)?;
        if car == args[0] {
            return Ok(rest);
        }
        rest = cdr;
    }
    Ok(Node::Null)
}

/// Returns the first `(key . value)` pair whose key structurally matches.
fn builtin_assoc(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    for pair in list_to_vec(&args[1])? {
        let key = pair.as_cons()?.borrow().car.clone();
        if key == args[0] {
            return Ok(pair);
        }
    }
    Ok(Node::Null)
}

/// Applies the function elementwise over one or more lists, stopping at the
/// shortest, and collects the results.
fn builtin_mapcar(
    evaluator: &mut Evaluator,
    ctx: &EvalContext,
    env: &Environment,
    mut args: Vec<Node>,
) -> Result<Node> {
    let target = args.remove(0);
    let mut lists = args
        .iter()
        .map(list_to_vec)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .map(Vec::into_iter)
        .collect::<Vec<_>>();
    let mut builder = ListBuilder::new();
    loop {
        ctx.check()?;
        let mut row = Vec::with_capacity(lists.len());
        for list in &mut lists {
            match list.next() {
                Some(item) => row.push(item),
                None => return Ok(builder.build()),
            }
        }
        builder.push(evaluator.apply(ctx, env, &target, row)?);
    }
}

/// Like `mapcar` for effect: returns the first list unchanged.
fn builtin_mapc(
    evaluator: &mut Evaluator,
    ctx: &EvalContext,
    env: &Environment,
    mut args: Vec<Node>,
) -> Result<Node> {
    let target = args.remove(0);
    let first = args[0].clone();
    let mut lists = args
        .iter()
        .map(list_to_vec)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .map(Vec::into_iter)
        .collect::<Vec<_>>();
    loop {
        ctx.check()?;
        let mut row = Vec::with_capacity(lists.len());
        for list in &mut lists {
            match list.next() {
                Some(item) => row.push(item),
                None => return Ok(first),
            }
        }
        evaluator.apply(ctx, env, &target, row)?;
    }
}
