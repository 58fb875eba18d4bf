//! Core builtins: equality, application, conditions, and object plumbing

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::clos;
use crate::runtime::context::EvalContext;
use crate::runtime::environment::Environment;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::format::format_into;
use crate::runtime::node::{list_to_vec, EqlMode};
use crate::runtime::symbol::gensym;
use crate::runtime::{Node, Symbol};

use super::{define, define_keyword};

/// Registers core builtins plus the global constants.
pub fn register(env: &Environment) {
    define(env, "eq", 2, None, |_, _, _, args| chain_equal(args, EqlMode::Strict));
    define(env, "eql", 2, None, |_, _, _, args| chain_equal(args, EqlMode::Strict));
    define(env, "equal", 2, None, |_, _, _, args| chain_equal(args, EqlMode::Equal));
    define(env, "equalp", 2, None, |_, _, _, args| chain_equal(args, EqlMode::Equalp));
    define(env, "not", 1, Some(1), |_, _, _, args| {
        Ok(boolean(args[0].is_null()))
    });
    define(env, "identity", 1, Some(1), |_, _, _, mut args| {
        Ok(args.remove(0))
    });
    define(env, "gensym", 0, Some(0), |_, _, _, _| {
        Ok(Node::Symbol(gensym()))
    });

    define(env, "funcall", 1, None, |evaluator, ctx, env, mut args| {
        let target = args.remove(0);
        evaluator.apply(ctx, env, &target, args)
    });
    define(env, "apply", 2, None, builtin_apply);
    define(env, "macroexpand", 1, Some(1), builtin_macroexpand);

    define(env, "throw", 2, Some(2), |_, _, _, mut args| {
        let value = args.remove(1);
        let tag = args.remove(0);
        Err(Error::Thrown { tag, value })
    });
    define(env, "return", 0, Some(1), |_, _, _, mut args| {
        let value = if args.is_empty() { Node::Null } else { args.remove(0) };
        Err(Error::EarlyReturn { name: None, value })
    });
    define(env, "error", 1, None, builtin_error);
    define(env, "quit", 0, Some(0), |_, _, _, _| Err(Error::Quit));
    define(env, "exit", 0, Some(0), |_, _, _, _| Err(Error::Quit));

    define(env, "class-of", 1, Some(1), |_, _, _, args| match &args[0] {
        Node::Instance(instance) => Ok(Node::Class(instance.borrow().class.clone())),
        other => Err(Error::expected("instance", other)),
    });
    define(env, "instancep", 2, Some(2), |_, _, _, args| {
        match (&args[0], &args[1]) {
            (Node::Instance(instance), Node::Class(class)) => {
                Ok(boolean(clos::class_isa(&instance.borrow().class, class)))
            }
            (Node::Instance(_), other) => Err(Error::expected("class", other)),
            _ => Ok(Node::Null),
        }
    });
    define_keyword(env, "create", 1, Some(1), |evaluator, ctx, _, positional, pairs| {
        clos::create_instance(evaluator, ctx, positional, pairs)
    });

    register_constants(env);
}

/// Constants and error-object designators available to every program.
fn register_constants(env: &Environment) {
    env.define(Symbol::new("pi"), Node::Float(std::f64::consts::PI));
    env.define(Symbol::new("most-positive-fixnum"), Node::Int(i64::MAX));
    env.define(Symbol::new("most-negative-fixnum"), Node::Int(i64::MIN));

    let conditions: [(&str, Error); 6] = [
        ("*err-unbound-variable*", Error::UnboundVariable { name: Symbol::new("-") }),
        ("*err-too-few-arguments*", Error::TooFewArguments),
        ("*err-too-many-arguments*", Error::TooManyArguments),
        ("*err-division-by-zero*", Error::DivisionByZero),
        ("*err-not-callable*", Error::NotCallable { type_name: "-" }),
        ("*err-quit*", Error::Quit),
    ];
    for (name, err) in conditions {
        env.define(Symbol::new(name), Node::Condition(Rc::new(err)));
    }
}

fn boolean(value: bool) -> Node {
    if value {
        Node::True
    } else {
        Node::Null
    }
}

fn chain_equal(args: Vec<Node>, mode: EqlMode) -> Result<Node> {
    Ok(boolean(
        args.windows(2).all(|pair| pair[0].equals(&pair[1], mode)),
    ))
}

/// `(apply f a b '(c d))` calls `f` with `(a b c d)`: the final argument is
/// a list spliced onto the direct arguments.
fn builtin_apply(
    evaluator: &mut Evaluator,
    ctx: &EvalContext,
    env: &Environment,
    mut args: Vec<Node>,
) -> Result<Node> {
    let target = args.remove(0);
    let tail = args.pop().unwrap_or(Node::Null);
    args.extend(list_to_vec(&tail)?);
    evaluator.apply(ctx, env, &target, args)
}

/// Expands a macro call form once; anything else passes through unchanged.
fn builtin_macroexpand(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    let form = &args[0];
    if let Node::Cons(cell) = form {
        let head = cell.borrow().car.clone();
        if let Node::Symbol(name) = head {
            if let Some(Node::Macro(mac)) = env.lookup(name) {
                let tail = cell.borrow().cdr.clone();
                return mac.expand(&tail);
            }
        }
    }
    Ok(form.clone())
}

/// `(error control args...)`: renders the control string and raises the
/// result as a user condition.
fn builtin_error(
    _evaluator: &mut Evaluator,
    _ctx: &EvalContext,
    _env: &Environment,
    args: Vec<Node>,
) -> Result<Node> {
    let control = args[0].as_str()?;
    let mut message = String::new();
    format_into(&mut message, control, &args[1..])?;
    Err(Error::User(message))
}
