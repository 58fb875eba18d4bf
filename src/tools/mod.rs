//! Built-in function library
//!
//! Builtins are plain function pointers wrapped in a [`Builtin`] descriptor
//! carrying the arity contract, registered by name into the outermost frame
//! at evaluator construction. They receive their arguments already
//! evaluated; the keyword-accepting kind additionally receives trailing
//! `:keyword value` pairs in the order given.

pub mod core;
pub mod io;
pub mod lists;
pub mod numeric;
pub mod strings;

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::context::EvalContext;
use crate::runtime::environment::Environment;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::node::split_keyword_args;
use crate::runtime::{Node, Symbol};

/// Signature of an ordinary builtin
pub type SimpleFn =
    fn(&mut Evaluator, &EvalContext, &Environment, Vec<Node>) -> Result<Node>;

/// Signature of a keyword-accepting builtin
pub type KeywordFn = fn(
    &mut Evaluator,
    &EvalContext,
    &Environment,
    Vec<Node>,
    Vec<(Symbol, Node)>,
) -> Result<Node>;

/// Calling convention of a builtin
pub enum BuiltinKind {
    /// All arguments positional
    Simple(SimpleFn),
    /// Positional arguments plus trailing `:keyword value` pairs
    Keyword(KeywordFn),
}

/// A named builtin with its arity contract
pub struct Builtin {
    /// Name the builtin is registered under
    pub name: &'static str,
    /// Minimum positional argument count
    pub min: usize,
    /// Maximum positional argument count; `None` means variadic
    pub max: Option<usize>,
    /// Calling convention and implementation
    pub kind: BuiltinKind,
}

impl Builtin {
    /// Checks arity and invokes the implementation.
    pub fn call(
        &self,
        evaluator: &mut Evaluator,
        ctx: &EvalContext,
        env: &Environment,
        args: Vec<Node>,
    ) -> Result<Node> {
        match self.kind {
            BuiltinKind::Simple(f) => {
                self.check_arity(args.len())?;
                f(evaluator, ctx, env, args)
            }
            BuiltinKind::Keyword(f) => {
                let (positional, pairs) = split_keyword_args(args);
                self.check_arity(positional.len())?;
                f(evaluator, ctx, env, positional, pairs)
            }
        }
    }

    fn check_arity(&self, count: usize) -> Result<()> {
        if count < self.min {
            return Err(Error::TooFewArguments);
        }
        if self.max.is_some_and(|max| count > max) {
            return Err(Error::TooManyArguments);
        }
        Ok(())
    }
}

/// Registers one ordinary builtin.
pub(crate) fn define(
    env: &Environment,
    name: &'static str,
    min: usize,
    max: Option<usize>,
    f: SimpleFn,
) {
    let builtin = Builtin {
        name,
        min,
        max,
        kind: BuiltinKind::Simple(f),
    };
    env.define(Symbol::new(name), Node::Builtin(Rc::new(builtin)));
}

/// Registers one keyword-accepting builtin.
pub(crate) fn define_keyword(
    env: &Environment,
    name: &'static str,
    min: usize,
    max: Option<usize>,
    f: KeywordFn,
) {
    let builtin = Builtin {
        name,
        min,
        max,
        kind: BuiltinKind::Keyword(f),
    };
    env.define(Symbol::new(name), Node::Builtin(Rc::new(builtin)));
}

/// Registers the whole standard library into `env`'s current frame, which
/// is the outermost frame at evaluator construction.
pub fn register_all(env: &Environment) {
    core::register(env);
    lists::register(env);
    numeric::register(env);
    strings::register(env);
    io::register(env);
}
