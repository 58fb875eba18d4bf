//! # Islet - an embeddable ISLisp-flavored interpreter
//!
//! A tree-walking interpreter for a small Lisp: one universal [`Node`]
//! value type, lexically scoped environments with closure capture,
//! non-hygienic template macros, a CLOS-style object system with multiple
//! inheritance and generic slot accessors, non-local control flow
//! (`block`/`return-from`, `catch`/`throw`, `unwind-protect`,
//! `handler-case`), and a `format` directive interpreter.
//!
//! ## Quick start
//!
//! ```rust
//! use islet::{EvalContext, Evaluator, Node};
//!
//! # fn main() -> islet::Result<()> {
//! let mut evaluator = Evaluator::new();
//! let ctx = EvalContext::new();
//!
//! let result = evaluator.eval_source(&ctx, "
//!     (defun fib (n)
//!       (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))
//!     (fib 10)
//! ")?;
//! assert_eq!(result, Node::Int(55));
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Evaluation is cooperative: loops check their [`EvalContext`] each
//! iteration, so a long-running program can be stopped from another thread
//! or bounded by a deadline.
//!
//! ```rust
//! use std::time::Duration;
//! use islet::{Error, EvalContext, Evaluator};
//!
//! let mut evaluator = Evaluator::new();
//! let ctx = EvalContext::new().with_timeout(Duration::from_millis(50));
//! let err = evaluator.eval_source(&ctx, "(while t nil)").unwrap_err();
//! assert!(matches!(err, Error::DeadlineExceeded));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod tools;

pub use error::{Error, Result};
pub use parser::{parse, parse_one};
pub use runtime::{
    CancelHandle, Environment, EqlMode, EvalContext, Evaluator, Node, PrintMode, StreamRef, Symbol,
};
pub use tools::{Builtin, BuiltinKind};
