//! Error types for the islet interpreter
//!
//! Every failure the evaluator can produce is a variant of [`Error`]; the
//! evaluator itself never panics. Non-local control transfers (`return-from`,
//! `throw`, `quit`) travel through the same channel as distinguished variants
//! and are intercepted by the owning construct (`block`, `catch`, the session
//! driver).

use thiserror::Error;

use crate::runtime::{Node, Symbol};

/// Interpreter errors and control-transfer signals
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Reader errors
    /// Syntax error encountered while reading source text
    ///
    /// **Triggered by:** unmatched parentheses, unterminated strings,
    /// malformed character literals
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError {
        /// Line number where the error occurred
        line: usize,
        /// Error description
        message: String,
    },

    /// Source text ended in the middle of a form
    #[error("Unexpected end of input")]
    UnexpectedEof,

    // Argument arity
    /// Too few arguments for a function, macro, or special form
    #[error("Too few arguments")]
    TooFewArguments,

    /// Too many arguments for a function, macro, or special form
    #[error("Too many arguments")]
    TooManyArguments,

    // Type expectations
    /// Operation expected one type but received another
    ///
    /// **Triggered by:** `(car 1)`, `(+ 'x 2)`, `(format 7 "~a" 1)` and the
    /// like. `expected` names the type family (`cons`, `symbol`, `number`,
    /// `string`, `character`, `function`, `sequence`, `writer`).
    #[error("Expected {expected}: `{got}`")]
    TypeError {
        /// Expected type family
        expected: &'static str,
        /// Printed form of the offending value
        got: String,
    },

    // Runtime errors
    /// Reference to a variable with no binding in any enclosing frame
    #[error("Unbound variable: {name}")]
    UnboundVariable {
        /// Variable name
        name: Symbol,
    },

    /// Head of a form evaluated to something that cannot be applied
    #[error("Not callable: {type_name}")]
    NotCallable {
        /// Type of the non-callable value
        type_name: &'static str,
    },

    /// A special form received arguments it cannot interpret
    #[error("Malformed {form}: {reason}")]
    MalformedForm {
        /// Special form name
        form: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Generic-accessor dispatch found no entry for the receiver's class
    /// or any of its superclasses
    #[error("Accessor {accessor} is not applicable to class {class}")]
    AccessorNotApplicable {
        /// Accessor function name
        accessor: Symbol,
        /// Class of the receiver
        class: Symbol,
    },

    // Format interpreter
    /// Unknown directive letter after `~`
    #[error("Unknown format directive '~{0}'")]
    UnknownDirective(char),

    /// Malformed directive parameter in a format-control string
    #[error("Invalid format control: {0}")]
    InvalidFormat(String),

    // Control transfer (not failures; absorbed by the owning construct)
    /// Signal raised by `return` / `return-from`, absorbed by a matching
    /// `block` (or a function body, which is an implicitly named block)
    #[error("Unexpected (return-from {})", early_return_name(.name))]
    EarlyReturn {
        /// Target block name; `None` for anonymous `return`
        name: Option<Symbol>,
        /// Value carried to the block
        value: Node,
    },

    /// Signal raised by `throw`, absorbed by a `catch` with a matching tag
    #[error("Uncaught throw: tag {tag}")]
    Thrown {
        /// Tag identifying the target catch point
        tag: Node,
        /// Value being thrown
        value: Node,
    },

    /// Clean termination request from `(quit)` / `(exit)`; session-level
    /// callers must treat this as a shutdown, not a failure
    #[error("Quit")]
    Quit,

    // Resource control
    /// Evaluation was cancelled through its [`EvalContext`](crate::EvalContext)
    #[error("Evaluation cancelled")]
    Cancelled,

    /// Evaluation ran past its configured deadline
    #[error("Evaluation deadline exceeded")]
    DeadlineExceeded,

    /// Underlying writer failure while printing
    #[error("I/O error: {0}")]
    Io(String),

    // User-raised
    /// Condition raised by `(error fmt args...)`
    #[error("{0}")]
    User(String),
}

fn early_return_name(name: &Option<Symbol>) -> String {
    match name {
        Some(n) => n.to_string(),
        None => "nil".to_string(),
    }
}

impl Error {
    /// Creates a type-expectation error from the offending node.
    pub fn expected(expected: &'static str, got: &Node) -> Self {
        Error::TypeError {
            expected,
            got: got.to_prin1_string(),
        }
    }

    /// True for control-transfer signals that a surrounding construct may
    /// absorb without reporting
    pub fn is_control_transfer(&self) -> bool {
        matches!(
            self,
            Error::EarlyReturn { .. } | Error::Thrown { .. } | Error::Quit
        )
    }

    /// True when this error is the distinguished clean-termination request
    pub fn is_quit(&self) -> bool {
        matches!(self, Error::Quit)
    }

    /// True when `handler-case` may bind this error. Control transfers and
    /// cancellation signals pass through handlers untouched.
    pub fn is_condition(&self) -> bool {
        !matches!(
            self,
            Error::EarlyReturn { .. }
                | Error::Thrown { .. }
                | Error::Quit
                | Error::Cancelled
                | Error::DeadlineExceeded
        )
    }

    /// Condition-designator identity: does `designator` designate this error?
    ///
    /// Two conditions match when they are the same kind of error, regardless
    /// of payload; `Thrown` additionally compares tags by value.
    pub fn designates(&self, designator: &Error) -> bool {
        match (self, designator) {
            (Error::Thrown { tag: a, .. }, Error::Thrown { tag: b, .. }) => {
                a.equals(b, crate::runtime::EqlMode::Equal)
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(designator),
        }
    }
}

/// Result type for islet operations
pub type Result<T> = std::result::Result<T, Error>;
