//! Runtime core: values, environments, and the evaluator

pub mod clos;
pub mod context;
pub mod environment;
pub mod evaluator;
pub mod format;
pub mod macros;
pub mod node;
pub mod symbol;

pub use context::{CancelHandle, EvalContext};
pub use environment::{Environment, StreamRef};
pub use evaluator::{Evaluator, Lambda};
pub use node::{
    cons, list_from, list_to_vec, shift, split_keyword_args, ConsCell, EqlMode, ListBuilder, Node,
    PrintMode,
};
pub use symbol::{gensym, Symbol};
