//! Cancellation and deadline control
//!
//! Evaluation is synchronous and single-threaded; the only asynchronous-looking
//! contract is cancellation. An [`EvalContext`] is threaded through every
//! evaluation call, and looping forms (`while`, `dotimes`, `dolist`) check it
//! at each iteration boundary so a runaway script can be aborted from outside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Cancellation/deadline token observed by the evaluator
#[derive(Clone, Default)]
pub struct EvalContext {
    cancel: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Cloneable, `Send` handle for requesting cancellation from another thread
#[derive(Clone)]
pub struct CancelHandle {
    cancel: Arc<AtomicBool>,
}

impl EvalContext {
    /// Creates a context that never cancels.
    pub fn new() -> Self {
        EvalContext::default()
    }

    /// Returns a copy of this context that additionally expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        EvalContext {
            cancel: self.cancel.clone(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Returns a handle that can cancel evaluations using this context.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Errors once the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

impl CancelHandle {
    /// Requests cancellation; observed at the next loop iteration boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_passes() {
        assert!(EvalContext::new().check().is_ok());
    }

    #[test]
    fn test_cancel_trips_check() {
        let ctx = EvalContext::new();
        ctx.cancel_handle().cancel();
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_deadline_trips_check() {
        let ctx = EvalContext::new().with_timeout(Duration::from_secs(0));
        assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
    }
}
