//! Deadline and cooperative cancellation for a resolution pass

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use skewline_core::{SkewError, SkewResult};

/// Shared cancellation flag; clones observe the same flag
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Checked before every unit of work (one pair, one candidate trial)
#[derive(Clone, Debug)]
pub struct PassControl {
    started: Instant,
    deadline: Option<Duration>,
    cancel: CancelToken,
}

impl PassControl {
    pub fn new(deadline: Option<Duration>, cancel: CancelToken) -> Self {
        PassControl {
            started: Instant::now(),
            deadline,
            cancel,
        }
    }

    /// No deadline, never cancelled
    pub fn unbounded() -> Self {
        Self::new(None, CancelToken::new())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn check(&self) -> SkewResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SkewError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            let elapsed = self.elapsed();
            if elapsed >= deadline {
                return Err(SkewError::DeadlineExceeded { elapsed });
            }
        }
        Ok(())
    }
}

impl Default for PassControl {
    fn default() -> Self {
        Self::unbounded()
    }
}
