//! Cooperative cancellation for long-running operations
//!
//! Checked at natural checkpoints (before and after a network request or a registry
//! lookup). Nothing is preempted mid-walk.

use crate::{Result, VibeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Shared cancellation flag, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled { op }` once cancellation was requested
    pub fn check(&self, op: &str) -> Result<()> {
        if self.is_cancelled() {
            debug!(op, "operation cancelled");
            return Err(VibeError::Cancelled { op: op.to_string() });
        }
        Ok(())
    }
}

static INTERRUPT: OnceLock<Cancellation> = OnceLock::new();

/// Route Ctrl-C into a process-wide [`Cancellation`]
///
/// The handler is installed on first call; later calls return the same token.
pub fn install_interrupt_handler() -> Cancellation {
    INTERRUPT
        .get_or_init(|| {
            let token = Cancellation::new();
            let handler_token = token.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                debug!("interrupt received");
                handler_token.cancel();
            }) {
                warn!(error = %e, "could not install interrupt handler");
            }
            token
        })
        .clone()
}
