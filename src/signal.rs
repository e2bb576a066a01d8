//! Cancellation for the blocking wait on the capture tool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Checked by the dispatcher while it waits on a child process.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

/// Flag set by SIGINT (Ctrl+C).
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token and registers the SIGINT handler that sets it.
    ///
    /// Registration failures are ignored; the token can still be cancelled
    /// manually.
    pub fn install() -> Self {
        let token = Self::manual();
        let flag = token.flag.clone();
        let _ = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        });
        token
    }

    /// Creates a token without touching signal handlers.
    pub fn manual() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl Cancellation for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
