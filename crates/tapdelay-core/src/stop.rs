//! Shared cooperative stop flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable stop request shared by the engine, the control loop and
/// signal handlers.
///
/// Setting it never interrupts I/O in progress; each loop observes it at its
/// next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// A fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether termination was requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
