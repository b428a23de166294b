use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::IndexError;

/// Cooperative shutdown flag polled by long index scans.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once shutdown is requested. Scans abandon their
    /// partial output on this error; it is not a store failure.
    pub fn check(&self) -> Result<(), IndexError> {
        if self.is_requested() {
            return Err(IndexError::Interrupted);
        }
        Ok(())
    }
}
