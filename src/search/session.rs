//! Per-session request replacement
//!
//! At most one retrieval per session is current. Starting a new one
//! supersedes whatever is still in flight; its result is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    generation: Arc<AtomicU64>,
}

/// Handle for one request within a session
#[derive(Debug, Clone)]
pub struct SearchTicket {
    generation: Arc<AtomicU64>,
    issued: u64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, invalidating every earlier ticket
    pub fn begin(&self) -> SearchTicket {
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        SearchTicket {
            generation: Arc::clone(&self.generation),
            issued,
        }
    }
}

impl SearchTicket {
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.issued
    }
}
