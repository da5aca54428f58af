// Application state module
// Shared, read-mostly state handed to every connection

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::Config;
use crate::function::Upstream;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Outbound client, constructed once at startup
    pub upstream: Arc<dyn Upstream>,
    invocations: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config,
            upstream,
            invocations: AtomicU64::new(0),
        }
    }

    /// Allocate the id for the next function invocation (starts at 1)
    pub fn next_invocation_id(&self) -> u64 {
        self.invocations.fetch_add(1, Ordering::Relaxed) + 1
    }
}
