//! Round-robin selection over the healthy subset of the registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::BackendNode;
use crate::load_balancer::registry::Registry;

/// Round-robin selector.
///
/// The cursor indexes into the healthy subset as it exists at call time and
/// wraps modulo the subset length, so it stays valid when nodes flip health
/// between calls. A flip between two calls can make a node be skipped once or
/// picked twice in a row; that ordering race is accepted, only the cursor
/// update itself is atomic.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next healthy node, or `None` when no node is available.
    pub fn next(&self, registry: &Registry) -> Option<Arc<BackendNode>> {
        let healthy = registry.healthy_nodes();
        if healthy.is_empty() {
            return None;
        }

        let len = healthy.len();
        let picked = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some((c + 1) % len)
            })
            .unwrap_or(0);

        Some(healthy[picked % len].clone())
    }

    /// Current cursor value, exposed via the statistics endpoint.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}
