//! Backend registry.
//!
//! # Responsibilities
//! - Hold the fixed, ordered set of backend nodes built once from config
//! - Expose the healthy subset for selection and broadcast
//! - Track the process-wide forwarded-attempt counter

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use url::Url;

use crate::config::BackendConfig;
use crate::load_balancer::backend::BackendNode;

/// Fixed-size ordered registry of backend nodes.
///
/// Built once at startup and never resized; node position is stable for the
/// process lifetime, which the round-robin cursor relies on. Shared via
/// `Arc<Registry>` between the health monitor and request tasks.
#[derive(Debug)]
pub struct Registry {
    nodes: Vec<Arc<BackendNode>>,
    /// Incremented once per forwarding attempt, success or failure.
    total_forwarded: AtomicU64,
}

impl Registry {
    /// Build the registry from configuration. Entries with unparsable URLs
    /// are skipped with a warning; `config::validation` rejects them before
    /// this point in the normal startup path.
    pub fn from_config(configs: &[BackendConfig]) -> Self {
        let mut nodes = Vec::with_capacity(configs.len());
        for config in configs {
            match Url::parse(&config.url) {
                Ok(url) => nodes.push(Arc::new(BackendNode::new(config.name.clone(), url))),
                Err(e) => {
                    tracing::warn!(name = %config.name, url = %config.url, error = %e, "Skipping backend with invalid url");
                }
            }
        }
        Self {
            nodes,
            total_forwarded: AtomicU64::new(0),
        }
    }

    /// All nodes, in registry order.
    pub fn nodes(&self) -> &[Arc<BackendNode>] {
        &self.nodes
    }

    /// Currently-healthy nodes, registry order preserved.
    pub fn healthy_nodes(&self) -> Vec<Arc<BackendNode>> {
        self.nodes
            .iter()
            .filter(|n| n.is_healthy())
            .cloned()
            .collect()
    }

    pub fn healthy_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_healthy()).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Record one forwarding attempt, whatever its outcome.
    pub fn record_attempt(&self) {
        self.total_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_forwarded(&self) -> u64 {
        self.total_forwarded.load(Ordering::Relaxed)
    }
}
