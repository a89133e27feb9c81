//! Backend node abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server (name, fixed base URL)
//! - Track health state (single atomic flag, written only by the monitor)
//! - Track per-node forwarding statistics (written only by the forwarder)

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use url::Url;

/// Per-node forwarding counters.
///
/// `requests_forwarded` counts attempts that produced an HTTP response (any
/// status); `errors` counts transport-level failures. Plain atomic increments,
/// no locking.
#[derive(Debug, Default)]
pub struct NodeStats {
    pub requests_forwarded: AtomicU64,
    pub errors: AtomicU64,
}

/// A single backend node behind the balancer.
///
/// `name` and `base_url` are fixed at startup; `healthy` and `stats` are the
/// only mutable fields and use atomics so the health monitor and concurrent
/// request tasks never contend on a lock.
#[derive(Debug)]
pub struct BackendNode {
    /// Display identifier, unique within the registry.
    pub name: String,
    /// Scheme + host + port, fixed at startup.
    pub base_url: Url,
    /// Current health flag. Nodes start healthy until the first probe.
    healthy: AtomicBool,
    /// Forwarding counters.
    pub stats: NodeStats,
}

impl BackendNode {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            healthy: AtomicBool::new(true),
            stats: NodeStats::default(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Set the health flag. Returns the previous value so the caller can log
    /// UP/DOWN transitions.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::Relaxed)
    }

    /// Record an attempt that produced an HTTP response (any status).
    pub fn record_forwarded(&self) {
        self.stats.requests_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transport-level failure (connect error or timeout).
    pub fn record_error(&self) {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Port component of the base URL, for routing metadata.
    pub fn port(&self) -> u16 {
        self.base_url.port_or_known_default().unwrap_or(80)
    }
}
