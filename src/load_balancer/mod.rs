//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → registry.rs (healthy subset, registry order)
//!     → round_robin.rs (pick next healthy node, advance cursor)
//!     → backend.rs (node identity, health flag, stats)
//! ```
//!
//! # Design Decisions
//! - Registry is fixed at startup; only health flags and counters mutate
//! - Single shared atomic cursor; no per-request locking
//! - Unhealthy backends excluded from selection, recomputed per call

pub mod backend;
pub mod registry;
pub mod round_robin;

pub use backend::BackendNode;
pub use registry::Registry;
pub use round_robin::RoundRobin;
