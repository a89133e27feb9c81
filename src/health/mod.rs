//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → Probe each backend's /health concurrently
//!     → 200 = healthy, anything else = unhealthy
//!     → Flip the registry flag, log UP/DOWN transitions
//! ```
//!
//! # Design Decisions
//! - One probe decides; no consecutive-failure hysteresis
//! - The monitor only writes health flags, never touches in-flight requests
//! - Probe errors are swallowed; the loop runs until shutdown

pub mod active;

pub use active::HealthMonitor;
