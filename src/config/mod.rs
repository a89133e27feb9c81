//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) and/or environment variables
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → shared with all subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend registry is built from it
//!   exactly once at process start
//! - All fields have defaults to allow minimal configs
//! - Environment variables override file values (deployment wins)
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{BackendConfig, BalancerConfig, HealthCheckConfig, ListenerConfig};
