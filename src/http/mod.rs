//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum router, middleware stack)
//!     → handlers.rs (endpoint-specific forward-and-respond flow)
//!     → forwarder (proxy to the chosen backend)
//!     → response.rs (annotate or relay, shape errors)
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
