//! HTTP load balancer for the calorie-estimator backend fleet.

pub mod config;
pub mod forwarder;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
