//! Structured logging initialization.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate with tower-http request traces enabled.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
pub fn init(log_level: &str) {
    let default_filter = format!("calorie_balancer={},tower_http=info", log_level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
