//! Calorie-estimator load balancer (round-robin + health failover).
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!                    │                LOAD BALANCER                   │
//!                    │                                                │
//!  Client Request    │  ┌────────┐   ┌──────────┐   ┌─────────────┐  │
//!  ──────────────────┼─▶│  http  │──▶│ selector │──▶│  forwarder  │──┼──▶ Backend
//!                    │  │ router │   │ (round-  │   │ (proxy +    │  │    fleet
//!                    │  └────────┘   │  robin)  │   │  timeouts)  │  │
//!                    │               └────┬─────┘   └─────────────┘  │
//!                    │                    │ reads                     │
//!                    │               ┌────▼─────┐   ┌─────────────┐  │
//!                    │               │ registry │◀──│   health    │  │
//!                    │               │ (fixed)  │   │   monitor   │──┼──▶ /health
//!                    │               └──────────┘   └─────────────┘  │    probes
//!                    └───────────────────────────────────────────────┘
//! ```
//!
//! The health monitor only flips registry health flags; it never touches
//! in-flight requests.

use std::path::Path;

use tokio::net::TcpListener;

use calorie_balancer::config;
use calorie_balancer::http::HttpServer;
use calorie_balancer::lifecycle::{signals, Shutdown};
use calorie_balancer::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config path from argv or LB_CONFIG; environment-only otherwise.
    let config = match std::env::args().nth(1).or_else(|| std::env::var("LB_CONFIG").ok()) {
        Some(path) => config::load_config(Path::new(&path))?,
        None => config::load_from_env()?,
    };

    logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        algorithm = "round-robin",
        health_check_interval_secs = config.health_check.interval_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Load balancer starting"
    );
    for (i, backend) in config.backends.iter().enumerate() {
        tracing::info!(index = i + 1, name = %backend.name, url = %backend.url, "Registered backend");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
