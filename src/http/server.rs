//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with one route per public endpoint
//! - Wire up middleware (timeout, request ID, tracing, CORS)
//! - Spawn the health monitor alongside the serve loop
//! - Serve with graceful shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::forwarder::Forwarder;
use crate::health::HealthMonitor;
use crate::http::handlers;
use crate::http::response::BalancerInfo;
use crate::load_balancer::{BackendNode, Registry, RoundRobin};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub selector: Arc<RoundRobin>,
    pub forwarder: Arc<Forwarder>,
    /// The balancer's own listening port, reported in routing metadata.
    pub listen_port: u16,
    pub started_at: Instant,
}

impl AppState {
    pub fn balancer_info(&self, node: &BackendNode, attempt: Option<u32>) -> BalancerInfo {
        BalancerInfo {
            handled_by: node.name.clone(),
            backend_port: node.port(),
            load_balancer_port: self.listen_port,
            attempt,
        }
    }
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    registry: Arc<Registry>,
}

impl HttpServer {
    /// Create a new server with the given configuration. The registry is
    /// built here, once, and never resized afterward.
    pub fn new(config: BalancerConfig) -> Self {
        let registry = Arc::new(Registry::from_config(&config.backends));
        let selector = Arc::new(RoundRobin::new());
        let forwarder = Arc::new(Forwarder::new(Duration::from_secs(
            config.timeouts.request_secs,
        )));

        let listen_port = config
            .listener
            .bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);

        let state = AppState {
            registry: registry.clone(),
            selector,
            forwarder,
            listen_port,
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            registry,
        }
    }

    fn build_router(config: &BalancerConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static("x-request-id");

        // The outer timeout sits above the per-forward timeout so the
        // forwarder's own deadline fires first on a single hop.
        let outer_timeout = Duration::from_secs(config.timeouts.request_secs + 5);

        Router::new()
            .route("/predict", post(handlers::predict).options(handlers::predict_preflight))
            .route("/history", get(handlers::history))
            .route("/api/predictions/search", get(handlers::search_predictions))
            .route("/dashboard", get(handlers::dashboard))
            .route("/batch/upload", post(handlers::batch_upload))
            .route("/batch/status/{batch_id}", get(handlers::batch_status))
            .route("/batch/history", get(handlers::batch_history))
            .route("/uploads/{filename}", get(handlers::uploads))
            .route("/health", get(handlers::health))
            .route("/stats", get(handlers::stats))
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(TimeoutLayer::new(outer_timeout))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Run the server on the given listener until the shutdown signal fires.
    /// The health monitor runs as a sibling task on the same signal.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.registry.clone(), self.config.health_check.clone());
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
