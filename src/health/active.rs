//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's health endpoint
//! - Flip the node health flag on a changed result and log the transition
//! - Never exit on probe failure; only shutdown stops the loop

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::{BackendNode, Registry};
use crate::observability::metrics;

pub struct HealthMonitor {
    registry: Arc<Registry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<Registry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every node concurrently so one slow backend cannot delay the
    /// others within a tick; each probe carries its own timeout.
    async fn check_all(&self) {
        let probes = self
            .registry
            .nodes()
            .iter()
            .map(|node| self.check_node(node.clone()));
        join_all(probes).await;
    }

    async fn check_node(&self, node: Arc<BackendNode>) {
        let healthy = self.probe(&node).await;

        let was_healthy = node.set_healthy(healthy);
        if was_healthy != healthy {
            let status = if healthy { "UP" } else { "DOWN" };
            tracing::info!(
                backend = %node.name,
                url = %node.base_url,
                status,
                "Backend status changed"
            );
        }

        metrics::record_backend_health(&node.name, healthy);
    }

    /// One bounded-timeout GET against the node's health endpoint. Any
    /// non-200 status, connect error, or timeout reads as unhealthy.
    async fn probe(&self, node: &BackendNode) -> bool {
        let uri = format!(
            "{}{}",
            node.base_url.as_str().trim_end_matches('/'),
            self.config.path
        );

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "calorie-balancer-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(backend = %node.name, error = %e, "Failed to build health check request");
                return false;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let healthy = response.status() == axum::http::StatusCode::OK;
                if !healthy {
                    tracing::debug!(
                        backend = %node.name,
                        status = %response.status(),
                        "Health check failed: non-200 status"
                    );
                }
                healthy
            }
            Ok(Err(e)) => {
                tracing::debug!(backend = %node.name, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %node.name, "Health check failed: timeout");
                false
            }
        }
    }
}
