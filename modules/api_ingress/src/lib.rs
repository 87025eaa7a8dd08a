//! HTTP host for tzplanner: owns the middleware stack, `/health` and the
//! server loop. Domain modules hand in their routers; this crate only wraps
//! and serves them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arc_swap::ArcSwap;
use axum::{extract::Extension, middleware::from_fn, routing::get, Router};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
pub mod shutdown;
pub mod web;

pub use config::ApiIngressConfig;
pub use web::{HealthProbe, NoopProbe};

pub struct ApiIngress {
    // Read-mostly; swapped whole on reload
    config: ArcSwap<ApiIngressConfig>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    pub fn update_config(&self, config: ApiIngressConfig) {
        self.config.store(Arc::new(config));
    }

    /// Merge `routes` with `/health` and wrap everything in the middleware stack.
    ///
    /// Outermost to innermost: SetRequestId -> PropagateRequestId -> Trace ->
    /// push_req_id_to_extensions -> Timeout -> CORS -> BodyLimit.
    pub fn build_router(&self, routes: Router, probe: Arc<dyn HealthProbe>) -> Router {
        let cfg = self.get_config();
        tracing::debug!(?cfg, "Building router");

        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .merge(routes)
            .fallback(web::not_found)
            .layer(Extension(probe))
            .layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes));

        if cfg.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        if cfg.request_timeout_sec > 0 {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(
                cfg.request_timeout_sec,
            )));
        }

        let x_request_id = request_id::header();
        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    request_id::MakeReqId,
                ))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(request_id::create_trace_layer())
                .layer(from_fn(request_id::push_req_id_to_extensions)),
        )
    }

    /// Bind `addr` and serve `router` until `cancel` fires, then drain in-flight requests.
    pub async fn serve(
        &self,
        router: Router,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
        tracing::info!("HTTP server bound on {}", addr);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}
