use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::Extension, http::StatusCode, response::Json};
use serde_json::{json, Value};

/// Dependency check behind `GET /health`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Name reported in the health payload, e.g. "database".
    fn component(&self) -> &'static str;

    async fn check(&self) -> anyhow::Result<()>;
}

/// Probe for hosts without external dependencies.
pub struct NoopProbe;

#[async_trait]
impl HealthProbe for NoopProbe {
    fn component(&self) -> &'static str {
        "none"
    }

    async fn check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub async fn health_check(
    Extension(probe): Extension<Arc<dyn HealthProbe>>,
) -> (StatusCode, Json<Value>) {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match probe.check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Server is working!",
                "data": {
                    "status": "OK",
                    probe.component(): "connected",
                    "timestamp": timestamp
                }
            })),
        ),
        Err(e) => {
            tracing::warn!(component = probe.component(), error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": format!("{} is unreachable", probe.component()),
                    "error": "Service Unavailable",
                    "data": {
                        "status": "DEGRADED",
                        probe.component(): "unreachable",
                        "timestamp": timestamp
                    }
                })),
            )
        }
    }
}

/// Fallback so unknown paths still answer with the JSON envelope.
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
            "error": "Not Found"
        })),
    )
}
