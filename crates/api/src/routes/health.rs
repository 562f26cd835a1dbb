//! Liveness endpoint for the guildlink server.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health — answers as long as the link server is up; carries the
/// service name so probes can tell deployments apart.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "guildlink",
    })
}
