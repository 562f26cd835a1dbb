//! HTTP surface for the identity-link flow.
//!
//! Serves the OAuth entry page and callback that drive the link
//! pipeline, plus health and Prometheus metrics endpoints, with
//! structured logging (tracing) throughout.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use common::Clock;
use linker::{IdentityLinkPipeline, PlatformClient};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};

/// Shared state behind every link-flow route.
pub struct AppState<G, C> {
    pub pipeline: IdentityLinkPipeline<G, C>,
    /// OAuth client identifier, echoed into the authorize URL.
    pub client_id: String,
    /// Redirect URI registered with the platform.
    pub redirect_uri: String,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<G, C>(state: Arc<AppState<G, C>>, metrics_handle: PrometheusHandle) -> Router
where
    G: PlatformClient + 'static,
    C: Clock + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth", get(routes::auth::auth_page::<G, C>))
        .route("/callback", get(routes::auth::callback::<G, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
