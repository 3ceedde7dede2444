pub mod api;
pub mod approval;
pub mod cache;
pub mod config;
pub mod database;
pub mod enforcement;
pub mod error;
pub mod github;
pub mod model;
pub mod webhooks;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub use error::LgtmError;

use config::AppConfig;
use webhooks::Dispatcher;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: AppConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/hook", post(webhooks::github::handle_webhook))
        .route(
            "/api/repos/:owner/:name/maintainers",
            get(api::get_maintainers),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lgtm-app",
        "timestamp": chrono::Utc::now()
    }))
}
