//! HTTP surface (axum) over the relay service.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use tgr_core::{config::Config, relay::Relay};

mod error;
mod routes;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub cors_allow_origins: Vec<String>,
}

impl AppState {
    pub fn new(relay: Arc<Relay>, cfg: &Config) -> Self {
        Self {
            relay,
            cors_allow_origins: cfg.cors_allow_origins.clone(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_allow_origins);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/send", post(routes::send))
        .route("/messages", get(routes::messages))
        .route("/file/{filename}", get(routes::file))
        .route("/toggle", post(routes::toggle))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods(Any)
        .allow_headers(Any)
}
