//! HTTP routes: the web page, generation endpoints and health checks

mod generate;
mod ui;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use wordgap_core::{AssemblerConfig, ServerConfig};

use crate::state::AppState;

pub use generate::{GenerateQuery, GenerateRequest, GenerateResponse};

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);

    let router = Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health))
        .route("/api/config", get(current_config))
        .route("/api/generate", post(generate::audio))
        .route("/api/generate/json", post(generate::json))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn current_config(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<AssemblerConfig> {
    Json(state.config.assembler.clone())
}

fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    if !config.cors_enabled {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers(Any);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    Some(layer.allow_origin(origins))
}
