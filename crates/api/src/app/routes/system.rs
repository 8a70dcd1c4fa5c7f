use axum::{Json, Router, http::StatusCode, routing::get};
use serde_json::{Value, json};

/// `/health` and `/version`, mounted on every service.
pub fn router(service: &'static str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(move || version(service)))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

async fn version(service: &'static str) -> Json<Value> {
    Json(json!({
        "service": service,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
