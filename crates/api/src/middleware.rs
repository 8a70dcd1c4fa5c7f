use std::time::Instant;

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use tracing::{debug, info};

use crate::app::errors;

/// Credential from the `Authorization` header.
///
/// The `Bearer ` prefix is optional: devices publishing over HTTP send their
/// raw thing key.
pub fn credential(headers: &HeaderMap) -> Result<String, Response> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(errors::missing_credentials)?;

    let header = header.to_str().map_err(|_| errors::missing_credentials())?;

    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return Err(errors::missing_credentials());
    }

    Ok(token.to_string())
}

/// Log every request with its outcome and duration.
pub async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let res = next.run(req).await;

    let status = res.status().as_u16();
    let elapsed_us = started.elapsed().as_micros() as u64;
    if res.status().is_server_error() {
        info!(%method, path = %path, status, elapsed_us, "request failed");
    } else {
        debug!(%method, path = %path, status, elapsed_us, "request served");
    }
    res
}
