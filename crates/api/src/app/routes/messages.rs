use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::post,
};

use conduit_http::AdapterService;

use crate::app::errors::{ApiResult, error_response};
use crate::middleware::credential;

pub fn router() -> Router {
    Router::new()
        .route("/projects/:id/messages", post(send_message))
        .route("/projects/:id/messages/*subtopic", post(send_message))
}

/// Publish the request body on the bus for the thing whose key is in the
/// `Authorization` header.
///
/// The raw request path is canonicalized here, so a malformed subtopic is
/// rejected before the registry is asked about access.
pub async fn send_message(
    Extension(svc): Extension<Arc<AdapterService>>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> ApiResult {
    let msg = AdapterService::message_for_path(uri.path(), body.to_vec()).map_err(error_response)?;
    let key = credential(&headers)?;

    svc.publish(&key, msg).await.map_err(error_response)?;
    Ok(StatusCode::ACCEPTED.into_response())
}
