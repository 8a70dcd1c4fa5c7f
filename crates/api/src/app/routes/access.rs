//! Internal access checks consumed by the protocol adapters. Served on the
//! registry's internal listener, never next to the public routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use conduit_things::ThingsService;

use crate::app::dto::{self, AccessByIdRequest, AccessByKeyRequest, IdentityResponse, ThingIdentifyRequest};
use crate::app::errors::{ApiResult, error_response};

pub fn router() -> Router {
    Router::new()
        .route("/rpc/access/key", post(can_access_by_key))
        .route("/rpc/access/id", post(can_access_by_id))
        .route("/rpc/identify", post(identify))
}

pub async fn can_access_by_key(
    Extension(svc): Extension<Arc<ThingsService>>,
    payload: Result<Json<AccessByKeyRequest>, JsonRejection>,
) -> ApiResult {
    let req = dto::body(payload)?;
    let id = svc
        .can_access_by_key(&req.project_id, &req.key)
        .await
        .map_err(|e| error_response(e.at_trust_boundary()))?;
    Ok(Json(IdentityResponse { id }).into_response())
}

pub async fn can_access_by_id(
    Extension(svc): Extension<Arc<ThingsService>>,
    payload: Result<Json<AccessByIdRequest>, JsonRejection>,
) -> ApiResult {
    let req = dto::body(payload)?;
    svc.can_access_by_id(&req.project_id, &req.thing_id)
        .await
        .map_err(|e| error_response(e.at_trust_boundary()))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn identify(
    Extension(svc): Extension<Arc<ThingsService>>,
    payload: Result<Json<ThingIdentifyRequest>, JsonRejection>,
) -> ApiResult {
    let req = dto::body(payload)?;
    let id = svc
        .identify(&req.key)
        .await
        .map_err(|e| error_response(e.at_trust_boundary()))?;
    Ok(Json(IdentityResponse { id }).into_response())
}
