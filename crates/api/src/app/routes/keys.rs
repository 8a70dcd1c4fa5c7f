use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};

use conduit_authn::{AuthnService, Key};

use crate::app::dto::{self, IdentifyRequest, IdentityResponse, IssueKeyRequest, RpcIssueRequest, TokenResponse};
use crate::app::errors::{ApiResult, error_response};
use crate::middleware::credential;

pub fn router() -> Router {
    Router::new()
        .route("/keys", post(issue_key))
        .route("/keys/:id", get(retrieve_key).delete(revoke_key))
}

/// Calls from other services. Served on the internal listener only: issue
/// trusts the caller-supplied issuer.
pub fn rpc_router() -> Router {
    Router::new()
        .route("/rpc/issue", post(rpc_issue))
        .route("/rpc/identify", post(rpc_identify))
}

/// Issue an API key for the user behind the `Authorization` token.
pub async fn issue_key(
    Extension(svc): Extension<Arc<AuthnService>>,
    headers: HeaderMap,
    payload: Result<Json<IssueKeyRequest>, JsonRejection>,
) -> ApiResult {
    let token = credential(&headers)?;
    let template = dto::body(payload)?
        .into_template()
        .map_err(error_response)?;

    let key = svc.issue(&token, template).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(key)).into_response())
}

pub async fn retrieve_key(
    Extension(svc): Extension<Arc<AuthnService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let token = credential(&headers)?;
    let key: Key = svc.retrieve(&token, &id).await.map_err(error_response)?;
    Ok(Json(key).into_response())
}

pub async fn revoke_key(
    Extension(svc): Extension<Arc<AuthnService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let token = credential(&headers)?;
    svc.revoke(&token, &id).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Internal: issue any key type for a trusted caller.
pub async fn rpc_issue(
    Extension(svc): Extension<Arc<AuthnService>>,
    payload: Result<Json<RpcIssueRequest>, JsonRejection>,
) -> ApiResult {
    let req = dto::body(payload)?;
    let key = svc
        .issue(&req.issuer, Key::new(req.key_type))
        .await
        .map_err(|e| error_response(e.at_trust_boundary()))?;
    Ok(Json(TokenResponse { value: key.secret }).into_response())
}

/// Internal: resolve a token to its subject.
pub async fn rpc_identify(
    Extension(svc): Extension<Arc<AuthnService>>,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> ApiResult {
    let req = dto::body(payload)?;
    let id = svc
        .identify(&req.token)
        .await
        .map_err(|e| error_response(e.at_trust_boundary()))?;
    Ok(Json(IdentityResponse { id }).into_response())
}
