use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
};
use serde_json::json;

use conduit_things::{Thing, ThingsService};

use crate::app::dto::{self, ListQuery, UpdateEntityRequest, UpdateKeyRequest};
use crate::app::errors::{ApiResult, error_response};
use crate::middleware::credential;

pub fn router() -> Router {
    Router::new()
        .route("/things", get(list_things).post(create_things))
        .route(
            "/things/:id",
            get(view_thing).put(update_thing).delete(remove_thing),
        )
        .route("/things/:id/key", patch(update_key))
        .route("/things/:id/projects", get(list_projects_by_thing))
}

/// Create a batch of things. Every thing without a key gets a generated one.
pub async fn create_things(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    payload: Result<Json<Vec<Thing>>, JsonRejection>,
) -> ApiResult {
    let token = credential(&headers)?;
    let things = dto::body(payload)?;

    let things = svc.create_things(&token, things).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "things": things }))).into_response())
}

pub async fn update_thing(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateEntityRequest>, JsonRejection>,
) -> ApiResult {
    let token = credential(&headers)?;
    let req = dto::body(payload)?;

    let thing = Thing {
        id,
        name: req.name,
        metadata: req.metadata,
        ..Thing::default()
    };
    svc.update_thing(&token, thing).await.map_err(error_response)?;
    Ok(StatusCode::OK.into_response())
}

pub async fn update_key(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateKeyRequest>, JsonRejection>,
) -> ApiResult {
    let token = credential(&headers)?;
    let req = dto::body(payload)?;

    svc.update_key(&token, &id, &req.key).await.map_err(error_response)?;
    Ok(StatusCode::OK.into_response())
}

pub async fn view_thing(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let token = credential(&headers)?;
    let thing = svc.view_thing(&token, &id).await.map_err(error_response)?;
    Ok(Json(thing).into_response())
}

pub async fn list_things(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let token = credential(&headers)?;
    let page = query.page().map_err(error_response)?;

    let page = svc.list_things(&token, page).await.map_err(error_response)?;
    Ok(Json(page).into_response())
}

pub async fn list_projects_by_thing(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let token = credential(&headers)?;
    let page = query.page().map_err(error_response)?;

    let page = svc
        .list_projects_by_thing(&token, &id, page)
        .await
        .map_err(error_response)?;
    Ok(Json(page).into_response())
}

/// Removing a thing that does not exist succeeds.
pub async fn remove_thing(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let token = credential(&headers)?;
    svc.remove_thing(&token, &id).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
