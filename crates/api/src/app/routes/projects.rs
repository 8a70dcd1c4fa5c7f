use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use conduit_things::{Project, ThingsService};

use crate::app::dto::{self, ConnectRequest, ListQuery, UpdateEntityRequest};
use crate::app::errors::{ApiResult, error_response};
use crate::middleware::credential;

pub fn router() -> Router {
    Router::new()
        .route("/projects", get(list_projects).post(create_projects))
        .route(
            "/projects/:id",
            get(view_project).put(update_project).delete(remove_project),
        )
        .route("/projects/:id/things", get(list_things_by_project))
        .route(
            "/projects/:id/things/:thing_id",
            put(connect_one).delete(disconnect),
        )
        .route("/connect", post(connect))
}

pub async fn create_projects(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    payload: Result<Json<Vec<Project>>, JsonRejection>,
) -> ApiResult {
    let token = credential(&headers)?;
    let projects = dto::body(payload)?;

    let projects = svc
        .create_projects(&token, projects)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "projects": projects }))).into_response())
}

pub async fn update_project(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateEntityRequest>, JsonRejection>,
) -> ApiResult {
    let token = credential(&headers)?;
    let req = dto::body(payload)?;

    let project = Project {
        id,
        name: req.name,
        metadata: req.metadata,
        ..Project::default()
    };
    svc.update_project(&token, project).await.map_err(error_response)?;
    Ok(StatusCode::OK.into_response())
}

pub async fn view_project(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let token = credential(&headers)?;
    let project = svc.view_project(&token, &id).await.map_err(error_response)?;
    Ok(Json(project).into_response())
}

pub async fn list_projects(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let token = credential(&headers)?;
    let page = query.page().map_err(error_response)?;

    let page = svc.list_projects(&token, page).await.map_err(error_response)?;
    Ok(Json(page).into_response())
}

pub async fn list_things_by_project(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let token = credential(&headers)?;
    let page = query.page().map_err(error_response)?;

    let page = svc
        .list_things_by_project(&token, &id, page)
        .await
        .map_err(error_response)?;
    Ok(Json(page).into_response())
}

pub async fn remove_project(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let token = credential(&headers)?;
    svc.remove_project(&token, &id).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Connect every listed project to every listed thing, or none of them.
pub async fn connect(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> ApiResult {
    let token = credential(&headers)?;
    let req = dto::body(payload)?;

    svc.connect(&token, &req.project_ids, &req.thing_ids)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK.into_response())
}

pub async fn connect_one(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path((project_id, thing_id)): Path<(String, String)>,
) -> ApiResult {
    let token = credential(&headers)?;
    svc.connect(&token, &[project_id], &[thing_id])
        .await
        .map_err(error_response)?;
    Ok(StatusCode::OK.into_response())
}

pub async fn disconnect(
    Extension(svc): Extension<Arc<ThingsService>>,
    headers: HeaderMap,
    Path((project_id, thing_id)): Path<(String, String)>,
) -> ApiResult {
    let token = credential(&headers)?;
    svc.disconnect(&token, &project_id, &thing_id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
