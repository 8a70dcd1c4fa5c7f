use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use conduit_core::Error;

/// Handler result: both arms are complete responses.
pub type ApiResult = Result<axum::response::Response, axum::response::Response>;

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::MalformedEntity(_) | Error::MalformedData | Error::MalformedSubtopic => {
            StatusCode::BAD_REQUEST
        }
        Error::Unauthorized | Error::KeyExpired => StatusCode::FORBIDDEN,
        Error::NotFound => StatusCode::NOT_FOUND,
        Error::Conflict => StatusCode::CONFLICT,
        Error::Rpc(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: Error) -> axum::response::Response {
    json_error(status_for(&err), err.code(), err.to_string())
}

/// 401 for requests that carry no credential at all.
pub fn missing_credentials() -> axum::response::Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        Error::Unauthorized.code(),
        "missing credentials",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
