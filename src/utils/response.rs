use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Error payload shared by every failing endpoint. Browser clients read `detail`.
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub detail: String,
    pub code: String,
}

pub fn created<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::CREATED, Json(data)).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub fn error(code: &str, message: impl Into<String>, status: StatusCode) -> Response {
    let body = ApiErrorBody {
        detail: message.into(),
        code: code.to_string(),
    };

    (status, Json(body)).into_response()
}
