use axum::{response::IntoResponse, Json};
use serde_json::json;

pub mod events;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Calendar API is running" }))
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
