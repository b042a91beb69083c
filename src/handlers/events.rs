use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;

use crate::models::{Event, EventCreate, EventFilter, EventUpdate};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, no_content};
use crate::validation::{validate_create, validate_update};

// Extractor rejections are taken as `Result` so malformed input answers 400
// through `AppError` instead of axum's default status codes.

pub async fn list_events(
    State(state): State<AppState>,
    filter: Result<Query<EventFilter>, QueryRejection>,
) -> Result<Json<Vec<Event>>, AppError> {
    let Query(filter) = filter?;
    let events = state.events.list(&filter).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Event>, AppError> {
    let Path(id) = id?;
    let event = state.events.get(id).await?;
    Ok(Json(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<EventCreate>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = body?;
    validate_create(&payload)?;

    let event = state.events.insert(payload).await?;
    Ok(created(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<EventUpdate>, JsonRejection>,
) -> Result<Json<Event>, AppError> {
    let Path(id) = id?;
    let Json(patch) = body?;
    validate_update(&patch)?;

    let event = state.events.update(id, patch).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    state.events.delete(id).await?;
    Ok(no_content())
}
