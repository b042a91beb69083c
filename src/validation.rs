//! Payload checks applied before anything reaches the event store.

use chrono::{DateTime, Utc};

use crate::models::{EventCreate, EventUpdate};
use crate::utils::error::AppError;

pub const TITLE_MAX_CHARS: usize = 200;

const TITLE_LENGTH_MESSAGE: &str = "Title must be between 1 and 200 characters";
const TIME_ORDER_MESSAGE: &str = "End time must be after start time";

pub fn validate_title(title: &str) -> Result<(), AppError> {
    let length = title.chars().count();
    if length == 0 || length > TITLE_MAX_CHARS {
        return Err(AppError::ValidationError(TITLE_LENGTH_MESSAGE.to_string()));
    }
    Ok(())
}

pub fn validate_time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::ValidationError(TIME_ORDER_MESSAGE.to_string()));
    }
    Ok(())
}

pub fn validate_create(payload: &EventCreate) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_time_range(payload.start_time, payload.end_time)
}

/// Field-level checks only. The time ordering of a patch depends on the stored
/// row and is checked by the store once the effective values are known.
pub fn validate_update(patch: &EventUpdate) -> Result<(), AppError> {
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    Ok(())
}
