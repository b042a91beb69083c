use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::models::timestamp;

pub const DEFAULT_COLOR: &str = "#1a73e8";

/// A stored calendar entry, as persisted and as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload of `POST /api/events`. Server-owned fields are ignored if sent.
#[derive(Debug, Clone, Deserialize)]
pub struct EventCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub start_time: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub color: Option<String>,
}

impl EventCreate {
    pub fn color_or_default(&self) -> String {
        self.color
            .clone()
            .unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }
}

/// Payload of `PUT /api/events/{id}`.
///
/// `description` and `color` are double options: the outer `None` means the
/// field was absent, `Some(None)` means an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub color: Option<Option<String>>,
}

impl EventUpdate {
    pub fn touches_times(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    /// Merges the patched fields into `event`, leaving the rest untouched.
    /// Does not stamp `updated_at`.
    pub fn apply(self, event: &mut Event) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(start_time) = self.start_time {
            event.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            event.end_time = end_time;
        }
        if let Some(color) = self.color {
            event.color = color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
        }
    }
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Query parameters of `GET /api/events`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub end_date: Option<DateTime<Utc>>,
}
