//! Serde helpers for incoming timestamps.
//!
//! ISO 8601 with an offset is converted to UTC; a timestamp without an offset
//! is taken as UTC as-is.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

pub fn parse(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(aware) = value.parse::<DateTime<Utc>>() {
        return Ok(aware);
    }
    value
        .parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{value}': {e}"))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(de::Error::custom)
}

pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse(&raw).map_err(de::Error::custom))
        .transpose()
}
