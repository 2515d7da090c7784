//! Todo item model and its wire representation

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier of a todo item.
///
/// Opaque to the client: locally created items get a UUID v7, but the remote
/// service is free to assign any string once it confirms a create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Generate a fresh, time-sortable local identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an existing identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TodoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TodoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Priority bucket of a todo item.
///
/// `Completed` is a pseudo-priority used as a list selector; it is orthogonal
/// to [`TodoItem::is_completed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
    Completed,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::High, Self::Medium, Self::Low, Self::Completed];

    /// Storage and wire name (`HIGH`, `MEDIUM`, ...)
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown priority: {s}")))
    }
}

/// A todo item as held by the local store and exchanged with the remote API.
///
/// The serde form is the wire/snapshot format shared with the remote service:
/// `{"id", "title", "priority", "completed", "createdAt"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub title: String,
    pub priority: Priority,
    #[serde(rename = "completed", default)]
    pub is_completed: bool,
    #[serde(rename = "createdAt", with = "wire_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl TodoItem {
    /// Create a new, not yet completed item with a fresh identifier
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: TodoId::generate(),
            title: title.into(),
            priority,
            is_completed: false,
            created_at: crate::util::now_millis(),
        }
    }

    /// Creation time as epoch milliseconds (storage form)
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    /// Serialize as a pending-operation snapshot
    pub fn to_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a pending-operation snapshot or remote payload
    pub fn from_snapshot(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Convert stored epoch milliseconds back into an instant.
pub fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Database(format!("Timestamp out of range: {millis}")))
}

/// Parse a wire timestamp.
///
/// Accepts an offset-aware RFC 3339 instant (`2024-05-01T10:00:00Z`,
/// `2024-05-01T12:00:00+02:00`) or a zone-less ISO local date-time
/// (`2024-05-01T10:00:00.250`), which is read in the local timezone.
pub fn parse_wire_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let naive = raw
        .parse::<NaiveDateTime>()
        .map_err(|error| Error::InvalidInput(format!("Invalid timestamp '{raw}': {error}")))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::InvalidInput(format!("Nonexistent local time '{raw}'")))
}

/// Format a timestamp for the wire as a UTC instant with millisecond precision.
pub fn format_wire_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod wire_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_wire_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wire_timestamp(&raw).map_err(de::Error::custom)
    }
}
