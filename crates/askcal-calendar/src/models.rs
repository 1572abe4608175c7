//! Data models for calendar integration

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// A single calendar event
///
/// Instants are absolute; `timezone` only controls how they are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Event unique identifier, generated at serialization when absent
    #[serde(default)]
    pub uid: Option<String>,
    /// Event start time
    pub start: DateTime<Utc>,
    /// Event end time
    pub end: DateTime<Utc>,
    /// Event summary/title
    pub title: String,
    /// Event description
    #[serde(default)]
    pub description: Option<String>,
    /// Event location
    #[serde(default)]
    pub location: Option<String>,
    /// IANA zone used to render start/end as local wall-clock time
    #[serde(default)]
    pub timezone: Option<Tz>,
}

impl CalendarEvent {
    /// Create a new calendar event
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            uid: None,
            start,
            end,
            title: title.into(),
            description: None,
            location: None,
            timezone: None,
        }
    }

    /// Set the UID
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the timezone
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Check the event can be persisted (end strictly after start)
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(CalendarError::InvalidEvent(
                "Event end time must be after start time".to_string(),
            ));
        }
        Ok(())
    }
}

/// A calendar collection on the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarHandle {
    /// Absolute collection URL, always ending in `/`
    pub url: String,
    pub display_name: Option<String>,
}

/// A calendar object as stored on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Absolute object URL (the locator)
    pub url: String,
    pub etag: Option<String>,
    /// Raw calendar document
    pub data: String,
}
