//! Error types for askcal-calendar

use thiserror::Error;

/// askcal-calendar error type
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("CalDAV error: {0}")]
    CaldavError(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("XML parsing error: {0}")]
    XmlParseError(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("No calendars found")]
    NoCalendars,

    #[error("{0}")]
    InvalidEvent(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl CalendarError {
    /// Whether the store rejected our credentials
    ///
    /// The memoized session is dropped when this is true.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CalendarError>;
