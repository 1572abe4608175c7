//! askcal-calendar: calendar side of askcal
//!
//! This crate provides the RFC 5545 writer and reader, the CalDAV store
//! gateway and the calendar tools the model calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use askcal_calendar::{CalendarStore, register_calendar_tools};
//! use askcal_core::{CalDavConfig, ToolManager};
//!
//! let store = Arc::new(CalendarStore::new(CalDavConfig::default()));
//! let mut tools = ToolManager::new();
//! register_calendar_tools(&mut tools, store);
//! ```

pub mod error;
pub mod ics;
pub mod models;
pub mod store;
pub mod tools;

pub use error::{CalendarError, Result};
pub use ics::{CalendarDocument, EventSummary, IcsWriter};
pub use models::{CalendarEvent, CalendarHandle, StoredObject};
pub use store::{CalendarStore, StoreSession};
pub use tools::{CreateEventTool, ListEventsByRangeTool, ListEventsTool, register_calendar_tools};
