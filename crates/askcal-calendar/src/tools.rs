//! Calendar tools exposed to the model
//!
//! Every handler reports failures as text so the model can react; none of
//! them return `Err`.

use std::sync::Arc;

use askcal_core::{Result, Tool, ToolManager, ToolResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::ics::{EventSummary, parse_event, parse_events};
use crate::models::CalendarEvent;
use crate::store::CalendarStore;

/// Register `createEvent`, `listEvents` and `listEventsByRange`
pub fn register_calendar_tools(manager: &mut ToolManager, store: Arc<CalendarStore>) {
    manager.register(Arc::new(CreateEventTool::new(Arc::clone(&store))));
    manager.register(Arc::new(ListEventsTool::new(Arc::clone(&store))));
    manager.register(Arc::new(ListEventsByRangeTool::new(store)));
}

fn rfc3339(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn summaries_json(documents: &[String]) -> std::result::Result<String, serde_json::Error> {
    let events: Vec<EventSummary> = documents.iter().flat_map(|d| parse_events(d)).collect();
    serde_json::to_string(&events)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CreateEventArgs {
    title: String,
    date: String,
    time: String,
    #[serde(default)]
    end_time: Option<String>,
    timezone: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

impl CreateEventArgs {
    /// Resolve the local date/time fields into an event
    fn into_event(self) -> std::result::Result<CalendarEvent, String> {
        let tz: Tz = self
            .timezone
            .parse()
            .map_err(|_| format!("Unknown timezone: {}", self.timezone))?;
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date (expected YYYY-MM-DD): {}", self.date))?;
        let start_time = parse_time(&self.time)?;

        let start = resolve_local(tz, date, start_time)?;
        let end = match self.end_time.as_deref() {
            Some(end_time) => resolve_local(tz, date, parse_time(end_time)?)?,
            None => start + TimeDelta::hours(1),
        };

        let mut event = CalendarEvent::new(self.title, start, end).with_timezone(tz);
        event.description = self.description.filter(|d| !d.is_empty());
        event.location = self.location.filter(|l| !l.is_empty());
        Ok(event)
    }
}

const TIME_PATTERN: &str = "^([01][0-9]|2[0-3]):[0-5][0-9]$";

/// Parse a two-digit `HH:MM` time
fn parse_time(value: &str) -> std::result::Result<NaiveTime, String> {
    let invalid = || format!("Invalid time (expected HH:MM): {}", value);
    // chrono accepts single-digit fields, the schema does not.
    if value.len() != 5 || value.as_bytes()[2] != b':' {
        return Err(invalid());
    }
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| invalid())
}

fn resolve_local(
    tz: Tz,
    date: NaiveDate,
    time: NaiveTime,
) -> std::result::Result<DateTime<Utc>, String> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            format!(
                "{} {} does not exist in {}",
                date,
                time.format("%H:%M"),
                tz.name()
            )
        })
}

/// Creates an event in the primary calendar
pub struct CreateEventTool {
    store: Arc<CalendarStore>,
}

impl CreateEventTool {
    pub fn new(store: Arc<CalendarStore>) -> Self {
        Self { store }
    }

    async fn create(&self, input: Value) -> std::result::Result<String, String> {
        let args: CreateEventArgs =
            serde_json::from_value(input).map_err(|e| format!("Invalid arguments: {}", e))?;
        let title = args.title.clone();
        let event = args.into_event()?;

        let locator = self
            .store
            .create_event(&event)
            .await
            .map_err(|e| e.to_string())?;

        // Report what the store actually holds.
        let document = self
            .store
            .fetch_by_locator(&locator)
            .await
            .map_err(|e| e.to_string())?;
        let stored = parse_event(&document).map_err(|e| e.to_string())?;

        info!(locator = %locator, "Event created");
        Ok(format!(
            "Event created successfully for \"{}\" from {} to {}.",
            title,
            rfc3339(&stored.start_date),
            rfc3339(&stored.end_date)
        ))
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        "createEvent"
    }

    fn description(&self) -> &str {
        "Create a calendar event. Pass the local date and time exactly as the user stated them together with an IANA timezone; do not convert times yourself."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Event title"
                },
                "date": {
                    "type": "string",
                    "description": "Local date, YYYY-MM-DD"
                },
                "time": {
                    "type": "string",
                    "pattern": TIME_PATTERN,
                    "description": "Local start time, HH:MM (24-hour)"
                },
                "endTime": {
                    "type": "string",
                    "pattern": TIME_PATTERN,
                    "description": "Local end time on the same date, HH:MM. Default: start + 1h"
                },
                "timezone": {
                    "type": "string",
                    "description": "IANA timezone of the local date and time, e.g. Europe/Helsinki"
                },
                "description": {
                    "type": "string",
                    "description": "Event description"
                },
                "location": {
                    "type": "string",
                    "description": "Event location"
                }
            },
            "required": ["title", "date", "time", "timezone"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        debug!(input = %input, "Creating event");
        Ok(match self.create(input).await {
            Ok(text) => ToolResult::success(text),
            Err(reason) => ToolResult::error(format!("Failed to create event: {}", reason)),
        })
    }
}

/// Lists every event in the primary calendar
pub struct ListEventsTool {
    store: Arc<CalendarStore>,
}

impl ListEventsTool {
    pub fn new(store: Arc<CalendarStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListEventsTool {
    fn name(&self) -> &str {
        "listEvents"
    }

    fn description(&self) -> &str {
        "List all events in the calendar. Prefer listEventsByRange when the time range is known."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value) -> Result<ToolResult> {
        let listed = match self.store.list_all().await {
            Ok(documents) => summaries_json(&documents).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        Ok(match listed {
            Ok(json) => ToolResult::success(format!("Events retrieved successfully: {}", json)),
            Err(reason) => ToolResult::error(format!("Failed to list events: {}", reason)),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeArgs {
    start: String,
    end: String,
}

/// Lists events overlapping a time range
pub struct ListEventsByRangeTool {
    store: Arc<CalendarStore>,
}

impl ListEventsByRangeTool {
    pub fn new(store: Arc<CalendarStore>) -> Self {
        Self { store }
    }

    async fn list(&self, input: Value) -> std::result::Result<String, String> {
        let args: RangeArgs =
            serde_json::from_value(input).map_err(|e| format!("Invalid arguments: {}", e))?;
        let start = parse_instant(&args.start)?;
        let end = parse_instant(&args.end)?;
        if end <= start {
            return Err("Range end must be after range start".to_string());
        }

        let documents = self
            .store
            .list_by_range(start, end)
            .await
            .map_err(|e| e.to_string())?;
        summaries_json(&documents).map_err(|e| e.to_string())
    }
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("Invalid RFC 3339 timestamp: {}", value))
}

#[async_trait]
impl Tool for ListEventsByRangeTool {
    fn name(&self) -> &str {
        "listEventsByRange"
    }

    fn description(&self) -> &str {
        "List events that overlap a time range. Use this to check for conflicts before creating an event."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start": {
                    "type": "string",
                    "description": "Range start, RFC 3339 timestamp with offset"
                },
                "end": {
                    "type": "string",
                    "description": "Range end, RFC 3339 timestamp with offset"
                }
            },
            "required": ["start", "end"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        Ok(match self.list(input).await {
            Ok(json) => ToolResult::success(format!(
                "Events in range retrieved successfully: {}",
                json
            )),
            Err(reason) => ToolResult::error(format!("Failed to list events by range: {}", reason)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askcal_core::CalDavConfig;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRINCIPAL_BODY: &str = r#"<multistatus xmlns="DAV:"><response><href>/</href><propstat><prop><current-user-principal><href>/p/</href></current-user-principal></prop></propstat></response></multistatus>"#;
    const HOME_SET_BODY: &str = r#"<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav"><response><href>/p/</href><propstat><prop><C:calendar-home-set><href>/cal/</href></C:calendar-home-set></prop></propstat></response></multistatus>"#;
    const CALENDARS_BODY: &str = r#"<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav"><response><href>/cal/main/</href><propstat><prop><resourcetype><collection/><C:calendar/></resourcetype></prop></propstat></response></multistatus>"#;

    const STORED_EVENT: &str = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:x@askcal.local\r\n\
DTSTART;TZID=Europe/Helsinki:20261016T170000\r\n\
DTEND;TZID=Europe/Helsinki:20261016T180000\r\n\
SUMMARY:Meeting\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    async fn calendar_server() -> MockServer {
        let server = MockServer::start().await;
        for (at, body) in [
            ("/", PRINCIPAL_BODY),
            ("/p/", HOME_SET_BODY),
            ("/cal/", CALENDARS_BODY),
        ] {
            Mock::given(method("PROPFIND"))
                .and(path(at))
                .respond_with(ResponseTemplate::new(207).set_body_string(body))
                .mount(&server)
                .await;
        }
        server
    }

    fn store_for(server: &MockServer) -> Arc<CalendarStore> {
        Arc::new(CalendarStore::new(CalDavConfig {
            server_url: server.uri(),
            ..CalDavConfig::default()
        }))
    }

    fn report_body(data: &str) -> String {
        format!(
            r#"<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav"><response><href>/cal/main/x.ics</href><propstat><prop><C:calendar-data>{}</C:calendar-data></prop></propstat></response></multistatus>"#,
            data
        )
    }

    #[test]
    fn test_register_catalog() {
        let mut manager = ToolManager::new();
        let store = Arc::new(CalendarStore::new(CalDavConfig::default()));
        register_calendar_tools(&mut manager, store);
        assert_eq!(
            manager.tool_names(),
            vec!["createEvent", "listEvents", "listEventsByRange"]
        );
    }

    #[test]
    fn test_args_into_event() {
        let args = CreateEventArgs {
            title: "Meeting".to_string(),
            date: "2026-10-16".to_string(),
            time: "17:00".to_string(),
            end_time: None,
            timezone: "Europe/Helsinki".to_string(),
            description: Some(String::new()),
            location: Some("Office".to_string()),
        };
        let event = args.into_event().unwrap();
        assert_eq!(rfc3339(&event.start), "2026-10-16T14:00:00Z");
        assert_eq!(rfc3339(&event.end), "2026-10-16T15:00:00Z");
        assert_eq!(event.timezone, Some(chrono_tz::Europe::Helsinki));
        assert_eq!(event.description, None);
        assert_eq!(event.location.as_deref(), Some("Office"));
    }

    #[test]
    fn test_parse_time_requires_two_digits() {
        assert_eq!(parse_time("09:05"), Ok(NaiveTime::from_hms_opt(9, 5, 0).unwrap()));
        assert_eq!(parse_time("23:59"), Ok(NaiveTime::from_hms_opt(23, 59, 0).unwrap()));
        for bad in ["9:00", "09:5", "24:00", "0900", "09:00:00", "ab:cd", "é:000"] {
            assert!(parse_time(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[tokio::test]
    async fn test_create_event_reports_stored_times() {
        let server = calendar_server().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/cal/main/.+\.ics$"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/cal/main/.+\.ics$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STORED_EVENT))
            .mount(&server)
            .await;
        let tool = CreateEventTool::new(store_for(&server));

        let result = tool
            .execute(json!({
                "title": "Meeting",
                "date": "2026-10-16",
                "time": "17:00",
                "timezone": "Europe/Helsinki"
            }))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(
            result.text(),
            "Event created successfully for \"Meeting\" from 2026-10-16T14:00:00Z to 2026-10-16T15:00:00Z."
        );
    }

    #[tokio::test]
    async fn test_create_event_end_before_start() {
        let server = calendar_server().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        let tool = CreateEventTool::new(store_for(&server));

        let result = tool
            .execute(json!({
                "title": "Meeting",
                "date": "2026-10-16",
                "time": "17:00",
                "endTime": "16:00",
                "timezone": "Europe/Helsinki"
            }))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(
            result.text(),
            "Failed to create event: Event end time must be after start time"
        );
    }

    #[tokio::test]
    async fn test_create_event_bad_arguments() {
        let tool = CreateEventTool::new(Arc::new(CalendarStore::new(CalDavConfig::default())));

        let missing = tool.execute(json!({})).await.unwrap();
        assert!(missing.is_error);
        assert!(missing.text().starts_with("Failed to create event: Invalid arguments:"));

        let unknown_field = tool
            .execute(json!({
                "title": "x", "date": "2026-10-16", "time": "17:00",
                "timezone": "Europe/Helsinki", "startIso": "2026-10-16T14:00:00Z"
            }))
            .await
            .unwrap();
        assert!(unknown_field.is_error);

        let bad_zone = tool
            .execute(json!({
                "title": "x", "date": "2026-10-16", "time": "17:00", "timezone": "Mars/Base"
            }))
            .await
            .unwrap();
        assert_eq!(bad_zone.text(), "Failed to create event: Unknown timezone: Mars/Base");
    }

    #[tokio::test]
    async fn test_create_event_store_unreachable() {
        // Nothing listens on port 9.
        let store = Arc::new(CalendarStore::new(CalDavConfig {
            server_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..CalDavConfig::default()
        }));
        let tool = CreateEventTool::new(store);

        let result = tool
            .execute(json!({
                "title": "x", "date": "2026-10-16", "time": "17:00", "timezone": "UTC"
            }))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.text().starts_with("Failed to create event: Connection error:"));
    }

    #[tokio::test]
    async fn test_list_events() {
        let server = calendar_server().await;
        Mock::given(method("REPORT"))
            .and(path("/cal/main/"))
            .respond_with(ResponseTemplate::new(207).set_body_string(report_body(STORED_EVENT)))
            .mount(&server)
            .await;
        let tool = ListEventsTool::new(store_for(&server));

        let result = tool.execute(json!({})).await.unwrap();
        assert!(!result.is_error);

        let text = result.text();
        let json = text.strip_prefix("Events retrieved successfully: ").unwrap();
        let events: Value = serde_json::from_str(json).unwrap();
        assert_eq!(events[0]["summary"], "Meeting");
        assert_eq!(events[0]["startDate"], "2026-10-16T14:00:00Z");
    }

    #[tokio::test]
    async fn test_list_events_failure_is_text() {
        let server = calendar_server().await;
        Mock::given(method("REPORT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let tool = ListEventsTool::new(store_for(&server));

        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.is_error);
        assert!(result.text().starts_with("Failed to list events: CalDAV error:"));
    }

    #[tokio::test]
    async fn test_list_by_range() {
        let server = calendar_server().await;
        Mock::given(method("REPORT"))
            .and(path("/cal/main/"))
            .respond_with(ResponseTemplate::new(207).set_body_string(report_body(STORED_EVENT)))
            .mount(&server)
            .await;
        let tool = ListEventsByRangeTool::new(store_for(&server));

        let result = tool
            .execute(json!({
                "start": "2026-10-16T00:00:00+03:00",
                "end": "2026-10-17T00:00:00+03:00"
            }))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(
            result
                .text()
                .starts_with("Events in range retrieved successfully: [{")
        );
    }

    #[tokio::test]
    async fn test_list_by_range_invalid_range() {
        let store = Arc::new(CalendarStore::new(CalDavConfig::default()));
        let tool = ListEventsByRangeTool::new(store);

        let reversed = tool
            .execute(json!({
                "start": "2026-10-17T00:00:00Z",
                "end": "2026-10-16T00:00:00Z"
            }))
            .await
            .unwrap();
        assert_eq!(
            reversed.text(),
            "Failed to list events by range: Range end must be after range start"
        );

        let garbage = tool
            .execute(json!({"start": "tomorrow", "end": "2026-10-16T00:00:00Z"}))
            .await
            .unwrap();
        assert_eq!(
            garbage.text(),
            "Failed to list events by range: Invalid RFC 3339 timestamp: tomorrow"
        );
    }
}
