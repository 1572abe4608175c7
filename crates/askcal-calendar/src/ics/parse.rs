//! Calendar document parsing
//!
//! Reads the VEVENT components of a stored document into JSON-friendly
//! summaries. Only the properties the calendar tools report are kept.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CalendarError, Result};

/// Summary of one stored event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub summary: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A content line split into its parts
#[derive(Debug, PartialEq)]
struct ContentLine<'a> {
    name: String,
    params: Vec<(String, &'a str)>,
    value: &'a str,
}

impl ContentLine<'_> {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }
}

#[derive(Default)]
struct PartialEvent {
    uid: Option<String>,
    summary: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    location: Option<String>,
    description: Option<String>,
}

impl PartialEvent {
    fn finish(self) -> Option<EventSummary> {
        let start = self.start?;
        Some(EventSummary {
            uid: self.uid,
            summary: self.summary.unwrap_or_default(),
            start_date: start,
            end_date: self.end.unwrap_or(start),
            location: self.location,
            description: self.description,
        })
    }
}

/// Parse every VEVENT in `document`
///
/// Events without a usable DTSTART are skipped. A missing DTEND is taken to
/// equal DTSTART.
pub fn parse_events(document: &str) -> Vec<EventSummary> {
    let mut events = Vec::new();
    let mut current: Option<PartialEvent> = None;
    // Open components, innermost last. Properties of a nested VALARM must
    // not land on the enclosing event.
    let mut open: Vec<String> = Vec::new();

    for raw in unfold(document) {
        let Some(line) = split_line(&raw) else {
            continue;
        };

        match line.name.as_str() {
            "BEGIN" => {
                let component = line.value.trim().to_ascii_uppercase();
                if component == "VEVENT" {
                    current = Some(PartialEvent::default());
                }
                open.push(component);
            }
            "END" => {
                let component = line.value.trim().to_ascii_uppercase();
                if let Some(depth) = open.iter().rposition(|c| *c == component) {
                    open.truncate(depth);
                }
                if component == "VEVENT" {
                    if let Some(event) = current.take().and_then(PartialEvent::finish) {
                        events.push(event);
                    }
                }
            }
            name => {
                if open.last().map(String::as_str) != Some("VEVENT") {
                    continue;
                }
                let Some(event) = current.as_mut() else {
                    continue;
                };
                match name {
                    "UID" => event.uid = Some(unescape_text(line.value)),
                    "SUMMARY" => event.summary = Some(unescape_text(line.value)),
                    "LOCATION" => event.location = Some(unescape_text(line.value)),
                    "DESCRIPTION" => event.description = Some(unescape_text(line.value)),
                    "DTSTART" => event.start = parse_date_time(&line).ok(),
                    "DTEND" => event.end = parse_date_time(&line).ok(),
                    _ => {}
                }
            }
        }
    }

    debug!(count = events.len(), "Parsed calendar events");
    events
}

/// Parse the first VEVENT in `document`
pub fn parse_event(document: &str) -> Result<EventSummary> {
    parse_events(document)
        .into_iter()
        .next()
        .ok_or_else(|| CalendarError::ParseError("No VEVENT with a valid DTSTART".to_string()))
}

/// Join folded continuation lines
fn unfold(document: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in document.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match (line.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ if line.is_empty() => {}
            _ => lines.push(line.to_string()),
        }
    }
    lines
}

fn split_line(line: &str) -> Option<ContentLine<'_>> {
    // The value starts at the first colon outside a quoted parameter value.
    let mut in_quotes = false;
    let colon = line.char_indices().find_map(|(i, c)| match c {
        '"' => {
            in_quotes = !in_quotes;
            None
        }
        ':' if !in_quotes => Some(i),
        _ => None,
    })?;

    let (head, value) = (&line[..colon], &line[colon + 1..]);
    let mut parts = head.split(';');
    let name = parts.next()?.trim().to_ascii_uppercase();
    let params = parts
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_uppercase(), v.trim_matches('"')))
        .collect();

    Some(ContentLine {
        name,
        params,
        value,
    })
}

/// Reverse TEXT escaping
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn parse_date_time(line: &ContentLine<'_>) -> Result<DateTime<Utc>> {
    let value = line.value.trim();

    let is_date = line
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || value.len() == 8;
    if is_date {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| CalendarError::ParseError(format!("{}: {}", value, e)))?;
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }

    if let Some(utc) = value.strip_suffix('Z') {
        return parse_naive(utc).map(|dt| dt.and_utc());
    }

    let local = parse_naive(value)?;
    match line.param("TZID") {
        Some(zone) => {
            let tz: Tz = zone
                .parse()
                .map_err(|_| CalendarError::ParseError(format!("Unknown TZID: {}", zone)))?;
            tz.from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| {
                    CalendarError::ParseError(format!("{} does not exist in {}", value, zone))
                })
        }
        // Floating time
        None => Ok(local.and_utc()),
    }
}

fn parse_naive(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map_err(|e| CalendarError::ParseError(format!("{}: {}", value, e)))
}
