//! Calendar document generation (RFC 5545)

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use crate::models::CalendarEvent;

use super::timezone::vtimezone_lines;

/// Product identifier written into every document
pub const PRODID: &str = "-//askcal//calendar//EN";

/// Domain used for generated UIDs when none is configured
pub const DEFAULT_UID_DOMAIN: &str = "askcal.local";

/// Content-line terminator required by RFC 5545
const CRLF: &str = "\r\n";

/// Longest content line in octets before folding
const MAX_LINE_OCTETS: usize = 75;

/// A serialized calendar document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDocument {
    uid: String,
    text: String,
}

impl CalendarDocument {
    /// UID of the contained event
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for CalendarDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Writes events as calendar documents
#[derive(Debug, Clone)]
pub struct IcsWriter {
    uid_domain: String,
}

impl Default for IcsWriter {
    fn default() -> Self {
        Self::new(DEFAULT_UID_DOMAIN)
    }
}

impl IcsWriter {
    pub fn new(uid_domain: impl Into<String>) -> Self {
        Self {
            uid_domain: uid_domain.into(),
        }
    }

    /// Generate a fresh `<uuid>@<domain>` UID
    pub fn generate_uid(&self) -> String {
        format!("{}@{}", uuid::Uuid::new_v4(), self.uid_domain)
    }

    /// Serialize `event`, stamping it with the current time
    pub fn serialize(&self, event: &CalendarEvent) -> CalendarDocument {
        self.serialize_at(event, Utc::now())
    }

    /// Serialize `event` with an explicit DTSTAMP
    ///
    /// Output depends only on the event and `stamp` once the event carries a
    /// UID.
    pub fn serialize_at(&self, event: &CalendarEvent, stamp: DateTime<Utc>) -> CalendarDocument {
        let uid = event
            .uid
            .clone()
            .unwrap_or_else(|| self.generate_uid());

        let mut lines = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{}", PRODID),
            "CALSCALE:GREGORIAN".to_string(),
        ];

        if let Some(tz) = event.timezone {
            let year = event.start.with_timezone(&tz).year();
            lines.extend(vtimezone_lines(tz, year));
        }

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", uid));
        lines.push(format!("DTSTAMP:{}", format_utc(&stamp)));
        lines.push(date_time_line("DTSTART", &event.start, event.timezone));
        lines.push(date_time_line("DTEND", &event.end, event.timezone));
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));

        if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(format!("DESCRIPTION:{}", escape_text(description)));
        }
        if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }

        lines.push("END:VEVENT".to_string());
        lines.push("END:VCALENDAR".to_string());

        let mut text = String::new();
        for line in &lines {
            text.push_str(&fold_line(line));
            text.push_str(CRLF);
        }

        CalendarDocument { uid, text }
    }
}

/// Serialize with the default UID domain and the current time
pub fn serialize(event: &CalendarEvent) -> CalendarDocument {
    IcsWriter::default().serialize(event)
}

/// Escape a TEXT value
///
/// Backslash, comma and semicolon get a leading backslash; line breaks
/// become the two characters `\n`.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | ',' | ';' => {
                out.push('\\');
                out.push(c);
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// `YYYYMMDDTHHMMSSZ`
pub fn format_utc(instant: &DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `YYYYMMDDTHHMMSS` wall-clock time in `tz`
pub fn format_local(instant: &DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y%m%dT%H%M%S").to_string()
}

fn date_time_line(name: &str, instant: &DateTime<Utc>, tz: Option<Tz>) -> String {
    match tz {
        Some(tz) => format!("{};TZID={}:{}", name, tz.name(), format_local(instant, tz)),
        None => format!("{}:{}", name, format_utc(instant)),
    }
}

/// Fold a content line longer than 75 octets
///
/// Continuation lines start with a single space; splits never fall inside a
/// UTF-8 sequence.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut used = 0;
    for c in line.chars() {
        if used + c.len_utf8() > MAX_LINE_OCTETS {
            out.push_str(CRLF);
            out.push(' ');
            used = 1;
        }
        out.push(c);
        used += c.len_utf8();
    }
    out
}
