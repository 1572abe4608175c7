//! iCalendar (RFC 5545) reading and writing

mod generate;
mod parse;
mod timezone;

pub use generate::{
    CalendarDocument, DEFAULT_UID_DOMAIN, IcsWriter, PRODID, escape_text, fold_line, format_local,
    format_utc, serialize,
};
pub use parse::{EventSummary, parse_event, parse_events, unescape_text};
pub use timezone::vtimezone_lines;
