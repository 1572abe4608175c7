//! VTIMEZONE generation from the IANA tz database
//!
//! Transitions are located per calendar year by scanning day by day and
//! bisecting to the second. Onsets are written in the local time in effect
//! before the transition, as RFC 5545 requires.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone};
use chrono_tz::{OffsetComponents, Tz};

/// One offset change found by the scan
#[derive(Debug, Clone, PartialEq, Eq)]
struct Transition {
    /// First UTC instant with the new offset
    at: NaiveDateTime,
    from_secs: i32,
    to_secs: i32,
    name: String,
    daylight: bool,
}

fn offset_secs(tz: Tz, utc: &NaiveDateTime) -> i32 {
    tz.offset_from_utc_datetime(utc).fix().local_minus_utc()
}

fn is_daylight(tz: Tz, utc: &NaiveDateTime) -> bool {
    !tz.offset_from_utc_datetime(utc).dst_offset().is_zero()
}

fn abbreviation(tz: Tz, utc: &NaiveDateTime) -> String {
    tz.from_utc_datetime(utc).format("%Z").to_string()
}

/// Format a UTC offset as `+HHMM` (or `+HHMMSS` for odd historical offsets)
fn format_offset(secs: i32) -> String {
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    let (hours, minutes, seconds) = (abs / 3600, (abs % 3600) / 60, abs % 60);
    if seconds == 0 {
        format!("{}{:02}{:02}", sign, hours, minutes)
    } else {
        format!("{}{:02}{:02}{:02}", sign, hours, minutes, seconds)
    }
}

fn transitions_in_year(tz: Tz, year: i32) -> Vec<Transition> {
    let (Some(first), Some(next_year)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year + 1, 1, 1),
    ) else {
        return Vec::new();
    };
    let end = next_year.and_time(NaiveTime::MIN);

    let mut transitions = Vec::new();
    let mut day = first.and_time(NaiveTime::MIN);
    let mut current = offset_secs(tz, &day);

    while day < end {
        let next = day + TimeDelta::days(1);
        let next_offset = offset_secs(tz, &next);
        if next_offset != current {
            // Seconds into `day`: offset(lo) is old, offset(hi) is new.
            let (mut lo, mut hi) = (0i64, 86_400i64);
            while hi - lo > 1 {
                let mid = lo + (hi - lo) / 2;
                if offset_secs(tz, &(day + TimeDelta::seconds(mid))) == current {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            let hi = day + TimeDelta::seconds(hi);
            transitions.push(Transition {
                at: hi,
                from_secs: current,
                to_secs: next_offset,
                name: abbreviation(tz, &hi),
                daylight: is_daylight(tz, &hi),
            });
            current = next_offset;
        }
        day = next;
    }

    transitions
}

fn component_lines(
    kind: &str,
    onset: NaiveDateTime,
    from_secs: i32,
    to_secs: i32,
    name: &str,
) -> [String; 6] {
    [
        format!("BEGIN:{}", kind),
        format!("DTSTART:{}", onset.format("%Y%m%dT%H%M%S")),
        format!("TZOFFSETFROM:{}", format_offset(from_secs)),
        format!("TZOFFSETTO:{}", format_offset(to_secs)),
        format!("TZNAME:{}", name),
        format!("END:{}", kind),
    ]
}

/// Build the VTIMEZONE component lines for `tz`, covering `year`
///
/// The last offset change before `year` is included so that every instant
/// of the year has an onset at or before it. When there is none, the offset
/// in effect on January 1 is declared from 1970. STANDARD sub-components
/// come before DAYLIGHT ones.
pub fn vtimezone_lines(tz: Tz, year: i32) -> Vec<String> {
    let mut lines = vec!["BEGIN:VTIMEZONE".to_string(), format!("TZID:{}", tz.name())];

    let mut transitions: Vec<Transition> = transitions_in_year(tz, year - 1)
        .pop()
        .into_iter()
        .collect();

    if transitions.is_empty() {
        let reference = NaiveDate::from_ymd_opt(year, 1, 1)
            .unwrap_or_default()
            .and_time(NaiveTime::MIN);
        let offset = offset_secs(tz, &reference);
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap_or_default()
            .and_time(NaiveTime::MIN);
        let kind = if is_daylight(tz, &reference) {
            "DAYLIGHT"
        } else {
            "STANDARD"
        };
        lines.extend(component_lines(
            kind,
            epoch,
            offset,
            offset,
            &abbreviation(tz, &reference),
        ));
    }
    transitions.extend(transitions_in_year(tz, year));

    let (standard, daylight): (Vec<_>, Vec<_>) =
        transitions.into_iter().partition(|t| !t.daylight);
    for (kind, group) in [("STANDARD", standard), ("DAYLIGHT", daylight)] {
        for t in group {
            let onset = t.at + TimeDelta::seconds(i64::from(t.from_secs));
            lines.extend(component_lines(kind, onset, t.from_secs, t.to_secs, &t.name));
        }
    }

    lines.push("END:VTIMEZONE".to_string());
    lines
}
