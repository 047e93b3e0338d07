//! Parsing of temporal literals found in text cells.
//!
//! Accepted shapes:
//!
//! - `2024-01-31`
//! - `2024-01-31 12:30`, `2024-01-31T12:30:15.123456`
//! - any of the above with `Z`, `+05`, `+05:00` or `+0500` (optionally
//!   space separated)
//! - a date-time followed by an IANA zone name: `2024-01-31 12:30:00 Europe/Athens`

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::dialect::canonical::localize;

/// A parsed temporal literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTemporal {
    Aware(DateTime<Utc>),
    Naive(NaiveDateTime),
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

pub fn parse_temporal(input: &str) -> Result<ParsedTemporal, String> {
    let s = input.trim();
    let unparseable = || format!("unparseable temporal literal {:?}", input);

    if let Some((head, tail)) = s.rsplit_once(' ') {
        if let Ok(tz) = tail.parse::<Tz>() {
            let naive = parse_naive(head.trim()).ok_or_else(unparseable)?;
            return localize(naive, tz).map(ParsedTemporal::Aware);
        }
    }

    let (body, offset) = split_offset(s).ok_or_else(unparseable)?;
    let naive = parse_naive(body).ok_or_else(unparseable)?;
    match offset {
        None => Ok(ParsedTemporal::Naive(naive)),
        Some(off) => off
            .from_local_datetime(&naive)
            .single()
            .map(|t| ParsedTemporal::Aware(t.with_timezone(&Utc)))
            .ok_or_else(unparseable),
    }
}

pub fn parse_time(input: &str) -> Result<NaiveTime, String> {
    let s = input.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("unparseable time literal {:?}", input))
}

/// Split a trailing UTC offset from the time part. Returns `None` when the
/// suffix looks like an offset but is malformed.
fn split_offset(s: &str) -> Option<(&str, Option<FixedOffset>)> {
    if s.len() <= 10 || !s.is_char_boundary(10) {
        return Some((s, None));
    }
    let rest = &s[10..];

    if rest.ends_with('Z') || rest.ends_with('z') {
        let body = s[..s.len() - 1].trim_end();
        return Some((body, FixedOffset::east_opt(0)));
    }

    let Some(pos) = rest.rfind(['+', '-']) else {
        return Some((s, None));
    };
    let sign = if rest.as_bytes()[pos] == b'-' { -1 } else { 1 };
    let digits: String = rest[pos + 1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((s[..10 + pos].trim_end(), Some(offset)))
}

fn parse_naive(body: &str) -> Option<NaiveDateTime> {
    if body.len() == 10 {
        return NaiveDate::parse_from_str(body, "%Y-%m-%d")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN));
    }
    if !body.is_char_boundary(10) || !body.is_char_boundary(11) {
        return None;
    }
    let sep = &body[10..11];
    if sep != " " && sep != "T" {
        return None;
    }
    let unified = format!("{}T{}", &body[..10], body[11..].trim_start());
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&unified, fmt).ok())
}
