//! Lenient parsing of hand-edited dates and timestamps.
//!
//! Accepts ISO 8601 / RFC 3339, RFC 2822 and the common spreadsheet
//! spellings, dotted day-first dates (`02.01.2020`) and the compact basic
//! forms `20200102`, `20200102T030405` and `20200102030405`. Ambiguous
//! slashed dates such as `01/02/2020` read month first. A timezone offset, if
//! present, is discarded and the wall-clock time kept. A time with no date is
//! rejected.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d %Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%A, %B %d, %Y",
    "%A %d %B %Y",
];

/// Parse a timestamp; a bare date means midnight.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    if let Some(dt) = parse_zoned(text)
        .or_else(|| parse_naive_datetime(text))
        .or_else(|| parse_compact(text))
    {
        return Ok(dt);
    }
    parse_naive_date(text)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::InvalidDate(text.to_string()))
}

/// Parse a date; a full timestamp is truncated to its date.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    parse_naive_date(text)
        .or_else(|| {
            parse_zoned(text)
                .or_else(|| parse_naive_datetime(text))
                .or_else(|| parse_compact(text))
                .map(|dt| dt.date())
        })
        .ok_or_else(|| Error::InvalidDate(text.to_string()))
}

fn parse_zoned(text: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %z"))
        .map(|dt| dt.naive_local())
        .ok()
}

fn parse_naive_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn parse_naive_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// ISO 8601 basic format. chrono's `%Y` is greedy over digits, so the fixed
/// widths are split by hand.
fn parse_compact(text: &str) -> Option<NaiveDateTime> {
    if !text.is_ascii() {
        return None;
    }
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let (date, time) = match text.len() {
        8 => (text, ""),
        14 => text.split_at(8),
        15 => {
            let (date, rest) = text.split_at(8);
            (date, rest.strip_prefix(['T', 't'])?)
        }
        _ => return None,
    };
    if !digits(date) || !digits(time) {
        return None;
    }
    let num = |s: &str| s.parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(
        date[..4].parse().ok()?,
        num(&date[4..6])?,
        num(&date[6..8])?,
    )?;
    if time.is_empty() {
        return date.and_hms_opt(0, 0, 0);
    }
    date.and_hms_opt(num(&time[..2])?, num(&time[2..4])?, num(&time[4..6])?)
}
