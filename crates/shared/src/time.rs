//! Quiz schedule text formats.
//!
//! Older quiz documents carry their schedule as free text. Two layouts were
//! written over time, day-first (`dd-MM-yyyy HH:mm`) and ISO-like
//! (`yyyy-MM-dd HH:mm`). Newer documents carry RFC 3339 timestamps.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Day-first layout used when organizers pick a date and time.
pub const QUIZ_DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

/// ISO-like layout some clients used when sorting their registrations.
pub const ISO_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Error type for schedule parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateTimeParseError {
    #[error("Empty date and time")]
    Empty,
    #[error("Unrecognized date and time: {0}")]
    Unrecognized(String),
}

/// Parses a quiz schedule in any known layout.
///
/// Naive layouts are interpreted as UTC.
pub fn parse_quiz_date_time(text: &str) -> Result<DateTime<Utc>, DateTimeParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DateTimeParseError::Empty);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }

    [QUIZ_DATE_TIME_FORMAT, ISO_DATE_TIME_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DateTimeParseError::Unrecognized(text.to_string()))
}

/// Formats a schedule in the day-first layout shown on quiz cards.
pub fn format_quiz_date_time(date_time: DateTime<Utc>) -> String {
    date_time.format(QUIZ_DATE_TIME_FORMAT).to_string()
}
