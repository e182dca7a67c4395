//! Common validation utilities.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Smallest team that can register for a quiz.
pub const MIN_TEAM_SIZE: i32 = 1;

/// Largest team that can register for a quiz.
pub const MAX_TEAM_SIZE: i32 = 5;

lazy_static::lazy_static! {
    /// Phone numbers as entered on a profile: optional leading `+`, digits and spaces.
    pub static ref PHONE_REGEX: regex::Regex =
        regex::Regex::new(r"^\+?[0-9 ]{6,20}$").unwrap();
}

/// Validates that a team size is within 1 to 5.
pub fn validate_team_size(size: i32) -> Result<(), ValidationError> {
    if (MIN_TEAM_SIZE..=MAX_TEAM_SIZE).contains(&size) {
        Ok(())
    } else {
        let mut err = ValidationError::new("team_size_range");
        err.message = Some("Team size must be between 1 and 5.".into());
        Err(err)
    }
}

/// Validates that the roster matches the declared team size and has no blank names.
pub fn validate_team_roster(size: i32, members: &[String]) -> Result<(), ValidationError> {
    if members.len() != size as usize {
        let mut err = ValidationError::new("team_roster_size");
        err.message = Some("Mismatch between team size and team member names provided.".into());
        return Err(err);
    }

    if members.iter().any(|name| name.trim().is_empty()) {
        let mut err = ValidationError::new("team_roster_blank");
        err.message = Some("Please fill in all team member names.".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a text value contains something other than whitespace.
pub fn validate_non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a quiz is scheduled strictly after `now`.
pub fn validate_future_date_time(
    date_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if date_time > now {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_time_past");
        err.message = Some("Date and time must be in the future.".into());
        Err(err)
    }
}
