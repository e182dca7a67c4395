//! Registration admission engine.
//!
//! Single source of truth for deriving a user's standing for a quiz from
//! their registration history and for deciding whether a new registration
//! fits into the quiz's remaining seats. Every function here is pure; the
//! caller supplies a consistent snapshot of the quiz's registrations.
//!
//! Rules:
//! 1. Only the most recently created record for a (user, quiz) pair counts.
//!    Ties on `created_at` go to the record with the larger id.
//! 2. Pending and accepted records consume a seat; rejected ones do not.
//! 3. A team has 1 to 5 members, one non-blank name per member.
//! 4. A user may register again only when they have no record or their
//!    latest record was rejected.
//! 5. Organizers move a record from pending to accepted or rejected, once.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationError;

use crate::models::{
    Decision, NewRegistrationRequest, ParticipationStatus, Quiz, Registration, RegistrationStatus,
};

/// Business-rule rejection of a new registration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdmissionError {
    #[error("Validation error: {0}")]
    Validation(ValidationError),

    #[error("Already registered with status {0}")]
    AlreadyActive(ParticipationStatus),

    #[error("This quiz is full ({seats} teams)")]
    QuizFull { seats: i32 },
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot move registration from {from} to {to}")]
    InvalidTransition {
        from: RegistrationStatus,
        to: RegistrationStatus,
    },
}

/// Ordering key for a user's records: creation time, then id.
fn recency(registration: &Registration) -> (DateTime<Utc>, Uuid) {
    (registration.created_at, registration.id)
}

/// The record that determines `user_id`'s standing, if any.
pub fn latest_for_user(registrations: &[Registration], user_id: Uuid) -> Option<&Registration> {
    registrations
        .iter()
        .filter(|r| r.user_id == user_id)
        .max_by_key(|r| recency(r))
}

/// Derives a user's current status from the given registration history.
///
/// Input order is irrelevant. Returns `NotRegistered` when the user has no
/// record in `registrations`.
pub fn derive_status(registrations: &[Registration], for_user: Uuid) -> ParticipationStatus {
    latest_for_user(registrations, for_user)
        .map(|r| r.status.into())
        .unwrap_or(ParticipationStatus::NotRegistered)
}

/// Number of seat-holding registrations for a quiz.
pub fn active_count(quiz_id: Uuid, registrations: &[Registration]) -> i64 {
    registrations
        .iter()
        .filter(|r| r.quiz_id == quiz_id && r.holds_seat())
        .count() as i64
}

/// Seats left on a quiz.
///
/// The raw value goes negative when an edit reduced capacity below the
/// number of admitted teams. Clamp for display only.
pub fn remaining_capacity(quiz: &Quiz, registrations: &[Registration]) -> i64 {
    i64::from(quiz.seats) - active_count(quiz.id, registrations)
}

/// Decides whether `candidate` may register for `quiz`.
///
/// Checks run in order and stop at the first failure: team size, roster,
/// team name, the user's current standing, remaining seats. On success the
/// returned record is `Pending` with a creation time strictly after every
/// existing record of the same (user, quiz) pair.
pub fn try_admit(
    quiz: &Quiz,
    registrations: &[Registration],
    candidate: &NewRegistrationRequest,
    now: DateTime<Utc>,
) -> Result<Registration, AdmissionError> {
    shared::validation::validate_team_size(candidate.team_size)
        .map_err(AdmissionError::Validation)?;
    shared::validation::validate_team_roster(candidate.team_size, &candidate.team_members)
        .map_err(AdmissionError::Validation)?;
    shared::validation::validate_non_blank(&candidate.team_name).map_err(|mut err| {
        err.message = Some("Please enter a team name.".into());
        AdmissionError::Validation(err)
    })?;

    let for_quiz: Vec<Registration> = registrations
        .iter()
        .filter(|r| r.quiz_id == quiz.id)
        .cloned()
        .collect();

    let latest = latest_for_user(&for_quiz, candidate.user_id);
    let status = latest
        .map(|r| ParticipationStatus::from(r.status))
        .unwrap_or(ParticipationStatus::NotRegistered);
    if !status.can_register() {
        return Err(AdmissionError::AlreadyActive(status));
    }

    if remaining_capacity(quiz, &for_quiz) <= 0 {
        return Err(AdmissionError::QuizFull { seats: quiz.seats });
    }

    Ok(Registration {
        id: Uuid::new_v4(),
        user_id: candidate.user_id,
        quiz_id: quiz.id,
        status: RegistrationStatus::Pending,
        team_name: candidate.team_name.trim().to_string(),
        team_size: candidate.team_size,
        team_members: candidate
            .team_members
            .iter()
            .map(|name| name.trim().to_string())
            .collect(),
        created_at: fresh_timestamp(now, latest),
    })
}

/// [`try_admit`] against the current wall clock.
pub fn try_admit_now(
    quiz: &Quiz,
    registrations: &[Registration],
    candidate: &NewRegistrationRequest,
) -> Result<Registration, AdmissionError> {
    try_admit(quiz, registrations, candidate, Utc::now())
}

/// Creation time for a new record: `now` at microsecond precision, moved
/// past `latest` when the clock has not advanced beyond it.
fn fresh_timestamp(now: DateTime<Utc>, latest: Option<&Registration>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match latest {
        Some(previous) if now <= previous.created_at => {
            previous.created_at + Duration::microseconds(1)
        }
        _ => now,
    }
}

/// Applies an organizer decision to a pending registration.
///
/// Capacity is not re-checked: accepting past the seat count is an
/// organizer override.
pub fn transition_status(
    registration: &Registration,
    decision: Decision,
) -> Result<Registration, TransitionError> {
    let to = decision.target_status();
    if registration.status != RegistrationStatus::Pending {
        return Err(TransitionError::InvalidTransition {
            from: registration.status,
            to,
        });
    }

    Ok(Registration {
        status: to,
        ..registration.clone()
    })
}

/// Whether a committed registration landed beyond the quiz's seats.
///
/// Seat-holding records are ranked by `(created_at, id)`; the first `seats`
/// of them are within capacity. Unknown or non-seat-holding ids are never
/// over-admitted.
pub fn is_over_admitted(quiz: &Quiz, registrations: &[Registration], registration_id: Uuid) -> bool {
    let mut active: Vec<&Registration> = registrations
        .iter()
        .filter(|r| r.quiz_id == quiz.id && r.holds_seat())
        .collect();
    active.sort_by_key(|r| recency(r));

    active
        .iter()
        .position(|r| r.id == registration_id)
        .map(|rank| rank as i64 >= i64::from(quiz.seats))
        .unwrap_or(false)
}
