//! Derived read models for the organizer and client screens.
//!
//! Immutable snapshots computed from store data with the admission rules.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{ParticipationStatus, Quiz, Registration, RegistrationStatus, User};
use crate::services::admission::{derive_status, latest_for_user, remaining_capacity};

/// Display name used when a user's profile could not be loaded.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Registrations of one user for a quiz, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistrations {
    pub user_id: Uuid,
    pub user_name: String,
    pub current_status: ParticipationStatus,
    pub registrations: Vec<Registration>,
}

/// What the organizer sees for one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRegistrationsView {
    pub quiz_id: Uuid,
    pub quiz_name: String,
    pub date_time: DateTime<Utc>,
    pub seats: i32,
    pub accepted_count: i64,
    /// Raw value, negative when over-admitted.
    pub remaining_capacity: i64,
    pub groups: Vec<UserRegistrations>,
}

/// A quiz the client registered for, with their current standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredQuiz {
    pub quiz: Quiz,
    pub status: ParticipationStatus,
    pub registration_id: Uuid,
}

/// An accepted team with contact details of the registering user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedTeam {
    pub registration_id: Uuid,
    pub user_id: Uuid,
    pub team_name: String,
    pub team_size: i32,
    pub team_members: Vec<String>,
    pub contact_name: String,
    pub phone: Option<String>,
}

/// What the registration button offers a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationAction {
    Register,
    RegisterAgain,
    AwaitingApproval,
    Registered,
    Full,
}

/// A client's view of one quiz card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAvailability {
    pub quiz_id: Uuid,
    pub status: ParticipationStatus,
    pub remaining_capacity: i64,
    pub action: RegistrationAction,
}

impl QuizAvailability {
    /// Seats left for display, never below zero.
    pub fn seats_left(&self) -> u32 {
        self.remaining_capacity.clamp(0, i64::from(u32::MAX)) as u32
    }
}

/// Maps a standing and the seats left to the next client action.
pub fn registration_action(status: ParticipationStatus, remaining: i64) -> RegistrationAction {
    match status {
        ParticipationStatus::Pending => RegistrationAction::AwaitingApproval,
        ParticipationStatus::Accepted => RegistrationAction::Registered,
        _ if remaining <= 0 => RegistrationAction::Full,
        ParticipationStatus::Rejected => RegistrationAction::RegisterAgain,
        ParticipationStatus::NotRegistered => RegistrationAction::Register,
    }
}

/// Availability of `quiz` for `user_id`.
pub fn availability(quiz: &Quiz, registrations: &[Registration], user_id: Uuid) -> QuizAvailability {
    let status = derive_status(registrations, user_id);
    let remaining = remaining_capacity(quiz, registrations);
    QuizAvailability {
        quiz_id: quiz.id,
        status,
        remaining_capacity: remaining,
        action: registration_action(status, remaining),
    }
}

/// Groups registrations by user.
///
/// Groups are ordered by their most recent record, newest first; records
/// within a group likewise. Users missing from `names` are shown as
/// [`UNKNOWN_USER`].
pub fn group_by_user(
    registrations: &[Registration],
    names: &HashMap<Uuid, String>,
) -> Vec<UserRegistrations> {
    let mut by_user: HashMap<Uuid, Vec<Registration>> = HashMap::new();
    for registration in registrations {
        by_user
            .entry(registration.user_id)
            .or_default()
            .push(registration.clone());
    }

    let mut groups: Vec<UserRegistrations> = by_user
        .into_iter()
        .map(|(user_id, mut records)| {
            records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            UserRegistrations {
                user_id,
                user_name: names
                    .get(&user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_USER.to_string()),
                current_status: records[0].status.into(),
                registrations: records,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        let newest = |g: &UserRegistrations| (g.registrations[0].created_at, g.registrations[0].id);
        newest(b).cmp(&newest(a))
    });
    groups
}

/// Builds the organizer view of a quiz's registrations.
pub fn build_registrations_view(
    quiz: &Quiz,
    registrations: &[Registration],
    names: &HashMap<Uuid, String>,
) -> QuizRegistrationsView {
    let for_quiz: Vec<Registration> = registrations
        .iter()
        .filter(|r| r.quiz_id == quiz.id)
        .cloned()
        .collect();

    QuizRegistrationsView {
        quiz_id: quiz.id,
        quiz_name: quiz.name.clone(),
        date_time: quiz.date_time,
        seats: quiz.seats,
        accepted_count: for_quiz
            .iter()
            .filter(|r| r.status == RegistrationStatus::Accepted)
            .count() as i64,
        remaining_capacity: remaining_capacity(quiz, &for_quiz),
        groups: group_by_user(&for_quiz, names),
    }
}

/// One entry per quiz `user_id` registered for, soonest quiz first.
///
/// Quizzes missing from `quizzes` (deleted since) are skipped.
pub fn client_overview(
    registrations: &[Registration],
    quizzes: &[Quiz],
    user_id: Uuid,
) -> Vec<RegisteredQuiz> {
    let mut by_quiz: HashMap<Uuid, Vec<Registration>> = HashMap::new();
    for registration in registrations.iter().filter(|r| r.user_id == user_id) {
        by_quiz
            .entry(registration.quiz_id)
            .or_default()
            .push(registration.clone());
    }

    let mut overview: Vec<RegisteredQuiz> = quizzes
        .iter()
        .filter_map(|quiz| {
            let history = by_quiz.get(&quiz.id)?;
            let latest = latest_for_user(history, user_id)?;
            Some(RegisteredQuiz {
                quiz: quiz.clone(),
                status: latest.status.into(),
                registration_id: latest.id,
            })
        })
        .collect();

    overview.sort_by(|a, b| (a.quiz.date_time, a.quiz.id).cmp(&(b.quiz.date_time, b.quiz.id)));
    overview
}

/// Accepted registrations joined with the registering user's contact.
pub fn accepted_teams(
    registrations: &[Registration],
    users: &HashMap<Uuid, User>,
) -> Vec<AcceptedTeam> {
    let mut teams: Vec<&Registration> = registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Accepted)
        .collect();
    teams.sort_by_key(|r| (r.created_at, r.id));

    teams
        .into_iter()
        .map(|r| {
            let user = users.get(&r.user_id);
            AcceptedTeam {
                registration_id: r.id,
                user_id: r.user_id,
                team_name: r.team_name.clone(),
                team_size: r.team_size,
                team_members: r.team_members.clone(),
                contact_name: user
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| UNKNOWN_USER.to_string()),
                phone: user.and_then(|u| u.phone.clone()),
            }
        })
        .collect()
}
