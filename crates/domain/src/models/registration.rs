//! Registration domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted lifecycle state of a single registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RegistrationStatus {
    /// Converts to the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Accepted => "accepted",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    /// Parses from the stored string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RegistrationStatus::Pending),
            "accepted" => Some(RegistrationStatus::Accepted),
            "rejected" => Some(RegistrationStatus::Rejected),
            _ => None,
        }
    }

    /// Pending and accepted registrations hold a seat.
    pub fn holds_seat(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Pending | RegistrationStatus::Accepted
        )
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's current standing for a quiz, derived from their registration history.
///
/// `NotRegistered` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    NotRegistered,
    Pending,
    Accepted,
    Rejected,
}

impl ParticipationStatus {
    /// A new registration may be created only from these states.
    pub fn can_register(&self) -> bool {
        matches!(
            self,
            ParticipationStatus::NotRegistered | ParticipationStatus::Rejected
        )
    }
}

impl From<RegistrationStatus> for ParticipationStatus {
    fn from(status: RegistrationStatus) -> Self {
        match status {
            RegistrationStatus::Pending => ParticipationStatus::Pending,
            RegistrationStatus::Accepted => ParticipationStatus::Accepted,
            RegistrationStatus::Rejected => ParticipationStatus::Rejected,
        }
    }
}

impl std::fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipationStatus::NotRegistered => write!(f, "not_registered"),
            ParticipationStatus::Pending => write!(f, "pending"),
            ParticipationStatus::Accepted => write!(f, "accepted"),
            ParticipationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A team's request to take part in a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub status: RegistrationStatus,
    pub team_name: String,
    pub team_size: i32,
    pub team_members: Vec<String>,
    #[serde(rename = "timeStamp")]
    pub created_at: DateTime<Utc>,
}

impl Registration {
    /// Whether this record currently consumes one of the quiz's seats.
    pub fn holds_seat(&self) -> bool {
        self.status.holds_seat()
    }
}

/// Organizer verdict on a pending registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    /// The status a pending registration moves to.
    pub fn target_status(&self) -> RegistrationStatus {
        match self {
            Decision::Accept => RegistrationStatus::Accepted,
            Decision::Reject => RegistrationStatus::Rejected,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Accept => write!(f, "accept"),
            Decision::Reject => write!(f, "reject"),
        }
    }
}

/// Team details a client fills in on the registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEntry {
    pub team_name: String,
    pub team_size: i32,
    #[serde(default)]
    pub team_members: Vec<String>,
}

impl TeamEntry {
    /// Attaches the submitting user.
    pub fn for_user(self, user_id: Uuid) -> NewRegistrationRequest {
        NewRegistrationRequest {
            user_id,
            team_name: self.team_name,
            team_size: self.team_size,
            team_members: self.team_members,
        }
    }
}

/// A candidate registration evaluated by the admission engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistrationRequest {
    pub user_id: Uuid,
    pub team_name: String,
    pub team_size: i32,
    pub team_members: Vec<String>,
}
