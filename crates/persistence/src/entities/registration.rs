//! Registration entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Registration, RegistrationStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "lowercase")]
pub enum RegistrationStatusDb {
    Pending,
    Accepted,
    Rejected,
}

impl From<RegistrationStatusDb> for RegistrationStatus {
    fn from(status: RegistrationStatusDb) -> Self {
        match status {
            RegistrationStatusDb::Pending => RegistrationStatus::Pending,
            RegistrationStatusDb::Accepted => RegistrationStatus::Accepted,
            RegistrationStatusDb::Rejected => RegistrationStatus::Rejected,
        }
    }
}

impl From<RegistrationStatus> for RegistrationStatusDb {
    fn from(status: RegistrationStatus) -> Self {
        match status {
            RegistrationStatus::Pending => RegistrationStatusDb::Pending,
            RegistrationStatus::Accepted => RegistrationStatusDb::Accepted,
            RegistrationStatus::Rejected => RegistrationStatusDb::Rejected,
        }
    }
}

/// Database row mapping for the registrations table.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub status: RegistrationStatusDb,
    pub team_name: String,
    pub team_size: i32,
    pub team_members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RegistrationEntity> for Registration {
    fn from(entity: RegistrationEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            quiz_id: entity.quiz_id,
            status: entity.status.into(),
            team_name: entity.team_name,
            team_size: entity.team_size,
            team_members: entity.team_members,
            created_at: entity.created_at,
        }
    }
}
