//! Quiz entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Quiz;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the quizzes table.
#[derive(Debug, Clone, FromRow)]
pub struct QuizEntity {
    pub id: Uuid,
    pub name: String,
    pub quiz_type: String,
    pub location: String,
    pub fee: i32,
    pub seats: i32,
    pub date_time: DateTime<Utc>,
    pub additional_info: Option<String>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QuizEntity> for Quiz {
    fn from(entity: QuizEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            quiz_type: entity.quiz_type,
            location: entity.location,
            fee: entity.fee,
            seats: entity.seats,
            date_time: entity.date_time,
            additional_info: entity.additional_info,
            author_id: entity.author_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
