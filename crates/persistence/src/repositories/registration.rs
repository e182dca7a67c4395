//! Registration repository for database operations.

use domain::models::Registration;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{RegistrationEntity, RegistrationStatusDb};
use crate::metrics::QueryTimer;

/// Result of a capacity-guarded insert.
#[derive(Debug)]
pub enum GuardedInsert {
    Inserted(RegistrationEntity),
    /// The quiz already holds `seats` pending or accepted registrations.
    Full,
    /// The user already holds a pending or accepted registration for the quiz.
    AlreadyActive,
    QuizMissing,
}

/// Repository for registration-related database operations.
#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("find_registration_by_id");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT * FROM registrations WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_quiz(&self, quiz_id: Uuid) -> Result<Vec<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("list_registrations_by_quiz");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT * FROM registrations
            WHERE quiz_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("list_registrations_by_user");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT * FROM registrations
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_quiz_and_status(
        &self,
        quiz_id: Uuid,
        status: RegistrationStatusDb,
    ) -> Result<Vec<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("list_registrations_by_quiz_and_status");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT * FROM registrations
            WHERE quiz_id = $1 AND status = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(quiz_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("list_registrations_by_user_and_quiz");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT * FROM registrations
            WHERE user_id = $1 AND quiz_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Inserts a registration unless the quiz is already full.
    ///
    /// The quiz row is locked for the duration of the transaction, so
    /// concurrent inserts for the same quiz count seats one at a time.
    pub async fn insert_with_capacity(
        &self,
        registration: &Registration,
        seats: i32,
    ) -> Result<GuardedInsert, sqlx::Error> {
        let timer = QueryTimer::postgres("insert_registration_guarded");
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM quizzes WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(registration.quiz_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            tx.rollback().await?;
            timer.record();
            return Ok(GuardedInsert::QuizMissing);
        }

        let user_active: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM registrations
                WHERE quiz_id = $1 AND user_id = $2 AND status IN ('pending', 'accepted')
            )
            "#,
        )
        .bind(registration.quiz_id)
        .bind(registration.user_id)
        .fetch_one(&mut *tx)
        .await?;
        if user_active {
            tx.rollback().await?;
            timer.record();
            return Ok(GuardedInsert::AlreadyActive);
        }

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM registrations
            WHERE quiz_id = $1 AND status IN ('pending', 'accepted')
            "#,
        )
        .bind(registration.quiz_id)
        .fetch_one(&mut *tx)
        .await?;
        if active >= i64::from(seats) {
            tx.rollback().await?;
            timer.record();
            return Ok(GuardedInsert::Full);
        }

        let inserted = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            INSERT INTO registrations (id, user_id, quiz_id, status, team_name, team_size,
                                       team_members, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(registration.id)
        .bind(registration.user_id)
        .bind(registration.quiz_id)
        .bind(RegistrationStatusDb::from(registration.status))
        .bind(&registration.team_name)
        .bind(registration.team_size)
        .bind(&registration.team_members)
        .bind(registration.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(GuardedInsert::Inserted(inserted))
    }

    /// Compare-and-set on status. `None` when no row matched both id and
    /// expected status.
    pub async fn update_status_if(
        &self,
        id: Uuid,
        expected: RegistrationStatusDb,
        new: RegistrationStatusDb,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("update_registration_status");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            UPDATE registrations
            SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::postgres("delete_registration");
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
