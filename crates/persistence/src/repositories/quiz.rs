//! Quiz repository for database operations.

use domain::models::Quiz;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::QuizEntity;
use crate::metrics::QueryTimer;

/// Repository for quiz-related database operations.
#[derive(Clone)]
pub struct QuizRepository {
    pool: PgPool,
}

impl QuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<QuizEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("find_quiz_by_id");
        let result = sqlx::query_as::<_, QuizEntity>(
            r#"
            SELECT * FROM quizzes WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_all(&self) -> Result<Vec<QuizEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("list_quizzes");
        let result = sqlx::query_as::<_, QuizEntity>(
            r#"
            SELECT * FROM quizzes ORDER BY date_time ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<QuizEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("list_quizzes_by_author");
        let result = sqlx::query_as::<_, QuizEntity>(
            r#"
            SELECT * FROM quizzes
            WHERE author_id = $1
            ORDER BY date_time ASC, id ASC
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<QuizEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("list_quizzes_by_ids");
        let result = sqlx::query_as::<_, QuizEntity>(
            r#"
            SELECT * FROM quizzes
            WHERE id = ANY($1)
            ORDER BY date_time ASC, id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn insert(&self, quiz: &Quiz) -> Result<QuizEntity, sqlx::Error> {
        let timer = QueryTimer::postgres("insert_quiz");
        let result = sqlx::query_as::<_, QuizEntity>(
            r#"
            INSERT INTO quizzes (id, name, quiz_type, location, fee, seats, date_time,
                                 additional_info, author_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.name)
        .bind(&quiz.quiz_type)
        .bind(&quiz.location)
        .bind(quiz.fee)
        .bind(quiz.seats)
        .bind(quiz.date_time)
        .bind(&quiz.additional_info)
        .bind(quiz.author_id)
        .bind(quiz.created_at)
        .bind(quiz.updated_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Overwrites the editable fields; `None` when the quiz is gone.
    pub async fn update(&self, quiz: &Quiz) -> Result<Option<QuizEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("update_quiz");
        let result = sqlx::query_as::<_, QuizEntity>(
            r#"
            UPDATE quizzes
            SET name = $2,
                quiz_type = $3,
                location = $4,
                fee = $5,
                seats = $6,
                date_time = $7,
                additional_info = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.name)
        .bind(&quiz.quiz_type)
        .bind(&quiz.location)
        .bind(quiz.fee)
        .bind(quiz.seats)
        .bind(quiz.date_time)
        .bind(&quiz.additional_info)
        .bind(quiz.updated_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Returns the number of deleted rows.
    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::postgres("delete_quiz");
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
