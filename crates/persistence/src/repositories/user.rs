//! User profile repository for database operations.

use domain::models::User;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{UserEntity, UserRoleDb};
use crate::metrics::QueryTimer;

/// Repository for user profile database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT * FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn insert(&self, user: &User) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::postgres("insert_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (id, email, role, name, phone, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(UserRoleDb::from(user.role))
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.location)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Partial update: `None` fields keep their stored value.
    pub async fn update_contact(
        &self,
        id: Uuid,
        phone: Option<&str>,
        location: Option<&str>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::postgres("update_user_contact");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users
            SET phone = COALESCE($2, phone),
                location = COALESCE($3, location),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(phone)
        .bind(location)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
