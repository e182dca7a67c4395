//! PostgreSQL adapter for the store ports.
//!
//! Capacity is enforced inside the insert transaction and status changes
//! are compare-and-set updates. Change feeds ride on `LISTEN
//! registration_changes`, fed by a trigger on the registrations table.

use async_trait::async_trait;
use domain::models::{Quiz, Registration, RegistrationStatus, User};
use domain::services::{
    ChangeFeed, ChangeKind, QuizStore, RegistrationChange, RegistrationStore, StoreError, UserStore,
};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::RegistrationStatusDb;
use crate::metrics::{record_store_error, BACKEND_POSTGRES};
use crate::repositories::{GuardedInsert, QuizRepository, RegistrationRepository, UserRepository};

/// Notification channel the registrations trigger publishes on.
pub const CHANGE_CHANNEL: &str = "registration_changes";

const DEFAULT_FEED_BUFFER: usize = 64;

/// Store adapter backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    quizzes: QuizRepository,
    registrations: RegistrationRepository,
    users: UserRepository,
    feed_buffer: usize,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            quizzes: QuizRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            feed_buffer: DEFAULT_FEED_BUFFER,
        }
    }

    /// Sets how many undelivered changes a feed buffers.
    pub fn with_feed_buffer(mut self, feed_buffer: usize) -> Self {
        self.feed_buffer = feed_buffer;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Starts recording connection pool gauges; the task ends when the pool closes.
    pub fn spawn_pool_metrics(&self, every: Duration) -> JoinHandle<()> {
        crate::metrics::spawn_pool_metrics(self.pool.clone(), every)
    }
}

/// Maps a failed read. Nothing was written, so every failure is retryable.
fn read_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
        other => {
            record_store_error(BACKEND_POSTGRES, "unavailable");
            StoreError::Unavailable(other.to_string())
        }
    }
}

/// Maps a failed write.
///
/// Errors raised before the statement reached the server, or reported by
/// the server itself, mean nothing was applied. A broken connection in
/// mid-flight leaves the outcome unknown.
fn write_error(err: sqlx::Error) -> StoreError {
    let (kind, mapped) = match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23503") => ("not_found", StoreError::NotFound(db_err.message().to_string())),
            Some(code) if code.starts_with("23") => {
                ("conflict", StoreError::Conflict(db_err.message().to_string()))
            }
            _ => ("unavailable", StoreError::Unavailable(err.to_string())),
        },
        sqlx::Error::Io(_) | sqlx::Error::Protocol(_) | sqlx::Error::WorkerCrashed => {
            ("ambiguous", StoreError::Ambiguous(err.to_string()))
        }
        _ => ("unavailable", StoreError::Unavailable(err.to_string())),
    };
    record_store_error(BACKEND_POSTGRES, kind);
    mapped
}

#[async_trait]
impl QuizStore for PgStore {
    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError> {
        let entity = self.quizzes.find_by_id(id).await.map_err(read_error)?;
        Ok(entity.map(Into::into))
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StoreError> {
        let entities = self.quizzes.list_all().await.map_err(read_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_quizzes_by_author(&self, author_id: Uuid) -> Result<Vec<Quiz>, StoreError> {
        let entities = self
            .quizzes
            .list_by_author(author_id)
            .await
            .map_err(read_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_quizzes_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Quiz>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let entities = self.quizzes.list_by_ids(ids).await.map_err(read_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, StoreError> {
        let entity = self.quizzes.insert(&quiz).await.map_err(write_error)?;
        Ok(entity.into())
    }

    async fn update_quiz(&self, quiz: Quiz) -> Result<Quiz, StoreError> {
        self.quizzes
            .update(&quiz)
            .await
            .map_err(write_error)?
            .map(Into::into)
            .ok_or_else(|| StoreError::NotFound(format!("Quiz {}", quiz.id)))
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<(), StoreError> {
        match self.quizzes.delete(id).await.map_err(write_error)? {
            0 => Err(StoreError::NotFound(format!("Quiz {id}"))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RegistrationStore for PgStore {
    async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        let entity = self.registrations.find_by_id(id).await.map_err(read_error)?;
        Ok(entity.map(Into::into))
    }

    async fn list_by_quiz(&self, quiz_id: Uuid) -> Result<Vec<Registration>, StoreError> {
        let entities = self
            .registrations
            .list_by_quiz(quiz_id)
            .await
            .map_err(read_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Registration>, StoreError> {
        let entities = self
            .registrations
            .list_by_user(user_id)
            .await
            .map_err(read_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_by_quiz_and_status(
        &self,
        quiz_id: Uuid,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, StoreError> {
        let entities = self
            .registrations
            .list_by_quiz_and_status(quiz_id, status.into())
            .await
            .map_err(read_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn list_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError> {
        let entities = self
            .registrations
            .list_by_user_and_quiz(user_id, quiz_id)
            .await
            .map_err(read_error)?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    async fn insert_registration(
        &self,
        registration: Registration,
        seats: i32,
    ) -> Result<Registration, StoreError> {
        match self
            .registrations
            .insert_with_capacity(&registration, seats)
            .await
            .map_err(write_error)?
        {
            GuardedInsert::Inserted(entity) => Ok(entity.into()),
            GuardedInsert::Full => Err(StoreError::CapacityExhausted),
            GuardedInsert::AlreadyActive => Err(StoreError::AlreadyActive),
            GuardedInsert::QuizMissing => Err(StoreError::NotFound(format!(
                "Quiz {}",
                registration.quiz_id
            ))),
        }
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: RegistrationStatus,
        new: RegistrationStatus,
    ) -> Result<Option<Registration>, StoreError> {
        let updated = self
            .registrations
            .update_status_if(
                id,
                RegistrationStatusDb::from(expected),
                RegistrationStatusDb::from(new),
            )
            .await
            .map_err(write_error)?;
        if let Some(entity) = updated {
            return Ok(Some(entity.into()));
        }
        match self.registrations.find_by_id(id).await.map_err(read_error)? {
            Some(_) => Ok(None),
            None => Err(StoreError::NotFound(format!("Registration {id}"))),
        }
    }

    async fn delete_registration(&self, id: Uuid) -> Result<(), StoreError> {
        match self.registrations.delete(id).await.map_err(write_error)? {
            0 => Err(StoreError::NotFound(format!("Registration {id}"))),
            _ => Ok(()),
        }
    }

    async fn subscribe(&self, quiz_id: Uuid) -> Result<ChangeFeed, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(read_error)?;
        listener.listen(CHANGE_CHANNEL).await.map_err(read_error)?;

        let (sender, feed) = ChangeFeed::channel(quiz_id, self.feed_buffer);
        tokio::spawn(forward_changes(listener, quiz_id, sender));
        Ok(feed)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let entity = self.users.find_by_id(id).await.map_err(read_error)?;
        Ok(entity.map(Into::into))
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let entity = self.users.insert(&user).await.map_err(write_error)?;
        Ok(entity.into())
    }

    async fn update_contact(
        &self,
        id: Uuid,
        phone: Option<String>,
        location: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        let entity = self
            .users
            .update_contact(id, phone.as_deref(), location.as_deref())
            .await
            .map_err(write_error)?;
        Ok(entity.map(Into::into))
    }
}

/// JSON payload published by `notify_registration_change()`.
#[derive(Debug, Deserialize)]
struct ChangePayload {
    quiz_id: Uuid,
    registration_id: Uuid,
    op: String,
}

impl ChangePayload {
    fn into_change(self) -> RegistrationChange {
        let kind = match self.op.as_str() {
            "INSERT" => ChangeKind::Inserted,
            "DELETE" => ChangeKind::Deleted,
            _ => ChangeKind::StatusChanged,
        };
        RegistrationChange {
            quiz_id: self.quiz_id,
            registration_id: self.registration_id,
            kind,
        }
    }
}

/// Forwards notifications for one quiz until the feed is dropped.
async fn forward_changes(
    mut listener: PgListener,
    quiz_id: Uuid,
    sender: mpsc::Sender<RegistrationChange>,
) {
    loop {
        let received = tokio::select! {
            _ = sender.closed() => {
                debug!(quiz_id = %quiz_id, "Change feed dropped, releasing listener");
                break;
            }
            received = listener.try_recv() => received,
        };

        let change = match received {
            Ok(Some(notification)) => {
                match serde_json::from_str::<ChangePayload>(notification.payload()) {
                    Ok(payload) if payload.quiz_id == quiz_id => payload.into_change(),
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed registration notification");
                        continue;
                    }
                }
            }
            // Connection dropped; the listener reconnects on the next call.
            Ok(None) => RegistrationChange {
                quiz_id,
                registration_id: Uuid::nil(),
                kind: ChangeKind::Resync,
            },
            Err(e) => {
                warn!(quiz_id = %quiz_id, error = %e, "Registration listener failed");
                break;
            }
        };

        if sender.send(change).await.is_err() {
            break;
        }
    }
}
