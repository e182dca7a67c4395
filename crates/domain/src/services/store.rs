//! Store ports for the quizzes, registrations and users collections.
//!
//! The backing document store is external. Adapters live in the
//! persistence crate; services depend only on these traits.

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{Quiz, Registration, RegistrationStatus, User};

/// Errors reported by a store adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or failed before applying anything.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A compare-and-set precondition did not hold.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store enforced quiz capacity at write time and refused the insert.
    #[error("Quiz capacity exhausted")]
    CapacityExhausted,

    /// The user already holds a pending or accepted registration for the quiz.
    #[error("Registration already active")]
    AlreadyActive,

    /// The write may or may not have been applied; a reconciling read is required.
    #[error("Write outcome unknown: {0}")]
    Ambiguous(String),
}

/// What happened to a registration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    StatusChanged,
    Deleted,
    /// Notifications may have been missed; consumers should reload.
    Resync,
}

/// A change notification for one registration of a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationChange {
    pub quiz_id: Uuid,
    pub registration_id: Uuid,
    pub kind: ChangeKind,
}

/// Stream of registration changes for one quiz.
///
/// Dropping the feed releases the underlying subscription: the adapter's
/// next send fails and it stops forwarding.
#[derive(Debug)]
pub struct ChangeFeed {
    quiz_id: Uuid,
    receiver: mpsc::Receiver<RegistrationChange>,
}

impl ChangeFeed {
    /// Creates a bounded feed and the sender an adapter forwards into.
    pub fn channel(quiz_id: Uuid, buffer: usize) -> (mpsc::Sender<RegistrationChange>, Self) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (sender, Self { quiz_id, receiver })
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz_id
    }

    /// Waits for the next change; `None` once the adapter closed the feed.
    pub async fn next(&mut self) -> Option<RegistrationChange> {
        self.receiver.recv().await
    }

    /// Takes an already-buffered change without waiting.
    pub fn try_next(&mut self) -> Option<RegistrationChange> {
        self.receiver.try_recv().ok()
    }
}

/// Access to the `quizzes` collection.
#[async_trait::async_trait]
pub trait QuizStore: Send + Sync {
    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError>;

    /// All quizzes ordered by `date_time` ascending.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StoreError>;

    /// Quizzes created by `author_id`, ordered by `date_time` ascending.
    async fn list_quizzes_by_author(&self, author_id: Uuid) -> Result<Vec<Quiz>, StoreError>;

    async fn list_quizzes_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Quiz>, StoreError>;

    async fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, StoreError>;

    /// Replaces a stored quiz; `NotFound` when it no longer exists.
    async fn update_quiz(&self, quiz: Quiz) -> Result<Quiz, StoreError>;

    async fn delete_quiz(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Access to the `registrations` collection.
#[async_trait::async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError>;

    async fn list_by_quiz(&self, quiz_id: Uuid) -> Result<Vec<Registration>, StoreError>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Registration>, StoreError>;

    async fn list_by_quiz_and_status(
        &self,
        quiz_id: Uuid,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, StoreError>;

    async fn list_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError>;

    /// Inserts a new registration.
    ///
    /// The insert is refused with [`StoreError::AlreadyActive`] when the
    /// same user already holds a seat-holding record for the quiz. Adapters
    /// that can enforce capacity atomically refuse it with
    /// [`StoreError::CapacityExhausted`] when `seats` seat-holding records
    /// already exist for the quiz.
    async fn insert_registration(
        &self,
        registration: Registration,
        seats: i32,
    ) -> Result<Registration, StoreError>;

    /// Sets `status` to `new` only if it currently equals `expected`.
    ///
    /// Returns `Ok(None)` when the record exists but the precondition failed.
    async fn update_status_if(
        &self,
        id: Uuid,
        expected: RegistrationStatus,
        new: RegistrationStatus,
    ) -> Result<Option<Registration>, StoreError>;

    async fn delete_registration(&self, id: Uuid) -> Result<(), StoreError>;

    /// Opens a change feed for one quiz's registrations.
    async fn subscribe(&self, quiz_id: Uuid) -> Result<ChangeFeed, StoreError>;
}

/// Access to the `users` collection.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn update_contact(
        &self,
        id: Uuid,
        phone: Option<String>,
        location: Option<String>,
    ) -> Result<Option<User>, StoreError>;
}
