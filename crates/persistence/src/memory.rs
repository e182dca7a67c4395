//! In-memory adapter for the store ports.
//!
//! Used for development and tests. It enforces the same capacity guard
//! and compare-and-set semantics as the PostgreSQL adapter, and can inject
//! faults: an unavailable backend, writes lost before they apply, and
//! writes that apply but whose acknowledgement is lost.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::models::{Quiz, Registration, RegistrationStatus, User};
use domain::services::{
    ChangeFeed, ChangeKind, QuizStore, RegistrationChange, RegistrationStore, StoreError, UserStore,
};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::metrics::{record_store_error, QueryTimer, BACKEND_MEMORY};

/// Construction options for [`InMemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreOptions {
    /// Refuse registration inserts once a quiz's seats are taken.
    pub enforce_capacity: bool,
    /// Undelivered changes buffered per feed.
    pub feed_buffer: usize,
}

impl Default for MemoryStoreOptions {
    fn default() -> Self {
        Self {
            enforce_capacity: true,
            feed_buffer: 64,
        }
    }
}

#[derive(Default)]
struct State {
    quizzes: HashMap<Uuid, Quiz>,
    registrations: HashMap<Uuid, Registration>,
    users: HashMap<Uuid, User>,
    feeds: HashMap<Uuid, Vec<mpsc::Sender<RegistrationChange>>>,
}

impl State {
    /// Fans a change out to the quiz's feeds, dropping released ones.
    ///
    /// A full feed already has a change queued, which is enough to make the
    /// consumer reload, so the extra notification is skipped.
    fn notify(&mut self, quiz_id: Uuid, registration_id: Uuid, kind: ChangeKind) {
        let Some(senders) = self.feeds.get_mut(&quiz_id) else {
            return;
        };
        let change = RegistrationChange {
            quiz_id,
            registration_id,
            kind,
        };
        senders.retain(|sender| match sender.try_send(change.clone()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        if senders.is_empty() {
            self.feeds.remove(&quiz_id);
        }
    }

    fn sorted_registrations<F>(&self, keep: F) -> Vec<Registration>
    where
        F: Fn(&Registration) -> bool,
    {
        let mut found: Vec<Registration> = self
            .registrations
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        found
    }

    fn sorted_quizzes<F>(&self, keep: F) -> Vec<Quiz>
    where
        F: Fn(&Quiz) -> bool,
    {
        let mut found: Vec<Quiz> = self.quizzes.values().filter(|q| keep(q)).cloned().collect();
        found.sort_by(|a, b| (a.date_time, a.id).cmp(&(b.date_time, b.id)));
        found
    }
}

#[derive(Default)]
struct Faults {
    unavailable: AtomicBool,
    lost_writes: AtomicUsize,
    unacknowledged_writes: AtomicUsize,
    failing_users: std::sync::Mutex<HashSet<Uuid>>,
    user_lookup_delay: std::sync::Mutex<Option<Duration>>,
}

enum WriteFault {
    Lost,
    Unacknowledged,
}

impl Faults {
    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn next_write_fault(&self) -> Option<WriteFault> {
        if Self::take(&self.lost_writes) {
            Some(WriteFault::Lost)
        } else if Self::take(&self.unacknowledged_writes) {
            Some(WriteFault::Unacknowledged)
        } else {
            None
        }
    }

    fn user_fails(&self, id: Uuid) -> bool {
        self.failing_users
            .lock()
            .map(|users| users.contains(&id))
            .unwrap_or(false)
    }

    fn user_lookup_delay(&self) -> Option<Duration> {
        self.user_lookup_delay.lock().ok().and_then(|delay| *delay)
    }
}

struct Inner {
    state: Mutex<State>,
    faults: Faults,
    options: MemoryStoreOptions,
}

/// Store adapter holding every collection in process memory.
///
/// Cloning shares the underlying data.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_options(MemoryStoreOptions::default())
    }

    pub fn with_options(options: MemoryStoreOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                faults: Faults::default(),
                options,
            }),
        }
    }

    /// A store that accepts every registration insert, leaving capacity to
    /// the caller's admission check.
    pub fn without_capacity_guard() -> Self {
        Self::with_options(MemoryStoreOptions {
            enforce_capacity: false,
            ..MemoryStoreOptions::default()
        })
    }

    /// Makes every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner
            .faults
            .unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    /// The next `count` writes are dropped and reported as ambiguous.
    pub fn lose_next_writes(&self, count: usize) {
        self.inner.faults.lost_writes.store(count, Ordering::SeqCst);
    }

    /// The next `count` writes are applied but reported as ambiguous.
    pub fn drop_next_acknowledgements(&self, count: usize) {
        self.inner
            .faults
            .unacknowledged_writes
            .store(count, Ordering::SeqCst);
    }

    /// Profile lookups for `id` fail with [`StoreError::Unavailable`].
    pub fn fail_user_lookup(&self, id: Uuid) {
        if let Ok(mut users) = self.inner.faults.failing_users.lock() {
            users.insert(id);
        }
    }

    /// Every profile lookup sleeps for `delay` before answering.
    pub fn delay_user_lookups(&self, delay: Duration) {
        if let Ok(mut current) = self.inner.faults.user_lookup_delay.lock() {
            *current = Some(delay);
        }
    }

    /// Number of open change feeds for a quiz.
    pub async fn subscriber_count(&self, quiz_id: Uuid) -> usize {
        let state = self.inner.state.lock().await;
        state
            .feeds
            .get(&quiz_id)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.faults.unavailable.load(Ordering::SeqCst) {
            record_store_error(BACKEND_MEMORY, "unavailable");
            return Err(StoreError::Unavailable(
                "Simulated store outage".to_string(),
            ));
        }
        Ok(())
    }

    async fn read<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&State) -> T,
    {
        self.check_available()?;
        let timer = QueryTimer::memory(op);
        let state = self.inner.state.lock().await;
        let result = f(&state);
        timer.record();
        Ok(result)
    }

    async fn write<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut State) -> Result<T, StoreError>,
    {
        self.check_available()?;
        let timer = QueryTimer::memory(op);
        let fault = self.inner.faults.next_write_fault();
        if let Some(WriteFault::Lost) = fault {
            record_store_error(BACKEND_MEMORY, "ambiguous");
            return Err(StoreError::Ambiguous(format!("{op}: write lost")));
        }

        let mut state = self.inner.state.lock().await;
        let result = f(&mut state);
        timer.record();

        if let Some(WriteFault::Unacknowledged) = fault {
            record_store_error(BACKEND_MEMORY, "ambiguous");
            return Err(StoreError::Ambiguous(format!(
                "{op}: acknowledgement lost"
            )));
        }
        result
    }
}

#[async_trait]
impl QuizStore for InMemoryStore {
    async fn get_quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError> {
        self.read("get_quiz", |state| state.quizzes.get(&id).cloned())
            .await
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StoreError> {
        self.read("list_quizzes", |state| state.sorted_quizzes(|_| true))
            .await
    }

    async fn list_quizzes_by_author(&self, author_id: Uuid) -> Result<Vec<Quiz>, StoreError> {
        self.read("list_quizzes_by_author", |state| {
            state.sorted_quizzes(|q| q.author_id == author_id)
        })
        .await
    }

    async fn list_quizzes_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Quiz>, StoreError> {
        self.read("list_quizzes_by_ids", |state| {
            state.sorted_quizzes(|q| ids.contains(&q.id))
        })
        .await
    }

    async fn insert_quiz(&self, quiz: Quiz) -> Result<Quiz, StoreError> {
        self.write("insert_quiz", move |state| {
            if state.quizzes.contains_key(&quiz.id) {
                return Err(StoreError::Conflict(format!("Quiz {} already exists", quiz.id)));
            }
            state.quizzes.insert(quiz.id, quiz.clone());
            Ok(quiz)
        })
        .await
    }

    async fn update_quiz(&self, quiz: Quiz) -> Result<Quiz, StoreError> {
        self.write("update_quiz", move |state| match state.quizzes.get_mut(&quiz.id) {
            Some(stored) => {
                *stored = Quiz {
                    author_id: stored.author_id,
                    created_at: stored.created_at,
                    ..quiz
                };
                Ok(stored.clone())
            }
            None => Err(StoreError::NotFound(format!("Quiz {}", quiz.id))),
        })
        .await
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<(), StoreError> {
        self.write("delete_quiz", move |state| {
            if state.quizzes.remove(&id).is_none() {
                return Err(StoreError::NotFound(format!("Quiz {id}")));
            }
            let orphaned: Vec<Uuid> = state
                .registrations
                .values()
                .filter(|r| r.quiz_id == id)
                .map(|r| r.id)
                .collect();
            for registration_id in orphaned {
                state.registrations.remove(&registration_id);
                state.notify(id, registration_id, ChangeKind::Deleted);
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RegistrationStore for InMemoryStore {
    async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        self.read("get_registration", |state| {
            state.registrations.get(&id).cloned()
        })
        .await
    }

    async fn list_by_quiz(&self, quiz_id: Uuid) -> Result<Vec<Registration>, StoreError> {
        self.read("list_registrations_by_quiz", |state| {
            state.sorted_registrations(|r| r.quiz_id == quiz_id)
        })
        .await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Registration>, StoreError> {
        self.read("list_registrations_by_user", |state| {
            state.sorted_registrations(|r| r.user_id == user_id)
        })
        .await
    }

    async fn list_by_quiz_and_status(
        &self,
        quiz_id: Uuid,
        status: RegistrationStatus,
    ) -> Result<Vec<Registration>, StoreError> {
        self.read("list_registrations_by_quiz_and_status", |state| {
            state.sorted_registrations(|r| r.quiz_id == quiz_id && r.status == status)
        })
        .await
    }

    async fn list_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError> {
        self.read("list_registrations_by_user_and_quiz", |state| {
            state.sorted_registrations(|r| r.user_id == user_id && r.quiz_id == quiz_id)
        })
        .await
    }

    async fn insert_registration(
        &self,
        registration: Registration,
        seats: i32,
    ) -> Result<Registration, StoreError> {
        let enforce_capacity = self.inner.options.enforce_capacity;
        self.write("insert_registration", move |state| {
            if !state.quizzes.contains_key(&registration.quiz_id) {
                return Err(StoreError::NotFound(format!(
                    "Quiz {}",
                    registration.quiz_id
                )));
            }
            if state.registrations.contains_key(&registration.id) {
                return Err(StoreError::Conflict(format!(
                    "Registration {} already exists",
                    registration.id
                )));
            }
            if state.registrations.values().any(|r| {
                r.quiz_id == registration.quiz_id
                    && r.user_id == registration.user_id
                    && r.holds_seat()
            }) {
                return Err(StoreError::AlreadyActive);
            }
            if enforce_capacity {
                let active = state
                    .registrations
                    .values()
                    .filter(|r| r.quiz_id == registration.quiz_id && r.holds_seat())
                    .count() as i64;
                if active >= i64::from(seats) {
                    return Err(StoreError::CapacityExhausted);
                }
            }
            state
                .registrations
                .insert(registration.id, registration.clone());
            state.notify(registration.quiz_id, registration.id, ChangeKind::Inserted);
            Ok(registration)
        })
        .await
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: RegistrationStatus,
        new: RegistrationStatus,
    ) -> Result<Option<Registration>, StoreError> {
        self.write("update_registration_status", move |state| {
            let Some(stored) = state.registrations.get_mut(&id) else {
                return Err(StoreError::NotFound(format!("Registration {id}")));
            };
            if stored.status != expected {
                return Ok(None);
            }
            stored.status = new;
            let updated = stored.clone();
            state.notify(updated.quiz_id, id, ChangeKind::StatusChanged);
            Ok(Some(updated))
        })
        .await
    }

    async fn delete_registration(&self, id: Uuid) -> Result<(), StoreError> {
        self.write("delete_registration", move |state| {
            match state.registrations.remove(&id) {
                Some(removed) => {
                    state.notify(removed.quiz_id, id, ChangeKind::Deleted);
                    Ok(())
                }
                None => Err(StoreError::NotFound(format!("Registration {id}"))),
            }
        })
        .await
    }

    async fn subscribe(&self, quiz_id: Uuid) -> Result<ChangeFeed, StoreError> {
        self.check_available()?;
        let (sender, feed) = ChangeFeed::channel(quiz_id, self.inner.options.feed_buffer);
        let mut state = self.inner.state.lock().await;
        state.feeds.entry(quiz_id).or_default().push(sender);
        Ok(feed)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        if let Some(delay) = self.inner.faults.user_lookup_delay() {
            tokio::time::sleep(delay).await;
        }
        if self.inner.faults.user_fails(id) {
            record_store_error(BACKEND_MEMORY, "unavailable");
            return Err(StoreError::Unavailable(format!("Lookup of user {id} failed")));
        }
        self.read("get_user", |state| state.users.get(&id).cloned())
            .await
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.write("insert_user", move |state| {
            if state.users.contains_key(&user.id) {
                return Err(StoreError::Conflict(format!("User {} already exists", user.id)));
            }
            if state.users.values().any(|u| u.email == user.email) {
                return Err(StoreError::Conflict(format!(
                    "Email {} already registered",
                    user.email
                )));
            }
            state.users.insert(user.id, user.clone());
            Ok(user)
        })
        .await
    }

    async fn update_contact(
        &self,
        id: Uuid,
        phone: Option<String>,
        location: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        self.write("update_user_contact", move |state| {
            Ok(state.users.get_mut(&id).map(|user| {
                if phone.is_some() {
                    user.phone = phone;
                }
                if location.is_some() {
                    user.location = location;
                }
                user.clone()
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use domain::models::Role;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::{LastName, Name};
    use fake::Fake;

    fn quiz(seats: i32) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: Uuid::new_v4(),
            name: "Pub Quiz".to_string(),
            quiz_type: "General".to_string(),
            location: "Zagreb".to_string(),
            fee: 5,
            seats,
            date_time: now + ChronoDuration::days(3),
            additional_info: None,
            author_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(quiz_id: Uuid, status: RegistrationStatus) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            quiz_id,
            status,
            team_name: LastName().fake(),
            team_size: 1,
            team_members: vec![Name().fake()],
            created_at: Utc::now(),
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: SafeEmail().fake(),
            role: Role::Client,
            name: Name().fake(),
            phone: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_capacity_guard_refuses_extra_seat() {
        let store = InMemoryStore::new();
        let quiz = store.insert_quiz(quiz(1)).await.unwrap();

        store
            .insert_registration(registration(quiz.id, RegistrationStatus::Pending), quiz.seats)
            .await
            .unwrap();
        let result = store
            .insert_registration(registration(quiz.id, RegistrationStatus::Pending), quiz.seats)
            .await;
        assert_eq!(result, Err(StoreError::CapacityExhausted));
    }

    #[tokio::test]
    async fn test_second_active_record_for_user_refused() {
        let store = InMemoryStore::without_capacity_guard();
        let quiz = store.insert_quiz(quiz(5)).await.unwrap();
        let first = registration(quiz.id, RegistrationStatus::Pending);
        store.insert_registration(first.clone(), quiz.seats).await.unwrap();

        let mut second = registration(quiz.id, RegistrationStatus::Pending);
        second.user_id = first.user_id;
        assert_eq!(
            store.insert_registration(second.clone(), quiz.seats).await,
            Err(StoreError::AlreadyActive)
        );

        store
            .update_status_if(first.id, RegistrationStatus::Pending, RegistrationStatus::Rejected)
            .await
            .unwrap();
        assert!(store.insert_registration(second, quiz.seats).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_records_do_not_hold_seats() {
        let store = InMemoryStore::new();
        let quiz = store.insert_quiz(quiz(1)).await.unwrap();
        store
            .insert_registration(registration(quiz.id, RegistrationStatus::Rejected), 1)
            .await
            .unwrap();
        assert!(store
            .insert_registration(registration(quiz.id, RegistrationStatus::Pending), 1)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unguarded_store_accepts_over_capacity() {
        let store = InMemoryStore::without_capacity_guard();
        let quiz = store.insert_quiz(quiz(1)).await.unwrap();
        for _ in 0..3 {
            store
                .insert_registration(registration(quiz.id, RegistrationStatus::Pending), 1)
                .await
                .unwrap();
        }
        assert_eq!(store.list_by_quiz(quiz.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_insert_registration_requires_quiz() {
        let store = InMemoryStore::new();
        let result = store
            .insert_registration(registration(Uuid::new_v4(), RegistrationStatus::Pending), 5)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_status_if_compare_and_set() {
        let store = InMemoryStore::new();
        let quiz = store.insert_quiz(quiz(5)).await.unwrap();
        let reg = store
            .insert_registration(registration(quiz.id, RegistrationStatus::Pending), 5)
            .await
            .unwrap();

        let accepted = store
            .update_status_if(reg.id, RegistrationStatus::Pending, RegistrationStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.unwrap().status, RegistrationStatus::Accepted);

        let second = store
            .update_status_if(reg.id, RegistrationStatus::Pending, RegistrationStatus::Rejected)
            .await
            .unwrap();
        assert!(second.is_none());

        let missing = store
            .update_status_if(
                Uuid::new_v4(),
                RegistrationStatus::Pending,
                RegistrationStatus::Rejected,
            )
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lists_are_ordered_by_creation() {
        let store = InMemoryStore::new();
        let quiz = store.insert_quiz(quiz(5)).await.unwrap();
        let mut late = registration(quiz.id, RegistrationStatus::Pending);
        late.created_at = Utc::now() + ChronoDuration::seconds(10);
        let early = registration(quiz.id, RegistrationStatus::Pending);
        store.insert_registration(late.clone(), 5).await.unwrap();
        store.insert_registration(early.clone(), 5).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_by_quiz(quiz.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[tokio::test]
    async fn test_delete_quiz_cascades_registrations() {
        let store = InMemoryStore::new();
        let quiz = store.insert_quiz(quiz(5)).await.unwrap();
        let reg = store
            .insert_registration(registration(quiz.id, RegistrationStatus::Pending), 5)
            .await
            .unwrap();

        store.delete_quiz(quiz.id).await.unwrap();
        assert!(store.get_registration(reg.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_quiz(quiz.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_feed_receives_changes_and_is_released_on_drop() {
        let store = InMemoryStore::new();
        let quiz = store.insert_quiz(quiz(5)).await.unwrap();
        let mut feed = store.subscribe(quiz.id).await.unwrap();
        assert_eq!(store.subscriber_count(quiz.id).await, 1);

        let reg = store
            .insert_registration(registration(quiz.id, RegistrationStatus::Pending), 5)
            .await
            .unwrap();
        let change = feed.next().await.unwrap();
        assert_eq!(change.registration_id, reg.id);
        assert_eq!(change.kind, ChangeKind::Inserted);

        drop(feed);
        assert_eq!(store.subscriber_count(quiz.id).await, 0);

        // Next notification prunes the released sender.
        store.delete_registration(reg.id).await.unwrap();
        assert!(store.inner.state.lock().await.feeds.is_empty());
    }

    #[tokio::test]
    async fn test_feed_ignores_other_quizzes() {
        let store = InMemoryStore::new();
        let watched = store.insert_quiz(quiz(5)).await.unwrap();
        let other = store.insert_quiz(quiz(5)).await.unwrap();
        let mut feed = store.subscribe(watched.id).await.unwrap();

        store
            .insert_registration(registration(other.id, RegistrationStatus::Pending), 5)
            .await
            .unwrap();
        assert!(feed.try_next().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_fails_reads_and_writes() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.list_quizzes().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.insert_quiz(quiz(1)).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.list_quizzes().await.is_ok());
    }

    #[tokio::test]
    async fn test_lost_write_is_not_applied() {
        let store = InMemoryStore::new();
        store.lose_next_writes(1);
        let q = quiz(1);
        assert!(matches!(
            store.insert_quiz(q.clone()).await,
            Err(StoreError::Ambiguous(_))
        ));
        assert!(store.get_quiz(q.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unacknowledged_write_is_applied() {
        let store = InMemoryStore::new();
        store.drop_next_acknowledgements(1);
        let q = quiz(1);
        assert!(matches!(
            store.insert_quiz(q.clone()).await,
            Err(StoreError::Ambiguous(_))
        ));
        assert!(store.get_quiz(q.id).await.unwrap().is_some());

        // Fault is consumed.
        assert!(store.insert_quiz(quiz(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_user_lookup() {
        let store = InMemoryStore::new();
        let stored = store.insert_user(user()).await.unwrap();
        store.fail_user_lookup(stored.id);
        assert!(matches!(
            store.get_user(stored.id).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryStore::new();
        let first = store.insert_user(user()).await.unwrap();
        let mut second = user();
        second.email = first.email.clone();
        assert!(matches!(
            store.insert_user(second).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_contact_keeps_unset_fields() {
        let store = InMemoryStore::new();
        let mut profile = user();
        profile.phone = Some("+385 1 234 5678".to_string());
        let stored = store.insert_user(profile).await.unwrap();

        let updated = store
            .update_contact(stored.id, None, Some("Osijek".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+385 1 234 5678"));
        assert_eq!(updated.location.as_deref(), Some("Osijek"));

        assert!(store
            .update_contact(Uuid::new_v4(), None, None)
            .await
            .unwrap()
            .is_none());
    }
}
