//! Common test utilities for integration tests.
//!
//! Fixtures run the services against the in-memory store, so no external
//! database is needed.

// Not every integration test uses every helper.
#![allow(dead_code)]

use chrono::{Duration, Utc};
use domain::models::{CreateQuizRequest, Quiz, RegisterUserRequest, Role, TeamEntry};
use fake::faker::name::en::Name;
use fake::Fake;
use persistence::InMemoryStore;
use quizhub_client::{Config, Quizhub, Session, Stores};
use uuid::Uuid;

/// Services plus a handle on the store for fault injection.
pub struct TestHub {
    pub hub: Quizhub,
    pub store: InMemoryStore,
}

pub fn test_config() -> Config {
    Config::load_for_test(&[("views.lookup_timeout_ms", "200")])
        .expect("Failed to load test config")
}

pub fn test_hub() -> TestHub {
    test_hub_with(InMemoryStore::new())
}

pub fn test_hub_with(store: InMemoryStore) -> TestHub {
    let hub = Quizhub::with_stores(&test_config(), Stores::from_adapter(store.clone()));
    TestHub { hub, store }
}

/// Generate a unique email for testing.
pub fn unique_test_email() -> String {
    format!("test_{}@example.com", Uuid::new_v4())
}

pub fn register_request(role: Role, name: &str) -> RegisterUserRequest {
    RegisterUserRequest {
        email: unique_test_email(),
        role,
        name: name.to_string(),
        phone: Some("+385 91 123 4567".to_string()),
        location: Some("Zagreb".to_string()),
    }
}

/// Registers a profile and signs the user in.
pub async fn sign_up(hub: &Quizhub, role: Role, name: &str) -> Session {
    let user_id = Uuid::new_v4();
    hub.profiles
        .register_profile(user_id, register_request(role, name))
        .await
        .expect("Failed to register profile");
    hub.profiles
        .sign_in(user_id)
        .await
        .expect("Failed to sign in")
}

pub async fn create_organizer(hub: &Quizhub) -> Session {
    let name: String = Name().fake();
    sign_up(hub, Role::Admin, &name).await
}

pub async fn create_client(hub: &Quizhub) -> Session {
    let name: String = Name().fake();
    sign_up(hub, Role::Client, &name).await
}

pub fn quiz_request(seats: i32) -> CreateQuizRequest {
    CreateQuizRequest {
        name: "Thursday Pub Quiz".to_string(),
        quiz_type: "General Knowledge".to_string(),
        location: "Zagreb".to_string(),
        fee: 10,
        seats,
        date_time: Utc::now() + Duration::days(7),
        additional_info: Some("Bring a pen".to_string()),
    }
}

pub async fn publish_quiz(hub: &Quizhub, organizer: &Session, seats: i32) -> Quiz {
    hub.quizzes
        .create_quiz(organizer, quiz_request(seats))
        .await
        .expect("Failed to create quiz")
}

pub fn team(name: &str, size: i32) -> TeamEntry {
    TeamEntry {
        team_name: name.to_string(),
        team_size: size,
        team_members: (1..=size).map(|i| format!("Member {i}")).collect(),
    }
}
