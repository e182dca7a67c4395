//! Repository implementations for database operations.

pub mod quiz;
pub mod registration;
pub mod user;

pub use quiz::QuizRepository;
pub use registration::{GuardedInsert, RegistrationRepository};
pub use user::UserRepository;
