//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod quiz;
pub mod registration;
pub mod user;

pub use quiz::QuizEntity;
pub use registration::{RegistrationEntity, RegistrationStatusDb};
pub use user::{UserEntity, UserRoleDb};
