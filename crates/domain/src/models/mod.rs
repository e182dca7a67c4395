//! Domain models for Quizhub.

pub mod quiz;
pub mod registration;
pub mod user;

pub use quiz::{CreateQuizRequest, Quiz, UpdateQuizRequest, QUIZ_TYPES};
pub use registration::{
    Decision, NewRegistrationRequest, ParticipationStatus, Registration, RegistrationStatus,
    TeamEntry,
};
pub use user::{RegisterUserRequest, Role, UpdateContactRequest, User};
