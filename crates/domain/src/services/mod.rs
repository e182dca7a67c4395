//! Domain services for Quizhub.
//!
//! Services contain business logic that operates on domain models.

pub mod admission;
pub mod catalog;
pub mod store;
pub mod views;

pub use admission::{
    active_count, derive_status, is_over_admitted, latest_for_user, remaining_capacity,
    transition_status, try_admit, try_admit_now, AdmissionError, TransitionError,
};

pub use catalog::{filter_options, sort_by_schedule, FilterOptions, QuizFilter};

pub use store::{
    ChangeFeed, ChangeKind, QuizStore, RegistrationChange, RegistrationStore, StoreError,
    UserStore,
};

pub use views::{
    accepted_teams, availability, build_registrations_view, client_overview, group_by_user,
    registration_action, AcceptedTeam, QuizAvailability, QuizRegistrationsView, RegisteredQuiz,
    RegistrationAction, UserRegistrations, UNKNOWN_USER,
};
