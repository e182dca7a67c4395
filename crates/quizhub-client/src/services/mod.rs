//! Services the screens call.

pub mod profiles;
pub mod quizzes;
pub mod registrations;

pub use profiles::ProfileService;
pub use quizzes::{QuizCatalog, QuizService};
pub use registrations::{RegistrationService, SubmissionOutcome};
