//! Quizhub client service layer.
//!
//! What a quiz registration UI binds to: organizer quiz management, team
//! registrations with admission checks, user profiles, and live
//! registration views for organizers.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod services;
pub mod session;
pub mod subscription;

pub use app::{Quizhub, Stores};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use session::Session;
pub use subscription::{RegistrationWatch, ViewState};
