use domain::models::{ParticipationStatus, RegistrationStatus};
use domain::services::{AdmissionError, StoreError, TransitionError};
use serde::Serialize;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to the screens. None of them is fatal; each maps to a
/// message or a disabled control.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already registered with status {0}")]
    AlreadyActive(ParticipationStatus),

    #[error("This quiz is full ({seats} teams)")]
    QuizFull { seats: i32 },

    #[error("Cannot move registration from {from} to {to}")]
    InvalidTransition {
        from: RegistrationStatus,
        to: RegistrationStatus,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A write may have been applied; reload before retrying.
    #[error("Outcome unknown: {0}")]
    UnknownOutcome(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "validation_error",
            ClientError::AlreadyActive(_) => "already_active",
            ClientError::QuizFull { .. } => "quiz_full",
            ClientError::InvalidTransition { .. } => "invalid_transition",
            ClientError::Forbidden(_) => "forbidden",
            ClientError::NotFound(_) => "not_found",
            ClientError::Conflict(_) => "conflict",
            ClientError::StoreUnavailable(_) => "store_unavailable",
            ClientError::UnknownOutcome(_) => "unknown_outcome",
            ClientError::Cancelled => "cancelled",
            ClientError::Config(_) => "config_error",
        }
    }

    /// Whether repeating the same call may succeed.
    ///
    /// `UnknownOutcome` is not: the caller must reload first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::StoreUnavailable(_))
    }

    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            error: self.error_code(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

/// Serializable form of a [`ClientError`] for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
}

fn validation_message(error: &validator::ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| error.code.to_string())
}

impl From<AdmissionError> for ClientError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Validation(e) => ClientError::Validation(validation_message(&e)),
            AdmissionError::AlreadyActive(status) => ClientError::AlreadyActive(status),
            AdmissionError::QuizFull { seats } => ClientError::QuizFull { seats },
        }
    }
}

impl From<TransitionError> for ClientError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { from, to } => {
                ClientError::InvalidTransition { from, to }
            }
        }
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ClientError::StoreUnavailable(msg),
            StoreError::NotFound(msg) => ClientError::NotFound(msg),
            StoreError::Conflict(msg) => ClientError::Conflict(msg),
            // Services handle this with the quiz's seat count in hand.
            StoreError::CapacityExhausted => {
                ClientError::Conflict("Quiz capacity exhausted".to_string())
            }
            StoreError::AlreadyActive => {
                ClientError::Conflict("Registration already active".to_string())
            }
            StoreError::Ambiguous(msg) => ClientError::UnknownOutcome(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let messages: Vec<String> = fields
            .iter()
            .flat_map(|(_, errors)| errors.iter().map(validation_message))
            .collect();

        match messages.first() {
            Some(first) => ClientError::Validation(first.clone()),
            None => ClientError::Validation("Invalid input".to_string()),
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}
