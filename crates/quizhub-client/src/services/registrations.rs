//! Team registrations: submission with admission checks, organizer
//! decisions, withdrawal, and the registration views.
//!
//! Admission runs against a snapshot read just before the write, so two
//! clients can pass the capacity check at the same time. Stores that can
//! enforce capacity at write time close that gap; for the others every
//! committed registration is re-checked against a fresh read and reported
//! as [`SubmissionOutcome::Overbooked`] when it landed beyond the seats.

use std::future::Future;

use domain::models::{Decision, Quiz, Registration, RegistrationStatus, Role, TeamEntry};
use domain::services::{
    accepted_teams, availability, build_registrations_view, client_overview, derive_status,
    is_over_admitted, latest_for_user, transition_status, try_admit_now, AcceptedTeam, AdmissionError,
    QuizAvailability, QuizRegistrationsView, RegisteredQuiz, StoreError,
};
use metrics::counter;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::Stores;
use crate::config::ViewsConfig;
use crate::error::{ClientError, ClientResult};
use crate::lookup::{display_names, fetch_users};
use crate::session::Session;
use crate::subscription::RegistrationWatch;

/// Result of a committed registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "registration", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Pending within the quiz's seats.
    Admitted(Registration),
    /// Stored, but concurrent submissions took the remaining seats first.
    /// The organizer decides what happens to it.
    Overbooked(Registration),
    /// Stored; the follow-up read that checks capacity failed.
    Unverified(Registration),
}

impl SubmissionOutcome {
    pub fn registration(&self) -> &Registration {
        match self {
            SubmissionOutcome::Admitted(r)
            | SubmissionOutcome::Overbooked(r)
            | SubmissionOutcome::Unverified(r) => r,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Admitted(_) => "admitted",
            SubmissionOutcome::Overbooked(_) => "overbooked",
            SubmissionOutcome::Unverified(_) => "unverified",
        }
    }
}

fn record_submission(outcome: &'static str) {
    counter!("registrations_submitted_total", "outcome" => outcome).increment(1);
}

fn rejection_label(err: &AdmissionError) -> &'static str {
    match err {
        AdmissionError::Validation(_) => "invalid",
        AdmissionError::AlreadyActive(_) => "already_active",
        AdmissionError::QuizFull { .. } => "full",
    }
}

/// Runs `fut` unless `cancel` fires first.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = fut => result,
    }
}

#[derive(Clone)]
pub struct RegistrationService {
    stores: Stores,
    views: ViewsConfig,
}

impl RegistrationService {
    pub fn new(stores: Stores, views: ViewsConfig) -> Self {
        Self { stores, views }
    }

    /// Registers the signed-in client's team for a quiz.
    pub async fn submit(
        &self,
        session: &Session,
        quiz_id: Uuid,
        team: TeamEntry,
    ) -> ClientResult<SubmissionOutcome> {
        session.require_role(Role::Client)?;
        let quiz = self.load_quiz(quiz_id).await?;
        let snapshot = self.stores.registrations.list_by_quiz(quiz_id).await?;

        let candidate = team.for_user(session.user_id);
        let registration = match try_admit_now(&quiz, &snapshot, &candidate) {
            Ok(registration) => registration,
            Err(err) => {
                record_submission(rejection_label(&err));
                debug!(
                    quiz_id = %quiz_id,
                    user_id = %session.user_id,
                    reason = %err,
                    "Registration refused"
                );
                return Err(err.into());
            }
        };

        let committed = match self
            .stores
            .registrations
            .insert_registration(registration.clone(), quiz.seats)
            .await
        {
            Ok(committed) => committed,
            Err(StoreError::CapacityExhausted) => {
                record_submission("full");
                return Err(ClientError::QuizFull { seats: quiz.seats });
            }
            Err(StoreError::AlreadyActive) => {
                record_submission("already_active");
                return Err(self.active_standing(session.user_id, quiz_id).await);
            }
            Err(StoreError::Ambiguous(reason)) => {
                self.reconcile_insert(&registration, reason).await?
            }
            Err(err) => return Err(err.into()),
        };

        let outcome = self.verify_admission(&quiz, committed).await;
        record_submission(outcome.label());
        info!(
            quiz_id = %quiz_id,
            user_id = %session.user_id,
            registration_id = %outcome.registration().id,
            outcome = outcome.label(),
            "Registration submitted"
        );
        Ok(outcome)
    }

    /// Error for an insert the store refused because a concurrent submission
    /// from the same user landed first.
    async fn active_standing(&self, user_id: Uuid, quiz_id: Uuid) -> ClientError {
        match self
            .stores
            .registrations
            .list_by_user_and_quiz(user_id, quiz_id)
            .await
        {
            Ok(history) => ClientError::AlreadyActive(derive_status(&history, user_id)),
            Err(e) => e.into(),
        }
    }

    /// Looks for the exact record an unacknowledged insert carried.
    async fn reconcile_insert(
        &self,
        registration: &Registration,
        reason: String,
    ) -> ClientResult<Registration> {
        warn!(
            quiz_id = %registration.quiz_id,
            registration_id = %registration.id,
            reason = %reason,
            "Registration write unacknowledged, reconciling"
        );
        let history = self
            .stores
            .registrations
            .list_by_user_and_quiz(registration.user_id, registration.quiz_id)
            .await
            .map_err(|e| {
                record_submission("unknown");
                ClientError::UnknownOutcome(format!("{reason}; reconciling read failed: {e}"))
            })?;

        match history.into_iter().find(|r| r.id == registration.id) {
            Some(found) => {
                info!(registration_id = %found.id, "Registration write confirmed");
                Ok(found)
            }
            None => {
                record_submission("unknown");
                Err(ClientError::UnknownOutcome(reason))
            }
        }
    }

    async fn verify_admission(&self, quiz: &Quiz, committed: Registration) -> SubmissionOutcome {
        match self.stores.registrations.list_by_quiz(quiz.id).await {
            Ok(current) if is_over_admitted(quiz, &current, committed.id) => {
                warn!(
                    quiz_id = %quiz.id,
                    registration_id = %committed.id,
                    seats = quiz.seats,
                    "Registration landed beyond quiz capacity"
                );
                SubmissionOutcome::Overbooked(committed)
            }
            Ok(_) => SubmissionOutcome::Admitted(committed),
            Err(e) => {
                warn!(
                    quiz_id = %quiz.id,
                    registration_id = %committed.id,
                    error = %e,
                    "Could not verify capacity after registration"
                );
                SubmissionOutcome::Unverified(committed)
            }
        }
    }

    /// Accepts or rejects a pending registration. Only the quiz author may decide.
    ///
    /// Accepting does not re-check capacity.
    pub async fn decide(
        &self,
        session: &Session,
        registration_id: Uuid,
        decision: Decision,
    ) -> ClientResult<Registration> {
        let registration = self.load_registration(registration_id).await?;
        self.owned_quiz(session, registration.quiz_id).await?;
        let target = transition_status(&registration, decision)?;

        let updated = match self
            .stores
            .registrations
            .update_status_if(registration_id, RegistrationStatus::Pending, target.status)
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                let current = self.load_registration(registration_id).await?;
                return Err(ClientError::InvalidTransition {
                    from: current.status,
                    to: target.status,
                });
            }
            Err(StoreError::Ambiguous(reason)) => {
                warn!(
                    registration_id = %registration_id,
                    reason = %reason,
                    "Status update unacknowledged, reconciling"
                );
                let current = self.load_registration(registration_id).await?;
                if current.status != target.status {
                    return Err(ClientError::UnknownOutcome(reason));
                }
                current
            }
            Err(err) => return Err(err.into()),
        };

        counter!("registrations_decided_total", "decision" => decision.to_string()).increment(1);
        info!(
            quiz_id = %updated.quiz_id,
            registration_id = %updated.id,
            status = %updated.status,
            "Registration decided"
        );
        Ok(updated)
    }

    /// Removes the client's latest registration for a quiz.
    ///
    /// Pending and rejected registrations may be withdrawn; an accepted one
    /// must be cancelled by the organizer.
    pub async fn withdraw(&self, session: &Session, quiz_id: Uuid) -> ClientResult<()> {
        session.require_role(Role::Client)?;
        let history = self
            .stores
            .registrations
            .list_by_user_and_quiz(session.user_id, quiz_id)
            .await?;
        let latest = latest_for_user(&history, session.user_id)
            .ok_or_else(|| ClientError::NotFound(format!("No registration for quiz {quiz_id}")))?;

        if latest.status == RegistrationStatus::Accepted {
            return Err(ClientError::Conflict(
                "Accepted registrations can only be cancelled by the organizer".to_string(),
            ));
        }

        let registration_id = latest.id;
        match self
            .stores
            .registrations
            .delete_registration(registration_id)
            .await
        {
            Ok(()) => {}
            Err(StoreError::Ambiguous(reason)) => {
                let still_there = self
                    .stores
                    .registrations
                    .get_registration(registration_id)
                    .await
                    .map_err(|_| ClientError::UnknownOutcome(reason.clone()))?;
                if still_there.is_some() {
                    return Err(ClientError::UnknownOutcome(reason));
                }
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            quiz_id = %quiz_id,
            user_id = %session.user_id,
            registration_id = %registration_id,
            "Registration withdrawn"
        );
        Ok(())
    }

    /// The signed-in user's standing for a quiz and what they can do next.
    pub async fn status_for(&self, session: &Session, quiz_id: Uuid) -> ClientResult<QuizAvailability> {
        let quiz = self.load_quiz(quiz_id).await?;
        let registrations = self.stores.registrations.list_by_quiz(quiz_id).await?;
        Ok(availability(&quiz, &registrations, session.user_id))
    }

    /// Quizzes the signed-in user registered for, soonest first.
    pub async fn my_registrations(&self, session: &Session) -> ClientResult<Vec<RegisteredQuiz>> {
        let registrations = self
            .stores
            .registrations
            .list_by_user(session.user_id)
            .await?;
        let mut quiz_ids: Vec<Uuid> = registrations.iter().map(|r| r.quiz_id).collect();
        quiz_ids.sort();
        quiz_ids.dedup();

        let quizzes = self.stores.quizzes.list_quizzes_by_ids(&quiz_ids).await?;
        Ok(client_overview(&registrations, &quizzes, session.user_id))
    }

    /// Registrations of a quiz grouped by user, for its author.
    pub async fn registrations_view(
        &self,
        session: &Session,
        quiz_id: Uuid,
        cancel: &CancellationToken,
    ) -> ClientResult<QuizRegistrationsView> {
        cancellable(cancel, self.owned_quiz(session, quiz_id)).await?;
        self.load_view(quiz_id, cancel).await
    }

    /// Accepted teams with contact details, for the quiz author.
    pub async fn accepted_teams(
        &self,
        session: &Session,
        quiz_id: Uuid,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<AcceptedTeam>> {
        cancellable(cancel, self.owned_quiz(session, quiz_id)).await?;
        let accepted = cancellable(cancel, async {
            Ok::<_, ClientError>(
                self.stores
                    .registrations
                    .list_by_quiz_and_status(quiz_id, RegistrationStatus::Accepted)
                    .await?,
            )
        })
        .await?;

        let users = fetch_users(
            self.stores.users.clone(),
            accepted.iter().map(|r| r.user_id),
            self.views.lookup_timeout(),
            cancel,
        )
        .await?;
        Ok(accepted_teams(&accepted, &users))
    }

    /// Live registrations view for the quiz author.
    ///
    /// The subscription is released when the returned watch is dropped or
    /// closed.
    pub async fn watch(&self, session: &Session, quiz_id: Uuid) -> ClientResult<RegistrationWatch> {
        self.owned_quiz(session, quiz_id).await?;
        let feed = self.stores.registrations.subscribe(quiz_id).await?;
        debug!(quiz_id = %quiz_id, "Registration watch opened");
        Ok(RegistrationWatch::spawn(self.clone(), quiz_id, feed))
    }

    /// Builds the grouped view without an ownership check.
    pub(crate) async fn load_view(
        &self,
        quiz_id: Uuid,
        cancel: &CancellationToken,
    ) -> ClientResult<QuizRegistrationsView> {
        let (quiz, registrations) = cancellable(cancel, async {
            let quiz = self.load_quiz(quiz_id).await?;
            let registrations = self.stores.registrations.list_by_quiz(quiz_id).await?;
            Ok::<_, ClientError>((quiz, registrations))
        })
        .await?;

        let users = fetch_users(
            self.stores.users.clone(),
            registrations.iter().map(|r| r.user_id),
            self.views.lookup_timeout(),
            cancel,
        )
        .await?;
        Ok(build_registrations_view(
            &quiz,
            &registrations,
            &display_names(&users),
        ))
    }

    async fn load_quiz(&self, quiz_id: Uuid) -> ClientResult<Quiz> {
        self.stores
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("Quiz {quiz_id}")))
    }

    async fn load_registration(&self, registration_id: Uuid) -> ClientResult<Registration> {
        self.stores
            .registrations
            .get_registration(registration_id)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("Registration {registration_id}")))
    }

    async fn owned_quiz(&self, session: &Session, quiz_id: Uuid) -> ClientResult<Quiz> {
        let quiz = self.load_quiz(quiz_id).await?;
        if !quiz.is_owned_by(session.user_id) {
            return Err(ClientError::Forbidden(
                "Only the quiz author can manage its registrations".to_string(),
            ));
        }
        Ok(quiz)
    }
}
