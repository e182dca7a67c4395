//! Organizer quiz management and the client quiz catalog.

use chrono::Utc;
use domain::models::{CreateQuizRequest, Quiz, Role, UpdateQuizRequest};
use domain::services::{
    filter_options, remaining_capacity, sort_by_schedule, FilterOptions, QuizFilter,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::Stores;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Quizzes matching a filter, plus the values offered by the filter controls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizCatalog {
    pub quizzes: Vec<Quiz>,
    pub options: FilterOptions,
}

#[derive(Clone)]
pub struct QuizService {
    stores: Stores,
}

impl QuizService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Publishes a quiz authored by the signed-in organizer.
    pub async fn create_quiz(
        &self,
        session: &Session,
        request: CreateQuizRequest,
    ) -> ClientResult<Quiz> {
        session.require_role(Role::Admin)?;
        let now = Utc::now();
        request.validate_at(now)?;

        let quiz = self
            .stores
            .quizzes
            .insert_quiz(Quiz::new(session.user_id, request, now))
            .await?;

        info!(
            quiz_id = %quiz.id,
            author_id = %quiz.author_id,
            seats = quiz.seats,
            "Quiz created"
        );
        Ok(quiz)
    }

    /// Applies a partial edit. Only the author may edit.
    ///
    /// Lowering `seats` below the number of seat-holding registrations is
    /// allowed; the quiz then reports negative remaining capacity.
    pub async fn update_quiz(
        &self,
        session: &Session,
        quiz_id: Uuid,
        request: UpdateQuizRequest,
    ) -> ClientResult<Quiz> {
        let mut quiz = self.owned_quiz(session, quiz_id).await?;
        let now = Utc::now();
        request.validate_at(now)?;

        let seats_lowered = request.seats.is_some_and(|seats| seats < quiz.seats);
        quiz.apply_update(request, now);

        if seats_lowered {
            let registrations = self.stores.registrations.list_by_quiz(quiz_id).await?;
            let remaining = remaining_capacity(&quiz, &registrations);
            if remaining < 0 {
                warn!(
                    quiz_id = %quiz_id,
                    seats = quiz.seats,
                    remaining,
                    "Seats lowered below current registrations"
                );
            }
        }

        let quiz = self.stores.quizzes.update_quiz(quiz).await?;
        info!(quiz_id = %quiz.id, "Quiz updated");
        Ok(quiz)
    }

    /// Deletes a quiz and, with it, its registrations. Only the author may delete.
    pub async fn delete_quiz(&self, session: &Session, quiz_id: Uuid) -> ClientResult<()> {
        self.owned_quiz(session, quiz_id).await?;
        self.stores.quizzes.delete_quiz(quiz_id).await?;
        info!(quiz_id = %quiz_id, "Quiz deleted");
        Ok(())
    }

    /// Quizzes authored by the signed-in organizer, soonest first.
    pub async fn list_my_quizzes(&self, session: &Session) -> ClientResult<Vec<Quiz>> {
        session.require_role(Role::Admin)?;
        let mut quizzes = self
            .stores
            .quizzes
            .list_quizzes_by_author(session.user_id)
            .await?;
        sort_by_schedule(&mut quizzes);
        Ok(quizzes)
    }

    /// Every quiz matching `filter`, soonest first.
    ///
    /// Filter options are computed over all quizzes, not only the matches.
    pub async fn browse(&self, filter: &QuizFilter) -> ClientResult<QuizCatalog> {
        let mut all = self.stores.quizzes.list_quizzes().await?;
        sort_by_schedule(&mut all);
        Ok(QuizCatalog {
            options: filter_options(&all),
            quizzes: filter.apply(&all),
        })
    }

    pub async fn get_quiz(&self, quiz_id: Uuid) -> ClientResult<Quiz> {
        self.stores
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("Quiz {quiz_id}")))
    }

    async fn owned_quiz(&self, session: &Session, quiz_id: Uuid) -> ClientResult<Quiz> {
        let quiz = self.get_quiz(quiz_id).await?;
        if !quiz.is_owned_by(session.user_id) {
            return Err(ClientError::Forbidden(
                "Only the quiz author can change this quiz".to_string(),
            ));
        }
        Ok(quiz)
    }
}
