//! Quiz catalog filtering for the client home screen.

use serde::{Deserialize, Serialize};

use crate::models::Quiz;

/// Location and category filters; `None` or an empty string means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizFilter {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub quiz_type: Option<String>,
}

impl QuizFilter {
    pub fn matches(&self, quiz: &Quiz) -> bool {
        fn accepts(filter: &Option<String>, value: &str) -> bool {
            match filter.as_deref() {
                None | Some("") => true,
                Some(wanted) => wanted == value,
            }
        }
        accepts(&self.location, &quiz.location) && accepts(&self.quiz_type, &quiz.quiz_type)
    }

    /// Matching quizzes, preserving input order.
    pub fn apply(&self, quizzes: &[Quiz]) -> Vec<Quiz> {
        quizzes.iter().filter(|q| self.matches(q)).cloned().collect()
    }
}

/// Values offered in the filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub quiz_types: Vec<String>,
}

/// Distinct locations and categories in first-seen order.
pub fn filter_options(quizzes: &[Quiz]) -> FilterOptions {
    let mut options = FilterOptions::default();
    for quiz in quizzes {
        if !options.locations.contains(&quiz.location) {
            options.locations.push(quiz.location.clone());
        }
        if !options.quiz_types.contains(&quiz.quiz_type) {
            options.quiz_types.push(quiz.quiz_type.clone());
        }
    }
    options
}

/// Orders quizzes by schedule, then id.
pub fn sort_by_schedule(quizzes: &mut [Quiz]) {
    quizzes.sort_by(|a, b| (a.date_time, a.id).cmp(&(b.date_time, b.id)));
}
