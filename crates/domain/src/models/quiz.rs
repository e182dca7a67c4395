//! Quiz domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// Categories offered when an organizer creates a quiz.
///
/// The stored category is free text; this list only seeds the form.
pub const QUIZ_TYPES: &[&str] = &[
    "General",
    "Sports",
    "Music",
    "Film",
    "Technology",
    "History",
    "Geography",
    "Literature",
    "Pop culture",
    "Themed",
    "Other",
];

/// A quiz night published by an organizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: Uuid,
    pub name: String,
    pub quiz_type: String,
    pub location: String,
    /// Entry fee in EUR.
    pub fee: i32,
    /// Number of teams that can take part.
    pub seats: i32,
    #[serde(deserialize_with = "schedule::deserialize")]
    pub date_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    /// Builds a new quiz owned by `author_id` from a validated request.
    pub fn new(author_id: Uuid, request: CreateQuizRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            quiz_type: request.quiz_type.trim().to_string(),
            location: request.location.trim().to_string(),
            fee: request.fee,
            seats: request.seats,
            date_time: request.date_time,
            additional_info: normalize_info(request.additional_info),
            author_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only the author may edit or delete a quiz.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Schedule as shown on quiz cards, e.g. `24-12-2025 20:30`.
    pub fn schedule_label(&self) -> String {
        shared::time::format_quiz_date_time(self.date_time)
    }

    /// Applies a partial update in place.
    pub fn apply_update(&mut self, update: UpdateQuizRequest, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(quiz_type) = update.quiz_type {
            self.quiz_type = quiz_type.trim().to_string();
        }
        if let Some(location) = update.location {
            self.location = location.trim().to_string();
        }
        if let Some(fee) = update.fee {
            self.fee = fee;
        }
        if let Some(seats) = update.seats {
            self.seats = seats;
        }
        if let Some(date_time) = update.date_time {
            self.date_time = date_time;
        }
        if let Some(info) = update.additional_info {
            self.additional_info = normalize_info(Some(info));
        }
        self.updated_at = now;
    }
}

fn normalize_info(info: Option<String>) -> Option<String> {
    info.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Accepts RFC 3339 as well as the older free-text schedule layouts.
mod schedule {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};
    use shared::time::parse_quiz_date_time;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_quiz_date_time(&text).map_err(D::Error::custom)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => parse_quiz_date_time(&text)
                .map(Some)
                .map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// Request payload for publishing a quiz.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "Quiz type must be 1-50 characters"))]
    pub quiz_type: String,

    #[validate(length(min = 1, max = 100, message = "Location must be 1-100 characters"))]
    pub location: String,

    #[validate(range(min = 0, max = 10000, message = "Fee must be a non-negative amount"))]
    pub fee: i32,

    #[validate(range(min = 1, max = 1000, message = "Seats must be a positive number"))]
    pub seats: i32,

    #[serde(deserialize_with = "schedule::deserialize")]
    pub date_time: DateTime<Utc>,

    #[validate(length(max = 1000, message = "Additional info must be at most 1000 characters"))]
    pub additional_info: Option<String>,
}

impl CreateQuizRequest {
    /// Runs field rules plus the schedule check against `now`.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        for (field, value) in [
            ("name", &self.name),
            ("quiz_type", &self.quiz_type),
            ("location", &self.location),
        ] {
            if let Err(err) = shared::validation::validate_non_blank(value) {
                errors.add(field, err);
            }
        }
        if let Err(err) = shared::validation::validate_future_date_time(self.date_time, now) {
            errors.add("date_time", err);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request payload for editing a quiz (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Quiz type must be 1-50 characters"))]
    pub quiz_type: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Location must be 1-100 characters"))]
    pub location: Option<String>,

    #[validate(range(min = 0, max = 10000, message = "Fee must be a non-negative amount"))]
    pub fee: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Seats must be a positive number"))]
    pub seats: Option<i32>,

    #[serde(default, deserialize_with = "schedule::deserialize_option")]
    pub date_time: Option<DateTime<Utc>>,

    #[validate(length(max = 1000, message = "Additional info must be at most 1000 characters"))]
    pub additional_info: Option<String>,
}

impl UpdateQuizRequest {
    /// Runs field rules on the given fields plus the schedule check when
    /// the date changes.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        for (field, value) in [
            ("name", &self.name),
            ("quiz_type", &self.quiz_type),
            ("location", &self.location),
        ] {
            if let Some(value) = value {
                if let Err(err) = shared::validation::validate_non_blank(value) {
                    errors.add(field, err);
                }
            }
        }
        if let Some(date_time) = self.date_time {
            if let Err(err) = shared::validation::validate_future_date_time(date_time, now) {
                errors.add("date_time", err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_request(now: DateTime<Utc>) -> CreateQuizRequest {
        CreateQuizRequest {
            name: "Tuesday Trivia".to_string(),
            quiz_type: "General".to_string(),
            location: "Zagreb".to_string(),
            fee: 10,
            seats: 12,
            date_time: now + Duration::days(3),
            additional_info: Some("  Bring pens  ".to_string()),
        }
    }

    #[test]
    fn test_create_request_valid() {
        let now = Utc::now();
        assert!(create_request(now).validate_at(now).is_ok());
    }

    #[test]
    fn test_create_request_rejects_past_schedule() {
        let now = Utc::now();
        let mut request = create_request(now);
        request.date_time = now - Duration::hours(1);
        let errors = request.validate_at(now).unwrap_err();
        assert!(errors.field_errors().contains_key("date_time"));
    }

    #[test]
    fn test_create_request_rejects_zero_seats_and_negative_fee() {
        let now = Utc::now();
        let mut request = create_request(now);
        request.seats = 0;
        request.fee = -5;
        let errors = request.validate_at(now).unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("seats"));
        assert!(fields.contains_key("fee"));
    }

    #[test]
    fn test_create_request_rejects_blank_location() {
        let now = Utc::now();
        let mut request = create_request(now);
        request.location = "   ".to_string();
        let errors = request.validate_at(now).unwrap_err();
        assert!(errors.field_errors().contains_key("location"));
    }

    #[test]
    fn test_new_quiz_trims_and_drops_empty_info() {
        let now = Utc::now();
        let author = Uuid::new_v4();
        let mut request = create_request(now);
        request.name = "  Pub Night ".to_string();
        let quiz = Quiz::new(author, request, now);
        assert_eq!(quiz.name, "Pub Night");
        assert_eq!(quiz.additional_info.as_deref(), Some("Bring pens"));
        assert!(quiz.is_owned_by(author));
        assert!(!quiz.is_owned_by(Uuid::new_v4()));

        let mut request = create_request(now);
        request.additional_info = Some("   ".to_string());
        assert!(Quiz::new(author, request, now).additional_info.is_none());
    }

    #[test]
    fn test_apply_update_changes_only_given_fields() {
        let now = Utc::now();
        let mut quiz = Quiz::new(Uuid::new_v4(), create_request(now), now);
        let later = now + Duration::minutes(5);
        quiz.apply_update(
            UpdateQuizRequest {
                seats: Some(20),
                ..Default::default()
            },
            later,
        );
        assert_eq!(quiz.seats, 20);
        assert_eq!(quiz.name, "Tuesday Trivia");
        assert_eq!(quiz.updated_at, later);
    }

    #[test]
    fn test_update_request_rejects_blank_fields() {
        let now = Utc::now();
        let update = UpdateQuizRequest {
            name: Some("   ".to_string()),
            location: Some("\t".to_string()),
            ..Default::default()
        };
        let errors = update.validate_at(now).unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("location"));
        assert!(!fields.contains_key("quiz_type"));

        assert!(UpdateQuizRequest::default().validate_at(now).is_ok());
    }

    #[test]
    fn test_legacy_schedule_text_deserializes() {
        let request: CreateQuizRequest = serde_json::from_value(serde_json::json!({
            "name": "Legacy",
            "quizType": "General",
            "location": "Split",
            "fee": 5,
            "seats": 8,
            "dateTime": "24-12-2030 20:30",
        }))
        .unwrap();
        let quiz = Quiz::new(Uuid::nil(), request, Utc::now());
        assert_eq!(quiz.schedule_label(), "24-12-2030 20:30");

        let update: UpdateQuizRequest =
            serde_json::from_value(serde_json::json!({ "dateTime": "2030-12-25 18:00" })).unwrap();
        assert_eq!(update.date_time.unwrap().to_rfc3339(), "2030-12-25T18:00:00+00:00");
        let empty: UpdateQuizRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.date_time.is_none());
    }

    #[test]
    fn test_quiz_round_trips_through_json() {
        let now = Utc::now();
        let quiz = Quiz::new(Uuid::new_v4(), create_request(now), now);
        let json = serde_json::to_value(&quiz).unwrap();
        let back: Quiz = serde_json::from_value(json).unwrap();
        assert_eq!(back, quiz);
    }

    #[test]
    fn test_quiz_serializes_camel_case() {
        let now = Utc::now();
        let quiz = Quiz::new(Uuid::nil(), create_request(now), now);
        let json = serde_json::to_string(&quiz).unwrap();
        assert!(json.contains("quizType"));
        assert!(json.contains("authorId"));
        assert!(json.contains("dateTime"));
    }
}
