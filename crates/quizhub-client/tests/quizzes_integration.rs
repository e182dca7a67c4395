//! Integration tests for quiz management and the quiz catalog.

mod common;

use chrono::{Duration, Utc};
use common::{create_client, create_organizer, publish_quiz, quiz_request, team, test_hub};
use domain::models::{Decision, UpdateQuizRequest};
use domain::services::QuizFilter;
use quizhub_client::ClientError;
use uuid::Uuid;

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_quiz_success() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;

    let quiz = t
        .hub
        .quizzes
        .create_quiz(&organizer, quiz_request(12))
        .await
        .unwrap();

    assert_eq!(quiz.author_id, organizer.user_id);
    assert_eq!(quiz.seats, 12);
    assert_eq!(t.hub.quizzes.get_quiz(quiz.id).await.unwrap(), quiz);
}

#[tokio::test]
async fn test_create_quiz_requires_admin() {
    let t = test_hub();
    let client = create_client(&t.hub).await;

    let err = t
        .hub
        .quizzes
        .create_quiz(&client, quiz_request(12))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "forbidden");
}

#[tokio::test]
async fn test_create_quiz_in_past_rejected() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let mut request = quiz_request(12);
    request.date_time = Utc::now() - Duration::hours(1);

    let err = t
        .hub
        .quizzes
        .create_quiz(&organizer, request)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Validation("Date and time must be in the future.".to_string())
    );
}

#[tokio::test]
async fn test_create_quiz_zero_seats_rejected() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;

    let err = t
        .hub
        .quizzes
        .create_quiz(&organizer, quiz_request(0))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "validation_error");
}

// ============================================================================
// Update / delete
// ============================================================================

#[tokio::test]
async fn test_update_quiz_partial() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 10).await;

    let updated = t
        .hub
        .quizzes
        .update_quiz(
            &organizer,
            quiz.id,
            UpdateQuizRequest {
                location: Some("Rijeka".to_string()),
                fee: Some(15),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.location, "Rijeka");
    assert_eq!(updated.fee, 15);
    assert_eq!(updated.name, quiz.name);
    assert_eq!(updated.seats, 10);
    assert!(updated.updated_at >= quiz.updated_at);
}

#[tokio::test]
async fn test_update_quiz_rejects_blank_name_and_location() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 10).await;

    let err = t
        .hub
        .quizzes
        .update_quiz(
            &organizer,
            quiz.id,
            UpdateQuizRequest {
                name: Some("   ".to_string()),
                location: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Validation("Value must not be blank".to_string())
    );

    let stored = t.hub.quizzes.get_quiz(quiz.id).await.unwrap();
    assert_eq!(stored.name, quiz.name);
    assert_eq!(stored.location, quiz.location);
}

#[tokio::test]
async fn test_update_quiz_by_other_organizer_forbidden() {
    let t = test_hub();
    let author = create_organizer(&t.hub).await;
    let other = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &author, 10).await;

    let err = t
        .hub
        .quizzes
        .update_quiz(
            &other,
            quiz.id,
            UpdateQuizRequest {
                seats: Some(20),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "forbidden");
    assert_eq!(t.hub.quizzes.get_quiz(quiz.id).await.unwrap().seats, 10);
}

#[tokio::test]
async fn test_lowering_seats_below_accepted_is_allowed() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 2).await;
    for name in ["One", "Two"] {
        let client = create_client(&t.hub).await;
        let outcome = t
            .hub
            .registrations
            .submit(&client, quiz.id, team(name, 1))
            .await
            .unwrap();
        t.hub
            .registrations
            .decide(&organizer, outcome.registration().id, Decision::Accept)
            .await
            .unwrap();
    }

    t.hub
        .quizzes
        .update_quiz(
            &organizer,
            quiz.id,
            UpdateQuizRequest {
                seats: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let late = create_client(&t.hub).await;
    let status = t.hub.registrations.status_for(&late, quiz.id).await.unwrap();
    assert_eq!(status.remaining_capacity, -1);
    assert_eq!(status.seats_left(), 0);

    let err = t
        .hub
        .registrations
        .submit(&late, quiz.id, team("Late", 1))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "quiz_full");
}

#[tokio::test]
async fn test_delete_quiz_removes_registrations() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let client = create_client(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;
    t.hub
        .registrations
        .submit(&client, quiz.id, team("Gone", 2))
        .await
        .unwrap();

    t.hub.quizzes.delete_quiz(&organizer, quiz.id).await.unwrap();

    let err = t.hub.quizzes.get_quiz(quiz.id).await.unwrap_err();
    assert_eq!(err.error_code(), "not_found");
    assert!(t
        .hub
        .registrations
        .my_registrations(&client)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_quiz_by_client_forbidden() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let client = create_client(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;

    let err = t.hub.quizzes.delete_quiz(&client, quiz.id).await.unwrap_err();
    assert_eq!(err.error_code(), "forbidden");
}

#[tokio::test]
async fn test_delete_unknown_quiz() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;

    let err = t
        .hub
        .quizzes
        .delete_quiz(&organizer, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "not_found");
}

// ============================================================================
// Listing and catalog
// ============================================================================

#[tokio::test]
async fn test_list_my_quizzes_only_own_soonest_first() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let other = create_organizer(&t.hub).await;

    let mut later = quiz_request(5);
    later.date_time += Duration::days(3);
    let later = t.hub.quizzes.create_quiz(&organizer, later).await.unwrap();
    let sooner = publish_quiz(&t.hub, &organizer, 5).await;
    publish_quiz(&t.hub, &other, 5).await;

    let mine = t.hub.quizzes.list_my_quizzes(&organizer).await.unwrap();
    let ids: Vec<Uuid> = mine.iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![sooner.id, later.id]);
}

#[tokio::test]
async fn test_browse_filters_and_options() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;

    for (location, quiz_type) in [
        ("Zagreb", "Music"),
        ("Split", "Music"),
        ("Zagreb", "Sports"),
    ] {
        let mut request = quiz_request(5);
        request.location = location.to_string();
        request.quiz_type = quiz_type.to_string();
        t.hub.quizzes.create_quiz(&organizer, request).await.unwrap();
    }

    let everything = t.hub.quizzes.browse(&QuizFilter::default()).await.unwrap();
    assert_eq!(everything.quizzes.len(), 3);

    let catalog = t
        .hub
        .quizzes
        .browse(&QuizFilter {
            location: Some("Zagreb".to_string()),
            quiz_type: Some(String::new()),
        })
        .await
        .unwrap();
    assert_eq!(catalog.quizzes.len(), 2);
    assert!(catalog.quizzes.iter().all(|q| q.location == "Zagreb"));

    let mut locations = catalog.options.locations.clone();
    locations.sort();
    assert_eq!(locations, vec!["Split", "Zagreb"]);
    assert_eq!(catalog.options.quiz_types.len(), 2);
}

#[tokio::test]
async fn test_browse_during_outage_is_retryable() {
    let t = test_hub();
    t.store.set_unavailable(true);

    let err = t.hub.quizzes.browse(&QuizFilter::default()).await.unwrap_err();
    assert!(err.is_retryable());
}
