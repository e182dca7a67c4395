//! Integration tests for the organizer registration views, the client
//! overview and live registration watches.

mod common;

use std::time::Duration;

use common::{create_client, create_organizer, publish_quiz, team, test_hub};
use domain::models::{Decision, ParticipationStatus};
use domain::services::UNKNOWN_USER;
use quizhub_client::{ClientError, ViewState};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_registrations_view_groups_by_user() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;
    let a = create_client(&t.hub).await;
    let b = create_client(&t.hub).await;

    let first = t.hub.registrations.submit(&a, quiz.id, team("A1", 1)).await.unwrap();
    t.hub
        .registrations
        .decide(&organizer, first.registration().id, Decision::Reject)
        .await
        .unwrap();
    t.hub.registrations.submit(&a, quiz.id, team("A2", 2)).await.unwrap();
    let rb = t.hub.registrations.submit(&b, quiz.id, team("B", 3)).await.unwrap();
    t.hub
        .registrations
        .decide(&organizer, rb.registration().id, Decision::Accept)
        .await
        .unwrap();

    let view = t
        .hub
        .registrations
        .registrations_view(&organizer, quiz.id, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(view.quiz_id, quiz.id);
    assert_eq!(view.seats, 4);
    assert_eq!(view.accepted_count, 1);
    assert_eq!(view.remaining_capacity, 2);
    assert_eq!(view.groups.len(), 2);

    // Newest activity first: B registered last.
    assert_eq!(view.groups[0].user_id, b.user_id);
    assert_eq!(view.groups[0].current_status, ParticipationStatus::Accepted);

    let group_a = &view.groups[1];
    assert_eq!(group_a.current_status, ParticipationStatus::Pending);
    assert_eq!(group_a.registrations.len(), 2);
    assert_eq!(group_a.registrations[0].team_name, "A2");
    assert_ne!(group_a.user_name, UNKNOWN_USER);
}

#[tokio::test]
async fn test_failed_profile_lookup_shows_unknown_user() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;
    let a = create_client(&t.hub).await;
    let b = create_client(&t.hub).await;
    t.hub.registrations.submit(&a, quiz.id, team("A", 1)).await.unwrap();
    t.hub.registrations.submit(&b, quiz.id, team("B", 1)).await.unwrap();

    t.store.fail_user_lookup(b.user_id);
    let view = t
        .hub
        .registrations
        .registrations_view(&organizer, quiz.id, &CancellationToken::new())
        .await
        .unwrap();

    let name_of = |user_id| {
        view.groups
            .iter()
            .find(|g| g.user_id == user_id)
            .map(|g| g.user_name.clone())
            .unwrap()
    };
    assert_eq!(name_of(b.user_id), UNKNOWN_USER);
    assert_ne!(name_of(a.user_id), UNKNOWN_USER);
}

#[tokio::test]
async fn test_slow_profile_lookup_times_out_to_unknown_user() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;
    let a = create_client(&t.hub).await;
    t.hub.registrations.submit(&a, quiz.id, team("A", 1)).await.unwrap();

    // Test config allows 200ms per lookup.
    t.store.delay_user_lookups(Duration::from_secs(5));
    let view = t
        .hub
        .registrations
        .registrations_view(&organizer, quiz.id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(view.groups[0].user_name, UNKNOWN_USER);
}

#[tokio::test]
async fn test_cancelled_view_fetch() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = t
        .hub
        .registrations
        .registrations_view(&organizer, quiz.id, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Cancelled);
}

#[tokio::test]
async fn test_registrations_view_is_for_author_only() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let client = create_client(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;

    let err = t
        .hub
        .registrations
        .registrations_view(&client, quiz.id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "forbidden");
}

#[tokio::test]
async fn test_accepted_teams_include_contact() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 4).await;
    let a = create_client(&t.hub).await;
    let b = create_client(&t.hub).await;

    let ra = t.hub.registrations.submit(&a, quiz.id, team("Accepted", 4)).await.unwrap();
    t.hub.registrations.submit(&b, quiz.id, team("Waiting", 2)).await.unwrap();
    t.hub
        .registrations
        .decide(&organizer, ra.registration().id, Decision::Accept)
        .await
        .unwrap();

    let teams = t
        .hub
        .registrations
        .accepted_teams(&organizer, quiz.id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].team_name, "Accepted");
    assert_eq!(teams[0].team_size, 4);
    assert_eq!(teams[0].phone.as_deref(), Some("+385 91 123 4567"));

    let profile = t.hub.profiles.get_profile(a.user_id).await.unwrap();
    assert_eq!(teams[0].contact_name, profile.name);
}

#[tokio::test]
async fn test_my_registrations_lists_latest_status_per_quiz() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let client = create_client(&t.hub).await;
    let soon = publish_quiz(&t.hub, &organizer, 4).await;
    let later = t
        .hub
        .quizzes
        .create_quiz(&organizer, {
            let mut request = common::quiz_request(4);
            request.date_time += chrono::Duration::days(7);
            request
        })
        .await
        .unwrap();
    let untouched = publish_quiz(&t.hub, &organizer, 4).await;

    t.hub.registrations.submit(&client, later.id, team("L", 1)).await.unwrap();
    let first = t.hub.registrations.submit(&client, soon.id, team("S", 1)).await.unwrap();
    t.hub
        .registrations
        .decide(&organizer, first.registration().id, Decision::Accept)
        .await
        .unwrap();

    let mine = t.hub.registrations.my_registrations(&client).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].quiz.id, soon.id);
    assert_eq!(mine[0].status, ParticipationStatus::Accepted);
    assert_eq!(mine[1].quiz.id, later.id);
    assert_eq!(mine[1].status, ParticipationStatus::Pending);
    assert!(mine.iter().all(|r| r.quiz.id != untouched.id));
}

// ============================================================================
// Live watch
// ============================================================================

#[tokio::test]
async fn test_watch_publishes_initial_and_updated_views() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let client = create_client(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 3).await;

    let mut watch = t.hub.registrations.watch(&organizer, quiz.id).await.unwrap();
    assert_eq!(watch.quiz_id(), quiz.id);

    let initial = watch
        .wait_for(|state| !state.is_loading())
        .await
        .unwrap();
    assert!(initial.ready().unwrap().groups.is_empty());

    let outcome = t
        .hub
        .registrations
        .submit(&client, quiz.id, team("Live", 2))
        .await
        .unwrap();
    let updated = watch
        .wait_for(|state| state.ready().is_some_and(|view| view.groups.len() == 1))
        .await
        .unwrap();
    assert_eq!(updated.ready().unwrap().remaining_capacity, 2);

    t.hub
        .registrations
        .decide(&organizer, outcome.registration().id, Decision::Accept)
        .await
        .unwrap();
    let accepted = watch
        .wait_for(|state| state.ready().is_some_and(|view| view.accepted_count == 1))
        .await
        .unwrap();
    assert_eq!(
        accepted.ready().unwrap().groups[0].current_status,
        ParticipationStatus::Accepted
    );

    watch.close().await;
    assert_eq!(t.store.subscriber_count(quiz.id).await, 0);
}

#[tokio::test]
async fn test_dropping_watch_releases_subscription() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 3).await;

    let watch = t.hub.registrations.watch(&organizer, quiz.id).await.unwrap();
    assert_eq!(t.store.subscriber_count(quiz.id).await, 1);
    drop(watch);

    let mut released = false;
    for _ in 0..50 {
        if t.store.subscriber_count(quiz.id).await == 0 {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(released);
}

#[tokio::test]
async fn test_watch_reports_deleted_quiz() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let client = create_client(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 3).await;
    t.hub
        .registrations
        .submit(&client, quiz.id, team("Doomed", 1))
        .await
        .unwrap();

    let mut watch = t.hub.registrations.watch(&organizer, quiz.id).await.unwrap();
    watch
        .wait_for(|state| state.ready().is_some_and(|view| view.groups.len() == 1))
        .await
        .unwrap();

    t.hub.quizzes.delete_quiz(&organizer, quiz.id).await.unwrap();

    let failed = watch
        .wait_for(|state| matches!(state, ViewState::Failed(_)))
        .await
        .unwrap();
    let ViewState::Failed(err) = failed else {
        unreachable!();
    };
    assert_eq!(err.error_code(), "not_found");
    assert!(!err.is_retryable());

    watch.close().await;
}

#[tokio::test]
async fn test_watch_is_for_author_only() {
    let t = test_hub();
    let organizer = create_organizer(&t.hub).await;
    let client = create_client(&t.hub).await;
    let quiz = publish_quiz(&t.hub, &organizer, 3).await;

    let err = t
        .hub
        .registrations
        .watch(&client, quiz.id)
        .await
        .err()
        .unwrap();
    assert_eq!(err.error_code(), "forbidden");
    assert_eq!(t.store.subscriber_count(quiz.id).await, 0);
}
