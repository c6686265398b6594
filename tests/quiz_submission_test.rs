mod helpers;

use helpers::*;
use urabox_backend::models::AnswerValue;

#[tokio::test]
async fn submission_awards_the_flat_xp() {
    let harness = TestHarness::new();
    let quiz = harness
        .state
        .activity_repo
        .create(quiz_draft(50))
        .await
        .unwrap();

    let outcome = harness
        .state
        .quiz_service
        .submit_quiz_answer(&quiz.id, "alice", quiz_answers())
        .await
        .unwrap();
    assert!(outcome.success);
    assert!(outcome.message.contains("50 XP"));

    let user = harness
        .state
        .user_directory
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.xp, 50);

    let stored = harness
        .state
        .activity_repo
        .find_by_id(&quiz.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.has_submission_from("alice"));
    let submissions = stored.submissions.unwrap();
    assert_eq!(submissions.len(), 1);
    let submission = submissions.values().next().unwrap();
    assert_eq!(submission.answers, quiz_answers());
    assert_eq!(submission.submitted_at, NOW);
}

#[tokio::test]
async fn second_submission_is_rejected_and_not_paid() {
    let harness = TestHarness::new();
    let quiz = harness
        .state
        .activity_repo
        .create(quiz_draft(50))
        .await
        .unwrap();

    harness
        .state
        .quiz_service
        .submit_quiz_answer(&quiz.id, "alice", quiz_answers())
        .await
        .unwrap();
    let second = harness
        .state
        .quiz_service
        .submit_quiz_answer(&quiz.id, "alice", quiz_answers())
        .await
        .unwrap();
    assert!(!second.success);
    assert!(second.message.contains("already submitted"));

    let user = harness
        .state
        .user_directory
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.xp, 50);

    let stored = harness
        .state
        .activity_repo
        .find_by_id(&quiz.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.submissions.unwrap().len(), 1);
}

#[tokio::test]
async fn submissions_outside_the_live_window_are_rejected() {
    let harness = TestHarness::new();
    let quiz = harness
        .state
        .activity_repo
        .create(quiz_draft(50))
        .await
        .unwrap();

    harness.clock.set(quiz.start_time - 1);
    let early = harness
        .state
        .quiz_service
        .submit_quiz_answer(&quiz.id, "alice", quiz_answers())
        .await
        .unwrap();
    assert!(!early.success);
    assert!(early.message.contains("not currently active"));

    harness.clock.set(quiz.end_time + 1);
    let late = harness
        .state
        .quiz_service
        .submit_quiz_answer(&quiz.id, "alice", quiz_answers())
        .await
        .unwrap();
    assert!(!late.success);

    let user = harness
        .state
        .user_directory
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.xp, 0);
}

#[tokio::test]
async fn answer_shape_is_validated() {
    let harness = TestHarness::new();
    let quiz = harness
        .state
        .activity_repo
        .create(quiz_draft(50))
        .await
        .unwrap();

    // Wrong answer count.
    let short = harness
        .state
        .quiz_service
        .submit_quiz_answer(&quiz.id, "alice", vec![AnswerValue::Choice(1)])
        .await
        .unwrap();
    assert!(!short.success);

    // Option index out of range for the mcq.
    let out_of_range = harness
        .state
        .quiz_service
        .submit_quiz_answer(
            &quiz.id,
            "alice",
            vec![
                AnswerValue::Choice(9),
                AnswerValue::Text("because".to_string()),
            ],
        )
        .await
        .unwrap();
    assert!(!out_of_range.success);

    // Free text where an option index is required.
    let wrong_kind = harness
        .state
        .quiz_service
        .submit_quiz_answer(
            &quiz.id,
            "alice",
            vec![
                AnswerValue::Text("red".to_string()),
                AnswerValue::Text("because".to_string()),
            ],
        )
        .await
        .unwrap();
    assert!(!wrong_kind.success);

    let user = harness
        .state
        .user_directory
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.xp, 0);
}

#[tokio::test]
async fn missing_quiz_is_a_not_found_error() {
    let harness = TestHarness::new();
    let err = harness
        .state
        .quiz_service
        .submit_quiz_answer("no-such-quiz", "alice", quiz_answers())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_submissions_award_xp_exactly_once() {
    let harness = TestHarness::new();
    let quiz = harness
        .state
        .activity_repo
        .create(quiz_draft(50))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let quiz_service = harness.state.quiz_service.clone();
        let quiz_id = quiz.id.clone();
        handles.push(tokio::spawn(async move {
            quiz_service
                .submit_quiz_answer(&quiz_id, "alice", quiz_answers())
                .await
                .unwrap()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().success {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let user = harness
        .state
        .user_directory
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.xp, 50);

    let stored = harness
        .state
        .activity_repo
        .find_by_id(&quiz.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.submissions.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_quiz_removes_its_document() {
    let harness = TestHarness::new();
    let quiz = harness
        .state
        .activity_repo
        .create(quiz_draft(50))
        .await
        .unwrap();

    harness
        .state
        .quiz_service
        .delete_quiz(&quiz.id)
        .await
        .unwrap();
    assert!(harness
        .state
        .activity_repo
        .find_by_id(&quiz.id)
        .await
        .unwrap()
        .is_none());
}
