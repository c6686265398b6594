use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{ActionOutcome, Activity, AnswerValue, Submission};
use crate::repositories::activity_repository::{decode_activity, ActivityRepository};
use crate::repositories::user_repository::{normalize_username, UserDirectory};
use crate::store::{DocumentStore, TxDecision};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Quiz Submission Engine.
///
/// One submission per username per activity. The duplicate check and the
/// submission insert happen in a single transaction on the quiz document;
/// the XP award is a separate transaction on the user document, compensated
/// by deleting the submission again if the award write fails.
pub struct QuizService<S> {
    activity_repo: Arc<ActivityRepository<S>>,
    users: Arc<UserDirectory<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore> QuizService<S> {
    pub fn new(
        activity_repo: Arc<ActivityRepository<S>>,
        users: Arc<UserDirectory<S>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            activity_repo,
            users,
            clock,
        }
    }

    /// Submit answers for a live quiz/poll and award its flat XP.
    ///
    /// Store-level faults surface as a generic failure outcome; XP is never
    /// partially awarded.
    pub async fn submit_quiz_answer(
        &self,
        quiz_id: &str,
        username: &str,
        answers: Vec<AnswerValue>,
    ) -> AppResult<ActionOutcome> {
        match self.submit_inner(quiz_id, username, answers).await {
            Err(AppError::Store(e)) => {
                error!("Submission for quiz {} hit the store: {}", quiz_id, e);
                Ok(ActionOutcome::rejected(
                    "An error occurred while submitting your answer.",
                ))
            }
            other => other,
        }
    }

    async fn submit_inner(
        &self,
        quiz_id: &str,
        username: &str,
        answers: Vec<AnswerValue>,
    ) -> AppResult<ActionOutcome> {
        let username = normalize_username(username)?;
        self.users.get_or_create(&username).await?;

        let quiz = self
            .activity_repo
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;
        let now = self.clock.now_millis();

        if !quiz.is_live(now) {
            return Ok(ActionOutcome::rejected(
                "This activity is not currently active.",
            ));
        }
        if let Some(rejection) = validate_answers(&quiz, &answers) {
            return Ok(rejection);
        }
        // Fast path; the transaction below re-checks authoritatively.
        if self
            .activity_repo
            .find_submission_by_username(quiz_id, &username)
            .await?
            .is_some()
        {
            return Ok(ActionOutcome::rejected(
                "You have already submitted an answer.",
            ));
        }

        let submission_id = self.activity_repo.next_push_id();
        let submission_doc = serde_json::to_value(Submission {
            username: username.clone(),
            answers,
            submitted_at: now,
        })?;

        let mut decode_failed = false;
        let mut window_closed = false;
        let mut already_submitted = false;

        let outcome = self
            .activity_repo
            .transaction(quiz_id, |current| {
                decode_failed = false;
                window_closed = false;
                already_submitted = false;

                let Some(mut doc) = current else {
                    return TxDecision::Abort;
                };
                let activity = match decode_activity(quiz_id, doc.clone()) {
                    Ok(activity) => activity,
                    Err(_) => {
                        decode_failed = true;
                        return TxDecision::Abort;
                    }
                };

                if !activity.is_live(now) {
                    window_closed = true;
                    return TxDecision::Abort;
                }
                if activity.has_submission_from(&username) {
                    already_submitted = true;
                    return TxDecision::Abort;
                }

                if let Some(map) = doc.as_object_mut() {
                    let submissions = map
                        .entry("submissions".to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Some(submissions) = submissions.as_object_mut() {
                        submissions.insert(submission_id.clone(), submission_doc.clone());
                    }
                }
                TxDecision::Commit(doc)
            })
            .await?;

        if decode_failed {
            return Err(AppError::Message(format!(
                "Quiz {} could not be decoded",
                quiz_id
            )));
        }
        if window_closed {
            return Ok(ActionOutcome::rejected(
                "This activity is not currently active.",
            ));
        }
        if already_submitted {
            return Ok(ActionOutcome::rejected(
                "You have already submitted an answer.",
            ));
        }
        if !outcome.committed {
            return Err(AppError::NotFound(format!("Quiz {} not found", quiz_id)));
        }

        match self.users.award_xp(&username, quiz.xp).await {
            Ok(_) => {
                info!(
                    "User {} submitted to quiz {} and earned {} XP",
                    username, quiz_id, quiz.xp
                );
                Ok(ActionOutcome::ok(format!(
                    "Congratulations! You've earned {} XP.",
                    quiz.xp
                )))
            }
            Err(e) => {
                error!(
                    "XP award failed for {} on quiz {}: {}; rolling back submission",
                    username, quiz_id, e
                );
                if let Err(rollback) = self
                    .activity_repo
                    .remove_submission(quiz_id, &submission_id)
                    .await
                {
                    error!(
                        "Could not roll back submission {} on quiz {}: {}",
                        submission_id, quiz_id, rollback
                    );
                }
                Ok(ActionOutcome::rejected(
                    "An error occurred while submitting your answer.",
                ))
            }
        }
    }

    /// Delete a quiz/poll document (admin operation)
    pub async fn delete_quiz(&self, quiz_id: &str) -> AppResult<()> {
        self.activity_repo.delete(quiz_id).await?;
        info!("Quiz {} deleted", quiz_id);
        Ok(())
    }
}

/// One answer per question; mcq/poll answers must be in-range option indices
fn validate_answers(quiz: &Activity, answers: &[AnswerValue]) -> Option<ActionOutcome> {
    if answers.len() != quiz.questions.len() {
        return Some(ActionOutcome::rejected(format!(
            "Expected {} answer(s), got {}.",
            quiz.questions.len(),
            answers.len()
        )));
    }
    for (index, (question, answer)) in quiz.questions.iter().zip(answers).enumerate() {
        if question.question_type_enum().takes_option_index() {
            let option_count = question.options.as_ref().map(Vec::len).unwrap_or(0);
            match answer {
                AnswerValue::Choice(choice) if (*choice as usize) < option_count => {}
                _ => {
                    return Some(ActionOutcome::rejected(format!(
                        "Question {} needs one of its listed options.",
                        index + 1
                    )))
                }
            }
        }
    }
    None
}
