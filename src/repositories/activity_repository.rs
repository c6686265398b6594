use crate::error::{AppError, AppResult};
use crate::models::{Activity, ActivityDraft, Submission};
use crate::store::{DocumentStore, TxDecision, TxOutcome};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Repository for quiz/poll documents (`quizzes/{id}`)
pub struct ActivityRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ActivityRepository<S> {
    /// Create a new ActivityRepository
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn path(quiz_id: &str) -> String {
        format!("quizzes/{}", quiz_id)
    }

    /// Insert a new quiz/poll from an admin draft
    pub async fn create(&self, draft: ActivityDraft) -> AppResult<Activity> {
        if draft.title.trim().is_empty() {
            return Err(AppError::Validation(
                "Activity title cannot be empty".to_string(),
            ));
        }
        if draft.questions.is_empty() {
            return Err(AppError::Validation(
                "An activity needs at least one question".to_string(),
            ));
        }
        for (index, question) in draft.questions.iter().enumerate() {
            if question.question_type_enum().takes_option_index() {
                let option_count = question.options.as_ref().map(Vec::len).unwrap_or(0);
                if option_count < 2 {
                    return Err(AppError::Validation(format!(
                        "Question {} needs at least two options",
                        index + 1
                    )));
                }
            }
        }

        let activity = Activity {
            id: self.store.push_id(),
            title: draft.title,
            start_time: draft.start_time,
            end_time: draft.end_time,
            xp: draft.xp,
            questions: draft.questions,
            submissions: None,
        };

        let doc = serde_json::to_value(&activity)?;
        self.store.set(&Self::path(&activity.id), doc).await?;
        Ok(activity)
    }

    /// Find a quiz/poll by id
    pub async fn find_by_id(&self, quiz_id: &str) -> AppResult<Option<Activity>> {
        match self.store.get(&Self::path(quiz_id)).await? {
            Some(doc) => Ok(Some(decode_activity(quiz_id, doc)?)),
            None => Ok(None),
        }
    }

    /// List all quizzes/polls. Documents that no longer decode are skipped.
    pub async fn list(&self) -> AppResult<Vec<Activity>> {
        let mut activities = Vec::new();
        if let Some(Value::Object(children)) = self.store.get("quizzes").await? {
            for (quiz_id, doc) in children {
                match decode_activity(&quiz_id, doc) {
                    Ok(activity) => activities.push(activity),
                    Err(e) => warn!("Skipping undecodable activity {}: {}", quiz_id, e),
                }
            }
        }
        Ok(activities)
    }

    /// Delete a quiz/poll document
    pub async fn delete(&self, quiz_id: &str) -> AppResult<()> {
        self.store.remove(&Self::path(quiz_id)).await?;
        Ok(())
    }

    /// Value-scan the submission log for a username (the duplicate check is
    /// by username, not by the submission key).
    pub async fn find_submission_by_username(
        &self,
        quiz_id: &str,
        username: &str,
    ) -> AppResult<Option<(String, Submission)>> {
        let matches = self
            .store
            .query(
                &format!("{}/submissions", Self::path(quiz_id)),
                "username",
                &json!(username),
            )
            .await?;
        match matches.into_iter().next() {
            Some((submission_id, doc)) => Ok(Some((submission_id, serde_json::from_value(doc)?))),
            None => Ok(None),
        }
    }

    /// Remove a single submission entry (compensation path)
    pub async fn remove_submission(&self, quiz_id: &str, submission_id: &str) -> AppResult<()> {
        self.store
            .remove(&format!("{}/submissions/{}", Self::path(quiz_id), submission_id))
            .await?;
        Ok(())
    }

    /// Run an optimistic read-modify-write transaction on a quiz document
    pub async fn transaction<F>(&self, quiz_id: &str, f: F) -> AppResult<TxOutcome>
    where
        F: FnMut(Option<Value>) -> TxDecision + Send,
    {
        Ok(self.store.transaction(&Self::path(quiz_id), f).await?)
    }

    /// Fresh push id for a submission entry
    pub fn next_push_id(&self) -> String {
        self.store.push_id()
    }
}

/// Decode a quiz document, injecting the storage key as its id
pub fn decode_activity(quiz_id: &str, doc: Value) -> AppResult<Activity> {
    let mut activity: Activity = serde_json::from_value(doc)?;
    activity.id = quiz_id.to_string();
    Ok(activity)
}
