use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::ActionOutcome;
use crate::repositories::event_repository::{decode_event, EventRepository};
use crate::repositories::user_repository::{normalize_username, UnlockOutcome, UserDirectory};
use crate::store::{DocumentStore, TxDecision};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Registration/Unlock Engine.
///
/// Free events register directly. XP-gated events are a two-step flow:
/// unlocking reserves the XP as pending spend (no deadline check; unlock
/// buys visibility, not a seat), and registration is only allowed once all
/// pending XP is paid off.
pub struct RegistrationService<S> {
    event_repo: Arc<EventRepository<S>>,
    users: Arc<UserDirectory<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore> RegistrationService<S> {
    pub fn new(
        event_repo: Arc<EventRepository<S>>,
        users: Arc<UserDirectory<S>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            event_repo,
            users,
            clock,
        }
    }

    /// Register a user for an event, or unlock an XP-gated event.
    ///
    /// Re-registering is an idempotent success, so a second device replaying
    /// the flow never errors and never writes a duplicate entry. Store-level
    /// faults surface as a generic failure outcome, never as a half-applied
    /// registration.
    pub async fn register_for_event(
        &self,
        event_id: &str,
        username: &str,
    ) -> AppResult<ActionOutcome> {
        match self.register_inner(event_id, username).await {
            Err(AppError::Store(e)) => {
                error!("Registration for event {} hit the store: {}", event_id, e);
                Ok(ActionOutcome::rejected(
                    "An error occurred during registration. Please try again.",
                ))
            }
            other => other,
        }
    }

    async fn register_inner(&self, event_id: &str, username: &str) -> AppResult<ActionOutcome> {
        let username = normalize_username(username)?;
        let user = self.users.get_or_create(&username).await?;
        let event = self
            .event_repo
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;
        let now = self.clock.now_millis();

        if event.is_xp_gated() {
            let required_xp = event.required_xp.unwrap_or(0);

            if !user.has_unlocked(event_id) {
                return match self.users.unlock_event(&username, event_id, required_xp).await? {
                    UnlockOutcome::Unlocked(_) => {
                        info!(
                            "User {} unlocked event {} for {} XP",
                            username, event_id, required_xp
                        );
                        Ok(ActionOutcome::ok(format!(
                            "Event unlocked for {} XP! Pay your pending XP from Settings, then register.",
                            required_xp
                        )))
                    }
                    UnlockOutcome::InsufficientXp { required, balance } => {
                        Ok(ActionOutcome::rejected(format!(
                            "You need {} XP to unlock this event, but you only have {}.",
                            required, balance
                        )))
                    }
                };
            }

            if event.registration_closed(now) {
                return Ok(ActionOutcome::rejected(
                    "The registration deadline for this event has passed.",
                ));
            }
            // Any outstanding debt blocks paid registration, even debt
            // from a different event.
            if user.has_pending_spend() {
                return Ok(ActionOutcome::rejected(
                    "Please pay your pending XP before registering.",
                ));
            }
        } else if event.registration_closed(now) {
            return Ok(ActionOutcome::rejected(
                "The registration deadline for this event has passed.",
            ));
        }

        if event.has_registrant(&username) {
            return Ok(ActionOutcome::ok(
                "You are already registered for this event.",
            ));
        }

        self.commit_registration(event_id, &username, now).await
    }

    /// Atomically append the registrant. Deadline and duplicate are
    /// re-checked inside the transaction; the pre-checks above only exist
    /// for friendlier message ordering.
    async fn commit_registration(
        &self,
        event_id: &str,
        username: &str,
        now: i64,
    ) -> AppResult<ActionOutcome> {
        let push_id = self.event_repo.next_push_id();
        let mut decode_failed = false;
        let mut deadline_passed = false;
        let mut already_registered = false;

        let outcome = self
            .event_repo
            .transaction(event_id, |current| {
                decode_failed = false;
                deadline_passed = false;
                already_registered = false;

                let Some(mut doc) = current else {
                    return TxDecision::Abort;
                };
                let event = match decode_event(event_id, doc.clone()) {
                    Ok(event) => event,
                    Err(_) => {
                        decode_failed = true;
                        return TxDecision::Abort;
                    }
                };

                if event.registration_closed(now) {
                    deadline_passed = true;
                    return TxDecision::Abort;
                }
                if event.has_registrant(username) {
                    already_registered = true;
                    return TxDecision::Abort;
                }

                if let Some(map) = doc.as_object_mut() {
                    let registered = map
                        .entry("registeredUsers".to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Some(registered) = registered.as_object_mut() {
                        registered.insert(push_id.clone(), json!(username));
                    }
                }
                TxDecision::Commit(doc)
            })
            .await?;

        if decode_failed {
            return Err(AppError::Message(format!(
                "Event {} could not be decoded",
                event_id
            )));
        }
        if deadline_passed {
            return Ok(ActionOutcome::rejected(
                "The registration deadline for this event has passed.",
            ));
        }
        if already_registered {
            return Ok(ActionOutcome::ok(
                "You are already registered for this event.",
            ));
        }
        if !outcome.committed {
            return Err(AppError::NotFound(format!("Event {} not found", event_id)));
        }

        info!("User {} registered for event {}", username, event_id);
        Ok(ActionOutcome::ok("Registration successful! Good luck!"))
    }
}
