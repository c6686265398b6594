use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::LuckyEvent;
use crate::repositories::event_repository::{decode_event, EventRepository};
use crate::services::selection::select_winners;
use crate::store::{DocumentStore, TxDecision};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Winner Engine: settles an event exactly once after its result time.
///
/// The whole settle step is one store transaction whose callback aborts if
/// `winners` is already present, so racing callers cannot each persist a
/// different draw; everyone returns the single committed result.
pub struct WinnerService<S> {
    event_repo: Arc<EventRepository<S>>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl<S: DocumentStore> WinnerService<S> {
    /// Create a new winner service with an entropy-seeded RNG
    pub fn new(event_repo: Arc<EventRepository<S>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            event_repo,
            clock,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a winner service with a fixed RNG seed (deterministic draws)
    pub fn with_rng_seed(
        event_repo: Arc<EventRepository<S>>,
        clock: Arc<dyn Clock>,
        seed: u64,
    ) -> Self {
        Self {
            event_repo,
            clock,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Determine and persist winners for an event.
    ///
    /// Idempotent: a settled event is returned unchanged. Before the
    /// event's result time the event is also returned unchanged; callers
    /// re-invoke once the deadline passes. An event document that no longer
    /// decodes settles fail-safe with no winners.
    pub async fn determine_winners(&self, event_id: &str) -> AppResult<LuckyEvent> {
        let now = self.clock.now_millis();

        let outcome = self
            .event_repo
            .transaction(event_id, |current| {
                let Some(mut doc) = current else {
                    return TxDecision::Abort;
                };

                let event = match decode_event(event_id, doc.clone()) {
                    Ok(event) => event,
                    Err(e) => {
                        if doc.get("winners").is_some() {
                            return TxDecision::Abort;
                        }
                        // Fail-safe: a drifted document settles with no
                        // winners instead of wedging the event forever.
                        error!("Settling event {} without winners: {}", event_id, e);
                        merge_settlement(&mut doc, Vec::new(), json!({}));
                        return TxDecision::Commit(doc);
                    }
                };

                if event.is_settled() || !event.results_due(now) {
                    return TxDecision::Abort;
                }

                let selection = {
                    let mut rng = match self.rng.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    select_winners(&event, &mut *rng)
                };

                let assigned = Value::Object(
                    selection
                        .assigned_codes
                        .iter()
                        .map(|(id, code)| (id.clone(), Value::String(code.clone())))
                        .collect(),
                );
                merge_settlement(&mut doc, selection.winners, assigned);
                TxDecision::Commit(doc)
            })
            .await?;

        let doc = outcome
            .value
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;
        let event = decode_event(event_id, doc)?;

        if outcome.committed {
            info!(
                "Event {} settled with {} winner(s) from {} registrant(s)",
                event_id,
                event.winners.as_ref().map(Vec::len).unwrap_or(0),
                event.registrants_in_order().len()
            );
        }
        Ok(event)
    }

    /// Delete an event document (admin operation)
    pub async fn delete_event(&self, event_id: &str) -> AppResult<()> {
        self.event_repo.delete(event_id).await?;
        info!("Event {} deleted", event_id);
        Ok(())
    }
}

/// Write the settlement fields onto the raw document in one merge
fn merge_settlement(doc: &mut Value, winners: Vec<String>, assigned_codes: Value) {
    if let Some(map) = doc.as_object_mut() {
        map.insert("winners".to_string(), json!(winners));
        map.insert("assignedCodes".to_string(), assigned_codes);
    }
}
