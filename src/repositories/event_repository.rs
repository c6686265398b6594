use crate::error::{AppError, AppResult};
use crate::models::{EventDraft, LuckyEvent};
use crate::store::{DocumentStore, TxDecision, TxOutcome};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Repository for event documents (`events/{id}`)
pub struct EventRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> EventRepository<S> {
    /// Create a new EventRepository
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn path(event_id: &str) -> String {
        format!("events/{}", event_id)
    }

    /// Insert a new event from an admin draft
    pub async fn create(&self, draft: EventDraft) -> AppResult<LuckyEvent> {
        if draft.codes.is_empty() {
            return Err(AppError::Validation(
                "An event needs at least one prize code".to_string(),
            ));
        }
        if draft.selection_mode == crate::models::SelectionMode::Custom {
            let has_slot_map = draft
                .custom_winner_slots
                .as_ref()
                .map(|slots| slots.values().any(|slot| *slot > 0))
                .unwrap_or(false);
            let has_legacy_slots = draft.winner_slots.unwrap_or(0) > 0;
            if !has_slot_map && !has_legacy_slots {
                return Err(AppError::Validation(
                    "Custom selection needs winner slots".to_string(),
                ));
            }
        }

        let event = LuckyEvent {
            id: self.store.push_id(),
            name: draft.name,
            start_time: draft.start_time,
            end_time: draft.end_time,
            result_time: draft.result_time,
            codes: draft.codes,
            selection_mode: draft.selection_mode.as_str().to_string(),
            custom_winner_slots: draft.custom_winner_slots,
            winner_slots: draft.winner_slots,
            registered_users: None,
            winners: None,
            assigned_codes: None,
            required_xp: draft.required_xp,
            is_highlighted: Some(draft.is_highlighted),
            send_notification: Some(draft.send_notification),
        };

        let doc = serde_json::to_value(&event)?;
        self.store.set(&Self::path(&event.id), doc).await?;
        Ok(event)
    }

    /// Find an event by id
    pub async fn find_by_id(&self, event_id: &str) -> AppResult<Option<LuckyEvent>> {
        match self.store.get(&Self::path(event_id)).await? {
            Some(doc) => Ok(Some(decode_event(event_id, doc)?)),
            None => Ok(None),
        }
    }

    /// List all events. Documents that no longer decode are skipped.
    pub async fn list(&self) -> AppResult<Vec<LuckyEvent>> {
        let mut events = Vec::new();
        if let Some(Value::Object(children)) = self.store.get("events").await? {
            for (event_id, doc) in children {
                match decode_event(&event_id, doc) {
                    Ok(event) => events.push(event),
                    Err(e) => warn!("Skipping undecodable event {}: {}", event_id, e),
                }
            }
        }
        Ok(events)
    }

    /// Merge admin-edited fields into an event document as one atomic batch.
    /// Field names are document fields (camelCase).
    pub async fn update_fields(&self, event_id: &str, fields: Vec<(String, Value)>) -> AppResult<LuckyEvent> {
        if self.store.get(&Self::path(event_id)).await?.is_none() {
            return Err(AppError::NotFound(format!("Event {} not found", event_id)));
        }
        let writes = fields
            .into_iter()
            .map(|(field, value)| (format!("{}/{}", Self::path(event_id), field), value))
            .collect();
        self.store.update(writes).await?;

        self.find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))
    }

    /// Delete an event document
    pub async fn delete(&self, event_id: &str) -> AppResult<()> {
        self.store.remove(&Self::path(event_id)).await?;
        Ok(())
    }

    /// Run an optimistic read-modify-write transaction on an event document
    pub async fn transaction<F>(&self, event_id: &str, f: F) -> AppResult<TxOutcome>
    where
        F: FnMut(Option<Value>) -> TxDecision + Send,
    {
        Ok(self.store.transaction(&Self::path(event_id), f).await?)
    }

    /// Fresh push id for a registration entry
    pub fn next_push_id(&self) -> String {
        self.store.push_id()
    }
}

/// Decode an event document, injecting the storage key as its id
pub fn decode_event(event_id: &str, doc: Value) -> AppResult<LuckyEvent> {
    let mut event: LuckyEvent = serde_json::from_value(doc)?;
    event.id = event_id.to_string();
    Ok(event)
}
