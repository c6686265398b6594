use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User document, keyed by username (`users/{username}`).
///
/// The username-keyed path is the uniqueness constraint; `userId` is the
/// stable opaque identifier minted on first sight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub pending_xp_spend: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_events: Option<BTreeMap<String, bool>>,
}

impl UserRecord {
    pub fn new(user_id: String, username: String) -> Self {
        Self {
            user_id,
            username,
            xp: 0,
            pending_xp_spend: 0,
            unlocked_events: None,
        }
    }

    pub fn has_unlocked(&self, event_id: &str) -> bool {
        self.unlocked_events
            .as_ref()
            .and_then(|events| events.get(event_id))
            .copied()
            .unwrap_or(false)
    }

    pub fn has_pending_spend(&self) -> bool {
        self.pending_xp_spend > 0
    }
}
