use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Winner selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Custom,
    Random,
}

impl SelectionMode {
    /// Convert from document string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "custom" => Ok(SelectionMode::Custom),
            "random" => Ok(SelectionMode::Random),
            _ => Err(format!("Invalid selection mode: {}", s)),
        }
    }

    /// Convert to document string
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Custom => "custom",
            SelectionMode::Random => "random",
        }
    }
}

/// Lucky-draw event document.
///
/// `registeredUsers` is keyed by store push id; push ids sort in insertion
/// order, so iterating the map in key order is registration order. The
/// presence of `winners` (even empty) marks the event as settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuckyEvent {
    /// Storage key, injected on load; not part of the document body.
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub result_time: i64,
    #[serde(default)]
    pub codes: Vec<String>,
    /// Stored as text; use `selection_mode_enum` for type safety.
    #[serde(default)]
    pub selection_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_winner_slots: Option<BTreeMap<String, u32>>,
    /// Legacy shape: "first N registrants win", superseded by
    /// `customWinnerSlots`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_slots: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_users: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_codes: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_xp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_highlighted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_notification: Option<bool>,
}

impl LuckyEvent {
    /// Get selection mode as an enum; unrecognized modes select randomly.
    pub fn selection_mode_enum(&self) -> SelectionMode {
        SelectionMode::from_str(&self.selection_mode).unwrap_or(SelectionMode::Random)
    }

    /// Whether the lottery has already been run (field presence, not content)
    pub fn is_settled(&self) -> bool {
        self.winners.is_some()
    }

    pub fn is_xp_gated(&self) -> bool {
        self.required_xp.unwrap_or(0) > 0
    }

    pub fn registration_closed(&self, now_millis: i64) -> bool {
        now_millis > self.end_time
    }

    pub fn results_due(&self, now_millis: i64) -> bool {
        now_millis >= self.result_time
    }

    /// Registrant (push id, username) pairs in registration order.
    pub fn registrants_in_order(&self) -> Vec<(String, String)> {
        self.registered_users
            .as_ref()
            .map(|users| {
                users
                    .iter()
                    .map(|(id, name)| (id.clone(), name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_registrant(&self, username: &str) -> bool {
        self.registered_users
            .as_ref()
            .map(|users| users.values().any(|name| name == username))
            .unwrap_or(false)
    }
}

/// Admin input for creating an event
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub result_time: i64,
    pub codes: Vec<String>,
    pub selection_mode: SelectionMode,
    pub custom_winner_slots: Option<BTreeMap<String, u32>>,
    pub winner_slots: Option<u32>,
    pub required_xp: Option<u64>,
    pub is_highlighted: bool,
    pub send_notification: bool,
}
