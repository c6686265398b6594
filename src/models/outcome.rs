use serde::{Deserialize, Serialize};

/// User-facing result of a public operation.
///
/// Business-rule refusals (deadline passed, insufficient XP, duplicate
/// submission, ...) are expected outcomes, not errors: callers branch on
/// `success` and surface `message` verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
