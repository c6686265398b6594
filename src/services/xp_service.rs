use crate::error::{AppError, AppResult};
use crate::models::ActionOutcome;
use crate::repositories::user_repository::{SettleOutcome, UserDirectory};
use crate::store::DocumentStore;
use std::sync::Arc;
use tracing::{error, info};

/// XP Settlement: pays a user's pending XP debt in full, never partially.
pub struct XpService<S> {
    users: Arc<UserDirectory<S>>,
}

impl<S: DocumentStore> XpService<S> {
    pub fn new(users: Arc<UserDirectory<S>>) -> Self {
        Self { users }
    }

    /// Pay down the whole pending XP debt against the balance.
    ///
    /// Store-level faults surface as a generic failure outcome; the debt is
    /// either paid in full or untouched.
    pub async fn pay_pending_xp(&self, username: &str) -> AppResult<ActionOutcome> {
        let settled = match self.users.settle_pending(username).await {
            Err(AppError::Store(e)) => {
                error!("Settlement for {} hit the store: {}", username, e);
                return Ok(ActionOutcome::rejected(
                    "An error occurred while paying your pending XP.",
                ));
            }
            other => other?,
        };
        match settled {
            SettleOutcome::Paid {
                amount,
                remaining_xp,
            } => {
                info!("User {} paid {} pending XP", username, amount);
                Ok(ActionOutcome::ok(format!(
                    "Pending XP paid! {} XP deducted, {} XP remaining.",
                    amount, remaining_xp
                )))
            }
            SettleOutcome::NothingToPay => {
                Ok(ActionOutcome::rejected("You have no pending XP to pay."))
            }
            SettleOutcome::InsufficientBalance { balance, pending } => {
                Ok(ActionOutcome::rejected(format!(
                    "Insufficient XP: you owe {} XP but only have {}.",
                    pending, balance
                )))
            }
        }
    }
}
