use crate::error::{AppError, AppResult};
use crate::models::UserRecord;
use crate::store::{DocumentStore, TxDecision};
use serde_json::json;
use std::sync::Arc;

/// Result of an unlock attempt, decided inside the user transaction
#[derive(Debug, Clone)]
pub enum UnlockOutcome {
    Unlocked(UserRecord),
    InsufficientXp { required: u64, balance: u64 },
}

/// Result of paying down pending XP, decided inside the user transaction
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    Paid { amount: u64, remaining_xp: u64 },
    NothingToPay,
    InsufficientBalance { balance: u64, pending: u64 },
}

/// Directory of user records (`users/{username}`).
///
/// The username-keyed path enforces at-most-one record per username; every
/// balance mutation re-reads the record inside a store transaction.
pub struct UserDirectory<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> UserDirectory<S> {
    /// Create a new UserDirectory
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn path(username: &str) -> String {
        format!("users/{}", username)
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        let username = normalize_username(username)?;
        let matches = self
            .store
            .query("users", "username", &json!(username))
            .await?;
        match matches.into_iter().next() {
            Some((_, doc)) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Find or create a user by username (upsert pattern).
    ///
    /// Concurrent first-sight calls for the same username race on one
    /// document path, so exactly one record is ever created.
    pub async fn get_or_create(&self, username: &str) -> AppResult<UserRecord> {
        let username = normalize_username(username)?;
        let fresh = serde_json::to_value(UserRecord::new(
            self.store.push_id(),
            username.clone(),
        ))?;

        let outcome = self
            .store
            .transaction(&Self::path(&username), |current| match current {
                // Existing record wins; abort and return what we observed.
                Some(_) => TxDecision::Abort,
                None => TxDecision::Commit(fresh.clone()),
            })
            .await?;

        let doc = outcome.value.ok_or_else(|| {
            AppError::Message(format!("User record for '{}' missing after upsert", username))
        })?;
        Ok(serde_json::from_value(doc)?)
    }

    /// Credit XP to a user's balance
    pub async fn award_xp(&self, username: &str, amount: u64) -> AppResult<UserRecord> {
        let username = normalize_username(username)?;
        let mut decode_failed = false;

        let outcome = self
            .store
            .transaction(&Self::path(&username), |current| {
                let Some(doc) = current else {
                    return TxDecision::Abort;
                };
                let mut user: UserRecord = match serde_json::from_value(doc) {
                    Ok(user) => user,
                    Err(_) => {
                        decode_failed = true;
                        return TxDecision::Abort;
                    }
                };
                user.xp = user.xp.saturating_add(amount);
                match serde_json::to_value(&user) {
                    Ok(next) => TxDecision::Commit(next),
                    Err(_) => {
                        decode_failed = true;
                        TxDecision::Abort
                    }
                }
            })
            .await?;

        if decode_failed {
            return Err(AppError::Message(format!(
                "User record for '{}' could not be decoded",
                username
            )));
        }
        if !outcome.committed {
            return Err(AppError::NotFound(format!("User {} not found", username)));
        }
        let doc = outcome
            .value
            .ok_or_else(|| AppError::Message("User record missing after XP award".to_string()))?;
        Ok(serde_json::from_value(doc)?)
    }

    /// Reserve XP spend for a gated event: `pendingXpSpend += required_xp`
    /// and mark the event unlocked. The balance check happens inside the
    /// transaction, against the freshest read.
    pub async fn unlock_event(
        &self,
        username: &str,
        event_id: &str,
        required_xp: u64,
    ) -> AppResult<UnlockOutcome> {
        let username = normalize_username(username)?;
        let mut decode_failed = false;
        let mut insufficient: Option<(u64, u64)> = None;

        let outcome = self
            .store
            .transaction(&Self::path(&username), |current| {
                let Some(doc) = current else {
                    return TxDecision::Abort;
                };
                let mut user: UserRecord = match serde_json::from_value(doc) {
                    Ok(user) => user,
                    Err(_) => {
                        decode_failed = true;
                        return TxDecision::Abort;
                    }
                };
                if user.xp < required_xp {
                    insufficient = Some((required_xp, user.xp));
                    return TxDecision::Abort;
                }
                insufficient = None;
                user.pending_xp_spend = user.pending_xp_spend.saturating_add(required_xp);
                user.unlocked_events
                    .get_or_insert_with(Default::default)
                    .insert(event_id.to_string(), true);
                match serde_json::to_value(&user) {
                    Ok(next) => TxDecision::Commit(next),
                    Err(_) => {
                        decode_failed = true;
                        TxDecision::Abort
                    }
                }
            })
            .await?;

        if decode_failed {
            return Err(AppError::Message(format!(
                "User record for '{}' could not be decoded",
                username
            )));
        }
        if let Some((required, balance)) = insufficient {
            return Ok(UnlockOutcome::InsufficientXp { required, balance });
        }
        if !outcome.committed {
            return Err(AppError::NotFound(format!("User {} not found", username)));
        }
        let doc = outcome
            .value
            .ok_or_else(|| AppError::Message("User record missing after unlock".to_string()))?;
        Ok(UnlockOutcome::Unlocked(serde_json::from_value(doc)?))
    }

    /// Pay down the whole pending XP debt against the balance. Aborts when
    /// there is nothing to pay or the balance cannot cover the debt; partial
    /// settlement is not supported.
    pub async fn settle_pending(&self, username: &str) -> AppResult<SettleOutcome> {
        let username = normalize_username(username)?;
        let mut decode_failed = false;
        let mut refusal: Option<SettleOutcome> = None;
        let mut paid: Option<u64> = None;

        let outcome = self
            .store
            .transaction(&Self::path(&username), |current| {
                let Some(doc) = current else {
                    return TxDecision::Abort;
                };
                let mut user: UserRecord = match serde_json::from_value(doc) {
                    Ok(user) => user,
                    Err(_) => {
                        decode_failed = true;
                        return TxDecision::Abort;
                    }
                };
                if user.pending_xp_spend == 0 {
                    refusal = Some(SettleOutcome::NothingToPay);
                    return TxDecision::Abort;
                }
                if user.xp < user.pending_xp_spend {
                    refusal = Some(SettleOutcome::InsufficientBalance {
                        balance: user.xp,
                        pending: user.pending_xp_spend,
                    });
                    return TxDecision::Abort;
                }
                refusal = None;
                paid = Some(user.pending_xp_spend);
                user.xp -= user.pending_xp_spend;
                user.pending_xp_spend = 0;
                match serde_json::to_value(&user) {
                    Ok(next) => TxDecision::Commit(next),
                    Err(_) => {
                        decode_failed = true;
                        TxDecision::Abort
                    }
                }
            })
            .await?;

        if decode_failed {
            return Err(AppError::Message(format!(
                "User record for '{}' could not be decoded",
                username
            )));
        }
        if let Some(refusal) = refusal {
            return Ok(refusal);
        }
        if !outcome.committed {
            return Err(AppError::NotFound(format!("User {} not found", username)));
        }
        let remaining = outcome
            .value
            .as_ref()
            .and_then(|doc| doc.get("xp"))
            .and_then(|xp| xp.as_u64())
            .unwrap_or(0);
        Ok(SettleOutcome::Paid {
            amount: paid.unwrap_or(0),
            remaining_xp: remaining,
        })
    }
}

/// Trim and validate a username for use as a document key
pub fn normalize_username(username: &str) -> AppResult<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Username cannot be empty".to_string()));
    }
    if trimmed.contains('/') {
        return Err(AppError::Validation(
            "Username cannot contain '/'".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
