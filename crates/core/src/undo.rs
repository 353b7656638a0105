//! Undo engine: records reversible operations and redeems their tokens.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::operation::{
    OperationDraft, OperationEntry, Replay, UndoToken, DEFAULT_UNDO_TTL_SECS,
};
use crate::ports::{OperationRecorder, Store};

/// Result of redeeming a token.
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    /// Ids touched by the reversal, in the original order.
    pub item_ids: Vec<String>,
    /// Token that reverses this redemption.
    pub token: UndoToken,
}

pub struct UndoEngine<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl<S: Store> UndoEngine<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(store, clock, TimeDelta::seconds(DEFAULT_UNDO_TTL_SECS))
    }

    pub fn with_ttl(store: Arc<S>, clock: Arc<dyn Clock>, ttl: TimeDelta) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Stamp `draft` with a fresh token and times, then append it.
    async fn append(&self, tx: &mut S::Tx, draft: OperationDraft) -> CoreResult<UndoToken> {
        draft.validate()?;
        let created_at = self.clock.now();
        let entry = OperationEntry {
            token: UndoToken::generate(),
            action: draft.action,
            scope: draft.scope,
            item_ids: draft.item_ids,
            before: draft.before,
            after: draft.after,
            created_at,
            expires_at: created_at + self.ttl,
            consumed_at: None,
        };
        self.store.insert_operation(tx, &entry).await?;
        Ok(entry.token)
    }

    /// Reverse the operation behind `token` and issue a redo token.
    ///
    /// Runs in a single transaction: on any failure nothing is replayed and
    /// the token stays redeemable (unless the failure was the token itself).
    pub async fn redeem(&self, token: &UndoToken) -> CoreResult<Redemption> {
        let result = self.redeem_in_tx(token).await;
        match &result {
            Ok(redemption) => tracing::info!(
                token_prefix = %token_prefix(token),
                affected = redemption.item_ids.len(),
                "Redeemed undo token"
            ),
            Err(err) => tracing::warn!(
                token_prefix = %token_prefix(token),
                error = %err,
                "Undo redemption failed"
            ),
        }
        result
    }

    async fn redeem_in_tx(&self, token: &UndoToken) -> CoreResult<Redemption> {
        let mut tx = self.store.begin().await?;

        let entry = self
            .store
            .find_operation(&mut tx, token)
            .await?
            .ok_or(CoreError::TokenNotFound)?;

        if entry.is_consumed() {
            return Err(CoreError::TokenConsumed);
        }
        let now = self.clock.now();
        if entry.is_expired(now) {
            return Err(CoreError::TokenExpired);
        }

        match entry.action.replay() {
            Replay::DeleteAfter => {
                self.store.delete_by_snapshots(&mut tx, &entry.after).await?;
            }
            Replay::RestoreBefore => {
                self.store.replace_snapshots(&mut tx, &entry.before).await?;
            }
        }

        let marked = self.store.mark_consumed(&mut tx, token, now).await?;
        if marked == 0 {
            return Err(CoreError::TokenConsumed);
        }

        let redo = OperationDraft {
            action: entry.action.reverse(),
            scope: entry.scope,
            item_ids: entry.item_ids.clone(),
            before: entry.after,
            after: entry.before,
        };
        let redo_token = self.append(&mut tx, redo).await?;

        self.store.commit(tx).await?;

        Ok(Redemption {
            item_ids: entry.item_ids,
            token: redo_token,
        })
    }
}

#[async_trait]
impl<S: Store> OperationRecorder<S::Tx> for UndoEngine<S> {
    async fn record(&self, tx: &mut S::Tx, draft: OperationDraft) -> CoreResult<UndoToken> {
        self.append(tx, draft).await
    }
}

/// Enough of a token to correlate log lines without making it redeemable.
fn token_prefix(token: &UndoToken) -> &str {
    let raw = token.as_str();
    raw.get(..6).unwrap_or(raw)
}
