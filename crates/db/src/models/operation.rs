//! Operation log row model.
//!
//! Maps to the `item_operations` table. Id and snapshot lists are JSONB
//! arrays decoded through [`sqlx::types::Json`].

use sqlx::types::Json;
use sqlx::FromRow;
use tasklane_core::error::{CoreError, CoreResult};
use tasklane_core::operation::{OperationEntry, UndoToken};
use tasklane_core::snapshot::Snapshot;
use tasklane_core::types::{DbId, Timestamp};

/// A row from the `item_operations` table.
#[derive(Debug, Clone, FromRow)]
pub struct OperationRow {
    pub id: DbId,
    pub token: String,
    pub action: String,
    pub scope: String,
    pub item_ids: Json<Vec<String>>,
    pub before_state: Json<Vec<Snapshot>>,
    pub after_state: Json<Vec<Snapshot>>,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OperationRow {
    /// Decode into a domain entry.
    ///
    /// An action label this build does not know fails with
    /// [`CoreError::UnsupportedAction`].
    pub fn into_entry(self) -> CoreResult<OperationEntry> {
        let action = self.action.parse()?;
        let scope = self.scope.parse().map_err(|_| {
            CoreError::Persistence(format!("operation has unknown scope '{}'", self.scope))
        })?;
        Ok(OperationEntry {
            token: UndoToken::new(self.token),
            action,
            scope,
            item_ids: self.item_ids.0,
            before: self.before_state.0,
            after: self.after_state.0,
            created_at: self.created_at,
            expires_at: self.expires_at,
            consumed_at: self.consumed_at,
        })
    }
}
