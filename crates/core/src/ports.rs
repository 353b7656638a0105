//! Storage ports implemented by the Postgres adapter and the in-memory store.
//!
//! Every method takes the caller's transaction handle. Nothing behind these
//! traits can open a transaction of its own; only [`Transactional::begin`]
//! produces one. Dropping a handle without committing rolls it back.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::item::{Item, ItemPatch, ListFilter, NewItem};
use crate::operation::{OperationDraft, OperationEntry, UndoToken};
use crate::snapshot::Snapshot;
use crate::types::Timestamp;

/// A store that hands out transactions.
#[async_trait]
pub trait Transactional: Send + Sync + 'static {
    type Tx: Send;

    async fn begin(&self) -> CoreResult<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> CoreResult<()>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> CoreResult<()>;
}

/// Durable record of items, addressed by string id.
#[async_trait]
pub trait ItemStore: Transactional {
    async fn find_item(&self, tx: &mut Self::Tx, id: &str) -> CoreResult<Option<Item>>;

    /// Batch lookup. Missing ids are skipped; result order is unspecified.
    async fn find_items(&self, tx: &mut Self::Tx, ids: &[String]) -> CoreResult<Vec<Item>>;

    /// Direct children of the given parents, ordered by weight.
    async fn list_children(&self, tx: &mut Self::Tx, parent_ids: &[String])
        -> CoreResult<Vec<Item>>;

    async fn insert_item(&self, tx: &mut Self::Tx, item: &NewItem) -> CoreResult<Item>;

    /// Overwrite every mutable column of an existing row and touch `updated_at`.
    async fn update_item(&self, tx: &mut Self::Tx, item: &Item) -> CoreResult<Option<Item>>;

    /// Apply a partial column update. Returns `false` when the row is absent.
    async fn update_columns(&self, tx: &mut Self::Tx, id: &str, patch: &ItemPatch)
        -> CoreResult<bool>;

    async fn delete_item(&self, tx: &mut Self::Tx, id: &str) -> CoreResult<bool>;

    async fn delete_items(&self, tx: &mut Self::Tx, ids: &[String]) -> CoreResult<u64>;

    /// Root items matching `filter`, paginated, plus the unpaginated total.
    async fn list_items(&self, tx: &mut Self::Tx, filter: &ListFilter)
        -> CoreResult<(Vec<Item>, i64)>;

    /// Upsert each snapshot by id, overwriting every column including the
    /// timestamps.
    async fn replace_snapshots(&self, tx: &mut Self::Tx, snapshots: &[Snapshot])
        -> CoreResult<()>;

    /// Remove every row whose id appears in `snapshots`.
    async fn delete_by_snapshots(&self, tx: &mut Self::Tx, snapshots: &[Snapshot])
        -> CoreResult<u64>;
}

/// Durable, append-only record of reversible operations.
#[async_trait]
pub trait OperationLog: Transactional {
    async fn insert_operation(&self, tx: &mut Self::Tx, entry: &OperationEntry) -> CoreResult<()>;

    async fn find_operation(&self, tx: &mut Self::Tx, token: &UndoToken)
        -> CoreResult<Option<OperationEntry>>;

    /// Conditionally mark an entry consumed.
    ///
    /// Only an entry whose `consumed_at` is still null is touched. Returns
    /// the number of rows changed (0 or 1).
    async fn mark_consumed(&self, tx: &mut Self::Tx, token: &UndoToken, at: Timestamp)
        -> CoreResult<u64>;
}

/// A backend providing both items and the operation log over one
/// transaction type.
pub trait Store: ItemStore + OperationLog {}

impl<T: ItemStore + OperationLog> Store for T {}

/// The narrow capability the mutation facade needs from the undo engine.
#[async_trait]
pub trait OperationRecorder<Tx: Send>: Send + Sync {
    /// Append an entry inside the caller's transaction and return its token.
    async fn record(&self, tx: &mut Tx, draft: OperationDraft) -> CoreResult<UndoToken>;
}
