//! Mutation facade: every item-changing operation, each one transaction and
//! one recorded undo entry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::clock::{Clock, WeightGenerator};
use crate::error::{CoreError, CoreResult};
use crate::item::{
    validate_ids, validate_title, Item, ItemNode, ItemPage, ItemPatch, ListFilter, NewItem,
    Status,
};
use crate::operation::{ActionKind, OperationDraft, UndoToken};
use crate::ports::{ItemStore, OperationRecorder};
use crate::snapshot::{to_snapshot, to_snapshots};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// The resulting state of a mutation plus the token that reverses it.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    pub value: T,
    pub undo_token: UndoToken,
}

#[derive(Debug, Clone, Default)]
pub struct CreateItem {
    pub title: String,
    pub notes: Option<String>,
    pub deadline: Option<NaiveDate>,
    /// Defaults to [`Status::Future`].
    pub status: Option<Status>,
    /// Defaults to a fresh generated weight.
    pub sort_weight: Option<i64>,
    pub parent_id: Option<String>,
}

/// Field edits. The outer `None` leaves a field unchanged; for nullable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: Status,
    pub sort_weight: Option<i64>,
    /// Only meaningful when moving to history; defaults to now.
    pub completed_at: Option<Timestamp>,
}

impl StatusChange {
    pub fn to(status: Status) -> Self {
        Self {
            status,
            sort_weight: None,
            completed_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct ItemService<S: ItemStore> {
    store: Arc<S>,
    recorder: Arc<dyn OperationRecorder<S::Tx>>,
    clock: Arc<dyn Clock>,
    weights: Arc<WeightGenerator>,
}

impl<S: ItemStore> ItemService<S> {
    pub fn new(
        store: Arc<S>,
        recorder: Arc<dyn OperationRecorder<S::Tx>>,
        clock: Arc<dyn Clock>,
        weights: Arc<WeightGenerator>,
    ) -> Self {
        Self {
            store,
            recorder,
            clock,
            weights,
        }
    }

    // -- reads ---------------------------------------------------------------

    /// Root items matching `filter`, each with its direct children.
    pub async fn list(&self, filter: &ListFilter) -> CoreResult<ItemPage> {
        let mut tx = self.store.begin().await?;
        let (roots, total) = self.store.list_items(&mut tx, filter).await?;
        let items = self.attach_children(&mut tx, roots).await?;
        self.store.commit(tx).await?;
        Ok(ItemPage { items, total })
    }

    pub async fn get(&self, id: &str) -> CoreResult<ItemNode> {
        let mut tx = self.store.begin().await?;
        let item = self.require(&mut tx, id).await?;
        let mut nodes = self.attach_children(&mut tx, vec![item]).await?;
        self.store.commit(tx).await?;
        nodes.pop().ok_or_else(|| CoreError::item_not_found(id))
    }

    // -- single-item mutations -----------------------------------------------

    pub async fn create(&self, input: CreateItem) -> CoreResult<Mutation<Item>> {
        validate_title(&input.title)?;

        let mut tx = self.store.begin().await?;
        if let Some(parent_id) = &input.parent_id {
            self.require(&mut tx, parent_id).await?;
        }

        let status = input.status.unwrap_or(Status::Future);
        let new_item = NewItem {
            id: Uuid::new_v4().to_string(),
            parent_id: input.parent_id,
            title: input.title,
            notes: input.notes,
            deadline: input.deadline,
            status,
            sort_weight: input.sort_weight.unwrap_or_else(|| self.weights.next()),
            completed_at: (status == Status::History).then(|| self.clock.now()),
        };
        let inserted = self.store.insert_item(&mut tx, &new_item).await?;
        let created = self.require(&mut tx, &inserted.id).await?;

        let draft = OperationDraft::single(
            ActionKind::Create,
            created.id.clone(),
            None,
            Some(to_snapshot(&created)),
        );
        let undo_token = self.recorder.record(&mut tx, draft).await?;
        self.store.commit(tx).await?;

        tracing::info!(item_id = %created.id, status = %created.status, "Item created");
        Ok(Mutation {
            value: created,
            undo_token,
        })
    }

    pub async fn update(&self, id: &str, changes: ItemChanges) -> CoreResult<Mutation<Item>> {
        if let Some(title) = &changes.title {
            validate_title(title)?;
        }

        let mut tx = self.store.begin().await?;
        let before = self.require(&mut tx, id).await?;

        let mut edited = before.clone();
        if let Some(title) = changes.title {
            edited.title = title;
        }
        if let Some(notes) = changes.notes {
            edited.notes = notes;
        }
        if let Some(deadline) = changes.deadline {
            edited.deadline = deadline;
        }

        let after = self
            .store
            .update_item(&mut tx, &edited)
            .await?
            .ok_or_else(|| CoreError::item_not_found(id))?;

        let draft = OperationDraft::single(
            ActionKind::Update,
            id,
            Some(to_snapshot(&before)),
            Some(to_snapshot(&after)),
        );
        let undo_token = self.recorder.record(&mut tx, draft).await?;
        self.store.commit(tx).await?;

        tracing::info!(item_id = %id, "Item updated");
        Ok(Mutation {
            value: after,
            undo_token,
        })
    }

    /// Move an item to `change.status`.
    ///
    /// Moving into history stamps a completion time and is recorded as
    /// `complete`; any other transition clears it and is recorded as `move`.
    pub async fn change_status(
        &self,
        id: &str,
        change: StatusChange,
    ) -> CoreResult<Mutation<Item>> {
        let mut tx = self.store.begin().await?;
        let before = self.require(&mut tx, id).await?;

        let completed_at = match change.status {
            Status::History => Some(change.completed_at.unwrap_or_else(|| self.clock.now())),
            _ => None,
        };
        let patch = ItemPatch {
            status: Some(change.status),
            sort_weight: Some(change.sort_weight.unwrap_or_else(|| self.weights.next())),
            completed_at: Some(completed_at),
        };
        if !self.store.update_columns(&mut tx, id, &patch).await? {
            return Err(CoreError::item_not_found(id));
        }
        let after = self.require(&mut tx, id).await?;

        let action = if change.status == Status::History && before.status != Status::History {
            ActionKind::Complete
        } else {
            ActionKind::Move
        };
        let draft = OperationDraft::single(
            action,
            id,
            Some(to_snapshot(&before)),
            Some(to_snapshot(&after)),
        );
        let undo_token = self.recorder.record(&mut tx, draft).await?;
        self.store.commit(tx).await?;

        tracing::info!(item_id = %id, from = %before.status, to = %after.status, %action, "Item status changed");
        Ok(Mutation {
            value: after,
            undo_token,
        })
    }

    pub async fn complete(
        &self,
        id: &str,
        completed_at: Option<Timestamp>,
    ) -> CoreResult<Mutation<Item>> {
        self.change_status(
            id,
            StatusChange {
                status: Status::History,
                sort_weight: None,
                completed_at,
            },
        )
        .await
    }

    /// Delete an item. The returned value is the state it had.
    pub async fn delete(&self, id: &str) -> CoreResult<Mutation<Item>> {
        let mut tx = self.store.begin().await?;
        let before = self.require(&mut tx, id).await?;

        if !self.store.delete_item(&mut tx, id).await? {
            return Err(CoreError::item_not_found(id));
        }

        let draft = OperationDraft::single(ActionKind::Delete, id, Some(to_snapshot(&before)), None);
        let undo_token = self.recorder.record(&mut tx, draft).await?;
        self.store.commit(tx).await?;

        tracing::info!(item_id = %id, "Item deleted");
        Ok(Mutation {
            value: before,
            undo_token,
        })
    }

    // -- bulk mutations --------------------------------------------------------

    /// Move every listed item to `target`, assigning weights in list order.
    pub async fn bulk_move(
        &self,
        ids: &[String],
        target: Status,
    ) -> CoreResult<Mutation<Vec<Item>>> {
        validate_ids(ids)?;

        let mut tx = self.store.begin().await?;
        let before = self.load_aligned(&mut tx, ids).await?;

        let base = self.weights.reserve(ids.len());
        let completed_at = (target == Status::History).then(|| self.clock.now());
        for (offset, id) in (0_i64..).zip(ids) {
            let patch = ItemPatch {
                status: Some(target),
                sort_weight: Some(base + offset),
                completed_at: Some(completed_at),
            };
            if !self.store.update_columns(&mut tx, id, &patch).await? {
                return Err(CoreError::item_not_found(id.as_str()));
            }
        }
        let after = self.load_aligned(&mut tx, ids).await?;

        let action = if target == Status::History {
            ActionKind::BulkComplete
        } else {
            ActionKind::BulkMove
        };
        let draft = OperationDraft::bulk(
            action,
            ids.to_vec(),
            to_snapshots(&before),
            to_snapshots(&after),
        );
        let undo_token = self.recorder.record(&mut tx, draft).await?;
        self.store.commit(tx).await?;

        tracing::info!(count = ids.len(), target = %target, %action, "Items moved");
        Ok(Mutation {
            value: after,
            undo_token,
        })
    }

    pub async fn bulk_complete(&self, ids: &[String]) -> CoreResult<Mutation<Vec<Item>>> {
        self.bulk_move(ids, Status::History).await
    }

    /// Delete every listed item. The returned value is their prior state.
    pub async fn bulk_delete(&self, ids: &[String]) -> CoreResult<Mutation<Vec<Item>>> {
        validate_ids(ids)?;

        let mut tx = self.store.begin().await?;
        let before = self.load_aligned(&mut tx, ids).await?;

        let deleted = self.store.delete_items(&mut tx, ids).await?;
        if deleted != ids.len() as u64 {
            return Err(CoreError::Persistence(format!(
                "expected to delete {} items, deleted {deleted}",
                ids.len()
            )));
        }

        let draft = OperationDraft::bulk(
            ActionKind::BulkDelete,
            ids.to_vec(),
            to_snapshots(&before),
            Vec::new(),
        );
        let undo_token = self.recorder.record(&mut tx, draft).await?;
        self.store.commit(tx).await?;

        tracing::info!(count = ids.len(), "Items deleted");
        Ok(Mutation {
            value: before,
            undo_token,
        })
    }

    /// Give `ordered_ids` strictly increasing weights in the given order.
    ///
    /// `status` names the column being reordered; items keep their own status.
    pub async fn reorder(
        &self,
        status: Status,
        ordered_ids: &[String],
    ) -> CoreResult<Mutation<Vec<Item>>> {
        validate_ids(ordered_ids)?;

        let mut tx = self.store.begin().await?;
        let before = self.load_aligned(&mut tx, ordered_ids).await?;

        let base = self.weights.reserve(ordered_ids.len());
        for (offset, id) in (0_i64..).zip(ordered_ids) {
            let patch = ItemPatch {
                sort_weight: Some(base + offset),
                ..Default::default()
            };
            if !self.store.update_columns(&mut tx, id, &patch).await? {
                return Err(CoreError::item_not_found(id.as_str()));
            }
        }
        let after = self.load_aligned(&mut tx, ordered_ids).await?;

        let draft = OperationDraft::bulk(
            ActionKind::Resort,
            ordered_ids.to_vec(),
            to_snapshots(&before),
            to_snapshots(&after),
        );
        let undo_token = self.recorder.record(&mut tx, draft).await?;
        self.store.commit(tx).await?;

        tracing::info!(count = ordered_ids.len(), status = %status, "Items reordered");
        Ok(Mutation {
            value: after,
            undo_token,
        })
    }

    // -- helpers ---------------------------------------------------------------

    async fn require(&self, tx: &mut S::Tx, id: &str) -> CoreResult<Item> {
        self.store
            .find_item(tx, id)
            .await?
            .ok_or_else(|| CoreError::item_not_found(id))
    }

    /// Load `ids` in the given order; any missing id fails the whole call.
    async fn load_aligned(&self, tx: &mut S::Tx, ids: &[String]) -> CoreResult<Vec<Item>> {
        let mut by_id: HashMap<String, Item> = self
            .store
            .find_items(tx, ids)
            .await?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        ids.iter()
            .map(|id| {
                by_id
                    .remove(id)
                    .ok_or_else(|| CoreError::item_not_found(id.as_str()))
            })
            .collect()
    }

    async fn attach_children(
        &self,
        tx: &mut S::Tx,
        parents: Vec<Item>,
    ) -> CoreResult<Vec<ItemNode>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        let parent_ids: Vec<String> = parents.iter().map(|p| p.id.clone()).collect();
        let mut grouped: HashMap<String, Vec<Item>> = HashMap::new();
        for child in self.store.list_children(tx, &parent_ids).await? {
            if let Some(parent_id) = child.parent_id.clone() {
                grouped.entry(parent_id).or_default().push(child);
            }
        }
        Ok(parents
            .into_iter()
            .map(|item| {
                let children = grouped.remove(&item.id).unwrap_or_default();
                ItemNode { item, children }
            })
            .collect())
    }
}
