//! In-process [`Store`](crate::ports::Store) used by tests and local runs
//! without a database.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! private copy of the state; commit writes the copy back, dropping it
//! discards every change.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::item::{Item, ItemPatch, ListFilter, NewItem, Status};
use crate::operation::{OperationEntry, UndoToken};
use crate::ports::{ItemStore, OperationLog, Transactional};
use crate::snapshot::{from_snapshot, Snapshot};
use crate::types::Timestamp;

#[derive(Debug, Clone)]
struct StoredItem {
    item: Item,
    /// Insertion sequence, used to break weight ties.
    seq: u64,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    items: HashMap<String, StoredItem>,
    operations: HashMap<String, OperationEntry>,
    next_seq: u64,
}

impl MemoryState {
    fn put(&mut self, item: Item) {
        let seq = match self.items.get(&item.id) {
            Some(existing) => existing.seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        self.items.insert(item.id.clone(), StoredItem { item, seq });
    }

    fn sorted(&self, mut rows: Vec<&StoredItem>, status: Option<Status>) -> Vec<Item> {
        rows.sort_by(|a, b| compare_rows(a, b, status));
        rows.into_iter().map(|r| r.item.clone()).collect()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }

    /// Number of live items, outside any transaction.
    pub async fn item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Number of operation log entries, outside any transaction.
    pub async fn operation_count(&self) -> usize {
        self.state.lock().await.operations.len()
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> CoreResult<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn commit(&self, tx: MemoryTx) -> CoreResult<()> {
        let MemoryTx { mut guard, working } = tx;
        *guard = working;
        Ok(())
    }

    async fn ping(&self) -> CoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn find_item(&self, tx: &mut MemoryTx, id: &str) -> CoreResult<Option<Item>> {
        Ok(tx.working.items.get(id).map(|r| r.item.clone()))
    }

    async fn find_items(&self, tx: &mut MemoryTx, ids: &[String]) -> CoreResult<Vec<Item>> {
        Ok(ids
            .iter()
            .filter_map(|id| tx.working.items.get(id).map(|r| r.item.clone()))
            .collect())
    }

    async fn list_children(
        &self,
        tx: &mut MemoryTx,
        parent_ids: &[String],
    ) -> CoreResult<Vec<Item>> {
        let rows = tx
            .working
            .items
            .values()
            .filter(|r| {
                r.item
                    .parent_id
                    .as_ref()
                    .is_some_and(|p| parent_ids.contains(p))
            })
            .collect();
        Ok(tx.working.sorted(rows, None))
    }

    async fn insert_item(&self, tx: &mut MemoryTx, new: &NewItem) -> CoreResult<Item> {
        if tx.working.items.contains_key(&new.id) {
            return Err(CoreError::Persistence(format!(
                "duplicate item id '{}'",
                new.id
            )));
        }
        let now = self.clock.now();
        let item = Item {
            id: new.id.clone(),
            parent_id: new.parent_id.clone(),
            title: new.title.clone(),
            notes: new.notes.clone(),
            deadline: new.deadline,
            status: new.status,
            sort_weight: new.sort_weight,
            created_at: now,
            updated_at: now,
            completed_at: new.completed_at,
        };
        tx.working.put(item.clone());
        Ok(item)
    }

    async fn update_item(&self, tx: &mut MemoryTx, item: &Item) -> CoreResult<Option<Item>> {
        let now = self.clock.now();
        let Some(row) = tx.working.items.get_mut(&item.id) else {
            return Ok(None);
        };
        let created_at = row.item.created_at;
        row.item = Item {
            created_at,
            updated_at: now,
            ..item.clone()
        };
        Ok(Some(row.item.clone()))
    }

    async fn update_columns(
        &self,
        tx: &mut MemoryTx,
        id: &str,
        patch: &ItemPatch,
    ) -> CoreResult<bool> {
        let now = self.clock.now();
        let Some(row) = tx.working.items.get_mut(id) else {
            return Ok(false);
        };
        if let Some(status) = patch.status {
            row.item.status = status;
        }
        if let Some(weight) = patch.sort_weight {
            row.item.sort_weight = weight;
        }
        if let Some(completed_at) = patch.completed_at {
            row.item.completed_at = completed_at;
        }
        row.item.updated_at = now;
        Ok(true)
    }

    async fn delete_item(&self, tx: &mut MemoryTx, id: &str) -> CoreResult<bool> {
        Ok(tx.working.items.remove(id).is_some())
    }

    async fn delete_items(&self, tx: &mut MemoryTx, ids: &[String]) -> CoreResult<u64> {
        Ok(ids
            .iter()
            .filter(|id| tx.working.items.remove(id.as_str()).is_some())
            .count() as u64)
    }

    async fn list_items(
        &self,
        tx: &mut MemoryTx,
        filter: &ListFilter,
    ) -> CoreResult<(Vec<Item>, i64)> {
        let keyword = filter.keyword().map(str::to_lowercase);
        let rows: Vec<&StoredItem> = tx
            .working
            .items
            .values()
            .filter(|r| r.item.parent_id.is_none())
            .filter(|r| filter.status.map_or(true, |s| r.item.status == s))
            .filter(|r| match &keyword {
                Some(k) => matches_keyword(&r.item, k),
                None => true,
            })
            .collect();
        let total = rows.len() as i64;
        let sorted = tx.working.sorted(rows, filter.status);
        let page = sorted
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.page_size()).unwrap_or(0))
            .collect();
        Ok((page, total))
    }

    async fn replace_snapshots(
        &self,
        tx: &mut MemoryTx,
        snapshots: &[Snapshot],
    ) -> CoreResult<()> {
        for snapshot in snapshots {
            tx.working.put(from_snapshot(snapshot));
        }
        Ok(())
    }

    async fn delete_by_snapshots(
        &self,
        tx: &mut MemoryTx,
        snapshots: &[Snapshot],
    ) -> CoreResult<u64> {
        Ok(snapshots
            .iter()
            .filter(|s| tx.working.items.remove(&s.id).is_some())
            .count() as u64)
    }
}

#[async_trait]
impl OperationLog for MemoryStore {
    async fn insert_operation(&self, tx: &mut MemoryTx, entry: &OperationEntry) -> CoreResult<()> {
        let key = entry.token.as_str().to_string();
        if tx.working.operations.contains_key(&key) {
            return Err(CoreError::Persistence("duplicate undo token".to_string()));
        }
        tx.working.operations.insert(key, entry.clone());
        Ok(())
    }

    async fn find_operation(
        &self,
        tx: &mut MemoryTx,
        token: &UndoToken,
    ) -> CoreResult<Option<OperationEntry>> {
        Ok(tx.working.operations.get(token.as_str()).cloned())
    }

    async fn mark_consumed(
        &self,
        tx: &mut MemoryTx,
        token: &UndoToken,
        at: Timestamp,
    ) -> CoreResult<u64> {
        match tx.working.operations.get_mut(token.as_str()) {
            Some(entry) if entry.consumed_at.is_none() => {
                entry.consumed_at = Some(at);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

fn matches_keyword(item: &Item, keyword: &str) -> bool {
    item.title.to_lowercase().contains(keyword)
        || item
            .notes
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(keyword))
}

/// Listing order: history by completion time (newest first), other status
/// filters by deadline (nulls last) then weight, unfiltered by weight.
fn compare_rows(a: &StoredItem, b: &StoredItem, status: Option<Status>) -> Ordering {
    let by_weight = || {
        a.item
            .sort_weight
            .cmp(&b.item.sort_weight)
            .then(a.seq.cmp(&b.seq))
    };
    match status {
        Some(Status::History) => b
            .item
            .completed_at
            .cmp(&a.item.completed_at)
            .then(a.seq.cmp(&b.seq)),
        Some(_) => match (a.item.deadline, b.item.deadline) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(by_weight),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => by_weight(),
        },
        None => by_weight(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn store() -> MemoryStore {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        MemoryStore::new(Arc::new(clock))
    }

    fn new_item(id: &str, status: Status, weight: i64) -> NewItem {
        NewItem {
            id: id.to_string(),
            parent_id: None,
            title: format!("title {id}"),
            notes: None,
            deadline: None,
            status,
            sort_weight: weight,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = store();
        {
            let mut tx = store.begin().await.unwrap();
            store
                .insert_item(&mut tx, &new_item("a", Status::Now, 1))
                .await
                .unwrap();
        }
        assert_eq!(store.item_count().await, 0);

        let mut tx = store.begin().await.unwrap();
        store
            .insert_item(&mut tx, &new_item("a", Status::Now, 1))
            .await
            .unwrap();
        store.commit(tx).await.unwrap();
        assert_eq!(store.item_count().await, 1);
    }

    #[tokio::test]
    async fn unfiltered_listing_orders_by_weight_then_insertion() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        for (id, weight) in [("c", 5), ("a", 1), ("b", 5)] {
            store
                .insert_item(&mut tx, &new_item(id, Status::Now, weight))
                .await
                .unwrap();
        }
        let (items, total) = store
            .list_items(&mut tx, &ListFilter::default())
            .await
            .unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn status_listing_puts_missing_deadlines_last() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        let mut dated = new_item("dated", Status::Now, 9);
        dated.deadline = NaiveDate::from_ymd_opt(2026, 2, 1);
        store.insert_item(&mut tx, &dated).await.unwrap();
        store
            .insert_item(&mut tx, &new_item("undated", Status::Now, 1))
            .await
            .unwrap();

        let filter = ListFilter {
            status: Some(Status::Now),
            ..Default::default()
        };
        let (items, _) = store.list_items(&mut tx, &filter).await.unwrap();
        assert_eq!(items[0].id, "dated");
        assert_eq!(items[1].id, "undated");
    }

    #[tokio::test]
    async fn keyword_matches_title_or_notes_case_insensitively() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        let mut noted = new_item("noted", Status::Future, 1);
        noted.notes = Some("Remember the MILK".to_string());
        store.insert_item(&mut tx, &noted).await.unwrap();
        store
            .insert_item(&mut tx, &new_item("other", Status::Future, 2))
            .await
            .unwrap();

        let filter = ListFilter {
            keyword: Some("milk".to_string()),
            ..Default::default()
        };
        let (items, total) = store.list_items(&mut tx, &filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, "noted");
    }

    #[tokio::test]
    async fn mark_consumed_only_once() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        let now = Utc::now();
        let entry = OperationEntry {
            token: UndoToken::new("t"),
            action: crate::operation::ActionKind::Update,
            scope: crate::operation::Scope::Single,
            item_ids: vec!["a".to_string()],
            before: vec![],
            after: vec![],
            created_at: now,
            expires_at: now,
            consumed_at: None,
        };
        store.insert_operation(&mut tx, &entry).await.unwrap();
        assert_eq!(store.mark_consumed(&mut tx, &entry.token, now).await.unwrap(), 1);
        assert_eq!(store.mark_consumed(&mut tx, &entry.token, now).await.unwrap(), 0);
        assert!(store.insert_operation(&mut tx, &entry).await.is_err());
    }
}
