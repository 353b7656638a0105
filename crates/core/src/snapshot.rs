//! Point-in-time item copies used for undo capture and replay.
//!
//! Conversion is total in both directions and performs no validation: a
//! snapshot is only ever produced from a row the store just returned.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::item::{Item, Status};
use crate::types::Timestamp;

/// Immutable copy of every mutable attribute of an [`Item`].
///
/// The field set mirrors [`Item`] one-to-one so a replay can overwrite every
/// column, including the store-assigned timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Status,
    pub sort_weight: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Capture the full state of `item`.
pub fn to_snapshot(item: &Item) -> Snapshot {
    Snapshot {
        id: item.id.clone(),
        parent_id: item.parent_id.clone(),
        title: item.title.clone(),
        notes: item.notes.clone(),
        deadline: item.deadline,
        status: item.status,
        sort_weight: item.sort_weight,
        created_at: item.created_at,
        updated_at: item.updated_at,
        completed_at: item.completed_at,
    }
}

/// Rebuild the full row described by `snapshot`.
pub fn from_snapshot(snapshot: &Snapshot) -> Item {
    Item {
        id: snapshot.id.clone(),
        parent_id: snapshot.parent_id.clone(),
        title: snapshot.title.clone(),
        notes: snapshot.notes.clone(),
        deadline: snapshot.deadline,
        status: snapshot.status,
        sort_weight: snapshot.sort_weight,
        created_at: snapshot.created_at,
        updated_at: snapshot.updated_at,
        completed_at: snapshot.completed_at,
    }
}

/// Capture a list of items, preserving order.
pub fn to_snapshots(items: &[Item]) -> Vec<Snapshot> {
    items.iter().map(to_snapshot).collect()
}

/// Ids of the given snapshots, in order.
pub fn snapshot_ids(snapshots: &[Snapshot]) -> Vec<String> {
    snapshots.iter().map(|s| s.id.clone()).collect()
}

impl From<&Item> for Snapshot {
    fn from(item: &Item) -> Self {
        to_snapshot(item)
    }
}

impl From<&Snapshot> for Item {
    fn from(snapshot: &Snapshot) -> Self {
        from_snapshot(snapshot)
    }
}
