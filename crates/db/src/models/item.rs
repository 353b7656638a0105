//! Item row model.
//!
//! Maps to the `items` table. `uuid` carries the public item id; the
//! BIGSERIAL `id` stays inside this crate.

use chrono::NaiveDate;
use sqlx::FromRow;
use tasklane_core::error::{CoreError, CoreResult};
use tasklane_core::item::Item;
use tasklane_core::types::{DbId, Timestamp};

/// A row from the `items` table.
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: DbId,
    pub uuid: String,
    pub parent_uuid: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: String,
    pub sort_weight: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
}

impl ItemRow {
    pub fn into_item(self) -> CoreResult<Item> {
        let status = self.status.parse().map_err(|_| {
            CoreError::Persistence(format!(
                "item {} has unknown status '{}'",
                self.uuid, self.status
            ))
        })?;
        Ok(Item {
            id: self.uuid,
            parent_id: self.parent_uuid,
            title: self.title,
            notes: self.notes,
            deadline: self.deadline,
            status,
            sort_weight: self.sort_weight,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}

/// Convert a batch of rows, failing on the first undecodable one.
pub fn into_items(rows: Vec<ItemRow>) -> CoreResult<Vec<Item>> {
    rows.into_iter().map(ItemRow::into_item).collect()
}
