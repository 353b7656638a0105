//! Repository for the `items` table.
//!
//! Soft-deleted rows (`deleted_at IS NOT NULL`) are invisible to every read.

use sqlx::PgConnection;
use tasklane_core::item::{Item, ItemPatch, ListFilter, NewItem, Status};
use tasklane_core::snapshot::Snapshot;

use crate::models::item::ItemRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, uuid, parent_uuid, title, notes, deadline, status, sort_weight, \
    created_at, updated_at, completed_at, deleted_at";

/// Filter shared by the listing and its count.
const LIST_WHERE: &str = "deleted_at IS NULL AND parent_uuid IS NULL \
    AND ($1::text IS NULL OR status = $1) \
    AND ($2::text IS NULL OR title ILIKE $2 OR notes ILIKE $2)";

/// Provides transactional access to items.
pub struct ItemRepo;

impl ItemRepo {
    /// Find a live item by its public id.
    pub async fn find_by_uuid(
        conn: &mut PgConnection,
        uuid: &str,
    ) -> Result<Option<ItemRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM items WHERE uuid = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(uuid)
            .fetch_optional(conn)
            .await
    }

    /// Find every live item whose public id is in `uuids`.
    pub async fn find_by_uuids(
        conn: &mut PgConnection,
        uuids: &[String],
    ) -> Result<Vec<ItemRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM items WHERE uuid = ANY($1) AND deleted_at IS NULL");
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(uuids)
            .fetch_all(conn)
            .await
    }

    /// Live children of the given parents, ordered by weight then insertion.
    pub async fn list_children(
        conn: &mut PgConnection,
        parent_uuids: &[String],
    ) -> Result<Vec<ItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM items \
             WHERE parent_uuid = ANY($1) AND deleted_at IS NULL \
             ORDER BY sort_weight ASC, id ASC"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(parent_uuids)
            .fetch_all(conn)
            .await
    }

    /// Insert a new item, returning the created row.
    pub async fn create(conn: &mut PgConnection, body: &NewItem) -> Result<ItemRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO items \
                (uuid, parent_uuid, title, notes, deadline, status, sort_weight, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(&body.id)
            .bind(&body.parent_id)
            .bind(&body.title)
            .bind(&body.notes)
            .bind(body.deadline)
            .bind(body.status.as_str())
            .bind(body.sort_weight)
            .bind(body.completed_at)
            .fetch_one(conn)
            .await
    }

    /// Overwrite every mutable column of a live item and touch `updated_at`.
    ///
    /// `created_at` is never changed here. Returns `None` when the item does
    /// not exist.
    pub async fn update(conn: &mut PgConnection, item: &Item) -> Result<Option<ItemRow>, sqlx::Error> {
        let query = format!(
            "UPDATE items SET \
                parent_uuid = $2, title = $3, notes = $4, deadline = $5, status = $6, \
                sort_weight = $7, completed_at = $8, updated_at = NOW() \
             WHERE uuid = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(&item.id)
            .bind(&item.parent_id)
            .bind(&item.title)
            .bind(&item.notes)
            .bind(item.deadline)
            .bind(item.status.as_str())
            .bind(item.sort_weight)
            .bind(item.completed_at)
            .fetch_optional(conn)
            .await
    }

    /// Apply a partial update. Absent patch fields leave their column as is.
    ///
    /// Returns `true` if a live row was updated.
    pub async fn update_columns(
        conn: &mut PgConnection,
        uuid: &str,
        patch: &ItemPatch,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE items SET \
                status = COALESCE($2, status), \
                sort_weight = COALESCE($3, sort_weight), \
                completed_at = CASE WHEN $4 THEN $5 ELSE completed_at END, \
                updated_at = NOW() \
             WHERE uuid = $1 AND deleted_at IS NULL",
        )
        .bind(uuid)
        .bind(patch.status.map(Status::as_str))
        .bind(patch.sort_weight)
        .bind(patch.completed_at.is_some())
        .bind(patch.completed_at.flatten())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a live item. Returns `true` if it was live.
    pub async fn soft_delete(conn: &mut PgConnection, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE items SET deleted_at = NOW() WHERE uuid = $1 AND deleted_at IS NULL",
        )
        .bind(uuid)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete every live item in `uuids`, returning how many were hit.
    pub async fn soft_delete_many(
        conn: &mut PgConnection,
        uuids: &[String],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE items SET deleted_at = NOW() WHERE uuid = ANY($1) AND deleted_at IS NULL",
        )
        .bind(uuids)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// One page of live root items matching `filter`.
    pub async fn list(
        conn: &mut PgConnection,
        filter: &ListFilter,
    ) -> Result<Vec<ItemRow>, sqlx::Error> {
        let order_by = match filter.status {
            Some(Status::History) => "completed_at DESC, id ASC",
            Some(_) => "deadline ASC NULLS LAST, sort_weight ASC, id ASC",
            None => "sort_weight ASC, id ASC",
        };
        let query = format!(
            "SELECT {COLUMNS} FROM items WHERE {LIST_WHERE} \
             ORDER BY {order_by} LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ItemRow>(&query)
            .bind(filter.status.map(Status::as_str))
            .bind(keyword_pattern(filter))
            .bind(filter.page_size())
            .bind(filter.offset())
            .fetch_all(conn)
            .await
    }

    /// Number of live root items matching `filter`, ignoring pagination.
    pub async fn count(conn: &mut PgConnection, filter: &ListFilter) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM items WHERE {LIST_WHERE}");
        sqlx::query_scalar::<_, i64>(&query)
            .bind(filter.status.map(Status::as_str))
            .bind(keyword_pattern(filter))
            .fetch_one(conn)
            .await
    }

    /// Insert or fully overwrite the row identified by `snapshot.id`.
    ///
    /// Every column, timestamps included, takes the snapshot's value and a
    /// soft-deleted row is revived.
    pub async fn upsert_snapshot(
        conn: &mut PgConnection,
        snapshot: &Snapshot,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO items \
                (uuid, parent_uuid, title, notes, deadline, status, sort_weight, \
                 created_at, updated_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (uuid) DO UPDATE SET \
                parent_uuid = EXCLUDED.parent_uuid, \
                title = EXCLUDED.title, \
                notes = EXCLUDED.notes, \
                deadline = EXCLUDED.deadline, \
                status = EXCLUDED.status, \
                sort_weight = EXCLUDED.sort_weight, \
                created_at = EXCLUDED.created_at, \
                updated_at = EXCLUDED.updated_at, \
                completed_at = EXCLUDED.completed_at, \
                deleted_at = NULL",
        )
        .bind(&snapshot.id)
        .bind(&snapshot.parent_id)
        .bind(&snapshot.title)
        .bind(&snapshot.notes)
        .bind(snapshot.deadline)
        .bind(snapshot.status.as_str())
        .bind(snapshot.sort_weight)
        .bind(snapshot.created_at)
        .bind(snapshot.updated_at)
        .bind(snapshot.completed_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}

/// `%keyword%` with LIKE metacharacters escaped, or `None` when blank.
fn keyword_pattern(filter: &ListFilter) -> Option<String> {
    filter.keyword().map(|k| {
        let escaped = k
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_pattern_escapes_like_metacharacters() {
        let filter = ListFilter {
            keyword: Some(" 50%_off ".to_string()),
            ..Default::default()
        };
        assert_eq!(keyword_pattern(&filter).as_deref(), Some("%50\\%\\_off%"));
    }

    #[test]
    fn blank_keyword_has_no_pattern() {
        let filter = ListFilter {
            keyword: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(keyword_pattern(&filter), None);
    }
}
