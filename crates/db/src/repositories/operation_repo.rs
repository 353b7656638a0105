//! Repository for the `item_operations` table.

use sqlx::types::Json;
use sqlx::PgConnection;
use tasklane_core::operation::OperationEntry;
use tasklane_core::types::Timestamp;

use crate::models::operation::OperationRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, token, action, scope, item_ids, before_state, after_state, \
    expires_at, consumed_at, created_at, updated_at";

/// Provides transactional access to the operation log.
pub struct OperationRepo;

impl OperationRepo {
    /// Append an entry. A duplicate token violates `uq_item_operations_token`.
    pub async fn create(conn: &mut PgConnection, entry: &OperationEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO item_operations \
                (token, action, scope, item_ids, before_state, after_state, \
                 expires_at, consumed_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)",
        )
        .bind(entry.token.as_str())
        .bind(entry.action.as_str())
        .bind(entry.scope.as_str())
        .bind(Json(&entry.item_ids))
        .bind(Json(&entry.before))
        .bind(Json(&entry.after))
        .bind(entry.expires_at)
        .bind(entry.consumed_at)
        .bind(entry.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Find an entry by token.
    pub async fn find_by_token(
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<OperationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM item_operations WHERE token = $1");
        sqlx::query_as::<_, OperationRow>(&query)
            .bind(token)
            .fetch_optional(conn)
            .await
    }

    /// Set `consumed_at` only if it is still null.
    ///
    /// A concurrent transaction holding the row blocks this statement; once
    /// it commits the predicate is re-checked and no row matches.
    pub async fn mark_consumed(
        conn: &mut PgConnection,
        token: &str,
        at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE item_operations SET consumed_at = $2, updated_at = $2 \
             WHERE token = $1 AND consumed_at IS NULL",
        )
        .bind(token)
        .bind(at)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
