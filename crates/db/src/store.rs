//! [`PgStore`]: the Postgres implementation of the core storage ports.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tasklane_core::error::{CoreError, CoreResult};
use tasklane_core::item::{Item, ItemPatch, ListFilter, NewItem};
use tasklane_core::operation::{OperationEntry, UndoToken};
use tasklane_core::ports::{ItemStore, OperationLog, Transactional};
use tasklane_core::snapshot::{snapshot_ids, Snapshot};
use tasklane_core::types::Timestamp;

use crate::models::item::into_items;
use crate::repositories::{ItemRepo, OperationRepo};
use crate::DbPool;

/// Postgres-backed item store and operation log sharing one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Log a database failure and hide its details behind a persistence error.
fn db_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Persistence(err.to_string())
}

#[async_trait]
impl Transactional for PgStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> CoreResult<Self::Tx> {
        self.pool.begin().await.map_err(db_error)
    }

    async fn commit(&self, tx: Self::Tx) -> CoreResult<()> {
        tx.commit().await.map_err(db_error)
    }

    async fn ping(&self) -> CoreResult<()> {
        crate::health_check(&self.pool).await.map_err(db_error)
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn find_item(&self, tx: &mut Self::Tx, id: &str) -> CoreResult<Option<Item>> {
        ItemRepo::find_by_uuid(&mut **tx, id)
            .await
            .map_err(db_error)?
            .map(|row| row.into_item())
            .transpose()
    }

    async fn find_items(&self, tx: &mut Self::Tx, ids: &[String]) -> CoreResult<Vec<Item>> {
        let rows = ItemRepo::find_by_uuids(&mut **tx, ids)
            .await
            .map_err(db_error)?;
        into_items(rows)
    }

    async fn list_children(
        &self,
        tx: &mut Self::Tx,
        parent_ids: &[String],
    ) -> CoreResult<Vec<Item>> {
        let rows = ItemRepo::list_children(&mut **tx, parent_ids)
            .await
            .map_err(db_error)?;
        into_items(rows)
    }

    async fn insert_item(&self, tx: &mut Self::Tx, item: &NewItem) -> CoreResult<Item> {
        ItemRepo::create(&mut **tx, item)
            .await
            .map_err(db_error)?
            .into_item()
    }

    async fn update_item(&self, tx: &mut Self::Tx, item: &Item) -> CoreResult<Option<Item>> {
        ItemRepo::update(&mut **tx, item)
            .await
            .map_err(db_error)?
            .map(|row| row.into_item())
            .transpose()
    }

    async fn update_columns(
        &self,
        tx: &mut Self::Tx,
        id: &str,
        patch: &ItemPatch,
    ) -> CoreResult<bool> {
        ItemRepo::update_columns(&mut **tx, id, patch)
            .await
            .map_err(db_error)
    }

    async fn delete_item(&self, tx: &mut Self::Tx, id: &str) -> CoreResult<bool> {
        ItemRepo::soft_delete(&mut **tx, id).await.map_err(db_error)
    }

    async fn delete_items(&self, tx: &mut Self::Tx, ids: &[String]) -> CoreResult<u64> {
        ItemRepo::soft_delete_many(&mut **tx, ids)
            .await
            .map_err(db_error)
    }

    async fn list_items(
        &self,
        tx: &mut Self::Tx,
        filter: &ListFilter,
    ) -> CoreResult<(Vec<Item>, i64)> {
        let total = ItemRepo::count(&mut **tx, filter).await.map_err(db_error)?;
        let rows = ItemRepo::list(&mut **tx, filter).await.map_err(db_error)?;
        Ok((into_items(rows)?, total))
    }

    async fn replace_snapshots(
        &self,
        tx: &mut Self::Tx,
        snapshots: &[Snapshot],
    ) -> CoreResult<()> {
        for snapshot in snapshots {
            ItemRepo::upsert_snapshot(&mut **tx, snapshot)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }

    async fn delete_by_snapshots(
        &self,
        tx: &mut Self::Tx,
        snapshots: &[Snapshot],
    ) -> CoreResult<u64> {
        if snapshots.is_empty() {
            return Ok(0);
        }
        ItemRepo::soft_delete_many(&mut **tx, &snapshot_ids(snapshots))
            .await
            .map_err(db_error)
    }
}

#[async_trait]
impl OperationLog for PgStore {
    async fn insert_operation(&self, tx: &mut Self::Tx, entry: &OperationEntry) -> CoreResult<()> {
        OperationRepo::create(&mut **tx, entry)
            .await
            .map_err(db_error)
    }

    async fn find_operation(
        &self,
        tx: &mut Self::Tx,
        token: &UndoToken,
    ) -> CoreResult<Option<OperationEntry>> {
        OperationRepo::find_by_token(&mut **tx, token.as_str())
            .await
            .map_err(db_error)?
            .map(|row| row.into_entry())
            .transpose()
    }

    async fn mark_consumed(
        &self,
        tx: &mut Self::Tx,
        token: &UndoToken,
        at: Timestamp,
    ) -> CoreResult<u64> {
        OperationRepo::mark_consumed(&mut **tx, token.as_str(), at)
            .await
            .map_err(db_error)
    }
}
