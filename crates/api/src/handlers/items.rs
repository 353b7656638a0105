//! Handlers for the `/items` resource.
//!
//! Every mutating handler returns the resulting state plus the undo token
//! issued for it. Handlers are generic over the storage backend.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tasklane_core::error::CoreResult;
use tasklane_core::item::{parse_deadline, parse_timestamp, Item, ItemNode, ItemPage, Status};
use tasklane_core::mutation::{CreateItem, ItemChanges, StatusChange};
use tasklane_core::ports::Store;
use tasklane_core::types::Timestamp;

use crate::error::{AppError, AppResult};
use crate::query::ListParams;
use crate::response::{DataResponse, UndoableResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub notes: Option<String>,
    /// `YYYY-MM-DD`; empty means no deadline.
    pub deadline: Option<String>,
    pub status: Option<String>,
    pub sort_weight: Option<i64>,
    pub parent_id: Option<String>,
}

/// Field edits. An absent field is left unchanged; `null` clears a
/// nullable field.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    pub sort_weight: Option<i64>,
    /// RFC 3339; only used when moving to history.
    pub completed_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    pub completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkMoveRequest {
    pub ids: Vec<String>,
    pub target_status: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkIdsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub status: String,
    pub ordered_ids: Vec<String>,
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/items
///
/// Root items with their children, filtered and paginated.
pub async fn list_items<S: Store>(
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<ItemPage>>> {
    let filter = params.into_filter()?;
    let page = state.items.list(&filter).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/items/{id}
pub async fn get_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<ItemNode>>> {
    let node = state.items.get(&id).await?;
    Ok(Json(DataResponse { data: node }))
}

// ---------------------------------------------------------------------------
// Single-item mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/items
pub async fn create_item<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<UndoableResponse<Item>>)> {
    let input = CreateItem {
        title: body.title,
        notes: body.notes,
        deadline: optional_deadline(body.deadline.as_deref())?,
        status: body.status.as_deref().map(str::parse::<Status>).transpose()?,
        sort_weight: body.sort_weight,
        parent_id: body.parent_id.filter(|p| !p.trim().is_empty()),
    };
    let created = state.items.create(input).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// PATCH /api/v1/items/{id}
pub async fn update_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateItemRequest>,
) -> AppResult<Json<UndoableResponse<Item>>> {
    let changes = ItemChanges {
        title: body.title,
        notes: body.notes,
        deadline: body
            .deadline
            .map(|d| optional_deadline(d.as_deref()))
            .transpose()?,
    };
    let updated = state.items.update(&id, changes).await?;
    Ok(Json(updated.into()))
}

/// PATCH /api/v1/items/{id}/status
pub async fn change_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    Json(body): Json<StatusChangeRequest>,
) -> AppResult<Json<UndoableResponse<Item>>> {
    let change = StatusChange {
        status: body.status.parse()?,
        sort_weight: body.sort_weight,
        completed_at: optional_timestamp(body.completed_at.as_deref())?,
    };
    let changed = state.items.change_status(&id, change).await?;
    Ok(Json(changed.into()))
}

/// POST /api/v1/items/{id}/complete
///
/// The body is optional; `{"completed_at": "..."}` backdates the completion.
pub async fn complete_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<UndoableResponse<Item>>> {
    let request: CompleteRequest = if body.is_empty() {
        CompleteRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))?
    };
    let completed_at = optional_timestamp(request.completed_at.as_deref())?;
    let completed = state.items.complete(&id, completed_at).await?;
    Ok(Json(completed.into()))
}

/// DELETE /api/v1/items/{id}
///
/// Returns the state the item had before deletion.
pub async fn delete_item<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> AppResult<Json<UndoableResponse<Item>>> {
    let deleted = state.items.delete(&id).await?;
    Ok(Json(deleted.into()))
}

// ---------------------------------------------------------------------------
// Bulk mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/items/bulk/move
pub async fn bulk_move<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<BulkMoveRequest>,
) -> AppResult<Json<UndoableResponse<Vec<Item>>>> {
    let target: Status = body.target_status.parse()?;
    let moved = state.items.bulk_move(&body.ids, target).await?;
    Ok(Json(moved.into()))
}

/// POST /api/v1/items/bulk/complete
pub async fn bulk_complete<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<BulkIdsRequest>,
) -> AppResult<Json<UndoableResponse<Vec<Item>>>> {
    let completed = state.items.bulk_complete(&body.ids).await?;
    Ok(Json(completed.into()))
}

/// POST /api/v1/items/bulk/delete
pub async fn bulk_delete<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<BulkIdsRequest>,
) -> AppResult<Json<UndoableResponse<Vec<Item>>>> {
    let deleted = state.items.bulk_delete(&body.ids).await?;
    Ok(Json(deleted.into()))
}

/// POST /api/v1/items/order
pub async fn reorder<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<ReorderRequest>,
) -> AppResult<Json<UndoableResponse<Vec<Item>>>> {
    let status: Status = body.status.parse()?;
    let reordered = state.items.reorder(status, &body.ordered_ids).await?;
    Ok(Json(reordered.into()))
}

// ── Private helpers ──────────────────────────────────────────────────────

fn optional_deadline(raw: Option<&str>) -> CoreResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_deadline(value).map(Some),
    }
}

fn optional_timestamp(raw: Option<&str>) -> CoreResult<Option<Timestamp>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let absent: UpdateItemRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.notes, None);
        assert_eq!(absent.deadline, None);

        let cleared: UpdateItemRequest =
            serde_json::from_str(r#"{"notes":null,"deadline":null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));
        assert_eq!(cleared.deadline, Some(None));

        let set: UpdateItemRequest = serde_json::from_str(r#"{"notes":"n"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("n".to_string())));
    }

    #[test]
    fn blank_deadline_means_none() {
        assert_eq!(optional_deadline(Some("")).unwrap(), None);
        assert_eq!(optional_deadline(None).unwrap(), None);
        assert!(optional_deadline(Some("tomorrow")).is_err());
        assert_eq!(
            optional_deadline(Some("2026-05-01")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 1)
        );
    }
}
