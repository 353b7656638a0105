//! Handler for redeeming undo tokens.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tasklane_core::operation::UndoToken;
use tasklane_core::ports::Store;

use crate::error::{AppError, AppResult};
use crate::response::UndoableResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UndoRequest {
    pub token: String,
}

/// Ids touched by a redemption.
#[derive(Debug, Serialize)]
pub struct UndoResult {
    pub affected_ids: Vec<String>,
}

/// POST /api/v1/undo
///
/// Reverse the operation behind `token`. The returned `undo_token` redoes it.
pub async fn redeem<S: Store>(
    State(state): State<AppState<S>>,
    Json(body): Json<UndoRequest>,
) -> AppResult<Json<UndoableResponse<UndoResult>>> {
    let token = body.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token must not be empty".to_string()));
    }

    let redemption = state.undo.redeem(&UndoToken::new(token)).await?;
    Ok(Json(UndoableResponse {
        data: UndoResult {
            affected_ids: redemption.item_ids,
        },
        undo_token: redemption.token.into_inner(),
    }))
}
