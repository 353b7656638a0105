//! Route definitions for undo redemption.

use axum::routing::post;
use axum::Router;
use tasklane_core::ports::Store;

use crate::handlers::undo;
use crate::state::AppState;

/// Routes mounted at `/undo`.
///
/// ```text
/// POST /   -> redeem
/// ```
pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/", post(undo::redeem::<S>))
}
