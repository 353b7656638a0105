pub mod health;
pub mod items;
pub mod undo;

use axum::Router;
use tasklane_core::ports::Store;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /items                       list (GET), create (POST)
/// /items/{id}                  get, update (PATCH), delete
/// /items/{id}/status           status change (PATCH)
/// /items/{id}/complete         complete (POST)
/// /items/bulk/move             bulk move (POST)
/// /items/bulk/complete         bulk complete (POST)
/// /items/bulk/delete           bulk delete (POST)
/// /items/order                 reorder (POST)
///
/// /undo                        redeem an undo token (POST)
/// ```
pub fn api_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .nest("/items", items::router::<S>())
        .nest("/undo", undo::router::<S>())
}
