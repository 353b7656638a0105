//! Route definitions for the `/items` resource.

use axum::routing::{get, patch, post};
use axum::Router;
use tasklane_core::ports::Store;

use crate::handlers::items;
use crate::state::AppState;

/// Routes mounted at `/items`.
///
/// ```text
/// GET    /                  -> list_items (?status=&keyword=&page=&page_size=)
/// POST   /                  -> create_item
/// POST   /bulk/move         -> bulk_move
/// POST   /bulk/complete     -> bulk_complete
/// POST   /bulk/delete       -> bulk_delete
/// POST   /order             -> reorder
/// GET    /{id}              -> get_item
/// PATCH  /{id}              -> update_item
/// DELETE /{id}              -> delete_item
/// PATCH  /{id}/status       -> change_status
/// POST   /{id}/complete     -> complete_item
/// ```
pub fn router<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/",
            get(items::list_items::<S>).post(items::create_item::<S>),
        )
        .route("/bulk/move", post(items::bulk_move::<S>))
        .route("/bulk/complete", post(items::bulk_complete::<S>))
        .route("/bulk/delete", post(items::bulk_delete::<S>))
        .route("/order", post(items::reorder::<S>))
        .route(
            "/{id}",
            get(items::get_item::<S>)
                .patch(items::update_item::<S>)
                .delete(items::delete_item::<S>),
        )
        .route("/{id}/status", patch(items::change_status::<S>))
        .route("/{id}/complete", post(items::complete_item::<S>))
}
