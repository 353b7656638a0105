//! Shared response envelope types for API handlers.
//!
//! Reads use a `{ "data": ... }` envelope. Mutations add the token that
//! reverses them: `{ "data": ..., "undo_token": "..." }`.

use serde::Serialize;
use tasklane_core::mutation::Mutation;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": T, "undo_token": "..." }` envelope for reversible operations.
#[derive(Debug, Serialize)]
pub struct UndoableResponse<T: Serialize> {
    pub data: T,
    pub undo_token: String,
}

impl<T: Serialize> From<Mutation<T>> for UndoableResponse<T> {
    fn from(mutation: Mutation<T>) -> Self {
        Self {
            data: mutation.value,
            undo_token: mutation.undo_token.into_inner(),
        }
    }
}
