//! Axum handlers, one module per resource.

pub mod items;
pub mod undo;
