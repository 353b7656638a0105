//! Repository layer.
//!
//! Each repository is a zero-sized struct whose async methods accept the
//! caller's `&mut PgConnection`, so every statement runs inside the
//! transaction the store adapter opened.

pub mod item_repo;
pub mod operation_repo;

pub use item_repo::ItemRepo;
pub use operation_repo::OperationRepo;
