//! Row structs for the `items` and `item_operations` tables.
//!
//! Each submodule maps a `FromRow` entity onto its core domain type. Decode
//! failures surface as persistence errors.

pub mod item;
pub mod operation;
