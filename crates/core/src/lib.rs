//! Tasklane domain core.
//!
//! Item types, the snapshot codec, the storage ports, the undo engine and
//! the mutation facade. No database or HTTP dependencies; the `db` crate
//! provides the Postgres adapter and [`memory::MemoryStore`] serves tests.

pub mod clock;
pub mod error;
pub mod item;
pub mod memory;
pub mod mutation;
pub mod operation;
pub mod ports;
pub mod snapshot;
pub mod types;
pub mod undo;
