//! Tasklane API server library.
//!
//! Exposes config, state, error handling and routes so integration tests
//! and the binary entrypoint can both build the router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod state;
