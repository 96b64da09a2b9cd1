//! HTTP delivery layer for the prize draw engine.
//!
//! The binary in `main.rs` wires configuration, logging and the
//! `SQLite` store together; this library holds the routes so they can be
//! exercised without a running server.

pub mod error;
pub mod http;
pub mod state;

pub use error::ApiError;
pub use http::router;
pub use state::AppState;
