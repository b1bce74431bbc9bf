//! Tag registry service.
//!
//! Mints physical tag ids, resolves scanned labels to their devicehub and
//! enforces the write-once link between a tag and the inventory that owns
//! it. See the crate's `migrations/` for the storage shape.

pub mod api;
pub mod config;
pub mod db;
pub mod resolve;
pub mod snapshot;
pub mod state;
