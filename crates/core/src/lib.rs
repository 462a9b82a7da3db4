//! `stockroom-core`: shared building blocks for the product store.
//!
//! This crate contains **pure** primitives (no IO, no storage, no async).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use id::ProductId;
