//! Per-entity facades over the API client.
//!
//! `ApiClient::products()`, `ApiClient::orders()` and friends return a
//! `Resource` bound to one collection; `ApiClient::resource(entity)` does the
//! same for an entity chosen at runtime.

pub mod entity;
pub mod facade;

pub use entity::Entity;
pub use facade::{Orders, Resource};
