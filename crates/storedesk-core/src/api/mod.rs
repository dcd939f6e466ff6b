//! REST API client for the back-office backend.
//!
//! This module provides the `ApiClient` for talking to the catalog and staff
//! API. Requests carry a JWT bearer token from the shared `SessionManager`;
//! an expired token is refreshed through `/employees/auth/refresh-token` and
//! the failed request replayed once.

pub mod client;
pub mod error;
mod refresh;
pub mod request;

pub use client::{ApiClient, ApiClientConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use request::{Attempt, RequestDescriptor};
