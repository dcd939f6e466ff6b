//! storedesk-core - shared library for the storedesk back-office console.
//!
//! This crate contains everything except the command line front end:
//! - API client with bearer authentication and one-shot token refresh
//! - Per-entity resource facades (products, orders, brands, ...)
//! - Session storage (memory, JSON file, keyring-backed encrypted file)
//! - Master-detail screen controller
//! - Configuration and text formatting helpers

pub mod api;
pub mod auth;
pub mod config;
pub mod console;
pub mod models;
pub mod resources;
pub mod utils;

pub use api::{ApiClient, ApiClientConfig, ApiError, Attempt, RequestDescriptor};
pub use auth::{CredentialStore, Session, SessionManager, SessionStorage};
pub use config::{Config, SessionBackend};
pub use console::{EditOutcome, MasterDetail, Notice, View};
pub use models::{ApiEnvelope, AuditLogEntry, ListQuery, OrderStatus, Record, RecordId};
pub use resources::{Entity, Orders, Resource};
