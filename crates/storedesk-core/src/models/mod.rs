//! Data models for back-office entities.
//!
//! Entities are permissive JSON documents; only the pieces the client itself
//! interprets get types:
//!
//! - `Record`, `RecordId`: any entity document and its identifier
//! - `ApiEnvelope`: the `{ success, data, message }` response body
//! - `AuditLogEntry`: audit trail rows
//! - `OrderStatus`: order fulfilment states
//! - `ListQuery`: search and filter parameters for list endpoints

pub mod audit;
pub mod envelope;
pub mod order;
pub mod query;
pub mod record;

pub use audit::AuditLogEntry;
pub use envelope::ApiEnvelope;
pub use order::OrderStatus;
pub(crate) use order::StatusChange;
pub use query::ListQuery;
pub use record::{Record, RecordId};
