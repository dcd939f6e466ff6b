//! Authentication state: the session record and where it is kept.
//!
//! This module provides:
//! - `Session`: access token, refresh token and employee profile
//! - `SessionManager`: the credential store shared with the API client
//! - `SessionStorage` backends: in-memory, JSON file, encrypted file
//! - `CredentialStore`: OS keychain access via keyring

pub mod credentials;
pub mod session;
pub mod storage;
pub mod vault;

pub use credentials::CredentialStore;
pub use session::{Session, SessionManager};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use vault::EncryptedFileStorage;
