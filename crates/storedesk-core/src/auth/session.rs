use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::storage::{MemoryStorage, SessionStorage, StorageError};
use crate::models::Record;

/// An authenticated back-office session.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Everything else the login endpoint returned about the employee
    #[serde(default)]
    pub profile: Record,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("profile", &self.profile)
            .field("created_at", &self.created_at)
            .field("refreshed_at", &self.refreshed_at)
            .finish()
    }
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            profile: Record::new(),
            created_at: Utc::now(),
            refreshed_at: None,
        }
    }

    /// Build a session from the `data` object of a login response.
    ///
    /// The access token arrives as `token` (or `accessToken`), the refresh
    /// token as `refreshToken`; the remaining fields form the profile.
    /// `fallback_refresh` fills in a missing refresh token.
    pub fn from_login_payload(payload: Value, fallback_refresh: Option<&str>) -> Option<Self> {
        let mut profile = Record::from_value(payload)?;

        let access_token = take_string(&mut profile, "token")
            .or_else(|| take_string(&mut profile, "accessToken"))?;
        let refresh_token = take_string(&mut profile, "refreshToken")
            .or_else(|| fallback_refresh.map(str::to_string))?;

        Some(Self {
            access_token,
            refresh_token,
            profile,
            created_at: Utc::now(),
            refreshed_at: None,
        })
    }

    /// Display name for the logged-in employee
    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .str_field("name")
            .or_else(|| self.profile.str_field("fullName"))
            .or_else(|| self.profile.str_field("phone"))
    }
}

fn take_string(record: &mut Record, key: &str) -> Option<String> {
    match record.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Owner of the current session.
///
/// Keeps the session in memory for the per-request reads and writes every
/// change through to the configured storage. Shared between clones of the
/// API client through an `Arc`.
pub struct SessionManager {
    storage: Box<dyn SessionStorage>,
    current: RwLock<Option<Session>>,
}

impl SessionManager {
    pub fn new(storage: Box<dyn SessionStorage>) -> Self {
        Self {
            storage,
            current: RwLock::new(None),
        }
    }

    /// A manager that never touches disk
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::default()))
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Restore a persisted session, if any. Returns whether one was found.
    pub async fn load(&self) -> Result<bool, StorageError> {
        let loaded = self.storage.load()?;
        let found = loaded.is_some();
        debug!(found, "Session loaded from storage");
        *self.current.write().await = loaded;
        Ok(found)
    }

    pub async fn get(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn set(&self, session: Session) -> Result<(), StorageError> {
        self.storage.save(&session)?;
        *self.current.write().await = Some(session);
        info!("Session stored");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        *self.current.write().await = None;
        self.storage.remove()?;
        info!("Session cleared");
        Ok(())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Replace the access token after a successful refresh.
    ///
    /// The refresh token is replaced only when the backend rotated it. If the
    /// session was cleared while the refresh was in flight, nothing is stored.
    pub async fn rotate(
        &self,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Result<(), StorageError> {
        let mut guard = self.current.write().await;
        let Some(session) = guard.as_ref() else {
            warn!("Session cleared during token refresh, discarding new token");
            return Ok(());
        };

        let mut updated = session.clone();
        updated.access_token = access_token;
        if let Some(refresh_token) = refresh_token {
            updated.refresh_token = refresh_token;
        }
        updated.refreshed_at = Some(Utc::now());

        self.storage.save(&updated)?;
        *guard = Some(updated);
        debug!("Access token rotated");
        Ok(())
    }
}
