//! OS keychain entries under the "storedesk" service: employee passwords
//! keyed by phone number, and the secret behind the encrypted session file.

use anyhow::{Context, Result};
use keyring::Entry;
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::StorageError;

const SERVICE_NAME: &str = "storedesk";

/// Keychain account holding the session encryption secret
const VAULT_ACCOUNT: &str = "session-vault";

/// Length of the generated vault secret
const VAULT_SECRET_LENGTH: usize = 48;

pub struct CredentialStore;

impl CredentialStore {
    fn entry(account: &str) -> Result<Entry, keyring::Error> {
        Entry::new(SERVICE_NAME, account)
    }

    /// Remember the password for a phone number
    pub fn store(phone: &str, password: &str) -> Result<()> {
        Self::entry(phone)
            .and_then(|entry| entry.set_password(password))
            .with_context(|| format!("Failed to store password for {} in keychain", phone))
    }

    /// The remembered password for a phone number, if any
    pub fn password(phone: &str) -> Result<Option<String>> {
        match Self::entry(phone).and_then(|entry| entry.get_password()) {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read password from keychain"),
        }
    }

    /// Drop the remembered password. Returns whether one was stored.
    pub fn forget(phone: &str) -> Result<bool> {
        match Self::entry(phone).and_then(|entry| entry.delete_credential()) {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e).context("Failed to delete password from keychain"),
        }
    }

    /// Secret protecting the encrypted session file, created on first use.
    ///
    /// A new secret is read back through a fresh entry; a keychain that
    /// accepts the write but forgets it is an error, since the next run could
    /// not decrypt the session.
    pub fn vault_secret() -> Result<String, StorageError> {
        let entry = Self::entry(VAULT_ACCOUNT)?;
        match entry.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => {
                let secret: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(VAULT_SECRET_LENGTH)
                    .map(char::from)
                    .collect();
                entry.set_password(&secret)?;

                match Self::entry(VAULT_ACCOUNT)?.get_password() {
                    Ok(stored) if stored == secret => Ok(secret),
                    _ => Err(StorageError::SecretNotPersisted),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn use_mock_keychain() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
    }

    #[test]
    fn test_nothing_stored() {
        use_mock_keychain();
        assert_eq!(CredentialStore::password("0900000001").unwrap(), None);
        assert!(!CredentialStore::forget("0900000001").unwrap());
    }

    #[test]
    fn test_forgetful_keychain_gives_no_vault_secret() {
        // Mock entries do not share storage, like a keychain with no backing store
        use_mock_keychain();
        assert!(matches!(
            CredentialStore::vault_secret(),
            Err(StorageError::SecretNotPersisted)
        ));
    }
}
