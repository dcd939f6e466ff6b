//! Encrypted session file.
//!
//! Layout of `session.bin`: magic, 16-byte salt, 12-byte nonce, then the
//! ChaCha20-Poly1305 ciphertext of the session JSON. The key is derived with
//! Argon2 from a secret kept in the OS keychain, so the file alone is useless.

use std::path::{Path, PathBuf};

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use super::storage::{remove_if_exists, write_private, SessionStorage, StorageError};
use super::{CredentialStore, Session};

const VAULT_FILE: &str = "session.bin";
const MAGIC: &[u8; 4] = b"SDV1";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN;

pub struct EncryptedFileStorage {
    path: PathBuf,
    secret: String,
}

impl std::fmt::Debug for EncryptedFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStorage")
            .field("path", &self.path)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl EncryptedFileStorage {
    pub fn new(cache_dir: &Path, secret: impl Into<String>) -> Self {
        Self {
            path: cache_dir.join(VAULT_FILE),
            secret: secret.into(),
        }
    }

    /// Storage keyed by the secret in the OS keychain.
    pub fn with_keyring(cache_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(cache_dir, CredentialStore::vault_secret()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cipher(&self, salt: &[u8]) -> Result<ChaCha20Poly1305, StorageError> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(self.secret.as_bytes(), salt, &mut key)
            .map_err(|e| StorageError::Crypto(format!("Key derivation failed: {}", e)))?;
        Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StorageError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| StorageError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        sealed.extend_from_slice(MAGIC);
        sealed.extend_from_slice(&salt);
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, StorageError> {
        if sealed.len() < HEADER_LEN || &sealed[..MAGIC.len()] != MAGIC {
            return Err(StorageError::Crypto("Not a session vault file".to_string()));
        }
        let salt = &sealed[MAGIC.len()..MAGIC.len() + SALT_LEN];
        let nonce = &sealed[MAGIC.len() + SALT_LEN..HEADER_LEN];

        self.cipher(salt)?
            .decrypt(Nonce::from_slice(nonce), &sealed[HEADER_LEN..])
            .map_err(|_| StorageError::Crypto("Session vault could not be decrypted".to_string()))
    }
}

impl SessionStorage for EncryptedFileStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let sealed = std::fs::read(&self.path)?;
        let plaintext = self.open(&sealed)?;
        Ok(Some(serde_json::from_slice(&plaintext)?))
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        let sealed = self.seal(&serde_json::to_vec(session)?)?;
        write_private(&self.path, &sealed)
    }

    fn remove(&self) -> Result<(), StorageError> {
        remove_if_exists(&self.path)
    }
}
