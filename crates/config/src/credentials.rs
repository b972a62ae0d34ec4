//! Local storage of the login token.
//!
//! After a successful login the token is saved so the next start can log in
//! again without asking. The value is stored under a fixed key and always
//! passes through a [`TokenCipher`] first; which cipher is used is up to the
//! caller.
//!
//! # Examples
//!
//! ```
//! use ghtt_config::credentials::{CredentialStore, FileCredentialStore};
//!
//! # fn main() -> ghtt_config::Result<()> {
//! let dir = tempfile::tempdir().unwrap();
//! let store = FileCredentialStore::new(dir.path().join("credentials.json"));
//!
//! store.save("ghp_secret")?;
//! assert_eq!(store.load()?.as_deref(), Some("ghp_secret"));
//!
//! store.clear()?;
//! assert_eq!(store.load()?, None);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ConfigError, Result};
use crate::persistence::{read_file, write_private_file};

/// Key the token is stored under.
pub const CREDENTIAL_KEY: &str = "GHTT-state";

/// Encrypts the token before it touches the disk.
pub trait TokenCipher: Send + Sync {
    /// Encrypts a token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cipher`] if encryption fails.
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Decrypts a stored value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cipher`] if the value cannot be decrypted.
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// A cipher that stores the token unchanged.
///
/// The file is still created readable by its owner only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCipher;

impl TokenCipher for PassthroughCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}

/// Persists the login token.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or decrypted.
    fn load(&self) -> Result<Option<String>>;

    /// Stores a token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, token: &str) -> Result<()>;

    /// Removes the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear(&self) -> Result<()>;
}

/// Stores the token in a JSON file of `{ key: ciphertext }` entries.
#[derive(Debug, Clone)]
pub struct FileCredentialStore<C = PassthroughCipher> {
    path: PathBuf,
    key: String,
    cipher: C,
}

impl FileCredentialStore {
    /// Creates a store at `path` using [`PassthroughCipher`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_cipher(path, PassthroughCipher)
    }
}

impl<C: TokenCipher> FileCredentialStore<C> {
    /// Creates a store at `path` encrypting with `cipher`.
    #[must_use]
    pub fn with_cipher(path: impl Into<PathBuf>, cipher: C) -> Self {
        Self {
            path: path.into(),
            key: CREDENTIAL_KEY.to_string(),
            cipher,
        }
    }

    /// Returns the credential file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> Result<BTreeMap<String, String>> {
        match read_file(&self.path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| ConfigError::CorruptCredentials {
                    path: self.path.clone(),
                    source,
                })
            }
            Err(ConfigError::ReadFile { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(BTreeMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        write_private_file(&self.path, entries)
    }
}

impl<C: TokenCipher> CredentialStore for FileCredentialStore<C> {
    fn load(&self) -> Result<Option<String>> {
        match self.entries()?.get(&self.key) {
            Some(ciphertext) if !ciphertext.is_empty() => {
                self.cipher.decrypt(ciphertext).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut entries = self.entries()?;
        entries.insert(self.key.clone(), self.cipher.encrypt(token)?);
        self.store(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries()?;
        if entries.remove(&self.key).is_none() {
            return Ok(());
        }
        self.store(&entries)
    }
}

/// Keeps the token in memory only.
///
/// Clones share the same slot, so a test can hand one clone to the code
/// under test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    slot: Arc<Mutex<MemorySlot>>,
}

#[derive(Debug, Default)]
struct MemorySlot {
    token: Option<String>,
    failing: bool,
    saves: usize,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `token`.
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.lock().token = Some(token.to_string());
        store
    }

    /// Makes every later save and clear fail.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Returns the stored token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    /// Returns how many saves and clears succeeded.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemorySlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, token: Option<String>) -> Result<()> {
        let mut slot = self.lock();
        if slot.failing {
            return Err(ConfigError::WriteFile {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("credential store unavailable"),
            });
        }
        slot.token = token;
        slot.saves += 1;
        Ok(())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token())
    }

    fn save(&self, token: &str) -> Result<()> {
        self.write(Some(token.to_string()))
    }

    fn clear(&self) -> Result<()> {
        self.write(None)
    }
}
