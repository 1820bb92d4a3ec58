//! Database key provider backed by the OS secret store
//!
//! The database is encrypted at rest with a 256-bit key kept in the platform
//! credential store (Keychain, Windows Credential Manager, Secret Service).
//! The key never touches the config file or the database directory.

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::info;

use crate::error::{MetaDataError, MetaDataResult};

const KEY_SERVICE: &str = "com.magicfolder.database_key";
const KEY_ACCOUNT: &str = "default_user";
const KEY_BYTES: usize = 32;

/// Fetches or creates the database encryption key
pub struct DbKeyProvider {
    service: String,
    account: String,
}

impl Default for DbKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DbKeyProvider {
    /// Provider for the default service/account pair
    pub fn new() -> Self {
        Self {
            service: KEY_SERVICE.to_string(),
            account: KEY_ACCOUNT.to_string(),
        }
    }

    /// Provider for an explicit service/account pair (used by tests)
    pub fn with_entry(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    /// Fetch the key from the secret store, creating one on first use
    ///
    /// Returns the key as a 64-character hex string ready for `PRAGMA key`.
    ///
    /// # Errors
    ///
    /// Returns [`MetaDataError::KeyProvider`] if the secret store is
    /// unreachable, refuses the write, or holds a malformed entry.
    pub fn get_database_key(&self) -> MetaDataResult<String> {
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| MetaDataError::KeyProvider(e.to_string()))?;

        match entry.get_password() {
            Ok(key) if is_valid_key_hex(&key) => Ok(key),
            Ok(_) => Err(MetaDataError::KeyProvider(
                "stored key is not a 64-character hex string".to_string(),
            )),
            Err(keyring::Error::NoEntry) => {
                info!("no database key in secret store, generating a new one");
                let key = generate_key_hex();
                entry
                    .set_password(&key)
                    .map_err(|e| MetaDataError::KeyProvider(e.to_string()))?;
                Ok(key)
            }
            Err(e) => Err(MetaDataError::KeyProvider(e.to_string())),
        }
    }
}

/// Generate a fresh 256-bit key from the OS RNG, hex-encoded
pub fn generate_key_hex() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(KEY_BYTES * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Whether a string is usable as a raw SQLCipher hex key
pub(crate) fn is_valid_key_hex(key: &str) -> bool {
    key.len() == KEY_BYTES * 2 && key.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_valid_hex() {
        let key = generate_key_hex();
        assert!(is_valid_key_hex(&key));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_key_hex(), generate_key_hex());
    }

    #[test]
    fn key_validation_rejects_bad_shapes() {
        assert!(!is_valid_key_hex(""));
        assert!(!is_valid_key_hex("abc123"));
        assert!(!is_valid_key_hex(&"g".repeat(64)));
        assert!(is_valid_key_hex(&"0f".repeat(32)));
    }
}
