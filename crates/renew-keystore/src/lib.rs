#![deny(clippy::unwrap_used)]

use std::fmt;

use serde::{Deserialize, Serialize};

mod file;
mod keychain;
mod memory;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";

/// Access and refresh tokens as issued together by the auth server.
///
/// Both values are opaque bearer strings; nothing here parses them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("credential store unavailable: {message}")]
    Unavailable { message: String },
    #[error("credential store corrupt: {message}")]
    Corrupt { message: String },
    #[error("credential store io error: {message}")]
    Io { message: String },
}

/// Named string storage for bearer credentials.
///
/// Implementations must treat a missing entry as `Ok(None)` on read and as
/// success on remove.
pub trait CredentialStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, name: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, name: &str) -> Result<(), StoreError>;

    fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(ACCESS_TOKEN)
    }

    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(REFRESH_TOKEN)
    }

    fn credentials(&self) -> Result<Option<CredentialPair>, StoreError> {
        let Some(access_token) = self.get(ACCESS_TOKEN)? else {
            return Ok(None);
        };
        let Some(refresh_token) = self.get(REFRESH_TOKEN)? else {
            return Ok(None);
        };
        Ok(Some(CredentialPair {
            access_token,
            refresh_token,
        }))
    }

    fn replace_credentials(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.set(REFRESH_TOKEN, &pair.refresh_token)?;
        self.set(ACCESS_TOKEN, &pair.access_token)
    }

    fn clear_credentials(&self) -> Result<(), StoreError> {
        let access = self.remove(ACCESS_TOKEN);
        let refresh = self.remove(REFRESH_TOKEN);
        access.and(refresh)
    }
}
