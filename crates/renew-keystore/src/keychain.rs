use keyring::Entry;
use tracing::{debug, warn};

use crate::{CredentialStore, StoreError};

const SERVICE: &str = "renew";

/// Credentials kept in the OS keychain, one entry per token name.
pub struct KeyringStore {
    service: String,
    namespace: String,
}

impl KeyringStore {
    pub fn new(namespace: &str) -> Self {
        Self::with_service(SERVICE, namespace)
    }

    pub fn with_service(service: &str, namespace: &str) -> Self {
        Self {
            service: service.to_string(),
            namespace: namespace.to_string(),
        }
    }

    fn account(&self, name: &str) -> String {
        format!("{}::{}", self.namespace, name)
    }

    fn entry(&self, name: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service, &self.account(name)).map_err(|err| StoreError::Unavailable {
            message: format!("failed to access keyring: {err}"),
        })
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        match self.entry(name)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(StoreError::Unavailable {
                message: format!(
                    "failed to load {name} from keychain for '{}': {err}",
                    self.namespace
                ),
            }),
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.entry(name)?
            .set_password(value)
            .map_err(|err| StoreError::Unavailable {
                message: format!("failed to store {name}: {err}"),
            })?;
        debug!(namespace = %self.namespace, name, "stored credential in keyring");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        match self.entry(name)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => {
                warn!(namespace = %self.namespace, name, "failed to delete credential: {err}");
                Err(StoreError::Unavailable {
                    message: format!("failed to delete {name}: {err}"),
                })
            }
        }
    }
}
