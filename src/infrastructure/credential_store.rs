use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Saved sign-in credentials for silent re-authentication on app start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedCredentials {
    pub email: String,
    pub password: String,
}

pub trait CredentialStore: Send + Sync {
    fn save(&self, credentials: &SavedCredentials) -> Result<(), InfraError>;
    fn load(&self) -> Result<Option<SavedCredentials>, InfraError>;
    fn delete(&self) -> Result<(), InfraError>;
}

/// Credentials in the OS keychain, serialized as one JSON payload under a
/// fixed service/account pair.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service_name: String,
    account_name: String,
}

impl KeyringCredentialStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, InfraError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new("timetrack.auth.firebase", "default")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save(&self, credentials: &SavedCredentials) -> Result<(), InfraError> {
        let payload = serde_json::to_string(credentials)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))
    }

    fn load(&self) -> Result<Option<SavedCredentials>, InfraError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(InfraError::Credential(error.to_string())),
        };

        let credentials = serde_json::from_str::<SavedCredentials>(&payload)
            .map_err(|error| InfraError::Credential(error.to_string()))?;
        Ok(Some(credentials))
    }

    fn delete(&self) -> Result<(), InfraError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(InfraError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: Mutex<Option<SavedCredentials>>,
}

impl CredentialStore for InMemoryCredentialStore {
    fn save(&self, credentials: &SavedCredentials) -> Result<(), InfraError> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SavedCredentials>, InfraError> {
        let guard = self
            .credentials
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete(&self) -> Result<(), InfraError> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|error| InfraError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}
