//! Credential discovery from the environment.
//!
//! The "selection flow" for a headless process is re-reading the configured
//! environment variable; it fails when the variable is still unset.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Credential, CredentialGate, ProviderError, ProviderErrorKind};

/// Reads the API key from an environment variable
#[derive(Debug, Clone)]
pub struct EnvCredentialGate {
    var: String,
}

impl EnvCredentialGate {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    fn read(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl CredentialGate for EnvCredentialGate {
    async fn has_credential(&self) -> Result<bool, ProviderError> {
        Ok(self.read().is_some())
    }

    async fn select_credential(&self) -> Result<(), ProviderError> {
        debug!(var = %self.var, "Selecting credential from environment");
        if self.read().is_some() {
            return Ok(());
        }

        warn!(var = %self.var, "No API key available");
        Err(ProviderError::new(
            ProviderErrorKind::Unauthorized,
            format!("No API key selected. Set {} and retry.", self.var),
        ))
    }

    async fn credential(&self) -> Result<Credential, ProviderError> {
        self.read().map(Credential::new).ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::Unauthorized,
                format!("No API key selected. Set {} and retry.", self.var),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_variable() {
        let gate = EnvCredentialGate::new("VIDSLOT_TEST_KEY_THAT_IS_NEVER_SET");

        assert!(!gate.has_credential().await.unwrap());
        let err = gate.select_credential().await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Unauthorized);
        assert!(gate.credential().await.is_err());
    }
}
