//! Service account credential cache
//!
//! The mediator needs two secrets per delivery: the bearer token the
//! subscriber expects on inbound calls, and the signing secret used to
//! compute the webhook HMAC. Both live on a `ServiceAccount` behind a
//! secret reference (`aws-sm://...`, `vault://...`, `encrypted:...`),
//! so resolving them on every delivery would mean a secrets-provider
//! round trip per message. Instead we cache the decrypted pair by
//! service account id and only go back to the provider on a miss or
//! after an explicit rotation.
//!
//! Reads never block a writer and vice versa: the map itself is
//! guarded by a `parking_lot::RwLock`, so the common case (cache hit)
//! is a read-lock acquire plus an `Arc` clone.

use std::collections::HashMap;
use std::sync::Arc;

use fc_platform::ServiceAccountRepository;
use fc_secrets::SecretService;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::RouterError;

/// Resolved credentials for a single service account.
#[derive(Debug, Clone)]
pub struct ServiceAccountCredentials {
    /// Bearer token presented to the subscriber in `Authorization`.
    pub auth_token: Option<String>,
    /// Secret used to compute the webhook HMAC signature.
    pub signing_secret: Option<String>,
}

/// Process-wide read-through cache of `ServiceAccount` webhook
/// credentials, keyed by service account id.
pub struct CredentialCache {
    repository: Arc<ServiceAccountRepository>,
    secrets: Arc<SecretService>,
    entries: RwLock<HashMap<String, Arc<ServiceAccountCredentials>>>,
}

impl CredentialCache {
    pub fn new(repository: Arc<ServiceAccountRepository>, secrets: Arc<SecretService>) -> Self {
        Self {
            repository,
            secrets,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve credentials for `service_account_id`, filling the cache
    /// on a miss.
    pub async fn resolve(&self, service_account_id: &str) -> Result<Arc<ServiceAccountCredentials>, RouterError> {
        if let Some(cached) = self.entries.read().get(service_account_id) {
            return Ok(Arc::clone(cached));
        }

        let account = self.repository
            .find_by_id(service_account_id)
            .await
            .map_err(|e| RouterError::Config(format!("failed to load service account {}: {}", service_account_id, e)))?
            .ok_or_else(|| RouterError::Config(format!("service account not found: {}", service_account_id)))?;

        if !account.active {
            return Err(RouterError::Config(format!("service account inactive: {}", service_account_id)));
        }

        let creds = &account.webhook_credentials;
        let auth_token = self.resolve_secret(creds.token.as_deref()).await?;
        let signing_secret = self.resolve_secret(creds.signing_secret.as_deref()).await?;

        let resolved = Arc::new(ServiceAccountCredentials { auth_token, signing_secret });
        self.entries.write().insert(service_account_id.to_string(), Arc::clone(&resolved));
        debug!(service_account_id, "cached service account credentials");
        Ok(resolved)
    }

    /// Resolve a single credential value. Values that look like a
    /// secret reference (`provider://...` or `encrypted:...`) are
    /// decrypted through the secrets service; anything else is used
    /// as-is, since dev/test configs often store plaintext directly.
    async fn resolve_secret(&self, value: Option<&str>) -> Result<Option<String>, RouterError> {
        match value {
            None => Ok(None),
            Some(v) if v.is_empty() => Ok(None),
            Some(v) if self.secrets.is_valid_format(v) => {
                let resolved = self.secrets.resolve(v).await
                    .map_err(|e| RouterError::Config(format!("failed to resolve secret: {}", e)))?;
                Ok(Some(resolved))
            }
            Some(v) => Ok(Some(v.to_string())),
        }
    }

    /// Drop a cached entry, forcing the next `resolve` to re-read the
    /// service account and its secrets. Called when a rotation is
    /// signalled out of band (e.g. via the config-sync channel).
    pub fn invalidate(&self, service_account_id: &str) {
        self.entries.write().remove(service_account_id);
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_clone_cheaply() {
        let creds = ServiceAccountCredentials {
            auth_token: Some("tok".to_string()),
            signing_secret: Some("sig".to_string()),
        };
        let arc = Arc::new(creds);
        let cloned = Arc::clone(&arc);
        assert_eq!(cloned.auth_token.as_deref(), Some("tok"));
    }
}
