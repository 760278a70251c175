//! Secret store abstraction.
//!
//! Upstream credentials never reach the client; the pipeline resolves
//! them by name immediately before each outbound call. The store is an
//! injected capability so tests run against a fixed map instead of real
//! secrets.

use std::collections::HashMap;

/// Read-only access to named secrets.
pub trait SecretStore: Send + Sync {
    /// Returns the secret's value, or `None` when it is not configured.
    fn get(&self, name: &str) -> Option<String>;
}

/// Secrets taken from process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Secrets from a fixed in-memory map.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for StaticSecretStore {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self {
            secrets: pairs
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        }
    }
}

impl SecretStore for StaticSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.secrets.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_store_lookup() {
        let store = StaticSecretStore::from([("WEATHER_API_KEY", "s3cret")]);
        assert_eq!(store.get("WEATHER_API_KEY").as_deref(), Some("s3cret"));
        assert!(store.get("MISSING").is_none());
    }

    #[test]
    fn env_store_reads_process_env() {
        std::env::set_var("STATENV_TEST_SECRET", "from-env");
        assert_eq!(
            EnvSecretStore.get("STATENV_TEST_SECRET").as_deref(),
            Some("from-env")
        );
        std::env::remove_var("STATENV_TEST_SECRET");
    }
}
