use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An in-memory cache in front of `SecretManager`.
///
/// Providers look their key up on every generation call; a research run makes
/// up to nine calls, so the environment/keychain is only consulted once.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Retrieves a secret, consulting the memory cache first.
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| EngineError::Secret("secret cache lock poisoned".to_string()))?;
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);

        {
            let mut cache = self
                .cache
                .write()
                .map_err(|_| EngineError::Secret("secret cache lock poisoned".to_string()))?;
            cache.insert(key.to_string(), secret.clone());
        }

        Ok(secret)
    }

    /// Insert a secret directly, bypassing the manager.
    pub fn insert(&self, key: &str, value: impl Into<String>) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), SecretString::new(value));
        }
    }

    /// Whether a secret can be resolved without erroring.
    pub fn has_secret(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_secret_is_served_from_cache() {
        let cache = SecretCache::new(Arc::new(SecretManager::new("deepdive-test")));
        cache.insert("unit_test_api_key", "sk-cached");

        let secret = cache.get_secret("unit_test_api_key").unwrap();
        assert_eq!(secret.unsecure(), "sk-cached");
        assert!(cache.has_secret("unit_test_api_key"));
    }
}
