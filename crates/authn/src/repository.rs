//! Key persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use conduit_core::{Error, Result};

use crate::key::Key;

/// Store of revocable keys, keyed by `(issuer, id)`.
///
/// Secrets are never stored: a persisted key only records that the token
/// with this ID is still honoured.
#[async_trait]
pub trait KeyRepository: Send + Sync {
    /// Persist a key. Fails with `Conflict` if `(issuer, id)` already exists.
    async fn save(&self, key: &Key) -> Result<String>;

    /// Fails with `NotFound` if the key was never saved or has been removed.
    async fn retrieve(&self, issuer: &str, id: &str) -> Result<Key>;

    /// Removing an absent key is not an error.
    async fn remove(&self, issuer: &str, id: &str) -> Result<()>;
}

#[async_trait]
impl<R> KeyRepository for std::sync::Arc<R>
where
    R: KeyRepository + ?Sized,
{
    async fn save(&self, key: &Key) -> Result<String> {
        (**self).save(key).await
    }

    async fn retrieve(&self, issuer: &str, id: &str) -> Result<Key> {
        (**self).retrieve(issuer, id).await
    }

    async fn remove(&self, issuer: &str, id: &str) -> Result<()> {
        (**self).remove(issuer, id).await
    }
}

/// In-memory key store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryKeyRepository {
    keys: RwLock<HashMap<(String, String), Key>>,
}

impl InMemoryKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::storage("key store lock poisoned")
}

#[async_trait]
impl KeyRepository for InMemoryKeyRepository {
    async fn save(&self, key: &Key) -> Result<String> {
        let mut keys = self.keys.write().map_err(|_| poisoned())?;
        let id = (key.issuer.clone(), key.id.clone());
        if keys.contains_key(&id) {
            return Err(Error::Conflict);
        }

        let mut stored = key.clone();
        stored.secret.clear();
        keys.insert(id, stored);

        Ok(key.id.clone())
    }

    async fn retrieve(&self, issuer: &str, id: &str) -> Result<Key> {
        let keys = self.keys.read().map_err(|_| poisoned())?;
        keys.get(&(issuer.to_string(), id.to_string()))
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn remove(&self, issuer: &str, id: &str) -> Result<()> {
        let mut keys = self.keys.write().map_err(|_| poisoned())?;
        keys.remove(&(issuer.to_string(), id.to_string()));
        Ok(())
    }
}
