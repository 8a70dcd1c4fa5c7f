//! Client-side view of the identity service.
//!
//! The registry depends on this trait only; whether calls go in-process or
//! over the network is decided at wiring time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use conduit_core::{Result, with_deadline};

use crate::key::{Key, KeyType};
use crate::service::AuthnService;

#[async_trait]
pub trait AuthnClient: Send + Sync {
    /// Issue a key of `key_type` for `issuer` and return its token.
    async fn issue(&self, issuer: &str, key_type: KeyType) -> Result<String>;

    /// Resolve a token to its subject.
    async fn identify(&self, token: &str) -> Result<String>;
}

#[async_trait]
impl<C> AuthnClient for Arc<C>
where
    C: AuthnClient + ?Sized,
{
    async fn issue(&self, issuer: &str, key_type: KeyType) -> Result<String> {
        (**self).issue(issuer, key_type).await
    }

    async fn identify(&self, token: &str) -> Result<String> {
        (**self).identify(token).await
    }
}

/// In-process client with the same deadline and error contract as a remote one.
pub struct LocalAuthnClient {
    svc: Arc<AuthnService>,
    timeout: Duration,
}

impl LocalAuthnClient {
    pub fn new(svc: Arc<AuthnService>, timeout: Duration) -> Self {
        Self { svc, timeout }
    }
}

#[async_trait]
impl AuthnClient for LocalAuthnClient {
    async fn issue(&self, issuer: &str, key_type: KeyType) -> Result<String> {
        let key = with_deadline(self.timeout, self.svc.issue(issuer, Key::new(key_type)))
            .await
            .map_err(|e| e.at_trust_boundary())?;
        Ok(key.secret)
    }

    async fn identify(&self, token: &str) -> Result<String> {
        with_deadline(self.timeout, self.svc.identify(token))
            .await
            .map_err(|e| e.at_trust_boundary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyRepository;
    use crate::service::KeyPolicy;
    use crate::tokenizer::HmacTokenizer;
    use chrono::Duration as ChronoDuration;
    use conduit_core::{Error, UuidIdProvider};

    fn client(policy: KeyPolicy) -> LocalAuthnClient {
        let svc = AuthnService::new(
            Arc::new(InMemoryKeyRepository::new()),
            Arc::new(UuidIdProvider::new()),
            Arc::new(HmacTokenizer::new(b"client".to_vec())),
            policy,
        );
        LocalAuthnClient::new(Arc::new(svc), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn issue_then_identify() {
        let c = client(KeyPolicy::default());
        let token = c.issue("a@example.com", KeyType::User).await.unwrap();
        assert_eq!(c.identify(&token).await.unwrap(), "a@example.com");
    }

    #[tokio::test]
    async fn expired_keys_surface_as_unauthorized() {
        let c = client(KeyPolicy {
            login_duration: ChronoDuration::seconds(-10),
            recovery_duration: ChronoDuration::seconds(-10),
        });
        let token = c.issue("a@example.com", KeyType::User).await.unwrap();
        assert_eq!(c.identify(&token).await, Err(Error::Unauthorized));
    }
}
