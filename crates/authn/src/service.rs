//! Identity service: issues keys and resolves tokens to subjects.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::{debug, warn};

use conduit_core::{Error, IdProvider, Result};

use crate::key::{Key, KeyType};
use crate::repository::KeyRepository;
use crate::tokenizer::Tokenizer;

/// Lifetimes of the short-lived key types.
///
/// API keys are not covered: their expiry is chosen by the caller, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub login_duration: Duration,
    pub recovery_duration: Duration,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            login_duration: Duration::hours(10),
            recovery_duration: Duration::minutes(5),
        }
    }
}

pub struct AuthnService {
    keys: Arc<dyn KeyRepository>,
    idp: Arc<dyn IdProvider>,
    tokenizer: Arc<dyn Tokenizer>,
    policy: KeyPolicy,
}

impl AuthnService {
    pub fn new(
        keys: Arc<dyn KeyRepository>,
        idp: Arc<dyn IdProvider>,
        tokenizer: Arc<dyn Tokenizer>,
        policy: KeyPolicy,
    ) -> Self {
        Self {
            keys,
            idp,
            tokenizer,
            policy,
        }
    }

    /// Issue a new key of `template.key_type`.
    ///
    /// For user and recovery keys `issuer` is the subject itself (the caller
    /// is a trusted internal flow such as login). For API keys `issuer` must
    /// be a valid user key token; the key is issued to the subject it
    /// resolves to and persisted so it can be revoked.
    ///
    /// The returned key carries its token in `secret`.
    pub async fn issue(&self, issuer: &str, template: Key) -> Result<Key> {
        let started = Instant::now();
        let res = self.issue_inner(issuer, template).await;
        match &res {
            Ok(key) => debug!(
                key_type = %key.key_type,
                expires_at = ?key.expires_at,
                elapsed_us = started.elapsed().as_micros() as u64,
                "issued key"
            ),
            Err(e) => warn!(error = %e, elapsed_us = started.elapsed().as_micros() as u64, "issue failed"),
        }
        res
    }

    async fn issue_inner(&self, issuer: &str, template: Key) -> Result<Key> {
        if issuer.is_empty() {
            return Err(Error::malformed("empty issuer"));
        }

        let now = now();
        match template.key_type {
            KeyType::Api => self.api_key(issuer, template, now).await,
            KeyType::Recovery => self.temporary_key(issuer, template, now, self.policy.recovery_duration),
            KeyType::User => self.temporary_key(issuer, template, now, self.policy.login_duration),
        }
    }

    async fn api_key(&self, token: &str, template: Key, now: DateTime<Utc>) -> Result<Key> {
        let owner = self.login(token)?;

        let expires_at = template.expires_at.map(|t| t.trunc_subsecs(0));
        if expires_at.is_some_and(|t| t <= now) {
            return Err(Error::malformed("api key expiry must be in the future"));
        }

        let mut key = Key {
            id: self.idp.id()?,
            key_type: KeyType::Api,
            issuer: owner,
            secret: String::new(),
            issued_at: now,
            expires_at,
        };
        let secret = self.tokenize(&key)?;
        self.keys.save(&key).await?;
        key.secret = secret;

        Ok(key)
    }

    fn temporary_key(
        &self,
        issuer: &str,
        template: Key,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Key> {
        let mut key = Key {
            id: self.idp.id()?,
            key_type: template.key_type,
            issuer: issuer.to_string(),
            secret: String::new(),
            issued_at: now,
            expires_at: Some(now + lifetime),
        };
        key.secret = self.tokenize(&key)?;

        Ok(key)
    }

    /// Resolve a token to the subject it was issued to.
    ///
    /// Fails with `Unauthorized` for tokens that do not parse or whose key was
    /// revoked, and with `KeyExpired` for keys past their validity window.
    /// An expired API key is removed from the store on the way out.
    pub async fn identify(&self, token: &str) -> Result<String> {
        let started = Instant::now();
        let res = self.identify_inner(token).await;
        match &res {
            Ok(_) => debug!(elapsed_us = started.elapsed().as_micros() as u64, "identified token"),
            Err(e) => debug!(error = %e, elapsed_us = started.elapsed().as_micros() as u64, "identify failed"),
        }
        res
    }

    async fn identify_inner(&self, token: &str) -> Result<String> {
        let key = self
            .tokenizer
            .parse(token)
            .map_err(|_| Error::Unauthorized)?;

        if key.expired() {
            if key.is_revocable() {
                if let Err(e) = self.keys.remove(&key.issuer, &key.id).await {
                    warn!(key_id = %key.id, error = %e, "failed to remove expired key");
                }
            }
            return Err(Error::KeyExpired);
        }

        if key.is_revocable() {
            self.keys
                .retrieve(&key.issuer, &key.id)
                .await
                .map_err(|e| match e {
                    Error::NotFound => Error::Unauthorized,
                    other => other,
                })?;
        }

        Ok(key.issuer)
    }

    /// Revoke an API key owned by the subject behind `token`.
    pub async fn revoke(&self, token: &str, id: &str) -> Result<()> {
        let owner = self.login(token)?;
        let res = self.keys.remove(&owner, id).await;
        match &res {
            Ok(()) => debug!(key_id = %id, "revoked key"),
            Err(e) => warn!(key_id = %id, error = %e, "revoke failed"),
        }
        res
    }

    /// Retrieve an API key owned by the subject behind `token`.
    pub async fn retrieve(&self, token: &str, id: &str) -> Result<Key> {
        let owner = self.login(token)?;
        self.keys.retrieve(&owner, id).await
    }

    /// Resolve a user key token. Only logged-in users manage API keys.
    fn login(&self, token: &str) -> Result<String> {
        let key = self
            .tokenizer
            .parse(token)
            .map_err(|_| Error::Unauthorized)?;

        if key.key_type != KeyType::User {
            return Err(Error::Unauthorized);
        }
        if key.expired() {
            return Err(Error::KeyExpired);
        }

        Ok(key.issuer)
    }

    fn tokenize(&self, key: &Key) -> Result<String> {
        self.tokenizer
            .issue(key)
            .map_err(|e| Error::storage(e.to_string()))
    }
}

/// Current time at token precision, so issued keys survive a round-trip.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
