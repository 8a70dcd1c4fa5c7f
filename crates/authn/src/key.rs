use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use conduit_core::Error;

/// Kind of bearer credential.
///
/// The numeric codes are part of the wire contract (RPC requests and token
/// claims carry them).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum KeyType {
    /// Short-lived key handed out on login.
    User,
    /// Short-lived key used to reset a password.
    Recovery,
    /// Key acting on behalf of a user; revocable, optionally non-expiring.
    Api,
}

impl KeyType {
    pub fn code(self) -> u32 {
        match self {
            KeyType::User => 0,
            KeyType::Recovery => 1,
            KeyType::Api => 2,
        }
    }
}

impl TryFrom<u32> for KeyType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyType::User),
            1 => Ok(KeyType::Recovery),
            2 => Ok(KeyType::Api),
            other => Err(Error::malformed(format!("unknown key type {other}"))),
        }
    }
}

impl From<KeyType> for u32 {
    fn from(value: KeyType) -> Self {
        value.code()
    }
}

impl core::fmt::Display for KeyType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KeyType::User => write!(f, "user"),
            KeyType::Recovery => write!(f, "recovery"),
            KeyType::Api => write!(f, "api"),
        }
    }
}

/// Credential record.
///
/// Created by the identity service on issue, persisted only when revocable,
/// deleted on revoke. Never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Subject the key was issued to.
    pub issuer: String,
    /// Tokenized form of the key; only populated on the issue response.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
    pub issued_at: DateTime<Utc>,
    /// `None` means no expiry was set.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Key {
    /// Template for an issue request. The service fills in everything else.
    pub fn new(key_type: KeyType) -> Self {
        Self {
            id: String::new(),
            key_type,
            issuer: String::new(),
            secret: String::new(),
            issued_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the key is past its validity window at `now`.
    ///
    /// An API key without expiry never expires. Any other key without expiry
    /// is treated as already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => self.key_type != KeyType::Api,
            Some(expires_at) => expires_at < now,
        }
    }

    pub fn expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Revocable keys are persisted and checked against the key store on
    /// every identification.
    pub fn is_revocable(&self) -> bool {
        self.key_type == KeyType::Api
    }
}
