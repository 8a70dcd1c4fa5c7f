//! Tokenizer contract: encoding a [`Key`] as a bearer string and back.
//!
//! The rest of the system depends only on [`Tokenizer`]; for any key the
//! identity service produces, `parse(issue(k))` yields `k` back (ID, type,
//! issuer, issue and expiry times). Timestamps travel with second precision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::{Key, KeyType};

pub mod hmac;
pub mod jwt;

pub use self::hmac::HmacTokenizer;
pub use self::jwt::JwtTokenizer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Converts between keys and their string representation.
pub trait Tokenizer: Send + Sync {
    fn issue(&self, key: &Key) -> Result<String, TokenError>;

    fn parse(&self, token: &str) -> Result<Key, TokenError>;
}

impl<T> Tokenizer for std::sync::Arc<T>
where
    T: Tokenizer + ?Sized,
{
    fn issue(&self, key: &Key) -> Result<String, TokenError> {
        (**self).issue(key)
    }

    fn parse(&self, token: &str) -> Result<Key, TokenError> {
        (**self).parse(token)
    }
}

/// Claim set shared by the tokenizers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KeyClaims {
    jti: String,
    typ: KeyType,
    iss: String,
    iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

impl KeyClaims {
    pub(crate) fn from_key(key: &Key) -> Self {
        Self {
            jti: key.id.clone(),
            typ: key.key_type,
            iss: key.issuer.clone(),
            iat: key.issued_at.timestamp(),
            exp: key.expires_at.map(|t| t.timestamp()),
        }
    }

    pub(crate) fn into_key(self) -> Result<Key, TokenError> {
        let issued_at = timestamp(self.iat)?;
        let expires_at = self.exp.map(timestamp).transpose()?;
        Ok(Key {
            id: self.jti,
            key_type: self.typ,
            issuer: self.iss,
            secret: String::new(),
            issued_at,
            expires_at,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0).ok_or(TokenError::Malformed)
}
