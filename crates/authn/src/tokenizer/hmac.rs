//! Compact HMAC-SHA256 tokenizer: `base64url(claims).base64url(signature)`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{KeyClaims, TokenError, Tokenizer};
use crate::key::Key;

type HmacSha256 = Hmac<Sha256>;

pub struct HmacTokenizer {
    secret: Vec<u8>,
}

impl HmacTokenizer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| TokenError::Encode(e.to_string()))
    }
}

impl Tokenizer for HmacTokenizer {
    fn issue(&self, key: &Key) -> Result<String, TokenError> {
        let claims = serde_json::to_vec(&KeyClaims::from_key(key))
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        let body = URL_SAFE_NO_PAD.encode(claims);

        let mut mac = self.mac()?;
        mac.update(body.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{body}.{signature}"))
    }

    fn parse(&self, token: &str) -> Result<Key, TokenError> {
        let (body, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(body.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Malformed)?;

        let claims = URL_SAFE_NO_PAD.decode(body).map_err(|_| TokenError::Malformed)?;
        let claims: KeyClaims =
            serde_json::from_slice(&claims).map_err(|_| TokenError::Malformed)?;
        claims.into_key()
    }
}

impl core::fmt::Debug for HmacTokenizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HmacTokenizer").finish_non_exhaustive()
    }
}
