//! HS256 JSON Web Token tokenizer.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::{KeyClaims, TokenError, Tokenizer};
use crate::key::Key;

/// Self-contained signed tokens.
///
/// Expiry is not validated here: the token is decoded as long as the
/// signature holds, and [`Key::is_expired_at`] decides. That lets the
/// identity service tell an expired key from a forged one.
pub struct JwtTokenizer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenizer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let secret = secret.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl Tokenizer for JwtTokenizer {
    fn issue(&self, key: &Key) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::HS256),
            &KeyClaims::from_key(key),
            &self.encoding,
        )
        .map_err(|e| TokenError::Encode(e.to_string()))
    }

    fn parse(&self, token: &str) -> Result<Key, TokenError> {
        let data = decode::<KeyClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Malformed)?;
        data.claims.into_key()
    }
}

impl core::fmt::Debug for JwtTokenizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtTokenizer").finish_non_exhaustive()
    }
}
