//! `conduit-authn` — bearer credentials and the identity service.
//!
//! The identity service is the single source of truth for "who is making
//! this request": every other component resolves a token through
//! [`AuthnClient::identify`] instead of trusting a client-supplied subject.

pub mod client;
pub mod key;
pub mod repository;
pub mod service;
pub mod tokenizer;

pub use client::{AuthnClient, LocalAuthnClient};
pub use key::{Key, KeyType};
pub use repository::{InMemoryKeyRepository, KeyRepository};
pub use service::{AuthnService, KeyPolicy};
pub use tokenizer::{HmacTokenizer, JwtTokenizer, TokenError, Tokenizer};
