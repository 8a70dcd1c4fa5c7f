//! Error taxonomy shared by every component.
//!
//! Low-level persistence and transport failures are wrapped into one of these
//! kinds before they cross a component boundary, so callers outside the core
//! only ever match on this enum.

use thiserror::Error;

/// Result type used across conduit crates.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Structurally invalid entity (bad key type, empty issuer, oversized name...).
    #[error("malformed entity specification: {0}")]
    MalformedEntity(String),

    /// A wire path or topic did not match the expected grammar.
    #[error("malformed request data")]
    MalformedData,

    /// The subtopic part of a path could not be canonicalized.
    #[error("malformed subtopic")]
    MalformedSubtopic,

    /// Missing, invalid or revoked credential, or a missing access edge.
    #[error("missing or invalid credentials provided")]
    Unauthorized,

    /// Credential past its validity window.
    ///
    /// Refinement of [`Error::Unauthorized`]; collapsed back into it by
    /// [`Error::at_trust_boundary`].
    #[error("use of expired key")]
    KeyExpired,

    /// A referenced node of the resource graph does not exist.
    #[error("non-existent entity")]
    NotFound,

    /// Duplicate edge or duplicate unique key.
    #[error("entity already exists")]
    Conflict,

    /// Remote call failed (timeout or transport). Never an authorization denial.
    #[error("rpc failure: {0}")]
    Rpc(String),

    /// Persistence or identifier generation failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEntity(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Collapse identity-resolution refinements before the error leaves the
    /// service that produced it.
    ///
    /// Callers on the other side of a trust boundary must not learn whether a
    /// credential was expired, malformed or revoked.
    pub fn at_trust_boundary(self) -> Self {
        match self {
            Self::KeyExpired => Self::Unauthorized,
            other => other,
        }
    }

    /// Whether this error denies access (as opposed to failing to decide).
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::KeyExpired)
    }

    /// Whether this error was raised while validating input, before any
    /// authorization decision was attempted.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedEntity(_) | Self::MalformedData | Self::MalformedSubtopic
        )
    }

    /// Stable machine-readable code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedEntity(_) => "malformed_entity",
            Self::MalformedData => "malformed_data",
            Self::MalformedSubtopic => "malformed_subtopic",
            Self::Unauthorized => "unauthorized",
            Self::KeyExpired => "key_expired",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Rpc(_) => "rpc_failure",
            Self::Storage(_) => "storage_failure",
        }
    }

    /// Rebuild an error from its [`Error::code`] and message.
    ///
    /// Used by RPC clients decoding a remote error body; unknown codes become
    /// [`Error::Rpc`].
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        match code {
            "malformed_entity" => Self::MalformedEntity(message.into()),
            "malformed_data" => Self::MalformedData,
            "malformed_subtopic" => Self::MalformedSubtopic,
            "unauthorized" => Self::Unauthorized,
            "key_expired" => Self::KeyExpired,
            "not_found" => Self::NotFound,
            "conflict" => Self::Conflict,
            "storage_failure" => Self::Storage(message.into()),
            _ => Self::Rpc(message.into()),
        }
    }
}
