//! Per-service configuration read from the environment.
//!
//! Unset or empty variables fall back to the documented default. A value
//! that is set but does not parse is an error, never a silent default.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Internal RPC listeners; the public HTTP ports never serve `/rpc/*`.
pub const DEFAULT_AUTHN_URL: &str = "http://localhost:8181";
pub const DEFAULT_THINGS_URL: &str = "http://localhost:8183";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Source of raw settings. The process environment in production.
pub trait Source {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads `std::env`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Env;

impl Source for Env {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> Source for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Value of `key`, or `default` if it is unset or empty.
pub fn env_or(src: &dyn Source, key: &str, default: &str) -> String {
    src.get(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed<T>(src: &dyn Source, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match src.get(key).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn millis(src: &dyn Source, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parsed(src, key, default).map(Duration::from_millis)
}

fn secs(src: &dyn Source, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parsed(src, key, default).map(Duration::from_secs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerKind {
    Jwt,
    Hmac,
}

impl FromStr for TokenizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jwt" => Ok(Self::Jwt),
            "hmac" => Ok(Self::Hmac),
            other => Err(format!("unknown tokenizer {other:?}, expected jwt or hmac")),
        }
    }
}

/// Identity service settings.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthnConfig {
    pub http_port: u16,
    pub rpc_port: u16,
    pub secret: String,
    pub tokenizer: TokenizerKind,
    pub login_duration: Duration,
    pub recovery_duration: Duration,
}

impl AuthnConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&Env)
    }

    pub fn from_source(src: &dyn Source) -> Result<Self, ConfigError> {
        Ok(Self {
            http_port: parsed(src, "CONDUIT_AUTHN_HTTP_PORT", 8180)?,
            rpc_port: parsed(src, "CONDUIT_AUTHN_RPC_PORT", 8181)?,
            secret: env_or(src, "CONDUIT_AUTHN_SECRET", "authn"),
            tokenizer: parsed(src, "CONDUIT_AUTHN_TOKENIZER", TokenizerKind::Jwt)?,
            login_duration: secs(src, "CONDUIT_AUTHN_LOGIN_DURATION_SECS", 36_000)?,
            recovery_duration: secs(src, "CONDUIT_AUTHN_RECOVERY_DURATION_SECS", 300)?,
        })
    }
}

impl core::fmt::Debug for AuthnConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthnConfig")
            .field("http_port", &self.http_port)
            .field("rpc_port", &self.rpc_port)
            .field("tokenizer", &self.tokenizer)
            .field("login_duration", &self.login_duration)
            .field("recovery_duration", &self.recovery_duration)
            .finish_non_exhaustive()
    }
}

/// Registry service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingsConfig {
    pub http_port: u16,
    pub rpc_port: u16,
    pub authn_url: String,
    pub authn_timeout: Duration,
}

impl ThingsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&Env)
    }

    pub fn from_source(src: &dyn Source) -> Result<Self, ConfigError> {
        Ok(Self {
            http_port: parsed(src, "CONDUIT_THINGS_HTTP_PORT", 8182)?,
            rpc_port: parsed(src, "CONDUIT_THINGS_RPC_PORT", 8183)?,
            authn_url: env_or(src, "CONDUIT_AUTHN_URL", DEFAULT_AUTHN_URL),
            authn_timeout: millis(src, "CONDUIT_THINGS_AUTHN_TIMEOUT_MS", 1000)?,
        })
    }
}

/// HTTP adapter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAdapterConfig {
    pub http_port: u16,
    pub things_url: String,
    pub things_timeout: Duration,
    /// Publish to Redis instead of the in-process bus when set.
    pub redis_url: Option<String>,
}

impl HttpAdapterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&Env)
    }

    pub fn from_source(src: &dyn Source) -> Result<Self, ConfigError> {
        Ok(Self {
            http_port: parsed(src, "CONDUIT_HTTP_PORT", 8185)?,
            things_url: env_or(src, "CONDUIT_THINGS_URL", DEFAULT_THINGS_URL),
            things_timeout: millis(src, "CONDUIT_HTTP_THINGS_TIMEOUT_MS", 1000)?,
            redis_url: src.get("CONDUIT_REDIS_URL").filter(|v| !v.is_empty()),
        })
    }
}
