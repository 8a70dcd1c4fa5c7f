//! Infrastructure layer: configuration and broker-backed bus implementations.

pub mod bus;
pub mod config;

pub use config::{AuthnConfig, ConfigError, HttpAdapterConfig, ThingsConfig, TokenizerKind};
