//! Service construction from configuration.
//!
//! Storage is in-memory; the identity and registry dependencies of the
//! downstream services are reached over HTTP.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use conduit_authn::{
    AuthnService, HmacTokenizer, InMemoryKeyRepository, JwtTokenizer, KeyPolicy, Tokenizer,
};
use conduit_core::UuidIdProvider;
use conduit_http::AdapterService;
use conduit_infra::bus::RedisPubSubBus;
use conduit_infra::{AuthnConfig, HttpAdapterConfig, ThingsConfig, TokenizerKind};
use conduit_messaging::{InMemoryBus, Publisher};
use conduit_things::{InMemoryRegistry, ThingsService};

use crate::clients::{HttpAuthnClient, HttpThingsClient};

pub fn authn_service(cfg: &AuthnConfig) -> anyhow::Result<AuthnService> {
    let secret = cfg.secret.as_bytes().to_vec();
    let tokenizer: Arc<dyn Tokenizer> = match cfg.tokenizer {
        TokenizerKind::Jwt => Arc::new(JwtTokenizer::new(secret)),
        TokenizerKind::Hmac => Arc::new(HmacTokenizer::new(secret)),
    };

    let policy = KeyPolicy {
        login_duration: chrono::Duration::from_std(cfg.login_duration)
            .context("login duration out of range")?,
        recovery_duration: chrono::Duration::from_std(cfg.recovery_duration)
            .context("recovery duration out of range")?,
    };

    info!(tokenizer = ?cfg.tokenizer, "identity service configured");
    Ok(AuthnService::new(
        Arc::new(InMemoryKeyRepository::new()),
        Arc::new(UuidIdProvider::new()),
        tokenizer,
        policy,
    ))
}

pub fn things_service(cfg: &ThingsConfig) -> anyhow::Result<ThingsService> {
    let authn = HttpAuthnClient::new(&cfg.authn_url, cfg.authn_timeout)
        .context("failed to build identity client")?;
    let registry = Arc::new(InMemoryRegistry::new());

    info!(authn_url = %cfg.authn_url, "registry configured");
    Ok(ThingsService::new(
        Arc::new(authn),
        registry.clone(),
        registry,
        Arc::new(UuidIdProvider::new()),
    ))
}

pub fn adapter_service(cfg: &HttpAdapterConfig) -> anyhow::Result<AdapterService> {
    let things = HttpThingsClient::new(&cfg.things_url, cfg.things_timeout)
        .context("failed to build registry client")?;

    let publisher: Arc<dyn Publisher> = match &cfg.redis_url {
        Some(url) => {
            info!("publishing to redis");
            Arc::new(RedisPubSubBus::new(url).context("failed to open redis bus")?)
        }
        None => {
            warn!("CONDUIT_REDIS_URL not set; messages stay in this process");
            Arc::new(InMemoryBus::new())
        }
    };

    info!(things_url = %cfg.things_url, "http adapter configured");
    Ok(AdapterService::new(publisher, Arc::new(things)))
}
