//! Remote clients for the identity service and the registry.
//!
//! Same contracts as the in-process clients: a per-call deadline (enforced
//! by the HTTP client timeout), transport failures surfaced as
//! [`Error::Rpc`], and remote errors decoded back into the taxonomy with
//! expiry collapsed into `Unauthorized`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use conduit_authn::{AuthnClient, KeyType};
use conduit_core::{Error, Result};
use conduit_things::ThingsClient;

use crate::app::dto::{
    AccessByIdRequest, AccessByKeyRequest, ErrorBody, IdentifyRequest, IdentityResponse,
    RpcIssueRequest, ThingIdentifyRequest, TokenResponse,
};

#[derive(Debug, Clone)]
struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::rpc(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let res = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let err = match res.json::<ErrorBody>().await {
            Ok(body) => Error::from_code(&body.error, body.message),
            Err(_) => Error::rpc(format!("unexpected status {status} from {path}")),
        };
        Err(err.at_trust_boundary())
    }

    async fn call<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(path, body)
            .await?
            .json::<R>()
            .await
            .map_err(|e| Error::rpc(format!("undecodable response from {path}: {e}")))
    }
}

fn transport(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::rpc(format!("deadline exceeded: {e}"))
    } else {
        Error::rpc(e.to_string())
    }
}

/// Identity service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthnClient {
    rpc: RpcClient,
}

impl HttpAuthnClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            rpc: RpcClient::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl AuthnClient for HttpAuthnClient {
    async fn issue(&self, issuer: &str, key_type: KeyType) -> Result<String> {
        let req = RpcIssueRequest {
            issuer: issuer.to_string(),
            key_type,
        };
        let res: TokenResponse = self.rpc.call("/rpc/issue", &req).await?;
        Ok(res.value)
    }

    async fn identify(&self, token: &str) -> Result<String> {
        let req = IdentifyRequest {
            token: token.to_string(),
        };
        let res: IdentityResponse = self.rpc.call("/rpc/identify", &req).await?;
        Ok(res.id)
    }
}

/// Registry access checks over HTTP.
#[derive(Debug, Clone)]
pub struct HttpThingsClient {
    rpc: RpcClient,
}

impl HttpThingsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            rpc: RpcClient::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ThingsClient for HttpThingsClient {
    async fn can_access_by_key(&self, project_id: &str, key: &str) -> Result<String> {
        let req = AccessByKeyRequest {
            project_id: project_id.to_string(),
            key: key.to_string(),
        };
        let res: IdentityResponse = self.rpc.call("/rpc/access/key", &req).await?;
        Ok(res.id)
    }

    async fn can_access_by_id(&self, project_id: &str, thing_id: &str) -> Result<()> {
        let req = AccessByIdRequest {
            project_id: project_id.to_string(),
            thing_id: thing_id.to_string(),
        };
        self.rpc.send("/rpc/access/id", &req).await?;
        Ok(())
    }

    async fn identify(&self, key: &str) -> Result<String> {
        let req = ThingIdentifyRequest {
            key: key.to_string(),
        };
        let res: IdentityResponse = self.rpc.call("/rpc/identify", &req).await?;
        Ok(res.id)
    }
}
