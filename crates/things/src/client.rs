//! Access checks as seen by the protocol adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use conduit_core::{Result, with_deadline};

use crate::service::ThingsService;

#[async_trait]
pub trait ThingsClient: Send + Sync {
    /// Thing ID for `key` if that thing is connected to `project_id`.
    async fn can_access_by_key(&self, project_id: &str, key: &str) -> Result<String>;

    async fn can_access_by_id(&self, project_id: &str, thing_id: &str) -> Result<()>;

    /// Thing ID for `key`, without an edge check.
    async fn identify(&self, key: &str) -> Result<String>;
}

#[async_trait]
impl<C> ThingsClient for Arc<C>
where
    C: ThingsClient + ?Sized,
{
    async fn can_access_by_key(&self, project_id: &str, key: &str) -> Result<String> {
        (**self).can_access_by_key(project_id, key).await
    }

    async fn can_access_by_id(&self, project_id: &str, thing_id: &str) -> Result<()> {
        (**self).can_access_by_id(project_id, thing_id).await
    }

    async fn identify(&self, key: &str) -> Result<String> {
        (**self).identify(key).await
    }
}

/// In-process client with the same deadline contract as a remote one.
pub struct LocalThingsClient {
    svc: Arc<ThingsService>,
    timeout: Duration,
}

impl LocalThingsClient {
    pub fn new(svc: Arc<ThingsService>, timeout: Duration) -> Self {
        Self { svc, timeout }
    }
}

#[async_trait]
impl ThingsClient for LocalThingsClient {
    async fn can_access_by_key(&self, project_id: &str, key: &str) -> Result<String> {
        with_deadline(self.timeout, self.svc.can_access_by_key(project_id, key))
            .await
            .map_err(|e| e.at_trust_boundary())
    }

    async fn can_access_by_id(&self, project_id: &str, thing_id: &str) -> Result<()> {
        with_deadline(self.timeout, self.svc.can_access_by_id(project_id, thing_id))
            .await
            .map_err(|e| e.at_trust_boundary())
    }

    async fn identify(&self, key: &str) -> Result<String> {
        with_deadline(self.timeout, self.svc.identify(key))
            .await
            .map_err(|e| e.at_trust_boundary())
    }
}
