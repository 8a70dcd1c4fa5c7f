use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use conduit_core::{Error, Result};
use conduit_messaging::{Message, Publisher, parse_topic};
use conduit_things::ThingsClient;

/// Protocol tag stamped on messages that entered through HTTP.
pub const PROTOCOL: &str = "http";

pub struct AdapterService {
    publisher: Arc<dyn Publisher>,
    things: Arc<dyn ThingsClient>,
}

impl AdapterService {
    pub fn new(publisher: Arc<dyn Publisher>, things: Arc<dyn ThingsClient>) -> Self {
        Self { publisher, things }
    }

    /// Build an unstamped message from a request path and body.
    ///
    /// Malformed paths are rejected here, before any access check.
    pub fn message_for_path(path: &str, payload: Vec<u8>) -> Result<Message> {
        let topic = parse_topic(path)?;
        Ok(Message::new(PROTOCOL, topic.project_id, topic.subtopic, payload))
    }

    /// Publish `msg` on behalf of the thing holding `key`.
    pub async fn publish(&self, key: &str, msg: Message) -> Result<()> {
        let started = Instant::now();
        let res = self.publish_inner(key, msg).await;
        let elapsed_us = started.elapsed().as_micros() as u64;
        match &res {
            Ok(()) => debug!(elapsed_us, "published message"),
            Err(e) if e.is_denial() => debug!(elapsed_us, error = %e, "publish denied"),
            Err(e) => warn!(elapsed_us, error = %e, "publish failed"),
        }
        res
    }

    async fn publish_inner(&self, key: &str, mut msg: Message) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Unauthorized);
        }

        let thing_id = self.things.can_access_by_key(&msg.project, key).await?;
        msg.publisher = thing_id;

        let subject = msg.subject();
        self.publisher.publish(&subject, msg)?;
        Ok(())
    }
}
