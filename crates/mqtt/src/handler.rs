//! Session hooks backed by the registry's access checks.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use conduit_core::Error;
use conduit_messaging::{Message, Publisher, parse_topic};
use conduit_things::ThingsClient;

use crate::PROTOCOL;
use crate::session::{Client, Handler};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("CONNECT request with invalid username or client ID")]
    InvalidConnect,

    #[error("using nil client")]
    NilClient,

    #[error("PUBLISH to nil topic")]
    NilTopicPublish,

    #[error("SUBSCRIBE to nil topic")]
    NilTopicSubscribe,

    #[error(transparent)]
    Core(#[from] Error),
}

/// Hook implementation.
///
/// Holds no per-client state: every authorization hook performs a fresh
/// registry call, so concurrent invocation needs no locking.
pub struct MqttHandler {
    things: Arc<dyn ThingsClient>,
    publishers: Vec<Arc<dyn Publisher>>,
}

impl MqttHandler {
    pub fn new(things: Arc<dyn ThingsClient>, publishers: Vec<Arc<dyn Publisher>>) -> Self {
        Self { things, publishers }
    }

    /// Canonicalize `topic` and check the client's thing is connected to its
    /// project.
    async fn authorize(&self, thing_id: &str, topic: &str) -> Result<(), HookError> {
        let topic = parse_topic(topic).inspect_err(|e| {
            info!(topic, error = %e, "rejected malformed topic");
        })?;
        self.things
            .can_access_by_id(&topic.project_id, thing_id)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Handler for MqttHandler {
    async fn auth_connect(&self, client: Option<&Client>) -> Result<(), HookError> {
        let client = client.ok_or(HookError::InvalidConnect)?;

        let key = std::str::from_utf8(&client.password).map_err(|_| Error::Unauthorized)?;
        let thing_id = self.things.identify(key).await?;
        if thing_id != client.username {
            return Err(Error::Unauthorized.into());
        }

        Ok(())
    }

    async fn auth_publish(
        &self,
        client: Option<&Client>,
        topic: Option<&str>,
        _payload: Option<&[u8]>,
    ) -> Result<(), HookError> {
        let client = client.ok_or(HookError::NilClient)?;
        let topic = topic.ok_or(HookError::NilTopicPublish)?;

        self.authorize(&client.username, topic).await
    }

    async fn auth_subscribe(
        &self,
        client: Option<&Client>,
        topics: Option<&[String]>,
    ) -> Result<(), HookError> {
        let client = client.ok_or(HookError::NilClient)?;
        let topics = topics.ok_or(HookError::NilTopicSubscribe)?;

        for topic in topics {
            self.authorize(&client.username, topic).await?;
        }
        Ok(())
    }

    fn connect(&self, client: Option<&Client>) {
        match client {
            Some(c) => info!(client_id = %c.id, "client connected"),
            None => error!("nil client connect"),
        }
    }

    fn publish(&self, client: Option<&Client>, topic: Option<&str>, payload: Option<&[u8]>) {
        let Some(client) = client else {
            error!("nil client publish");
            return;
        };
        let Some(topic) = topic else {
            error!(client_id = %client.id, "publish to nil topic");
            return;
        };
        info!(client_id = %client.id, topic, "client published");

        let parsed = match parse_topic(topic) {
            Ok(t) => t,
            Err(e) => {
                info!(client_id = %client.id, topic, error = %e, "dropping publish with malformed topic");
                return;
            }
        };

        let msg = Message::new(
            PROTOCOL,
            parsed.project_id,
            parsed.subtopic,
            payload.map(<[u8]>::to_vec).unwrap_or_default(),
        )
        .with_publisher(client.username.clone());
        let subject = msg.subject();

        for publisher in &self.publishers {
            if let Err(e) = publisher.publish(&subject, msg.clone()) {
                warn!(client_id = %client.id, subject = %subject, error = %e, "failed to publish to bus");
            }
        }
    }

    fn subscribe(&self, client: Option<&Client>, topics: Option<&[String]>) {
        match client {
            Some(c) => info!(
                client_id = %c.id,
                topics = %topics.unwrap_or_default().join(","),
                "client subscribed"
            ),
            None => error!("nil client subscribe"),
        }
    }

    fn unsubscribe(&self, client: Option<&Client>, topics: Option<&[String]>) {
        match client {
            Some(c) => info!(
                client_id = %c.id,
                topics = %topics.unwrap_or_default().join(","),
                "client unsubscribed"
            ),
            None => error!("nil client unsubscribe"),
        }
    }

    fn disconnect(&self, client: Option<&Client>) {
        match client {
            Some(c) => info!(client_id = %c.id, username = %c.username, "client disconnected"),
            None => error!("nil client disconnect"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::Result;
    use conduit_messaging::{BusError, InMemoryBus, Subscriber};
    use std::sync::Mutex;

    /// Registry stub: thing "t1" holds key "k1" and is connected to "p1".
    struct Registry;

    #[async_trait]
    impl ThingsClient for Registry {
        async fn can_access_by_key(&self, project_id: &str, key: &str) -> Result<String> {
            match (project_id, key) {
                ("p1", "k1") => Ok("t1".into()),
                _ => Err(Error::Unauthorized),
            }
        }

        async fn can_access_by_id(&self, project_id: &str, thing_id: &str) -> Result<()> {
            match (project_id, thing_id) {
                ("p1", "t1") => Ok(()),
                ("down", _) => Err(Error::rpc("registry unavailable")),
                _ => Err(Error::Unauthorized),
            }
        }

        async fn identify(&self, key: &str) -> Result<String> {
            match key {
                "k1" => Ok("t1".into()),
                "k2" => Ok("t2".into()),
                _ => Err(Error::Unauthorized),
            }
        }
    }

    struct Failing;

    impl Publisher for Failing {
        fn publish(&self, _subject: &str, _message: Message) -> std::result::Result<(), BusError> {
            Err(BusError::Transport("down".into()))
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<(String, Message)>>);

    impl Publisher for Recording {
        fn publish(&self, subject: &str, message: Message) -> std::result::Result<(), BusError> {
            self.0.lock().unwrap().push((subject.to_string(), message));
            Ok(())
        }
    }

    fn handler(publishers: Vec<Arc<dyn Publisher>>) -> MqttHandler {
        MqttHandler::new(Arc::new(Registry), publishers)
    }

    fn device() -> Client {
        Client::new("c1", "t1", "k1")
    }

    #[tokio::test]
    async fn connect_requires_matching_username() {
        let h = handler(vec![]);
        h.auth_connect(Some(&device())).await.unwrap();

        // Valid key, but for a different thing.
        let spoof = Client::new("c2", "t1", "k2");
        assert_eq!(
            h.auth_connect(Some(&spoof)).await,
            Err(HookError::Core(Error::Unauthorized))
        );

        let bad = Client::new("c3", "t1", "nope");
        assert_eq!(
            h.auth_connect(Some(&bad)).await,
            Err(HookError::Core(Error::Unauthorized))
        );

        let binary = Client::new("c4", "t1", vec![0xff, 0xfe, b'k']);
        assert_eq!(
            h.auth_connect(Some(&binary)).await,
            Err(HookError::Core(Error::Unauthorized))
        );

        assert_eq!(h.auth_connect(None).await, Err(HookError::InvalidConnect));
    }

    #[tokio::test]
    async fn publish_checks_edge_for_the_topic_project() {
        let h = handler(vec![]);
        let c = device();

        h.auth_publish(Some(&c), Some("projects/p1/messages/a/b"), None)
            .await
            .unwrap();
        assert_eq!(
            h.auth_publish(Some(&c), Some("projects/p2/messages"), None).await,
            Err(HookError::Core(Error::Unauthorized))
        );
        assert_eq!(
            h.auth_publish(Some(&c), Some("devices/p1"), None).await,
            Err(HookError::Core(Error::MalformedData))
        );
        assert_eq!(
            h.auth_publish(Some(&c), Some("projects/p1/messages/a*"), None).await,
            Err(HookError::Core(Error::MalformedSubtopic))
        );
        assert_eq!(
            h.auth_publish(None, Some("projects/p1/messages"), None).await,
            Err(HookError::NilClient)
        );
        assert_eq!(
            h.auth_publish(Some(&c), None, None).await,
            Err(HookError::NilTopicPublish)
        );
    }

    #[tokio::test]
    async fn registry_outage_is_not_a_denial() {
        let h = handler(vec![]);
        let res = h.auth_publish(Some(&device()), Some("projects/down/messages"), None).await;
        assert!(matches!(res, Err(HookError::Core(Error::Rpc(_)))));
    }

    #[tokio::test]
    async fn subscribe_stops_at_first_denied_topic() {
        let h = handler(vec![]);
        let c = device();

        let ok = vec!["projects/p1/messages".to_string(), "projects/p1/messages/x".to_string()];
        h.auth_subscribe(Some(&c), Some(&ok)).await.unwrap();

        let mixed = vec!["projects/p1/messages".to_string(), "projects/p9/messages".to_string()];
        assert_eq!(
            h.auth_subscribe(Some(&c), Some(&mixed)).await,
            Err(HookError::Core(Error::Unauthorized))
        );
        assert_eq!(
            h.auth_subscribe(Some(&c), None).await,
            Err(HookError::NilTopicSubscribe)
        );
    }

    #[test]
    fn publish_hook_fans_out_past_failures() {
        let bus = Arc::new(InMemoryBus::new());
        let sub = bus.subscribe("projects.>");
        let recording = Arc::new(Recording::default());
        let h = handler(vec![Arc::new(Failing), bus.clone(), recording.clone()]);

        h.publish(Some(&device()), Some("/projects/p1/messages/a%2Fb"), Some(&b"23.5"[..]));

        let msg = sub.try_recv().unwrap();
        assert_eq!(msg.protocol, PROTOCOL);
        assert_eq!(msg.project, "p1");
        assert_eq!(msg.subtopic, "a.b");
        assert_eq!(msg.publisher, "t1");
        assert_eq!(msg.payload, b"23.5");

        let recorded = recording.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "projects.p1.a.b");
    }

    #[test]
    fn notification_hooks_tolerate_missing_arguments() {
        let recording = Arc::new(Recording::default());
        let h = handler(vec![recording.clone()]);

        h.connect(None);
        h.publish(None, Some("projects/p1/messages"), None);
        h.publish(Some(&device()), None, None);
        h.publish(Some(&device()), Some("bogus"), None);
        h.subscribe(None, None);
        h.subscribe(Some(&device()), None);
        h.unsubscribe(None, None);
        h.disconnect(None);

        assert!(recording.0.lock().unwrap().is_empty());
    }
}
