//! Redis pub/sub-backed bus (feature `redis`).
//!
//! Messages travel as JSON on a Redis channel named after their subject.
//! Wildcard subscriptions use `PSUBSCRIBE`; Redis globs are looser than bus
//! patterns (`*` also spans dots), so received subjects are re-checked.
//!
//! Redis pub/sub is not durable: subscribers that are offline miss messages.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use tracing::{debug, warn};

use conduit_messaging::subject;
use conduit_messaging::{BusError, Message, Publisher, Subscriber, Subscription};

#[derive(Debug, Clone)]
pub struct RedisPubSubBus {
    client: redis::Client,
}

impl RedisPubSubBus {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| BusError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

/// Redis glob covering every subject the bus pattern can match.
fn glob_for(pattern: &str) -> String {
    pattern
        .split('.')
        .map(|t| if t == ">" { "*" } else { t })
        .collect::<Vec<_>>()
        .join(".")
}

impl Publisher for RedisPubSubBus {
    fn publish(&self, subject: &str, message: Message) -> Result<(), BusError> {
        let payload =
            serde_json::to_string(&message).map_err(|e| BusError::Encode(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| BusError::Transport(e.to_string()))?;

        let _: i64 = conn
            .publish(subject, payload)
            .map_err(|e| BusError::Transport(e.to_string()))?;

        Ok(())
    }
}

impl Subscriber for RedisPubSubBus {
    fn subscribe(&self, pattern: &str) -> Subscription<Message> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let pattern = pattern.to_string();

        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "redis subscription connection failed");
                    return;
                }
            };

            let mut pubsub = conn.as_pubsub();
            if let Err(e) = pubsub.psubscribe(glob_for(&pattern)) {
                warn!(pattern = %pattern, error = %e, "redis psubscribe failed");
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(pattern = %pattern, error = %e, "redis subscription closed");
                        return;
                    }
                };

                let channel = msg.get_channel_name().to_string();
                if !subject::matches(&pattern, &channel) {
                    continue;
                }

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let message: Message = match serde_json::from_str(&payload) {
                    Ok(m) => m,
                    Err(e) => {
                        debug!(channel = %channel, error = %e, "skipping undecodable message");
                        continue;
                    }
                };

                if tx.send(message).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}
