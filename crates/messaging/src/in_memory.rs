//! In-memory bus for tests/dev and single-process deployments.

use std::sync::{Mutex, mpsc};

use tracing::warn;

use crate::bus::{BusError, Publisher, Subscriber, Subscription};
use crate::message::Message;
use crate::subject;

struct Route {
    pattern: String,
    tx: mpsc::Sender<Message>,
}

/// Fan-out bus: each publish is copied to every live subscription whose
/// pattern matches the subject. Dropped subscriptions are pruned on publish.
#[derive(Default)]
pub struct InMemoryBus {
    routes: Mutex<Vec<Route>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl core::fmt::Debug for InMemoryBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let routes = self.routes.lock().map(|r| r.len()).unwrap_or_default();
        f.debug_struct("InMemoryBus").field("routes", &routes).finish()
    }
}

impl Publisher for InMemoryBus {
    fn publish(&self, subject: &str, message: Message) -> Result<(), BusError> {
        if subject.split('.').any(str::is_empty) {
            return Err(BusError::InvalidSubject(subject.to_string()));
        }

        let mut routes = self.routes.lock().map_err(|_| BusError::Poisoned)?;
        routes.retain(|route| {
            if !subject::matches(&route.pattern, subject) {
                return true;
            }
            route.tx.send(message.clone()).is_ok()
        });

        Ok(())
    }
}

impl Subscriber for InMemoryBus {
    fn subscribe(&self, pattern: &str) -> Subscription<Message> {
        let (tx, rx) = mpsc::channel();

        if !subject::is_valid_pattern(pattern) {
            warn!(pattern, "ignoring subscription with invalid pattern");
            return Subscription::new(rx);
        }

        // A poisoned lock still yields a subscription; it never receives.
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                pattern: pattern.to_string(),
                tx,
            });
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(project: &str, subtopic: &str) -> Message {
        Message::new("http", project, subtopic, b"x".to_vec())
    }

    #[test]
    fn delivers_to_matching_subscriptions_only() {
        let bus = InMemoryBus::new();
        let all = bus.subscribe(subject::ALL_PROJECTS);
        let p1 = bus.subscribe("projects.p1");
        let p2 = bus.subscribe("projects.p2.>");

        let m = msg("p1", "");
        bus.publish(&m.subject(), m.clone()).unwrap();

        assert_eq!(all.try_recv().unwrap(), m);
        assert_eq!(p1.try_recv().unwrap(), m);
        assert!(p2.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let bus = InMemoryBus::new();
        let keep = bus.subscribe(subject::ALL_PROJECTS);
        drop(bus.subscribe(subject::ALL_PROJECTS));

        let m = msg("p1", "a");
        bus.publish(&m.subject(), m).unwrap();

        assert!(keep.try_recv().is_ok());
        assert_eq!(bus.routes.lock().unwrap().len(), 1);
    }

    #[test]
    fn subjects_with_empty_tokens_cannot_be_published() {
        let bus = InMemoryBus::new();
        for bad in ["", "projects..p", "projects.p."] {
            assert!(matches!(
                bus.publish(bad, msg("p", "")),
                Err(BusError::InvalidSubject(_))
            ));
        }
    }

    #[test]
    fn wildcard_tokens_in_subjects_are_literals() {
        let bus = InMemoryBus::new();
        let all = bus.subscribe("projects.p1.>");
        let exact = bus.subscribe("projects.p1.a.b");

        let m = msg("p1", "a.*");
        bus.publish(&m.subject(), m.clone()).unwrap();

        assert_eq!(all.try_recv().unwrap(), m);
        assert!(exact.try_recv().is_err());
    }
}
