use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Unit of traffic on the internal bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Wire protocol the message arrived on (`"http"`, `"mqtt"`).
    pub protocol: String,
    pub project: String,
    /// Canonical dot-separated subtopic; may be empty.
    #[serde(default)]
    pub subtopic: String,
    /// ID of the thing that published the message, stamped by the adapter.
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub payload: Vec<u8>,
    /// Unix timestamp in nanoseconds.
    pub created: i64,
}

impl Message {
    pub fn new(
        protocol: impl Into<String>,
        project: impl Into<String>,
        subtopic: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            project: project.into(),
            subtopic: subtopic.into(),
            publisher: String::new(),
            payload,
            created: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    /// Bus subject this message is published on.
    pub fn subject(&self) -> String {
        crate::subject::for_project(&self.project, &self.subtopic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_includes_subtopic_when_present() {
        let msg = Message::new("http", "p1", "", b"{}".to_vec());
        assert_eq!(msg.subject(), "projects.p1");

        let msg = Message::new("http", "p1", "room.temp", b"{}".to_vec());
        assert_eq!(msg.subject(), "projects.p1.room.temp");
    }

    #[test]
    fn json_shape_is_stable() {
        let msg = Message::new("mqtt", "p", "a.b", vec![1, 2]).with_publisher("t");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["protocol"], "mqtt");
        assert_eq!(json["publisher"], "t");
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
