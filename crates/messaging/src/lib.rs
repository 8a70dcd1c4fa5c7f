//! `conduit-messaging` — the internal bus and the topic grammar shared by the
//! protocol adapters.
//!
//! The bus is transport-agnostic: adapters publish [`Message`]s on subjects
//! and consumers subscribe with NATS-style wildcard patterns. Delivery is
//! best-effort; a failed publish is logged by the caller, never retried here.

pub mod bus;
pub mod in_memory;
pub mod message;
pub mod subject;
pub mod topic;

pub use bus::{BusError, Publisher, Subscriber, Subscription};
pub use in_memory::InMemoryBus;
pub use message::Message;
pub use topic::{Topic, parse_subtopic, parse_topic, to_wire_topic};
