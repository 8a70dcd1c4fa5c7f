//! Broker-backed implementations of the messaging contracts.
//!
//! The contracts and the in-memory bus live in `conduit-messaging`.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::RedisPubSubBus;
