//! `conduit-mqtt` — authorization and event hooks for an MQTT broker, and
//! the forwarder that bridges internal bus traffic back onto MQTT.
//!
//! The broker engine owns sockets and sessions; this crate only decides
//! whether a CONNECT, PUBLISH or SUBSCRIBE may proceed and reacts to what
//! the broker already did.

pub mod forwarder;
pub mod handler;
pub mod session;

pub use forwarder::{Forwarder, ForwarderConfig, ForwarderHandle, ForwarderStats};
pub use handler::{HookError, MqttHandler};
pub use session::{Client, Handler};

/// Protocol tag stamped on messages that entered through MQTT.
pub const PROTOCOL: &str = "mqtt";
