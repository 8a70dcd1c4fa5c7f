//! Publish/subscribe contracts.
//!
//! Subjects are dot-separated (`projects.<id>[.<subtopic>]`). Subscriptions
//! take a pattern where `*` matches exactly one token and a trailing `>`
//! matches one or more tokens; see [`crate::subject`]. In a published
//! subject those characters are plain tokens.
//!
//! Each subscription receives its own copy of every matching message.
//! Consumers drain it on a thread they own:
//!
//! ```ignore
//! let sub = bus.subscribe("projects.>");
//! loop {
//!     match sub.recv_timeout(Duration::from_millis(100)) {
//!         Ok(msg) => handle(msg),
//!         Err(RecvTimeoutError::Timeout) => continue,
//!         Err(RecvTimeoutError::Disconnected) => break,
//!     }
//! }
//! ```

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use thiserror::Error;

use conduit_core::Error;

use crate::message::Message;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Internal lock poisoned.
    #[error("bus lock poisoned")]
    Poisoned,

    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    #[error("failed to encode message: {0}")]
    Encode(String),

    /// Broker or network failure.
    #[error("bus transport failure: {0}")]
    Transport(String),
}

impl From<BusError> for Error {
    fn from(value: BusError) -> Self {
        match value {
            BusError::InvalidSubject(_) => Error::MalformedData,
            other => Error::rpc(other.to_string()),
        }
    }
}

/// Stream of messages matching one subscription pattern.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Anything a message can be handed to: the internal bus, or a downstream
/// wire-protocol broker (where `subject` is a wire topic).
pub trait Publisher: Send + Sync {
    fn publish(&self, subject: &str, message: Message) -> Result<(), BusError>;
}

pub trait Subscriber: Send + Sync {
    fn subscribe(&self, pattern: &str) -> Subscription<Message>;
}

impl<P> Publisher for Arc<P>
where
    P: Publisher + ?Sized,
{
    fn publish(&self, subject: &str, message: Message) -> Result<(), BusError> {
        (**self).publish(subject, message)
    }
}

impl<S> Subscriber for Arc<S>
where
    S: Subscriber + ?Sized,
{
    fn subscribe(&self, pattern: &str) -> Subscription<Message> {
        (**self).subscribe(pattern)
    }
}
