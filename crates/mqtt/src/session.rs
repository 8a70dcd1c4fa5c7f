//! Broker-facing session contract.
//!
//! The broker integration calls these hooks concurrently, once per client
//! connection. Every hook receives the session value explicitly; nothing is
//! remembered between calls. Arguments are optional because a misbehaving
//! integration may hand over nothing at all.

use async_trait::async_trait;

use crate::handler::HookError;

/// Identity a client presented on CONNECT.
///
/// `username` is the thing ID the client claims; `password` its thing key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub username: String,
    pub password: Vec<u8>,
}

impl Client {
    pub fn new(id: impl Into<String>, username: impl Into<String>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl core::fmt::Debug for Client {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// Before a CONNECT is accepted.
    async fn auth_connect(&self, client: Option<&Client>) -> Result<(), HookError>;

    /// Before a PUBLISH is honored.
    async fn auth_publish(
        &self,
        client: Option<&Client>,
        topic: Option<&str>,
        payload: Option<&[u8]>,
    ) -> Result<(), HookError>;

    /// Before a SUBSCRIBE is honored; every topic must pass.
    async fn auth_subscribe(
        &self,
        client: Option<&Client>,
        topics: Option<&[String]>,
    ) -> Result<(), HookError>;

    /// After the broker accepted a connection.
    fn connect(&self, client: Option<&Client>);

    /// After the broker accepted a publish.
    fn publish(&self, client: Option<&Client>, topic: Option<&str>, payload: Option<&[u8]>);

    fn subscribe(&self, client: Option<&Client>, topics: Option<&[String]>);

    fn unsubscribe(&self, client: Option<&Client>, topics: Option<&[String]>);

    /// Connection closed or lost.
    fn disconnect(&self, client: Option<&Client>);
}
