//! HTTP surface of the conduit services: routers, RPC clients and wiring.

pub mod app;
pub mod clients;
pub mod middleware;

pub use clients::{HttpAuthnClient, HttpThingsClient};
