//! `conduit-http` — the HTTP protocol adapter.
//!
//! One request is one step: canonicalize the path, check the presented thing
//! key against the project, stamp the publisher and hand the message to the
//! bus. A denied request has no effect.

pub mod adapter;

pub use adapter::{AdapterService, PROTOCOL};
