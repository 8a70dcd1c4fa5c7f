//! `conduit-core` — shared building blocks for every conduit service.
//!
//! Pure types only: the error taxonomy callers observe, identifier
//! generation, entity metadata and the deadline helper used by RPC clients.

pub mod deadline;
pub mod error;
pub mod id;
pub mod metadata;

pub use deadline::with_deadline;
pub use error::{Error, Result};
pub use id::{IdProvider, UuidIdProvider};
pub use metadata::Metadata;
