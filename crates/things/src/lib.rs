//! `conduit-things` — the resource registry.
//!
//! Owns things (devices with their own bearer key), projects (communication
//! scopes) and the connection edges between them, and answers the access
//! checks the protocol adapters run on every message.
//!
//! Every ownership-scoped operation resolves the caller through the identity
//! service first; a client-supplied owner is never accepted.

pub mod client;
pub mod in_memory;
pub mod model;
pub mod repository;
pub mod service;

pub use client::{LocalThingsClient, ThingsClient};
pub use in_memory::InMemoryRegistry;
pub use model::{Connection, Page, PageMetadata, Project, Thing};
pub use repository::{ProjectRepository, ThingRepository};
pub use service::{MAX_LIMIT, MAX_NAME_SIZE, ThingsService};
