use serde::{Deserialize, Serialize};

use conduit_core::Metadata;

/// A device-like resource. `key` is its own bearer secret, distinct from any
/// user credential, and unique across all owners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A communication scope. Things connected to a project may exchange
/// messages inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Authorization-bearing edge between a project and a thing.
///
/// Both sides carry their owner; the registry never assumes they match.
/// Field order gives edges of one `(project_id, thing_id)` pair a contiguous
/// range when sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub project_id: String,
    pub thing_id: String,
    pub project_owner: String,
    pub thing_owner: String,
}

impl Connection {
    pub fn owned_by(owner: &str, project_id: &str, thing_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            thing_id: thing_id.to_string(),
            project_owner: owner.to_string(),
            thing_owner: owner.to_string(),
        }
    }
}

/// Listing window and filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    /// Case-insensitive name substring filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Metadata containment filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl PageMetadata {
    pub fn window(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub meta: PageMetadata,
    pub items: Vec<T>,
}
