//! Identifier generation.

use uuid::Uuid;

use crate::error::Result;

/// Source of unique identifiers (key IDs, thing/project IDs) and of
/// generated thing keys.
pub trait IdProvider: Send + Sync {
    fn id(&self) -> Result<String>;

    /// A fresh bearer secret. Must not be derivable from creation time.
    fn key(&self) -> Result<String> {
        self.id()
    }
}

impl<P> IdProvider for std::sync::Arc<P>
where
    P: IdProvider + ?Sized,
{
    fn id(&self) -> Result<String> {
        (**self).id()
    }

    fn key(&self) -> Result<String> {
        (**self).key()
    }
}

/// UUID-backed provider.
///
/// IDs are UUIDv7 (time-ordered) so listings ordered by ID follow creation
/// order. Keys are UUIDv4: all random bits, no embedded timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdProvider;

impl UuidIdProvider {
    pub fn new() -> Self {
        Self
    }
}

impl IdProvider for UuidIdProvider {
    fn id(&self) -> Result<String> {
        Ok(Uuid::now_v7().to_string())
    }

    fn key(&self) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique_and_parseable() {
        let idp = UuidIdProvider::new();
        let a = idp.id().unwrap();
        let b = idp.id().unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn keys_are_random_v4_while_ids_are_time_ordered() {
        let idp = UuidIdProvider::new();

        let key = Uuid::parse_str(&idp.key().unwrap()).unwrap();
        assert_eq!(key.get_version(), Some(uuid::Version::Random));

        let id = Uuid::parse_str(&idp.id().unwrap()).unwrap();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));

        let shared: std::sync::Arc<dyn IdProvider> = std::sync::Arc::new(idp);
        let key = Uuid::parse_str(&shared.key().unwrap()).unwrap();
        assert_eq!(key.get_version(), Some(uuid::Version::Random));
    }
}
