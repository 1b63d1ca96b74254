//! Object stores the collector reads snapshots from

use std::sync::Arc;
use thiserror::Error;

/// Errors returned when a snapshot cannot be listed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store has not completed its initial list yet
    #[error("store has not completed its initial sync")]
    NotSynced,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the current set of objects of one kind
///
/// Implementations must be safe for concurrent reads. The returned snapshot
/// is treated as immutable for the duration of a generation pass.
pub trait ObjectStore<K>: Send + Sync {
    fn list(&self) -> Result<Vec<Arc<K>>, StoreError>;
}

/// Store over a fixed snapshot
#[derive(Debug, Clone)]
pub struct StaticStore<K> {
    objects: Result<Vec<Arc<K>>, StoreError>,
}

impl<K> StaticStore<K> {
    pub fn new(objects: impl IntoIterator<Item = K>) -> Self {
        Self {
            objects: Ok(objects.into_iter().map(Arc::new).collect()),
        }
    }

    /// A store whose every list call fails
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            objects: Err(StoreError::Unavailable(reason.into())),
        }
    }
}

impl<K: Send + Sync> ObjectStore<K> for StaticStore<K> {
    fn list(&self) -> Result<Vec<Arc<K>>, StoreError> {
        self.objects.clone()
    }
}
