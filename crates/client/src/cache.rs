//! Tag-invalidated query cache
//!
//! Each entry remembers the tags it provides. A mutation invalidates by
//! tag, and the next read of any dropped entry goes back to the server.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// Id used by the tag every list query of a resource type provides
pub const LIST_ID: &str = "LIST";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub resource_type: String,
    pub id: String,
}

impl Tag {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn list(resource_type: impl Into<String>) -> Self {
        Self::new(resource_type, LIST_ID)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    tags: Vec<Tag>,
}

/// Concurrent key → snapshot store shared by all services
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value under `key`, if present and of type `T`
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let value = self
            .entries
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<T>().cloned());
        tracing::debug!(key, hit = value.is_some(), "Query cache lookup");
        value
    }

    pub fn insert<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        value: T,
        tags: Vec<Tag>,
    ) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value: Arc::new(value),
                tags,
            },
        );
    }

    /// Drop every entry providing any of `tags`; returns how many were dropped
    pub fn invalidate(&self, tags: &[Tag]) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.tags.iter().any(|tag| tags.contains(tag)));
        let dropped = before.saturating_sub(self.entries.len());

        if dropped > 0 {
            let tags: Vec<String> = tags.iter().map(Tag::to_string).collect();
            tracing::debug!(?tags, dropped, "Query cache invalidated");
        }
        dropped
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
