//! Identity-mapped entity caches.
//!
//! Each resource kind gets its own [`EntityCache`]: a concurrent map from id to
//! the latest published snapshot of the entity. Writers update under the
//! map's shard lock and publish a new `Arc` (copy-on-write), so readers holding
//! an older snapshot never observe a half-applied update. Entries live as long
//! as the registry and are never evicted.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ClientResult;
use crate::models::{Collection, Entity, Keyword, MediaEntry, Person};

pub struct EntityCache<T> {
    entries: DashMap<String, Arc<T>>,
}

impl<T: Entity + Clone> EntityCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Latest snapshot of the entity with `id`.
    pub fn find(&self, id: &str) -> Option<Arc<T>> {
        self.entries.get(id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Publishes `entity` unless its id is already cached; returns the cached
    /// instance either way.
    pub fn insert_if_absent(&self, entity: T) -> Arc<T> {
        let id = entity.id().to_string();
        Arc::clone(self.entries.entry(id).or_insert_with(|| Arc::new(entity)).value())
    }

    /// Creates the entity on first sight of `id`, then applies `update` and
    /// publishes the result. A failed update leaves the cache untouched.
    pub fn upsert<C, U>(&self, id: &str, create: C, update: U) -> ClientResult<Arc<T>>
    where
        C: FnOnce() -> T,
        U: FnOnce(&mut T) -> ClientResult<()>,
    {
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(mut slot) => {
                let mut next = T::clone(slot.get());
                update(&mut next)?;
                let published = Arc::new(next);
                slot.insert(Arc::clone(&published));
                Ok(published)
            }
            Entry::Vacant(slot) => {
                let mut entity = create();
                update(&mut entity)?;
                Ok(Arc::clone(slot.insert(Arc::new(entity)).value()))
            }
        }
    }

    /// Applies `update` to a cached entity; `None` when `id` is unknown.
    pub fn update<U>(&self, id: &str, update: U) -> Option<Arc<T>>
    where
        U: FnOnce(&mut T),
    {
        let mut slot = self.entries.get_mut(id)?;
        update(Arc::make_mut(slot.value_mut()));
        Some(Arc::clone(slot.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Entity + Clone> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EntityCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// One identity cache per resource kind, shared by every resolution task.
#[derive(Debug, Default)]
pub struct Registry {
    pub collections: EntityCache<Collection>,
    pub media_entries: EntityCache<MediaEntry>,
    pub people: EntityCache<Person>,
    pub keywords: EntityCache<Keyword>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
}
