// ── Identity-keyed entity cache ──
//
// At most one live instance per key. Entries are `Weak`, so the cache
// observes entity lifetime without extending it. Each entity hydrated
// here owns a `CacheLease`; dropping the entity drops the lease, which
// removes the entry exactly once.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

/// An entity kind that can be deduplicated by [`EntityCache`].
pub trait Cacheable: Sized + Send + Sync + 'static {
    /// Stable identity used as the cache key.
    type Key: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;
    /// External representation the entity is hydrated from.
    type Representation;
    /// Collaborators handed to every hydrated instance (backend, nested caches).
    type Context: Send + Sync + 'static;

    /// Human-readable kind, used in logs and errors.
    const KIND: &'static str;

    fn key_of(representation: &Self::Representation) -> Self::Key;

    /// Build a new instance. Must not emit observer events.
    fn hydrate(
        representation: Self::Representation,
        context: &Self::Context,
        lease: CacheLease<Self>,
    ) -> Self;
}

struct CacheInner<T: Cacheable> {
    entries: DashMap<T::Key, Weak<T>>,
    context: T::Context,
}

/// Process-scoped map from identity to the single live instance.
///
/// Cheap to clone; clones share the same entries.
pub struct EntityCache<T: Cacheable> {
    inner: Arc<CacheInner<T>>,
}

impl<T: Cacheable> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Cacheable> EntityCache<T> {
    pub fn new(context: T::Context) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                context,
            }),
        }
    }

    pub fn context(&self) -> &T::Context {
        &self.inner.context
    }

    /// Find-or-create for an incoming representation.
    ///
    /// A live instance wins: the incoming field values are discarded. The
    /// key's shard stays locked from lookup to registration, so concurrent
    /// first-time resolves of the same key construct a single instance.
    pub fn resolve(&self, representation: T::Representation) -> Arc<T> {
        let key = T::key_of(&representation);

        match self.inner.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    trace!(kind = T::KIND, key = %key, "cache hit");
                    return live;
                }
                let entity = Arc::new(T::hydrate(
                    representation,
                    &self.inner.context,
                    self.lease(key.clone()),
                ));
                occupied.insert(Arc::downgrade(&entity));
                debug!(kind = T::KIND, key = %key, "rehydrated stale cache entry");
                entity
            }
            Entry::Vacant(vacant) => {
                let entity = Arc::new(T::hydrate(
                    representation,
                    &self.inner.context,
                    self.lease(key.clone()),
                ));
                vacant.insert(Arc::downgrade(&entity));
                debug!(kind = T::KIND, key = %key, "hydrated new cache entry");
                entity
            }
        }
    }

    /// Pure lookup; never constructs.
    pub fn find(&self, key: &T::Key) -> Option<Arc<T>> {
        self.inner.entries.get(key).and_then(|entry| entry.upgrade())
    }

    /// Drop the entry for `key` regardless of liveness. The evicted
    /// instance stays valid for its owners but is no longer canonical.
    pub fn evict(&self, key: &T::Key) -> bool {
        let evicted = self.inner.entries.remove(key).is_some();
        if evicted {
            debug!(kind = T::KIND, key = %key, "evicted cache entry");
        }
        evicted
    }

    /// Number of entries whose instance is still alive.
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys with a live instance.
    pub fn keys(&self) -> Vec<T::Key> {
        self.inner
            .entries
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn lease(&self, key: T::Key) -> CacheLease<T> {
        CacheLease {
            cache: Some(Arc::downgrade(&self.inner)),
            key,
        }
    }
}

/// Teardown hook owned by every cache-hydrated entity.
///
/// Dropping the lease removes the entity's entry, but only while that
/// entry still points at a dead instance: a newer instance registered
/// under the same key is left alone.
pub struct CacheLease<T: Cacheable> {
    cache: Option<Weak<CacheInner<T>>>,
    key: T::Key,
}

impl<T: Cacheable> CacheLease<T> {
    /// A lease for an entity that was never registered in a cache.
    pub fn detached(key: T::Key) -> Self {
        Self { cache: None, key }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn key(&self) -> &T::Key {
        &self.key
    }
}

impl<T: Cacheable> Drop for CacheLease<T> {
    fn drop(&mut self) {
        let Some(inner) = self.cache.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let removed = inner
            .entries
            .remove_if(&self.key, |_, entry| entry.strong_count() == 0)
            .is_some();
        if removed {
            debug!(kind = T::KIND, key = %self.key, "released cache entry");
        }
    }
}

impl<T: Cacheable> fmt::Debug for CacheLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLease")
            .field("kind", &T::KIND)
            .field("key", &self.key.to_string())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Widget {
        key: String,
        label: String,
        _lease: CacheLease<Widget>,
    }

    #[derive(Default)]
    struct Builds(AtomicUsize);

    impl Cacheable for Widget {
        type Key = String;
        type Representation = (String, String);
        type Context = Builds;

        const KIND: &'static str = "widget";

        fn key_of(representation: &Self::Representation) -> String {
            representation.0.clone()
        }

        fn hydrate(
            (key, label): Self::Representation,
            context: &Builds,
            lease: CacheLease<Self>,
        ) -> Self {
            context.0.fetch_add(1, Ordering::SeqCst);
            Self {
                key,
                label,
                _lease: lease,
            }
        }
    }

    fn repr(key: &str, label: &str) -> (String, String) {
        (key.into(), label.into())
    }

    #[test]
    fn resolve_returns_existing_instance_unchanged() {
        let cache: EntityCache<Widget> = EntityCache::new(Builds::default());
        let first = cache.resolve(repr("w1", "original"));
        let second = cache.resolve(repr("w1", "ignored"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.label, "original");
        assert_eq!(cache.context().0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn find_does_not_construct() {
        let cache: EntityCache<Widget> = EntityCache::new(Builds::default());
        assert!(cache.find(&"w1".to_owned()).is_none());

        let widget = cache.resolve(repr("w1", "a"));
        assert!(Arc::ptr_eq(&cache.find(&"w1".to_owned()).unwrap(), &widget));
        assert_eq!(cache.context().0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_last_owner_releases_entry() {
        let cache: EntityCache<Widget> = EntityCache::new(Builds::default());
        let widget = cache.resolve(repr("w1", "a"));
        assert_eq!(cache.len(), 1);

        drop(widget);
        assert!(cache.find(&"w1".to_owned()).is_none());
        assert!(cache.is_empty());

        let fresh = cache.resolve(repr("w1", "b"));
        assert_eq!(fresh.label, "b");
        assert_eq!(cache.context().0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stale_lease_does_not_remove_newer_instance() {
        let cache: EntityCache<Widget> = EntityCache::new(Builds::default());
        let old = cache.resolve(repr("w1", "old"));
        cache.evict(&"w1".to_owned());
        let new = cache.resolve(repr("w1", "new"));
        assert!(!Arc::ptr_eq(&old, &new));

        drop(old);
        let found = cache.find(&"w1".to_owned()).unwrap();
        assert!(Arc::ptr_eq(&found, &new));
        assert_eq!(found.key, "w1");
    }

    #[test]
    fn concurrent_resolves_build_once() {
        let cache: EntityCache<Widget> = EntityCache::new(Builds::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.resolve(repr("shared", &format!("t{i}"))))
            })
            .collect();
        let resolved: Vec<Arc<Widget>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(resolved.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.context().0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_lease_is_inert() {
        let lease: CacheLease<Widget> = CacheLease::detached("loose".into());
        assert!(!lease.is_cached());
        assert_eq!(lease.key(), "loose");
    }
}
