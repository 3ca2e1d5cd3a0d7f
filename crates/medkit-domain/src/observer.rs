// ── Weak observer registry ──
//
// Subscribers are held through `Weak` handles so an entity never keeps
// its observers alive. Dead handles are skipped during delivery and
// pruned whenever the list is touched.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// A registration-ordered list of weakly held observers.
///
/// `O` is usually a trait object (`dyn PatientObserver`). Identity is the
/// address of the observer allocation, so the same observer registered
/// through two different `Arc` clones is still a single registration.
pub struct ObserverRegistry<O: ?Sized> {
    entries: Mutex<Vec<Weak<O>>>,
}

impl<O: ?Sized> ObserverRegistry<O> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer. Adding an already registered observer is a no-op.
    pub fn add(&self, observer: &Arc<O>) {
        let handle = Arc::downgrade(observer);
        let mut entries = self.entries.lock();
        entries.retain(|w| w.strong_count() > 0);
        if entries.iter().any(|w| Weak::ptr_eq(w, &handle)) {
            return;
        }
        entries.push(handle);
    }

    /// Deregister an observer. Unknown observers are ignored.
    pub fn remove(&self, observer: &Arc<O>) {
        let handle = Arc::downgrade(observer);
        self.entries
            .lock()
            .retain(|w| w.strong_count() > 0 && !Weak::ptr_eq(w, &handle));
    }

    /// Visit every live observer in registration order.
    ///
    /// The list is snapshotted before delivery, so observers may add or
    /// remove registrations from inside `visit`.
    pub fn for_each(&self, mut visit: impl FnMut(&O)) {
        let live: Vec<Arc<O>> = {
            let mut entries = self.entries.lock();
            entries.retain(|w| w.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in &live {
            visit(observer);
        }
    }

    /// Number of observers still alive.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<O: ?Sized> Default for ObserverRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    trait Listener: Send + Sync {
        fn ping(&self);
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Counter {
        fn hits(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl Listener for Counter {
        fn ping(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn as_listener(counter: &Arc<Counter>) -> Arc<dyn Listener> {
        Arc::clone(counter) as Arc<dyn Listener>
    }

    #[test]
    fn add_is_idempotent() {
        let registry: ObserverRegistry<dyn Listener> = ObserverRegistry::new();
        let counter = Arc::new(Counter::default());

        registry.add(&as_listener(&counter));
        registry.add(&as_listener(&counter));
        registry.for_each(|o| o.ping());

        assert_eq!(registry.len(), 1);
        assert_eq!(counter.hits(), 1);
    }

    #[test]
    fn remove_unknown_observer_is_noop() {
        let registry: ObserverRegistry<dyn Listener> = ObserverRegistry::new();
        let registered = Arc::new(Counter::default());
        let stranger = Arc::new(Counter::default());

        registry.add(&as_listener(&registered));
        registry.remove(&as_listener(&stranger));
        registry.remove(&as_listener(&stranger));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dropped_observer_is_skipped_and_pruned() {
        let registry: ObserverRegistry<dyn Listener> = ObserverRegistry::new();
        let keeper = Arc::new(Counter::default());
        let goner = Arc::new(Counter::default());

        registry.add(&as_listener(&goner));
        registry.add(&as_listener(&keeper));
        drop(goner);

        registry.for_each(|o| o.ping());
        assert_eq!(keeper.hits(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn delivery_follows_registration_order() {
        struct Tagged(u8, Arc<Mutex<Vec<u8>>>);
        impl Listener for Tagged {
            fn ping(&self) {
                self.1.lock().push(self.0);
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let registry: ObserverRegistry<dyn Listener> = ObserverRegistry::new();
        let observers: Vec<Arc<dyn Listener>> = (1..=3)
            .map(|tag| Arc::new(Tagged(tag, Arc::clone(&log))) as Arc<dyn Listener>)
            .collect();
        for observer in &observers {
            registry.add(observer);
        }

        registry.for_each(|o| o.ping());
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }
}
