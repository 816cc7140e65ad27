//! Observable shared state.
//!
//! [`Reactive<T>`] is a cheaply cloneable handle to a [`Property`] paired with
//! a `changed` [`Signal`]. All clones observe the same value, which makes it
//! the building block for state that a request hook exposes to its callers:
//! the hook writes, any number of observers read or subscribe.
//!
//! # Example
//!
//! ```
//! use axis_core::Reactive;
//!
//! let loading = Reactive::new(false);
//! let view = loading.clone();
//!
//! loading.subscribe(|now| println!("loading = {now}"));
//! loading.set(true);
//! assert!(view.get());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::logging::targets;
use crate::property::Property;
use crate::signal::{ConnectionGuard, ConnectionId, Signal};

struct Inner<T> {
    value: Property<T>,
    changed: Signal<T>,
}

/// A shared, observable value.
pub struct Reactive<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Reactive<T> {
    /// Create a new reactive value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: Property::new(value),
                changed: Signal::new(),
            }),
        }
    }

    /// Get a copy of the current value.
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    /// Access the current value without cloning it.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.value.with(f)
    }

    /// Store a value and notify subscribers.
    ///
    /// Subscribers are notified on every call, even when the value is equal
    /// to the previous one.
    pub fn set(&self, value: T) {
        self.inner.value.set_silent(value.clone());
        tracing::trace!(target: targets::REACTIVE, "reactive value set");
        self.inner.changed.emit(value);
    }

    /// Store a value without notifying subscribers.
    pub fn set_silent(&self, value: T) {
        self.inner.value.set_silent(value);
    }

    /// Modify the value in place, then notify subscribers with the result.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let value = self.inner.value.update(|v| {
            f(v);
            v.clone()
        });
        self.inner.changed.emit(value);
    }

    /// Register a callback run with the new value after each write.
    pub fn subscribe<F>(&self, f: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.changed.connect(f)
    }

    /// Like [`subscribe`](Self::subscribe), but unsubscribes when the guard drops.
    pub fn subscribe_scoped<F>(&self, f: F) -> ConnectionGuard<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.changed.connect_scoped(f)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        self.inner.changed.disconnect(id)
    }

    /// The signal emitted after each write.
    pub fn changed(&self) -> &Signal<T> {
        &self.inner.changed
    }

    /// Whether two handles share the same underlying value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Reactive<T> {
    /// Store a value, notifying subscribers only if it differs from the
    /// current one. Returns whether it changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        match self.inner.value.replace(value.clone()) {
            Some(_) => {
                self.inner.changed.emit(value);
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Reactive<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive")
            .field(&self.inner.value.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_clones_share_state() {
        let a = Reactive::new(1);
        let b = a.clone();
        a.set(2);
        assert_eq!(b.get(), 2);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Reactive::new(2)));
    }

    #[test]
    fn test_set_always_notifies() {
        let r = Reactive::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        r.subscribe(move |v| seen_clone.lock().push(*v));

        r.set(1);
        r.set(1);
        assert_eq!(*seen.lock(), vec![1, 1]);
    }

    #[test]
    fn test_set_if_changed_skips_equal() {
        let r = Reactive::new("a".to_string());
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        r.subscribe(move |_| *count_clone.lock() += 1);

        assert!(!r.set_if_changed("a".to_string()));
        assert!(r.set_if_changed("b".to_string()));
        assert_eq!(*count.lock(), 1);
        assert_eq!(r.get(), "b");
    }

    #[test]
    fn test_set_silent_and_update() {
        let r = Reactive::new(vec![1]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        r.subscribe(move |v: &Vec<i32>| seen_clone.lock().push(v.len()));

        r.set_silent(vec![1, 2]);
        r.update(|v| v.push(3));
        assert_eq!(*seen.lock(), vec![3]);
        assert_eq!(r.with(|v| v.iter().sum::<i32>()), 6);
    }

    #[test]
    fn test_unsubscribe() {
        let r = Reactive::new(false);
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        let id = r.subscribe(move |_| *count_clone.lock() += 1);

        r.set(true);
        assert!(r.unsubscribe(id));
        r.set(false);
        assert_eq!(*count.lock(), 1);

        {
            let count_clone = count.clone();
            let _guard = r.subscribe_scoped(move |_| *count_clone.lock() += 10);
            r.set(true);
        }
        r.set(false);
        assert_eq!(*count.lock(), 11);
    }
}
