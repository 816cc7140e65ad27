//! Value cells with change detection.
//!
//! A [`Property<T>`] owns a value behind a lock and reports whether a write
//! actually changed it. It carries no subscribers of its own; pair it with a
//! [`Signal`](crate::Signal) (or use [`Reactive`](crate::Reactive), which does
//! exactly that) when observers need to hear about writes.
//!
//! # Example
//!
//! ```
//! use axis_core::property::Property;
//!
//! let loading = Property::new(false);
//! assert!(loading.set(true));
//! assert!(!loading.set(true));
//! assert!(loading.get());
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A value cell that tracks changes.
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`
/// whenever `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, consider using `with()` instead.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Mutate the value in place.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(&mut self.value.write())
    }

    /// Set the value unconditionally.
    ///
    /// No comparison is made, so this works for types without `PartialEq`.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }

    /// Set the value and return the previous one.
    pub fn swap(&self, value: T) -> T {
        std::mem::replace(&mut *self.value.write(), value)
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// If the new value equals the current one the property is left alone.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}
