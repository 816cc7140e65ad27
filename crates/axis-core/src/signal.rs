//! Signal/slot notifications.
//!
//! A [`Signal<Args>`] keeps a list of connected slots (closures) and invokes
//! each of them, in connection order, whenever the signal is emitted. Slots
//! run on the emitting thread; there is no event loop to queue onto.
//!
//! # Example
//!
//! ```
//! use axis_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//!
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;
type Connections<Args> = Mutex<SlotMap<ConnectionId, Slot<Args>>>;

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple like `(String, i32)` for multiple arguments.
///
/// # Reentrancy
///
/// The connection list is snapshotted before slots run, so a slot may connect
/// or disconnect (itself included) without deadlocking. Changes take effect
/// from the next emission.
pub struct Signal<Args> {
    connections: Arc<Connections<Args>>,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Connect a slot with automatic disconnection when the guard is dropped.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            connections: Arc::downgrade(&self.connections),
            id,
        }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Emit the signal, invoking all connected slots in connection order.
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.lock().len())
            .finish()
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// The guard only holds a weak reference to the signal's connection list, so
/// it is harmless to keep it around after the signal itself is gone.
pub struct ConnectionGuard<Args> {
    connections: Weak<Connections<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// The ID of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(connections) = self.connections.upgrade() {
            connections.lock().remove(self.id);
        }
    }
}
