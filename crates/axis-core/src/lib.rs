//! Core systems for axis.
//!
//! This crate holds the pieces the networking layer builds on:
//!
//! - [`property`]: value cells with change detection
//! - [`signal`]: signal/slot notifications
//! - [`reactive`]: shared observable state built from the two above
//! - [`logging`]: tracing targets and performance spans
//! - [`runtime`]: a shared tokio runtime for callers outside one

pub mod logging;
pub mod property;
pub mod reactive;
pub mod runtime;
pub mod signal;

pub use property::Property;
pub use reactive::Reactive;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
