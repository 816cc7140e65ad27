//! Shared tokio runtime.
//!
//! Futures produced by axis are plain `Send + 'static` futures and run on any
//! tokio runtime. This module exists for callers that live outside one, such
//! as synchronous code starting an immediate hook run.

use std::sync::OnceLock;

use tokio::runtime::Runtime;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initialize the shared runtime.
///
/// If not called explicitly, the runtime is created on first use.
pub fn init() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("axis-runtime")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Get a reference to the shared runtime.
///
/// Initializes the runtime if it hasn't been created yet.
pub fn get() -> &'static Runtime {
    init()
}

/// Block on a future using the shared runtime.
///
/// # Warning
///
/// Do not call this from within an async context, as it will block the
/// current thread and panic inside tokio.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    get().block_on(future)
}

/// Spawn a future on the current runtime if there is one, otherwise on the
/// shared runtime.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.spawn(future),
        Err(_) => get().spawn(future),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_shared_runtime() {
        assert_eq!(block_on(async { 21 * 2 }), 42);
    }

    #[test]
    fn test_spawn_outside_runtime() {
        let handle = spawn(async { "done" });
        assert_eq!(block_on(handle).unwrap(), "done");
    }
}
