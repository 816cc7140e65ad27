//! Request and response interceptors.
//!
//! An [`Interceptor<V>`] is a pair of optional async hooks run on one leg of
//! a request: `on_fulfilled` sees successful values, `on_rejected` sees
//! errors. Either hook may turn one into the other. A chain of interceptors
//! is threaded over a `Result<V>`, in registration order.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;

use crate::error::{HttpError, Result};
use crate::request::RequestConfig;
use crate::response::Response;

/// Hook run on a successful value.
pub type FulfilledFn<V> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<V>> + Send + Sync>;
/// Hook run on an error.
pub type RejectedFn<V> = Arc<dyn Fn(HttpError) -> BoxFuture<'static, Result<V>> + Send + Sync>;
/// Predicate deciding whether a request interceptor runs for a request.
pub type RunWhen = Arc<dyn Fn(&RequestConfig) -> bool + Send + Sync>;

/// Per-registration options.
#[derive(Clone, Default)]
pub struct InterceptorOptions {
    /// When set and returning `false`, the request interceptor is skipped
    /// for that request. Ignored for response interceptors.
    pub run_when: Option<RunWhen>,
}

impl InterceptorOptions {
    /// Set the `run_when` predicate.
    pub fn run_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestConfig) -> bool + Send + Sync + 'static,
    {
        self.run_when = Some(Arc::new(f));
        self
    }

    fn should_run(&self, config: &RequestConfig) -> bool {
        self.run_when.as_ref().is_none_or(|f| f(config))
    }
}

impl fmt::Debug for InterceptorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorOptions")
            .field("run_when", &self.run_when.is_some())
            .finish()
    }
}

/// A pair of hooks for one leg of the request pipeline.
pub struct Interceptor<V> {
    /// Hook for successful values.
    pub on_fulfilled: Option<FulfilledFn<V>>,
    /// Hook for errors.
    pub on_rejected: Option<RejectedFn<V>>,
    /// Registration options.
    pub options: InterceptorOptions,
}

/// An interceptor on the outbound leg.
pub type RequestInterceptor = Interceptor<RequestConfig>;
/// An interceptor on the inbound leg.
pub type ResponseInterceptor = Interceptor<Response>;

impl<V> Clone for Interceptor<V> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: self.on_fulfilled.clone(),
            on_rejected: self.on_rejected.clone(),
            options: self.options.clone(),
        }
    }
}

impl<V> Default for Interceptor<V> {
    fn default() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
            options: InterceptorOptions::default(),
        }
    }
}

impl<V: Send + 'static> Interceptor<V> {
    /// Create an interceptor that passes everything through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook for successful values.
    pub fn on_fulfilled<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        self.on_fulfilled = Some(Arc::new(move |value| f(value).boxed()));
        self
    }

    /// Set the hook for errors.
    pub fn on_rejected<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HttpError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        self.on_rejected = Some(Arc::new(move |error| f(error).boxed()));
        self
    }

    /// Set the registration options.
    pub fn options(mut self, options: InterceptorOptions) -> Self {
        self.options = options;
        self
    }

    /// Feed one state of the chain through this interceptor.
    pub async fn apply(&self, state: Result<V>) -> Result<V> {
        match state {
            Ok(value) => match &self.on_fulfilled {
                Some(f) => f(value).await,
                None => Ok(value),
            },
            Err(error) => match &self.on_rejected {
                Some(f) => f(error).await,
                None => Err(error),
            },
        }
    }
}

impl<V> fmt::Debug for Interceptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// Identifies a registered interceptor, for ejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(u64);

/// An ordered list of registered interceptors.
pub struct InterceptorManager<V> {
    entries: RwLock<Vec<(InterceptorId, Interceptor<V>)>>,
    next_id: AtomicU64,
}

impl<V> Default for InterceptorManager<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<V: Send + 'static> InterceptorManager<V> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor to the chain.
    pub fn register(&self, interceptor: Interceptor<V>) -> InterceptorId {
        let id = InterceptorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, interceptor));
        id
    }

    /// Remove an interceptor. Returns `true` if it was registered.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Remove every interceptor.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of registered interceptors.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no interceptor is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The registered interceptors, in order.
    pub fn snapshot(&self) -> Vec<Interceptor<V>> {
        self.entries
            .read()
            .iter()
            .map(|(_, interceptor)| interceptor.clone())
            .collect()
    }

    /// Thread `state` through every registered interceptor.
    pub async fn run(&self, state: Result<V>) -> Result<V> {
        run_chain(self.snapshot(), state).await
    }
}

impl InterceptorManager<RequestConfig> {
    /// Thread a request config through the interceptors whose `run_when`
    /// accepts it. The predicate is evaluated once, against the initial config.
    pub async fn run_request(&self, config: RequestConfig) -> Result<RequestConfig> {
        let chain: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|i| i.options.should_run(&config))
            .collect();
        run_chain(chain, Ok(config)).await
    }
}

impl<V> fmt::Debug for InterceptorManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("len", &self.entries.read().len())
            .finish()
    }
}

async fn run_chain<V: Send + 'static>(chain: Vec<Interceptor<V>>, state: Result<V>) -> Result<V> {
    let mut state = state;
    for interceptor in &chain {
        state = interceptor.apply(state).await;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HttpMethod;

    fn tagging(tag: &'static str) -> RequestInterceptor {
        Interceptor::new().on_fulfilled(move |mut config: RequestConfig| async move {
            config.url.push_str(tag);
            Ok(config)
        })
    }

    #[tokio::test]
    async fn test_registration_order() {
        let manager = InterceptorManager::new();
        manager.register(tagging("a"));
        manager.register(tagging("b"));
        manager.register(tagging("c"));

        let config = manager
            .run_request(RequestConfig::new(HttpMethod::Get, "/"))
            .await
            .unwrap();
        assert_eq!(config.url, "/abc");
    }

    #[tokio::test]
    async fn test_eject() {
        let manager = InterceptorManager::new();
        manager.register(tagging("a"));
        let b = manager.register(tagging("b"));

        assert!(manager.eject(b));
        assert!(!manager.eject(b));
        assert_eq!(manager.len(), 1);

        let config = manager
            .run_request(RequestConfig::new(HttpMethod::Get, "/"))
            .await
            .unwrap();
        assert_eq!(config.url, "/a");
    }

    #[tokio::test]
    async fn test_run_when_skips() {
        let manager = InterceptorManager::new();
        manager.register(tagging("x").options(
            InterceptorOptions::default().run_when(|c| c.method == HttpMethod::Post),
        ));

        let get = manager
            .run_request(RequestConfig::new(HttpMethod::Get, "/"))
            .await
            .unwrap();
        assert_eq!(get.url, "/");

        let post = manager
            .run_request(RequestConfig::new(HttpMethod::Post, "/"))
            .await
            .unwrap();
        assert_eq!(post.url, "/x");
    }

    #[tokio::test]
    async fn test_rejection_recovery() {
        let manager: InterceptorManager<RequestConfig> = InterceptorManager::new();
        manager.register(Interceptor::new().on_fulfilled(|_config: RequestConfig| async {
            Err(HttpError::network("refused"))
        }));
        manager.register(tagging("never"));
        manager.register(Interceptor::new().on_rejected(|error: HttpError| async move {
            assert_eq!(error.code(), "ERR_NETWORK");
            Ok(RequestConfig::new(HttpMethod::Get, "/recovered"))
        }));

        let config = manager
            .run(Ok(RequestConfig::new(HttpMethod::Get, "/")))
            .await
            .unwrap();
        assert_eq!(config.url, "/recovered");
    }

    #[tokio::test]
    async fn test_passthrough_without_hooks() {
        let manager: InterceptorManager<RequestConfig> = InterceptorManager::new();
        manager.register(Interceptor::new());

        let err = manager.run(Err(HttpError::cancelled())).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!manager.is_empty());
        manager.clear();
        assert!(manager.is_empty());
    }
}
