//! Reactive request state.
//!
//! A [`UseRequest`] factory holds a [`Client`] and a few defaults. Each call
//! to [`UseRequest::use_request`] produces a [`RequestHook`]: a request
//! function plus the reactive cells a UI binds to.
//!
//! ```no_run
//! use axis_net::hook::{UseRequest, UseRequestConfig, UseRequestOptions};
//! use axis_net::{Client, RunnerMethod};
//!
//! # async fn demo() -> axis_net::Result<()> {
//! let client = Client::builder().base_url("https://api.example.com").build()?;
//! let factory = UseRequest::new(UseRequestConfig::new(client));
//!
//! let users = factory.use_request(UseRequestOptions::client(RunnerMethod::Get, "/users"));
//! users.loading().subscribe(|loading| println!("loading: {loading}"));
//!
//! users.run(None, None).await?;
//! println!("status {:?}", users.value().get().map(|r| r.status));
//! # Ok(())
//! # }
//! ```
//!
//! # Lifecycle
//!
//! [`RequestHook::run`] does its setup before returning the future: a
//! cancelled token is replaced, the value is reset if asked, progress drops
//! to zero, `on_before` runs and `loading` turns on. Once the request
//! settles the value or error is recorded, `on_success` or `on_error` runs,
//! `loading` turns off and `on_after` runs.
//!
//! Runs may overlap. Each one writes the shared cells when it settles, so
//! the last to finish wins.

mod options;

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use axis_core::Reactive;
use axis_core::logging::{span_names, targets};
use axis_core::runtime;

use crate::client::Client;
use crate::error::{HttpError, Result};
use crate::request::{ProgressEvent, RequestConfig};
use crate::response::Response;

pub use options::{
    ErrorCallback, ParamsSource, RefsCallback, RequestFn, RunContext, SuccessCallback,
    TransformFn, UseRequestOptions,
};

/// Factory-wide response transform.
pub type ResponseTransform = Arc<dyn Fn(&Response) -> Response + Send + Sync>;

/// Defaults shared by every hook a [`UseRequest`] produces.
#[derive(Clone)]
pub struct UseRequestConfig {
    /// The client hooks send requests through.
    pub client: Client,
    /// Run every hook once on creation unless it says otherwise.
    pub immediate: bool,
    /// Transform for hooks built with [`UseRequestOptions::client`] that set
    /// none of their own.
    ///
    /// It maps `Response` to `Response`, so hooks with a custom request
    /// function or a typed value never see it.
    pub on_transform: Option<ResponseTransform>,
}

impl UseRequestConfig {
    /// Defaults with nothing but a client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            immediate: false,
            on_transform: None,
        }
    }

    /// Run hooks on creation by default.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Set the factory-wide transform.
    ///
    /// Only hooks from [`UseRequestOptions::client`] without their own
    /// `on_transform` apply it. Hooks from `new`, `with_transform`,
    /// `with_context` or `client_with_transform` keep their own transform.
    pub fn on_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&Response) -> Response + Send + Sync + 'static,
    {
        self.on_transform = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for UseRequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseRequestConfig")
            .field("client", &self.client)
            .field("immediate", &self.immediate)
            .field("on_transform", &self.on_transform.is_some())
            .finish()
    }
}

/// Produces request hooks that share one client and set of defaults.
#[derive(Clone, Debug)]
pub struct UseRequest {
    config: Arc<UseRequestConfig>,
}

impl UseRequest {
    /// Create a factory.
    pub fn new(config: UseRequestConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The factory's defaults.
    pub fn config(&self) -> &UseRequestConfig {
        &self.config
    }

    /// Create a hook.
    ///
    /// With `immediate` set, on the options or else on the factory, the
    /// first run is started right away with the hook's own params. It is
    /// spawned on the current tokio runtime, or on the shared runtime
    /// outside of one.
    pub fn use_request<R, V, P>(&self, options: UseRequestOptions<R, V, P>) -> RequestHook<R, V, P>
    where
        R: Send + 'static,
        V: Clone + Send + Sync + 'static,
        P: Clone + Send + Sync + 'static,
    {
        let mut options = options;
        if let Some(fallback) = options.factory_transform.take()
            && let Some(transform) = fallback(self.config())
        {
            options.on_transform = transform;
        }
        let immediate = options.immediate.unwrap_or(self.config.immediate);

        let refs = HookRefs::new(options.value.clone());
        let hook = RequestHook {
            inner: Arc::new(HookInner {
                client: self.config.client.clone(),
                options,
                refs,
            }),
            token: Arc::new(Mutex::new(CancellationToken::new())),
        };

        if immediate {
            let own = hook.resolve_own_params();
            let params = if hook.inner.options.merges_own_params {
                None
            } else {
                own.clone()
            };
            let run = hook.start(params, own, None);
            runtime::spawn(async move {
                if let Err(error) = run.await {
                    tracing::debug!(target: targets::HOOK, code = error.code(), "immediate run failed");
                }
            });
        }

        hook
    }
}

/// The reactive state of one hook.
pub struct HookRefs<V> {
    /// The latest transformed result, or the initial value.
    pub value: Reactive<Option<V>>,
    /// Whether a run is in flight.
    pub loading: Reactive<bool>,
    /// The latest failure, cleared by a successful run.
    pub error: Reactive<Option<HttpError>>,
    /// Upload progress, 0 to 100.
    pub upload_progress: Reactive<f64>,
    /// Download progress, 0 to 100.
    pub download_progress: Reactive<f64>,
}

impl<V: Clone + Send + Sync + 'static> HookRefs<V> {
    fn new(value: Option<V>) -> Self {
        Self {
            value: Reactive::new(value),
            loading: Reactive::new(false),
            error: Reactive::new(None),
            upload_progress: Reactive::new(0.0),
            download_progress: Reactive::new(0.0),
        }
    }
}

impl<V> Clone for HookRefs<V> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            loading: self.loading.clone(),
            error: self.error.clone(),
            upload_progress: self.upload_progress.clone(),
            download_progress: self.download_progress.clone(),
        }
    }
}

impl<V: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for HookRefs<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRefs")
            .field("value", &self.value.get())
            .field("loading", &self.loading.get())
            .field("error", &self.error.get())
            .field("upload_progress", &self.upload_progress.get())
            .field("download_progress", &self.download_progress.get())
            .finish()
    }
}

/// Cancels a hook's in-flight runs.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl AbortHandle {
    /// Cancel every run using the current token. The next run gets a fresh one.
    pub fn abort(&self) {
        self.token.lock().cancel();
        tracing::debug!(target: targets::HOOK, "hook aborted");
    }
}

/// The cells and abort handle returned next to the value and runner by
/// [`RequestHook::into_parts`].
#[derive(Clone)]
pub struct HookExtra {
    /// Whether a run is in flight.
    pub loading: Reactive<bool>,
    /// The latest failure.
    pub error: Reactive<Option<HttpError>>,
    /// Upload progress, 0 to 100.
    pub upload_progress: Reactive<f64>,
    /// Download progress, 0 to 100.
    pub download_progress: Reactive<f64>,
    /// Cancels in-flight runs.
    pub abort: AbortHandle,
}

struct HookInner<R, V, P> {
    client: Client,
    options: UseRequestOptions<R, V, P>,
    refs: HookRefs<V>,
}

/// Reactive state around one request function.
///
/// Cheap to clone; clones share state and cancellation.
pub struct RequestHook<R, V, P> {
    inner: Arc<HookInner<R, V, P>>,
    token: Arc<Mutex<CancellationToken>>,
}

impl<R, V, P> Clone for RequestHook<R, V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            token: Arc::clone(&self.token),
        }
    }
}

impl<R, V, P> RequestHook<R, V, P>
where
    R: Send + 'static,
    V: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// Start a run.
    ///
    /// State is updated before this returns; the returned future resolves
    /// with the raw result or rejects with the same error recorded in
    /// [`error`](Self::error). `reset` restores the initial value first,
    /// unless the hook's own `reset_value` says otherwise.
    pub fn run(&self, params: Option<P>, reset: Option<bool>) -> BoxFuture<'static, Result<R>> {
        self.start(params, self.resolve_own_params(), reset)
    }

    fn resolve_own_params(&self) -> Option<P> {
        self.inner.options.params.as_ref().map(ParamsSource::resolve)
    }

    fn start(
        &self,
        params: Option<P>,
        default_params: Option<P>,
        reset: Option<bool>,
    ) -> BoxFuture<'static, Result<R>> {
        let inner = Arc::clone(&self.inner);
        let options = &inner.options;
        let refs = &inner.refs;

        let token = {
            let mut current = self.token.lock();
            if current.is_cancelled() {
                *current = CancellationToken::new();
            }
            current.clone()
        };

        if options.reset_value.or(reset).unwrap_or(false) {
            refs.value.set(options.value.clone());
        }
        refs.upload_progress.set(0.0);
        refs.download_progress.set(0.0);
        if let Some(on_before) = &options.on_before {
            on_before(refs);
        }
        refs.loading.set(true);
        tracing::debug!(target: targets::HOOK, "run started");

        let ctx = RunContext {
            client: inner.client.clone(),
            token: token.clone(),
            params,
            default_params,
            config: self.run_config(&token),
        };
        let request = (options.request)(ctx);
        let span = tracing::debug_span!(target: targets::HOOK, "run", operation = span_names::HOOK_RUN);

        async move {
            let result = tokio::select! {
                biased;
                result = request => result,
                _ = token.cancelled() => Err(HttpError::cancelled()),
            };
            inner.settle(result)
        }
        .instrument(span)
        .boxed()
    }

    fn run_config(&self, token: &CancellationToken) -> RequestConfig {
        let upload = self.inner.refs.upload_progress.clone();
        let download = self.inner.refs.download_progress.clone();
        RequestConfig::default()
            .cancel_token(token.clone())
            .on_upload_progress(move |event: &ProgressEvent| {
                if let Some(percent) = event.percent() {
                    upload.set(percent);
                }
            })
            .on_download_progress(move |event: &ProgressEvent| {
                if let Some(percent) = event.percent() {
                    download.set(percent);
                }
            })
            .merge(&self.inner.options.config)
    }

    /// Cancel every run using the current token.
    pub fn abort(&self) {
        self.abort_handle().abort();
    }

    /// A handle that cancels this hook's runs.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            token: Arc::clone(&self.token),
        }
    }

    /// The transformed value.
    pub fn value(&self) -> &Reactive<Option<V>> {
        &self.inner.refs.value
    }

    /// Whether a run is in flight.
    pub fn loading(&self) -> &Reactive<bool> {
        &self.inner.refs.loading
    }

    /// The latest failure.
    pub fn error(&self) -> &Reactive<Option<HttpError>> {
        &self.inner.refs.error
    }

    /// Upload progress, 0 to 100.
    pub fn upload_progress(&self) -> &Reactive<f64> {
        &self.inner.refs.upload_progress
    }

    /// Download progress, 0 to 100.
    pub fn download_progress(&self) -> &Reactive<f64> {
        &self.inner.refs.download_progress
    }

    /// All cells at once.
    pub fn refs(&self) -> &HookRefs<V> {
        &self.inner.refs
    }

    /// Split into the value, a runner and everything else.
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        Reactive<Option<V>>,
        impl Fn(Option<P>, Option<bool>) -> BoxFuture<'static, Result<R>> + Clone + Send + Sync,
        HookExtra,
    ) {
        let refs = self.inner.refs.clone();
        let extra = HookExtra {
            loading: refs.loading,
            error: refs.error,
            upload_progress: refs.upload_progress,
            download_progress: refs.download_progress,
            abort: self.abort_handle(),
        };
        let hook = self;
        let run = move |params: Option<P>, reset: Option<bool>| hook.run(params, reset);
        (refs.value, run, extra)
    }
}

impl<R, V, P> HookInner<R, V, P>
where
    V: Clone + Send + Sync + 'static,
{
    fn settle(&self, result: Result<R>) -> Result<R> {
        let options = &self.options;
        let refs = &self.refs;

        match result {
            Ok(raw) => {
                refs.value.set(Some((options.on_transform)(&raw, refs)));
                refs.error.set(None);
                if let Some(on_success) = &options.on_success {
                    on_success(&raw, refs);
                }
                refs.loading.set(false);
                if let Some(on_after) = &options.on_after {
                    on_after(refs);
                }
                tracing::debug!(target: targets::HOOK, "run succeeded");
                Ok(raw)
            }
            Err(error) => {
                refs.error.set(Some(error.clone()));
                if let Some(on_error) = &options.on_error {
                    on_error(&error, refs);
                }
                refs.loading.set(false);
                if let Some(on_after) = &options.on_after {
                    on_after(refs);
                }
                tracing::debug!(target: targets::HOOK, code = error.code(), "run failed");
                Err(error)
            }
        }
    }
}

impl<R, V, P> fmt::Debug for RequestHook<R, V, P>
where
    V: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHook")
            .field("refs", &self.inner.refs)
            .field("options", &self.inner.options)
            .finish()
    }
}
