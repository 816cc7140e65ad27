//! Per-hook options.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::{HookRefs, UseRequestConfig};
use crate::client::{Client, RunnerMethod};
use crate::error::{HttpError, Result};
use crate::request::{Params, RequestConfig};
use crate::response::Response;

/// Everything a request function gets for one run.
#[derive(Clone, Debug)]
pub struct RunContext<P> {
    /// The factory's client.
    pub client: Client,
    /// The token that cancels this run.
    pub token: CancellationToken,
    /// Params passed to `run`.
    pub params: Option<P>,
    /// The hook's own params, from its getter or static value.
    pub default_params: Option<P>,
    /// Progress callbacks and the token, overlaid with the hook's `config`.
    pub config: RequestConfig,
}

/// Produces the request future for one run.
pub type RequestFn<R, P> =
    Arc<dyn Fn(RunContext<P>) -> BoxFuture<'static, Result<R>> + Send + Sync>;
/// Maps a raw result to the hook's value.
pub type TransformFn<R, V> = Arc<dyn Fn(&R, &HookRefs<V>) -> V + Send + Sync>;
/// Called with the hook's state.
pub type RefsCallback<V> = Arc<dyn Fn(&HookRefs<V>) + Send + Sync>;
/// Called with a raw result.
pub type SuccessCallback<R, V> = Arc<dyn Fn(&R, &HookRefs<V>) + Send + Sync>;
/// Called with a failure.
pub type ErrorCallback<V> = Arc<dyn Fn(&HttpError, &HookRefs<V>) + Send + Sync>;

type FactoryTransform<R, V> = fn(&UseRequestConfig) -> Option<TransformFn<R, V>>;

/// The hook's own params: a value, or a getter read on every run.
#[derive(Clone)]
pub enum ParamsSource<P> {
    /// A fixed value.
    Static(P),
    /// Called on every run.
    Getter(Arc<dyn Fn() -> P + Send + Sync>),
}

impl<P: Clone> ParamsSource<P> {
    pub(crate) fn resolve(&self) -> P {
        match self {
            Self::Static(params) => params.clone(),
            Self::Getter(getter) => getter(),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for ParamsSource<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(params) => f.debug_tuple("Static").field(params).finish(),
            Self::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

/// Options for one hook.
///
/// `R` is what the request resolves to, `V` the value the hook exposes and
/// `P` the params `run` accepts.
pub struct UseRequestOptions<R, V, P> {
    pub(crate) request: RequestFn<R, P>,
    pub(crate) on_transform: TransformFn<R, V>,
    pub(crate) factory_transform: Option<FactoryTransform<R, V>>,
    pub(crate) value: Option<V>,
    pub(crate) params: Option<ParamsSource<P>>,
    /// The request merges `RunContext::default_params` itself, so an
    /// immediate run passes no call params.
    pub(crate) merges_own_params: bool,
    pub(crate) reset_value: Option<bool>,
    pub(crate) config: RequestConfig,
    pub(crate) immediate: Option<bool>,
    pub(crate) on_before: Option<RefsCallback<V>>,
    pub(crate) on_after: Option<RefsCallback<V>>,
    pub(crate) on_success: Option<SuccessCallback<R, V>>,
    pub(crate) on_error: Option<ErrorCallback<V>>,
}

impl<R, P> UseRequestOptions<R, R, P>
where
    R: Clone + Send + Sync + 'static,
    P: Send + 'static,
{
    /// Wrap a request function. The hook's value is the raw result.
    pub fn new<F, Fut>(request: F) -> Self
    where
        F: Fn(Option<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self::with_transform(request, |raw: &R, _: &HookRefs<R>| raw.clone())
    }
}

impl<R, V, P> UseRequestOptions<R, V, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    /// Wrap a request function whose result is mapped to the hook's value.
    pub fn with_transform<F, Fut, T>(request: F, transform: T) -> Self
    where
        F: Fn(Option<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        T: Fn(&R, &HookRefs<V>) -> V + Send + Sync + 'static,
    {
        Self::with_context(move |ctx: RunContext<P>| request(ctx.params), transform)
    }

    /// Wrap a request function that receives the whole [`RunContext`].
    ///
    /// Use this to issue the request through the factory's client with the
    /// hook's progress callbacks and cancellation token attached.
    pub fn with_context<F, Fut, T>(request: F, transform: T) -> Self
    where
        F: Fn(RunContext<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        T: Fn(&R, &HookRefs<V>) -> V + Send + Sync + 'static,
    {
        Self {
            request: Arc::new(move |ctx: RunContext<P>| request(ctx).boxed()),
            on_transform: Arc::new(transform),
            factory_transform: None,
            value: None,
            params: None,
            merges_own_params: false,
            reset_value: None,
            config: RequestConfig::default(),
            immediate: None,
            on_before: None,
            on_after: None,
            on_success: None,
            on_error: None,
        }
    }
}

impl UseRequestOptions<Response, Response, Params> {
    /// Bind the hook to one of the client's runners.
    ///
    /// The factory-wide `on_transform`, if any, becomes the default transform.
    pub fn client(method: RunnerMethod, url: impl Into<String>) -> Self {
        let mut options =
            Self::client_with_transform(method, url, |raw: &Response, _: &HookRefs<Response>| {
                raw.clone()
            });
        options.factory_transform =
            Some(factory_response_transform as FactoryTransform<Response, Response>);
        options
    }
}

fn factory_response_transform(
    config: &UseRequestConfig,
) -> Option<TransformFn<Response, Response>> {
    let transform = config.on_transform.clone()?;
    let wrapped: TransformFn<Response, Response> =
        Arc::new(move |raw: &Response, _: &HookRefs<Response>| transform(raw));
    Some(wrapped)
}

impl<V> UseRequestOptions<Response, V, Params> {
    /// Bind the hook to one of the client's runners, mapping responses to
    /// the hook's value.
    ///
    /// Each run sends the hook's params extended key by key with the params
    /// passed to `run`.
    pub fn client_with_transform<T>(method: RunnerMethod, url: impl Into<String>, transform: T) -> Self
    where
        T: Fn(&Response, &HookRefs<V>) -> V + Send + Sync + 'static,
    {
        let url = url.into();
        let mut options = Self::with_context(
            move |ctx: RunContext<Params>| {
                let mut params = ctx.default_params.unwrap_or_default();
                if let Some(overrides) = ctx.params {
                    params.extend(overrides);
                }
                let url = url.clone();
                let client = ctx.client;
                let config = ctx.config;
                async move { client.call(method, url, Some(params), Some(config)).await }
            },
            transform,
        );
        options.merges_own_params = true;
        options
    }
}

impl<R, V, P> UseRequestOptions<R, V, P> {
    /// Map results to the hook's value.
    pub fn on_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, &HookRefs<V>) -> V + Send + Sync + 'static,
    {
        self.on_transform = Arc::new(f);
        self.factory_transform = None;
        self
    }

    /// The initial value, also restored by a resetting run.
    pub fn value(mut self, value: V) -> Self {
        self.value = Some(value);
        self
    }

    /// Fixed params.
    pub fn params(mut self, params: P) -> Self {
        self.params = Some(ParamsSource::Static(params));
        self
    }

    /// Params read from `getter` on every run.
    pub fn params_with<F>(mut self, getter: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.params = Some(ParamsSource::Getter(Arc::new(getter)));
        self
    }

    /// Restore the initial value at the start of every run. Overrides the
    /// `reset` argument of `run`.
    pub fn reset_value(mut self, reset: bool) -> Self {
        self.reset_value = Some(reset);
        self
    }

    /// Request overrides for runs that go through the client.
    pub fn config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Run once when the hook is created.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = Some(immediate);
        self
    }

    /// Called before each run starts loading.
    pub fn on_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookRefs<V>) + Send + Sync + 'static,
    {
        self.on_before = Some(Arc::new(f));
        self
    }

    /// Called after each run settles.
    pub fn on_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&HookRefs<V>) + Send + Sync + 'static,
    {
        self.on_after = Some(Arc::new(f));
        self
    }

    /// Called with each successful result.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, &HookRefs<V>) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Called with each failure, cancellation included.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpError, &HookRefs<V>) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl<R, V, P> fmt::Debug for UseRequestOptions<R, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseRequestOptions")
            .field("reset_value", &self.reset_value)
            .field("immediate", &self.immediate)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
