//! The client factory.
//!
//! A [`Client`] wraps a [`Transport`] with three things: one shorthand
//! runner per verb and response type (or body encoding), a set of default
//! headers, and request/response interceptor chains.
//!
//! ```no_run
//! use axis_net::{Client, RunnerMethod};
//! use serde_json::json;
//!
//! # async fn demo() -> axis_net::Result<()> {
//! let client = Client::builder().base_url("https://api.example.com").build()?;
//!
//! let params = json!({ "page": 2 }).as_object().cloned();
//! let users = client.get("/users", params, None).await?;
//!
//! let body = json!({ "name": "ada" }).as_object().cloned();
//! client.call(RunnerMethod::PostUrlEncoded, "/users", body, None).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::HeaderMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::Instrument;

use axis_core::logging::{PerfSpan, span_names, targets};

use crate::config::{ClientBuilder, ClientConfig};
use crate::encoding;
use crate::error::{HttpError, Result};
use crate::interceptor::{
    InterceptorId, InterceptorManager, RequestInterceptor, ResponseInterceptor,
};
use crate::request::{HttpMethod, Params, RequestBody, RequestConfig, ResponseType};
use crate::response::Response;
use crate::transport::Transport;

/// How a write runner encodes its params into the body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyEncoding {
    /// `application/json`.
    Json,
    /// `application/x-www-form-urlencoded`, with bracket notation for nesting.
    UrlEncoded,
    /// `multipart/form-data`, one text field per top-level key.
    Multipart,
}

impl BodyEncoding {
    /// The content type announced for this encoding.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::UrlEncoded => "application/x-www-form-urlencoded",
            Self::Multipart => "multipart/form-data",
        }
    }
}

/// What a runner does with its params.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Runner {
    /// Params become the query string; the response type is fixed.
    Fetch {
        /// The request method.
        method: HttpMethod,
        /// The response type requested.
        response_type: ResponseType,
    },
    /// Params become the body.
    Modify {
        /// The request method.
        method: HttpMethod,
        /// How the body is encoded.
        encoding: BodyEncoding,
    },
}

impl Runner {
    /// The request method.
    pub fn method(self) -> HttpMethod {
        match self {
            Self::Fetch { method, .. } | Self::Modify { method, .. } => method,
        }
    }
}

macro_rules! runner_table {
    (
        fetch { $($fvariant:ident => $fname:ident, $fmethod:ident, $ftype:ident;)* }
        modify { $($mvariant:ident => $mname:ident, $mmethod:ident, $menc:ident;)* }
    ) => {
        /// Every shorthand runner a [`Client`] offers.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RunnerMethod {
            $(
                #[doc = concat!("[`Client::", stringify!($fname), "`]")]
                $fvariant,
            )*
            $(
                #[doc = concat!("[`Client::", stringify!($mname), "`]")]
                $mvariant,
            )*
        }

        impl RunnerMethod {
            /// All runners, in declaration order.
            pub const ALL: &'static [RunnerMethod] = &[
                $(RunnerMethod::$fvariant,)*
                $(RunnerMethod::$mvariant,)*
            ];

            /// The runner's method name on [`Client`].
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$fvariant => stringify!($fname),)*
                    $(Self::$mvariant => stringify!($mname),)*
                }
            }

            /// What this runner does.
            pub fn runner(self) -> Runner {
                RUNNERS[self as usize]
            }
        }

        const RUNNERS: &[Runner] = &[
            $(Runner::Fetch { method: HttpMethod::$fmethod, response_type: ResponseType::$ftype },)*
            $(Runner::Modify { method: HttpMethod::$mmethod, encoding: BodyEncoding::$menc },)*
        ];

        impl Client {
            $(
                #[doc = concat!("`", stringify!($fmethod), "` decoded as `", stringify!($ftype), "`; `params` become the query string.")]
                pub async fn $fname(
                    &self,
                    url: impl Into<String>,
                    params: Option<Params>,
                    config: Option<RequestConfig>,
                ) -> Result<Response> {
                    self.call(RunnerMethod::$fvariant, url, params, config).await
                }
            )*
            $(
                #[doc = concat!("`", stringify!($mmethod), "` with a `", stringify!($menc), "` body built from `params`.")]
                pub async fn $mname(
                    &self,
                    url: impl Into<String>,
                    params: Option<Params>,
                    config: Option<RequestConfig>,
                ) -> Result<Response> {
                    self.call(RunnerMethod::$mvariant, url, params, config).await
                }
            )*
        }
    };
}

runner_table! {
    fetch {
        Get => get, Get, Json;
        GetBlob => get_blob, Get, Blob;
        GetDocument => get_document, Get, Document;
        GetArrayBuffer => get_array_buffer, Get, ArrayBuffer;
        GetText => get_text, Get, Text;
        GetStream => get_stream, Get, Stream;

        Head => head, Head, Json;
        HeadBlob => head_blob, Head, Blob;
        HeadDocument => head_document, Head, Document;
        HeadArrayBuffer => head_array_buffer, Head, ArrayBuffer;
        HeadText => head_text, Head, Text;
        HeadStream => head_stream, Head, Stream;

        Options => options, Options, Json;
        OptionsBlob => options_blob, Options, Blob;
        OptionsDocument => options_document, Options, Document;
        OptionsArrayBuffer => options_array_buffer, Options, ArrayBuffer;
        OptionsText => options_text, Options, Text;
        OptionsStream => options_stream, Options, Stream;

        Delete => delete, Delete, Json;
        DeleteBlob => delete_blob, Delete, Blob;
        DeleteDocument => delete_document, Delete, Document;
        DeleteArrayBuffer => delete_array_buffer, Delete, ArrayBuffer;
        DeleteText => delete_text, Delete, Text;
        DeleteStream => delete_stream, Delete, Stream;
    }
    modify {
        Post => post, Post, Json;
        PostUrlEncoded => post_url_encoded, Post, UrlEncoded;
        PostMultipart => post_multipart, Post, Multipart;

        Put => put, Put, Json;
        PutUrlEncoded => put_url_encoded, Put, UrlEncoded;
        PutMultipart => put_multipart, Put, Multipart;

        Patch => patch, Patch, Json;
        PatchUrlEncoded => patch_url_encoded, Patch, UrlEncoded;
        PatchMultipart => patch_multipart, Patch, Multipart;
    }
}

/// Header keys to remove: one name or several.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderKeys {
    /// A single header name.
    One(String),
    /// Several header names.
    Many(Vec<String>),
}

impl From<&str> for HeaderKeys {
    fn from(key: &str) -> Self {
        Self::One(key.to_string())
    }
}

impl From<String> for HeaderKeys {
    fn from(key: String) -> Self {
        Self::One(key)
    }
}

impl From<Vec<String>> for HeaderKeys {
    fn from(keys: Vec<String>) -> Self {
        Self::Many(keys)
    }
}

impl From<Vec<&str>> for HeaderKeys {
    fn from(keys: Vec<&str>) -> Self {
        Self::Many(keys.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderKeys {
    fn from(keys: [&str; N]) -> Self {
        Self::Many(keys.into_iter().map(String::from).collect())
    }
}

impl HeaderKeys {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(key) => vec![key],
            Self::Many(keys) => keys,
        }
    }
}

struct ClientInner {
    config: ClientConfig,
    transport: Transport,
    default_headers: RwLock<HeaderMap>,
    request_interceptors: InterceptorManager<RequestConfig>,
    response_interceptors: InterceptorManager<Response>,
}

/// An HTTP client with shorthand runners, default headers and interceptors.
///
/// The client is cheaply cloneable and thread-safe. Clones share the same
/// connection pool, default headers and interceptor chains.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client from `config`.
    ///
    /// Fails if a default header is invalid or the transport cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Transport::from_config(&config)?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let (name, value) = parse_header(name, value)?;
            default_headers.insert(name, value);
        }

        tracing::debug!(
            target: targets::CLIENT,
            base_url = ?config.base_url,
            headers = default_headers.len(),
            "client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                default_headers: RwLock::new(default_headers),
                request_interceptors: InterceptorManager::new(),
                response_interceptors: InterceptorManager::new(),
            }),
        })
    }

    /// Create a builder for configuring a new client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The configuration the client was created with.
    ///
    /// Default headers changed later are reported by [`headers`](Self::headers).
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The raw transport, bypassing defaults and interceptors.
    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// Run one of the shorthand runners.
    ///
    /// Fields set in `config` win over the runner's defaults: an explicit
    /// `params`, `response_type` or `Content-Type` header is kept.
    pub async fn call(
        &self,
        method: RunnerMethod,
        url: impl Into<String>,
        params: Option<Params>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        let config = prepare(method, url.into(), params, config.unwrap_or_default());
        self.request(config).await
    }

    /// Execute a fully built request through the interceptor chains.
    pub async fn request(&self, config: RequestConfig) -> Result<Response> {
        let config = self.apply_defaults(config);
        let span = tracing::debug_span!(
            target: targets::CLIENT,
            "request",
            operation = span_names::REQUEST,
            method = %config.method,
            url = %config.url,
        );

        async move {
            let state = self.inner.request_interceptors.run_request(config).await;
            let state = match state {
                Ok(config) => self.inner.transport.execute(config).await,
                Err(error) => {
                    tracing::debug!(target: targets::CLIENT, code = error.code(), "request chain rejected");
                    Err(error)
                }
            };
            self.inner.response_interceptors.run(state).await
        }
        .instrument(span)
        .await
    }

    fn apply_defaults(&self, mut config: RequestConfig) -> RequestConfig {
        if config.base_url.is_none() {
            config.base_url = self.inner.config.base_url.clone();
        }
        if config.timeout.is_none() {
            config.timeout = self.inner.config.timeout;
        }
        for (name, value) in self.inner.default_headers.read().iter() {
            if !config.headers.contains_key(name) {
                config.headers.insert(name.clone(), value.clone());
            }
        }
        config
    }

    /// The current default headers.
    pub fn headers(&self) -> HeaderMap {
        self.inner.default_headers.read().clone()
    }

    /// Set a default header sent with every later request.
    pub fn set_header(&self, key: &str, value: impl fmt::Display) -> Result<()> {
        let (name, value) = parse_header(key, &value.to_string())?;
        self.inner.default_headers.write().insert(name, value);
        Ok(())
    }

    /// Remove one or several default headers. Unknown names are ignored.
    pub fn remove_header(&self, keys: impl Into<HeaderKeys>) {
        let mut headers = self.inner.default_headers.write();
        for key in keys.into().into_vec() {
            if let Ok(name) = HeaderName::from_bytes(key.as_bytes()) {
                headers.remove(name);
            }
        }
    }

    /// Append request interceptors to the chain, in order.
    pub fn use_request_interceptor(
        &self,
        interceptors: impl IntoIterator<Item = RequestInterceptor>,
    ) -> Vec<InterceptorId> {
        interceptors
            .into_iter()
            .map(|i| self.inner.request_interceptors.register(i))
            .collect()
    }

    /// Append response interceptors to the chain, in order.
    pub fn use_response_interceptor(
        &self,
        interceptors: impl IntoIterator<Item = ResponseInterceptor>,
    ) -> Vec<InterceptorId> {
        interceptors
            .into_iter()
            .map(|i| self.inner.response_interceptors.register(i))
            .collect()
    }

    /// Remove a request interceptor. Returns `true` if it was registered.
    pub fn eject_request_interceptor(&self, id: InterceptorId) -> bool {
        self.inner.request_interceptors.eject(id)
    }

    /// Remove a response interceptor. Returns `true` if it was registered.
    pub fn eject_response_interceptor(&self, id: InterceptorId) -> bool {
        self.inner.response_interceptors.eject(id)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("request_interceptors", &self.inner.request_interceptors.len())
            .field("response_interceptors", &self.inner.response_interceptors.len())
            .finish()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| HttpError::invalid_header(format!("invalid header name '{name}': {e}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| HttpError::invalid_header(format!("invalid value for header '{name}': {e}")))?;
    Ok((header_name, header_value))
}

/// Turn a runner call into a request config.
fn prepare(
    method: RunnerMethod,
    url: String,
    params: Option<Params>,
    mut config: RequestConfig,
) -> RequestConfig {
    config.url = url;
    match method.runner() {
        Runner::Fetch {
            method,
            response_type,
        } => {
            config.method = method;
            if config.params.is_none() {
                config.params = params;
            }
            config.response_type.get_or_insert(response_type);
        }
        Runner::Modify { method, encoding } => {
            let _span = PerfSpan::new("encode_body");
            config.method = method;
            config.body = match (encoding, params) {
                (BodyEncoding::Json, None) => RequestBody::None,
                (BodyEncoding::Json, Some(params)) => RequestBody::Json(Value::Object(params)),
                (BodyEncoding::UrlEncoded, params) => {
                    RequestBody::Form(encoding::to_query_string(&params.unwrap_or_default()))
                }
                (BodyEncoding::Multipart, params) => {
                    RequestBody::Multipart(encoding::to_multipart_fields(&params.unwrap_or_default()))
                }
            };
            if !config.headers.contains_key(CONTENT_TYPE) {
                config
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(encoding.content_type()));
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn params(value: Value) -> Option<Params> {
        value.as_object().cloned()
    }

    #[test]
    fn test_runner_table_lines_up() {
        assert_eq!(RunnerMethod::ALL.len(), 33);
        assert_eq!(RUNNERS.len(), RunnerMethod::ALL.len());
        for (index, method) in RunnerMethod::ALL.iter().enumerate() {
            assert_eq!(*method as usize, index);
            let verb = method.runner().method().as_str().to_ascii_lowercase();
            assert!(
                method.name().starts_with(&verb),
                "{} is not a {verb} runner",
                method.name()
            );
        }
    }

    #[test]
    fn test_runner_shapes() {
        assert_eq!(
            RunnerMethod::GetBlob.runner(),
            Runner::Fetch {
                method: HttpMethod::Get,
                response_type: ResponseType::Blob
            }
        );
        assert_eq!(
            RunnerMethod::DeleteStream.runner(),
            Runner::Fetch {
                method: HttpMethod::Delete,
                response_type: ResponseType::Stream
            }
        );
        assert_eq!(
            RunnerMethod::PatchMultipart.runner(),
            Runner::Modify {
                method: HttpMethod::Patch,
                encoding: BodyEncoding::Multipart
            }
        );
        assert_eq!(RunnerMethod::PutUrlEncoded.name(), "put_url_encoded");
    }

    #[test]
    fn test_prepare_fetch() {
        let config = prepare(
            RunnerMethod::GetText,
            "/search".into(),
            params(json!({"q": "rust"})),
            RequestConfig::default(),
        );
        assert_eq!(config.method, HttpMethod::Get);
        assert_eq!(config.url, "/search");
        assert_eq!(config.response_type, Some(ResponseType::Text));
        assert_eq!(config.params, params(json!({"q": "rust"})));
        assert!(config.body.is_none());
    }

    #[test]
    fn test_prepare_fetch_config_wins() {
        let overrides = RequestConfig::default()
            .response_type(ResponseType::ArrayBuffer)
            .params(Params::new());
        let config = prepare(
            RunnerMethod::Get,
            "/x".into(),
            params(json!({"ignored": true})),
            overrides,
        );
        assert_eq!(config.response_type, Some(ResponseType::ArrayBuffer));
        assert_eq!(config.params, Some(Params::new()));
    }

    #[test]
    fn test_prepare_modify_encodings() {
        let json_body = prepare(
            RunnerMethod::Post,
            "/users".into(),
            params(json!({"name": "ada"})),
            RequestConfig::default(),
        );
        assert_eq!(json_body.method, HttpMethod::Post);
        assert_eq!(json_body.body, RequestBody::Json(json!({"name": "ada"})));
        assert_eq!(json_body.headers[CONTENT_TYPE], "application/json");
        assert!(json_body.params.is_none());

        let form = prepare(
            RunnerMethod::PutUrlEncoded,
            "/users/1".into(),
            params(json!({"a": 1, "b": {"c": 2}})),
            RequestConfig::default(),
        );
        assert_eq!(form.method, HttpMethod::Put);
        assert_eq!(form.body, RequestBody::Form("a=1&b%5Bc%5D=2".into()));
        assert_eq!(form.headers[CONTENT_TYPE], "application/x-www-form-urlencoded");

        let multipart = prepare(
            RunnerMethod::PatchMultipart,
            "/files".into(),
            params(json!({"name": "report"})),
            RequestConfig::default(),
        );
        assert_eq!(
            multipart.body,
            RequestBody::Multipart(vec![("name".into(), "report".into())])
        );
        assert_eq!(multipart.headers[CONTENT_TYPE], "multipart/form-data");
    }

    #[test]
    fn test_prepare_modify_without_params() {
        let config =
            prepare(RunnerMethod::Post, "/ping".into(), None, RequestConfig::default());
        assert!(config.body.is_none());

        let config = prepare(
            RunnerMethod::PostUrlEncoded,
            "/ping".into(),
            None,
            RequestConfig::default(),
        );
        assert_eq!(config.body, RequestBody::Form(String::new()));
    }

    #[test]
    fn test_prepare_keeps_explicit_content_type() {
        let overrides = RequestConfig::default().header("content-type", "application/vnd.api+json");
        let config = prepare(
            RunnerMethod::Post,
            "/users".into(),
            params(json!({"a": 1})),
            overrides,
        );
        assert_eq!(config.headers[CONTENT_TYPE], "application/vnd.api+json");
    }

    #[test]
    fn test_default_headers_accessors() {
        let client = Client::builder().header("X-App", "demo").build().unwrap();
        assert_eq!(client.headers()["x-app"], "demo");

        client.set_header("Authorization", "Bearer t").unwrap();
        client.set_header("X-Retry", 3).unwrap();
        assert_eq!(client.headers()["x-retry"], "3");

        client.remove_header("X-App");
        assert!(!client.headers().contains_key("x-app"));

        client.remove_header(["Authorization", "X-Retry", "Not-Set"]);
        assert!(client.headers().is_empty());
    }

    #[test]
    fn test_invalid_headers_rejected() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let err = client.set_header("bad header", "x").unwrap_err();
        assert_eq!(err.code(), "ERR_BAD_OPTION_VALUE");

        let err = Client::builder()
            .header("X-Bad", "line\nbreak")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidHeader);
    }

    #[test]
    fn test_apply_defaults() {
        let client = Client::builder()
            .base_url("http://api.local")
            .timeout(Duration::from_secs(3))
            .header("X-App", "demo")
            .header("Accept", "application/json")
            .build()
            .unwrap();

        let config = client.apply_defaults(
            RequestConfig::new(HttpMethod::Get, "/x")
                .timeout(Duration::from_secs(1))
                .header("Accept", "text/plain"),
        );
        assert_eq!(config.base_url.as_deref(), Some("http://api.local"));
        assert_eq!(config.timeout, Some(Duration::from_secs(1)));
        assert_eq!(config.headers["x-app"], "demo");
        assert_eq!(config.headers["accept"], "text/plain");
    }

    #[test]
    fn test_interceptor_registration() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let ids = client.use_request_interceptor([
            RequestInterceptor::new(),
            RequestInterceptor::new(),
        ]);
        assert_eq!(ids.len(), 2);
        assert!(client.eject_request_interceptor(ids[0]));
        assert!(!client.eject_request_interceptor(ids[0]));

        let ids = client.use_response_interceptor(vec![ResponseInterceptor::new()]);
        assert!(client.eject_response_interceptor(ids[0]));
    }
}
