//! Request configuration types.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

/// Query or body parameters, keyed by name.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    #[default]
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// The canonical upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the response body should be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// Parse the body as JSON.
    #[default]
    Json,
    /// Keep the raw bytes together with their MIME type.
    Blob,
    /// Keep the body as markup text.
    Document,
    /// Keep the raw bytes.
    ArrayBuffer,
    /// Decode the body as UTF-8 text.
    Text,
    /// Hand the unread body to the caller.
    Stream,
}

/// The body of a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// JSON body.
    Json(serde_json::Value),
    /// Plain text body.
    Text(String),
    /// Raw binary body.
    Bytes(Bytes),
    /// An already encoded `application/x-www-form-urlencoded` body.
    Form(String),
    /// Multipart text fields, in order.
    Multipart(Vec<(String, String)>),
}

impl RequestBody {
    /// Whether there is no body.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Progress of an upload or download.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressEvent {
    /// Number of bytes transferred so far.
    pub loaded: u64,
    /// Total number of bytes, if known.
    pub total: Option<u64>,
}

impl ProgressEvent {
    /// Create a progress event.
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self { loaded, total }
    }

    /// Completion ratio between 0.0 and 1.0, if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.loaded as f64 / total as f64).min(1.0)
            }
        })
    }

    /// Completion percentage between 0 and 100, if the total is known.
    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }
}

/// Callback receiving transfer progress.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Everything needed to issue one request.
///
/// Fields left unset (`None`, empty) fall back to the client's defaults when
/// the request is dispatched through a [`Client`](crate::Client).
#[derive(Clone, Default)]
pub struct RequestConfig {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The request URL, absolute or relative to `base_url`.
    pub url: String,
    /// Base URL joined in front of relative URLs.
    pub base_url: Option<String>,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Query parameters.
    pub params: Option<Params>,
    /// Request body.
    pub body: RequestBody,
    /// Expected response type. Defaults to JSON.
    pub response_type: Option<ResponseType>,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Token that aborts the request when cancelled.
    pub cancel: Option<CancellationToken>,
    /// Called as the request body is sent.
    pub on_upload_progress: Option<ProgressCallback>,
    /// Called as the response body is received.
    pub on_download_progress: Option<ProgressCallback>,
}

impl RequestConfig {
    /// Create a config for `method` and `url`.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add multiple headers.
    pub fn headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the query parameters.
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Set a JSON body.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Set the expected response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Set a timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Set the upload progress callback.
    pub fn on_upload_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(f));
        self
    }

    /// Set the download progress callback.
    pub fn on_download_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(f));
        self
    }

    /// The response type this request will be decoded as.
    pub fn resolved_response_type(&self) -> ResponseType {
        self.response_type.unwrap_or_default()
    }

    /// Overlay the fields that are set in `overrides` onto this config.
    ///
    /// Headers are merged key by key. The method and URL are taken from
    /// `overrides` only when its URL is non-empty.
    pub fn merge(mut self, overrides: &RequestConfig) -> Self {
        if !overrides.url.is_empty() {
            self.method = overrides.method;
            self.url = overrides.url.clone();
        }
        if overrides.base_url.is_some() {
            self.base_url = overrides.base_url.clone();
        }
        for (name, value) in &overrides.headers {
            self.headers.insert(name.clone(), value.clone());
        }
        if overrides.params.is_some() {
            self.params = overrides.params.clone();
        }
        if !overrides.body.is_none() {
            self.body = overrides.body.clone();
        }
        if overrides.response_type.is_some() {
            self.response_type = overrides.response_type;
        }
        if overrides.timeout.is_some() {
            self.timeout = overrides.timeout;
        }
        if overrides.cancel.is_some() {
            self.cancel = overrides.cancel.clone();
        }
        if overrides.on_upload_progress.is_some() {
            self.on_upload_progress = overrides.on_upload_progress.clone();
        }
        if overrides.on_download_progress.is_some() {
            self.on_download_progress = overrides.on_download_progress.clone();
        }
        self
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("body", &self.body)
            .field("response_type", &self.response_type)
            .field("timeout", &self.timeout)
            .field("cancel", &self.cancel.as_ref().map(|t| t.is_cancelled()))
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("on_download_progress", &self.on_download_progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_method_names() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
        assert_eq!(HttpMethod::Patch.to_reqwest(), reqwest::Method::PATCH);
    }

    #[test]
    fn test_builder_chain() {
        let config = RequestConfig::new(HttpMethod::Post, "/users")
            .base_url("http://api.local")
            .header("X-Trace", "abc")
            .header("bad header", "ignored")
            .json(json!({"name": "ada"}))
            .response_type(ResponseType::Text)
            .timeout(Duration::from_secs(3));

        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.body, RequestBody::Json(json!({"name": "ada"})));
        assert_eq!(config.resolved_response_type(), ResponseType::Text);
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_default_response_type_is_json() {
        assert_eq!(
            RequestConfig::default().resolved_response_type(),
            ResponseType::Json
        );
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let base = RequestConfig::new(HttpMethod::Get, "/a")
            .header("X-One", "1")
            .header("X-Two", "2")
            .timeout(Duration::from_secs(1))
            .on_upload_progress(move |e| seen_clone.lock().push(e.loaded));

        let overrides = RequestConfig::default()
            .header("X-Two", "two")
            .response_type(ResponseType::Blob);

        let merged = base.merge(&overrides);
        assert_eq!(merged.url, "/a");
        assert_eq!(merged.headers["x-one"], "1");
        assert_eq!(merged.headers["x-two"], "two");
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
        assert_eq!(merged.response_type, Some(ResponseType::Blob));

        if let Some(cb) = &merged.on_upload_progress {
            cb(&ProgressEvent::new(7, None));
        }
        assert_eq!(*seen.lock(), vec![7]);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(ProgressEvent::new(50, Some(200)).percent(), Some(25.0));
        assert_eq!(ProgressEvent::new(0, Some(0)).percent(), Some(100.0));
        assert_eq!(ProgressEvent::new(10, None).percent(), None);
        assert_eq!(ProgressEvent::new(300, Some(200)).fraction(), Some(1.0));
    }
}
