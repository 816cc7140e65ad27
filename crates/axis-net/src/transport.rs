//! The reqwest-backed transport.
//!
//! A [`Transport`] executes exactly one [`RequestConfig`]: it joins the URL,
//! encodes the body, reports progress, decodes the response for the
//! requested [`ResponseType`] and turns non-2xx statuses into errors. It knows
//! nothing about interceptors or default headers; see [`Client`](crate::Client)
//! for those.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::redirect::Policy;

use axis_core::logging::targets;

use crate::config::ClientConfig;
use crate::encoding;
use crate::error::{HttpError, Result};
use crate::request::{ProgressCallback, ProgressEvent, RequestBody, RequestConfig, ResponseType};
use crate::response::{ByteStream, Response, ResponseData};

/// Upload bodies are handed to the connection in chunks of this size.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// A handle to the underlying HTTP connection pool.
///
/// Cheap to clone; clones share connections.
#[derive(Clone, Debug)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    /// Create a transport from the connection-level parts of `config`.
    ///
    /// Base URL, timeout and default headers are applied per request by the
    /// client and are not baked into the transport.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if config.follow_redirects {
            builder = builder.redirect(Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if config.cookies_enabled {
            builder = builder.cookie_store(true);
        }

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| HttpError::build(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| HttpError::build(e.to_string()))?;
        Ok(Self { client })
    }

    /// Execute a request.
    ///
    /// If the config carries a cancellation token, the request is aborted as
    /// soon as the token fires and a `Cancelled` error is returned.
    pub async fn execute(&self, config: RequestConfig) -> Result<Response> {
        let Some(token) = config.cancel.clone() else {
            return self.dispatch(config).await;
        };

        if token.is_cancelled() {
            return Err(HttpError::cancelled().with_config(config));
        }

        tokio::select! {
            result = self.dispatch(config.clone()) => result,
            _ = token.cancelled() => {
                tracing::debug!(target: targets::TRANSPORT, url = %config.url, "request cancelled");
                Err(HttpError::cancelled().with_config(config))
            }
        }
    }

    async fn dispatch(&self, config: RequestConfig) -> Result<Response> {
        let url = build_url(&config)?;
        tracing::debug!(target: targets::TRANSPORT, method = %config.method, %url, "dispatching request");

        let mut builder = self.client.request(config.method.to_reqwest(), url);

        let multipart = matches!(config.body, RequestBody::Multipart(_));
        for (name, value) in &config.headers {
            // The multipart encoder sets its own content type with the boundary.
            if multipart && name == CONTENT_TYPE {
                continue;
            }
            builder = builder.header(name, value);
        }

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        builder = attach_body(builder, &config)?;

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(e, &config))?;

        if let RequestBody::Multipart(fields) = &config.body
            && let Some(on_progress) = &config.on_upload_progress
        {
            let sent: u64 = fields.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum();
            on_progress(&ProgressEvent::new(sent, Some(sent)));
        }

        read_response(response, config).await
    }
}

/// Join the base URL and append the query parameters.
pub(crate) fn build_url(config: &RequestConfig) -> Result<url::Url> {
    let joined = match &config.base_url {
        Some(base) if !is_absolute_url(&config.url) => combine_urls(base, &config.url),
        _ => config.url.clone(),
    };

    let mut url = url::Url::parse(&joined).map_err(|e| {
        HttpError::invalid_url(format!("invalid URL '{joined}': {e}")).with_config(config.clone())
    })?;

    if let Some(params) = &config.params {
        let pairs = encoding::flatten(params);
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
    }

    Ok(url)
}

fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        base.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}

fn attach_body(
    builder: reqwest::RequestBuilder,
    config: &RequestConfig,
) -> Result<reqwest::RequestBuilder> {
    let (bytes, content_type) = match &config.body {
        RequestBody::None => return Ok(builder),
        RequestBody::Multipart(fields) => {
            let form = fields
                .iter()
                .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                    form.text(name.clone(), value.clone())
                });
            return Ok(builder.multipart(form));
        }
        RequestBody::Json(value) => {
            let bytes = serde_json::to_vec(value)
                .map_err(|e| HttpError::encode(e.to_string()).with_config(config.clone()))?;
            (Bytes::from(bytes), Some("application/json"))
        }
        RequestBody::Text(text) => (Bytes::from(text.clone()), Some("text/plain;charset=utf-8")),
        RequestBody::Bytes(bytes) => (bytes.clone(), None),
        RequestBody::Form(encoded) => (
            Bytes::from(encoded.clone()),
            Some("application/x-www-form-urlencoded"),
        ),
    };

    let mut builder = builder;
    if let Some(content_type) = content_type
        && !config.headers.contains_key(CONTENT_TYPE)
    {
        builder = builder.header(CONTENT_TYPE, content_type);
    }

    Ok(match &config.on_upload_progress {
        Some(on_progress) => {
            let len = bytes.len();
            builder
                .header(CONTENT_LENGTH, len)
                .body(progress_body(bytes, on_progress.clone()))
        }
        None => builder.body(bytes),
    })
}

/// Wrap `bytes` in a streaming body that reports each chunk as it is sent.
fn progress_body(bytes: Bytes, on_progress: ProgressCallback) -> reqwest::Body {
    let total = bytes.len() as u64;
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(bytes.len())))
        .collect();

    let mut loaded = 0u64;
    let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        loaded += chunk.len() as u64;
        on_progress(&ProgressEvent::new(loaded, Some(total)));
        Ok::<_, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

async fn read_response(mut response: reqwest::Response, config: RequestConfig) -> Result<Response> {
    let status = response.status();
    let headers = response.headers().clone();
    let url = response.url().to_string();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();
    let response_type = config.resolved_response_type();

    let data = if response_type == ResponseType::Stream && status.is_success() {
        ResponseData::Stream(ByteStream::new(response))
    } else {
        let total = response.content_length();
        let mut buffer = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| HttpError::from_reqwest(e, &config))?
        {
            buffer.extend_from_slice(&chunk);
            if let Some(on_progress) = &config.on_download_progress {
                on_progress(&ProgressEvent::new(buffer.len() as u64, total));
            }
        }

        let mime = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        ResponseData::decode(Bytes::from(buffer), mime, response_type, status.is_success())
            .map_err(|e| e.with_config(config.clone()))?
    };

    tracing::debug!(target: targets::TRANSPORT, status = status.as_u16(), %url, "response received");

    let response = Response {
        status: status.as_u16(),
        status_text,
        headers,
        url,
        data,
        config,
    };

    if response.is_success() {
        Ok(response)
    } else {
        Err(HttpError::status(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HttpMethod;
    use serde_json::json;

    fn config(base: Option<&str>, url: &str) -> RequestConfig {
        let mut config = RequestConfig::new(HttpMethod::Get, url);
        config.base_url = base.map(String::from);
        config
    }

    #[test]
    fn test_absolute_url_detection() {
        assert!(is_absolute_url("http://a.b/c"));
        assert!(is_absolute_url("//cdn.example.com/x"));
        assert!(is_absolute_url("git+ssh://host/repo"));
        assert!(!is_absolute_url("/users"));
        assert!(!is_absolute_url("users?next=http://x"));
    }

    #[test]
    fn test_build_url_joins_base() {
        let url = build_url(&config(Some("http://api.local/v1/"), "/users")).unwrap();
        assert_eq!(url.as_str(), "http://api.local/v1/users");

        let url = build_url(&config(Some("http://api.local/v1"), "http://other.local/x")).unwrap();
        assert_eq!(url.as_str(), "http://other.local/x");
    }

    #[test]
    fn test_build_url_appends_params() {
        let mut cfg = config(Some("http://api.local"), "/search?lang=en");
        cfg.params = match json!({"q": "rust", "page": 2}) {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        let url = build_url(&cfg).unwrap();
        assert_eq!(url.as_str(), "http://api.local/search?lang=en&page=2&q=rust");
    }

    #[test]
    fn test_build_url_invalid() {
        let err = build_url(&config(None, "/relative/only")).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_URL");
        assert_eq!(err.config().map(|c| c.url.as_str()), Some("/relative/only"));
    }

    #[test]
    fn test_transport_builds_with_defaults() {
        assert!(Transport::new().is_ok());
    }
}
