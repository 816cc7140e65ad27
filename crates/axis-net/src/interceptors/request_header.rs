//! Header injection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::{HeaderName, HeaderValue};

use axis_core::logging::targets;

use super::in_scope;
use crate::interceptor::{Interceptor, InterceptorOptions, RequestInterceptor};
use crate::matcher::MatchOptions;
use crate::request::RequestConfig;

/// Where injected headers come from.
#[derive(Clone)]
pub enum HeaderSource {
    /// A fixed set of headers.
    Static(BTreeMap<String, String>),
    /// Headers computed for every request, e.g. a current auth token.
    Dynamic(Arc<dyn Fn() -> BTreeMap<String, String> + Send + Sync>),
}

impl HeaderSource {
    /// Create a source that calls `f` for every request.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> BTreeMap<String, String> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    fn resolve(&self) -> BTreeMap<String, String> {
        match self {
            Self::Static(headers) => headers.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl Default for HeaderSource {
    fn default() -> Self {
        Self::Static(BTreeMap::new())
    }
}

impl From<BTreeMap<String, String>> for HeaderSource {
    fn from(headers: BTreeMap<String, String>) -> Self {
        Self::Static(headers)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for HeaderSource {
    fn from(headers: [(&str, &str); N]) -> Self {
        Self::Static(
            headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl fmt::Debug for HeaderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(headers) => f.debug_tuple("Static").field(headers).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

/// Options for [`request_headers_interceptor`].
#[derive(Clone, Debug, Default)]
pub struct RequestHeadersOptions {
    /// Headers to insert.
    pub headers: HeaderSource,
    /// Which requests to act on.
    pub match_options: MatchOptions,
    /// Options used on registration.
    pub interceptor_options: InterceptorOptions,
}

impl RequestHeadersOptions {
    /// Create options inserting `headers`.
    pub fn new(headers: impl Into<HeaderSource>) -> Self {
        Self {
            headers: headers.into(),
            ..Default::default()
        }
    }
}

match_option_setters!(RequestHeadersOptions);

/// Insert headers into matching requests, overwriting existing values.
///
/// Header names or values that are not valid HTTP are skipped with a warning.
pub fn request_headers_interceptor(options: RequestHeadersOptions) -> RequestInterceptor {
    let matcher = Arc::new(options.match_options.matcher());
    let source = options.headers;

    Interceptor::new()
        .on_fulfilled(move |mut config: RequestConfig| {
            if in_scope(&matcher, Some(&config)) {
                insert_headers(&mut config, source.resolve());
            }
            async move { Ok(config) }
        })
        .options(options.interceptor_options)
}

fn insert_headers(config: &mut RequestConfig, headers: BTreeMap<String, String>) {
    let mut inserted = 0usize;
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                config.headers.insert(name, value);
                inserted += 1;
            }
            _ => {
                tracing::warn!(target: targets::INTERCEPTORS, header = %name, "skipping invalid header");
            }
        }
    }
    tracing::debug!(target: targets::INTERCEPTORS, url = %config.url, inserted, "headers injected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HttpMethod;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn run(interceptor: &RequestInterceptor, config: RequestConfig) -> RequestConfig {
        interceptor.apply(Ok(config)).await.unwrap()
    }

    #[tokio::test]
    async fn test_static_headers_overwrite() {
        let interceptor =
            request_headers_interceptor(RequestHeadersOptions::new([("X-Env", "test"), ("Accept", "text/csv")]));

        let config = RequestConfig::new(HttpMethod::Get, "/report").header("Accept", "application/json");
        let config = run(&interceptor, config).await;

        assert_eq!(config.headers["x-env"], "test");
        assert_eq!(config.headers["accept"], "text/csv");
    }

    #[tokio::test]
    async fn test_dynamic_headers_resolved_per_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let source = HeaderSource::dynamic(move || {
            let n = calls_clone.fetch_add(1, Ordering::SeqCst) + 1;
            BTreeMap::from([("Authorization".to_string(), format!("Bearer {n}"))])
        });
        let interceptor = request_headers_interceptor(RequestHeadersOptions::new(source));

        let first = run(&interceptor, RequestConfig::new(HttpMethod::Get, "/a")).await;
        let second = run(&interceptor, RequestConfig::new(HttpMethod::Get, "/b")).await;

        assert_eq!(first.headers["authorization"], "Bearer 1");
        assert_eq!(second.headers["authorization"], "Bearer 2");
    }

    #[tokio::test]
    async fn test_unmatched_request_untouched() {
        let interceptor = request_headers_interceptor(
            RequestHeadersOptions::new([("X-Admin", "1")]).include(["/admin/**"]),
        );

        let config = run(&interceptor, RequestConfig::new(HttpMethod::Get, "/public/page")).await;
        assert!(config.headers.is_empty());

        let config = run(&interceptor, RequestConfig::new(HttpMethod::Get, "/admin/users")).await;
        assert_eq!(config.headers["x-admin"], "1");
    }

    #[tokio::test]
    async fn test_invalid_headers_skipped() {
        let interceptor = request_headers_interceptor(RequestHeadersOptions::new([
            ("bad name", "x"),
            ("X-Ok", "yes"),
            ("X-Bad-Value", "line\nbreak"),
        ]));

        let config = run(&interceptor, RequestConfig::new(HttpMethod::Get, "/")).await;
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.headers["x-ok"], "yes");
    }

    #[tokio::test]
    async fn test_rejections_pass_through() {
        let interceptor = request_headers_interceptor(RequestHeadersOptions::new([("X", "1")]));
        let err = interceptor
            .apply(Err(crate::HttpError::network("down")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ERR_NETWORK");
    }
}
