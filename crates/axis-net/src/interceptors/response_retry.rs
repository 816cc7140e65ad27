//! Retrying failed requests.

use std::sync::Arc;

use axis_core::logging::{span_names, targets};
use tracing::Instrument;

use super::in_scope;
use crate::error::HttpError;
use crate::interceptor::{Interceptor, InterceptorOptions, ResponseInterceptor};
use crate::matcher::MatchOptions;
use crate::response::Response;
use crate::transport::Transport;

/// Options for [`response_retry_interceptor`].
#[derive(Clone, Debug)]
pub struct ResponseRetryOptions {
    /// How many times a failed request is reissued. Zero disables retrying.
    pub count: usize,
    /// Which requests to act on.
    pub match_options: MatchOptions,
    /// Options used on registration.
    pub interceptor_options: InterceptorOptions,
}

impl Default for ResponseRetryOptions {
    fn default() -> Self {
        Self {
            count: 1,
            match_options: MatchOptions::default(),
            interceptor_options: InterceptorOptions::default(),
        }
    }
}

impl ResponseRetryOptions {
    /// Create options retrying up to `count` times.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }
}

match_option_setters!(ResponseRetryOptions);

/// Reissue failed requests.
///
/// A matching failure is retried up to `count` times, one attempt after the
/// other, each on a fresh [`Transport`] with default settings. The failed
/// request's config is reused as is, so headers, base URL, timeout and
/// cancellation token carry over, but the client's interceptors do not run
/// again. The first success resolves; once attempts are exhausted the last
/// attempt's error is returned.
///
/// Cancelled requests and errors without a config are never retried.
pub fn response_retry_interceptor(options: ResponseRetryOptions) -> ResponseInterceptor {
    let matcher = Arc::new(options.match_options.matcher());
    let count = options.count;

    Interceptor::new()
        .on_rejected(move |error: HttpError| {
            let retryable = count > 0 && !error.is_cancelled() && in_scope(&matcher, error.config());
            async move {
                if !retryable {
                    return Err(error);
                }
                retry(error, count).await
            }
        })
        .options(options.interceptor_options)
}

async fn retry(error: HttpError, count: usize) -> Result<Response, HttpError> {
    let Some(config) = error.config().cloned() else {
        return Err(error);
    };

    let mut last = error;
    for attempt in 1..=count {
        tracing::debug!(
            target: targets::INTERCEPTORS,
            attempt,
            count,
            url = %config.url,
            code = last.code(),
            "retrying request"
        );

        let span = tracing::debug_span!(target: targets::INTERCEPTORS, "retry", operation = span_names::RETRY, attempt);
        let result = async {
            let transport = Transport::new()?;
            transport.execute(config.clone()).await
        }
        .instrument(span)
        .await;
        match result {
            Ok(response) => return Ok(response),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => last = e,
        }
    }

    Err(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HttpMethod, RequestConfig};

    #[test]
    fn test_default_count() {
        assert_eq!(ResponseRetryOptions::default().count, 1);
        assert_eq!(ResponseRetryOptions::new(3).count, 3);
    }

    #[tokio::test]
    async fn test_zero_count_passes_through() {
        let interceptor = response_retry_interceptor(ResponseRetryOptions::new(0));
        let error = HttpError::network("down")
            .with_config(RequestConfig::new(HttpMethod::Get, "http://127.0.0.1:9/never"));

        let err = interceptor.apply(Err(error)).await.unwrap_err();
        assert_eq!(err.message(), "down");
    }

    #[tokio::test]
    async fn test_cancellation_not_retried() {
        let interceptor = response_retry_interceptor(ResponseRetryOptions::new(5));
        let error = HttpError::cancelled()
            .with_config(RequestConfig::new(HttpMethod::Get, "http://127.0.0.1:9/never"));

        let err = interceptor.apply(Err(error)).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_error_without_config_passes_through() {
        let interceptor = response_retry_interceptor(ResponseRetryOptions::default());
        let err = interceptor
            .apply(Err(HttpError::network("no config")))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "no config");
    }

    #[tokio::test]
    async fn test_excluded_request_not_retried() {
        let interceptor =
            response_retry_interceptor(ResponseRetryOptions::new(2).exclude(["method:POST"]));
        let error = HttpError::network("down")
            .with_config(RequestConfig::new(HttpMethod::Post, "http://127.0.0.1:9/never"));

        let err = interceptor.apply(Err(error)).await.unwrap_err();
        assert_eq!(err.message(), "down");
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let interceptor = response_retry_interceptor(ResponseRetryOptions::default());
        let response = super::super::test_support::response(HttpMethod::Get, "/ok", 200);
        let out = interceptor.apply(Ok(response)).await.unwrap();
        assert_eq!(out.status, 200);
    }
}
