//! Ready-made interceptors.
//!
//! Each factory takes an options struct carrying include/exclude rules
//! ([`MatchOptions`](crate::matcher::MatchOptions)) and returns an [`Interceptor`](crate::Interceptor).
//! Requests outside the rules pass through untouched: values resolve and
//! errors reject unchanged.
//!
//! | Factory | Leg | Effect |
//! |---|---|---|
//! | [`request_headers_interceptor`] | request | inserts headers |
//! | [`response_retry_interceptor`] | response | reissues failed requests |
//! | [`response_blob_interceptor`] | response | post-processes blob responses |
//! | [`response_status_interceptor`] | response | dispatches on status code |
//! | [`response_timeout_interceptor`] | response | normalizes timeout codes |

/// Adds the include/exclude and registration-option setters shared by every
/// options struct.
macro_rules! match_option_setters {
    ($ty:ty) => {
        impl $ty {
            /// Only act on requests matching one of these patterns.
            pub fn include<I, S>(mut self, patterns: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.match_options.include = Some(patterns.into_iter().map(Into::into).collect());
                self
            }

            /// Never act on requests matching one of these patterns.
            pub fn exclude<I, S>(mut self, patterns: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.match_options.exclude = Some(patterns.into_iter().map(Into::into).collect());
                self
            }

            /// Set the options used when the interceptor is registered.
            pub fn interceptor_options(
                mut self,
                options: $crate::interceptor::InterceptorOptions,
            ) -> Self {
                self.interceptor_options = options;
                self
            }
        }
    };
}

mod request_header;
mod response_blob;
mod response_retry;
mod response_status;
mod response_timeout;

pub use request_header::{HeaderSource, RequestHeadersOptions, request_headers_interceptor};
pub use response_blob::{BlobHandler, ResponseBlobOptions, response_blob_interceptor};
pub use response_retry::{ResponseRetryOptions, response_retry_interceptor};
pub use response_status::{
    InvalidStatusHandler, ResponseStatusOptions, ValidStatusHandler, response_status_interceptor,
};
pub use response_timeout::{
    DEFAULT_TIMEOUT_CODE, ResponseTimeoutOptions, response_timeout_interceptor,
};

use crate::matcher::Matcher;
use crate::request::RequestConfig;

/// Whether the request described by `config` is in scope for `matcher`.
///
/// Events without a config are never in scope.
fn in_scope(matcher: &Matcher, config: Option<&RequestConfig>) -> bool {
    config.is_some_and(|c| matcher.matches(c.method.as_str(), &c.url))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::request::{HttpMethod, RequestConfig};
    use crate::response::{Response, ResponseData};

    pub fn response(method: HttpMethod, url: &str, status: u16) -> Response {
        Response {
            status,
            status_text: String::new(),
            headers: http::HeaderMap::new(),
            url: format!("http://localhost{url}"),
            data: ResponseData::Empty,
            config: RequestConfig::new(method, url),
        }
    }
}
