//! Timeout error normalization.

use std::sync::Arc;

use axis_core::logging::targets;

use super::in_scope;
use crate::error::HttpError;
use crate::interceptor::{Interceptor, InterceptorOptions, ResponseInterceptor};
use crate::matcher::MatchOptions;

/// Code given to timeout errors when none is configured.
pub const DEFAULT_TIMEOUT_CODE: &str = "TIMEOUT";

/// Options for [`response_timeout_interceptor`].
#[derive(Clone, Debug, Default)]
pub struct ResponseTimeoutOptions {
    /// Replacement code. Defaults to [`DEFAULT_TIMEOUT_CODE`].
    pub normalize_error_code: Option<String>,
    /// Which requests to act on.
    pub match_options: MatchOptions,
    /// Options used on registration.
    pub interceptor_options: InterceptorOptions,
}

impl ResponseTimeoutOptions {
    /// Create options with the default code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replacement code.
    pub fn normalize_error_code(mut self, code: impl Into<String>) -> Self {
        self.normalize_error_code = Some(code.into());
        self
    }
}

match_option_setters!(ResponseTimeoutOptions);

/// Give every timeout error a single code.
///
/// Timeouts surface as `ECONNABORTED` or `ETIMEDOUT`; matching ones are
/// rewritten to the configured code and still rejected.
pub fn response_timeout_interceptor(options: ResponseTimeoutOptions) -> ResponseInterceptor {
    let matcher = Arc::new(options.match_options.matcher());
    let code = options
        .normalize_error_code
        .unwrap_or_else(|| DEFAULT_TIMEOUT_CODE.to_string());

    Interceptor::new()
        .on_rejected(move |mut error: HttpError| {
            if error.is_timeout() && in_scope(&matcher, error.config()) {
                tracing::debug!(target: targets::INTERCEPTORS, from = error.code(), to = %code, "normalizing timeout code");
                error.set_code(code.clone());
            }
            async move { Err(error) }
        })
        .options(options.interceptor_options)
}
