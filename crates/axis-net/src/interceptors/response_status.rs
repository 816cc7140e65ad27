//! Status-code dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axis_core::logging::targets;

use super::in_scope;
use crate::error::{HttpError, Result};
use crate::interceptor::{Interceptor, InterceptorOptions, ResponseInterceptor};
use crate::matcher::MatchOptions;
use crate::response::Response;

/// Handles a successful response with a given status. `None` keeps it.
pub type ValidStatusHandler = Arc<dyn Fn(&Response) -> Option<Response> + Send + Sync>;

/// Handles a failed response with a given status.
///
/// `None` keeps the original rejection, `Some(Ok(_))` recovers with a
/// response and `Some(Err(_))` rejects with a different error.
pub type InvalidStatusHandler =
    Arc<dyn Fn(&HttpError) -> Option<Result<Response>> + Send + Sync>;

/// Options for [`response_status_interceptor`].
#[derive(Clone, Default)]
pub struct ResponseStatusOptions {
    /// Handlers for 2xx responses, by status.
    pub valid_status_handler: HashMap<u16, ValidStatusHandler>,
    /// Handlers for error responses, by status.
    pub invalid_status_handler: HashMap<u16, InvalidStatusHandler>,
    /// Which requests to act on.
    pub match_options: MatchOptions,
    /// Options used on registration.
    pub interceptor_options: InterceptorOptions,
}

impl ResponseStatusOptions {
    /// Create options with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle successful responses with `status`.
    pub fn on_valid<F>(mut self, status: u16, f: F) -> Self
    where
        F: Fn(&Response) -> Option<Response> + Send + Sync + 'static,
    {
        self.valid_status_handler.insert(status, Arc::new(f));
        self
    }

    /// Handle failed responses with `status`.
    pub fn on_invalid<F>(mut self, status: u16, f: F) -> Self
    where
        F: Fn(&HttpError) -> Option<Result<Response>> + Send + Sync + 'static,
    {
        self.invalid_status_handler.insert(status, Arc::new(f));
        self
    }
}

match_option_setters!(ResponseStatusOptions);

impl fmt::Debug for ResponseStatusOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut valid: Vec<_> = self.valid_status_handler.keys().collect();
        let mut invalid: Vec<_> = self.invalid_status_handler.keys().collect();
        valid.sort();
        invalid.sort();
        f.debug_struct("ResponseStatusOptions")
            .field("valid_status_handler", &valid)
            .field("invalid_status_handler", &invalid)
            .field("match_options", &self.match_options)
            .finish()
    }
}

/// Dispatch responses and status errors to per-status handlers.
pub fn response_status_interceptor(options: ResponseStatusOptions) -> ResponseInterceptor {
    let matcher = Arc::new(options.match_options.matcher());
    let rejected_matcher = matcher.clone();
    let valid = options.valid_status_handler;
    let invalid = options.invalid_status_handler;

    Interceptor::new()
        .on_fulfilled(move |response: Response| {
            let replaced = if in_scope(&matcher, Some(&response.config)) {
                valid.get(&response.status).and_then(|handler| handler(&response))
            } else {
                None
            };
            if replaced.is_some() {
                tracing::debug!(target: targets::INTERCEPTORS, status = response.status, "response replaced by status handler");
            }
            let out = replaced.unwrap_or(response);
            async move { Ok(out) }
        })
        .on_rejected(move |error: HttpError| {
            let handled = match error.status_code() {
                Some(status) if in_scope(&rejected_matcher, error.config()) => {
                    invalid.get(&status).and_then(|handler| handler(&error))
                }
                _ => None,
            };
            if handled.is_some() {
                tracing::debug!(target: targets::INTERCEPTORS, status = ?error.status_code(), "error handled by status handler");
            }
            let out = handled.unwrap_or(Err(error));
            async move { out }
        })
        .options(options.interceptor_options)
}
