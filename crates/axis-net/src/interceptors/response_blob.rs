//! Blob response post-processing.

use std::fmt;
use std::sync::Arc;

use axis_core::logging::targets;

use super::in_scope;
use crate::interceptor::{Interceptor, InterceptorOptions, ResponseInterceptor};
use crate::matcher::MatchOptions;
use crate::request::ResponseType;
use crate::response::Response;

/// Replaces a blob response. Returning `None` keeps the original.
pub type BlobHandler = Arc<dyn Fn(&Response) -> Option<Response> + Send + Sync>;

/// Options for [`response_blob_interceptor`].
#[derive(Clone, Default)]
pub struct ResponseBlobOptions {
    /// Called with every matching blob response.
    pub on_response: Option<BlobHandler>,
    /// Which requests to act on.
    pub match_options: MatchOptions,
    /// Options used on registration.
    pub interceptor_options: InterceptorOptions,
}

impl ResponseBlobOptions {
    /// Create options with no handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler.
    pub fn on_response<F>(mut self, f: F) -> Self
    where
        F: Fn(&Response) -> Option<Response> + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(f));
        self
    }
}

match_option_setters!(ResponseBlobOptions);

impl fmt::Debug for ResponseBlobOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBlobOptions")
            .field("on_response", &self.on_response.is_some())
            .field("match_options", &self.match_options)
            .finish()
    }
}

/// Hand responses requested as [`ResponseType::Blob`] to `on_response`.
///
/// Typical handlers save the file or unwrap an error payload the server
/// sent as a blob. Other response types are left alone.
pub fn response_blob_interceptor(options: ResponseBlobOptions) -> ResponseInterceptor {
    let matcher = Arc::new(options.match_options.matcher());
    let on_response = options.on_response;

    Interceptor::new()
        .on_fulfilled(move |response: Response| {
            let mut response = response;
            if let Some(handler) = &on_response
                && response.config.resolved_response_type() == ResponseType::Blob
                && in_scope(&matcher, Some(&response.config))
                && let Some(replaced) = handler(&response)
            {
                tracing::debug!(target: targets::INTERCEPTORS, url = %response.config.url, "blob response replaced");
                response = replaced;
            }
            async move { Ok(response) }
        })
        .options(options.interceptor_options)
}
