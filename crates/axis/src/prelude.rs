//! Prelude module for axis.
//!
//! ```ignore
//! use axis::prelude::*;
//! ```
//!
//! This provides access to:
//! - The client (`Client`, `ClientConfig`, `RunnerMethod`)
//! - Requests and responses (`RequestConfig`, `Response`, `HttpError`)
//! - Interceptor factories and their options
//! - Request hooks (`UseRequest`, `UseRequestOptions`, `RequestHook`)
//! - Reactive state (`Reactive`, `Signal`, `Property`)

// ============================================================================
// Client
// ============================================================================

pub use axis_net::{Client, ClientBuilder, ClientConfig, HeaderKeys, RunnerMethod, Transport};

// ============================================================================
// Requests and Responses
// ============================================================================

pub use axis_net::{
    Blob, CancellationToken, ErrorKind, HttpError, HttpMethod, Params, ProgressEvent,
    RequestBody, RequestConfig, Response, ResponseData, ResponseType,
};

// ============================================================================
// Interceptors
// ============================================================================

pub use axis_net::interceptors::{
    RequestHeadersOptions, ResponseBlobOptions, ResponseRetryOptions, ResponseStatusOptions,
    ResponseTimeoutOptions, request_headers_interceptor, response_blob_interceptor,
    response_retry_interceptor, response_status_interceptor, response_timeout_interceptor,
};
pub use axis_net::{
    Interceptor, InterceptorId, InterceptorOptions, MatchOptions, RequestInterceptor,
    ResponseInterceptor,
};

// ============================================================================
// Request Hooks
// ============================================================================

pub use axis_net::hook::{
    HookRefs, RequestHook, RunContext, UseRequest, UseRequestConfig, UseRequestOptions,
};

// ============================================================================
// Reactive State
// ============================================================================

pub use axis_core::{ConnectionId, Property, Reactive, Signal};
