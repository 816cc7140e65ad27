//! HTTP client conveniences for axis.
//!
//! This crate provides:
//!
//! - **Client**: a reqwest-backed client with one shorthand runner per verb
//!   and response type, default headers and interceptor chains
//! - **Interceptors**: ready-made request/response interceptors scoped by
//!   include/exclude patterns
//! - **Request hooks**: reactive value, loading, error and progress state
//!   around a single request function
//!
//! # Client
//!
//! ```ignore
//! use axis_net::Client;
//! use serde_json::json;
//!
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .header("Accept", "application/json")
//!     .build()?;
//!
//! // Params become the query string for reads...
//! let page = client.get("/users", json!({"page": 2}).as_object().cloned(), None).await?;
//!
//! // ...and the body for writes.
//! client.post_url_encoded("/login", json!({"user": "ada"}).as_object().cloned(), None).await?;
//! ```
//!
//! # Interceptors
//!
//! ```ignore
//! use axis_net::interceptors::{
//!     ResponseRetryOptions, ResponseTimeoutOptions, response_retry_interceptor,
//!     response_timeout_interceptor,
//! };
//!
//! client.use_response_interceptor([
//!     response_retry_interceptor(ResponseRetryOptions::new(2).exclude(["method:POST"])),
//!     response_timeout_interceptor(ResponseTimeoutOptions::new()),
//! ]);
//! ```
//!
//! # Request hooks
//!
//! ```ignore
//! use axis_net::hook::{UseRequest, UseRequestConfig, UseRequestOptions};
//! use axis_net::RunnerMethod;
//!
//! let factory = UseRequest::new(UseRequestConfig::new(client.clone()));
//! let users = factory.use_request(UseRequestOptions::client(RunnerMethod::Get, "/users"));
//!
//! users.loading().subscribe(|loading| println!("loading: {loading}"));
//! users.run(None, None).await?;
//! ```

mod client;
mod config;
pub mod encoding;
pub mod error;
pub mod hook;
mod interceptor;
pub mod interceptors;
pub mod matcher;
mod request;
mod response;
mod transport;

pub use client::{BodyEncoding, Client, HeaderKeys, Runner, RunnerMethod};
pub use config::{ClientBuilder, ClientConfig};
pub use error::{ErrorKind, HttpError, Result};
pub use interceptor::{
    FulfilledFn, Interceptor, InterceptorId, InterceptorManager, InterceptorOptions, RejectedFn,
    RequestInterceptor, ResponseInterceptor, RunWhen,
};
pub use matcher::{MatchOptions, Matcher, create_matcher, match_pattern};
pub use request::{
    HttpMethod, Params, ProgressCallback, ProgressEvent, RequestBody, RequestConfig, ResponseType,
};
pub use response::{Blob, ByteStream, Response, ResponseData};
pub use transport::Transport;

pub use tokio_util::sync::CancellationToken;
