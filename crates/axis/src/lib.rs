//! axis - HTTP client conveniences with interceptors and reactive request state.
//!
//! This is the umbrella crate that re-exports the public APIs of
//! `axis-core` and `axis-net`.
//!
//! # Example
//!
//! ```no_run
//! use axis::prelude::*;
//!
//! # async fn demo() -> axis::Result<()> {
//! let client = Client::builder().base_url("https://api.example.com").build()?;
//! client.use_response_interceptor([response_timeout_interceptor(ResponseTimeoutOptions::new())]);
//!
//! let factory = UseRequest::new(UseRequestConfig::new(client));
//! let user = factory.use_request(UseRequestOptions::client(RunnerMethod::Get, "/me"));
//! user.run(None, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub use axis_core::*;
pub use axis_net::*;
