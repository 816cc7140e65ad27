//! Logging facilities for axis.
//!
//! axis is instrumented with the `tracing` crate. Nothing is printed unless the
//! application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("axis_net=debug")
//!     .init();
//! ```
//!
//! Every event is emitted under one of the [`targets`] below, so filter
//! directives can switch individual subsystems on and off.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "axis_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "axis_core::signal";
    /// Reactive state target.
    pub const REACTIVE: &str = "axis_core::reactive";
    /// Raw HTTP transport target.
    pub const TRANSPORT: &str = "axis_net::transport";
    /// Client factory and interceptor chain target.
    pub const CLIENT: &str = "axis_net::client";
    /// Interceptor factories target.
    pub const INTERCEPTORS: &str = "axis_net::interceptors";
    /// Request hook target.
    pub const HOOK: &str = "axis_net::hook";
}

/// Span names used for performance tracing.
pub mod span_names {
    /// One full pass through a client's interceptor chain and transport.
    pub const REQUEST: &str = "axis::request";
    /// One retry attempt.
    pub const RETRY: &str = "axis::retry";
    /// One hook run.
    pub const HOOK_RUN: &str = "axis::hook_run";
}

/// Performance span guard.
///
/// Creates a tracing span that measures the duration of an operation.
/// When dropped, the span is closed and timing information is recorded.
///
/// # Example
///
/// ```ignore
/// use axis_core::logging::PerfSpan;
///
/// fn encode_body() {
///     let _span = PerfSpan::new("encode_body");
///     // ... work ...
/// } // Span closes here
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "axis::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
