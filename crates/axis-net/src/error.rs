//! Error types for the networking crate.
//!
//! Every failure surfaces as an [`HttpError`]. Besides a coarse
//! [`ErrorKind`] it carries a machine-readable `code` string, the
//! [`RequestConfig`] that produced it and, for status failures, the
//! [`Response`] itself. Interceptors match on `code` and may rewrite it.

use std::time::Duration;

use crate::request::RequestConfig;
use crate::response::Response;

/// A specialized Result type for axis operations.
pub type Result<T> = std::result::Result<T, HttpError>;

/// Error code for connection and transport failures.
pub const ERR_NETWORK: &str = "ERR_NETWORK";
/// Error code for elapsed request timeouts.
pub const ECONNABORTED: &str = "ECONNABORTED";
/// Alternative timeout code recognised by timeout normalization.
pub const ETIMEDOUT: &str = "ETIMEDOUT";
/// Error code for 4xx responses.
pub const ERR_BAD_REQUEST: &str = "ERR_BAD_REQUEST";
/// Error code for 5xx responses and undecodable bodies.
pub const ERR_BAD_RESPONSE: &str = "ERR_BAD_RESPONSE";
/// Error code for cancelled requests.
pub const ERR_CANCELED: &str = "ERR_CANCELED";
/// Error code for URLs that cannot be parsed or joined.
pub const ERR_INVALID_URL: &str = "ERR_INVALID_URL";
/// Error code for rejected header names or values.
pub const ERR_BAD_OPTION_VALUE: &str = "ERR_BAD_OPTION_VALUE";
/// Error code for request bodies that cannot be serialized.
pub const ERR_BAD_OPTION: &str = "ERR_BAD_OPTION";
/// Error code for transports that cannot be constructed.
pub const ERR_BUILD: &str = "ERR_BUILD";

/// Broad classification of an [`HttpError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection or transport failure.
    Network,
    /// The request or client timeout elapsed.
    Timeout,
    /// The server answered with a non-2xx status.
    Status,
    /// The request's cancellation token fired.
    Cancelled,
    /// The URL could not be parsed or joined with the base URL.
    InvalidUrl,
    /// A header name or value was rejected.
    InvalidHeader,
    /// The request body could not be serialized.
    Encode,
    /// The response body could not be decoded for the requested type.
    Decode,
    /// The underlying transport could not be built.
    Build,
}

impl ErrorKind {
    /// The code an error of this kind carries unless overridden.
    ///
    /// `Status` errors pick their code from the status class instead.
    pub fn default_code(self) -> &'static str {
        match self {
            Self::Network => ERR_NETWORK,
            Self::Timeout => ECONNABORTED,
            Self::Status => ERR_BAD_RESPONSE,
            Self::Cancelled => ERR_CANCELED,
            Self::InvalidUrl => ERR_INVALID_URL,
            Self::InvalidHeader => ERR_BAD_OPTION_VALUE,
            Self::Encode => ERR_BAD_OPTION,
            Self::Decode => ERR_BAD_RESPONSE,
            Self::Build => ERR_BUILD,
        }
    }
}

/// A failed request.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    kind: ErrorKind,
    code: String,
    message: String,
    config: Option<Box<RequestConfig>>,
    response: Option<Box<Response>>,
}

impl HttpError {
    /// Create an error with the kind's default code.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.default_code().to_string(),
            message: message.into(),
            config: None,
            response: None,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Create a timeout error for the given limit.
    pub fn timeout(limit: Option<Duration>) -> Self {
        let ms = limit.map(|d| d.as_millis()).unwrap_or(0);
        Self::new(ErrorKind::Timeout, format!("timeout of {ms}ms exceeded"))
    }

    /// Create a status error from a non-2xx response.
    ///
    /// The error's config is taken from the response.
    pub fn status(response: Response) -> Self {
        let code = if (400..500).contains(&response.status) {
            ERR_BAD_REQUEST
        } else {
            ERR_BAD_RESPONSE
        };
        Self {
            kind: ErrorKind::Status,
            code: code.to_string(),
            message: format!("Request failed with status code {}", response.status),
            config: Some(Box::new(response.config.clone())),
            response: Some(Box::new(response)),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "canceled")
    }

    /// Create an invalid URL error.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidUrl, message)
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidHeader, message)
    }

    /// Create a body encoding error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Encode, message)
    }

    /// Create a body decoding error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Create a transport construction error.
    pub fn build(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Build, message)
    }

    /// Convert a reqwest error raised while executing `config`.
    pub(crate) fn from_reqwest(err: reqwest::Error, config: &RequestConfig) -> Self {
        let error = if err.is_timeout() {
            Self::timeout(config.timeout)
        } else if err.is_builder() {
            Self::invalid_url(err.to_string())
        } else if err.is_decode() {
            Self::decode(err.to_string())
        } else {
            Self::network(err.to_string())
        };
        error.with_config(config.clone())
    }

    /// Attach the request configuration.
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(Box::new(config));
        self
    }

    /// Attach a response.
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    /// The error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The machine-readable error code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace the error code.
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The configuration of the failed request, if known.
    pub fn config(&self) -> Option<&RequestConfig> {
        self.config.as_deref()
    }

    /// The response, for status errors.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// The response status, for status errors.
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Whether this error reports an elapsed timeout.
    ///
    /// Looks at the code and message rather than the kind, so errors built
    /// by custom request functions are recognised too.
    pub fn is_timeout(&self) -> bool {
        (self.code == ECONNABORTED && self.message.contains("timeout")) || self.code == ETIMEDOUT
    }

    /// Whether this error reports a cancelled request.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled || self.code == ERR_CANCELED
    }
}
