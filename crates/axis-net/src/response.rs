//! Response types.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{HttpError, Result};
use crate::request::{RequestConfig, ResponseType};

/// Binary data together with its MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    /// The raw bytes.
    pub bytes: Bytes,
    /// The MIME type reported by the server.
    pub mime: String,
}

impl Blob {
    /// Create a blob.
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the blob is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An unread response body.
///
/// Clones share the same underlying connection; chunks are handed out once.
#[derive(Clone)]
pub struct ByteStream {
    inner: Arc<tokio::sync::Mutex<reqwest::Response>>,
    total_size: Option<u64>,
}

impl ByteStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        let total_size = response.content_length();
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(response)),
            total_size,
        }
    }

    /// Get the total size of the body, if known.
    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    /// Read the next chunk of data.
    ///
    /// Returns `None` when the stream is complete.
    pub async fn next_chunk(&self) -> Result<Option<Bytes>> {
        let mut response = self.inner.lock().await;
        response
            .chunk()
            .await
            .map_err(|e| HttpError::network(e.to_string()))
    }

    /// Collect all remaining chunks into a single buffer.
    pub async fn collect(&self) -> Result<Bytes> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffer))
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("total_size", &self.total_size)
            .finish()
    }
}

/// A decoded response body.
#[derive(Clone, Debug)]
pub enum ResponseData {
    /// No body (HEAD requests, 204 responses, empty JSON bodies).
    Empty,
    /// Parsed JSON.
    Json(serde_json::Value),
    /// Bytes plus MIME type.
    Blob(Blob),
    /// Markup text.
    Document(String),
    /// Raw bytes.
    ArrayBuffer(Bytes),
    /// UTF-8 text.
    Text(String),
    /// The unread body.
    Stream(ByteStream),
}

impl ResponseData {
    /// Decode `bytes` as `response_type`.
    ///
    /// JSON that fails to parse is kept as lossy text whatever the status.
    /// When `strict` is false, non-UTF-8 text is kept lossily too.
    pub(crate) fn decode(
        bytes: Bytes,
        mime: Option<&str>,
        response_type: ResponseType,
        strict: bool,
    ) -> Result<Self> {
        let text = |bytes: Bytes| -> Result<String> {
            match String::from_utf8(bytes.to_vec()) {
                Ok(s) => Ok(s),
                Err(e) if strict => Err(HttpError::decode(e.to_string())),
                Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            }
        };

        Ok(match response_type {
            ResponseType::Json if bytes.is_empty() => Self::Empty,
            ResponseType::Json => match serde_json::from_slice(&bytes) {
                Ok(value) => Self::Json(value),
                Err(_) => Self::Text(String::from_utf8_lossy(&bytes).into_owned()),
            },
            ResponseType::Blob => Self::Blob(Blob::new(
                bytes,
                mime.unwrap_or("application/octet-stream"),
            )),
            ResponseType::Document => Self::Document(text(bytes)?),
            ResponseType::ArrayBuffer => Self::ArrayBuffer(bytes),
            ResponseType::Text => Self::Text(text(bytes)?),
            // Streams are never buffered; the transport builds them directly.
            ResponseType::Stream => Self::ArrayBuffer(bytes),
        })
    }

    /// The JSON value, if this is JSON data.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The text, for text and document data.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Document(s) => Some(s),
            _ => None,
        }
    }

    /// The blob, if this is blob data.
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Self::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    /// The raw bytes, for blob and array buffer data.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::ArrayBuffer(bytes) => Some(bytes),
            Self::Blob(blob) => Some(&blob.bytes),
            _ => None,
        }
    }

    /// The stream, if the body was left unread.
    pub fn as_stream(&self) -> Option<&ByteStream> {
        match self {
            Self::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// Whether there is no body.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A completed response.
#[derive(Clone, Debug)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// The canonical reason phrase for the status.
    pub status_text: String,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// The final URL after redirects.
    pub url: String,
    /// The decoded body.
    pub data: ResponseData,
    /// The configuration that produced this response.
    pub config: RequestConfig,
}

impl Response {
    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Deserialize the JSON body into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        match &self.data {
            ResponseData::Json(value) => {
                serde_json::from_value(value.clone()).map_err(|e| HttpError::decode(e.to_string()))
            }
            ResponseData::Empty => serde_json::from_value(serde_json::Value::Null)
                .map_err(|e| HttpError::decode(e.to_string())),
            _ => Err(HttpError::decode("response body is not JSON")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        let data =
            ResponseData::decode(Bytes::from_static(b"{\"id\":1}"), None, ResponseType::Json, true)
                .unwrap();
        assert_eq!(data.as_json(), Some(&json!({"id": 1})));
    }

    #[test]
    fn test_decode_empty_json() {
        let data = ResponseData::decode(Bytes::new(), None, ResponseType::Json, true).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_decode_invalid_json_falls_back_to_text() {
        for strict in [true, false] {
            let data =
                ResponseData::decode(Bytes::from_static(b"<html>"), None, ResponseType::Json, strict)
                    .unwrap();
            assert_eq!(data.as_text(), Some("<html>"));
        }

        let bad = Bytes::from_static(&[b'o', b'k', 0xff]);
        let data = ResponseData::decode(bad, None, ResponseType::Json, true).unwrap();
        assert_eq!(data.as_text(), Some("ok\u{fffd}"));
    }

    #[test]
    fn test_decode_blob_keeps_mime() {
        let data = ResponseData::decode(
            Bytes::from_static(b"\x89PNG"),
            Some("image/png"),
            ResponseType::Blob,
            true,
        )
        .unwrap();
        let blob = data.as_blob().unwrap();
        assert_eq!(blob.mime, "image/png");
        assert_eq!(blob.len(), 4);
    }

    #[test]
    fn test_decode_blob_default_mime() {
        let data = ResponseData::decode(Bytes::from_static(b"x"), None, ResponseType::Blob, true)
            .unwrap();
        assert_eq!(data.as_blob().unwrap().mime, "application/octet-stream");
    }

    #[test]
    fn test_decode_text_and_document() {
        let text = ResponseData::decode(Bytes::from_static(b"hi"), None, ResponseType::Text, true)
            .unwrap();
        assert_eq!(text.as_text(), Some("hi"));

        let doc = ResponseData::decode(
            Bytes::from_static(b"<p>x</p>"),
            Some("text/html"),
            ResponseType::Document,
            true,
        )
        .unwrap();
        assert!(matches!(doc, ResponseData::Document(_)));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let bad = Bytes::from_static(&[0xff, 0xfe]);
        assert!(ResponseData::decode(bad.clone(), None, ResponseType::Text, true).is_err());
        assert!(ResponseData::decode(bad, None, ResponseType::Text, false).is_ok());
    }

    #[test]
    fn test_response_json() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: u32,
        }

        let response = Response {
            status: 200,
            status_text: "OK".into(),
            headers: http::HeaderMap::new(),
            url: "http://localhost/item".into(),
            data: ResponseData::Json(json!({"id": 7})),
            config: RequestConfig::default(),
        };
        assert!(response.is_success());
        assert_eq!(response.json::<Item>().unwrap().id, 7);
    }
}
