//! Error types for the sitescan crate.

use std::fmt;

/// Result type for sitescan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading assets or driving the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// HTTP request failed, or the body could not be read.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The body ended before the declared Content-Length was reached.
    Truncated {
        /// The URL being downloaded.
        url: String,
        /// Bytes received before the body ended.
        received: u64,
        /// Bytes declared by the server.
        expected: u64,
    },
    /// The server did not declare a Content-Length, so progress cannot be reported.
    LengthUnknown {
        /// The URL being downloaded.
        url: String,
    },
    /// The download was aborted through its signal.
    Aborted {
        /// The URL being downloaded.
        url: String,
    },
    /// A call into the camera primitive failed.
    Camera {
        /// The primitive operation that failed.
        operation: &'static str,
        /// The error message.
        message: String,
    },
    /// A consumer rejected a completed asset as malformed.
    AssetDecode {
        /// The handle URL of the rejected asset.
        handle: String,
        /// The consumer's message.
        message: String,
    },
    /// Invalid data in an input file.
    InvalidData {
        /// Context for where the error occurred.
        context: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
}

impl Error {
    /// Returns true for failures of the transport itself (connection, status, short body).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http { .. } | Error::HttpStatus { .. } | Error::Truncated { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Truncated {
                url,
                received,
                expected,
            } => {
                write!(
                    f,
                    "body of {url} ended after {received} of {expected} bytes"
                )
            }
            Error::LengthUnknown { url } => {
                write!(f, "server did not report a content length for {url}")
            }
            Error::Aborted { url } => write!(f, "download of {url} was aborted"),
            Error::Camera { operation, message } => {
                write!(f, "camera {operation} failed: {message}")
            }
            Error::AssetDecode { handle, message } => {
                write!(f, "asset {handle} could not be decoded: {message}")
            }
            Error::InvalidData { context, detail } => {
                write!(f, "invalid {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidData {
            context: "json",
            detail: e.to_string(),
        }
    }
}
