//! Error types for the Lifemapper client

use std::fmt;

use crate::version::VersionTuple;

/// Errors that can occur when talking to the Lifemapper web services
#[derive(Debug)]
pub enum LmError {
    /// The client is older than the minimum version the server supports
    OutOfDate {
        mine: VersionTuple,
        minimum: VersionTuple,
    },
    /// The request never produced an HTTP response (DNS, refused connection,
    /// timeout, unreadable body)
    Transport { url: String, cause: String },
    /// The server answered with a non-success status
    Server {
        url: String,
        status: u16,
        /// Value of the `Error-Message` response header, if any
        message: Option<String>,
    },
    /// The response body is not well-formed XML
    MalformedDocument(String),
    /// An expected field is absent from a response object
    FieldMissing(String),
    /// A field is present but its value has the wrong shape
    Structure(String),
    /// The session was logged out and cannot issue further requests
    SessionClosed,
    /// The HTTP client could not be constructed
    Config(String),
}

impl fmt::Display for LmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfDate { mine, minimum } => write!(
                f,
                "Out of date: my version: {}, minimum version: {}",
                mine, minimum
            ),
            Self::Transport { url, cause } => {
                write!(f, "Error returning from request to {} ({})", url, cause)
            }
            Self::Server {
                url,
                status,
                message: Some(msg),
            } => write!(f, "Server returned {} for {}: {}", status, url, msg),
            Self::Server { url, status, .. } => {
                write!(f, "Server returned {} for {}", status, url)
            }
            Self::MalformedDocument(msg) => write!(f, "Malformed XML document: {}", msg),
            Self::FieldMissing(name) => write!(f, "Missing field: {}", name),
            Self::Structure(msg) => write!(f, "Unexpected response structure: {}", msg),
            Self::SessionClosed => write!(f, "Session is logged out"),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for LmError {}

impl From<quick_xml::Error> for LmError {
    fn from(err: quick_xml::Error) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for LmError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}

/// Result type for Lifemapper client operations
pub type Result<T> = std::result::Result<T, LmError>;
