//! Error types for the lmclient binary

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    /// Lifemapper client error
    Client(lifemapper_client::LmError),
    /// Invalid argument or logging setup
    Config(String),
    /// Failed to render output
    Output(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Output(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Client(e) => Some(e),
            Self::Config(_) => None,
            Self::Output(e) => Some(e),
        }
    }
}

impl From<lifemapper_client::LmError> for CliError {
    fn from(e: lifemapper_client::LmError) -> Self {
        Self::Client(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Output(e)
    }
}

impl From<tracing_subscriber::filter::ParseError> for CliError {
    fn from(e: tracing_subscriber::filter::ParseError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
