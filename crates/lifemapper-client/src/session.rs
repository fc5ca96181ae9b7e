//! Authenticated session state
//!
//! A `Session` owns the HTTP client and the cookie jar that carries the
//! server's session cookie between requests. It belongs to exactly one
//! `LmClient` and is never shared through global state.

use std::sync::Arc;

use reqwest::cookie::Jar;

use crate::config::ClientConfig;
use crate::error::{LmError, Result};

/// HTTP client and cookie state for one Lifemapper server and identity.
///
/// Created by `LmClient::open`; once closed by logout every request made
/// through it fails with `LmError::SessionClosed`.
pub struct Session {
    http: reqwest::blocking::Client,
    jar: Arc<Jar>,
    server: String,
    user_id: String,
    credential: Option<String>,
    closed: bool,
}

impl Session {
    /// Create an unauthenticated session for the configured server
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::blocking::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| LmError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            jar,
            server: config.server.clone(),
            user_id: config.user_id.clone(),
            credential: config.credential.clone(),
            closed: false,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub(crate) fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// The cookie jar updated by every response
    pub fn cookies(&self) -> &Jar {
        &self.jar
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the session unusable. Later requests fail with `SessionClosed`.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.credential = None;
    }

    /// The HTTP client, unless the session is closed
    pub(crate) fn http(&self) -> Result<&reqwest::blocking::Client> {
        if self.closed {
            return Err(LmError::SessionClosed);
        }
        Ok(&self.http)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.server)
            .field("user_id", &self.user_id)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("closed", &self.closed)
            .finish()
    }
}
