//! HTTP request engine
//!
//! Requests are built in two steps. `prepare` applies the parameter rules
//! (sanitize, encode, body or query string) and the fixed headers without
//! touching the network; `send` performs one blocking round trip through a
//! `Session`. There is no retry.

use std::str::FromStr;

use tracing::debug;

use crate::error::{LmError, Result};
use crate::params::{self, Param};
use crate::session::Session;
use crate::version::CLIENT_VERSION;
use crate::xml::{self, XmlNode};

/// Header carrying the server's explanation of a failed request
pub const ERROR_MESSAGE_HEADER: &str = "Error-Message";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Identifying User-Agent sent with every request
pub fn user_agent() -> String {
    format!(
        "LMClient/{} (Lifemapper Rust Client Library; http://lifemapper.org; lifemapper@ku.edu)",
        CLIENT_VERSION
    )
}

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("get") {
            Ok(Self::Get)
        } else if s.eq_ignore_ascii_case("post") {
            Ok(Self::Post)
        } else {
            Err(format!("unsupported HTTP method: {}", s))
        }
    }
}

/// A request as the caller describes it
#[derive(Debug, Clone)]
pub struct LmRequest {
    pub url: String,
    pub method: Method,
    pub parameters: Vec<Param>,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl LmRequest {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            url: url.to_string(),
            method,
            parameters: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(Method::Post, url)
    }

    /// Add a parameter; `None` values are dropped before encoding
    pub fn param<V: Into<Option<String>>>(mut self, name: &str, value: V) -> Self {
        self.parameters.push((name.to_string(), value.into()));
        self
    }

    pub fn params(mut self, params: &[Param]) -> Self {
        self.parameters.extend_from_slice(params);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A request ready to put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Apply the parameter and header rules to a request.
///
/// Parameters go into the body of a POST without an explicit body;
/// otherwise they are appended as a query string, which is added even when
/// empty.
pub fn prepare(request: &LmRequest) -> PreparedRequest {
    let sanitized = params::sanitize(&request.parameters);
    let encoded = params::encode(&sanitized);

    let (url, body) = match &request.body {
        None if !sanitized.is_empty() && request.method == Method::Post => {
            (request.url.clone(), Some(encoded))
        }
        _ => (format!("{}?{}", request.url, encoded), request.body.clone()),
    };

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case("user-agent"))
        .cloned()
        .collect();
    let has_content_type = headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
    if body.is_some() && !has_content_type {
        headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
    }
    headers.push(("User-Agent".to_string(), user_agent()));

    PreparedRequest {
        method: request.method,
        url,
        body,
        headers,
    }
}

/// Issue a request and return the raw response body.
///
/// # Errors
/// `SessionClosed` after logout, `Server` for a non-success status and
/// `Transport` for anything that prevented reading a response.
pub fn send(session: &Session, request: &LmRequest) -> Result<String> {
    let prepared = prepare(request);
    let http = session.http()?;

    debug!(method = prepared.method.as_str(), url = %prepared.url, "Sending request");

    let mut builder = match prepared.method {
        Method::Get => http.get(&prepared.url),
        Method::Post => http.post(&prepared.url),
    };
    for (name, value) in &prepared.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &prepared.body {
        builder = builder.body(body.clone());
    }

    let response = builder.send().map_err(|e| transport(&prepared.url, &e))?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .headers()
            .get(ERROR_MESSAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(url = %prepared.url, status = status.as_u16(), ?message, "Server reported error");
        return Err(LmError::Server {
            url: prepared.url,
            status: status.as_u16(),
            message,
        });
    }

    response.text().map_err(|e| transport(&prepared.url, &e))
}

/// Issue a request and deserialize the XML response
pub fn send_object(session: &Session, request: &LmRequest) -> Result<XmlNode> {
    let body = send(session, request)?;
    xml::deserialize(&body)
}

fn transport(url: &str, err: &reqwest::Error) -> LmError {
    LmError::Transport {
        url: url.to_string(),
        cause: err.to_string(),
    }
}
