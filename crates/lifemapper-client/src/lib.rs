//! Rust client for the Lifemapper web services
//!
//! This crate provides the request/response pipeline shared by the
//! Lifemapper service clients: an authenticated session with its cookie
//! store, client version negotiation, HTTP request construction and
//! deserialization of the XML responses into a navigable tree.
//!
//! # Example
//!
//! ```no_run
//! use lifemapper_client::{ClientConfig, LmClient};
//!
//! # fn example() -> Result<(), lifemapper_client::LmError> {
//! let config = ClientConfig::new("http://lifemapper.org").with_credentials("jdoe", "secret");
//!
//! let layers = LmClient::scoped(config, |client| {
//!     let sdm = client.sdm();
//!     let count = sdm.get_count("layers", &[])?;
//!     println!("{} layers", count);
//!     sdm.get_list("layers", &[("page".to_string(), Some("0".to_string()))])
//! })?;
//!
//! for layer in layers {
//!     if let Some(id) = layer.get("id").and_then(|n| n.as_text()) {
//!         println!("layer {}", id);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Fixed endpoints
//!
//! - `POST {server}/login` - credentials `username` and `pword`
//! - `GET {server}/logout`
//! - `GET {server}/clients/versions.xml` - minimum and current version per client

mod client;
mod config;
mod error;
mod http;
mod params;
mod services;
mod session;
mod version;
mod xml;

pub use client::{count_from, list_from, LmClient};
pub use config::{
    ClientConfig, DEFAULT_ANONYMOUS_USER, DEFAULT_ARCHIVE_USER, DEFAULT_CLIENT_NAME,
    DEFAULT_SERVER,
};
pub use error::{LmError, Result};
pub use http::{prepare, user_agent, LmRequest, Method, PreparedRequest, ERROR_MESSAGE_HEADER};
pub use params::{encode, sanitize, Param};
pub use services::{ServiceClient, OTL_API_ROOT};
pub use session::Session;
pub use version::{
    check_version, parse_reported_versions, ReportedVersions, VersionCheck, VersionTuple,
    CLIENT_VERSION,
};
pub use xml::{deserialize, XmlNode, XmlObject};
