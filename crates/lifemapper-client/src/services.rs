//! Handles for service-specific clients
//!
//! A `ServiceClient` resolves endpoint paths below one service root and sends
//! everything through the owning `LmClient`, so it shares its session and
//! cookies. Endpoint schemas belong to the callers.

use crate::client::LmClient;
use crate::error::Result;
use crate::http::LmRequest;
use crate::params::Param;
use crate::xml::XmlNode;

/// Root of the Open Tree of Life API used by the tree services
pub const OTL_API_ROOT: &str = "https://api.opentreeoflife.org/v2";

#[derive(Debug, Clone)]
pub struct ServiceClient<'a> {
    client: &'a LmClient,
    base_url: String,
}

impl<'a> ServiceClient<'a> {
    pub(crate) fn new(client: &'a LmClient, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an endpoint below this service
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get_count(&self, path: &str, parameters: &[Param]) -> Result<u64> {
        self.client.get_count(&self.url(path), parameters)
    }

    pub fn get_list(&self, path: &str, parameters: &[Param]) -> Result<Vec<XmlNode>> {
        self.client.get_list(&self.url(path), parameters)
    }

    /// Send a request whose URL is a path below this service
    pub fn make_request(&self, mut request: LmRequest) -> Result<String> {
        request.url = self.url(&request.url);
        self.client.make_request(&request)
    }

    pub fn make_object_request(&self, mut request: LmRequest) -> Result<XmlNode> {
        request.url = self.url(&request.url);
        self.client.make_object_request(&request)
    }
}
