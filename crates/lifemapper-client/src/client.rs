//! Lifemapper session manager

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{LmError, Result};
use crate::http::{self, LmRequest};
use crate::params::Param;
use crate::services::{ServiceClient, OTL_API_ROOT};
use crate::session::Session;
use crate::version::{self, VersionCheck};
use crate::xml::XmlNode;

/// Authenticated facade over the Lifemapper web services
///
/// Opening a client logs in (unless the identity is anonymous or the
/// archive user) and checks the library version against the server. Service
/// specific clients issue their requests through it.
#[derive(Debug)]
pub struct LmClient {
    session: Session,
    config: ClientConfig,
}

impl LmClient {
    /// Create a session, log in and check the client version.
    ///
    /// # Errors
    /// Login and version-check failures, including `OutOfDate`. The session
    /// is logged out before a version-check error is returned.
    pub fn open(config: ClientConfig) -> Result<Self> {
        let session = Session::new(&config)?;
        let mut client = Self { session, config };
        client.login()?;

        let client_name = client.config.client_name.clone();
        if let Err(e) = client.check_version(&client_name, None) {
            if let Err(logout_err) = client.logout() {
                warn!(error = %logout_err, "Logout after failed version check failed");
            }
            return Err(e);
        }
        Ok(client)
    }

    /// Open a client, run `f` and log out on every exit path, including
    /// unwinding out of `f`. An error from `f` takes precedence over a
    /// logout error.
    pub fn scoped<T, F>(config: ClientConfig, f: F) -> Result<T>
    where
        F: FnOnce(&LmClient) -> Result<T>,
    {
        let mut guard = LogoutGuard {
            client: Self::open(config)?,
        };
        let outcome = f(&guard.client);
        let logged_out = guard.client.logout();

        match (outcome, logged_out) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(logout_err)) => {
                warn!(error = %logout_err, "Logout failed after error");
                Err(e)
            }
        }
    }

    /// Submit credentials so the session cookie lands in the cookie jar.
    /// Does nothing for shared identities or when no credential was given.
    pub fn login(&mut self) -> Result<()> {
        if self.config.is_shared_identity() {
            debug!(user = %self.config.user_id, "Shared identity, skipping login");
            return Ok(());
        }
        let Some(credential) = self.session.credential().map(str::to_string) else {
            debug!(user = %self.config.user_id, "No credential, skipping login");
            return Ok(());
        };

        let request = LmRequest::post(&format!("{}/login", self.session.server()))
            .param("username", self.config.user_id.clone())
            .param("pword", credential);
        http::send(&self.session, &request)?;

        info!(user = %self.config.user_id, "Logged in");
        Ok(())
    }

    /// Log out and mark the session unusable. Calling it again is a no-op.
    pub fn logout(&mut self) -> Result<()> {
        if self.session.is_closed() {
            return Ok(());
        }
        let request = LmRequest::get(&format!("{}/logout", self.session.server()));
        let result = http::send(&self.session, &request).map(|_| ());
        self.session.close();

        match &result {
            Ok(()) => info!(user = %self.config.user_id, "Logged out"),
            Err(e) => warn!(user = %self.config.user_id, error = %e, "Logout request failed"),
        }
        result
    }

    /// Log out and discard the client
    pub fn close(mut self) -> Result<()> {
        self.logout()
    }

    /// Compare a client version (this library's by default) with the versions
    /// the server reports.
    ///
    /// # Errors
    /// `OutOfDate` below the minimum, plus request and parse failures.
    pub fn check_version(
        &self,
        client_name: &str,
        my_version: Option<&str>,
    ) -> Result<VersionCheck> {
        let doc = self.make_object_request(&LmRequest::get(&self.config.version_url()))?;
        let reported = version::parse_reported_versions(&doc);
        version::check_version(&reported, client_name, my_version)
    }

    /// Issue a request and return the raw response body
    pub fn make_request(&self, request: &LmRequest) -> Result<String> {
        http::send(&self.session, request)
    }

    /// Issue a request and deserialize the XML response
    pub fn make_object_request(&self, request: &LmRequest) -> Result<XmlNode> {
        http::send_object(&self.session, request)
    }

    /// GET a count service and return `items.itemCount`.
    ///
    /// # Errors
    /// `FieldMissing` when the count is absent, `Structure` when it is not a
    /// non-negative integer.
    pub fn get_count(&self, url: &str, parameters: &[Param]) -> Result<u64> {
        let doc = self.make_object_request(&LmRequest::get(url).params(parameters))?;
        count_from(&doc)
    }

    /// GET a list service and return its items. A response without items, or
    /// with an `items` value that holds no `item` children, yields an empty
    /// list.
    pub fn get_list(&self, url: &str, parameters: &[Param]) -> Result<Vec<XmlNode>> {
        let doc = self.make_object_request(&LmRequest::get(url).params(parameters))?;
        Ok(list_from(&doc))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Species distribution modeling services
    pub fn sdm(&self) -> ServiceClient<'_> {
        ServiceClient::new(self, format!("{}/services/sdm", self.session.server()))
    }

    /// Range and diversity services; only for a personal identity
    pub fn rad(&self) -> Option<ServiceClient<'_>> {
        self.identity_scoped(format!("{}/services/rad", self.session.server()))
    }

    /// Open Tree of Life services; only for a personal identity
    pub fn otl(&self) -> Option<ServiceClient<'_>> {
        self.identity_scoped(OTL_API_ROOT.to_string())
    }

    fn identity_scoped(&self, base_url: String) -> Option<ServiceClient<'_>> {
        if self.config.is_shared_identity() {
            return None;
        }
        Some(ServiceClient::new(self, base_url))
    }
}

/// Read `items.itemCount` under the response root as an integer
pub fn count_from(doc: &XmlNode) -> Result<u64> {
    let node = doc.path(&["items", "itemCount"])?;
    let text = node
        .as_text()
        .ok_or_else(|| LmError::Structure("itemCount has no text value".to_string()))?;
    text.trim()
        .parse::<u64>()
        .map_err(|_| LmError::Structure(format!("itemCount is not an integer: {:?}", text)))
}

/// Collect list items from the `items` child of the response root. `items`
/// may itself be repeated; otherwise its `item` children are returned.
/// Absent `items`, or `items` without `item` children, gives an empty list.
pub fn list_from(doc: &XmlNode) -> Vec<XmlNode> {
    let items = match doc.get("items") {
        Some(XmlNode::Sequence(seq)) => return seq.clone(),
        Some(items @ XmlNode::Object(_)) => items,
        Some(XmlNode::Leaf(_)) => {
            debug!("List response has empty items");
            return Vec::new();
        }
        None => {
            debug!("List response has no items");
            return Vec::new();
        }
    };

    match items.get("item") {
        Some(XmlNode::Sequence(seq)) => seq.clone(),
        Some(single) => vec![single.clone()],
        None => Vec::new(),
    }
}

/// Logs the client out if `scoped` unwinds before reaching its own logout
struct LogoutGuard {
    client: LmClient,
}

impl Drop for LogoutGuard {
    fn drop(&mut self) {
        if self.client.session.is_closed() {
            return;
        }
        if let Err(e) = self.client.logout() {
            warn!(error = %e, "Logout during unwind failed");
        }
    }
}
