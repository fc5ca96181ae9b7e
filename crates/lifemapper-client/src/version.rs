//! Client version negotiation
//!
//! The server publishes, per client name, the minimum version it still
//! supports and the latest released version. A client below the minimum must
//! stop; a client below the latest only gets a warning.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::{LmError, Result};
use crate::xml::XmlNode;

/// Version of this library, reported in the User-Agent and used when no
/// explicit version is checked
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Status recorded when a version string carries none. Sorts after any
/// lowercase status name.
const UNKNOWN_STATUS: &str = "zzzz";

/// A parsed `major.minor.revision [status]` version string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTuple {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub status: String,
}

impl VersionTuple {
    /// Parse a version string. Never fails: parsing of the numeric part stops
    /// at the first component that is not a non-negative integer, and that
    /// component and all later ones stay 0.
    pub fn parse(s: &str) -> Self {
        let mut tokens = s.split_whitespace();
        let numeric = tokens.next().unwrap_or("");
        let status = tokens.next().unwrap_or(UNKNOWN_STATUS).to_string();

        let mut parts = [0u32; 3];
        for (slot, component) in parts.iter_mut().zip(numeric.split('.')) {
            match component.parse::<u32>() {
                Ok(n) => *slot = n,
                Err(_) => break,
            }
        }

        Self {
            major: parts[0],
            minor: parts[1],
            revision: parts[2],
            status,
        }
    }

    /// The numeric part used for ordering
    pub fn numeric(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.revision)
    }

    /// Numeric comparison only; the status is carried for display
    pub fn is_older_than(&self, other: &VersionTuple) -> bool {
        self.numeric() < other.numeric()
    }
}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)?;
        if self.status != UNKNOWN_STATUS {
            write!(f, " {}", self.status)?;
        }
        Ok(())
    }
}

/// Versions the server reports for one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedVersions {
    pub minimum: String,
    pub current: String,
}

/// Outcome of a successful version check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// At or above the current version
    Current,
    /// Still supported, but a newer version exists
    Outdated {
        mine: VersionTuple,
        current: VersionTuple,
    },
    /// The server does not list this client
    NotListed,
}

/// Decide whether `my_version` (or this library's version) may talk to the
/// server.
///
/// # Errors
/// `LmError::OutOfDate` when the version is below the reported minimum.
pub fn check_version(
    reported: &BTreeMap<String, ReportedVersions>,
    client_name: &str,
    my_version: Option<&str>,
) -> Result<VersionCheck> {
    let Some(versions) = reported.get(client_name) else {
        debug!(client = client_name, "Client not listed by server, skipping version check");
        return Ok(VersionCheck::NotListed);
    };

    let mine = VersionTuple::parse(my_version.unwrap_or(CLIENT_VERSION));
    let minimum = VersionTuple::parse(&versions.minimum);
    let current = VersionTuple::parse(&versions.current);

    if mine.is_older_than(&minimum) {
        return Err(LmError::OutOfDate { mine, minimum });
    }
    if mine.is_older_than(&current) {
        warn!(
            client = client_name,
            mine = %mine,
            current = %current,
            "Client is not latest version"
        );
        return Ok(VersionCheck::Outdated { mine, current });
    }
    Ok(VersionCheck::Current)
}

/// Build the client name → versions mapping from the version-info document.
///
/// The document's root holds repeated `client` elements, each with a `name`
/// and a `versions` element containing `minimum` and `current`. Incomplete
/// entries are skipped.
pub fn parse_reported_versions(doc: &XmlNode) -> BTreeMap<String, ReportedVersions> {
    let mut reported = BTreeMap::new();

    let Some(clients) = doc.get("client") else {
        return reported;
    };

    for client in clients.items() {
        let name = client.get("name").and_then(XmlNode::as_text);
        let versions = client.get("versions");
        let minimum = versions
            .and_then(|v| v.get("minimum"))
            .and_then(XmlNode::as_text);
        let current = versions
            .and_then(|v| v.get("current"))
            .and_then(XmlNode::as_text);

        match (name, minimum, current) {
            (Some(name), Some(minimum), Some(current)) => {
                reported.insert(
                    name.to_string(),
                    ReportedVersions {
                        minimum: minimum.to_string(),
                        current: current.to_string(),
                    },
                );
            }
            _ => debug!(?name, "Skipping incomplete client version entry"),
        }
    }

    reported
}
