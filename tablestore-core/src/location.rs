//! Service locations and host routing.
//!
//! Geo-redundant accounts expose a primary and a read-only secondary
//! endpoint. A [`LocationHosts`] maps each [`LocationMode`] to the network
//! location (`host` or `host:port`) of that endpoint.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Which of the two service endpoints a request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    /// The primary (read-write) endpoint.
    #[default]
    Primary,
    /// The secondary (read-only) endpoint.
    Secondary,
}

impl LocationMode {
    /// The other location.
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

impl fmt::Display for LocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// Network locations of the primary and secondary endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationHosts {
    /// Primary endpoint host.
    pub primary: String,
    /// Secondary endpoint host, if the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl LocationHosts {
    /// Create hosts for a primary-only account.
    pub fn primary(primary: impl Into<String>) -> Result<Self> {
        let primary = primary.into();
        validate_host(&primary)?;
        Ok(Self {
            primary,
            secondary: None,
        })
    }

    /// Create hosts for an account with both endpoints.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Result<Self> {
        let primary = primary.into();
        let secondary = secondary.into();
        validate_host(&primary)?;
        validate_host(&secondary)?;
        Ok(Self {
            primary,
            secondary: Some(secondary),
        })
    }

    /// Host for the given location.
    pub fn get(&self, mode: LocationMode) -> Option<&str> {
        match mode {
            LocationMode::Primary => Some(self.primary.as_str()).filter(|h| !h.is_empty()),
            LocationMode::Secondary => self.secondary.as_deref().filter(|h| !h.is_empty()),
        }
    }

    /// Whether both endpoints are configured, which failover requires.
    pub fn has_both(&self) -> bool {
        self.get(LocationMode::Primary).is_some() && self.get(LocationMode::Secondary).is_some()
    }

    /// Location whose host matches the URL's network location.
    pub fn detect(&self, url: &Url) -> Option<LocationMode> {
        let current = netloc(url);
        [LocationMode::Primary, LocationMode::Secondary]
            .into_iter()
            .find(|mode| self.get(*mode) == Some(current.as_str()))
    }
}

/// Network location (`host` or `host:port`) of a URL.
pub fn netloc(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Replace the network location of a URL, keeping path, query and fragment.
pub fn set_netloc(url: &mut Url, host: &str) -> Result<()> {
    let parsed = parse_netloc(url.scheme(), host)?;
    url.set_host(parsed.host_str())
        .map_err(|e| invalid_host(host, e.to_string()))?;
    url.set_port(parsed.port())
        .map_err(|()| invalid_host(host, "URL cannot carry a port"))?;
    Ok(())
}

fn validate_host(host: &str) -> Result<()> {
    parse_netloc("https", host).map(|_| ())
}

fn parse_netloc(scheme: &str, host: &str) -> Result<Url> {
    if host.is_empty() || host.contains('/') {
        return Err(invalid_host(host, "expected host or host:port"));
    }
    let parsed = Url::parse(&format!("{scheme}://{host}"))
        .map_err(|e| invalid_host(host, e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(invalid_host(host, "missing host"));
    }
    Ok(parsed)
}

fn invalid_host(host: &str, reason: impl Into<String>) -> PipelineError {
    PipelineError::InvalidHost {
        host: host.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip() {
        assert_eq!(LocationMode::Primary.flip(), LocationMode::Secondary);
        assert_eq!(LocationMode::Secondary.flip(), LocationMode::Primary);
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&LocationMode::Secondary).unwrap();
        assert_eq!(json, "\"secondary\"");
        let mode: LocationMode = serde_json::from_str("\"primary\"").unwrap();
        assert_eq!(mode, LocationMode::Primary);
    }

    #[test]
    fn test_hosts() {
        let hosts = LocationHosts::new("acct.table.core", "acct-secondary.table.core").unwrap();
        assert!(hosts.has_both());
        assert_eq!(
            hosts.get(LocationMode::Secondary),
            Some("acct-secondary.table.core")
        );

        let primary_only = LocationHosts::primary("acct.table.core").unwrap();
        assert!(!primary_only.has_both());
        assert_eq!(primary_only.get(LocationMode::Secondary), None);
    }

    #[test]
    fn test_invalid_host() {
        assert!(LocationHosts::primary("").is_err());
        assert!(LocationHosts::primary("acct.table.core/path").is_err());
    }

    #[test]
    fn test_detect() {
        let hosts = LocationHosts::new("primary.local:10002", "secondary.local:10002").unwrap();
        let url = Url::parse("http://secondary.local:10002/Tables").unwrap();
        assert_eq!(hosts.detect(&url), Some(LocationMode::Secondary));
        let url = Url::parse("http://elsewhere.local/Tables").unwrap();
        assert_eq!(hosts.detect(&url), None);
    }

    #[test]
    fn test_set_netloc_keeps_path_and_query() {
        let mut url =
            Url::parse("https://acct.table.core/Tables('people')?$top=5#frag").unwrap();
        set_netloc(&mut url, "acct-secondary.table.core").unwrap();
        assert_eq!(
            url.as_str(),
            "https://acct-secondary.table.core/Tables('people')?$top=5#frag"
        );

        set_netloc(&mut url, "127.0.0.1:10002").unwrap();
        assert_eq!(netloc(&url), "127.0.0.1:10002");
        assert_eq!(url.path(), "/Tables('people')");
    }
}
