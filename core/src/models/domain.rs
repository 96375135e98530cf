use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{ApiError, Result};
use crate::util::{decode, lenient_string};

/// A domain on the account's whitelist.
///
/// The name is either an http(s) URL with a host or a bare host name such as
/// `example.com`. It is checked when the value is built; a `Domain` that
/// exists is always well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    id: Option<String>,
    name: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DomainRecord {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    name: Option<String>,
}

impl Domain {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if !is_valid_domain(name) {
            return Err(ApiError::validation(format!("{name:?} is not a valid domain")));
        }
        Ok(Self {
            id: None,
            name: name.to_string(),
        })
    }

    pub fn with_id(name: &str, id: impl Into<String>) -> Result<Self> {
        let mut domain = Self::new(name)?;
        domain.id = Some(id.into());
        Ok(domain)
    }

    /// Build a domain from a whitelist entry returned by the service.
    pub fn from_value(value: &Value) -> Result<Self> {
        let record: DomainRecord = decode(value, "domain")?;
        let mut domain = Self::new(record.name.as_deref().unwrap_or_default())?;
        domain.id = record.id;
        Ok(domain)
    }

    /// Server-assigned id; `None` until the domain has been whitelisted.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn is_valid_domain(name: &str) -> bool {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return false;
    }
    if let Ok(url) = Url::parse(name) {
        if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
            return true;
        }
    }
    // A bare host has to survive being the whole authority of a URL.
    match Url::parse(&format!("http://{name}")) {
        Ok(url) => {
            url.host_str().is_some_and(|host| host.eq_ignore_ascii_case(name))
                && name.contains('.')
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_urls_and_bare_hosts() {
        for name in ["example.com", "https://example.com", "http://shop.example.co.uk/", "Sub.Example.org"] {
            let domain = Domain::new(name).unwrap();
            assert_eq!(domain.name(), name);
            assert!(domain.id().is_none());
        }
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["", "   ", "not a domain", "localhost", "ftp://example.com", "example.com/path", "exa mple.com"] {
            assert!(
                matches!(Domain::new(name), Err(ApiError::ValidationError(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn hydrates_from_whitelist_entry() {
        let domain = Domain::from_value(&json!({"id": 17, "name": "example.com"})).unwrap();
        assert_eq!(domain.id(), Some("17"));
        assert_eq!(domain.to_string(), "example.com");
    }
}
