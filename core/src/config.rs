//! Client configuration.
//!
//! # Design
//! There is no config file. A `ClientBuilder` collects the base URL, the two
//! keys, the TLS flag and an optional transport override; `from_env` fills it
//! from `GETADDRESS_*` variables for programs that keep credentials in the
//! environment.

use std::fmt;

use url::Url;

use crate::client::{Client, DEFAULT_BASE_URL};
use crate::error::{ApiError, Result};
use crate::http::Transport;
use crate::transport::UreqTransport;

pub const API_KEY_VAR: &str = "GETADDRESS_API_KEY";
pub const ADMIN_KEY_VAR: &str = "GETADDRESS_ADMIN_KEY";
pub const BASE_URL_VAR: &str = "GETADDRESS_BASE_URL";
pub const RELAXED_TLS_VAR: &str = "GETADDRESS_RELAXED_TLS";

pub struct ClientBuilder {
    base_url: String,
    api_key: String,
    admin_key: Option<String>,
    relaxed_tls: bool,
    transport: Option<Box<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            admin_key: None,
            relaxed_tls: false,
            transport: None,
        }
    }

    /// Read `GETADDRESS_API_KEY` (required), `GETADDRESS_ADMIN_KEY`,
    /// `GETADDRESS_BASE_URL` and `GETADDRESS_RELAXED_TLS` (`1`/`true`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = present(API_KEY_VAR)
            .ok_or_else(|| ApiError::validation(format!("{API_KEY_VAR} is not set")))?;
        let mut builder = Self::new(api_key);
        builder.admin_key = present(ADMIN_KEY_VAR);
        if let Some(base_url) = present(BASE_URL_VAR) {
            builder.base_url = base_url;
        }
        builder.relaxed_tls = present(RELAXED_TLS_VAR)
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(builder)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn admin_key(mut self, admin_key: impl Into<String>) -> Self {
        self.admin_key = Some(admin_key.into());
        self
    }

    /// Disable TLS certificate verification on the default transport.
    /// Ignored when a custom transport is supplied.
    pub fn relaxed_tls(mut self, relaxed_tls: bool) -> Self {
        self.relaxed_tls = relaxed_tls;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| ApiError::validation(format!("invalid base URL {base_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ApiError::validation(format!(
                "base URL {base_url:?} must be an http(s) URL"
            )));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(UreqTransport::new(self.relaxed_tls)),
        };
        Ok(Client::from_parts(base_url, self.api_key, self.admin_key, transport))
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("admin_key_set", &self.admin_key.is_some())
            .field("relaxed_tls", &self.relaxed_tls)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn env_requires_an_api_key() {
        let err = ClientBuilder::from_lookup(lookup(&[(ADMIN_KEY_VAR, "admin")])).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[test]
    fn env_fills_every_setting() {
        let builder = ClientBuilder::from_lookup(lookup(&[
            (API_KEY_VAR, "lookup-key"),
            (ADMIN_KEY_VAR, "admin-key"),
            (BASE_URL_VAR, "http://127.0.0.1:3000"),
            (RELAXED_TLS_VAR, "TRUE"),
        ]))
        .unwrap();
        assert_eq!(builder.api_key, "lookup-key");
        assert_eq!(builder.admin_key.as_deref(), Some("admin-key"));
        assert_eq!(builder.base_url, "http://127.0.0.1:3000");
        assert!(builder.relaxed_tls);
    }

    #[test]
    fn tls_stays_strict_by_default() {
        let builder = ClientBuilder::from_lookup(lookup(&[(API_KEY_VAR, "k")])).unwrap();
        assert!(!builder.relaxed_tls);
        assert_eq!(builder.base_url, DEFAULT_BASE_URL);
        assert!(!ClientBuilder::new("k").relaxed_tls);
    }

    #[test]
    fn build_rejects_unusable_base_urls() {
        for base_url in ["not a url", "mailto:ops@example.com", "ftp://example.com"] {
            let err = ClientBuilder::new("k").base_url(base_url).build().unwrap_err();
            assert!(matches!(err, ApiError::ValidationError(_)), "{base_url}");
        }
    }

    #[test]
    fn debug_output_hides_keys() {
        let builder = ClientBuilder::new("secret-lookup").admin_key("secret-admin");
        let debug = format!("{builder:?}");
        assert!(!debug.contains("secret"));
    }
}
