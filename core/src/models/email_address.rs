use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use validator::ValidateEmail;

use crate::error::{ApiError, Result};
use crate::util::{decode, lenient_string};

/// A syntactically valid email address, optionally carrying the id the
/// service assigned to it (invoice and expiry cc lists).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    id: Option<String>,
    address: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct EmailAddressRecord {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(rename = "email-address", alias = "email_address", alias = "address", deserialize_with = "lenient_string")]
    address: Option<String>,
}

impl EmailAddress {
    pub fn new(address: &str) -> Result<Self> {
        let address = address.trim().to_string();
        if !address.validate_email() {
            return Err(ApiError::validation(format!("{address:?} is not a valid email address")));
        }
        Ok(Self { id: None, address })
    }

    pub fn with_id(address: &str, id: impl Into<String>) -> Result<Self> {
        let mut email = Self::new(address)?;
        email.id = Some(id.into());
        Ok(email)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let record: EmailAddressRecord = decode(value, "email address")?;
        let mut email = Self::new(record.address.as_deref().unwrap_or_default())?;
        email.id = record.id;
        Ok(email)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
