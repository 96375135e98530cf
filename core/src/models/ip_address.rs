use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::util::{decode, lenient_string};

/// An IPv4 or IPv6 address on the account's whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAddress {
    id: Option<String>,
    value: String,
    addr: IpAddr,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct IpAddressRecord {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    value: Option<String>,
}

impl IpAddress {
    /// The input is kept verbatim; it must parse as an IP address exactly
    /// as given.
    pub fn new(value: &str) -> Result<Self> {
        let addr = value
            .parse::<IpAddr>()
            .map_err(|_| ApiError::validation(format!("{value:?} is not a valid IP address")))?;
        Ok(Self {
            id: None,
            value: value.to_string(),
            addr,
        })
    }

    pub fn with_id(value: &str, id: impl Into<String>) -> Result<Self> {
        let mut ip = Self::new(value)?;
        ip.id = Some(id.into());
        Ok(ip)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let record: IpAddressRecord = decode(value, "IP address")?;
        let mut ip = Self::new(record.value.as_deref().unwrap_or_default())?;
        ip.id = record.id;
        Ok(ip)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
