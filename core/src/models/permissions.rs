use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::models::EmailAddress;
use crate::util::{decode, lenient_string};

/// Delegated account access for another email address.
///
/// Setters take `&mut self` and return `&mut Self` so they chain:
///
/// ```
/// # use getaddress_core::Permissions;
/// let mut permissions = Permissions::new("finance@example.com")?;
/// permissions.set_view_invoices(true).set_update_card_details(true);
/// assert!(permissions.view_invoices());
/// # Ok::<(), getaddress_core::ApiError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Permissions {
    email_address: EmailAddress,
    expires: Option<DateTime<Utc>>,
    view_invoices: bool,
    unsubscribe: bool,
    update_card_details: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Grants {
    view_invoices: bool,
    unsubscribe: bool,
    update_card_details: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PermissionsRecord {
    #[serde(deserialize_with = "lenient_string")]
    email_address: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    expires: Option<String>,
    permissions: Option<Grants>,
}

impl Permissions {
    /// No grants and no expiry.
    pub fn new(email_address: &str) -> Result<Self> {
        Ok(Self {
            email_address: EmailAddress::new(email_address)?,
            expires: None,
            view_invoices: false,
            unsubscribe: false,
            update_card_details: false,
        })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let record: PermissionsRecord = decode(value, "permissions")?;
        let email = record
            .email_address
            .ok_or_else(|| ApiError::DecodeError("permissions record without email_address".to_string()))?;
        let grants = record.permissions.unwrap_or_default();

        let mut permissions = Self::new(&email)?;
        permissions.expires = record
            .expires
            .as_deref()
            .and_then(|expires| DateTime::parse_from_rfc3339(expires).ok())
            .map(|expires| expires.with_timezone(&Utc));
        permissions.view_invoices = grants.view_invoices;
        permissions.unsubscribe = grants.unsubscribe;
        permissions.update_card_details = grants.update_card_details;
        Ok(permissions)
    }

    pub fn set_view_invoices(&mut self, view_invoices: bool) -> &mut Self {
        self.view_invoices = view_invoices;
        self
    }

    pub fn set_unsubscribe(&mut self, unsubscribe: bool) -> &mut Self {
        self.unsubscribe = unsubscribe;
        self
    }

    pub fn set_update_card_details(&mut self, update_card_details: bool) -> &mut Self {
        self.update_card_details = update_card_details;
        self
    }

    pub fn set_expires(&mut self, expires: DateTime<Utc>) -> &mut Self {
        self.expires = Some(expires);
        self
    }

    pub fn email_address(&self) -> &EmailAddress {
        &self.email_address
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn view_invoices(&self) -> bool {
        self.view_invoices
    }

    pub fn unsubscribe(&self) -> bool {
        self.unsubscribe
    }

    pub fn update_card_details(&self) -> bool {
        self.update_card_details
    }

    /// The request body the `permission` endpoints expect.
    pub fn to_json(&self) -> Value {
        let expires = self
            .expires
            .map(|expires| expires.to_rfc3339_opts(SecondsFormat::Millis, true));
        serde_json::json!({
            "email_address": self.email_address.address(),
            "expires": expires,
            "permissions": {
                "view_invoices": self.view_invoices,
                "unsubscribe": self.unsubscribe,
                "update_card_details": self.update_card_details,
            },
        })
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
