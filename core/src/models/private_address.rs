use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::util::{decode, join_non_empty, lenient_string, require_non_blank};

/// An address the account has added to a postcode itself.
///
/// Field names on the wire are camelCase (`line1`, `townOrCity`), unlike the
/// snake_case used by the public lookup endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivateAddress {
    #[serde(skip)]
    pub postcode: String,
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub line1: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub line2: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub line3: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub line4: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub locality: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub town_or_city: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub county: Option<String>,
}

impl PrivateAddress {
    /// An empty address for `postcode`; fill in the public fields before
    /// sending it.
    pub fn new(postcode: &str) -> Result<Self> {
        Ok(Self {
            postcode: require_non_blank(postcode, "postcode")?.to_string(),
            ..Self::default()
        })
    }

    pub fn from_value(postcode: &str, value: &Value) -> Result<Self> {
        let mut address: PrivateAddress = decode(value, "private address")?;
        address.postcode = postcode.trim().to_string();
        Ok(address)
    }

    /// The body for `POST private-address/{postcode}`. The id is only sent
    /// when `include_id` is set and one is known.
    pub fn to_request_body(&self, include_id: bool) -> Value {
        let mut body = serde_json::json!({
            "line1": self.line1,
            "line2": self.line2,
            "line3": self.line3,
            "line4": self.line4,
            "locality": self.locality,
            "townOrCity": self.town_or_city,
            "county": self.county,
        });
        if let (true, Some(id)) = (include_id, &self.id) {
            body["id"] = Value::String(id.clone());
        }
        body
    }
}

impl fmt::Display for PrivateAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            self.line1.as_deref(),
            self.line2.as_deref(),
            self.line3.as_deref(),
            self.line4.as_deref(),
            self.town_or_city.as_deref(),
            self.locality.as_deref(),
            self.county.as_deref(),
            Some(self.postcode.as_str()),
        ];
        f.write_str(&join_non_empty(parts, ", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    #[test]
    fn blank_postcode_is_rejected() {
        assert!(matches!(PrivateAddress::new("  "), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn request_body_uses_camel_case_and_optional_id() {
        let mut address = PrivateAddress::new("NN1 3ER").unwrap();
        address.line1 = Some("Flat 2".to_string());
        address.town_or_city = Some("Northampton".to_string());
        address.id = Some("7".to_string());

        let body = address.to_request_body(false);
        assert_eq!(body["line1"], "Flat 2");
        assert_eq!(body["townOrCity"], "Northampton");
        assert!(body.get("id").is_none());
        assert_eq!(address.to_request_body(true)["id"], "7");
    }

    #[test]
    fn hydrates_and_displays_non_empty_parts() {
        let value = json!({"id": 12, "line1": "Flat 2", "line2": "", "townOrCity": "Northampton"});
        let address = PrivateAddress::from_value("NN1 3ER", &value).unwrap();
        assert_eq!(address.id.as_deref(), Some("12"));
        assert_eq!(address.to_string(), "Flat 2, Northampton, NN1 3ER");
    }
}
