use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::util::{decode, join_non_empty, lenient_f64, lenient_string};

/// A postal address returned by `find` or `get`.
///
/// `formatted` is the service's `formatted_address` array with the postcode
/// appended, so it always reads as a complete label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub building_name: Option<String>,
    pub building_number: Option<String>,
    pub sub_building_name: Option<String>,
    pub sub_building_number: Option<String>,
    pub thoroughfare: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub line3: Option<String>,
    pub line4: Option<String>,
    pub locality: Option<String>,
    pub town_or_city: Option<String>,
    pub county: Option<String>,
    pub district: Option<String>,
    pub country: Option<String>,
    pub postcode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub formatted: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AddressRecord {
    #[serde(deserialize_with = "lenient_string")]
    building_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    building_number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    sub_building_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    sub_building_number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    thoroughfare: Option<String>,
    #[serde(rename = "line_1", deserialize_with = "lenient_string")]
    line1: Option<String>,
    #[serde(rename = "line_2", deserialize_with = "lenient_string")]
    line2: Option<String>,
    #[serde(rename = "line_3", deserialize_with = "lenient_string")]
    line3: Option<String>,
    #[serde(rename = "line_4", deserialize_with = "lenient_string")]
    line4: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    locality: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    town_or_city: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    county: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    district: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    country: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    postcode: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
    formatted_address: Option<Vec<Option<String>>>,
}

impl Address {
    /// Build an address from one decoded address object.
    ///
    /// `postcode` is the enclosing `find` response's postcode; it is only
    /// used when the object does not carry its own.
    pub fn from_value(value: &Value, postcode: Option<&str>) -> Result<Self> {
        let record: AddressRecord = decode(value, "address")?;
        let postcode = record.postcode.or_else(|| postcode.map(str::to_string));

        let mut formatted: Vec<String> = record
            .formatted_address
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        if let Some(postcode) = &postcode {
            formatted.push(postcode.clone());
        }

        Ok(Self {
            building_name: record.building_name,
            building_number: record.building_number,
            sub_building_name: record.sub_building_name,
            sub_building_number: record.sub_building_number,
            thoroughfare: record.thoroughfare,
            line1: record.line1,
            line2: record.line2,
            line3: record.line3,
            line4: record.line4,
            locality: record.locality,
            town_or_city: record.town_or_city,
            county: record.county,
            district: record.district,
            country: record.country,
            postcode,
            latitude: record.latitude,
            longitude: record.longitude,
            formatted,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.formatted.iter().map(|line| Some(line.as_str()));
        f.write_str(&join_non_empty(lines, ", "))
    }
}

/// One partial match from `suggest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Suggestion {
    pub address: String,
    pub id: String,
    /// Absolute URL of the `get` endpoint for this suggestion.
    pub url: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SuggestionRecord {
    #[serde(deserialize_with = "lenient_string")]
    address: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    url: Option<String>,
}

impl Suggestion {
    pub fn from_value(value: &Value, base_url: &str) -> Result<Self> {
        let record: SuggestionRecord = decode(value, "suggestion")?;
        let url = match record.url {
            Some(path) => format!("{}{path}", base_url.trim_end_matches('/')),
            None => String::new(),
        };
        Ok(Self {
            address: record.address.unwrap_or_default(),
            id: record.id.unwrap_or_default(),
            url,
        })
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formatted_lines_gain_the_enclosing_postcode() {
        let value = json!({
            "formatted_address": ["10 Watkin Terrace", "", "", "Northampton", "Northamptonshire"],
            "thoroughfare": "Watkin Terrace",
            "building_number": 10,
            "line_1": "10 Watkin Terrace",
            "town_or_city": "Northampton",
            "county": "Northamptonshire",
            "country": "England"
        });
        let address = Address::from_value(&value, Some("NN1 3ER")).unwrap();

        assert_eq!(address.building_number.as_deref(), Some("10"));
        assert_eq!(address.postcode.as_deref(), Some("NN1 3ER"));
        assert_eq!(address.formatted.len(), 6);
        assert_eq!(
            address.to_string(),
            "10 Watkin Terrace, Northampton, Northamptonshire, NN1 3ER"
        );
    }

    #[test]
    fn own_postcode_wins_over_enclosing_one() {
        let value = json!({"postcode": "SW1A 2AA", "formatted_address": ["10 Downing Street", "London"]});
        let address = Address::from_value(&value, Some("NN1 3ER")).unwrap();
        assert_eq!(address.to_string(), "10 Downing Street, London, SW1A 2AA");
    }

    #[test]
    fn absent_keys_become_none() {
        let address = Address::from_value(&json!({}), None).unwrap();
        assert_eq!(address, Address::default());
        assert_eq!(address.to_string(), "");
    }

    #[test]
    fn suggestion_url_is_made_absolute() {
        let value = json!({
            "address": "10 Watkin Terrace, Northampton",
            "url": "/get/ODI1NzY4MjQ2",
            "id": "ODI1NzY4MjQ2"
        });
        let suggestion = Suggestion::from_value(&value, "https://api.getAddress.io/").unwrap();
        assert_eq!(suggestion.url, "https://api.getAddress.io/get/ODI1NzY4MjQ2");
        assert_eq!(suggestion.to_string(), "10 Watkin Terrace, Northampton");
    }
}
