use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::{ApiError, Result};
use crate::util::{decode, lenient_f64, lenient_string};

/// Units a `DistanceResult` can be expressed in. Parsing is
/// case-insensitive and accepts the usual spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DistanceUnit {
    #[strum(to_string = "m", serialize = "metres", serialize = "meters")]
    Metres,
    #[strum(to_string = "km", serialize = "kilometres", serialize = "kilometers")]
    Kilometres,
    #[strum(to_string = "miles", serialize = "mile")]
    Miles,
    #[strum(to_string = "yds", serialize = "yards")]
    Yards,
    #[strum(to_string = "ft", serialize = "feet")]
    Feet,
}

impl DistanceUnit {
    /// Multiplier from metres.
    pub fn factor(&self) -> f64 {
        match self {
            DistanceUnit::Metres => 1.0,
            DistanceUnit::Kilometres => 0.001,
            DistanceUnit::Miles => 0.000621371,
            DistanceUnit::Yards => 1.09361,
            DistanceUnit::Feet => 3.28084,
        }
    }
}

/// One end of a distance calculation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoPoint {
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub postcode: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DistanceRecord {
    from: GeoPoint,
    to: GeoPoint,
    #[serde(deserialize_with = "lenient_f64")]
    metres: Option<f64>,
}

/// The straight-line distance between two postcodes.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceResult {
    raw: Value,
    from: GeoPoint,
    to: GeoPoint,
    metres: f64,
}

impl DistanceResult {
    pub fn from_value(value: Value) -> Result<Self> {
        let record: DistanceRecord = decode(&value, "distance result")?;
        Ok(Self {
            from: record.from,
            to: record.to,
            metres: record.metres.unwrap_or_default(),
            raw: value,
        })
    }

    /// The payload re-encoded as JSON text.
    pub fn raw_body(&self) -> String {
        self.raw.to_string()
    }

    pub fn parsed_body(&self) -> &Value {
        &self.raw
    }

    pub fn from(&self) -> &GeoPoint {
        &self.from
    }

    pub fn to(&self) -> &GeoPoint {
        &self.to
    }

    pub fn metres(&self) -> f64 {
        self.metres
    }

    pub fn distance_in(&self, unit: DistanceUnit) -> f64 {
        self.metres * unit.factor()
    }

    /// Distance in a unit named by string, e.g. `"km"` or `"Miles"`.
    pub fn distance(&self, unit: &str) -> Result<f64> {
        let unit = DistanceUnit::from_str(unit.trim()).map_err(|_| {
            ApiError::UnitError(format!(
                "{unit:?}; expected one of m, metres, meters, km, kilometres, kilometers, \
                 miles, mile, yds, yards, ft, feet"
            ))
        })?;
        Ok(self.distance_in(unit))
    }
}

impl fmt::Display for DistanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from.postcode.as_deref().unwrap_or("?");
        let to = self.to.postcode.as_deref().unwrap_or("?");
        write!(f, "{from} to {to}: {} m", self.metres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(metres: f64) -> DistanceResult {
        DistanceResult::from_value(json!({
            "from": {"latitude": 52.24, "longitude": -0.89, "postcode": "NN1 3ER"},
            "to": {"latitude": 51.50, "longitude": -0.12, "postcode": "SW1A 2AA"},
            "metres": metres
        }))
        .unwrap()
    }

    #[test]
    fn miles_use_the_fixed_factor() {
        let miles = result(1609.0).distance("miles").unwrap();
        assert!((miles - 1609.0 * 0.000621371).abs() < 1e-9);
    }

    #[test]
    fn every_alias_resolves() {
        let r = result(1000.0);
        for unit in ["m", "metres", "METERS"] {
            assert_eq!(r.distance(unit).unwrap(), 1000.0);
        }
        for unit in ["km", "Kilometres", "kilometers"] {
            assert!((r.distance(unit).unwrap() - 1.0).abs() < 1e-12);
        }
        assert!((r.distance("yds").unwrap() - 1093.61).abs() < 1e-6);
        assert!((r.distance("feet").unwrap() - 3280.84).abs() < 1e-6);
        assert!((r.distance("mile").unwrap() - 0.621371).abs() < 1e-9);
    }

    #[test]
    fn unknown_unit_is_a_unit_error() {
        let err = result(10.0).distance("furlongs").unwrap_err();
        assert!(matches!(err, ApiError::UnitError(_)));
    }

    #[test]
    fn endpoints_and_raw_payload_are_kept() {
        let r = result(83000.0);
        assert_eq!(r.from().postcode.as_deref(), Some("NN1 3ER"));
        assert_eq!(r.to().latitude, Some(51.50));
        assert_eq!(r.parsed_body()["metres"], 83000.0);
        assert_eq!(r.to_string(), "NN1 3ER to SW1A 2AA: 83000 m");
    }
}
