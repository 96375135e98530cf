use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::util::{decode, lenient_date, lenient_f64, lenient_string, lenient_u64};

/// The account's current plan.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SubscriptionInfo {
    #[serde(deserialize_with = "lenient_date")]
    expiry_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_u64")]
    first_daily_limit: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    second_daily_limit: Option<u64>,
    #[serde(deserialize_with = "lenient_f64")]
    amount: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    term: Option<String>,
}

impl SubscriptionInfo {
    pub fn from_value(value: &Value) -> Result<Self> {
        decode(value, "subscription")
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    pub fn first_daily_limit(&self) -> Option<u64> {
        self.first_daily_limit
    }

    pub fn second_daily_limit(&self) -> Option<u64> {
        self.second_daily_limit
    }

    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_plan_fields() {
        let info = SubscriptionInfo::from_value(&json!({
            "expiry_date": "2025-04-01",
            "first_daily_limit": 20,
            "second_daily_limit": "40",
            "amount": 9.99,
            "term": "Monthly"
        }))
        .unwrap();

        assert_eq!(info.expiry_date(), NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(info.first_daily_limit(), Some(20));
        assert_eq!(info.second_daily_limit(), Some(40));
        assert_eq!(info.amount(), Some(9.99));
        assert_eq!(info.term(), Some("Monthly"));
    }

    #[test]
    fn missing_fields_are_none() {
        let info = SubscriptionInfo::from_value(&json!({"term": "Annual"})).unwrap();
        assert!(info.expiry_date().is_none());
        assert!(info.amount().is_none());
    }
}
