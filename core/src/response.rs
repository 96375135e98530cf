//! Loosely-typed response wrapper and the shapes a dispatched call returns.

use std::fmt;

use serde_json::Value;

use crate::client::DEFAULT_BASE_URL;
use crate::error::{ApiError, Result};
use crate::iterable::IterableResult;
use crate::models::{Address, Suggestion};

/// One decoded JSON value plus the text it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    raw: String,
    parsed: Value,
    base_url: String,
}

impl Response {
    /// Wrap an already-decoded value. The raw body is its re-encoding.
    pub fn new(parsed: Value) -> Self {
        Self {
            raw: parsed.to_string(),
            parsed,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub(crate) fn from_parts(raw: String, parsed: Value, base_url: &str) -> Self {
        Self {
            raw,
            parsed,
            base_url: base_url.to_string(),
        }
    }

    /// The JSON text as received.
    pub fn raw_body(&self) -> &str {
        &self.raw
    }

    pub fn parsed_body(&self) -> &Value {
        &self.parsed
    }

    pub fn into_parsed_body(self) -> Value {
        self.parsed
    }

    /// A named top-level field. Present-but-null counts as present.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.parsed
            .get(name)
            .ok_or_else(|| ApiError::MissingFieldError(name.to_string()))
    }

    /// A named top-level field that must be a string.
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.get(name)?
            .as_str()
            .ok_or_else(|| ApiError::DecodeError(format!("property {name} is not a string")))
    }

    /// The `addresses` array as typed addresses, each labelled with the
    /// response's `postcode`. Empty when the field is absent or not an array.
    pub fn addresses(&self) -> Vec<Address> {
        let postcode = self.parsed.get("postcode").and_then(Value::as_str);
        self.array_field("addresses")
            .iter()
            .filter_map(|item| Address::from_value(item, postcode).ok())
            .collect()
    }

    /// The `suggestions` array as typed suggestions. Empty when the field is
    /// absent or not an array.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.array_field("suggestions")
            .iter()
            .filter_map(|item| Suggestion::from_value(item, &self.base_url).ok())
            .collect()
    }

    fn array_field(&self, name: &str) -> &[Value] {
        self.parsed
            .get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How a dispatched call should present its decoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// The decoded value untouched, for callers building their own entity.
    Raw,
    /// A list when the body is a JSON array, a single record otherwise.
    Wrapped,
    /// Always a list: arrays element by element, `null` as empty, anything
    /// else as a one-item list.
    List,
}

/// The decoded body of a dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    RawValue(Value),
    SingleRecord(Response),
    RecordList(IterableResult<Response>),
}

impl Payload {
    pub(crate) fn from_body(raw: String, parsed: Value, shape: Shape, base_url: &str) -> Self {
        match shape {
            Shape::Raw => Payload::RawValue(parsed),
            Shape::Wrapped if parsed.is_array() => {
                Payload::RecordList(list_of(parsed, base_url))
            }
            Shape::Wrapped => Payload::SingleRecord(Response::from_parts(raw, parsed, base_url)),
            Shape::List => Payload::RecordList(list_of(parsed, base_url)),
        }
    }

    /// The decoded value, whatever shape it was delivered in.
    pub fn into_value(self) -> Value {
        match self {
            Payload::RawValue(value) => value,
            Payload::SingleRecord(response) => response.into_parsed_body(),
            Payload::RecordList(items) => {
                Value::Array(items.into_iter().map(Response::into_parsed_body).collect())
            }
        }
    }

    /// View the payload as one record; a list becomes a record wrapping the
    /// whole array.
    pub fn into_response(self) -> Response {
        match self {
            Payload::SingleRecord(response) => response,
            other => Response::new(other.into_value()),
        }
    }

    /// View the payload as a list, using the same rules as [`Shape::List`].
    pub fn into_list(self) -> IterableResult<Response> {
        match self {
            Payload::RecordList(items) => items,
            Payload::SingleRecord(response) => {
                let base_url = response.base_url.clone();
                list_of(response.into_parsed_body(), &base_url)
            }
            Payload::RawValue(value) => list_of(value, DEFAULT_BASE_URL),
        }
    }
}

fn list_of(value: Value, base_url: &str) -> IterableResult<Response> {
    let wrap = |item: Value| Response::from_parts(item.to_string(), item, base_url);
    match value {
        Value::Array(items) => items.into_iter().map(wrap).collect(),
        Value::Null => IterableResult::new(),
        other => std::iter::once(wrap(other)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn find_response() -> Response {
        Response::new(json!({
            "postcode": "NN1 3ER",
            "latitude": 52.24,
            "addresses": [
                {"formatted_address": ["10 Watkin Terrace", "", "", "Northampton", "Northamptonshire"]},
                {"formatted_address": ["12 Watkin Terrace", "", "", "Northampton", "Northamptonshire"]}
            ]
        }))
    }

    #[test]
    fn addresses_carry_the_response_postcode() {
        let addresses = find_response().addresses();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[1].postcode.as_deref(), Some("NN1 3ER"));
        assert!(addresses[0].to_string().ends_with("NN1 3ER"));
    }

    #[test]
    fn absent_or_non_array_lists_are_empty() {
        let response = Response::new(json!({"postcode": "NN1 3ER", "suggestions": "none"}));
        assert!(response.addresses().is_empty());
        assert!(response.suggestions().is_empty());
    }

    #[test]
    fn get_distinguishes_missing_from_null() {
        let response = Response::new(json!({"api-key": "abc", "note": null}));
        assert_eq!(response.get_str("api-key").unwrap(), "abc");
        assert_eq!(response.get("note").unwrap(), &Value::Null);
        assert!(matches!(response.get("id"), Err(ApiError::MissingFieldError(name)) if name == "id"));
        assert!(matches!(response.get_str("note"), Err(ApiError::DecodeError(_))));
    }

    #[test]
    fn raw_body_is_kept_verbatim() {
        let raw = r#"{ "id" : "x1" }"#;
        let response = Response::from_parts(raw.to_string(), json!({"id": "x1"}), DEFAULT_BASE_URL);
        assert_eq!(response.raw_body(), raw);
        assert_eq!(response.to_string(), raw);
    }

    #[test]
    fn wrapped_shape_follows_the_json_type() {
        let list = Payload::from_body("[1,2]".into(), json!([1, 2]), Shape::Wrapped, DEFAULT_BASE_URL);
        assert!(matches!(&list, Payload::RecordList(items) if items.count() == 2));

        let single = Payload::from_body("{}".into(), json!({}), Shape::Wrapped, DEFAULT_BASE_URL);
        assert!(matches!(single, Payload::SingleRecord(_)));

        let raw = Payload::from_body("[1]".into(), json!([1]), Shape::Raw, DEFAULT_BASE_URL);
        assert_eq!(raw, Payload::RawValue(json!([1])));
    }

    #[test]
    fn list_shape_normalises_non_arrays() {
        let empty = Payload::from_body("null".into(), Value::Null, Shape::List, DEFAULT_BASE_URL);
        assert_eq!(empty.into_list().count(), 0);

        let one = Payload::from_body("{\"id\":1}".into(), json!({"id": 1}), Shape::List, DEFAULT_BASE_URL);
        let mut one = one.into_list();
        assert_eq!(one.count(), 1);
        assert_eq!(one.reset().unwrap().get("id").unwrap(), &json!(1));
    }

    #[test]
    fn conversions_preserve_the_value() {
        let payload = Payload::from_body("[1]".into(), json!([1]), Shape::Wrapped, DEFAULT_BASE_URL);
        assert_eq!(payload.clone().into_value(), json!([1]));
        assert_eq!(payload.into_response().parsed_body(), &json!([1]));
    }
}
