//! Request dispatcher and the public operation surface for getAddress.io.
//!
//! # Design
//! Every public operation validates its inputs, describes the endpoint as an
//! `ApiCall`, and hands it to `dispatch`. Dispatch is split the same way on
//! every call: `build_request` turns the `ApiCall` into a plain
//! `HttpRequest` (key injection, segment encoding, body encoding),
//! the `Transport` executes it, and `parse_response` classifies the status
//! and decodes the body into the requested `Shape`. Both halves are public,
//! so callers can drive an endpoint this crate does not wrap yet.
//!
//! One request, one response: there are no retries and no session state
//! beyond the two stored keys.

use std::fmt;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use url::Url;

use crate::call::{ApiCall, Body, KeyScope};
use crate::config::ClientBuilder;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::iterable::IterableResult;
use crate::models::{
    Address, DistanceResult, Domain, EmailAddress, Invoice, IpAddress, Permissions,
    PrivateAddress, SubscriptionInfo,
};
use crate::response::{Payload, Response, Shape};
use crate::transport::UreqTransport;
use crate::util::require_non_blank;

pub const DEFAULT_BASE_URL: &str = "https://api.getAddress.io";

/// Default `top` for `suggest` and `typeahead`.
pub const DEFAULT_RESULTS: u32 = 6;

/// Largest `top` the service accepts.
pub const MAX_RESULTS: u32 = 20;

/// The window `usage` reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsagePeriod {
    /// Today.
    Current,
    Day(NaiveDate),
    /// Inclusive range; `from` must not be after `to`.
    Range { from: NaiveDate, to: NaiveDate },
}

/// The two email cc lists kept on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcList {
    /// Copied on every invoice.
    Invoices,
    /// Copied when a card is about to expire.
    Expired,
}

impl CcList {
    fn segment(&self) -> &'static str {
        match self {
            CcList::Invoices => "invoices",
            CcList::Expired => "expired",
        }
    }
}

/// Blocking client for the getAddress.io API.
///
/// Holds a general lookup key, an optional administrative key and the
/// transport. Credentials change only through `set_api_key` and
/// `set_admin_key`, which take `&mut self`; sharing one client across
/// threads while changing its keys needs external synchronization.
pub struct Client {
    base_url: String,
    api_key: String,
    admin_key: Option<String>,
    transport: Box<dyn Transport>,
}

impl Client {
    /// A client against the public service with certificate verification on.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_parts(
            DEFAULT_BASE_URL.to_string(),
            api_key.into(),
            None,
            Box::new(UreqTransport::default()),
        )
    }

    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    pub(crate) fn from_parts(
        base_url: String,
        api_key: String,
        admin_key: Option<String>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            base_url,
            api_key,
            admin_key,
            transport,
        }
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        self.api_key = api_key.into();
        self
    }

    pub fn set_admin_key(&mut self, admin_key: impl Into<String>) -> &mut Self {
        self.admin_key = Some(admin_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Turn a call description into a request, attaching the key its scope
    /// requires. Fails without I/O when the admin key is missing.
    pub fn build_request(&self, call: &ApiCall) -> Result<HttpRequest> {
        let key = match call.scope {
            KeyScope::Lookup => self.api_key.as_str(),
            KeyScope::Admin => self
                .admin_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::AuthenticationError(format!(
                        "an administrative key is required for {}",
                        call.path()
                    ))
                })?,
        };

        // `url` drops dot segments while extending, which would retarget the call.
        if let Some(segment) = call.segments.iter().find(|s| matches!(s.as_str(), "." | "..")) {
            return Err(ApiError::validation(format!(
                "{segment:?} is not allowed as a path segment"
            )));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::validation(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::validation(format!("base URL {:?} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(&call.segments);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-key", key);
            for (name, value) in &call.query {
                pairs.append_pair(name, value);
            }
        }

        let (headers, body) = match &call.body {
            Some(Body::Json(value)) => {
                let body = serde_json::to_string(value)
                    .map_err(|e| ApiError::SerializationError(e.to_string()))?;
                (
                    vec![("content-type".to_string(), "application/json".to_string())],
                    Some(body),
                )
            }
            Some(Body::Text(text)) => (Vec::new(), Some(text.clone())),
            None => (Vec::new(), None),
        };

        Ok(HttpRequest {
            method: call.method,
            url: url.into(),
            headers,
            body,
        })
    }

    /// Classify the status and decode the body into `shape`.
    pub fn parse_response(&self, response: HttpResponse, shape: Shape) -> Result<Payload> {
        let parsed = checked_body(&response)?;
        Ok(Payload::from_body(response.body, parsed, shape, &self.base_url))
    }

    /// Build, execute and parse one call.
    pub fn dispatch(&self, call: ApiCall, shape: Shape) -> Result<Payload> {
        let response = self.execute(&call)?;
        self.parse_response(response, shape)
    }

    fn execute(&self, call: &ApiCall) -> Result<HttpResponse> {
        let request = self.build_request(call)?;
        debug!("{} {}", request.method.as_str(), call.path());
        self.transport.execute(&request)
    }

    fn fetch_raw(&self, call: ApiCall) -> Result<Value> {
        Ok(self.dispatch(call, Shape::Raw)?.into_value())
    }

    /// One record over the whole body, arrays included, with the text as
    /// received.
    fn fetch(&self, call: ApiCall) -> Result<Response> {
        let response = self.execute(&call)?;
        let parsed = checked_body(&response)?;
        Ok(Response::from_parts(response.body, parsed, &self.base_url))
    }

    fn fetch_list(&self, call: ApiCall) -> Result<IterableResult<Response>> {
        Ok(self.dispatch(call, Shape::List)?.into_list())
    }

    fn fetch_entities<T, F>(&self, call: ApiCall, build: F) -> Result<IterableResult<T>>
    where
        F: Fn(&Value) -> Result<T>,
    {
        let mut entities = IterableResult::new();
        match self.fetch_raw(call)? {
            Value::Array(items) => {
                for item in &items {
                    entities.add(build(item)?);
                }
            }
            Value::Null => {}
            other => {
                return Err(ApiError::DecodeError(format!(
                    "expected a JSON array, found {other}"
                )))
            }
        }
        Ok(entities)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Every address at `postcode`, optionally narrowed to one house name or
    /// number. Use `Response::addresses` for typed results.
    pub fn lookup(&self, postcode: &str, property: Option<&str>) -> Result<Response> {
        let postcode = require_non_blank(postcode, "postcode")?;
        let mut call = ApiCall::get(KeyScope::Lookup).segment("find").segment(postcode);
        if let Some(property) = property.map(str::trim).filter(|p| !p.is_empty()) {
            call = call.segment(property);
        }
        self.fetch(call.query("expand", "true").query("sort", "true"))
    }

    /// Partial address matches for `term`. `filter` pairs are sent as
    /// `filter[name]=value`. Use `Response::suggestions` for typed results.
    pub fn suggest(&self, term: &str, top: u32, filter: &[(&str, &str)]) -> Result<Response> {
        let term = require_non_blank(term, "autosuggest term")?;
        check_top(top)?;
        let mut call = ApiCall::get(KeyScope::Lookup)
            .segment("suggest")
            .segment(term)
            .query("top", top.to_string());
        for (name, value) in filter {
            call = call.query(format!("filter[{name}]"), *value);
        }
        self.fetch(call)
    }

    /// Completions for a partially typed address field.
    pub fn typeahead(
        &self,
        term: &str,
        top: u32,
        search: &[&str],
        filters: &[(&str, &str)],
    ) -> Result<IterableResult<Response>> {
        let term = require_non_blank(term, "typeahead term")?;
        check_top(top)?;
        let mut call = ApiCall::get(KeyScope::Lookup)
            .segment("typeahead")
            .segment(term)
            .query("top", top.to_string());
        if !search.is_empty() {
            call = call.query("search", search.join(","));
        }
        for (name, value) in filters {
            call = call.query(format!("filters[{name}]"), *value);
        }
        self.fetch_list(call)
    }

    /// The full address behind a suggestion id.
    pub fn get(&self, id: &str) -> Result<Address> {
        let id = require_non_blank(id, "address id")?;
        let value = self.fetch_raw(ApiCall::get(KeyScope::Lookup).segment("get").segment(id))?;
        Address::from_value(&value, None)
    }

    pub fn distance(&self, from: &str, to: &str) -> Result<DistanceResult> {
        let from = require_non_blank(from, "source postcode")?;
        let to = require_non_blank(to, "destination postcode")?;
        let call = ApiCall::get(KeyScope::Lookup)
            .segment("distance")
            .segment(from)
            .segment(to);
        DistanceResult::from_value(self.fetch_raw(call)?)
    }

    // -----------------------------------------------------------------------
    // Account
    // -----------------------------------------------------------------------

    pub fn usage(&self, period: UsagePeriod) -> Result<Response> {
        let mut call = ApiCall::get(KeyScope::Admin).segments(["v3", "usage"]);
        match period {
            UsagePeriod::Current => {}
            UsagePeriod::Day(day) => call = call.segments(date_segments(day)),
            UsagePeriod::Range { from, to } => {
                check_range(from, to)?;
                call = call
                    .segment("from")
                    .segments(date_segments(from))
                    .segment("To")
                    .segments(date_segments(to));
            }
        }
        self.fetch(call)
    }

    pub fn subscription(&self) -> Result<SubscriptionInfo> {
        let value = self.fetch_raw(ApiCall::get(KeyScope::Admin).segment("subscription"))?;
        SubscriptionInfo::from_value(&value)
    }

    // -----------------------------------------------------------------------
    // Private addresses
    // -----------------------------------------------------------------------

    pub fn create_private_address(&self, address: &PrivateAddress) -> Result<Response> {
        let postcode = require_non_blank(&address.postcode, "postcode")?;
        let call = ApiCall::post(KeyScope::Admin)
            .segment("private-address")
            .segment(postcode)
            .json(address.to_request_body(true));
        self.fetch(call)
    }

    /// Like [`Client::create_private_address`] but reports only success or
    /// failure. The error is logged and dropped; prefer the `Result` form.
    pub fn add_private_address(&self, address: &PrivateAddress) -> bool {
        match self.create_private_address(address) {
            Ok(_) => true,
            Err(e) => {
                warn!("adding private address at {} failed: {e}", address.postcode);
                false
            }
        }
    }

    pub fn get_private_address(&self, postcode: &str, id: &str) -> Result<PrivateAddress> {
        let postcode = require_non_blank(postcode, "postcode")?;
        let id = require_non_blank(id, "private address id")?;
        let call = ApiCall::get(KeyScope::Admin)
            .segment("private-address")
            .segment(postcode)
            .segment(id);
        PrivateAddress::from_value(postcode, &self.fetch_raw(call)?)
    }

    pub fn get_private_addresses(&self, postcode: &str) -> Result<IterableResult<PrivateAddress>> {
        let postcode = require_non_blank(postcode, "postcode")?;
        let call = ApiCall::get(KeyScope::Admin)
            .segment("private-address")
            .segment(postcode);
        self.fetch_entities(call, |value| PrivateAddress::from_value(postcode, value))
    }

    pub fn delete_private_address(&self, postcode: &str, id: &str) -> Result<Response> {
        let postcode = require_non_blank(postcode, "postcode")?;
        let id = require_non_blank(id, "private address id")?;
        let call = ApiCall::delete(KeyScope::Admin)
            .segment("private-address")
            .segment(postcode)
            .segment(id);
        self.fetch(call)
    }

    // -----------------------------------------------------------------------
    // Security
    // -----------------------------------------------------------------------

    pub fn get_api_key(&self) -> Result<String> {
        let response = self.fetch(ApiCall::get(KeyScope::Admin).segments(["security", "api-key"]))?;
        Ok(response.get_str("api-key")?.to_string())
    }

    /// Replace the account's lookup key and return the new one. The key
    /// stored on this client is not changed.
    pub fn refresh_api_key(&self) -> Result<String> {
        let response = self.fetch(ApiCall::put(KeyScope::Admin).segments(["security", "api-key"]))?;
        Ok(response.get_str("api-key")?.to_string())
    }

    /// Whitelist `domain` and return it with the id the service assigned.
    pub fn add_domain_to_whitelist(&self, domain: &Domain) -> Result<Domain> {
        let call = ApiCall::post(KeyScope::Admin)
            .segments(["security", "domain-whitelist"])
            .json(json!({ "name": domain.name() }));
        let id = id_of(&self.fetch(call)?)?;
        Domain::with_id(domain.name(), id)
    }

    pub fn remove_domain_from_whitelist(&self, domain: &Domain) -> Result<Response> {
        let id = domain
            .id()
            .ok_or_else(|| ApiError::validation(format!("domain {domain} has no id")))?;
        let call = ApiCall::delete(KeyScope::Admin)
            .segments(["security", "domain-whitelist"])
            .segment(id);
        self.fetch(call)
    }

    pub fn get_whitelist_domain(&self, id: &str) -> Result<Domain> {
        let id = require_non_blank(id, "domain id")?;
        let call = ApiCall::get(KeyScope::Admin)
            .segments(["security", "domain-whitelist"])
            .segment(id);
        Domain::from_value(&self.fetch_raw(call)?)
    }

    pub fn get_whitelist_domains(&self) -> Result<IterableResult<Domain>> {
        let call = ApiCall::get(KeyScope::Admin).segments(["security", "domain-whitelist"]);
        self.fetch_entities(call, Domain::from_value)
    }

    /// Whitelist `ip` and return it with the id the service assigned.
    pub fn add_ip_to_whitelist(&self, ip: &IpAddress) -> Result<IpAddress> {
        let call = ApiCall::post(KeyScope::Admin)
            .segments(["security", "ip-address-whitelist"])
            .json(json!({ "value": ip.value() }));
        let id = id_of(&self.fetch(call)?)?;
        IpAddress::with_id(ip.value(), id)
    }

    pub fn remove_ip_from_whitelist(&self, ip: &IpAddress) -> Result<Response> {
        let id = ip
            .id()
            .ok_or_else(|| ApiError::validation(format!("IP address {ip} has no id")))?;
        let call = ApiCall::delete(KeyScope::Admin)
            .segments(["security", "ip-address-whitelist"])
            .segment(id);
        self.fetch(call)
    }

    pub fn get_whitelist_ip(&self, id: &str) -> Result<IpAddress> {
        let id = require_non_blank(id, "IP address id")?;
        let call = ApiCall::get(KeyScope::Admin)
            .segments(["security", "ip-address-whitelist"])
            .segment(id);
        IpAddress::from_value(&self.fetch_raw(call)?)
    }

    pub fn get_whitelist_ips(&self) -> Result<IterableResult<IpAddress>> {
        let call = ApiCall::get(KeyScope::Admin).segments(["security", "ip-address-whitelist"]);
        self.fetch_entities(call, IpAddress::from_value)
    }

    // -----------------------------------------------------------------------
    // Permissions
    // -----------------------------------------------------------------------

    pub fn get_permission(&self, email: &str) -> Result<Permissions> {
        let email = EmailAddress::new(email)?;
        // The service only routes this one with a trailing slash.
        let call = ApiCall::get(KeyScope::Admin)
            .segment("permission")
            .segment(email.address())
            .segment("");
        Permissions::from_value(&self.fetch_raw(call)?)
    }

    pub fn get_permissions(&self) -> Result<IterableResult<Permissions>> {
        let call = ApiCall::get(KeyScope::Admin).segment("permission");
        self.fetch_entities(call, Permissions::from_value)
    }

    pub fn add_permission(&self, permissions: &Permissions) -> Result<Response> {
        let call = ApiCall::post(KeyScope::Admin)
            .segment("permission")
            .json(permissions.to_json());
        self.fetch(call)
    }

    pub fn update_permission(&self, permissions: &Permissions) -> Result<Response> {
        let call = ApiCall::put(KeyScope::Admin)
            .segment("permission")
            .json(permissions.to_json());
        self.fetch(call)
    }

    pub fn delete_permission(&self, email: &str) -> Result<Response> {
        let email = EmailAddress::new(email)?;
        let call = ApiCall::delete(KeyScope::Admin)
            .segment("permission")
            .segment(email.address());
        self.fetch(call)
    }

    // -----------------------------------------------------------------------
    // Billing
    // -----------------------------------------------------------------------

    /// The account's primary email address.
    pub fn get_email_address(&self) -> Result<EmailAddress> {
        let value = self.fetch_raw(ApiCall::get(KeyScope::Admin).segment("email-address"))?;
        EmailAddress::from_value(&value)
    }

    pub fn update_email_address(&self, email: &EmailAddress) -> Result<Response> {
        let call = ApiCall::put(KeyScope::Admin)
            .segment("email-address")
            .json(json!({ "new-email-address": email.address() }));
        self.fetch(call)
    }

    pub fn get_invoice(&self, number: &str) -> Result<Invoice> {
        let number = require_non_blank(number, "invoice number")?;
        let call = ApiCall::get(KeyScope::Admin).segment("invoices").segment(number);
        Invoice::from_value(&self.fetch_raw(call)?)
    }

    pub fn get_invoices(&self) -> Result<IterableResult<Invoice>> {
        let call = ApiCall::get(KeyScope::Admin).segment("invoices");
        self.fetch_entities(call, Invoice::from_value)
    }

    pub fn get_invoices_between(&self, from: NaiveDate, to: NaiveDate) -> Result<IterableResult<Invoice>> {
        check_range(from, to)?;
        let call = ApiCall::get(KeyScope::Admin)
            .segments(["invoices", "from"])
            .segments(date_segments(from))
            .segment("To")
            .segments(date_segments(to));
        self.fetch_entities(call, Invoice::from_value)
    }

    /// Add `email` to a cc list and return it with the id the service
    /// assigned.
    pub fn add_cc(&self, list: CcList, email: &EmailAddress) -> Result<EmailAddress> {
        let call = ApiCall::post(KeyScope::Admin)
            .segments(["cc", list.segment()])
            .json(json!({ "email-address": email.address() }));
        let id = id_of(&self.fetch(call)?)?;
        EmailAddress::with_id(email.address(), id)
    }

    pub fn remove_cc(&self, list: CcList, id: &str) -> Result<Response> {
        let id = require_non_blank(id, "cc id")?;
        let call = ApiCall::delete(KeyScope::Admin)
            .segments(["cc", list.segment()])
            .segment(id);
        self.fetch(call)
    }

    pub fn get_cc(&self, list: CcList, id: &str) -> Result<EmailAddress> {
        let id = require_non_blank(id, "cc id")?;
        let call = ApiCall::get(KeyScope::Admin)
            .segments(["cc", list.segment()])
            .segment(id);
        EmailAddress::from_value(&self.fetch_raw(call)?)
    }

    pub fn get_ccs(&self, list: CcList) -> Result<IterableResult<EmailAddress>> {
        let call = ApiCall::get(KeyScope::Admin).segments(["cc", list.segment()]);
        self.fetch_entities(call, EmailAddress::from_value)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("admin_key_set", &self.admin_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<()> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    let message =
        service_message(&response.body).unwrap_or_else(|| format!("HTTP {}", response.status));
    error!("HTTP {}: {message}", response.status);
    if response.status == 401 {
        return Err(ApiError::AuthenticationError(message));
    }
    Err(ApiError::lookup(Some(response.status), message))
}

/// The service's own explanation, if the error body has one.
fn service_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let message = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["Message", "message"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
    });
    Some(message.unwrap_or_else(|| body.to_string()))
}

fn checked_body(response: &HttpResponse) -> Result<Value> {
    check_status(response)?;
    decode_body(&response.body)
}

/// An empty body is JSON `null`.
fn decode_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| ApiError::DecodeError(e.to_string()))
}

/// The `id` of a freshly created resource, as a string.
fn id_of(response: &Response) -> Result<String> {
    match response.get("id")? {
        Value::String(id) => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(ApiError::DecodeError(format!("unexpected id {other}"))),
    }
}

fn check_top(top: u32) -> Result<()> {
    if !(1..=MAX_RESULTS).contains(&top) {
        return Err(ApiError::validation(format!(
            "top must be between 1 and {MAX_RESULTS}, got {top}"
        )));
    }
    Ok(())
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<()> {
    if from > to {
        return Err(ApiError::validation(format!("{from} is after {to}")));
    }
    Ok(())
}

fn date_segments(date: NaiveDate) -> [String; 3] {
    [
        date.format("%d").to_string(),
        date.format("%m").to_string(),
        date.format("%Y").to_string(),
    ]
}
