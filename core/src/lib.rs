//! Synchronous client for the getAddress.io UK address service.
//!
//! # Overview
//! Address lookup by postcode, autocomplete suggestions, typeahead, distance
//! between postcodes, and the account-management endpoints (private
//! addresses, whitelists, permissions, invoices, cc lists, usage).
//!
//! # Design
//! - `Client` describes each endpoint as an `ApiCall`, turns it into a plain
//!   `HttpRequest`, and hands that to a `Transport`. The default transport is
//!   a `ureq` agent; tests swap in a recording double.
//! - Request building and response parsing are public (`build_request`,
//!   `parse_response`) so the I/O boundary stays explicit.
//! - Responses are kept loosely typed in `Response`; typed entities in
//!   `models` are built on demand from the decoded JSON.
//! - Every failure is an `ApiError`; nothing panics on bad input or bad
//!   service data.

pub mod call;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod iterable;
pub mod models;
pub mod response;
pub mod transport;
mod util;

pub use call::{ApiCall, Body, KeyScope};
pub use client::{Client, CcList, UsagePeriod, DEFAULT_BASE_URL, DEFAULT_RESULTS, MAX_RESULTS};
pub use config::ClientBuilder;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use iterable::IterableResult;
pub use models::{
    Address, DistanceResult, DistanceUnit, Domain, EmailAddress, GeoPoint, Invoice,
    InvoiceAddress, InvoiceLine, IpAddress, Permissions, PrivateAddress, Suggestion,
    SubscriptionInfo,
};
pub use response::{Payload, Response, Shape};
pub use transport::UreqTransport;
