//! Typed entities built from decoded service payloads.
//!
//! # Design
//! Every entity is constructed fresh from one decoded JSON value. Absent keys
//! become `None` (or an empty/zero value) rather than failing; only values
//! that must be well formed, such as whitelisted domains, IP addresses and
//! email addresses, are checked, and they are checked at construction.

mod address;
mod distance;
mod domain;
mod email_address;
mod invoice;
mod ip_address;
mod permissions;
mod private_address;
mod subscription;

pub use address::{Address, Suggestion};
pub use distance::{DistanceResult, DistanceUnit, GeoPoint};
pub use domain::Domain;
pub use email_address::EmailAddress;
pub use invoice::{Invoice, InvoiceAddress, InvoiceLine};
pub use ip_address::IpAddress;
pub use permissions::Permissions;
pub use private_address::PrivateAddress;
pub use subscription::SubscriptionInfo;
