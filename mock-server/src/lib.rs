//! In-memory imitation of the getAddress.io API for local development and
//! tests.
//!
//! Lookup endpoints answer from a small fixed directory of addresses; account
//! endpoints keep their state in memory for the life of the router. Every
//! request must carry the right `api-key` query parameter for its endpoint,
//! otherwise the answer is `401` with a `Message` body like the live service.

use std::{
    collections::{BTreeMap, HashMap},
    net::IpAddr,
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "lookup-key";
pub const DEFAULT_ADMIN_KEY: &str = "admin-key";
pub const DEFAULT_EMAIL_ADDRESS: &str = "owner@example.com";
pub const MAX_RESULTS: usize = 20;

pub type Db = Arc<RwLock<Account>>;
type Params = HashMap<String, String>;

/// Which key an endpoint accepts.
#[derive(Clone, Copy, Debug)]
enum Scope {
    Lookup,
    Admin,
}

/// Everything the account endpoints can change.
#[derive(Debug)]
pub struct Account {
    api_key: String,
    admin_key: String,
    email_address: String,
    next_id: u64,
    private_addresses: BTreeMap<String, Vec<PrivateAddressEntry>>,
    domains: Vec<Entry>,
    ips: Vec<Entry>,
    permissions: BTreeMap<String, PermissionEntry>,
    cc: HashMap<String, Vec<Entry>>,
}

impl Account {
    fn new(api_key: &str, admin_key: &str) -> Self {
        let cc = ["invoices", "expired"]
            .into_iter()
            .map(|list| (list.to_string(), Vec::new()))
            .collect();
        Self {
            api_key: api_key.to_string(),
            admin_key: admin_key.to_string(),
            email_address: DEFAULT_EMAIL_ADDRESS.to_string(),
            next_id: 1,
            private_addresses: BTreeMap::new(),
            domains: Vec::new(),
            ips: Vec::new(),
            permissions: BTreeMap::new(),
            cc,
        }
    }

    fn authorize(&self, params: &Params, scope: Scope) -> Result<(), Failure> {
        let expected = match scope {
            Scope::Lookup => &self.api_key,
            Scope::Admin => &self.admin_key,
        };
        match params.get("api-key") {
            Some(key) if key == expected => Ok(()),
            _ => {
                warn!("rejecting {scope:?} request with a missing or unknown api-key");
                Err(Failure::new(StatusCode::UNAUTHORIZED, "Invalid api-key"))
            }
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// An error answer: the status plus a `{"Message": ...}` body.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "Message": self.message }))).into_response()
    }
}

type Answer = Result<Json<Value>, Failure>;

/// A whitelisted domain, whitelisted IP or cc'd email address.
#[derive(Clone, Debug)]
struct Entry {
    id: u64,
    value: String,
}

impl Entry {
    fn to_json(&self, field: &str) -> Value {
        json!({ "id": self.id, field: self.value })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivateAddressEntry {
    #[serde(skip_deserializing)]
    pub id: u64,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub line3: Option<String>,
    pub line4: Option<String>,
    pub locality: Option<String>,
    pub town_or_city: Option<String>,
    pub county: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Grants {
    pub view_invoices: bool,
    pub unsubscribe: bool,
    pub update_card_details: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub email_address: String,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub permissions: Grants,
}

// ---------------------------------------------------------------------------
// Fixed directory
// ---------------------------------------------------------------------------

struct Place {
    id: &'static str,
    postcode: &'static str,
    building_number: &'static str,
    thoroughfare: &'static str,
    town_or_city: &'static str,
    county: &'static str,
}

const PLACES: &[Place] = &[
    Place {
        id: "NN13ER-10",
        postcode: "NN1 3ER",
        building_number: "10",
        thoroughfare: "Watkin Terrace",
        town_or_city: "Northampton",
        county: "Northamptonshire",
    },
    Place {
        id: "NN13ER-12",
        postcode: "NN1 3ER",
        building_number: "12",
        thoroughfare: "Watkin Terrace",
        town_or_city: "Northampton",
        county: "Northamptonshire",
    },
    Place {
        id: "SW1A2AA-10",
        postcode: "SW1A 2AA",
        building_number: "10",
        thoroughfare: "Downing Street",
        town_or_city: "London",
        county: "",
    },
];

/// Postcode centroids: (postcode, latitude, longitude).
const CENTROIDS: &[(&str, f64, f64)] = &[
    ("NN1 3ER", 52.24593, -0.891701),
    ("SW1A 2AA", 51.50354, -0.127695),
];

impl Place {
    fn line_1(&self) -> String {
        format!("{} {}", self.building_number, self.thoroughfare)
    }

    fn label(&self) -> String {
        format!("{}, {}", self.line_1(), self.town_or_city)
    }

    fn field(&self, name: &str) -> Option<&'static str> {
        match name {
            "postcode" => Some(self.postcode),
            "thoroughfare" => Some(self.thoroughfare),
            "town_or_city" => Some(self.town_or_city),
            "county" => Some(self.county),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "building_number": self.building_number,
            "thoroughfare": self.thoroughfare,
            "line_1": self.line_1(),
            "line_2": "",
            "line_3": "",
            "line_4": "",
            "locality": "",
            "town_or_city": self.town_or_city,
            "county": self.county,
            "district": self.town_or_city,
            "country": "England",
            "formatted_address": [self.line_1(), "", "", self.town_or_city, self.county],
        })
    }
}

fn compact(postcode: &str) -> String {
    postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

fn centroid(postcode: &str) -> Option<(&'static str, f64, f64)> {
    let wanted = compact(postcode);
    CENTROIDS.iter().copied().find(|(p, _, _)| compact(p) == wanted)
}

fn contains_ignoring_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `top` from the query string, defaulting to 6.
fn top(params: &Params) -> Result<usize, Failure> {
    let top = match params.get("top") {
        Some(top) => top
            .parse::<usize>()
            .map_err(|_| Failure::bad_request("top must be a number"))?,
        None => 6,
    };
    if !(1..=MAX_RESULTS).contains(&top) {
        return Err(Failure::bad_request(format!(
            "top must be between 1 and {MAX_RESULTS}"
        )));
    }
    Ok(top)
}

/// Keep the places that satisfy every `{prefix}[field]=value` parameter.
fn filtered<'a>(params: &'a Params, prefix: &'a str) -> impl Fn(&Place) -> bool + 'a {
    move |place| {
        params.iter().all(|(key, value)| {
            let Some(field) = key
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('['))
                .and_then(|rest| rest.strip_suffix(']'))
            else {
                return true;
            };
            place
                .field(field)
                .map_or(true, |actual| actual.eq_ignore_ascii_case(value))
        })
    }
}

/// Great-circle distance in metres.
fn haversine(from: (f64, f64), to: (f64, f64)) -> f64 {
    const EARTH_RADIUS_METRES: f64 = 6_371_000.0;
    let (lat1, lat2) = (from.0.to_radians(), to.0.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (to.1 - from.1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METRES * a.sqrt().asin()
}

/// `(year, month, day)` from path segments, for ordering dates.
fn date_key(day: &str, month: &str, year: &str) -> Result<(u32, u32, u32), Failure> {
    let parse = |part: &str| {
        part.parse::<u32>()
            .map_err(|_| Failure::bad_request(format!("{day}/{month}/{year} is not a date")))
    };
    Ok((parse(year)?, parse(month)?, parse(day)?))
}

struct InvoiceFixture {
    number: &'static str,
    date: (u32, u32, u32),
    total: &'static str,
    tax: &'static str,
}

const INVOICES: &[InvoiceFixture] = &[
    InvoiceFixture {
        number: "INV-1001",
        date: (2024, 1, 31),
        total: "24.00",
        tax: "4.00",
    },
    InvoiceFixture {
        number: "INV-1002",
        date: (2024, 2, 29),
        total: "1440.00",
        tax: "240.00",
    },
];

impl InvoiceFixture {
    fn to_json(&self) -> Value {
        let (year, month, day) = self.date;
        json!({
            "date": format!("{year:04}-{month:02}-{day:02}"),
            "number": self.number,
            "address_1": "Example Ltd",
            "address_2": "10 Watkin Terrace",
            "address_3": "",
            "address_4": "Northampton",
            "address_5": "Northamptonshire",
            "address_6": "NN1 3ER",
            "total": self.total,
            "tax": self.tax,
            "invoice_lines": [
                {"details": "Monthly plan", "quantity": 1, "unit_price": self.total, "subtotal": self.total}
            ],
            "pdf_url": format!("https://api.getaddress.io/invoices/{}/pdf", self.number),
        })
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// A fresh server with the default keys.
pub fn app() -> Router {
    app_with_keys(DEFAULT_API_KEY, DEFAULT_ADMIN_KEY)
}

pub fn app_with_keys(api_key: &str, admin_key: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(Account::new(api_key, admin_key)));
    Router::new()
        .route("/find/{postcode}", get(find))
        .route("/find/{postcode}/{property}", get(find_property))
        .route("/suggest/{term}", get(suggest))
        .route("/typeahead/{term}", get(typeahead))
        .route("/get/{id}", get(get_address))
        .route("/distance/{from}/{to}", get(distance))
        .route("/v3/usage", get(usage))
        .route("/v3/usage/{day}/{month}/{year}", get(usage_on))
        .route(
            "/v3/usage/from/{from_day}/{from_month}/{from_year}/To/{to_day}/{to_month}/{to_year}",
            get(usage_between),
        )
        .route("/subscription", get(subscription))
        .route(
            "/private-address/{postcode}",
            get(list_private_addresses).post(add_private_address),
        )
        .route(
            "/private-address/{postcode}/{id}",
            get(get_private_address).delete(delete_private_address),
        )
        .route("/security/api-key", get(get_api_key).put(refresh_api_key))
        .route("/security/domain-whitelist", get(list_domains).post(add_domain))
        .route(
            "/security/domain-whitelist/{id}",
            get(get_domain).delete(delete_domain),
        )
        .route("/security/ip-address-whitelist", get(list_ips).post(add_ip))
        .route(
            "/security/ip-address-whitelist/{id}",
            get(get_ip).delete(delete_ip),
        )
        .route(
            "/permission",
            get(list_permissions).post(add_permission).put(update_permission),
        )
        .route("/permission/{email}", axum::routing::delete(delete_permission))
        .route("/permission/{email}/", get(get_permission))
        .route(
            "/email-address",
            get(get_email_address).put(update_email_address),
        )
        .route("/invoices", get(list_invoices))
        .route("/invoices/{number}", get(get_invoice))
        .route(
            "/invoices/from/{from_day}/{from_month}/{from_year}/To/{to_day}/{to_month}/{to_year}",
            get(invoices_between),
        )
        .route("/cc/{list}", get(list_cc).post(add_cc))
        .route("/cc/{list}/{id}", get(get_cc).delete(delete_cc))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Lookup handlers
// ---------------------------------------------------------------------------

async fn find(State(db): State<Db>, Path(postcode): Path<String>, Query(params): Query<Params>) -> Answer {
    find_matching(&db, &postcode, None, &params).await
}

async fn find_property(
    State(db): State<Db>,
    Path((postcode, property)): Path<(String, String)>,
    Query(params): Query<Params>,
) -> Answer {
    find_matching(&db, &postcode, Some(&property), &params).await
}

async fn find_matching(db: &Db, postcode: &str, property: Option<&str>, params: &Params) -> Answer {
    db.read().await.authorize(params, Scope::Lookup)?;
    let (canonical, latitude, longitude) =
        centroid(postcode).ok_or_else(|| Failure::not_found("Postcode"))?;
    debug!("find {canonical}");

    let addresses: Vec<Value> = PLACES
        .iter()
        .filter(|place| place.postcode == canonical)
        .filter(|place| {
            property.map_or(true, |property| {
                place.building_number.eq_ignore_ascii_case(property)
                    || contains_ignoring_case(&place.line_1(), property)
            })
        })
        .map(Place::to_json)
        .collect();
    if addresses.is_empty() {
        return Err(Failure::not_found("Property"));
    }

    Ok(Json(json!({
        "postcode": canonical,
        "latitude": latitude,
        "longitude": longitude,
        "addresses": addresses,
    })))
}

async fn suggest(State(db): State<Db>, Path(term): Path<String>, Query(params): Query<Params>) -> Answer {
    db.read().await.authorize(&params, Scope::Lookup)?;
    let top = top(&params)?;
    let keep = filtered(&params, "filter");

    let suggestions: Vec<Value> = PLACES
        .iter()
        .filter(|place| contains_ignoring_case(&format!("{} {}", place.label(), place.postcode), &term))
        .filter(|place| keep(*place))
        .take(top)
        .map(|place| {
            json!({
                "address": place.label(),
                "url": format!("/get/{}", place.id),
                "id": place.id,
            })
        })
        .collect();
    Ok(Json(json!({ "suggestions": suggestions })))
}

async fn typeahead(State(db): State<Db>, Path(term): Path<String>, Query(params): Query<Params>) -> Answer {
    db.read().await.authorize(&params, Scope::Lookup)?;
    let top = top(&params)?;
    let keep = filtered(&params, "filters");
    let fields: Vec<&str> = match params.get("search") {
        Some(search) => search.split(',').map(str::trim).collect(),
        None => vec!["thoroughfare", "town_or_city"],
    };

    let mut results: Vec<&str> = Vec::new();
    for place in PLACES.iter().filter(|place| keep(*place)) {
        for value in fields.iter().filter_map(|field| place.field(field)) {
            if contains_ignoring_case(value, &term) && !results.contains(&value) {
                results.push(value);
            }
        }
    }
    results.truncate(top);
    Ok(Json(json!(results)))
}

async fn get_address(State(db): State<Db>, Path(id): Path<String>, Query(params): Query<Params>) -> Answer {
    db.read().await.authorize(&params, Scope::Lookup)?;
    let place = PLACES
        .iter()
        .find(|place| place.id == id)
        .ok_or_else(|| Failure::not_found("Address"))?;

    let mut address = place.to_json();
    address["postcode"] = json!(place.postcode);
    if let Some((_, latitude, longitude)) = centroid(place.postcode) {
        address["latitude"] = json!(latitude);
        address["longitude"] = json!(longitude);
    }
    Ok(Json(address))
}

async fn distance(
    State(db): State<Db>,
    Path((from, to)): Path<(String, String)>,
    Query(params): Query<Params>,
) -> Answer {
    db.read().await.authorize(&params, Scope::Lookup)?;
    let from = centroid(&from).ok_or_else(|| Failure::not_found("Postcode"))?;
    let to = centroid(&to).ok_or_else(|| Failure::not_found("Postcode"))?;
    let metres = haversine((from.1, from.2), (to.1, to.2));

    Ok(Json(json!({
        "from": {"postcode": from.0, "latitude": from.1, "longitude": from.2},
        "to": {"postcode": to.0, "latitude": to.1, "longitude": to.2},
        "metres": (metres * 100.0).round() / 100.0,
    })))
}

// ---------------------------------------------------------------------------
// Account handlers
// ---------------------------------------------------------------------------

async fn usage(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    db.read().await.authorize(&params, Scope::Admin)?;
    Ok(Json(json!({
        "usage_today": 0,
        "daily_limit": 20,
        "monthly_buffer": 0,
        "monthly_buffer_used": 0,
    })))
}

async fn usage_on(
    State(db): State<Db>,
    Path((day, month, year)): Path<(String, String, String)>,
    Query(params): Query<Params>,
) -> Answer {
    db.read().await.authorize(&params, Scope::Admin)?;
    date_key(&day, &month, &year)?;
    Ok(Json(json!({ "date": format!("{day}/{month}/{year}"), "count": 0 })))
}

type DateRange = (String, String, String, String, String, String);

async fn usage_between(
    State(db): State<Db>,
    Path((fd, fm, fy, td, tm, ty)): Path<DateRange>,
    Query(params): Query<Params>,
) -> Answer {
    db.read().await.authorize(&params, Scope::Admin)?;
    if date_key(&fd, &fm, &fy)? > date_key(&td, &tm, &ty)? {
        return Err(Failure::bad_request("from date is after to date"));
    }
    Ok(Json(json!({
        "from": format!("{fd}/{fm}/{fy}"),
        "to": format!("{td}/{tm}/{ty}"),
        "usage": [],
    })))
}

async fn subscription(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    db.read().await.authorize(&params, Scope::Admin)?;
    Ok(Json(json!({
        "expiry_date": "2030-01-31",
        "first_daily_limit": 20,
        "second_daily_limit": 20,
        "amount": "20.00",
        "term": "Monthly",
    })))
}

// ---------------------------------------------------------------------------
// Private addresses
// ---------------------------------------------------------------------------

async fn list_private_addresses(
    State(db): State<Db>,
    Path(postcode): Path<String>,
    Query(params): Query<Params>,
) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    let entries = account
        .private_addresses
        .get(&compact(&postcode))
        .cloned()
        .unwrap_or_default();
    Ok(Json(json!(entries)))
}

async fn add_private_address(
    State(db): State<Db>,
    Path(postcode): Path<String>,
    Query(params): Query<Params>,
    Json(mut entry): Json<PrivateAddressEntry>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    if entry.line1.as_deref().map_or(true, |line| line.trim().is_empty()) {
        return Err(Failure::bad_request("line1 is required"));
    }
    entry.id = account.allocate_id();
    let id = entry.id;
    account
        .private_addresses
        .entry(compact(&postcode))
        .or_default()
        .push(entry);
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "message": "Created" }))))
}

async fn get_private_address(
    State(db): State<Db>,
    Path((postcode, id)): Path<(String, u64)>,
    Query(params): Query<Params>,
) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    account
        .private_addresses
        .get(&compact(&postcode))
        .and_then(|entries| entries.iter().find(|entry| entry.id == id))
        .map(|entry| Json(json!(entry)))
        .ok_or_else(|| Failure::not_found("Private address"))
}

async fn delete_private_address(
    State(db): State<Db>,
    Path((postcode, id)): Path<(String, u64)>,
    Query(params): Query<Params>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    let entries = account
        .private_addresses
        .get_mut(&compact(&postcode))
        .ok_or_else(|| Failure::not_found("Private address"))?;
    let before = entries.len();
    entries.retain(|entry| entry.id != id);
    if entries.len() == before {
        return Err(Failure::not_found("Private address"));
    }
    Ok(Json(json!({ "message": "Deleted" })))
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

async fn get_api_key(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    Ok(Json(json!({ "api-key": account.api_key })))
}

async fn refresh_api_key(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    account.api_key = Uuid::new_v4().simple().to_string();
    Ok(Json(json!({ "api-key": account.api_key })))
}

#[derive(Deserialize)]
struct NewDomain {
    name: String,
}

#[derive(Deserialize)]
struct NewIp {
    value: String,
}

fn remove_entry(entries: &mut Vec<Entry>, id: u64, what: &str) -> Answer {
    let before = entries.len();
    entries.retain(|entry| entry.id != id);
    if entries.len() == before {
        return Err(Failure::not_found(what));
    }
    Ok(Json(json!({ "message": "Deleted" })))
}

fn find_entry(entries: &[Entry], id: u64, field: &str, what: &str) -> Answer {
    entries
        .iter()
        .find(|entry| entry.id == id)
        .map(|entry| Json(entry.to_json(field)))
        .ok_or_else(|| Failure::not_found(what))
}

fn list_entries(entries: &[Entry], field: &str) -> Json<Value> {
    Json(Value::Array(entries.iter().map(|entry| entry.to_json(field)).collect()))
}

async fn list_domains(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    Ok(list_entries(&account.domains, "name"))
}

async fn add_domain(
    State(db): State<Db>,
    Query(params): Query<Params>,
    Json(input): Json<NewDomain>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Failure::bad_request("name is required"));
    }
    let id = account.allocate_id();
    account.domains.push(Entry { id, value: name });
    Ok(Json(json!({ "id": id, "message": "Added" })))
}

async fn get_domain(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(params): Query<Params>,
) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    find_entry(&account.domains, id, "name", "Domain")
}

async fn delete_domain(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(params): Query<Params>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    remove_entry(&mut account.domains, id, "Domain")
}

async fn list_ips(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    Ok(list_entries(&account.ips, "value"))
}

async fn add_ip(
    State(db): State<Db>,
    Query(params): Query<Params>,
    Json(input): Json<NewIp>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    if input.value.parse::<IpAddr>().is_err() {
        return Err(Failure::bad_request(format!("{} is not an IP address", input.value)));
    }
    let id = account.allocate_id();
    account.ips.push(Entry { id, value: input.value });
    Ok(Json(json!({ "id": id, "message": "Added" })))
}

async fn get_ip(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(params): Query<Params>,
) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    find_entry(&account.ips, id, "value", "IP address")
}

async fn delete_ip(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(params): Query<Params>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    remove_entry(&mut account.ips, id, "IP address")
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

async fn list_permissions(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    Ok(Json(json!(account.permissions.values().collect::<Vec<_>>())))
}

async fn get_permission(
    State(db): State<Db>,
    Path(email): Path<String>,
    Query(params): Query<Params>,
) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    account
        .permissions
        .get(&email.to_lowercase())
        .map(|entry| Json(json!(entry)))
        .ok_or_else(|| Failure::not_found("Permission"))
}

async fn add_permission(
    State(db): State<Db>,
    Query(params): Query<Params>,
    Json(entry): Json<PermissionEntry>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    let key = entry.email_address.to_lowercase();
    if account.permissions.contains_key(&key) {
        return Err(Failure::new(StatusCode::CONFLICT, "Permission already exists"));
    }
    account.permissions.insert(key, entry);
    Ok(Json(json!({ "message": "Added" })))
}

async fn update_permission(
    State(db): State<Db>,
    Query(params): Query<Params>,
    Json(entry): Json<PermissionEntry>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    let existing = account
        .permissions
        .get_mut(&entry.email_address.to_lowercase())
        .ok_or_else(|| Failure::not_found("Permission"))?;
    *existing = entry;
    Ok(Json(json!({ "message": "Updated" })))
}

async fn delete_permission(
    State(db): State<Db>,
    Path(email): Path<String>,
    Query(params): Query<Params>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    account
        .permissions
        .remove(&email.to_lowercase())
        .map(|_| Json(json!({ "message": "Deleted" })))
        .ok_or_else(|| Failure::not_found("Permission"))
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

async fn get_email_address(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    Ok(Json(json!({ "email-address": account.email_address })))
}

#[derive(Deserialize)]
struct NewEmailAddress {
    #[serde(rename = "new-email-address")]
    new_email_address: String,
}

async fn update_email_address(
    State(db): State<Db>,
    Query(params): Query<Params>,
    Json(input): Json<NewEmailAddress>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    if !input.new_email_address.contains('@') {
        return Err(Failure::bad_request("new-email-address is not an email address"));
    }
    account.email_address = input.new_email_address;
    Ok(Json(json!({ "message": "Updated" })))
}

async fn list_invoices(State(db): State<Db>, Query(params): Query<Params>) -> Answer {
    db.read().await.authorize(&params, Scope::Admin)?;
    Ok(Json(Value::Array(INVOICES.iter().map(InvoiceFixture::to_json).collect())))
}

async fn get_invoice(
    State(db): State<Db>,
    Path(number): Path<String>,
    Query(params): Query<Params>,
) -> Answer {
    db.read().await.authorize(&params, Scope::Admin)?;
    INVOICES
        .iter()
        .find(|invoice| invoice.number.eq_ignore_ascii_case(&number))
        .map(|invoice| Json(invoice.to_json()))
        .ok_or_else(|| Failure::not_found("Invoice"))
}

async fn invoices_between(
    State(db): State<Db>,
    Path((fd, fm, fy, td, tm, ty)): Path<DateRange>,
    Query(params): Query<Params>,
) -> Answer {
    db.read().await.authorize(&params, Scope::Admin)?;
    let from = date_key(&fd, &fm, &fy)?;
    let to = date_key(&td, &tm, &ty)?;
    if from > to {
        return Err(Failure::bad_request("from date is after to date"));
    }
    Ok(Json(Value::Array(
        INVOICES
            .iter()
            .filter(|invoice| (from..=to).contains(&invoice.date))
            .map(InvoiceFixture::to_json)
            .collect(),
    )))
}

#[derive(Deserialize)]
struct NewCc {
    #[serde(rename = "email-address")]
    email_address: String,
}

async fn list_cc(
    State(db): State<Db>,
    Path(list): Path<String>,
    Query(params): Query<Params>,
) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    let entries = account.cc.get(&list).ok_or_else(|| Failure::not_found("Cc list"))?;
    Ok(list_entries(entries, "email-address"))
}

async fn add_cc(
    State(db): State<Db>,
    Path(list): Path<String>,
    Query(params): Query<Params>,
    Json(input): Json<NewCc>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    if !input.email_address.contains('@') {
        return Err(Failure::bad_request("email-address is not an email address"));
    }
    if !account.cc.contains_key(&list) {
        return Err(Failure::not_found("Cc list"));
    }
    let id = account.allocate_id();
    if let Some(entries) = account.cc.get_mut(&list) {
        entries.push(Entry {
            id,
            value: input.email_address,
        });
    }
    Ok(Json(json!({ "id": id, "message": "Added" })))
}

async fn get_cc(
    State(db): State<Db>,
    Path((list, id)): Path<(String, u64)>,
    Query(params): Query<Params>,
) -> Answer {
    let account = db.read().await;
    account.authorize(&params, Scope::Admin)?;
    let entries = account.cc.get(&list).ok_or_else(|| Failure::not_found("Cc list"))?;
    find_entry(entries, id, "email-address", "Cc")
}

async fn delete_cc(
    State(db): State<Db>,
    Path((list, id)): Path<(String, u64)>,
    Query(params): Query<Params>,
) -> Answer {
    let mut account = db.write().await;
    account.authorize(&params, Scope::Admin)?;
    let entries = account
        .cc
        .get_mut(&list)
        .ok_or_else(|| Failure::not_found("Cc list"))?;
    remove_entry(entries, id, "Cc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postcodes_compare_without_spacing_or_case() {
        assert_eq!(compact(" nn1 3er "), "NN13ER");
        assert_eq!(centroid("nn13er").map(|c| c.0), Some("NN1 3ER"));
        assert!(centroid("ZZ1 1ZZ").is_none());
    }

    #[test]
    fn haversine_matches_known_distance() {
        let london_to_northampton = haversine((51.50354, -0.127695), (52.24593, -0.891701));
        assert!((95_000.0..100_000.0).contains(&london_to_northampton));
        assert_eq!(haversine((51.0, 0.0), (51.0, 0.0)), 0.0);
    }

    #[test]
    fn top_defaults_and_bounds() {
        let mut params = Params::new();
        assert_eq!(top(&params).unwrap(), 6);
        params.insert("top".into(), "20".into());
        assert_eq!(top(&params).unwrap(), 20);
        params.insert("top".into(), "21".into());
        assert!(top(&params).is_err());
        params.insert("top".into(), "0".into());
        assert!(top(&params).is_err());
    }

    #[test]
    fn filters_match_named_fields_only() {
        let mut params = Params::new();
        params.insert("filter[county]".into(), "northamptonshire".into());
        params.insert("filter[unknown]".into(), "ignored".into());
        params.insert("api-key".into(), "k".into());
        let keep = filtered(&params, "filter");
        assert!(keep(&PLACES[0]));
        assert!(!keep(&PLACES[2]));
    }

    #[test]
    fn private_address_entry_reads_camel_case_and_ignores_client_id() {
        let entry: PrivateAddressEntry =
            serde_json::from_str(r#"{"id":"99","line1":"Flat 2","townOrCity":"Northampton"}"#).unwrap();
        assert_eq!(entry.id, 0);
        assert_eq!(entry.line1.as_deref(), Some("Flat 2"));
        assert_eq!(entry.town_or_city.as_deref(), Some("Northampton"));
    }

    #[test]
    fn date_keys_order_chronologically() {
        assert!(date_key("31", "12", "2023").unwrap() < date_key("01", "01", "2024").unwrap());
        assert!(date_key("aa", "01", "2024").is_err());
    }
}
