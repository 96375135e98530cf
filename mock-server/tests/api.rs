use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_with_keys};
use serde_json::{json, Value};
use tower::ServiceExt;

const LOOKUP: &str = "api-key=lookup-key";
const ADMIN: &str = "api-key=admin-key";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

// --- keys ---

#[tokio::test]
async fn missing_key_is_unauthorized() {
    let (status, body) = send(&app(), get_request("/find/NN1%203ER")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["Message"], "Invalid api-key");
}

#[tokio::test]
async fn lookup_key_does_not_open_admin_endpoints() {
    let (status, _) = send(&app(), get_request(&format!("/security/api-key?{LOOKUP}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn custom_keys_replace_the_defaults() {
    let app = app_with_keys("mine", "ours");
    let (status, _) = send(&app, get_request(&format!("/find/NN13ER?{LOOKUP}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get_request("/find/NN13ER?api-key=mine")).await;
    assert_eq!(status, StatusCode::OK);
}

// --- lookup ---

#[tokio::test]
async fn find_returns_addresses_for_known_postcode() {
    let (status, body) = send(&app(), get_request(&format!("/find/nn1%203er?{LOOKUP}&expand=true"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["postcode"], "NN1 3ER");
    assert_eq!(body["addresses"].as_array().unwrap().len(), 2);
    assert_eq!(body["addresses"][0]["line_1"], "10 Watkin Terrace");
}

#[tokio::test]
async fn find_with_property_narrows_results() {
    let (status, body) = send(&app(), get_request(&format!("/find/NN1%203ER/12?{LOOKUP}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["addresses"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app(), get_request(&format!("/find/NN1%203ER/99?{LOOKUP}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["Message"], "Property not found");
}

#[tokio::test]
async fn find_unknown_postcode_is_404() {
    let (status, _) = send(&app(), get_request(&format!("/find/ZZ1%201ZZ?{LOOKUP}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn suggest_honours_top_and_filters() {
    let app = app();
    let (status, body) = send(&app, get_request(&format!("/suggest/10?{LOOKUP}&top=1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"].as_array().unwrap().len(), 1);

    let uri = format!("/suggest/10?{LOOKUP}&filter%5Bcounty%5D=Northamptonshire");
    let (_, body) = send(&app, get_request(&uri)).await;
    assert_eq!(
        body["suggestions"],
        json!([{"address": "10 Watkin Terrace, Northampton", "url": "/get/NN13ER-10", "id": "NN13ER-10"}])
    );

    let (status, _) = send(&app, get_request(&format!("/suggest/10?{LOOKUP}&top=21"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn typeahead_returns_distinct_strings() {
    let uri = format!("/typeahead/watk?{LOOKUP}&search=thoroughfare");
    let (status, body) = send(&app(), get_request(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Watkin Terrace"]));
}

#[tokio::test]
async fn get_returns_the_full_address() {
    let (status, body) = send(&app(), get_request(&format!("/get/SW1A2AA-10?{LOOKUP}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["postcode"], "SW1A 2AA");
    assert_eq!(body["thoroughfare"], "Downing Street");
}

#[tokio::test]
async fn distance_between_known_postcodes() {
    let uri = format!("/distance/NN1%203ER/SW1A%202AA?{LOOKUP}");
    let (status, body) = send(&app(), get_request(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let metres = body["metres"].as_f64().unwrap();
    assert!((95_000.0..100_000.0).contains(&metres));
    assert_eq!(body["to"]["postcode"], "SW1A 2AA");
}

// --- account ---

#[tokio::test]
async fn usage_range_must_be_ordered() {
    let app = app();
    let ok = format!("/v3/usage/from/01/01/2024/To/31/01/2024?{ADMIN}");
    assert_eq!(send(&app, get_request(&ok)).await.0, StatusCode::OK);
    let inverted = format!("/v3/usage/from/01/02/2024/To/31/01/2024?{ADMIN}");
    assert_eq!(send(&app, get_request(&inverted)).await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refreshing_the_api_key_revokes_the_old_one() {
    let app = app();
    let (status, body) = send(&app, empty_request("PUT", &format!("/security/api-key?{ADMIN}"))).await;
    assert_eq!(status, StatusCode::OK);
    let new_key = body["api-key"].as_str().unwrap().to_string();
    assert_ne!(new_key, "lookup-key");

    let (status, _) = send(&app, get_request(&format!("/find/NN13ER?{LOOKUP}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get_request(&format!("/find/NN13ER?api-key={new_key}"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn private_address_lifecycle() {
    let app = app();
    let base = format!("/private-address/NN1%203ER?{ADMIN}");

    let (status, body) = send(&app, json_request("POST", &base, json!({"line1": "Flat 2", "townOrCity": "Northampton"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_u64().unwrap();

    let (_, list) = send(&app, get_request(&base)).await;
    assert_eq!(list[0]["line1"], "Flat 2");
    assert_eq!(list[0]["townOrCity"], "Northampton");

    let one = format!("/private-address/NN13ER/{id}?{ADMIN}");
    let (status, _) = send(&app, empty_request("DELETE", &one)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get_request(&one)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn private_address_needs_line1() {
    let uri = format!("/private-address/NN13ER?{ADMIN}");
    let (status, body) = send(&app(), json_request("POST", &uri, json!({"line2": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["Message"], "line1 is required");
}

#[tokio::test]
async fn ip_whitelist_validates_and_lists() {
    let app = app();
    let uri = format!("/security/ip-address-whitelist?{ADMIN}");
    let (status, _) = send(&app, json_request("POST", &uri, json!({"value": "not-an-ip"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, json_request("POST", &uri, json!({"value": "10.0.0.1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_u64().unwrap();

    let (_, list) = send(&app, get_request(&uri)).await;
    assert_eq!(list, json!([{"id": id, "value": "10.0.0.1"}]));
}

#[tokio::test]
async fn permissions_conflict_and_trailing_slash_lookup() {
    let app = app();
    let uri = format!("/permission?{ADMIN}");
    let permission = json!({
        "email_address": "ops@example.com",
        "expires": null,
        "permissions": {"view_invoices": true, "unsubscribe": false, "update_card_details": false}
    });

    assert_eq!(send(&app, json_request("POST", &uri, permission.clone())).await.0, StatusCode::OK);
    assert_eq!(send(&app, json_request("POST", &uri, permission)).await.0, StatusCode::CONFLICT);

    let (status, body) = send(&app, get_request(&format!("/permission/ops@example.com/?{ADMIN}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permissions"]["view_invoices"], true);
}

#[tokio::test]
async fn invoices_filter_by_date() {
    let uri = format!("/invoices/from/01/02/2024/To/31/03/2024?{ADMIN}");
    let (status, body) = send(&app(), get_request(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["number"], "INV-1002");
}

#[tokio::test]
async fn unknown_cc_list_is_404() {
    let uri = format!("/cc/weekly?{ADMIN}");
    let (status, _) = send(&app(), json_request("POST", &uri, json!({"email-address": "a@b.com"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
