//! End-to-end tests for the flow administration endpoints.

mod common;

use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use common::{anonymous_request, get_request, json_request, parse_body, send, test_harness};

const FLOW_URI: &str = "/api/v1/catalogs/analytics/flows/storage-read";

#[tokio::test]
async fn test_flow_view_merges_static_definition() {
    let h = test_harness();

    let response = send(&h.app, get_request(FLOW_URI, "ops-admin")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["catalog_id"], "analytics");
    assert_eq!(body["approval_flow_id"], "storage-read");
    assert_eq!(body["approver_type"], "approval_flow");
    assert_eq!(body["enable_revoke"], true);
    assert_eq!(body["max_auto_revoke_duration"], "P30D");
    // No info record stored yet.
    assert!(body["approver_group_id"].is_null());
}

#[tokio::test]
async fn test_set_flow_info_applies_overrides() {
    let h = test_harness();

    let response = send(
        &h.app,
        json_request(
            Method::PUT,
            FLOW_URI,
            "ops-admin",
            json!({
                "approver_group_id": "data-owners",
                "enable_revoke_override": false
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["approver_group_id"], "data-owners");
    assert_eq!(body["enable_revoke"], false);

    // The stored record survives a fresh read.
    let response = send(&h.app, get_request(FLOW_URI, "ops-admin")).await;
    let body = parse_body(response).await;
    assert_eq!(body["approver_group_id"], "data-owners");
    assert_eq!(body["enable_revoke"], false);
}

#[tokio::test]
async fn test_set_flow_info_replaces_previous_record() {
    let h = test_harness();

    let response = send(
        &h.app,
        json_request(
            Method::PUT,
            FLOW_URI,
            "ops-admin",
            json!({ "approver_group_id": "data-owners", "enable_revoke_override": false }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A later PUT without the override clears it back to the static value.
    let response = send(
        &h.app,
        json_request(
            Method::PUT,
            FLOW_URI,
            "ops-admin",
            json!({ "approver_group_id": "platform-owners" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["approver_group_id"], "platform-owners");
    assert_eq!(body["enable_revoke"], true);
}

#[tokio::test]
async fn test_unknown_flow_is_not_found() {
    let h = test_harness();

    let uri = "/api/v1/catalogs/analytics/flows/nope";
    let response = send(&h.app, get_request(uri, "ops-admin")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &h.app,
        json_request(Method::PUT, uri, "ops-admin", json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_flow_routes_require_identity() {
    let h = test_harness();

    let response = send(
        &h.app,
        Request::builder()
            .method(Method::GET)
            .uri(FLOW_URI)
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&h.app, anonymous_request(Method::PUT, FLOW_URI, json!({}))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
