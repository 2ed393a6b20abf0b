use axum::http::StatusCode;
use rsvp_shared::config::WhatsAppConfig;
use rsvp_shared::store::{keys, KvStore};
use serde_json::json;
use tower::ServiceExt;

use super::{create_test_app, json_request, response_to_json, sample_event, seed};

#[tokio::test]
async fn test_event_round_trips_through_store() {
    let t = create_test_app(WhatsAppConfig::default()).await;

    let response = t
        .app
        .clone()
        .oneshot(json_request("PUT", "/event", Some(sample_event())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .clone()
        .oneshot(json_request("GET", "/event", None))
        .await
        .unwrap();
    let json_resp = response_to_json(response).await;
    assert_eq!(json_resp["name"], "Summer Garden Party");
    assert_eq!(json_resp["date"], "2025-06-21T18:30");

    let stored = t.kv.get(keys::EVENT).await.unwrap().unwrap();
    assert!(stored.contains("Rose Garden"));
}

#[tokio::test]
async fn test_import_replaces_list_with_pending_guests() {
    let t = create_test_app(WhatsAppConfig::default()).await;
    let guests = seed(&t.app).await;

    assert_eq!(guests.len(), 3);
    for guest in &guests {
        assert_eq!(guest["status"], "pending");
        assert_eq!(guest["sent"], false);
        assert!(guest["id"].as_str().unwrap().starts_with("guest_"));
    }

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/guests",
            Some(json!({ "guests": [{ "name": "Dan Ortiz", "phoneNumber": "15550100004" }] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .clone()
        .oneshot(json_request("GET", "/guests", None))
        .await
        .unwrap();
    let json_resp = response_to_json(response).await;
    let guests = json_resp["guests"].as_array().unwrap();
    assert_eq!(guests.len(), 1);
    assert_eq!(guests[0]["name"], "Dan Ortiz");
}

#[tokio::test]
async fn test_import_skips_blank_rows_and_rejects_empty_list() {
    let t = create_test_app(WhatsAppConfig::default()).await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/guests",
            Some(json!({ "guests": [{ "name": "  ", "phoneNumber": "" }] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_to_json(response).await["message"].is_string());

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/guests",
            Some(json!({ "guests": [
                { "name": "", "phoneNumber": "" },
                { "name": "Erin Park", "phoneNumber": "15550100005" }
            ] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_to_json(response).await["guests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_summary_counts_statuses() {
    let t = create_test_app(WhatsAppConfig::default()).await;
    seed(&t.app).await;

    let response = t
        .app
        .clone()
        .oneshot(json_request("GET", "/guests/summary", None))
        .await
        .unwrap();
    let json_resp = response_to_json(response).await;
    assert_eq!(json_resp["total"], 3);
    assert_eq!(json_resp["pending"], 3);
    assert_eq!(json_resp["confirmed"], 0);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let t = create_test_app(WhatsAppConfig::default()).await;
    let response = t
        .app
        .clone()
        .oneshot(json_request("GET", "/nowhere", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
