mod event_handlers_test;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use rsvp_shared::clock::FixedClock;
use rsvp_shared::config::{Settings, WhatsAppConfig};
use rsvp_shared::store::MemoryKvStore;
use rsvp_shared::test_utils::mock_transport::MockTransport;
use rsvp_shared::test_utils::test_logging::init_test_logging;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::context::{AppContext, SyncParts};
use crate::routes::create_router;

pub struct TestApp {
    pub app: Router,
    pub ctx: AppContext,
    pub sync: SyncParts,
    pub kv: Arc<MemoryKvStore>,
    pub clock: Arc<FixedClock>,
    pub transport: Arc<MockTransport>,
}

pub fn configured_whatsapp() -> WhatsAppConfig {
    WhatsAppConfig {
        access_token: "EAAG".repeat(30),
        phone_number_id: "1234567890123".to_string(),
        send_delay: Duration::ZERO,
        ..WhatsAppConfig::default()
    }
}

// Helper to set up the service over an in-memory store and a mock transport
pub async fn create_test_app(whatsapp: WhatsAppConfig) -> TestApp {
    init_test_logging();

    let settings = Settings {
        public_base_url: "https://rsvp.example.com".to_string(),
        whatsapp,
        ..Settings::default()
    };
    let kv = Arc::new(MemoryKvStore::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    ));
    let transport = Arc::new(MockTransport::new());

    let (ctx, sync) = AppContext::build(&settings, kv.clone(), clock.clone(), transport.clone())
        .await
        .unwrap();

    TestApp {
        app: create_router(ctx.clone()),
        ctx,
        sync,
        kv,
        clock,
        transport,
    }
}

pub fn json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn response_to_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn sample_event() -> Value {
    json!({
        "name": "Summer Garden Party",
        "date": "2025-06-21T18:30",
        "location": "Rose Garden, 12 Elm Street",
        "description": "Drinks, music and a long table under the trees."
    })
}

pub fn sample_guests() -> Value {
    json!({
        "guests": [
            { "name": "Alice Martin", "phoneNumber": "+1 555 010 0001" },
            { "name": "Bob Silva", "phoneNumber": "15550100002" },
            { "name": "Carol Wu", "phoneNumber": "+1 (555) 010-0003" }
        ]
    })
}

/// Seeds an event and three pending guests through the API.
pub async fn seed(app: &Router) -> Vec<Value> {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    let response = app
        .clone()
        .oneshot(json_request("PUT", "/event", Some(sample_event())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/guests", Some(sample_guests())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response_to_json(response).await["guests"]
        .as_array()
        .unwrap()
        .clone()
}
