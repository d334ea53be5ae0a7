mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use common::{controller, from_base, test_config, zone, MemoryStore, RecordingNotifier, NORTH};
use flight_processor::{api, FlightController};

async fn get(controller: &Arc<FlightController>, uri: &str) -> (StatusCode, Vec<u8>) {
    let app = api::routes().with_state(controller.clone());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, bytes.to_vec())
}

#[tokio::test]
async fn health_reports_ok() {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = controller(&store, &notifier, test_config());

    let (status, body) = get(&controller, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test(start_paused = true)]
async fn active_flights_and_zones_are_listed() {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let (lat, lon) = from_base(5_000.0, NORTH);
    store.add_application(9, (lat, lon, 150.0), false);
    store.add_zone(zone(2, "Airport", from_base(20_000.0, NORTH), 3_000.0));

    let controller = controller(&store, &notifier, test_config());
    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(15)).await;

    let (status, body) = get(&controller, "/v1/flights/active").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["flights"][0]["application_id"], 9);
    assert_eq!(json["flights"][0]["status"], "executing");

    let (status, body) = get(&controller, "/v1/zones").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["zones"][0]["name"], "Airport");
    assert!(json["loaded_at"].is_string());

    controller.stop().await;
}
