use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use item_dashboard::errors::RetrievalError;
use item_dashboard::source::{HttpSource, RecordSource};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn paged_scan(headers: HeaderMap, body: Value) -> (StatusCode, Json<Value>) {
    if headers.get("x-amz-target").and_then(|value| value.to_str().ok())
        != Some("DynamoDB_20120810.Scan")
    {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "unknown target" })));
    }
    if headers.get("authorization").and_then(|value| value.to_str().ok()) != Some("Bearer letmein") {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "denied" })));
    }
    assert_eq!(body["TableName"], json!("DetectedItems"));

    let page = match body.get("ExclusiveStartKey") {
        None => json!({
            "Items": [
                { "ItemName": { "S": "Widget" }, "Date": { "S": "2024-03-04" }, "NoOfManufactured": { "N": "3" } },
                { "ItemName": { "S": "Gadget" }, "Date": { "S": "2024-03-05" }, "NoOfManufactured": { "N": "1" } }
            ],
            "Count": 2,
            "LastEvaluatedKey": { "id": { "S": "2" } }
        }),
        Some(_) => json!({
            "Items": [
                { "ItemName": { "S": "Widget" }, "Date": { "S": "2024-03-06" }, "NoOfManufactured": { "N": "2" } }
            ],
            "Count": 1
        }),
    };
    (StatusCode::OK, Json(page))
}

#[tokio::test]
async fn scan_follows_pagination_and_decodes_items() {
    // Json<T> rejects application/x-amz-json-1.0, so decode the bytes by hand.
    let router = Router::new().route(
        "/",
        post(|headers: HeaderMap, body: axum::body::Bytes| async move {
            let body: Value = serde_json::from_slice(&body).unwrap();
            paged_scan(headers, body).await
        }),
    );
    let endpoint = serve(router).await;

    let source = HttpSource::new(
        endpoint,
        "DetectedItems",
        Some("letmein".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    let records = source.scan().await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["ItemName"], json!("Widget"));
    assert_eq!(records[0]["NoOfManufactured"], json!(3));
    assert_eq!(records[2]["Date"], json!("2024-03-06"));
}

#[tokio::test]
async fn scan_reports_error_status() {
    let router = Router::new().route(
        "/",
        post(|| async { (StatusCode::BAD_REQUEST, "ResourceNotFoundException") }),
    );
    let endpoint = serve(router).await;

    let source = HttpSource::new(endpoint, "Missing", None, Duration::from_secs(5)).unwrap();
    match source.scan().await {
        Err(RetrievalError::Status { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("ResourceNotFoundException"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn scan_rejects_non_object_payload() {
    let router = Router::new().route("/", post(|| async { "[1, 2, 3]" }));
    let endpoint = serve(router).await;

    let source = HttpSource::new(endpoint, "DetectedItems", None, Duration::from_secs(5)).unwrap();
    assert!(matches!(
        source.scan().await,
        Err(RetrievalError::Malformed(_))
    ));
}

#[tokio::test]
async fn scan_stops_when_keys_cycle() {
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);
    let router = Router::new().route(
        "/",
        post(move |body: axum::body::Bytes| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let body: Value = serde_json::from_slice(&body).unwrap();
                let next = match body["ExclusiveStartKey"]["id"]["S"].as_str() {
                    None => "A",
                    Some("A") => "B",
                    Some(_) => "A",
                };
                Json(json!({
                    "Items": [{ "ItemName": { "S": "Widget" } }],
                    "LastEvaluatedKey": { "id": { "S": next } }
                }))
            }
        }),
    );
    let endpoint = serve(router).await;

    let source = HttpSource::new(endpoint, "DetectedItems", None, Duration::from_secs(5)).unwrap();
    assert!(matches!(
        source.scan().await,
        Err(RetrievalError::Malformed(_))
    ));
    assert_eq!(requests.load(Ordering::SeqCst), 3);
}
