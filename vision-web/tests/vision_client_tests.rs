//! CloudVisionClient integration tests
//!
//! Runs an in-process axum server on an ephemeral port that stands in for
//! both the Vision API (`/v1/images:annotate`) and an image host
//! (`/images/...`).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use vision_common::config::ServiceConfig;
use vision_web::vision::{CloudVisionClient, ImageAnalyzer, ImageRef, ImageSourceError, VisionError};

const IMAGE_BYTES: &[u8] = b"\x89PNG fake image bytes";

/// Larger than `max_image_bytes` in [`test_config`]
const HUGE_IMAGE_LEN: usize = 2 * 1024 * 1024;

/// A request received by the fake Vision API
#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    query: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct FakeVision {
    recorded: Arc<Mutex<Vec<Recorded>>>,
    reply_status: StatusCode,
    reply_body: Value,
}

impl FakeVision {
    fn replying(status: StatusCode, body: Value) -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Vec::new())),
            reply_status: status,
            reply_body: body,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

async fn annotate(State(fake): State<FakeVision>, uri: Uri, body: Bytes) -> (StatusCode, Json<Value>) {
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    fake.recorded.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body,
    });
    (fake.reply_status, Json(fake.reply_body.clone()))
}

/// Start the fake server; returns its base URL
async fn spawn_fake(fake: FakeVision) -> String {
    let app = Router::new()
        .route("/images/dog.png", get(|| async { IMAGE_BYTES }))
        .route(
            "/images/missing.png",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        )
        .route(
            "/images/huge.png",
            get(|| async { vec![0u8; HUGE_IMAGE_LEN] }),
        )
        .fallback(annotate)
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Image host that answers with a chunked body that never ends and no
/// Content-Length; returns the image URL
async fn spawn_endless_image_host() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let head = "HTTP/1.1 200 OK\r\n\
                            Content-Type: image/png\r\n\
                            Transfer-Encoding: chunked\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                let chunk = format!("{:x}\r\n{}\r\n", 4096, "x".repeat(4096));
                // Stops once the client hangs up
                while socket.write_all(chunk.as_bytes()).await.is_ok() {}
            });
        }
    });
    format!("http://{}/images/endless.png", addr)
}

fn test_config(base_url: &str, api_key: Option<&str>) -> ServiceConfig {
    ServiceConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        api_key: api_key.map(str::to_string),
        endpoint: format!("{}/v1", base_url),
        request_timeout: Duration::from_secs(5),
        max_image_bytes: 1024 * 1024,
        max_concurrent_batches: 2,
        log_level: "info".to_string(),
    }
}

async fn client_for(fake: &FakeVision) -> (CloudVisionClient, String) {
    let base = spawn_fake(fake.clone()).await;
    let client = CloudVisionClient::new(&test_config(&base, Some("test-key"))).unwrap();
    (client, base)
}

#[tokio::test]
async fn test_labels_for_remote_image_are_sent_inline() {
    let fake = FakeVision::replying(
        StatusCode::OK,
        json!({
            "responses": [{
                "labelAnnotations": [
                    { "mid": "/m/0bt9lr", "description": "Dog", "score": 0.95, "topicality": 0.95 },
                    { "mid": "/m/0jbk", "description": "Animal", "score": 0.875 }
                ]
            }]
        }),
    );
    let (client, base) = client_for(&fake).await;

    let image = ImageRef::parse(&format!("{}/images/dog.png", base)).unwrap();
    let labels = client.analyze_labels(&image).await.unwrap();

    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].description, "Dog");
    assert_eq!(labels[1].description, "Animal");
    assert_eq!(labels[1].score, 0.875);

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/v1/images:annotate");
    assert_eq!(requests[0].query.as_deref(), Some("key=test-key"));

    let sent = &requests[0].body["requests"][0];
    assert_eq!(sent["image"]["content"], STANDARD.encode(IMAGE_BYTES));
    assert_eq!(sent["features"][0]["type"], "LABEL_DETECTION");
}

#[tokio::test]
async fn test_duplicate_labels_are_passed_through_unchanged() {
    let fake = FakeVision::replying(
        StatusCode::OK,
        json!({
            "responses": [{
                "labelAnnotations": [
                    { "description": "cat", "score": 0.9 },
                    { "description": "cat", "score": 0.5 }
                ]
            }]
        }),
    );
    let (client, _) = client_for(&fake).await;

    let image = ImageRef::parse("gs://bucket/cat.jpg").unwrap();
    let labels = client.analyze_labels(&image).await.unwrap();

    // Rejecting duplicates is the result set's job, not the client's
    assert_eq!(labels.len(), 2);
}

#[tokio::test]
async fn test_extract_text_returns_full_text() {
    let fake = FakeVision::replying(
        StatusCode::OK,
        json!({
            "responses": [{
                "textAnnotations": [{ "locale": "en", "description": "ONE WAY\n" }],
                "fullTextAnnotation": { "text": "ONE WAY\n" }
            }]
        }),
    );
    let (client, _) = client_for(&fake).await;

    let image = ImageRef::parse("gs://bucket/sign.jpg").unwrap();
    let text = client.extract_text(&image).await.unwrap();

    assert_eq!(text, "ONE WAY\n");
    let sent = &fake.requests()[0].body["requests"][0];
    assert_eq!(sent["features"][0]["type"], "TEXT_DETECTION");
}

#[tokio::test]
async fn test_extract_text_without_text_is_empty() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [{}] }));
    let (client, _) = client_for(&fake).await;

    let image = ImageRef::parse("gs://bucket/blank.jpg").unwrap();
    assert_eq!(client.extract_text(&image).await.unwrap(), "");
}

#[tokio::test]
async fn test_localize_objects_by_gcs_reference() {
    let fake = FakeVision::replying(
        StatusCode::OK,
        json!({
            "responses": [{
                "localizedObjectAnnotations": [{
                    "mid": "/m/01bjv",
                    "name": "Bicycle wheel",
                    "score": 0.875,
                    "boundingPoly": {
                        "normalizedVertices": [
                            { "x": 0.25, "y": 0.5 },
                            { "x": 0.75, "y": 0.5 },
                            { "x": 0.75, "y": 1.0 },
                            { "x": 0.25, "y": 1.0 }
                        ]
                    }
                }]
            }]
        }),
    );
    let (client, _) = client_for(&fake).await;

    let image = ImageRef::parse("gs://bucket/bike.jpg").unwrap();
    let objects = client.localize_objects(&image).await.unwrap();

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].name, "Bicycle wheel");
    assert_eq!(objects[0].vertices.len(), 4);
    assert_eq!(objects[0].vertices[2].y, 1.0);

    let sent = &fake.requests()[0].body["requests"][0];
    assert_eq!(sent["image"]["source"]["gcsImageUri"], "gs://bucket/bike.jpg");
    assert!(sent["image"].get("content").is_none());
    assert_eq!(sent["features"][0]["type"], "OBJECT_LOCALIZATION");

    assert_eq!(client.available_batch_slots(), 2);
}

#[tokio::test]
async fn test_per_image_error_is_reported_and_batch_slot_released() {
    let fake = FakeVision::replying(
        StatusCode::OK,
        json!({
            "responses": [{
                "error": { "code": 7, "message": "Permission denied on gs://bucket" }
            }]
        }),
    );
    let (client, _) = client_for(&fake).await;

    let image = ImageRef::parse("gs://bucket/private.jpg").unwrap();
    let err = client.localize_objects(&image).await.unwrap_err();

    match err {
        VisionError::Api { code, message } => {
            assert_eq!(code, 7);
            assert!(message.contains("Permission denied"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(client.available_batch_slots(), 2);
}

#[tokio::test]
async fn test_http_error_uses_error_envelope_message() {
    let fake = FakeVision::replying(
        StatusCode::FORBIDDEN,
        json!({
            "error": {
                "code": 403,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "PERMISSION_DENIED"
            }
        }),
    );
    let (client, _) = client_for(&fake).await;

    let image = ImageRef::parse("gs://bucket/a.jpg").unwrap();
    let err = client.analyze_labels(&image).await.unwrap_err();

    match err {
        VisionError::Http { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "API key not valid. Please pass a valid API key.");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_batch_response_is_an_error() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [] }));
    let (client, _) = client_for(&fake).await;

    let image = ImageRef::parse("gs://bucket/a.jpg").unwrap();
    assert!(matches!(
        client.analyze_labels(&image).await,
        Err(VisionError::EmptyResponse)
    ));
    assert!(matches!(
        client.localize_objects(&image).await,
        Err(VisionError::EmptyResponse)
    ));
    assert_eq!(client.available_batch_slots(), 2);
}

#[tokio::test]
async fn test_missing_api_key_fails_before_any_request() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [{}] }));
    let base = spawn_fake(fake.clone()).await;
    let client = CloudVisionClient::new(&test_config(&base, None)).unwrap();
    assert!(!client.has_api_key());

    let image = ImageRef::parse(&format!("{}/images/dog.png", base)).unwrap();
    assert!(matches!(
        client.analyze_labels(&image).await,
        Err(VisionError::MissingApiKey)
    ));
    assert!(matches!(
        client.localize_objects(&ImageRef::parse("gs://b/o.jpg").unwrap()).await,
        Err(VisionError::MissingApiKey)
    ));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_image_download_failure_is_surfaced() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [{}] }));
    let (client, base) = client_for(&fake).await;

    let image = ImageRef::parse(&format!("{}/images/missing.png", base)).unwrap();
    let err = client.extract_text(&image).await.unwrap_err();

    assert!(matches!(err, VisionError::Image(ImageSourceError::Fetch { .. })));
    assert!(fake.requests().is_empty(), "vision API must not be called");
}

#[tokio::test]
async fn test_batch_sessions_hold_and_release_slots() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [] }));
    let (client, _) = client_for(&fake).await;

    {
        let first = client.open_batch().await.unwrap();
        let second = client.open_batch().await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(client.available_batch_slots(), 0);

        drop(first);
        assert_eq!(client.available_batch_slots(), 1);
    }

    assert_eq!(client.available_batch_slots(), 2);
}

#[tokio::test]
async fn test_closed_batches_refuse_new_sessions() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [{}] }));
    let (client, _) = client_for(&fake).await;

    let open = client.open_batch().await.unwrap();
    client.close_batches();
    client.close_batches();

    assert!(matches!(client.open_batch().await, Err(VisionError::Closed)));
    assert!(matches!(
        client
            .localize_objects(&ImageRef::parse("gs://bucket/a.jpg").unwrap())
            .await,
        Err(VisionError::Closed)
    ));
    assert!(fake.requests().is_empty());

    // A session opened before closing keeps its slot until dropped
    assert_eq!(client.available_batch_slots(), 1);
    drop(open);
    assert_eq!(client.available_batch_slots(), 2);
}

#[tokio::test]
async fn test_batch_annotate_keeps_request_order() {
    let fake = FakeVision::replying(
        StatusCode::OK,
        json!({
            "responses": [
                { "labelAnnotations": [{ "description": "first", "score": 0.5 }] },
                { "labelAnnotations": [{ "description": "second", "score": 0.5 }] }
            ]
        }),
    );
    let (client, _) = client_for(&fake).await;

    let a = client
        .build_request(
            &ImageRef::parse("gs://bucket/a.jpg").unwrap(),
            vision_web::vision::wire::FeatureType::LabelDetection,
        )
        .await
        .unwrap();
    let b = client
        .build_request(
            &ImageRef::parse("gs://bucket/b.jpg").unwrap(),
            vision_web::vision::wire::FeatureType::LabelDetection,
        )
        .await
        .unwrap();

    let session = client.open_batch().await.unwrap();
    let responses = session.annotate(vec![a, b]).await.unwrap();
    drop(session);

    assert_eq!(responses[0].label_annotations[0].description, "first");
    assert_eq!(responses[1].label_annotations[0].description, "second");

    let sent = &fake.requests()[0].body["requests"];
    assert_eq!(sent[0]["image"]["source"]["gcsImageUri"], "gs://bucket/a.jpg");
    assert_eq!(sent[1]["image"]["source"]["gcsImageUri"], "gs://bucket/b.jpg");
}

#[tokio::test]
async fn test_remote_image_over_limit_is_rejected_by_content_length() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [{}] }));
    let (client, base) = client_for(&fake).await;

    let image = ImageRef::parse(&format!("{}/images/huge.png", base)).unwrap();
    let err = client.analyze_labels(&image).await.unwrap_err();

    match err {
        VisionError::Image(ImageSourceError::TooLarge { size, limit }) => {
            assert_eq!(size, HUGE_IMAGE_LEN as u64);
            assert_eq!(limit, 1024 * 1024);
        }
        other => panic!("expected TooLarge, got {:?}", other),
    }
    assert!(fake.requests().is_empty(), "vision API must not be called");
}

#[tokio::test]
async fn test_remote_image_without_length_stops_at_limit() {
    let fake = FakeVision::replying(StatusCode::OK, json!({ "responses": [{}] }));
    let (client, _) = client_for(&fake).await;
    let image = ImageRef::parse(&spawn_endless_image_host().await).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(3), client.extract_text(&image))
        .await
        .expect("download must stop once the limit is passed");

    match result {
        Err(VisionError::Image(ImageSourceError::TooLarge { size, limit })) => {
            assert!(size > limit);
            assert_eq!(limit, 1024 * 1024);
        }
        other => panic!("expected TooLarge, got {:?}", other),
    }
    assert!(fake.requests().is_empty(), "vision API must not be called");
}
