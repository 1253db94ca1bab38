use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image::{Rgb, RgbImage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use ripple_core::{
    codec,
    config::{GatewayConfig, ServerConfig},
    mocks::{sample_result, MockEditModel, MockSearchProvider, MockVisionModel},
    traits::SessionStore,
};
use ripple_gateway::GatewayServer;
use ripple_pipeline::{Pipeline, PipelineOptions};
use ripple_search::SearchGateway;
use ripple_store::InMemorySessionStore;

const BOUNDARY: &str = "ripple-test-boundary";

const DETECTIONS: &str = r#"```json
[{"label": "Dress", "box_2d": [100, 100, 900, 500]}, {"label": "Mirror", "box_2d": [0, 600, 800, 1000]}]
```"#;

struct TestApp {
    app: Router,
    store: Arc<InMemorySessionStore>,
    vision: Arc<MockVisionModel>,
    editor: Arc<MockEditModel>,
}

fn test_app(vision: MockVisionModel, editor: MockEditModel, search: SearchGateway) -> TestApp {
    let vision = Arc::new(vision);
    let editor = Arc::new(editor);
    let store = Arc::new(InMemorySessionStore::new());
    let pipeline = Pipeline::new(vision.clone(), editor.clone(), search, PipelineOptions::default());
    let app = GatewayServer::new(
        ServerConfig::default(),
        GatewayConfig::default(),
        store.clone(),
        pipeline,
    )
    .build_router();
    TestApp {
        app,
        store,
        vision,
        editor,
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let b64 = codec::encode_rgb(&RgbImage::from_pixel(width, height, Rgb([90, 60, 30]))).unwrap();
    codec::decode_base64(&b64).unwrap()
}

fn multipart_request(file: &[u8], session_id: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(id) = session_id {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\n{id}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"scene.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let encoded: Vec<String> = fields
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(encoded.join("&")))
        .unwrap()
}

fn percent_encode(text: &str) -> String {
    text.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_endpoints() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    for uri in ["/", "/health"] {
        let (status, body) = send(
            &t.app,
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn test_analyze_creates_default_session() {
    let t = test_app(
        MockVisionModel::constant(DETECTIONS),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    let (status, body) = send(&t.app, multipart_request(&png_bytes(200, 100), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "default");
    assert_eq!(body["image_width"], 200);
    assert_eq!(body["image_height"], 100);
    assert_eq!(body["objects"][0]["label"], "Dress");
    assert_eq!(body["objects"][0]["box_2d"], json!([10, 20, 90, 100]));
    assert_eq!(body["objects"][0]["center"], json!([60, 50]));
    assert_eq!(body["objects"][1]["id"], 1);

    let session = t.store.get("default").await.unwrap().unwrap();
    assert_eq!(session.lock().await.objects.len(), 2);
}

#[tokio::test]
async fn test_analyze_degraded_detection_still_succeeds() {
    let t = test_app(
        MockVisionModel::failing("quota exceeded"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    let (status, body) = send(&t.app, multipart_request(&png_bytes(8, 8), Some("s1"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "s1");
    assert_eq!(body["objects"], json!([]));
}

#[tokio::test]
async fn test_analyze_rejects_unreadable_upload() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    let (status, body) = send(&t.app, multipart_request(b"definitely not a png", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(body["trace_id"].is_string());
    assert_eq!(t.vision.call_count(), 0);
}

#[tokio::test]
async fn test_infer_without_session_is_missing_precondition() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/infer",
            &[("clicked_label", "Dress"), ("click_x", "10"), ("click_y", "20")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_PRECONDITION");
    assert_eq!(t.vision.call_count(), 0);
}

#[tokio::test]
async fn test_infer_rejects_missing_or_non_numeric_click() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    for fields in [
        vec![("clicked_label", "Dress"), ("click_x", "left"), ("click_y", "20")],
        vec![("clicked_label", "Dress"), ("click_y", "20")],
    ] {
        let (status, body) = send(&t.app, form_request("/api/infer", &fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");
    }
    assert_eq!(t.vision.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_then_infer_flow() {
    let intents = r#"[
        {"id": 1, "label": "Recolor", "emoji": "🎨", "action_type": "edit", "editor_prompt": "make the dress red", "probability": 0.9},
        {"id": 2, "label": "Buy", "action_type": "search"}
    ]"#;
    let provider = Arc::new(MockSearchProvider::new(vec![sample_result(1)]));
    let t = test_app(
        MockVisionModel::new(vec![DETECTIONS.to_string(), intents.to_string()]),
        MockEditModel::new(json!({})),
        SearchGateway::new(Some(provider.clone())),
    );

    let (status, _) = send(&t.app, multipart_request(&png_bytes(200, 100), Some("s1"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/infer",
            &[
                ("clicked_label", "Dress"),
                ("click_x", "60"),
                ("click_y", "50"),
                ("session_id", "s1"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let intents = body["intents"].as_array().unwrap();
    assert_eq!(intents.len(), 2);
    assert_eq!(intents[0]["action_type"], "edit");
    assert_eq!(intents[0]["editor_prompt"], "make the dress red");
    assert_eq!(intents[1]["action_type"], "search");
    assert_eq!(
        intents[1]["action_data"]["search_query"],
        "Dress site:ebay.com"
    );
    assert!(t.vision.prompts()[1].contains("Dress, Mirror"));
    assert_eq!(provider.queries(), vec!["Dress buy purchase price Dress Mirror"]);
}

#[tokio::test]
async fn test_execute_edit_without_session() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[("prompt", "make it red"), ("box_json", "[10, 20, 90, 100]")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_PRECONDITION");
    assert_eq!(t.editor.call_count(), 0);
}

#[tokio::test]
async fn test_execute_rejects_bad_encoding_and_unknown_kind() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    let (status, body) = send(
        &t.app,
        form_request("/api/execute", &[("prompt", "x"), ("box", "[10, 20")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_INPUT_ENCODING");

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[("action_type", "navigate"), ("action_data", "{not json")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_INPUT_ENCODING");

    let (status, body) = send(
        &t.app,
        form_request("/api/execute", &[("action_type", "teleport")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_ACTION_TYPE");
    assert!(body["message"].as_str().unwrap().contains("teleport"));
}

#[tokio::test]
async fn test_execute_blocked_edit_returns_original() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}})),
        SearchGateway::disabled(),
    );
    send(&t.app, multipart_request(&png_bytes(40, 30), None)).await;

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[
                ("intent_id", "1"),
                ("action_type", "edit"),
                ("prompt", "remove the lamp"),
                ("box_json", "[3, 4, 20, 30]"),
                ("enable_image_edit", "true"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["action_type"], "edit");
    let image = codec::decode(body["image_base64"].as_str().unwrap()).unwrap();
    assert_eq!(image.dimensions(), (40, 30));
    assert_eq!(image.get_pixel(0, 0), &Rgb([90, 60, 30]));
    assert_eq!(t.editor.call_count(), 1);
}

#[tokio::test]
async fn test_execute_edit_disabled_skips_model() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );
    send(&t.app, multipart_request(&png_bytes(16, 16), None)).await;

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[
                ("prompt", "make it red"),
                ("box_json", "[0, 0, 8, 8]"),
                ("enable_edit", "off"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["image_base64"].is_string());
    assert_eq!(t.editor.call_count(), 0);
}

#[tokio::test]
async fn test_execute_navigate_info_and_search() {
    let t = test_app(
        MockVisionModel::constant("[]"),
        MockEditModel::new(json!({})),
        SearchGateway::disabled(),
    );

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[("action_type", "navigate"), ("action_data", r#"{"url": ""}"#)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[
                ("action_type", "navigate"),
                ("action_data", r#"{"url": "https://shop.example/a?b=1", "title": "Shop"}"#),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action_type"], "navigate");
    assert_eq!(body["data"], json!({"url": "https://shop.example/a?b=1", "title": "Shop"}));

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[("action_type", "info"), ("action_data", r#"{"info_text": "Made of oak"}"#)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"info_text": "Made of oak", "source_url": ""}));

    let (status, body) = send(
        &t.app,
        form_request(
            "/api/execute",
            &[("action_type", "search"), ("action_data", r#"{"search_query": "oak table"}"#)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["search_query"], "oak table");
    assert_eq!(body["data"]["results"], json!([]));
}
