use std::sync::Arc;

use image::{Rgb, RgbImage};
use serde_json::json;
use tokio::sync::Mutex;

use ripple_core::{
    codec,
    mocks::{sample_result, MockEditModel, MockSearchProvider, MockVisionModel},
    types::{
        ActionKind, ActionOutcome, ActionRequest, BoundingBox, EditRequest, IntentAction,
        NavigateData, SearchData, Session,
    },
    Error,
};
use ripple_pipeline::{ActionExecutor, IntentSynthesizer, SceneAnalyzer};
use ripple_search::SearchGateway;

fn test_image() -> RgbImage {
    RgbImage::from_pixel(200, 100, Rgb([10, 20, 30]))
}

fn session_handle() -> Arc<Mutex<Session>> {
    Arc::new(Mutex::new(Session::new("s1", test_image(), Vec::new())))
}

fn edit_request(enable_edit: bool) -> ActionRequest {
    ActionRequest::Edit(EditRequest {
        prompt: "make it green".into(),
        region: BoundingBox::new(10, 20, 50, 100),
        enable_edit,
    })
}

// -----------------------------------------------------------------------------
// Scene analysis
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_analyze_fenced_with_and_without_language_tag() {
    let body = r#"[{"label": "Vending Machine", "box_2d": [100, 250, 900, 500]}]"#;
    let tagged = format!("Here you go:\n```json\n{}\n```", body);
    let bare = format!("```\n{}\n```", body);

    for raw in [tagged, bare] {
        let analyzer = SceneAnalyzer::new(Arc::new(MockVisionModel::constant(&raw)));
        let objects = analyzer.analyze(&test_image()).await;

        assert_eq!(objects.len(), 1);
        let obj = &objects[0];
        assert_eq!(obj.id, 0);
        assert_eq!(obj.label, "Vending Machine");
        assert_eq!(obj.box_2d, BoundingBox::new(10, 50, 90, 100));
        assert_eq!(obj.center, (75, 50));
    }
}

#[tokio::test]
async fn test_analyze_boxes_well_formed_and_centered() {
    let raw = json!([
        {"label": "A", "box_2d": [0, 0, 1000, 1000]},
        {"label": "B", "box_2d": [333, 777, 334, 778]},
        {"label": "C", "box_2d": [800, 900, 200, 100]},
        {"label": "D", "box_2d": [500, 500, 500, 500]}
    ])
    .to_string();
    let analyzer = SceneAnalyzer::new(Arc::new(MockVisionModel::constant(&raw)));

    let objects = analyzer.analyze(&test_image()).await;

    assert_eq!(objects.len(), 4);
    for (i, obj) in objects.iter().enumerate() {
        let b = obj.box_2d;
        assert_eq!(obj.id, i);
        assert!(b.top < b.bottom, "{:?}", obj);
        assert!(b.left < b.right, "{:?}", obj);
        assert!(b.bottom <= 100 && b.right <= 200);
        assert_eq!(obj.center, ((b.left + b.right) / 2, (b.top + b.bottom) / 2));
    }
}

#[tokio::test]
async fn test_analyze_truncates_to_ten() {
    let entries: Vec<_> = (0..14)
        .map(|i| json!({"label": format!("obj{}", i), "box_2d": [0, 0, 500, 500]}))
        .collect();
    let analyzer = SceneAnalyzer::new(Arc::new(MockVisionModel::constant(
        &serde_json::Value::from(entries).to_string(),
    )));

    let objects = analyzer.analyze(&test_image()).await;

    assert_eq!(objects.len(), 10);
    assert_eq!(objects[9].label, "obj9");
}

#[tokio::test]
async fn test_analyze_degrades_to_empty() {
    let failing = SceneAnalyzer::new(Arc::new(MockVisionModel::failing("quota exceeded")));
    assert!(failing.analyze(&test_image()).await.is_empty());

    let garbage = SceneAnalyzer::new(Arc::new(MockVisionModel::constant("I see a cat.")));
    assert!(garbage.analyze(&test_image()).await.is_empty());

    let malformed = SceneAnalyzer::new(Arc::new(MockVisionModel::constant(
        r#"[{"label": "Ok", "box_2d": [0, 0, 10, 10]}, {"label": "Bad", "box_2d": [1, 2]}]"#,
    )));
    assert!(malformed.analyze(&test_image()).await.is_empty());
}

// -----------------------------------------------------------------------------
// Intent inference
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_infer_product_gets_marketplace_search() {
    let model = Arc::new(MockVisionModel::constant(
        r#"```json
        [
            {"id": 1, "label": "Recolor", "action_type": "edit", "editor_prompt": "make the dress blue", "probability": 0.7},
            {"id": 2, "label": "Fabric", "action_type": "info", "description": "Cotton blend"}
        ]
        ```"#,
    ));
    let provider = Arc::new(MockSearchProvider::new(vec![sample_result(1), sample_result(2)]));
    let synth = IntentSynthesizer::new(
        model.clone(),
        SearchGateway::new(Some(provider.clone())),
        true,
    );

    let intents = synth
        .infer(&test_image(), "Dress", &["Mirror".to_string()])
        .await;

    assert_eq!(provider.queries(), vec!["Dress buy purchase price Mirror"]);
    assert!(model.prompts()[0].contains("Related web resources:"));

    let search: Vec<_> = intents
        .iter()
        .filter(|i| i.kind() == ActionKind::Search)
        .collect();
    assert!(!search.is_empty());
    match &search[0].action {
        IntentAction::Search(data) => assert!(data.search_query.contains("site:ebay.com")),
        other => panic!("unexpected action {:?}", other),
    }
    assert_eq!(search[0].id, 3);
}

#[tokio::test]
async fn test_infer_product_search_backfilled_not_duplicated() {
    let model = Arc::new(MockVisionModel::constant(
        r#"{"intents": [{"label": "Buy", "action_type": "search"}]}"#,
    ));
    let provider = Arc::new(MockSearchProvider::new(vec![sample_result(1)]));
    let synth = IntentSynthesizer::new(model, SearchGateway::new(Some(provider)), true);

    let intents = synth.infer(&test_image(), "Sneakers", &[]).await;

    assert_eq!(intents.len(), 1);
    assert_eq!(
        intents[0].action,
        IntentAction::Search(SearchData {
            search_query: "Sneakers site:ebay.com".into(),
            search_engine: "ebay".into()
        })
    );
}

#[tokio::test]
async fn test_infer_tolerates_loose_model_output() {
    let model = Arc::new(MockVisionModel::constant(
        r#"[
            {"id": "1", "label": "Recolor", "action_type": "edit", "editor_prompt": "make it red", "probability": "0.7"},
            {"label": "About", "action_type": "info", "action_data": {"info_text": "A lamp", "source_url": null}}
        ]"#,
    ));
    let synth = IntentSynthesizer::new(model, SearchGateway::disabled(), false);

    let intents = synth.infer(&test_image(), "Lamp", &[]).await;

    assert_eq!(intents.len(), 2);
    assert_eq!(intents[0].id, 1);
    assert_eq!(intents[0].probability, 0.7);
    match &intents[1].action {
        IntentAction::Info(data) => {
            assert_eq!(data.info_text, "A lamp");
            assert_eq!(data.source_url, "");
        }
        other => panic!("unexpected action {:?}", other),
    }
}

#[tokio::test]
async fn test_infer_without_web_search_skips_provider() {
    let model = Arc::new(MockVisionModel::constant(
        r#"[{"label": "Open", "action_type": "navigate", "action_data": {"url": "https://a.example", "title": "A"}}]"#,
    ));
    let provider = Arc::new(MockSearchProvider::new(vec![sample_result(1)]));
    let synth = IntentSynthesizer::new(model, SearchGateway::new(Some(provider.clone())), false);

    let intents = synth.infer(&test_image(), "Dress", &[]).await;

    assert_eq!(provider.call_count(), 0);
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].color, "#22C55E");
}

#[tokio::test]
async fn test_infer_degrades_to_empty() {
    let synth = IntentSynthesizer::new(
        Arc::new(MockVisionModel::constant("Sorry, I can't help.")),
        SearchGateway::disabled(),
        true,
    );
    assert!(synth.infer(&test_image(), "Lamp", &[]).await.is_empty());

    let bad_data = IntentSynthesizer::new(
        Arc::new(MockVisionModel::constant(
            r#"[{"label": "Go", "action_type": "navigate", "action_data": {"url": 42}}]"#,
        )),
        SearchGateway::disabled(),
        true,
    );
    assert!(bad_data.infer(&test_image(), "Lamp", &[]).await.is_empty());
}

// -----------------------------------------------------------------------------
// Execution
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_edit_without_session_never_calls_model() {
    let editor = Arc::new(MockEditModel::new(json!({})));
    let executor = ActionExecutor::new(editor.clone(), SearchGateway::disabled());

    let err = executor.execute(None, edit_request(true)).await.unwrap_err();

    assert!(matches!(err, Error::MissingPrecondition(_)));
    assert_eq!(editor.call_count(), 0);
}

#[tokio::test]
async fn test_edit_no_candidates_returns_original() {
    let editor = Arc::new(MockEditModel::new(json!({"candidates": []})));
    let executor = ActionExecutor::new(editor.clone(), SearchGateway::disabled());
    let handle = session_handle();

    let outcome = executor.execute(Some(&handle), edit_request(true)).await.unwrap();

    match outcome {
        ActionOutcome::Edited { image, applied } => {
            assert!(!applied);
            assert_eq!(image, test_image());
        }
        other => panic!("unexpected outcome {:?}", other.kind()),
    }
    assert_eq!(editor.call_count(), 1);
    assert!(editor.prompts()[0].contains("(0.10, 0.10) to (0.50, 0.50)"));
    assert_eq!(handle.lock().await.image, test_image());
}

#[tokio::test]
async fn test_edit_model_error_returns_original() {
    let executor = ActionExecutor::new(
        Arc::new(MockEditModel::failing("HTTP 503")),
        SearchGateway::disabled(),
    );
    let handle = session_handle();

    let outcome = executor.execute(Some(&handle), edit_request(true)).await.unwrap();

    assert!(matches!(outcome, ActionOutcome::Edited { applied: false, .. }));
}

#[tokio::test]
async fn test_edit_success_replaces_session_image() {
    let edited = RgbImage::from_pixel(64, 32, Rgb([0, 255, 0]));
    let response = json!({
        "candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/png", "data": codec::encode_rgb(&edited).unwrap()}}
        ]}}]
    });
    let executor = ActionExecutor::new(Arc::new(MockEditModel::new(response)), SearchGateway::disabled());
    let handle = session_handle();

    let outcome = executor.execute(Some(&handle), edit_request(true)).await.unwrap();

    match outcome {
        ActionOutcome::Edited { image, applied } => {
            assert!(applied);
            assert_eq!(image.dimensions(), (64, 32));
        }
        other => panic!("unexpected outcome {:?}", other.kind()),
    }
    assert_eq!(handle.lock().await.image, edited);
}

#[tokio::test]
async fn test_edit_disabled_skips_model() {
    let editor = Arc::new(MockEditModel::new(json!({})));
    let executor = ActionExecutor::new(editor.clone(), SearchGateway::disabled());
    let handle = session_handle();

    let outcome = executor.execute(Some(&handle), edit_request(false)).await.unwrap();

    assert!(matches!(outcome, ActionOutcome::Edited { applied: false, .. }));
    assert_eq!(editor.call_count(), 0);
}

#[tokio::test]
async fn test_navigate_requires_url_and_echoes_verbatim() {
    let executor = ActionExecutor::new(Arc::new(MockEditModel::new(json!({}))), SearchGateway::disabled());

    let err = executor
        .execute(None, ActionRequest::Navigate(NavigateData::default()))
        .await
        .unwrap_err();
    assert!(err.is_client_error());

    let data = NavigateData {
        url: "https://shop.example/item?id=1".into(),
        title: "Item  page".into(),
    };
    let outcome = executor
        .execute(None, ActionRequest::Navigate(data.clone()))
        .await
        .unwrap();
    match outcome {
        ActionOutcome::Navigate(echoed) => assert_eq!(echoed, data),
        other => panic!("unexpected outcome {:?}", other.kind()),
    }
}

#[tokio::test]
async fn test_search_action_limits_results() {
    let provider = Arc::new(MockSearchProvider::new((1..=9).map(sample_result).collect()));
    let executor = ActionExecutor::new(
        Arc::new(MockEditModel::new(json!({}))),
        SearchGateway::new(Some(provider.clone())),
    );

    let outcome = executor
        .execute(
            None,
            ActionRequest::Search(SearchData {
                search_query: "desk lamp".into(),
                search_engine: "google".into(),
            }),
        )
        .await
        .unwrap();

    match outcome {
        ActionOutcome::Search { query, results } => {
            assert_eq!(query, "desk lamp");
            assert_eq!(results.len(), 5);
        }
        other => panic!("unexpected outcome {:?}", other.kind()),
    }
    assert_eq!(provider.queries(), vec!["desk lamp"]);
}

#[tokio::test]
async fn test_marketplace_search_action_qualifies_once() {
    let provider = Arc::new(MockSearchProvider::new(vec![sample_result(1)]));
    let executor = ActionExecutor::new(
        Arc::new(MockEditModel::new(json!({}))),
        SearchGateway::new(Some(provider.clone())),
    );

    for query in ["red dress", "red dress site:ebay.com"] {
        executor
            .execute(
                None,
                ActionRequest::Search(SearchData {
                    search_query: query.into(),
                    search_engine: "ebay".into(),
                }),
            )
            .await
            .unwrap();
    }

    assert_eq!(
        provider.queries(),
        vec!["red dress site:ebay.com", "red dress site:ebay.com"]
    );
}

#[tokio::test]
async fn test_search_action_unconfigured_is_empty() {
    let executor = ActionExecutor::new(Arc::new(MockEditModel::new(json!({}))), SearchGateway::disabled());

    let outcome = executor
        .execute(
            None,
            ActionRequest::Search(SearchData {
                search_query: "desk lamp".into(),
                search_engine: String::new(),
            }),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, ActionOutcome::Search { results, .. } if results.is_empty()));
}

#[tokio::test]
async fn test_edits_on_one_session_serialize() {
    let edited = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
    let response = json!({"parts": [{"inlineData": {"data": codec::encode_rgb(&edited).unwrap()}}]});
    let executor = Arc::new(ActionExecutor::new(
        Arc::new(MockEditModel::new(response)),
        SearchGateway::disabled(),
    ));
    let handle = session_handle();

    let a = {
        let (executor, handle) = (executor.clone(), handle.clone());
        tokio::spawn(async move { executor.execute(Some(&handle), edit_request(true)).await })
    };
    let b = {
        let (executor, handle) = (executor.clone(), handle.clone());
        tokio::spawn(async move { executor.execute(Some(&handle), edit_request(true)).await })
    };

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    assert_eq!(handle.lock().await.image, edited);
}
