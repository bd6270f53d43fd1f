// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /analyze, POST /analyze/batch
// - GET /events/{id}/report/{qualitative,quantitative}
// - POST /responses/analyze
// - GET/POST /lexicon

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use event_feedback_sentiment::analyze::{AnalyzerPair, FallbackAnalyzer};
use event_feedback_sentiment::feedback::{EventFeedback, InMemoryFeedback};
use event_feedback_sentiment::{
    create_router, AppState, EngineConfig, LexiconEntry, LexiconSource, ResultCache, SentimentEngine,
};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router() -> Router {
    let feedback = InMemoryFeedback::new().with_event(
        "orientation",
        EventFeedback {
            year: Some(2025),
            comments: vec![
                "Excellent event!".into(),
                "Okay lang ang event".into(),
                "The event was terrible".into(),
            ],
            ratings: HashMap::from([(2025, vec![5.0, 4.0, 5.0]), (2024, vec![3.0, 4.0])]),
        },
    );
    let engine = SentimentEngine::from_config(&EngineConfig::default(), Arc::new(feedback)).expect("engine");
    create_router(AppState::new(engine))
}

/// Readable but refuses every write, like a store on a full disk.
struct ReadOnlyLexicon;

#[async_trait::async_trait]
impl LexiconSource for ReadOnlyLexicon {
    async fn fetch_all(&self) -> anyhow::Result<Vec<LexiconEntry>> {
        Ok(Vec::new())
    }
    async fn exists(&self, _word: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
    async fn add(&self, _entry: LexiconEntry) -> anyhow::Result<()> {
        anyhow::bail!("no space left on device")
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn post_json(uri: &str, payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).expect("build GET")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();
    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap().to_vec();
    assert_eq!(String::from_utf8(bytes).unwrap().trim(), "OK");
}

#[tokio::test]
async fn api_analyze_returns_label_confidence_method() {
    let app = test_router();
    let (status, v) = send(&app, post_json("/analyze", json!({ "text": "Sobrang ganda ng event!" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["sentiment"], "positive");
    let c = v["confidence"].as_f64().expect("confidence is a number");
    assert!((0.0..=1.0).contains(&c));
    assert_eq!(v["method"], "primary");
}

#[tokio::test]
async fn api_analyze_blank_text_is_neutral() {
    let app = test_router();
    let (status, v) = send(&app, post_json("/analyze", json!({ "text": "   " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["sentiment"], "neutral");
    assert_eq!(v["confidence"], 0.0);
    assert_eq!(v["method"], "empty_text");
}

#[tokio::test]
async fn api_analyze_rejects_missing_text() {
    let app = test_router();
    let resp = app
        .oneshot(post_json("/analyze", json!({ "comment": "wrong field" })))
        .await
        .unwrap();
    assert!(resp.status().is_client_error(), "got {}", resp.status());
}

#[tokio::test]
async fn api_batch_preserves_order_and_length() {
    let app = test_router();
    let (status, v) = send(
        &app,
        post_json(
            "/analyze/batch",
            json!({ "texts": ["The event was terrible", "", "Excellent event!"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = v["results"].as_array().expect("results array");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["sentiment"], "negative");
    assert_eq!(results[1]["method"], "empty_text");
    assert_eq!(results[2]["sentiment"], "positive");
}

#[tokio::test]
async fn api_qualitative_report_has_summary_fields() {
    let app = test_router();
    let (status, v) = send(&app, get("/events/orientation/report/qualitative")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["event_id"], "orientation");
    assert_eq!(v["total"], 3);
    assert_eq!(v["counts"]["positive"], 1);
    assert_eq!(v["percentages"]["negative"], 33.3);
    assert!(v["insights"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(v["recommendations"].as_array().is_some_and(|r| !r.is_empty()));
    assert_eq!(v["comments"][0]["text"], "Excellent event!");
    assert_eq!(v["comments"][0]["parts"]["positive_part"], "Excellent event.");
    assert_eq!(v["comments"][2]["parts"]["sentence_counts"]["negative"], 1);
}

#[tokio::test]
async fn api_quantitative_report_compares_years() {
    let app = test_router();
    let (status, v) = send(&app, get("/events/orientation/report/quantitative")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["current_year"]["year"], 2025);
    assert_eq!(v["current_year"]["average_rating"], 4.67);
    assert_eq!(v["previous_year"]["response_count"], 2);
    assert_eq!(v["improvement"]["rating_change"], 1.17);
    assert_eq!(v["trend"], "increase");
}

#[tokio::test]
async fn api_unknown_event_is_500_with_error_body() {
    let app = test_router();
    let (status, v) = send(&app, get("/events/nope/report/qualitative")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().is_some_and(|e| e.contains("nope")));
}

#[tokio::test]
async fn api_responses_only_scores_free_text() {
    let app = test_router();
    let payload = json!({
        "responses": [
            { "answers": { "q1": "Ang galing ng speakers!", "q2": 5, "q3": "Option A" } },
            { "answers": { "q1": "The venue was terrible", "q2": 2 } }
        ],
        "question_types": { "q1": "paragraph", "q2": "linear_scale", "q3": "multiple_choice" }
    });
    let (status, v) = send(&app, post_json("/responses/analyze", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["analyzed"], 2);
    assert_eq!(v["skipped"], 3);
    assert_eq!(v["overall"]["negative"], 1);
    assert_eq!(v["by_question"]["q1"]["positive"], 1);
}

#[tokio::test]
async fn api_lexicon_add_then_conflict() {
    let app = test_router();
    let entry = json!({ "word": "bet na bet", "sentiment": "positive", "weight": 2.0, "language": "tl" });

    let (status, v) = send(&app, post_json("/lexicon", entry.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(v["is_phrase"], true);

    let (status, v) = send(&app, post_json("/lexicon", entry)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(v["error"].is_string());

    let (status, v) = send(&app, get("/lexicon")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v.as_array().map(Vec::len), Some(1));

    let (_, v) = send(&app, post_json("/analyze", json!({ "text": "Bet na bet ko ang workshop" }))).await;
    assert_eq!(v["sentiment"], "positive");
}

#[tokio::test]
async fn api_lexicon_rejects_invalid_entry() {
    let app = test_router();
    let (status, _) = send(
        &app,
        post_json(
            "/lexicon",
            json!({ "word": "   ", "sentiment": "positive", "weight": 1.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_lexicon_store_failure_is_500() {
    let engine = SentimentEngine::new(
        AnalyzerPair::fallback_only(Arc::new(FallbackAnalyzer::new())),
        ResultCache::default(),
        Arc::new(ReadOnlyLexicon),
        Arc::new(InMemoryFeedback::new()),
    );
    let app = create_router(AppState::new(engine));
    let (status, v) = send(
        &app,
        post_json("/lexicon", json!({ "word": "lodi", "sentiment": "positive", "weight": 1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().is_some_and(|e| e.contains("no space left")));
}
