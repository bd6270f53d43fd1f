// tests/worker_protocol.rs
//
// The analyzer-worker binary against the JSON wire protocol, both raw and
// through `CommandAnalyzer` as a primary.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use event_feedback_sentiment::analyze::wire::WireResponse;
use event_feedback_sentiment::analyze::{AnalyzerPair, CommandAnalyzer};
use event_feedback_sentiment::{AnalysisMethod, Analyzer, LexiconEntry, LexiconSnapshot, Sentiment};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

const WORKER: &str = env!("CARGO_BIN_EXE_analyzer-worker");

async fn exchange(stdin: &str) -> WireResponse {
    let mut child = Command::new(WORKER)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn worker");
    let mut input = child.stdin.take().unwrap();
    input.write_all(stdin.as_bytes()).await.unwrap();
    drop(input);
    let mut out = String::new();
    child.stdout.take().unwrap().read_to_string(&mut out).await.unwrap();
    assert!(child.wait().await.unwrap().success());
    assert!(out.ends_with('\n'), "one JSON document per line");
    serde_json::from_str(out.trim()).expect("worker answers JSON")
}

#[tokio::test]
async fn analyze_single_round_trip() {
    let resp = exchange(&json!({"action": "analyze_single", "comment": "Sobrang ganda ng event!"}).to_string()).await;
    assert!(resp.success);
    assert_eq!(resp.sentiment, Some(Sentiment::Positive));
    let c = resp.confidence.unwrap();
    assert!((0.0..=1.0).contains(&c));
}

#[tokio::test]
async fn generate_report_answers_per_comment_and_summary() {
    let req = json!({
        "action": "generate_report",
        "feedbacks": ["Excellent event!", "Okay lang ang event", "The event was terrible"]
    });
    let resp = exchange(&req.to_string()).await;
    assert!(resp.success);
    let items = resp.analyzed_feedbacks.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2].text, "The event was terrible");
    assert_eq!(items[2].sentiment, Sentiment::Negative);
    let summary = resp.summary.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.percentages.positive, 33.3);
}

#[tokio::test]
async fn analyze_quantitative_uses_camel_case_fields() {
    let req = json!({
        "action": "analyze_quantitative",
        "currentYearData": {"ratings": [5, 4, 5]},
        "previousYearData": {"ratings": [3, 4]},
        "currentYear": 2025,
        "previousYear": 2024
    });
    let resp = exchange(&req.to_string()).await;
    let v: Value = serde_json::to_value(resp.quantitative.unwrap()).unwrap();
    assert_eq!(v["current_year"]["average_rating"], json!(4.67));
    assert_eq!(v["trend"], json!("increase"));
}

#[tokio::test]
async fn malformed_input_is_a_failure_response() {
    for raw in ["", "not json", r#"{"action":"launch_rockets"}"#] {
        let resp = exchange(raw).await;
        assert!(!resp.success, "{raw:?}");
        assert!(resp.error.is_some());
    }
}

#[tokio::test]
async fn command_analyzer_uses_the_worker() {
    let worker = CommandAnalyzer::new(WORKER, vec![]);
    let lex = LexiconSnapshot::builtin();

    let r = worker.analyze("The event was terrible", &lex).await.unwrap();
    assert_eq!(r.sentiment, Sentiment::Negative);

    let texts: Vec<String> = vec!["amazing".into(), "Okay lang ang event".into()];
    let rs = worker.analyze_batch(&texts, &lex).await.unwrap();
    assert_eq!(rs.len(), 2);
    assert_eq!(rs[0].sentiment, Sentiment::Positive);
    assert_eq!(rs[1].sentiment, Sentiment::Neutral);
}

#[tokio::test]
async fn worker_sees_shipped_custom_lexicon() {
    let lex = LexiconSnapshot::from_entries(vec![LexiconEntry::new("bongga", Sentiment::Positive, 3.0, "tl")]);
    let worker = CommandAnalyzer::new(WORKER, vec![]);
    let r = worker.analyze("bongga", &lex).await.unwrap();
    assert_eq!(r.sentiment, Sentiment::Positive);
}

#[tokio::test]
async fn worker_as_primary_is_labelled_primary() {
    let pair = AnalyzerPair::with_default_fallback(
        Arc::new(CommandAnalyzer::new(WORKER, vec![])),
        Duration::from_secs(10),
    );
    let r = pair.analyze("Excellent event!", &LexiconSnapshot::builtin()).await.unwrap();
    assert_eq!(r.method, AnalysisMethod::Primary);
    assert_eq!(r.sentiment, Sentiment::Positive);
}

#[tokio::test]
async fn missing_worker_falls_back() {
    let pair = AnalyzerPair::with_default_fallback(
        Arc::new(CommandAnalyzer::new("/nonexistent/analyzer-worker", vec![])),
        Duration::from_secs(5),
    );
    let r = pair.analyze("Excellent event!", &LexiconSnapshot::builtin()).await.unwrap();
    assert_eq!(r.method, AnalysisMethod::Fallback);
    assert_eq!(r.sentiment, Sentiment::Positive);
}
