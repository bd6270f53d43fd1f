use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::engine::{QualitativeReport, QuantitativeReport, SentimentEngine};
use crate::error::LexiconError;
use crate::lexicon::LexiconEntry;
use crate::metrics::Metrics;
use crate::responses::{FormResponse, QuestionType, SentimentBreakdown};
use crate::sentiment::{Sentiment, SentimentResult};

pub const CACHE_HEADER: &str = "x-sentiment-cache";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SentimentEngine>,
}

impl AppState {
    pub fn new(engine: SentimentEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/analyze", post(analyze))
        .route("/analyze/batch", post(analyze_batch))
        .route("/events/{id}/report/qualitative", get(qualitative_report))
        .route("/events/{id}/report/quantitative", get(quantitative_report))
        .route("/responses/analyze", post(analyze_responses))
        .route("/lexicon", get(list_lexicon).post(add_lexicon))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Full router including `/metrics`.
pub fn router_with_metrics(state: AppState, metrics: &Metrics) -> Router {
    create_router(state).merge(metrics.router())
}

/// JSON error body with a status code.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// 409 for duplicates, 400 for invalid entries, 500 when the store failed.
fn lexicon_rejection(e: anyhow::Error) -> ApiError {
    match e.downcast_ref::<LexiconError>() {
        Some(LexiconError::Duplicate(_)) => ApiError(StatusCode::CONFLICT, e.to_string()),
        Some(LexiconError::Invalid(_)) => ApiError(StatusCode::BAD_REQUEST, e.to_string()),
        None => {
            warn!(target: "sentiment::lexicon", error = %format!("{e:#}"), "lexicon store failed");
            internal(format!("{e:#}"))
        }
    }
}

#[derive(Deserialize)]
struct AnalyzeReq {
    text: String,
}

#[derive(Serialize)]
struct AnalyzeResp {
    sentiment: Sentiment,
    confidence: f32,
    method: &'static str,
}

impl From<&SentimentResult> for AnalyzeResp {
    fn from(r: &SentimentResult) -> Self {
        Self {
            sentiment: r.sentiment,
            confidence: r.confidence,
            method: r.method.as_str(),
        }
    }
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<(HeaderMap, Json<AnalyzeResp>), ApiError> {
    let (result, status) = state
        .engine
        .analyze_with_cache_status(&body.text)
        .await
        .map_err(internal)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(CACHE_HEADER),
        HeaderValue::from_static(status.as_str()),
    );
    Ok((headers, Json(AnalyzeResp::from(&result))))
}

#[derive(Deserialize)]
struct BatchReq {
    texts: Vec<String>,
}

#[derive(Serialize)]
struct BatchResp {
    results: Vec<AnalyzeResp>,
}

async fn analyze_batch(State(state): State<AppState>, Json(body): Json<BatchReq>) -> Json<BatchResp> {
    let results = state.engine.analyze_batch(&body.texts).await;
    Json(BatchResp {
        results: results.iter().map(AnalyzeResp::from).collect(),
    })
}

async fn qualitative_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QualitativeReport>, ApiError> {
    state
        .engine
        .generate_qualitative_report(&id)
        .await
        .map(Json)
        .map_err(|e| {
            warn!(target: "sentiment::engine", event_id = %id, error = %format!("{e:#}"), "qualitative report failed");
            internal(format!("{e:#}"))
        })
}

async fn quantitative_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuantitativeReport>, ApiError> {
    state
        .engine
        .generate_quantitative_report(&id)
        .await
        .map(Json)
        .map_err(|e| {
            warn!(target: "sentiment::engine", event_id = %id, error = %format!("{e:#}"), "quantitative report failed");
            internal(format!("{e:#}"))
        })
}

#[derive(Deserialize)]
struct ResponsesReq {
    responses: Vec<FormResponse>,
    question_types: HashMap<String, QuestionType>,
}

async fn analyze_responses(
    State(state): State<AppState>,
    Json(body): Json<ResponsesReq>,
) -> Json<SentimentBreakdown> {
    Json(
        state
            .engine
            .analyze_responses(&body.responses, &body.question_types)
            .await,
    )
}

async fn list_lexicon(State(state): State<AppState>) -> Result<Json<Vec<LexiconEntry>>, ApiError> {
    state.engine.lexicon_entries().await.map(Json).map_err(internal)
}

async fn add_lexicon(
    State(state): State<AppState>,
    Json(entry): Json<LexiconEntry>,
) -> Result<(StatusCode, Json<LexiconEntry>), ApiError> {
    if state
        .engine
        .lexicon_contains(&entry.word)
        .await
        .map_err(internal)?
    {
        return Err(ApiError(
            StatusCode::CONFLICT,
            format!("lexicon entry `{}` already exists", entry.key()),
        ));
    }
    let stored = entry.clone().normalized();
    state
        .engine
        .add_lexicon_entry(entry)
        .await
        .map_err(lexicon_rejection)?;
    Ok((StatusCode::CREATED, Json(stored)))
}
