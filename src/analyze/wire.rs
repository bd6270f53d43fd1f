//! JSON request/response contract spoken with an out-of-process analyzer.
//!
//! One request per exchange, tagged by `action`. The same handler backs the
//! `analyzer-worker` binary, so the command and HTTP analyzers can be tested
//! against the real protocol.

use serde::{Deserialize, Serialize};

use super::enhanced::{split_comment, CommentParts, EnhancedAnalyzer};
use super::language::detect_language;
use crate::error::{AnalysisError, AnalysisResult};
use crate::lexicon::{LexiconEntry, LexiconSnapshot};
use crate::report::{summarize, AggregatedSummary, ClassifiedComment};
use crate::sentiment::{AnalysisMethod, Sentiment, SentimentResult};
use crate::stats::{compute_quantitative_stats, QuantitativeComparison};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingsPayload {
    #[serde(default)]
    pub ratings: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WireRequest {
    AnalyzeSingle {
        comment: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lexicon: Option<Vec<LexiconEntry>>,
    },
    GenerateReport {
        feedbacks: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lexicon: Option<Vec<LexiconEntry>>,
    },
    #[serde(rename_all = "camelCase")]
    AnalyzeQuantitative {
        #[serde(default)]
        current_year_data: RatingsPayload,
        #[serde(default)]
        previous_year_data: RatingsPayload,
        current_year: i32,
        previous_year: i32,
    },
}

/// Per-comment entry of a `generate_report` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedFeedback {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f32,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<CommentParts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_feedbacks: Option<Vec<AnalyzedFeedback>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<AggregatedSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantitative: Option<QuantitativeComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireResponse {
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn single(r: &SentimentResult) -> Self {
        Self {
            success: true,
            sentiment: Some(r.sentiment),
            confidence: Some(r.confidence),
            method: Some(r.method.as_str().to_string()),
            ..Default::default()
        }
    }

    fn check_success(&self) -> AnalysisResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(AnalysisError::Primary(
                self.error.clone().unwrap_or_else(|| "remote analyzer reported failure".into()),
            ))
        }
    }

    /// Validated single classification, re-tagged as a primary result.
    pub fn into_result(self) -> AnalysisResult<SentimentResult> {
        self.check_success()?;
        let sentiment = self
            .sentiment
            .ok_or_else(|| AnalysisError::InvalidOutput("missing sentiment".into()))?;
        let confidence = self
            .confidence
            .ok_or_else(|| AnalysisError::InvalidOutput("missing confidence".into()))?;
        let r = SentimentResult::new(sentiment, confidence, AnalysisMethod::Primary);
        if !r.is_valid() {
            return Err(AnalysisError::InvalidOutput(format!(
                "confidence out of range: {confidence}"
            )));
        }
        Ok(r)
    }

    /// Validated batch classification; length must match the request.
    pub fn into_batch(self, expected: usize) -> AnalysisResult<Vec<SentimentResult>> {
        self.check_success()?;
        let items = self
            .analyzed_feedbacks
            .ok_or_else(|| AnalysisError::InvalidOutput("missing analyzed_feedbacks".into()))?;
        if items.len() != expected {
            return Err(AnalysisError::InvalidOutput(format!(
                "expected {expected} results, got {}",
                items.len()
            )));
        }
        items
            .into_iter()
            .map(|f| {
                let r = SentimentResult::new(f.sentiment, f.confidence, AnalysisMethod::Primary);
                if r.is_valid() {
                    Ok(r)
                } else {
                    Err(AnalysisError::InvalidOutput(format!(
                        "confidence out of range: {}",
                        f.confidence
                    )))
                }
            })
            .collect()
    }
}

fn snapshot(lexicon: Option<Vec<LexiconEntry>>) -> LexiconSnapshot {
    match lexicon {
        Some(entries) => LexiconSnapshot::from_entries(entries),
        None => LexiconSnapshot::builtin(),
    }
}

/// Serve one request with the in-process enhanced analyzer.
pub fn handle(req: WireRequest) -> WireResponse {
    let analyzer = EnhancedAnalyzer::new();
    match req {
        WireRequest::AnalyzeSingle { comment, lexicon } => {
            match analyzer.classify(&comment, &snapshot(lexicon)) {
                Ok(r) => WireResponse::single(&r),
                Err(e) => WireResponse::failure(e.to_string()),
            }
        }
        WireRequest::GenerateReport { feedbacks, lexicon } => {
            let lex = snapshot(lexicon);
            let mut analyzed = Vec::with_capacity(feedbacks.len());
            let mut classified = Vec::with_capacity(feedbacks.len());
            for text in feedbacks {
                let r = analyzer
                    .classify(&text, &lex)
                    .unwrap_or_else(|_| SentimentResult::placeholder());
                let parts = split_comment(&text, &lex);
                analyzed.push(AnalyzedFeedback {
                    text: text.clone(),
                    sentiment: r.sentiment,
                    confidence: r.confidence,
                    method: Some(r.method.as_str().to_string()),
                    parts: Some(parts.clone()),
                });
                let language = detect_language(&text, &lex);
                classified.push(ClassifiedComment::new(text, r, language).with_parts(parts));
            }
            WireResponse {
                success: true,
                analyzed_feedbacks: Some(analyzed),
                summary: Some(summarize(&classified)),
                ..Default::default()
            }
        }
        WireRequest::AnalyzeQuantitative {
            current_year_data,
            previous_year_data,
            current_year,
            previous_year,
        } => WireResponse {
            success: true,
            quantitative: Some(compute_quantitative_stats(
                &current_year_data.ratings,
                &previous_year_data.ratings,
                current_year,
                previous_year,
            )),
            ..Default::default()
        },
    }
}

/// Parse one raw request and answer it; malformed input becomes a failure response.
pub fn handle_json(raw: &str) -> WireResponse {
    if raw.trim().is_empty() {
        return WireResponse::failure("no input data received");
    }
    match serde_json::from_str::<WireRequest>(raw) {
        Ok(req) => handle(req),
        Err(e) => WireResponse::failure(format!("invalid request: {e}")),
    }
}
