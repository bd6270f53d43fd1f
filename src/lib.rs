// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod lexicon;
pub mod metrics;
pub mod report;
pub mod responses;
pub mod sentiment;
pub mod stats;

// ---- Re-exports for a stable public API ----
pub use crate::analyze::{Analyzer, AnalyzerPair, ResultCache};
pub use crate::api::{create_router, AppState};
pub use crate::config::EngineConfig;
pub use crate::engine::{CacheStatus, ScoringSnapshot, SentimentEngine};
pub use crate::error::{AnalysisError, AnalysisResult, LexiconError};
pub use crate::lexicon::{LexiconEntry, LexiconSnapshot, LexiconSource};
pub use crate::sentiment::{AnalysisMethod, Sentiment, SentimentResult};

use std::sync::Arc;

use crate::feedback::FeedbackSource;

/// Build the HTTP app from the environment-resolved config: engine, router and
/// `/metrics` on the process-wide Prometheus recorder.
pub fn app(feedback: Arc<dyn FeedbackSource>) -> anyhow::Result<axum::Router> {
    let cfg = EngineConfig::load()?;
    let metrics = crate::metrics::Metrics::global(cfg.cache.ttl_secs)?;
    let engine = SentimentEngine::from_config(&cfg, feedback)?;
    Ok(api::router_with_metrics(AppState::new(engine), &metrics))
}
