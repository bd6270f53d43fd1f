// src/analyze/mod.rs
//! Classification pipeline: tokenizer, language packs, phrase matcher,
//! scorers, the primary/fallback pair and the result cache.

pub mod cache;
pub mod enhanced;
pub mod language;
pub mod phrases;
pub mod remote;
pub mod scoring;
pub mod strategy;
pub mod tokenize;
pub mod wire;

use std::sync::Arc;

use crate::error::AnalysisResult;
use crate::lexicon::LexiconSnapshot;
use crate::sentiment::SentimentResult;

pub use cache::{Clock, ManualClock, ResultCache, SystemClock};
pub use enhanced::{split_comment, CommentParts, EnhancedAnalyzer, SentenceCounts};
pub use language::{detect_language, Language};
pub use remote::{CommandAnalyzer, HttpAnalyzer};
pub use scoring::FallbackAnalyzer;
pub use strategy::AnalyzerPair;

/// One sentiment capability. Implementations must be deterministic for a
/// fixed lexicon snapshot, or at least idempotent per text.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    /// Short name for logs and metrics labels.
    fn name(&self) -> &'static str;

    async fn analyze(&self, text: &str, lexicon: &LexiconSnapshot) -> AnalysisResult<SentimentResult>;

    /// Same length and order as `texts`.
    async fn analyze_batch(
        &self,
        texts: &[String],
        lexicon: &LexiconSnapshot,
    ) -> AnalysisResult<Vec<SentimentResult>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.analyze(t, lexicon).await?);
        }
        Ok(out)
    }
}

pub type DynAnalyzer = Arc<dyn Analyzer>;
