//! # Sentiment Engine
//! Entry points used by the report/controller layer: single-comment analysis
//! (cache-aware), batch classification into an aggregated summary, the two
//! event reports, form-response breakdowns and lexicon maintenance.
//!
//! The lexicon is snapshotted once per call so every comment of a batch is
//! scored against the same entries even if the store changes meanwhile.
//! Each snapshot remembers the cache generation read before it was fetched;
//! results scored against it are only cached while that generation is live.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Datelike;
use metrics::histogram;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analyze::tokenize::anon_hash;
use crate::analyze::{
    detect_language, split_comment, AnalyzerPair, CommandAnalyzer, EnhancedAnalyzer, FallbackAnalyzer,
    HttpAnalyzer, ResultCache,
};
use crate::config::{EngineConfig, PrimaryKind};
use crate::error::{AnalysisError, AnalysisResult};
use crate::feedback::FeedbackSource;
use crate::lexicon::{InMemoryLexicon, JsonFileLexicon, LexiconEntry, LexiconSnapshot, LexiconSource};
use crate::metrics::BATCH_MS;
use crate::report::{summarize, AggregatedSummary, ClassifiedComment};
use crate::responses::{extract_free_text, FormResponse, QuestionTypeMap, SentimentBreakdown};
use crate::sentiment::SentimentResult;
use crate::stats::{compute_quantitative_stats, QuantitativeComparison};

/// Whether a single-comment answer came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeReport {
    pub event_id: String,
    #[serde(flatten)]
    pub summary: AggregatedSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeReport {
    pub event_id: String,
    #[serde(flatten)]
    pub comparison: QuantitativeComparison,
}

/// Lexicon snapshot plus the cache generation it was taken under.
#[derive(Debug, Clone)]
pub struct ScoringSnapshot {
    lexicon: Arc<LexiconSnapshot>,
    generation: u64,
}

impl ScoringSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Deref for ScoringSnapshot {
    type Target = LexiconSnapshot;

    fn deref(&self) -> &LexiconSnapshot {
        &self.lexicon
    }
}

pub struct SentimentEngine {
    pair: Arc<AnalyzerPair>,
    cache: Arc<ResultCache>,
    lexicon: Arc<dyn LexiconSource>,
    feedback: Arc<dyn FeedbackSource>,
    max_concurrency: usize,
}

impl std::fmt::Debug for SentimentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentEngine")
            .field("pair", &self.pair)
            .field("cache", &self.cache)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

/// Analyzer pair described by `cfg`.
pub fn build_analyzer_pair(cfg: &EngineConfig) -> Result<AnalyzerPair> {
    let timeout = cfg.primary_timeout();
    let fallback = Arc::new(FallbackAnalyzer::new());
    let pair = match cfg.analysis.primary {
        PrimaryKind::Enhanced => AnalyzerPair::new(Arc::new(EnhancedAnalyzer::new()), fallback, timeout),
        PrimaryKind::Command => {
            let c = cfg
                .analysis
                .command
                .as_ref()
                .context("primary = \"command\" without [analysis.command]")?;
            AnalyzerPair::new(
                Arc::new(CommandAnalyzer::new(c.program.clone(), c.args.clone())),
                fallback,
                timeout,
            )
        }
        PrimaryKind::Http => {
            let h = cfg
                .analysis
                .http
                .as_ref()
                .context("primary = \"http\" without [analysis.http]")?;
            let http = HttpAnalyzer::new(h.url.clone(), std::time::Duration::from_millis(h.timeout_ms))?;
            AnalyzerPair::new(Arc::new(http), fallback, timeout)
        }
        PrimaryKind::Disabled => AnalyzerPair::fallback_only(fallback),
    };
    Ok(pair)
}

/// Lexicon store described by `cfg`.
pub fn build_lexicon_source(cfg: &EngineConfig) -> Arc<dyn LexiconSource> {
    match &cfg.lexicon.path {
        Some(path) => Arc::new(JsonFileLexicon::new(path.clone())),
        None => Arc::new(InMemoryLexicon::new()),
    }
}

impl SentimentEngine {
    pub fn new(
        pair: AnalyzerPair,
        cache: ResultCache,
        lexicon: Arc<dyn LexiconSource>,
        feedback: Arc<dyn FeedbackSource>,
    ) -> Self {
        Self {
            pair: Arc::new(pair),
            cache: Arc::new(cache),
            lexicon,
            feedback,
            max_concurrency: 8,
        }
    }

    pub fn from_config(cfg: &EngineConfig, feedback: Arc<dyn FeedbackSource>) -> Result<Self> {
        cfg.validate()?;
        let pair = build_analyzer_pair(cfg)?;
        let cache = ResultCache::new(cfg.cache_ttl(), cfg.cache.capacity);
        info!(
            target: "sentiment::engine",
            primary = %cfg.analysis.primary,
            timeout_ms = cfg.analysis.primary_timeout_ms,
            cache_ttl_secs = cfg.cache.ttl_secs,
            cache_capacity = cfg.cache.capacity,
            "sentiment engine configured"
        );
        Ok(Self::new(pair, cache, build_lexicon_source(cfg), feedback)
            .with_max_concurrency(cfg.analysis.max_concurrency))
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn pair(&self) -> &AnalyzerPair {
        &self.pair
    }

    /// Custom entries + built-ins. An unavailable store degrades to built-ins.
    ///
    /// The cache generation is read first: an entry added after this point
    /// clears the cache and invalidates the generation, so a result scored
    /// against the older entries is never stored.
    pub async fn snapshot(&self) -> ScoringSnapshot {
        let generation = self.cache.generation();
        let lexicon = match self.lexicon.fetch_all().await {
            Ok(entries) => Arc::new(LexiconSnapshot::from_entries(entries)),
            Err(e) => {
                warn!(target: "sentiment::lexicon", error = %e, "lexicon source unavailable; using built-in lexicon");
                Arc::new(LexiconSnapshot::builtin())
            }
        };
        ScoringSnapshot { lexicon, generation }
    }

    pub async fn analyze_comment_sentiment(&self, text: &str) -> AnalysisResult<SentimentResult> {
        self.analyze_with_cache_status(text).await.map(|(r, _)| r)
    }

    pub async fn analyze_with_cache_status(&self, text: &str) -> AnalysisResult<(SentimentResult, CacheStatus)> {
        if text.trim().is_empty() {
            return Ok((SentimentResult::empty(), CacheStatus::Miss));
        }
        if let Some(hit) = self.cache.get(text) {
            return Ok((hit, CacheStatus::Hit));
        }
        let lex = self.snapshot().await;
        let r = classify_uncached(&self.pair, &self.cache, &lex, text).await?;
        Ok((r, CacheStatus::Miss))
    }

    /// Per-text results in input order, fanned out over at most
    /// `max_concurrency` tasks.
    pub async fn classify_texts(
        &self,
        texts: &[String],
        lex: &ScoringSnapshot,
    ) -> Vec<AnalysisResult<SentimentResult>> {
        let sem = Arc::new(Semaphore::new(self.max_concurrency));
        let mut set = JoinSet::new();

        for (i, text) in texts.iter().cloned().enumerate() {
            let (pair, cache, lex, sem) = (
                self.pair.clone(),
                self.cache.clone(),
                lex.clone(),
                sem.clone(),
            );
            set.spawn(async move {
                let _permit = sem.acquire_owned().await;
                (i, classify_cached(&pair, &cache, &lex, &text).await)
            });
        }

        let mut out: Vec<Option<AnalysisResult<SentimentResult>>> = (0..texts.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((i, r)) => out[i] = Some(r),
                Err(e) => warn!(target: "sentiment::engine", error = %e, "classification task aborted"),
            }
        }
        out.into_iter()
            .map(|r| r.unwrap_or_else(|| Err(AnalysisError::Fallback("classification task aborted".into()))))
            .collect()
    }

    /// Classify every comment (none dropped) and aggregate. Unrecoverable
    /// items become neutral placeholders counted in `failed`.
    pub async fn classify_batch(&self, comments: &[String]) -> AggregatedSummary {
        let lex = self.snapshot().await;
        self.classify_batch_with(comments, &lex).await
    }

    async fn classify_batch_with(&self, comments: &[String], lex: &ScoringSnapshot) -> AggregatedSummary {
        let started = Instant::now();
        let results = self.classify_texts(comments, lex).await;

        let items: Vec<ClassifiedComment> = comments
            .iter()
            .zip(results)
            .map(|(text, r)| {
                let language = detect_language(text, lex);
                let parts = split_comment(text, lex);
                match r {
                    Ok(r) => ClassifiedComment::new(text.clone(), r, language).with_parts(parts),
                    Err(e) => {
                        warn!(
                            target: "sentiment::engine",
                            id = %anon_hash(text),
                            reason = e.kind(),
                            error = %e,
                            "comment could not be classified; counting as neutral"
                        );
                        ClassifiedComment::failed(text.clone(), language).with_parts(parts)
                    }
                }
            })
            .collect();

        let summary = summarize(&items);
        histogram!(BATCH_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        debug!(
            target: "sentiment::engine",
            total = summary.total,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch classified"
        );
        summary
    }

    /// Order-preserving batch: cache first, then one primary call for all
    /// misses. If that call fails outright, misses are classified one by one.
    pub async fn analyze_batch(&self, texts: &[String]) -> Vec<SentimentResult> {
        let lex = self.snapshot().await;
        let mut out: Vec<Option<SentimentResult>> = vec![None; texts.len()];
        let mut miss_idx = Vec::new();
        let mut misses = Vec::new();

        for (i, t) in texts.iter().enumerate() {
            if t.trim().is_empty() {
                out[i] = Some(SentimentResult::empty());
            } else if let Some(hit) = self.cache.get(t) {
                out[i] = Some(hit);
            } else {
                miss_idx.push(i);
                misses.push(t.clone());
            }
        }

        if !misses.is_empty() {
            let fresh = match self.pair.analyze_batch(&misses, &lex).await {
                Ok(rs) => {
                    for (t, r) in misses.iter().zip(&rs) {
                        self.cache.put_if_generation(t, r.clone(), lex.generation());
                    }
                    rs
                }
                Err(e) => {
                    warn!(target: "sentiment::engine", items = misses.len(), error = %e, "batch analysis failed; retrying per item");
                    self.classify_texts(&misses, &lex)
                        .await
                        .into_iter()
                        .map(|r| r.unwrap_or_else(|_| SentimentResult::placeholder()))
                        .collect()
                }
            };
            for (i, r) in miss_idx.into_iter().zip(fresh) {
                out[i] = Some(r);
            }
        }

        out.into_iter()
            .map(|r| r.unwrap_or_else(SentimentResult::placeholder))
            .collect()
    }

    /// Qualitative report over an event's comments; blank comments are dropped
    /// before classification.
    pub async fn generate_qualitative_report(&self, event_id: &str) -> Result<QualitativeReport> {
        let comments: Vec<String> = self
            .feedback
            .comments(event_id)
            .await
            .with_context(|| format!("loading comments for event {event_id}"))?
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect();

        let summary = self.classify_batch(&comments).await;
        info!(
            target: "sentiment::engine",
            event_id,
            total = summary.total,
            positive = summary.counts.positive,
            neutral = summary.counts.neutral,
            negative = summary.counts.negative,
            failed = summary.failed,
            "qualitative report generated"
        );
        Ok(QualitativeReport {
            event_id: event_id.to_string(),
            summary,
        })
    }

    /// Ratings of the event year (or the current UTC year) against the year before.
    pub async fn generate_quantitative_report(&self, event_id: &str) -> Result<QuantitativeReport> {
        let current_year = match self.feedback.event_year(event_id).await? {
            Some(y) => y,
            None => chrono::Utc::now().year(),
        };
        let previous_year = current_year - 1;
        let current = self
            .feedback
            .ratings(event_id, current_year)
            .await
            .with_context(|| format!("loading {current_year} ratings for event {event_id}"))?;
        let previous = self
            .feedback
            .ratings(event_id, previous_year)
            .await
            .with_context(|| format!("loading {previous_year} ratings for event {event_id}"))?;

        let comparison = compute_quantitative_stats(&current, &previous, current_year, previous_year);
        info!(
            target: "sentiment::engine",
            event_id,
            current_year,
            current_count = comparison.current_year.response_count,
            previous_count = comparison.previous_year.response_count,
            "quantitative report generated"
        );
        Ok(QuantitativeReport {
            event_id: event_id.to_string(),
            comparison,
        })
    }

    /// Sentiment over the free-text answers of submitted forms.
    pub async fn analyze_responses(
        &self,
        responses: &[FormResponse],
        types: &QuestionTypeMap,
    ) -> SentimentBreakdown {
        let (answers, skipped) = extract_free_text(responses, types);
        let texts: Vec<String> = answers.iter().map(|a| a.text.clone()).collect();
        let lex = self.snapshot().await;
        let results: Vec<SentimentResult> = self
            .classify_texts(&texts, &lex)
            .await
            .into_iter()
            .map(|r| r.unwrap_or_else(|_| SentimentResult::placeholder()))
            .collect();
        SentimentBreakdown::from_results(&answers, &results, skipped)
    }

    pub async fn lexicon_entries(&self) -> Result<Vec<LexiconEntry>> {
        self.lexicon.fetch_all().await
    }

    pub async fn lexicon_contains(&self, word: &str) -> Result<bool> {
        self.lexicon.exists(word).await
    }

    /// Store a new entry and drop cached results scored without it.
    pub async fn add_lexicon_entry(&self, entry: LexiconEntry) -> Result<()> {
        let word = entry.key();
        self.lexicon.add(entry).await?;
        self.cache.clear();
        info!(target: "sentiment::lexicon", entry = %word, "lexicon entry added; result cache cleared");
        Ok(())
    }
}

async fn classify_cached(
    pair: &AnalyzerPair,
    cache: &ResultCache,
    lex: &ScoringSnapshot,
    text: &str,
) -> AnalysisResult<SentimentResult> {
    if text.trim().is_empty() {
        return Ok(SentimentResult::empty());
    }
    if let Some(hit) = cache.get(text) {
        return Ok(hit);
    }
    classify_uncached(pair, cache, lex, text).await
}

async fn classify_uncached(
    pair: &AnalyzerPair,
    cache: &ResultCache,
    lex: &ScoringSnapshot,
    text: &str,
) -> AnalysisResult<SentimentResult> {
    let r = pair.analyze(text, lex).await?;
    cache.put_if_generation(text, r.clone(), lex.generation());
    debug!(
        target: "sentiment::analyze",
        id = %anon_hash(text),
        sentiment = r.sentiment.as_str(),
        method = r.method.as_str(),
        "comment classified"
    );
    Ok(r)
}
