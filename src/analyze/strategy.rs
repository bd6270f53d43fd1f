//! Primary/fallback selection.
//!
//! The primary is raced against a timeout; its future is dropped when the
//! timer wins, so nothing it produces afterwards can reach shared state. The
//! fallback only runs when the primary did not deliver a valid result.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use super::scoring::FallbackAnalyzer;
use super::tokenize::anon_hash;
use super::DynAnalyzer;
use crate::error::{AnalysisError, AnalysisResult};
use crate::lexicon::LexiconSnapshot;
use crate::metrics::{ANALYSIS_FAILURES, FALLBACK_USED, PRIMARY_USED};
use crate::sentiment::{AnalysisMethod, SentimentResult};

pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AnalyzerPair {
    primary: Option<DynAnalyzer>,
    fallback: DynAnalyzer,
    timeout: Duration,
}

impl std::fmt::Debug for AnalyzerPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerPair")
            .field("primary", &self.primary.as_ref().map(|p| p.name()))
            .field("fallback", &self.fallback.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AnalyzerPair {
    pub fn new(primary: DynAnalyzer, fallback: DynAnalyzer, timeout: Duration) -> Self {
        Self {
            primary: Some(primary),
            fallback,
            timeout,
        }
    }

    /// Primary with the built-in lexicon scorer as fallback.
    pub fn with_default_fallback(primary: DynAnalyzer, timeout: Duration) -> Self {
        Self::new(primary, Arc::new(FallbackAnalyzer::new()), timeout)
    }

    /// No primary: every call goes straight to the fallback.
    pub fn fallback_only(fallback: DynAnalyzer) -> Self {
        Self {
            primary: None,
            fallback,
            timeout: DEFAULT_PRIMARY_TIMEOUT,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn primary_name(&self) -> Option<&'static str> {
        self.primary.as_ref().map(|p| p.name())
    }

    pub async fn analyze(&self, text: &str, lexicon: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
        if text.trim().is_empty() {
            return Ok(SentimentResult::empty());
        }

        let primary_err = match &self.primary {
            Some(primary) => {
                let outcome = tokio::time::timeout(self.timeout, primary.analyze(text, lexicon)).await;
                match outcome {
                    Ok(Ok(r)) if r.is_valid() => {
                        counter!(PRIMARY_USED).increment(1);
                        return Ok(r.with_method(AnalysisMethod::Primary));
                    }
                    Ok(Ok(r)) => AnalysisError::InvalidOutput(format!(
                        "confidence {} outside [0, 1]",
                        r.confidence
                    )),
                    Ok(Err(e)) => e,
                    Err(_) => AnalysisError::Timeout(self.timeout),
                }
            }
            None => AnalysisError::Primary("disabled".into()),
        };

        if self.primary.is_some() {
            counter!(FALLBACK_USED, "reason" => primary_err.kind()).increment(1);
            warn!(
                target: "sentiment::analyze",
                id = %anon_hash(text),
                reason = primary_err.kind(),
                error = %primary_err,
                "primary analyzer lost; using fallback"
            );
        }

        match self.fallback.analyze(text, lexicon).await {
            Ok(r) if r.is_valid() => Ok(r.with_method(AnalysisMethod::Fallback)),
            Ok(r) => Err(self.unrecoverable(
                &primary_err,
                format!("confidence {} outside [0, 1]", r.confidence),
            )),
            Err(e) => Err(self.unrecoverable(&primary_err, e.to_string())),
        }
    }

    /// Order-preserving batch. Blank texts become `empty_text` results without
    /// reaching either analyzer; the rest go to the primary in one call.
    pub async fn analyze_batch(
        &self,
        texts: &[String],
        lexicon: &LexiconSnapshot,
    ) -> AnalysisResult<Vec<SentimentResult>> {
        let mut out: Vec<Option<SentimentResult>> = vec![None; texts.len()];
        let mut pending_idx = Vec::new();
        let mut pending = Vec::new();
        for (i, t) in texts.iter().enumerate() {
            if t.trim().is_empty() {
                out[i] = Some(SentimentResult::empty());
            } else {
                pending_idx.push(i);
                pending.push(t.clone());
            }
        }
        if pending.is_empty() {
            return Ok(out.into_iter().flatten().collect());
        }

        let primary_err = match &self.primary {
            Some(primary) => {
                let outcome =
                    tokio::time::timeout(self.timeout, primary.analyze_batch(&pending, lexicon)).await;
                match outcome {
                    Ok(Ok(rs)) => match validate_batch(rs, pending.len()) {
                        Ok(rs) => {
                            counter!(PRIMARY_USED).increment(rs.len() as u64);
                            return Ok(merge(out, &pending_idx, rs, AnalysisMethod::Primary));
                        }
                        Err(e) => e,
                    },
                    Ok(Err(e)) => e,
                    Err(_) => AnalysisError::Timeout(self.timeout),
                }
            }
            None => AnalysisError::Primary("disabled".into()),
        };

        if self.primary.is_some() {
            counter!(FALLBACK_USED, "reason" => primary_err.kind()).increment(pending.len() as u64);
            warn!(
                target: "sentiment::analyze",
                items = pending.len(),
                reason = primary_err.kind(),
                error = %primary_err,
                "primary analyzer lost batch; using fallback"
            );
        }

        let rs = self
            .fallback
            .analyze_batch(&pending, lexicon)
            .await
            .and_then(|rs| validate_batch(rs, pending.len()))
            .map_err(|e| self.unrecoverable(&primary_err, e.to_string()))?;
        debug!(target: "sentiment::analyze", items = rs.len(), "fallback batch done");
        Ok(merge(out, &pending_idx, rs, AnalysisMethod::Fallback))
    }

    fn unrecoverable(&self, primary: &AnalysisError, fallback: String) -> AnalysisError {
        counter!(ANALYSIS_FAILURES).increment(1);
        AnalysisError::Unrecoverable {
            primary: primary.to_string(),
            fallback,
        }
    }
}

fn validate_batch(rs: Vec<SentimentResult>, expected: usize) -> AnalysisResult<Vec<SentimentResult>> {
    if rs.len() != expected {
        return Err(AnalysisError::InvalidOutput(format!(
            "expected {expected} results, got {}",
            rs.len()
        )));
    }
    if let Some(bad) = rs.iter().find(|r| !r.is_valid()) {
        return Err(AnalysisError::InvalidOutput(format!(
            "confidence {} outside [0, 1]",
            bad.confidence
        )));
    }
    Ok(rs)
}

fn merge(
    mut out: Vec<Option<SentimentResult>>,
    idx: &[usize],
    rs: Vec<SentimentResult>,
    method: AnalysisMethod,
) -> Vec<SentimentResult> {
    for (&i, r) in idx.iter().zip(rs) {
        out[i] = Some(if r.method == AnalysisMethod::EmptyText {
            r
        } else {
            r.with_method(method)
        });
    }
    out.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::Analyzer;
    use crate::sentiment::Sentiment;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(SentimentResult);

    #[async_trait::async_trait]
    impl Analyzer for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn analyze(&self, _t: &str, _l: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    #[async_trait::async_trait]
    impl Analyzer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn analyze(&self, _t: &str, _l: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
            Err(AnalysisError::Primary("exploded".into()))
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait::async_trait]
    impl Analyzer for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }
        async fn analyze(&self, t: &str, l: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
            self.0.fetch_add(1, Ordering::SeqCst);
            FallbackAnalyzer.analyze(t, l).await
        }
    }

    fn neg(conf: f32) -> SentimentResult {
        SentimentResult::new(Sentiment::Negative, conf, AnalysisMethod::Fallback)
    }

    #[tokio::test]
    async fn valid_primary_wins_and_fallback_is_not_called() {
        let fallback = Arc::new(Counting::default());
        let pair = AnalyzerPair::new(Arc::new(Fixed(neg(0.6))), fallback.clone(), DEFAULT_PRIMARY_TIMEOUT);
        let r = pair.analyze("good", &LexiconSnapshot::builtin()).await.unwrap();
        assert_eq!(r.sentiment, Sentiment::Negative);
        assert_eq!(r.method, AnalysisMethod::Primary);
        assert_eq!(fallback.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_primary_falls_back_silently() {
        let pair = AnalyzerPair::with_default_fallback(Arc::new(Broken), DEFAULT_PRIMARY_TIMEOUT);
        let r = pair.analyze("good", &LexiconSnapshot::builtin()).await.unwrap();
        assert_eq!(r.sentiment, Sentiment::Positive);
        assert_eq!(r.method, AnalysisMethod::Fallback);
    }

    #[tokio::test]
    async fn invalid_primary_output_is_treated_as_failure() {
        let pair = AnalyzerPair::with_default_fallback(Arc::new(Fixed(neg(1.5))), DEFAULT_PRIMARY_TIMEOUT);
        let r = pair.analyze("good", &LexiconSnapshot::builtin()).await.unwrap();
        assert_eq!(r.method, AnalysisMethod::Fallback);
        assert_eq!(r.sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn both_failing_is_unrecoverable() {
        let pair = AnalyzerPair::new(Arc::new(Broken), Arc::new(Broken), DEFAULT_PRIMARY_TIMEOUT);
        let err = pair.analyze("good", &LexiconSnapshot::builtin()).await.unwrap_err();
        assert_eq!(err.kind(), "unrecoverable");
    }

    #[tokio::test]
    async fn blank_text_skips_both_analyzers() {
        let primary = Arc::new(Counting::default());
        let fallback = Arc::new(Counting::default());
        let pair = AnalyzerPair::new(primary.clone(), fallback.clone(), DEFAULT_PRIMARY_TIMEOUT);
        let r = pair.analyze(" \t ", &LexiconSnapshot::builtin()).await.unwrap();
        assert_eq!(r, SentimentResult::empty());
        assert_eq!(primary.0.load(Ordering::SeqCst) + fallback.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_primary_runs_fallback() {
        let pair = AnalyzerPair::fallback_only(Arc::new(FallbackAnalyzer::new()));
        assert!(pair.primary_name().is_none());
        let r = pair.analyze("terrible", &LexiconSnapshot::builtin()).await.unwrap();
        assert_eq!(r.sentiment, Sentiment::Negative);
        assert_eq!(r.method, AnalysisMethod::Fallback);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_blank_slots() {
        let pair = AnalyzerPair::with_default_fallback(Arc::new(Broken), DEFAULT_PRIMARY_TIMEOUT);
        let texts: Vec<String> = ["good", "", "terrible"].iter().map(|s| s.to_string()).collect();
        let rs = pair.analyze_batch(&texts, &LexiconSnapshot::builtin()).await.unwrap();
        assert_eq!(rs.len(), 3);
        assert_eq!(rs[0].sentiment, Sentiment::Positive);
        assert_eq!(rs[1].method, AnalysisMethod::EmptyText);
        assert_eq!(rs[2].sentiment, Sentiment::Negative);
        assert!(rs.iter().filter(|r| r.method != AnalysisMethod::EmptyText).all(|r| r.method == AnalysisMethod::Fallback));
    }

    #[test]
    fn short_batches_are_rejected() {
        let err = validate_batch(vec![neg(0.5)], 2).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidOutput(_)));
    }
}
