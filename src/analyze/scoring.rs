//! Context-aware lexicon scorer: the deterministic, in-process fallback.
//!
//! Per token: lexicon weight -> negation (2-token lookback) -> intensifier or
//! diminisher (1-token lookback). Emoji are counted on the raw text. The sum
//! is clamped to `[-SCORE_CAP, SCORE_CAP]`, divided by `SCORE_DIVISOR` and
//! clamped to `[-1, 1]`.

use serde::Serialize;

use super::language::packs;
use super::phrases::PhraseMatch;
use super::tokenize::{normalize, tokenize_normalized};
use super::Analyzer;
use crate::error::{AnalysisError, AnalysisResult};
use crate::lexicon::LexiconSnapshot;
use crate::sentiment::{AnalysisMethod, Sentiment, SentimentResult};

pub const NEGATION_WINDOW: usize = 2;
pub const NEGATED_POSITIVE: f32 = -0.5;
pub const NEGATED_NEGATIVE: f32 = 0.5;
pub const INTENSIFIER_FACTOR: f32 = 1.5;
pub const DIMINISHER_FACTOR: f32 = 0.5;
pub const EMOJI_UNIT: f32 = 0.5;
pub const SCORE_CAP: f32 = 5.0;
pub const SCORE_DIVISOR: f32 = 3.0;
pub const CONFIDENCE_FLOOR: f32 = 0.3;

/// Adjust `base` for token `i` given its left context.
///
/// Negation does not mirror the magnitude: "not bad" lands at a fixed mild
/// positive, "not good" at a fixed mild negative.
pub fn contextual_weight(tokens: &[String], i: usize, base: f32) -> f32 {
    let p = packs();
    let negated = (1..=NEGATION_WINDOW)
        .filter_map(|k| i.checked_sub(k))
        .any(|j| p.is_negation(&tokens[j]));

    let mut w = base;
    if negated {
        w = if base > 0.0 {
            NEGATED_POSITIVE
        } else if base < 0.0 {
            NEGATED_NEGATIVE
        } else {
            0.0
        };
    }

    if let Some(prev) = i.checked_sub(1).map(|j| tokens[j].as_str()) {
        if p.is_intensifier(prev) {
            w *= INTENSIFIER_FACTOR;
        } else if p.is_diminisher(prev) {
            w *= DIMINISHER_FACTOR;
        }
    }
    w
}

/// Net emoji/emoticon score over the raw text, one unit per occurrence.
/// Matching is case-insensitive so the score only depends on the cache key
/// (`:D` and `:d` count the same).
pub fn emoji_score(raw: &str) -> f32 {
    let table = &packs().emoji;
    let folded = raw.to_lowercase();
    let count = |glyphs: &[String]| -> usize {
        glyphs
            .iter()
            .map(|g| folded.matches(g.to_lowercase().as_str()).count())
            .sum()
    };
    (count(&table.positive) as f32 - count(&table.negative) as f32) * EMOJI_UNIT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenContribution {
    pub token: String,
    pub base: f32,
    pub weight: f32,
}

/// Diagnostics for one scored text.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ScoreBreakdown {
    /// Token sum plus emoji, before clamping.
    pub raw: f32,
    /// Final score in [-1, 1].
    pub normalized: f32,
    pub contributions: Vec<TokenContribution>,
    pub emoji: f32,
}

impl ScoreBreakdown {
    pub fn sentiment(&self) -> Sentiment {
        Sentiment::from_score(self.normalized)
    }

    pub fn confidence(&self) -> f32 {
        (self.normalized.abs() + CONFIDENCE_FLOOR).min(1.0)
    }

    /// Number of tokens that moved the score.
    pub fn hits(&self) -> usize {
        self.contributions.len()
    }
}

/// Word-level score of `text` (no phrase short-circuit).
pub fn score(text: &str, lexicon: &LexiconSnapshot) -> ScoreBreakdown {
    let tokens = tokenize_normalized(&normalize(text));
    let mut sum = 0.0f32;
    let mut contributions = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        let Some(base) = lexicon.weight(tok) else {
            continue;
        };
        let weight = contextual_weight(&tokens, i, base);
        if weight != 0.0 {
            sum += weight;
            contributions.push(TokenContribution {
                token: tok.clone(),
                base,
                weight,
            });
        }
    }

    let emoji = emoji_score(text);
    let raw = sum + emoji;
    let normalized = (raw.clamp(-SCORE_CAP, SCORE_CAP) / SCORE_DIVISOR).clamp(-1.0, 1.0);

    ScoreBreakdown {
        raw,
        normalized,
        contributions,
        emoji,
    }
}

/// Outcome of the fallback pipeline, before it is wrapped in a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Phrase(PhraseMatch),
    Scored(ScoreBreakdown),
}

/// Phrase table first; word-level scoring only when no phrase matched.
pub fn classify(text: &str, lexicon: &LexiconSnapshot) -> Classification {
    match lexicon.phrases().match_phrase(&normalize(text)) {
        Some(m) => Classification::Phrase(m),
        None => Classification::Scored(score(text, lexicon)),
    }
}

/// Deterministic lexicon analyzer; always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAnalyzer;

impl FallbackAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core, shared by the async trait impl and the batch path.
    pub fn classify(&self, text: &str, lexicon: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
        if text.trim().is_empty() {
            return Ok(SentimentResult::empty());
        }
        let result = match classify(text, lexicon) {
            Classification::Phrase(m) => {
                SentimentResult::new(m.sentiment, m.confidence, AnalysisMethod::Fallback)
            }
            Classification::Scored(b) => {
                if !b.normalized.is_finite() {
                    return Err(AnalysisError::Fallback(format!(
                        "non-finite score {} (lexicon corrupt?)",
                        b.raw
                    )));
                }
                SentimentResult::new(b.sentiment(), b.confidence(), AnalysisMethod::Fallback)
            }
        };
        Ok(result)
    }
}

#[async_trait::async_trait]
impl Analyzer for FallbackAnalyzer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn analyze(&self, text: &str, lexicon: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
        self.classify(text, lexicon)
    }

    async fn analyze_batch(
        &self,
        texts: &[String],
        lexicon: &LexiconSnapshot,
    ) -> AnalysisResult<Vec<SentimentResult>> {
        texts.iter().map(|t| self.classify(t, lexicon)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> LexiconSnapshot {
        LexiconSnapshot::builtin()
    }

    fn label(text: &str) -> SentimentResult {
        FallbackAnalyzer.classify(text, &lex()).unwrap()
    }

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn negation_is_asymmetric() {
        let t = toks("not good");
        assert_eq!(contextual_weight(&t, 1, 1.0), NEGATED_POSITIVE);
        let t = toks("not bad");
        assert_eq!(contextual_weight(&t, 1, -1.0), NEGATED_NEGATIVE);
        // two tokens back still counts
        let t = toks("hindi masyadong maganda");
        assert_eq!(contextual_weight(&t, 2, 1.0), NEGATED_POSITIVE);
        // three tokens back does not
        let t = toks("not at all good");
        assert_eq!(contextual_weight(&t, 3, 1.0), 1.0);
    }

    #[test]
    fn intensifier_applies_after_negation() {
        let t = toks("not very good");
        assert!((contextual_weight(&t, 2, 1.0) - NEGATED_POSITIVE * INTENSIFIER_FACTOR).abs() < 1e-6);
        let t = toks("sobrang saya");
        assert!((contextual_weight(&t, 1, 1.0) - 1.5).abs() < 1e-6);
        let t = toks("medyo pangit");
        assert!((contextual_weight(&t, 1, -1.0) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn emoji_count_every_occurrence() {
        assert_eq!(emoji_score("great 😊😊"), 1.0);
        assert_eq!(emoji_score("meh :("), -0.5);
        assert_eq!(emoji_score("no glyphs here"), 0.0);
    }

    #[test]
    fn emoticons_ignore_case() {
        assert_eq!(emoji_score("OK :D"), EMOJI_UNIT);
        assert_eq!(emoji_score("ok :d"), EMOJI_UNIT);
        assert_eq!(label("OK :D"), label("ok :d"));
    }

    #[test]
    fn good_and_not_good() {
        assert_eq!(label("good").sentiment, Sentiment::Positive);
        assert_ne!(label("not good").sentiment, Sentiment::Positive);
        assert_eq!(label("The event was terrible").sentiment, Sentiment::Negative);
        assert_eq!(label("not bad").sentiment, Sentiment::Positive);
    }

    #[test]
    fn intensifier_raises_confidence() {
        assert!(label("very good").confidence >= label("good").confidence);
        assert!(label("sobrang galing").confidence >= label("galing").confidence);
    }

    #[test]
    fn phrase_beats_word_level_signal() {
        let r = label("Hindi maganda ang venue");
        assert_eq!(r.sentiment, Sentiment::Negative);
        assert!((r.confidence - 0.9).abs() < 1e-6);
        assert_eq!(label("Okay lang ang event").sentiment, Sentiment::Neutral);
    }

    #[test]
    fn score_is_clamped() {
        let long = "excellent ".repeat(20);
        let b = score(&long, &lex());
        assert!(b.raw > SCORE_CAP);
        assert_eq!(b.normalized, 1.0);
        assert_eq!(b.confidence(), 1.0);
    }

    #[test]
    fn custom_lexicon_changes_result() {
        let custom = LexiconSnapshot::from_entries(vec![crate::lexicon::LexiconEntry::new(
            "lit",
            Sentiment::Positive,
            1.5,
            "en",
        )]);
        assert_eq!(label("lit").sentiment, Sentiment::Neutral);
        let r = FallbackAnalyzer.classify("lit", &custom).unwrap();
        assert_eq!(r.sentiment, Sentiment::Positive);
    }

    #[test]
    fn blank_text_is_empty_result() {
        assert_eq!(label("   "), SentimentResult::empty());
    }

    #[test]
    fn unknown_words_are_neutral_with_floor_confidence() {
        let r = label("the venue had chairs");
        assert_eq!(r.sentiment, Sentiment::Neutral);
        assert!((r.confidence - CONFIDENCE_FLOOR).abs() < 1e-6);
        assert_eq!(r.method, AnalysisMethod::Fallback);
    }
}
