//! Enhanced lexicon analyzer, the default in-process primary.
//!
//! Unlike the fallback it tallies every phrase instead of short-circuiting,
//! looks at per-sentence balance to spot mixed feedback, and leans neutral
//! when a comment reads as constructive criticism.
//!
//! The same per-sentence tally backs [`split_comment`], which breaks a mixed
//! comment into its positive, negative and neutral sentences for reports.

use serde::{Deserialize, Serialize};

use super::language::packs;
use super::scoring::{contextual_weight, emoji_score};
use super::tokenize::{contains_phrase, normalize, split_sentences, tokenize_normalized};
use super::Analyzer;
use crate::error::{AnalysisError, AnalysisResult};
use crate::lexicon::LexiconSnapshot;
use crate::sentiment::{AnalysisMethod, Sentiment, SentimentResult};

pub const PHRASE_HIT: f32 = 2.5;
const SENTENCE_BALANCE: f32 = 0.5;
/// Sentence balance beyond which [`split_comment`] files a sentence as
/// positive or negative.
pub const PART_BALANCE: f32 = 0.3;

/// Per-sentence tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentenceTally {
    pub positive: f32,
    pub negative: f32,
    pub constructive: bool,
}

impl SentenceTally {
    pub fn balance(&self) -> f32 {
        self.positive - self.negative
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnhancedScore {
    pub positive: f32,
    pub negative: f32,
    pub neutral_indicators: usize,
    pub constructive_sentences: usize,
    pub positive_sentences: usize,
    pub negative_sentences: usize,
}

impl EnhancedScore {
    pub fn total(&self) -> f32 {
        self.positive - self.negative
    }

    pub fn is_mixed(&self) -> bool {
        (self.positive_sentences > 0 && self.negative_sentences > 0)
            || self.constructive_sentences > 0
    }

    /// Final label and confidence.
    pub fn decide(&self) -> (Sentiment, f32) {
        let total = self.total();
        let ratio = total.abs() / (self.positive + self.negative).max(1.0);

        if self.neutral_indicators >= 1 && self.positive < 1.5 && self.negative < 1.0 {
            (Sentiment::Neutral, 0.70)
        } else if self.is_mixed() && (self.constructive_sentences >= 2 || self.negative >= 1.0) {
            (Sentiment::Neutral, 0.75)
        } else if self.is_mixed() && ratio < 0.6 {
            (Sentiment::Neutral, 0.70)
        } else if total >= 1.0 {
            (Sentiment::Positive, (0.5 + total / 5.0).min(0.95))
        } else if total <= -1.0 {
            (Sentiment::Negative, (0.5 + total.abs() / 5.0).min(0.95))
        } else {
            (Sentiment::Neutral, 0.65)
        }
    }
}

fn add_signed(pos: &mut f32, neg: &mut f32, w: f32) {
    if w > 0.0 {
        *pos += w;
    } else {
        *neg += w.abs();
    }
}

fn tally_sentence(sentence: &str, lexicon: &LexiconSnapshot) -> SentenceTally {
    let norm = normalize(sentence);
    let tokens = tokenize_normalized(&norm);
    let mut t = SentenceTally {
        constructive: packs()
            .constructive_markers()
            .any(|m| contains_phrase(&norm, m)),
        ..Default::default()
    };
    for (i, tok) in tokens.iter().enumerate() {
        if let Some(base) = lexicon.weight(tok) {
            let w = contextual_weight(&tokens, i, base);
            add_signed(&mut t.positive, &mut t.negative, w);
        }
    }
    t
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// A comment regrouped by sentence sentiment. Each part is its sentences
/// joined with ". " and closed with "."; empty when no sentence qualified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentParts {
    pub positive_part: String,
    pub negative_part: String,
    pub neutral_part: String,
    pub sentence_counts: SentenceCounts,
}

fn join_part(sentences: &[&str]) -> String {
    if sentences.is_empty() {
        String::new()
    } else {
        format!("{}.", sentences.join(". "))
    }
}

/// Split `text` on sentence punctuation and group the sentences by their
/// word-level balance (above [`PART_BALANCE`] positive, below its negation
/// negative, otherwise neutral). Order within a group follows the text.
pub fn split_comment(text: &str, lexicon: &LexiconSnapshot) -> CommentParts {
    let (mut pos, mut neg, mut neu) = (Vec::new(), Vec::new(), Vec::new());
    for sentence in split_sentences(text) {
        let balance = tally_sentence(sentence, lexicon).balance();
        if balance > PART_BALANCE {
            pos.push(sentence);
        } else if balance < -PART_BALANCE {
            neg.push(sentence);
        } else {
            neu.push(sentence);
        }
    }
    CommentParts {
        positive_part: join_part(&pos),
        negative_part: join_part(&neg),
        neutral_part: join_part(&neu),
        sentence_counts: SentenceCounts {
            positive: pos.len(),
            negative: neg.len(),
            neutral: neu.len(),
        },
    }
}

/// Full tally for `text`.
pub fn enhanced_score(text: &str, lexicon: &LexiconSnapshot) -> EnhancedScore {
    let p = packs();
    let norm = normalize(text);
    let tokens = tokenize_normalized(&norm);
    let mut s = EnhancedScore::default();

    for rule in lexicon.phrases().all_matches(&norm) {
        match rule.sentiment {
            Sentiment::Positive => s.positive += PHRASE_HIT,
            Sentiment::Negative => s.negative += PHRASE_HIT,
            Sentiment::Neutral => s.neutral_indicators += 1,
        }
    }
    s.neutral_indicators += tokens.iter().filter(|t| p.is_neutral_word(t)).count();

    for sentence in split_sentences(text) {
        let t = tally_sentence(sentence, lexicon);
        if t.constructive {
            s.constructive_sentences += 1;
        }
        if t.balance() > SENTENCE_BALANCE {
            s.positive_sentences += 1;
        } else if t.balance() < -SENTENCE_BALANCE {
            s.negative_sentences += 1;
        }
    }

    for (i, tok) in tokens.iter().enumerate() {
        if let Some(base) = lexicon.weight(tok) {
            let w = contextual_weight(&tokens, i, base);
            add_signed(&mut s.positive, &mut s.negative, w);
        }
    }

    let emoji = emoji_score(text);
    add_signed(&mut s.positive, &mut s.negative, emoji);
    s
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancedAnalyzer;

impl EnhancedAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str, lexicon: &LexiconSnapshot) -> AnalysisResult<SentimentResult> {
        if text.trim().is_empty() {
            return Ok(SentimentResult::empty());
        }
        let s = enhanced_score(text, lexicon);
        if !s.total().is_finite() {
            return Err(AnalysisError::Primary("non-finite tally".into()));
        }
        let (sentiment, confidence) = s.decide();
        Ok(SentimentResult::new(sentiment, confidence, AnalysisMethod::Primary))
    }
}

#[async_trait::async_trait]
impl Analyzer for EnhancedAnalyzer {
    fn name(&self) -> &'static str {
        "enhanced"
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
