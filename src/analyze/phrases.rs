//! Phrase matcher: whole-phrase signals checked before word-level scoring.
//!
//! Rules come from the built-in tables of both languages plus custom lexicon
//! entries flagged as phrases. They are ordered longest first so a short
//! phrase never masks a more specific one that contains it
//! ("not very good" is tried before "very good").

use super::language::packs;
use super::tokenize::phrase_spans;
use crate::lexicon::LexiconEntry;
use crate::sentiment::Sentiment;

/// Confidence assigned to a phrase short-circuit.
pub const PHRASE_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct PhraseRule {
    /// Normalized (lower-cased, single-spaced) phrase.
    pub phrase: String,
    pub sentiment: Sentiment,
    pub language: String,
    pub custom: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhraseMatch {
    pub phrase: String,
    pub sentiment: Sentiment,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PhraseTable {
    rules: Vec<PhraseRule>,
}

impl PhraseTable {
    /// Built-in phrases only.
    pub fn builtin() -> Self {
        Self::with_custom(&[])
    }

    /// Custom phrase entries first (they win over a built-in with the same
    /// text), then the built-in tables; finally a stable longest-first sort.
    pub fn with_custom(custom: &[LexiconEntry]) -> Self {
        let mut rules: Vec<PhraseRule> = Vec::new();

        for e in custom.iter().filter(|e| e.is_phrase) {
            let phrase = super::tokenize::normalize(&e.word);
            if phrase.is_empty() || rules.iter().any(|r| r.phrase == phrase) {
                continue;
            }
            rules.push(PhraseRule {
                phrase,
                sentiment: e.sentiment,
                language: e.language.clone(),
                custom: true,
            });
        }

        for (code, pack) in &packs().languages {
            let lists = [
                (Sentiment::Negative, &pack.phrases.negative),
                (Sentiment::Positive, &pack.phrases.positive),
                (Sentiment::Neutral, &pack.phrases.neutral),
            ];
            for (sentiment, list) in lists {
                for p in list {
                    if rules.iter().any(|r| &r.phrase == p) {
                        continue;
                    }
                    rules.push(PhraseRule {
                        phrase: p.clone(),
                        sentiment,
                        language: code.clone(),
                        custom: false,
                    });
                }
            }
        }

        rules.sort_by_key(|r| std::cmp::Reverse(r.phrase.chars().count()));
        Self { rules }
    }

    /// First (longest) phrase found in `normalized`.
    pub fn match_phrase(&self, normalized: &str) -> Option<PhraseMatch> {
        self.rules
            .iter()
            .find(|r| !phrase_spans(normalized, &r.phrase).is_empty())
            .map(|r| PhraseMatch {
                phrase: r.phrase.clone(),
                sentiment: r.sentiment,
                confidence: PHRASE_CONFIDENCE,
            })
    }

    /// Every non-overlapping phrase occurrence, longest phrases claiming
    /// their span first. Used by analyzers that tally phrases instead of
    /// short-circuiting.
    pub fn all_matches(&self, normalized: &str) -> Vec<&PhraseRule> {
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut out = Vec::new();
        for rule in &self.rules {
            for (start, end) in phrase_spans(normalized, &rule.phrase) {
                let overlaps = claimed.iter().any(|&(s, e)| start < e && s < end);
                if !overlaps {
                    claimed.push((start, end));
                    out.push(rule);
                }
            }
        }
        out
    }

    pub fn rules(&self) -> &[PhraseRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
