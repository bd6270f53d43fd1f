//! Sentiment labels and per-comment classification results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-way sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Label for a normalized score `s` in [-1, 1].
    pub fn from_score(s: f32) -> Self {
        if s > 0.1 {
            Sentiment::Positive
        } else if s < -0.1 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// +1 / 0 / -1, used to sign lexicon weights.
    pub fn sign(self) -> f32 {
        match self {
            Sentiment::Positive => 1.0,
            Sentiment::Neutral => 0.0,
            Sentiment::Negative => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Primary,
    Fallback,
    EmptyText,
    /// Neutral stand-in for an item no analyzer could classify.
    Placeholder,
}

impl AnalysisMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMethod::Primary => "primary",
            AnalysisMethod::Fallback => "fallback",
            AnalysisMethod::EmptyText => "empty_text",
            AnalysisMethod::Placeholder => "placeholder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    /// Strength of commitment to `sentiment`, in [0, 1].
    pub confidence: f32,
    pub method: AnalysisMethod,
}

impl SentimentResult {
    pub fn new(sentiment: Sentiment, confidence: f32, method: AnalysisMethod) -> Self {
        Self {
            sentiment,
            confidence,
            method,
        }
    }

    /// Result for blank input: neutral, zero confidence.
    pub fn empty() -> Self {
        Self::new(Sentiment::Neutral, 0.0, AnalysisMethod::EmptyText)
    }

    pub fn placeholder() -> Self {
        Self::new(Sentiment::Neutral, 0.0, AnalysisMethod::Placeholder)
    }

    pub fn with_method(mut self, method: AnalysisMethod) -> Self {
        self.method = method;
        self
    }

    /// Confidence is finite and inside [0, 1].
    pub fn is_valid(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_use_symmetric_dead_zone() {
        assert_eq!(Sentiment::from_score(0.11), Sentiment::Positive);
        assert_eq!(Sentiment::from_score(0.1), Sentiment::Neutral);
        assert_eq!(Sentiment::from_score(-0.1), Sentiment::Neutral);
        assert_eq!(Sentiment::from_score(-0.5), Sentiment::Negative);
    }

    #[test]
    fn validity_rejects_out_of_range_confidence() {
        let mut r = SentimentResult::new(Sentiment::Positive, 0.8, AnalysisMethod::Primary);
        assert!(r.is_valid());
        r.confidence = 1.2;
        assert!(!r.is_valid());
        r.confidence = f32::NAN;
        assert!(!r.is_valid());
    }

    #[test]
    fn serializes_with_lowercase_tags() {
        let r = SentimentResult::empty();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["sentiment"], "neutral");
        assert_eq!(v["method"], "empty_text");
    }
}
