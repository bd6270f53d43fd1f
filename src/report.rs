//! Aggregation of classified comments into a report-ready summary, with the
//! rule-based insight and recommendation text.

use serde::{Deserialize, Serialize};

use crate::analyze::{CommentParts, Language};
use crate::sentiment::{AnalysisMethod, Sentiment, SentimentResult};

pub const NO_DATA_INSIGHT: &str = "No feedback comments available for analysis.";
pub const NO_DATA_RECOMMENDATION: &str =
    "Collect more feedback from participants to enable sentiment analysis.";

/// Confidence above which a classification counts as high-confidence.
pub const HIGH_CONFIDENCE: f32 = 0.7;

/// One comment with its classification, dominant language and sentence
/// split.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedComment {
    pub text: String,
    pub result: SentimentResult,
    pub language: Language,
    pub parts: CommentParts,
}

impl ClassifiedComment {
    pub fn new(text: impl Into<String>, result: SentimentResult, language: Language) -> Self {
        Self {
            text: text.into(),
            result,
            language,
            parts: CommentParts::default(),
        }
    }

    pub fn with_parts(mut self, parts: CommentParts) -> Self {
        self.parts = parts;
        self
    }

    /// Neutral stand-in for a comment no analyzer could classify.
    pub fn failed(text: impl Into<String>, language: Language) -> Self {
        Self::new(text, SentimentResult::placeholder(), language)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    pub fn bump(&mut self, s: Sentiment) {
        match s {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn percentages(&self) -> Percentages {
        let total = self.total();
        if total == 0 {
            return Percentages::default();
        }
        Percentages {
            positive: percent(self.positive, total),
            neutral: percent(self.neutral, total),
            negative: percent(self.negative, total),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentages {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl Percentages {
    pub fn sum(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }
}

/// `count / total * 100`, rounded to one decimal.
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 1000.0 / total as f64).round() / 10.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedComments {
    pub positive: Vec<String>,
    pub neutral: Vec<String>,
    pub negative: Vec<String>,
}

impl CategorizedComments {
    fn push(&mut self, s: Sentiment, text: String) {
        match s {
            Sentiment::Positive => self.positive.push(text),
            Sentiment::Neutral => self.neutral.push(text),
            Sentiment::Negative => self.negative.push(text),
        }
    }
}

/// Per-comment line of a report, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentDetail {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f32,
    pub method: AnalysisMethod,
    pub parts: CommentParts,
}

impl From<&ClassifiedComment> for CommentDetail {
    fn from(c: &ClassifiedComment) -> Self {
        Self {
            text: c.text.clone(),
            sentiment: c.result.sentiment,
            confidence: c.result.confidence,
            method: c.result.method,
            parts: c.parts.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageBreakdown {
    pub en: usize,
    pub other: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSummary {
    pub total: usize,
    pub counts: BucketCounts,
    pub percentages: Percentages,
    pub insights: String,
    pub recommendations: Vec<String>,
    pub categorized_comments: CategorizedComments,
    /// Every comment with its label and sentence split.
    #[serde(default)]
    pub comments: Vec<CommentDetail>,
    pub language_breakdown: LanguageBreakdown,
    /// Items that fell back to a neutral placeholder.
    pub failed: usize,
    /// Share of items with confidence above [`HIGH_CONFIDENCE`], 0..=1.
    pub high_confidence_rate: f64,
}

impl AggregatedSummary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Bucket every item (none dropped) and derive the narrative text.
pub fn summarize(items: &[ClassifiedComment]) -> AggregatedSummary {
    let mut counts = BucketCounts::default();
    let mut categorized = CategorizedComments::default();
    let mut languages = LanguageBreakdown::default();
    let mut failed = 0usize;
    let mut confident = 0usize;

    for item in items {
        let label = item.result.sentiment;
        counts.bump(label);
        categorized.push(label, item.text.clone());
        if item.language.is_secondary() {
            languages.other += 1;
        } else {
            languages.en += 1;
        }
        if item.result.method == AnalysisMethod::Placeholder {
            failed += 1;
        }
        if item.result.confidence > HIGH_CONFIDENCE {
            confident += 1;
        }
    }

    let total = counts.total();
    let percentages = counts.percentages();
    let high_confidence_rate = if total == 0 {
        0.0
    } else {
        confident as f64 / total as f64
    };

    let (insights, recommendations) = if total == 0 {
        (
            NO_DATA_INSIGHT.to_string(),
            vec![NO_DATA_RECOMMENDATION.to_string()],
        )
    } else {
        (
            insights(&percentages, high_confidence_rate, &languages),
            recommendations(&percentages, &languages),
        )
    };

    AggregatedSummary {
        total,
        counts,
        percentages,
        insights,
        recommendations,
        categorized_comments: categorized,
        comments: items.iter().map(CommentDetail::from).collect(),
        language_breakdown: languages,
        failed,
        high_confidence_rate,
    }
}

/// Primary statement (first matching rule), then the confidence rate, then
/// a language-mix note when both languages were seen.
pub fn insights(p: &Percentages, high_confidence_rate: f64, languages: &LanguageBreakdown) -> String {
    let mut parts: Vec<String> = Vec::new();

    if p.positive > 60.0 {
        parts.push(format!(
            "Excellent feedback: {:.1}% of participants expressed positive sentiment about the event.",
            p.positive
        ));
    } else if p.positive > 40.0 {
        parts.push(format!(
            "Generally positive reception: {:.1}% positive against {:.1}% negative.",
            p.positive, p.negative
        ));
    } else if p.negative > 30.0 {
        parts.push(format!(
            "Areas of concern: {:.1}% of comments were negative and deserve a closer look.",
            p.negative
        ));
    } else {
        parts.push(format!(
            "Mixed reception: most comments were neutral ({:.1}%).",
            p.neutral
        ));
    }

    parts.push(format!(
        "{:.0}% of comments were classified with high confidence.",
        high_confidence_rate * 100.0
    ));

    if languages.en > 0 && languages.other > 0 {
        parts.push(format!(
            "Feedback was written in both English ({}) and Filipino ({}).",
            languages.en, languages.other
        ));
    }

    parts.join(" ")
}

/// Every applicable rule fires; generic advice only when none did.
pub fn recommendations(p: &Percentages, languages: &LanguageBreakdown) -> Vec<String> {
    let mut out = Vec::new();

    if p.negative > 20.0 {
        out.push("Review the negative comments to identify recurring problems with logistics, venue or content.".to_string());
        out.push("Follow up with participants who reported issues and communicate the planned improvements.".to_string());
    }
    if p.positive > 70.0 {
        out.push("Keep the elements participants praised most as the baseline for future events.".to_string());
        out.push("Share the positive feedback with organizers, speakers and volunteers.".to_string());
    }
    if languages.other > 0 {
        out.push("Provide bilingual materials and announcements, since participants responded in Filipino as well as English.".to_string());
    }
    if out.is_empty() {
        out.push("Maintain the current quality of event planning and execution.".to_string());
        out.push("Keep collecting feedback to track sentiment across future events.".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(s: Sentiment, conf: f32, lang: Language) -> ClassifiedComment {
        ClassifiedComment::new(
            format!("{s} comment"),
            SentimentResult::new(s, conf, AnalysisMethod::Primary),
            lang,
        )
    }

    #[test]
    fn empty_batch_has_no_data_text() {
        let s = summarize(&[]);
        assert!(s.is_empty());
        assert_eq!(s.counts, BucketCounts::default());
        assert_eq!(s.percentages, Percentages::default());
        assert_eq!(s.insights, NO_DATA_INSIGHT);
        assert_eq!(s.recommendations, vec![NO_DATA_RECOMMENDATION.to_string()]);
        assert_eq!(s.high_confidence_rate, 0.0);
    }

    #[test]
    fn three_way_split_rounds_to_one_decimal() {
        let s = summarize(&[
            item(Sentiment::Positive, 0.9, Language::English),
            item(Sentiment::Neutral, 0.7, Language::Filipino),
            item(Sentiment::Negative, 0.8, Language::English),
        ]);
        assert_eq!(s.percentages.positive, 33.3);
        assert_eq!(s.percentages.neutral, 33.3);
        assert_eq!(s.percentages.negative, 33.3);
        assert!((s.percentages.sum() - 100.0).abs() <= 0.1 + 1e-9);
        assert_eq!(s.language_breakdown, LanguageBreakdown { en: 2, other: 1 });
        assert_eq!(s.categorized_comments.neutral, vec!["neutral comment".to_string()]);
        // confidence 0.7 is not "> 0.7"
        assert!((s.high_confidence_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn excellent_feedback_with_reinforcement() {
        let items: Vec<_> = (0..8)
            .map(|_| item(Sentiment::Positive, 0.9, Language::English))
            .chain(std::iter::once(item(Sentiment::Neutral, 0.65, Language::English)))
            .collect();
        let s = summarize(&items);
        assert!(s.insights.starts_with("Excellent feedback"));
        assert!(s.insights.contains("high confidence"));
        assert!(!s.insights.contains("Filipino"));
        assert_eq!(s.recommendations.len(), 2);
        assert!(s.recommendations[0].contains("praised"));
    }

    #[test]
    fn negative_heavy_batch_triggers_remediation_and_multilingual() {
        let s = summarize(&[
            item(Sentiment::Negative, 0.8, Language::Filipino),
            item(Sentiment::Negative, 0.8, Language::English),
            item(Sentiment::Neutral, 0.6, Language::English),
        ]);
        assert!(s.insights.starts_with("Areas of concern"));
        assert!(s.insights.contains("both English"));
        assert_eq!(s.recommendations.len(), 3);
        assert!(s.recommendations[2].contains("bilingual"));
    }

    #[test]
    fn generic_recommendations_when_nothing_fires() {
        let p = Percentages {
            positive: 50.0,
            neutral: 40.0,
            negative: 10.0,
        };
        let recs = recommendations(&p, &LanguageBreakdown { en: 10, other: 0 });
        assert_eq!(recs.len(), 2);
        assert!(recs[0].starts_with("Maintain"));
        let text = insights(&p, 0.5, &LanguageBreakdown { en: 10, other: 0 });
        assert!(text.starts_with("Generally positive"));
        assert!(text.contains("50%"));
    }

    #[test]
    fn placeholders_count_as_failed_neutral() {
        let s = summarize(&[
            ClassifiedComment::failed("???", Language::English),
            item(Sentiment::Positive, 0.9, Language::English),
        ]);
        assert_eq!(s.failed, 1);
        assert_eq!(s.counts.neutral, 1);
        assert_eq!(s.total, 2);
        assert_eq!(s.comments[0].method, AnalysisMethod::Placeholder);
    }

    #[test]
    fn comment_details_follow_input_order() {
        let parts = CommentParts {
            positive_part: "Great talk.".into(),
            ..Default::default()
        };
        let s = summarize(&[
            item(Sentiment::Negative, 0.8, Language::English),
            item(Sentiment::Positive, 0.9, Language::English).with_parts(parts.clone()),
        ]);
        assert_eq!(s.comments.len(), 2);
        assert_eq!(s.comments[0].sentiment, Sentiment::Negative);
        assert_eq!(s.comments[1].text, "positive comment");
        assert_eq!(s.comments[1].parts, parts);
    }

    #[test]
    fn percentages_always_sum_to_hundred() {
        for n in 1..60usize {
            for pos in 0..=n {
                let neg = (n - pos) / 2;
                let counts = BucketCounts {
                    positive: pos,
                    negative: neg,
                    neutral: n - pos - neg,
                };
                let sum = counts.percentages().sum();
                assert!((sum - 100.0).abs() <= 0.1 + 1e-9, "n={n} pos={pos} sum={sum}");
            }
        }
    }
}
