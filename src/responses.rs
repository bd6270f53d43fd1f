//! Form responses: only free-text answers are sentiment-scored; ratings,
//! choices and dates are filtered out by question type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::report::{BucketCounts, Percentages};
use crate::sentiment::SentimentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    ShortAnswer,
    Paragraph,
    MultipleChoice,
    Checkboxes,
    Dropdown,
    LinearScale,
    Rating,
    Date,
    Time,
}

impl QuestionType {
    pub fn is_free_text(self) -> bool {
        matches!(self, QuestionType::ShortAnswer | QuestionType::Paragraph)
    }
}

/// One submitted form: question id -> raw answer value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormResponse {
    #[serde(default)]
    pub respondent: Option<String>,
    pub answers: BTreeMap<String, Value>,
}

pub type QuestionTypeMap = HashMap<String, QuestionType>;

/// A free-text answer selected for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeTextAnswer {
    pub question_id: String,
    pub text: String,
}

/// Free-text answers in response order, plus how many answers were skipped
/// (non-text type, unknown question, non-string or blank value).
pub fn extract_free_text(responses: &[FormResponse], types: &QuestionTypeMap) -> (Vec<FreeTextAnswer>, usize) {
    let mut picked = Vec::new();
    let mut skipped = 0usize;

    for resp in responses {
        for (qid, value) in &resp.answers {
            let eligible = types.get(qid).is_some_and(|t| t.is_free_text());
            match (eligible, value.as_str()) {
                (true, Some(text)) if !text.trim().is_empty() => picked.push(FreeTextAnswer {
                    question_id: qid.clone(),
                    text: text.to_string(),
                }),
                _ => skipped += 1,
            }
        }
    }
    (picked, skipped)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub overall: BucketCounts,
    pub percentages: Percentages,
    pub by_question: BTreeMap<String, BucketCounts>,
    pub analyzed: usize,
    pub skipped: usize,
}

impl SentimentBreakdown {
    /// `answers` and `results` are parallel slices.
    pub fn from_results(answers: &[FreeTextAnswer], results: &[SentimentResult], skipped: usize) -> Self {
        let mut overall = BucketCounts::default();
        let mut by_question: BTreeMap<String, BucketCounts> = BTreeMap::new();
        for (a, r) in answers.iter().zip(results) {
            overall.bump(r.sentiment);
            by_question
                .entry(a.question_id.clone())
                .or_default()
                .bump(r.sentiment);
        }
        Self {
            percentages: overall.percentages(),
            analyzed: overall.total(),
            overall,
            by_question,
            skipped,
        }
    }
}
