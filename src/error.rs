//! Error types for the analysis engine.
//!
//! Primary-analyzer failures are recovered by the fallback and only logged;
//! callers see an `AnalysisError` when no analyzer produced a usable result.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Primary analyzer did not answer within the race window
    #[error("primary analyzer timed out after {0:?}")]
    Timeout(Duration),

    /// Primary analyzer reported an execution error
    #[error("primary analyzer failed: {0}")]
    Primary(String),

    /// An analyzer answered with a label/confidence outside the contract
    #[error("invalid analyzer output: {0}")]
    InvalidOutput(String),

    /// Fallback analyzer could not score the text
    #[error("fallback analyzer failed: {0}")]
    Fallback(String),

    /// Neither analyzer produced a result
    #[error("analysis failed (primary: {primary}; fallback: {fallback})")]
    Unrecoverable { primary: String, fallback: String },

    /// Lexicon store could not be read or written
    #[error("lexicon error: {0}")]
    Lexicon(String),

    /// Malformed request/response on the out-of-process wire contract
    #[error("wire protocol error: {0}")]
    Wire(String),
}

impl AnalysisError {
    /// Short machine-friendly tag used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Timeout(_) => "timeout",
            AnalysisError::Primary(_) => "primary_error",
            AnalysisError::InvalidOutput(_) => "invalid_output",
            AnalysisError::Fallback(_) => "fallback_error",
            AnalysisError::Unrecoverable { .. } => "unrecoverable",
            AnalysisError::Lexicon(_) => "lexicon",
            AnalysisError::Wire(_) => "wire",
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Entry rejected by a lexicon store. Travels inside `anyhow::Error` so
/// callers can tell a rejection from an unavailable store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexiconError {
    /// Case-insensitive match of an existing word or phrase
    #[error("lexicon entry `{0}` already exists")]
    Duplicate(String),

    /// Empty word or unusable weight
    #[error("{0}")]
    Invalid(String),
}
