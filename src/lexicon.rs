//! Lexicon entries, the lexicon store contract, and the per-batch snapshot
//! the scorers read from.
//!
//! Lookup order for a token: custom entries (case-insensitive exact match),
//! then the built-in dictionary embedded from `data/default_lexicon.json`.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

use crate::analyze::phrases::PhraseTable;
use crate::error::LexiconError;
use crate::sentiment::Sentiment;

static DEFAULT_LEXICON: Lazy<HashMap<String, LexiconEntry>> = Lazy::new(|| {
    let raw = include_str!("../data/default_lexicon.json");
    let entries: Vec<LexiconEntry> =
        serde_json::from_str(raw).expect("valid default sentiment lexicon");
    entries.into_iter().map(|e| (e.key(), e)).collect()
});

fn default_language() -> String {
    "en".to_string()
}

/// One word or phrase with its sentiment weight. Unique by lower-cased text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    #[serde(alias = "word_or_phrase", alias = "wordOrPhrase")]
    pub word: String,
    pub sentiment: Sentiment,
    /// Magnitude (>= 0); the sign comes from `sentiment`.
    pub weight: f32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, alias = "isPhrase")]
    pub is_phrase: bool,
}

impl LexiconEntry {
    pub fn new(
        word: impl Into<String>,
        sentiment: Sentiment,
        weight: f32,
        language: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            sentiment,
            weight,
            language: language.into(),
            is_phrase: false,
        }
    }

    pub fn phrase(
        phrase: impl Into<String>,
        sentiment: Sentiment,
        weight: f32,
        language: impl Into<String>,
    ) -> Self {
        Self {
            is_phrase: true,
            ..Self::new(phrase, sentiment, weight, language)
        }
    }

    /// Uniqueness key: trimmed, lower-cased text.
    pub fn key(&self) -> String {
        self.word.trim().to_lowercase()
    }

    pub fn signed_weight(&self) -> f32 {
        self.weight * self.sentiment.sign()
    }

    pub fn validate(&self) -> std::result::Result<(), LexiconError> {
        if self.key().is_empty() {
            return Err(LexiconError::Invalid("lexicon entry has an empty word".into()));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(LexiconError::Invalid(format!(
                "lexicon entry `{}` has invalid weight {}",
                self.word, self.weight
            )));
        }
        Ok(())
    }

    /// Canonical form for storage: trimmed word, lower-cased language,
    /// multi-word text always flagged as a phrase.
    pub fn normalized(mut self) -> Self {
        self.word = self.word.trim().to_string();
        self.language = self.language.trim().to_ascii_lowercase();
        if self.word.split_whitespace().count() > 1 {
            self.is_phrase = true;
        }
        self
    }
}

/* ----------------------------
Store contract
---------------------------- */

/// Mutable lexicon store. Read once per batch via `fetch_all`.
#[async_trait::async_trait]
pub trait LexiconSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<LexiconEntry>>;
    async fn exists(&self, word: &str) -> Result<bool>;
    /// Insert a new entry. Rejections (duplicate, invalid) are reported as
    /// [`LexiconError`]; anything else means the store itself failed.
    async fn add(&self, entry: LexiconEntry) -> Result<()>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryLexicon {
    inner: RwLock<BTreeMap<String, LexiconEntry>>,
}

impl InMemoryLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = LexiconEntry>) -> Self {
        let map = entries
            .into_iter()
            .map(|e| {
                let e = e.normalized();
                (e.key(), e)
            })
            .collect();
        Self {
            inner: RwLock::new(map),
        }
    }
}

#[async_trait::async_trait]
impl LexiconSource for InMemoryLexicon {
    async fn fetch_all(&self) -> Result<Vec<LexiconEntry>> {
        let g = self
            .inner
            .read()
            .map_err(|_| anyhow!("lexicon lock poisoned"))?;
        Ok(g.values().cloned().collect())
    }

    async fn exists(&self, word: &str) -> Result<bool> {
        let g = self
            .inner
            .read()
            .map_err(|_| anyhow!("lexicon lock poisoned"))?;
        Ok(g.contains_key(&word.trim().to_lowercase()))
    }

    async fn add(&self, entry: LexiconEntry) -> Result<()> {
        let entry = entry.normalized();
        entry.validate()?;
        let mut g = self
            .inner
            .write()
            .map_err(|_| anyhow!("lexicon lock poisoned"))?;
        let key = entry.key();
        if g.contains_key(&key) {
            return Err(LexiconError::Duplicate(key).into());
        }
        g.insert(key, entry);
        Ok(())
    }
}

/// JSON-file backed store: an array of entries, rewritten atomically
/// (tmp file + rename) on every `add`. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileLexicon {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileLexicon {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<LexiconEntry>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing lexicon file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e)
                .with_context(|| format!("reading lexicon file {}", self.path.display())),
        }
    }

    async fn write_entries(&self, entries: &[LexiconEntry]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing lexicon file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LexiconSource for JsonFileLexicon {
    async fn fetch_all(&self) -> Result<Vec<LexiconEntry>> {
        self.read_entries().await
    }

    async fn exists(&self, word: &str) -> Result<bool> {
        let key = word.trim().to_lowercase();
        Ok(self.read_entries().await?.iter().any(|e| e.key() == key))
    }

    async fn add(&self, entry: LexiconEntry) -> Result<()> {
        let entry = entry.normalized();
        entry.validate()?;
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        let key = entry.key();
        if entries.iter().any(|e| e.key() == key) {
            return Err(LexiconError::Duplicate(key).into());
        }
        entries.push(entry);
        self.write_entries(&entries).await
    }
}

/* ----------------------------
Snapshot
---------------------------- */

/// Immutable view of custom + built-in lexicon for one analysis batch.
#[derive(Debug, Clone)]
pub struct LexiconSnapshot {
    custom: HashMap<String, LexiconEntry>,
    phrases: PhraseTable,
}

impl LexiconSnapshot {
    /// Built-in dictionary and phrase tables only.
    pub fn builtin() -> Self {
        Self {
            custom: HashMap::new(),
            phrases: PhraseTable::builtin(),
        }
    }

    /// Build from store entries. Invalid entries are skipped with a warning
    /// instead of poisoning the whole batch.
    pub fn from_entries(entries: Vec<LexiconEntry>) -> Self {
        let mut custom = HashMap::with_capacity(entries.len());
        let mut phrase_entries = Vec::new();
        for entry in entries {
            let entry = entry.normalized();
            if let Err(e) = entry.validate() {
                warn!(target: "sentiment::lexicon", error = %e, "skipping invalid lexicon entry");
                continue;
            }
            if entry.is_phrase {
                phrase_entries.push(entry);
            } else {
                custom.insert(entry.key(), entry);
            }
        }
        Self {
            custom,
            phrases: PhraseTable::with_custom(&phrase_entries),
        }
    }

    /// Signed weight for a token; `None` when neither table knows it.
    pub fn weight(&self, token: &str) -> Option<f32> {
        self.entry(token).map(LexiconEntry::signed_weight)
    }

    pub fn language_of(&self, token: &str) -> Option<&str> {
        self.entry(token).map(|e| e.language.as_str())
    }

    fn entry(&self, token: &str) -> Option<&LexiconEntry> {
        self.custom
            .get(token)
            .or_else(|| DEFAULT_LEXICON.get(token))
    }

    pub fn phrases(&self) -> &PhraseTable {
        &self.phrases
    }

    /// Custom entries (words and phrases) for shipping to an out-of-process analyzer.
    pub fn custom_entries(&self) -> Vec<LexiconEntry> {
        let mut out: Vec<LexiconEntry> = self.custom.values().cloned().collect();
        out.extend(
            self.phrases
                .rules()
                .iter()
                .filter(|r| r.custom)
                .map(|r| LexiconEntry::phrase(r.phrase.clone(), r.sentiment, 1.0, r.language.clone())),
        );
        out.sort_by(|a, b| a.word.cmp(&b.word));
        out
    }

    pub fn custom_len(&self) -> usize {
        self.custom.len()
    }
}

impl Default for LexiconSnapshot {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_dictionary_covers_both_languages() {
        let s = LexiconSnapshot::builtin();
        assert!(s.weight("good").unwrap() > 0.0);
        assert!(s.weight("terrible").unwrap() < 0.0);
        assert!(s.weight("maganda").unwrap() > 0.0);
        assert!(s.weight("pangit").unwrap() < 0.0);
        assert_eq!(s.language_of("maganda"), Some("tl"));
        assert!(s.weight("event").is_none());
    }

    #[test]
    fn custom_entries_take_precedence() {
        let s = LexiconSnapshot::from_entries(vec![
            LexiconEntry::new("Good", Sentiment::Negative, 2.0, "en"),
            LexiconEntry::new("lit", Sentiment::Positive, 1.5, "en"),
        ]);
        assert_eq!(s.weight("good"), Some(-2.0));
        assert_eq!(s.weight("lit"), Some(1.5));
        assert_eq!(s.custom_len(), 2);
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let s = LexiconSnapshot::from_entries(vec![
            LexiconEntry::new("broken", Sentiment::Positive, -1.0, "en"),
            LexiconEntry::new("nan", Sentiment::Positive, f32::NAN, "en"),
            LexiconEntry::new("   ", Sentiment::Positive, 1.0, "en"),
        ]);
        assert_eq!(s.custom_len(), 0);
        assert!(s.weight("broken").is_none());
    }

    #[test]
    fn multi_word_entries_become_phrases() {
        let s = LexiconSnapshot::from_entries(vec![LexiconEntry::new(
            "sulit na sulit",
            Sentiment::Positive,
            2.0,
            "tl",
        )]);
        assert!(s.weight("sulit na sulit").is_none());
        let m = s.phrases().match_phrase("sulit na sulit talaga").unwrap();
        assert_eq!(m.sentiment, Sentiment::Positive);
    }

    #[test]
    fn entry_deserializes_from_store_shape() {
        let raw = r#"{"wordOrPhrase":"Astig","sentiment":"positive","weight":1.0,"language":"tl","isPhrase":false}"#;
        let e: LexiconEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(e.key(), "astig");
        assert!(!e.is_phrase);
    }

    #[tokio::test]
    async fn in_memory_store_rejects_case_insensitive_duplicates() {
        let store = InMemoryLexicon::new();
        store
            .add(LexiconEntry::new("Sulit", Sentiment::Positive, 1.0, "tl"))
            .await
            .unwrap();
        assert!(store.exists("SULIT").await.unwrap());
        let dup = store
            .add(LexiconEntry::new("sulit", Sentiment::Negative, 1.0, "tl"))
            .await
            .unwrap_err();
        assert_eq!(
            dup.downcast_ref::<LexiconError>(),
            Some(&LexiconError::Duplicate("sulit".into()))
        );
        assert_eq!(store.fetch_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn json_file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon").join("custom.json");
        let store = JsonFileLexicon::new(&path);

        assert!(store.fetch_all().await.unwrap().is_empty());
        store
            .add(LexiconEntry::new("lodi", Sentiment::Positive, 1.0, "tl"))
            .await
            .unwrap();
        let dup = store.add(LexiconEntry::new("LODI", Sentiment::Positive, 1.0, "tl")).await.unwrap_err();
        assert!(matches!(dup.downcast_ref::<LexiconError>(), Some(LexiconError::Duplicate(_))));
        let bad = store.add(LexiconEntry::new("bad", Sentiment::Negative, -3.0, "en")).await.unwrap_err();
        assert!(matches!(bad.downcast_ref::<LexiconError>(), Some(LexiconError::Invalid(_))));

        let reopened = JsonFileLexicon::new(&path);
        let all = reopened.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(reopened.exists("lodi").await.unwrap());
    }
}
