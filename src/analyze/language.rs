//! Language packs (negations, intensifiers, phrase tables, emoji) and the
//! dominant-language heuristic used for per-language report diagnostics.
//!
//! The packs are table data embedded from `data/language_packs.json`, so the
//! scorer stays table-driven and every list can be tested in isolation.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::tokenize::tokenize;
use crate::lexicon::LexiconSnapshot;

static PACKS: Lazy<LanguagePacks> = Lazy::new(|| {
    let raw = include_str!("../../data/language_packs.json");
    serde_json::from_str::<LanguagePacks>(raw).expect("valid language packs")
});

/// Embedded language packs (process-wide, immutable).
pub fn packs() -> &'static LanguagePacks {
    &PACKS
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguagePacks {
    pub emoji: EmojiTable,
    /// Keyed by language code (`en`, `tl`).
    pub languages: BTreeMap<String, LanguagePack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmojiTable {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguagePack {
    pub negations: HashSet<String>,
    pub intensifiers: HashSet<String>,
    #[serde(default)]
    pub diminishers: HashSet<String>,
    /// Function words that hint at the language.
    #[serde(default)]
    pub markers: HashSet<String>,
    #[serde(default)]
    pub neutral_words: HashSet<String>,
    /// Constructive-criticism markers ("however", "sa susunod", ...).
    #[serde(default)]
    pub constructive: Vec<String>,
    pub phrases: PhraseLists,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhraseLists {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
}

impl LanguagePacks {
    pub fn is_negation(&self, token: &str) -> bool {
        self.languages.values().any(|p| p.negations.contains(token))
    }

    pub fn is_intensifier(&self, token: &str) -> bool {
        self.languages.values().any(|p| p.intensifiers.contains(token))
    }

    pub fn is_diminisher(&self, token: &str) -> bool {
        self.languages.values().any(|p| p.diminishers.contains(token))
    }

    pub fn is_neutral_word(&self, token: &str) -> bool {
        self.languages.values().any(|p| p.neutral_words.contains(token))
    }

    /// All constructive-criticism markers, both languages.
    pub fn constructive_markers(&self) -> impl Iterator<Item = &str> {
        self.languages
            .values()
            .flat_map(|p| p.constructive.iter().map(String::as_str))
    }

    pub fn pack(&self, language: Language) -> Option<&LanguagePack> {
        self.languages.get(language.code())
    }
}

/// Dominant language of a comment. Filipino is the secondary language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "tl")]
    Filipino,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Filipino => "tl",
        }
    }

    pub fn is_secondary(self) -> bool {
        self == Language::Filipino
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => f.write_str("English"),
            Language::Filipino => f.write_str("Filipino"),
        }
    }
}

/// Count language hints per token (markers + lexicon language) and pick the
/// dominant one. Filipino needs at least one hit and must not trail English.
/// Reporting only: never changes classification.
pub fn detect_language(text: &str, lexicon: &LexiconSnapshot) -> Language {
    let packs = packs();
    let (mut en, mut tl) = (0usize, 0usize);

    for tok in tokenize(text) {
        let lex_lang = lexicon.language_of(&tok);
        if lex_lang == Some(Language::English.code())
            || packs
                .pack(Language::English)
                .is_some_and(|p| p.markers.contains(&tok))
        {
            en += 1;
        }
        if lex_lang == Some(Language::Filipino.code())
            || packs
                .pack(Language::Filipino)
                .is_some_and(|p| p.markers.contains(&tok) || p.negations.contains(&tok))
        {
            tl += 1;
        }
    }

    if tl > 0 && tl >= en {
        Language::Filipino
    } else {
        Language::English
    }
}
