// src/config/mod.rs
pub mod engine;

pub use engine::{
    AnalysisConfig, CacheConfig, CommandConfig, EngineConfig, HttpConfig, LexiconConfig, PrimaryKind,
    DEFAULT_ENGINE_CONFIG_PATH, ENV_CACHE_CAPACITY, ENV_CACHE_TTL_SECS, ENV_ENGINE_CONFIG_PATH,
    ENV_LEXICON_PATH, ENV_PRIMARY, ENV_PRIMARY_TIMEOUT_MS,
};
