// src/config/engine.rs
//! Engine configuration: TOML file, then environment overrides, then sanitizing.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ENGINE_CONFIG_PATH: &str = "config/engine.toml";
pub const ENV_ENGINE_CONFIG_PATH: &str = "SENTIMENT_CONFIG_PATH";

pub const ENV_PRIMARY: &str = "SENTIMENT_PRIMARY";
pub const ENV_PRIMARY_TIMEOUT_MS: &str = "SENTIMENT_PRIMARY_TIMEOUT_MS";
pub const ENV_CACHE_TTL_SECS: &str = "SENTIMENT_CACHE_TTL_SECS";
pub const ENV_CACHE_CAPACITY: &str = "SENTIMENT_CACHE_CAPACITY";
pub const ENV_LEXICON_PATH: &str = "SENTIMENT_LEXICON_PATH";

const DEFAULT_PRIMARY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 4_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
const DEFAULT_CACHE_CAPACITY: usize = 1_000;

/// Which analyzer plays the primary role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryKind {
    #[default]
    Enhanced,
    Command,
    Http,
    Disabled,
}

impl FromStr for PrimaryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enhanced" => Ok(PrimaryKind::Enhanced),
            "command" => Ok(PrimaryKind::Command),
            "http" => Ok(PrimaryKind::Http),
            "disabled" | "off" | "none" => Ok(PrimaryKind::Disabled),
            other => Err(anyhow!("unknown primary analyzer `{other}`")),
        }
    }
}

impl fmt::Display for PrimaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimaryKind::Enhanced => "enhanced",
            PrimaryKind::Command => "command",
            PrimaryKind::Http => "http",
            PrimaryKind::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub url: String,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub primary: PrimaryKind,
    pub primary_timeout_ms: u64,
    pub max_concurrency: usize,
    pub command: Option<CommandConfig>,
    pub http: Option<HttpConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            primary: PrimaryKind::default(),
            primary_timeout_ms: DEFAULT_PRIMARY_TIMEOUT_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            command: None,
            http: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    /// JSON file store; `None` keeps custom entries in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub cache: CacheConfig,
    pub lexicon: LexiconConfig,
}

impl EngineConfig {
    /// Resolve the path (`SENTIMENT_CONFIG_PATH` or the default), read it if
    /// present, then apply process environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_ENGINE_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ENGINE_CONFIG_PATH));
        let mut cfg = Self::from_path_or_default(&path)?;
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Missing file -> defaults; unreadable or malformed file -> error.
    pub fn from_path_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => {
                let cfg = Self::from_toml_str(&s)
                    .with_context(|| format!("parsing engine config {}", path.display()))?;
                info!(target: "sentiment::engine", path = %path.display(), "engine config loaded");
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "sentiment::engine", path = %path.display(), "no engine config; using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading engine config {}", path.display())),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: EngineConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Apply `SENTIMENT_*` overrides from `lookup`. Unparsable numbers are
    /// ignored with a warning; an unknown primary kind is an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_PRIMARY) {
            self.analysis.primary = v.parse()?;
        }
        if let Some(ms) = parse_env_num::<u64>(ENV_PRIMARY_TIMEOUT_MS, lookup(ENV_PRIMARY_TIMEOUT_MS)) {
            self.analysis.primary_timeout_ms = ms;
        }
        if let Some(s) = parse_env_num::<u64>(ENV_CACHE_TTL_SECS, lookup(ENV_CACHE_TTL_SECS)) {
            self.cache.ttl_secs = s;
        }
        if let Some(n) = parse_env_num::<usize>(ENV_CACHE_CAPACITY, lookup(ENV_CACHE_CAPACITY)) {
            self.cache.capacity = n;
        }
        if let Some(p) = lookup(ENV_LEXICON_PATH).filter(|p| !p.trim().is_empty()) {
            self.lexicon.path = Some(PathBuf::from(p.trim()));
        }
        self.sanitize();
        Ok(())
    }

    fn sanitize(&mut self) {
        if self.analysis.primary_timeout_ms == 0 {
            self.analysis.primary_timeout_ms = DEFAULT_PRIMARY_TIMEOUT_MS;
        }
        if self.analysis.max_concurrency == 0 {
            self.analysis.max_concurrency = DEFAULT_MAX_CONCURRENCY;
        }
        if self.cache.ttl_secs == 0 {
            self.cache.ttl_secs = DEFAULT_CACHE_TTL_SECS;
        }
        if self.cache.capacity == 0 {
            self.cache.capacity = DEFAULT_CACHE_CAPACITY;
        }
        if let Some(http) = self.analysis.http.as_mut() {
            if http.timeout_ms == 0 {
                http.timeout_ms = DEFAULT_HTTP_TIMEOUT_MS;
            }
        }
    }

    /// The selected primary must have its section.
    pub fn validate(&self) -> Result<()> {
        match self.analysis.primary {
            PrimaryKind::Command if self.analysis.command.is_none() => {
                bail!("primary = \"command\" requires an [analysis.command] section")
            }
            PrimaryKind::Http if self.analysis.http.is_none() => {
                bail!("primary = \"http\" requires an [analysis.http] section")
            }
            _ => Ok(()),
        }
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis.primary_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

fn parse_env_num<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "sentiment::engine", key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}
