use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::matching::ats::AtsWeights;
use crate::matching::pipeline::MatchOptions;

/// Application configuration loaded from environment variables.
/// Required variables fail startup immediately; scoring knobs have
/// documented defaults.
#[derive(Debug, Clone)]
pub struct Config {
    // Embedding provider
    pub embedding_base_url: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub embedding_batch_size: usize,
    pub embedding_max_concurrency: usize,
    pub embedding_call_timeout: Duration,

    /// Optional embedding cache. Absent = cache disabled, always recompute.
    pub redis_url: Option<String>,
    pub cache_ttl_seconds: u64,

    // Vocabulary overrides. Absent = compiled-in defaults.
    pub skill_vocabulary_path: Option<PathBuf>,
    pub stopword_path: Option<PathBuf>,
    pub header_lexicon_path: Option<PathBuf>,

    // Scoring defaults (per-request overridable)
    pub ats_weights: AtsWeights,
    pub semantic_blend: f64,
    pub weak_section_threshold: f64,
    pub request_timeout: Duration,
    pub lexical_fallback: bool,

    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = MatchOptions::default();
        let default_weights = AtsWeights::default();

        Ok(Config {
            embedding_base_url: require_env("EMBEDDING_BASE_URL")?,
            embedding_api_key: require_env("EMBEDDING_API_KEY")?,
            embedding_model: require_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", 1536)?,
            embedding_batch_size: parse_env("EMBEDDING_BATCH_SIZE", 32)?,
            embedding_max_concurrency: parse_env("EMBEDDING_MAX_CONCURRENCY", 8)?,
            embedding_call_timeout: Duration::from_millis(parse_env(
                "EMBEDDING_CALL_TIMEOUT_MS",
                10_000,
            )?),
            redis_url: std::env::var("REDIS_URL").ok(),
            cache_ttl_seconds: parse_env("EMBEDDING_CACHE_TTL_SECONDS", 86_400)?,
            skill_vocabulary_path: std::env::var("SKILL_VOCABULARY_PATH")
                .ok()
                .map(PathBuf::from),
            stopword_path: std::env::var("STOPWORD_PATH").ok().map(PathBuf::from),
            header_lexicon_path: std::env::var("HEADER_LEXICON_PATH").ok().map(PathBuf::from),
            ats_weights: AtsWeights {
                keyword_match: parse_env("ATS_WEIGHT_KEYWORDS", default_weights.keyword_match)?,
                skills_coverage: parse_env("ATS_WEIGHT_SKILLS", default_weights.skills_coverage)?,
                readability: parse_env("ATS_WEIGHT_READABILITY", default_weights.readability)?,
                format_compliance: parse_env(
                    "ATS_WEIGHT_FORMAT",
                    default_weights.format_compliance,
                )?,
            },
            semantic_blend: parse_env("SEMANTIC_BLEND", defaults.semantic_blend)?,
            weak_section_threshold: parse_env(
                "WEAK_SECTION_THRESHOLD",
                defaults.weak_section_threshold,
            )?,
            request_timeout: Duration::from_millis(parse_env(
                "REQUEST_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )?),
            lexical_fallback: parse_env("LEXICAL_FALLBACK", false)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Server-default match options. Validated in `main` at startup — a bad
    /// weight configuration never reaches a request.
    pub fn default_options(&self) -> MatchOptions {
        MatchOptions {
            ats_weights: self.ats_weights,
            semantic_blend: self.semantic_blend,
            weak_section_threshold: self.weak_section_threshold,
            timeout: self.request_timeout,
            lexical_fallback: self.lexical_fallback,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}
