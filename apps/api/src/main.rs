mod config;
mod embedding;
mod errors;
mod matching;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::cache::{EmbeddingCache, RedisEmbeddingCache};
use crate::embedding::http_provider::HttpEmbeddingProvider;
use crate::matching::normalizer::HeaderLexicon;
use crate::matching::pipeline::MatchPipeline;
use crate::matching::vocabulary::{SkillVocabulary, StopwordList};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumatch API v{}", env!("CARGO_PKG_VERSION"));

    // Validate scoring configuration before serving anything — bad weights
    // must never surface mid-request.
    let options = config.default_options();
    options
        .validate()
        .context("invalid scoring configuration")?;

    // Vocabulary: compiled-in defaults unless override files are configured.
    let vocabulary = match &config.skill_vocabulary_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read skill vocabulary {}", path.display()))?;
            SkillVocabulary::from_lines(&raw)
        }
        None => SkillVocabulary::default(),
    };
    anyhow::ensure!(
        !vocabulary.is_empty(),
        "skill vocabulary must not be empty"
    );
    let stopwords = match &config.stopword_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read stopword list {}", path.display()))?;
            StopwordList::from_lines(&raw)
        }
        None => StopwordList::default(),
    };
    let lexicon = match &config.header_lexicon_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read header lexicon {}", path.display()))?;
            HeaderLexicon::from_lines(&raw)
        }
        None => HeaderLexicon::default(),
    };
    info!("Vocabulary loaded ({} skill terms)", vocabulary.len());

    // Embedding provider
    let embedder = Arc::new(HttpEmbeddingProvider::new(
        &config.embedding_base_url,
        config.embedding_api_key.clone(),
        config.embedding_model.clone(),
        config.embedding_dimension,
        config.embedding_batch_size,
        config.embedding_max_concurrency,
        config.embedding_call_timeout,
    )?);
    info!(
        "Embedding provider initialized (model: {}, dimension: {})",
        config.embedding_model, config.embedding_dimension
    );

    // Optional embedding cache
    let cache: Option<Arc<dyn EmbeddingCache>> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Embedding cache enabled (ttl: {}s)", config.cache_ttl_seconds);
            Some(Arc::new(RedisEmbeddingCache::new(
                client,
                config.cache_ttl_seconds,
            )))
        }
        None => {
            info!("Embedding cache disabled");
            None
        }
    };

    let pipeline = Arc::new(MatchPipeline::new(
        embedder,
        cache,
        vocabulary,
        stopwords,
        lexicon,
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline,
        options,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
