//! The match pipeline — the single entry point that takes two raw texts and
//! produces a `MatchReport`.
//!
//! Everything in here is request-scoped: each invocation owns its own
//! documents, profiles, and vectors, and nothing is shared across
//! concurrent requests beyond the provider's connection pool.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::embedding::cache::{fingerprint, EmbeddingCache};
use crate::embedding::{EmbeddingProvider, EmbeddingVector};
use crate::errors::AppError;
use crate::matching::ats::{score_ats, AtsScore, AtsWeights};
use crate::matching::normalizer::{normalize, HeaderLexicon, NormalizedText};
use crate::matching::profile::{extract_profile, Profile};
use crate::matching::report::{build_report, MatchReport};
use crate::matching::similarity::{compare, SectionVector, SimilarityResult};
use crate::matching::vocabulary::{SkillVocabulary, StopwordList};
use crate::matching::{Document, DocumentKind};

/// Per-request knobs, resolved from server defaults plus caller overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOptions {
    pub ats_weights: AtsWeights,
    /// Semantic share of the final composite, in [0,1].
    pub semantic_blend: f64,
    /// Per-section similarity below this flags a weak section, in [0,1].
    pub weak_section_threshold: f64,
    /// Overall pipeline deadline.
    pub timeout: Duration,
    /// Fall back to a lexical-only (degraded) report when the embedding
    /// provider fails. Off by default: a failed provider fails the match.
    pub lexical_fallback: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            ats_weights: AtsWeights::default(),
            semantic_blend: 0.5,
            weak_section_threshold: 0.45,
            timeout: Duration::from_secs(30),
            lexical_fallback: false,
        }
    }
}

impl MatchOptions {
    pub fn validate(&self) -> Result<(), AppError> {
        self.ats_weights.validate()?;
        if !(0.0..=1.0).contains(&self.semantic_blend) {
            return Err(AppError::Configuration(format!(
                "semantic blend must lie in [0,1], got {}",
                self.semantic_blend
            )));
        }
        if !(0.0..=1.0).contains(&self.weak_section_threshold) {
            return Err(AppError::Configuration(format!(
                "weak-section threshold must lie in [0,1], got {}",
                self.weak_section_threshold
            )));
        }
        if self.timeout.is_zero() {
            return Err(AppError::Configuration(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Long-lived pipeline handle carried in `AppState`. Holds the provider,
/// the optional cache, and the vocabulary — all the cross-request state
/// there is, all of it immutable.
pub struct MatchPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    cache: Option<Arc<dyn EmbeddingCache>>,
    vocabulary: SkillVocabulary,
    stopwords: StopwordList,
    lexicon: HeaderLexicon,
}

impl MatchPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        cache: Option<Arc<dyn EmbeddingCache>>,
        vocabulary: SkillVocabulary,
        stopwords: StopwordList,
        lexicon: HeaderLexicon,
    ) -> Self {
        Self {
            embedder,
            cache,
            vocabulary,
            stopwords,
            lexicon,
        }
    }

    /// Runs the full pipeline under the request deadline.
    pub async fn run(
        &self,
        resume: Document,
        jd: Document,
        options: &MatchOptions,
    ) -> Result<MatchReport, AppError> {
        let deadline_ms = options.timeout.as_millis() as u64;
        match tokio::time::timeout(options.timeout, self.execute(resume, jd, options)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout { deadline_ms }),
        }
    }

    async fn execute(
        &self,
        resume: Document,
        jd: Document,
        options: &MatchOptions,
    ) -> Result<MatchReport, AppError> {
        debug!(resume = %resume.source, jd = %jd.source, "running match pipeline");

        let resume_text = normalize(&resume.text, resume.kind, &self.lexicon)?;
        let jd_text = normalize(&jd.text, jd.kind, &self.lexicon)?;

        let resume_profile = extract_profile(
            &resume_text,
            DocumentKind::Resume,
            &self.vocabulary,
            &self.stopwords,
        );
        let jd_profile = extract_profile(
            &jd_text,
            DocumentKind::JobDescription,
            &self.vocabulary,
            &self.stopwords,
        );

        let ats = score_ats(
            &resume_profile,
            &jd_profile,
            &resume_text,
            &resume.text,
            &options.ats_weights,
        );

        let (similarity, degraded_reason) =
            match self.semantic_similarity(&resume_text, &jd_text).await {
                Ok(similarity) => (Some(similarity), None),
                Err(e) if options.lexical_fallback => {
                    warn!("embedding failed, producing lexical-only report: {e}");
                    (None, Some(e.to_string()))
                }
                Err(e) => return Err(AppError::Embedding(e)),
            };

        let report = build_report(
            resume_profile,
            jd_profile,
            similarity,
            ats,
            options.semantic_blend,
            options.weak_section_threshold,
            degraded_reason,
        );

        info!(
            composite = report.composite_score,
            degraded = report.degraded,
            recommendations = report.recommendations.len(),
            "match report produced"
        );
        Ok(report)
    }

    /// Lexical-only analysis: profiles and ATS score without touching the
    /// embedding provider.
    pub fn analyze_ats(
        &self,
        resume: &Document,
        jd: &Document,
        weights: &AtsWeights,
    ) -> Result<(Profile, Profile, AtsScore), AppError> {
        let resume_text = normalize(&resume.text, resume.kind, &self.lexicon)?;
        let jd_text = normalize(&jd.text, jd.kind, &self.lexicon)?;
        let resume_profile = extract_profile(
            &resume_text,
            DocumentKind::Resume,
            &self.vocabulary,
            &self.stopwords,
        );
        let jd_profile = extract_profile(
            &jd_text,
            DocumentKind::JobDescription,
            &self.vocabulary,
            &self.stopwords,
        );
        let ats = score_ats(
            &resume_profile,
            &jd_profile,
            &resume_text,
            &resume.text,
            weights,
        );
        Ok((resume_profile, jd_profile, ats))
    }

    /// Profile extraction alone, for the preview endpoint.
    pub fn extract(&self, document: &Document) -> Result<(NormalizedText, Profile), AppError> {
        let text = normalize(&document.text, document.kind, &self.lexicon)?;
        let profile = extract_profile(&text, document.kind, &self.vocabulary, &self.stopwords);
        Ok((text, profile))
    }

    async fn semantic_similarity(
        &self,
        resume_text: &NormalizedText,
        jd_text: &NormalizedText,
    ) -> Result<SimilarityResult, crate::embedding::EmbeddingError> {
        // Fragment order: resume doc, jd doc, resume sections, jd sections.
        let resume_sections: Vec<(String, String)> = embeddable_sections(resume_text);
        let jd_sections: Vec<(String, String)> = embeddable_sections(jd_text);

        let mut fragments = vec![resume_text.full_text.clone(), jd_text.full_text.clone()];
        fragments.extend(resume_sections.iter().map(|(_, body)| body.clone()));
        fragments.extend(jd_sections.iter().map(|(_, body)| body.clone()));

        let vectors = self.embed_all(&fragments).await?;

        let resume_doc = &vectors[0];
        let jd_doc = &vectors[1];
        let resume_vectors: Vec<SectionVector> = resume_sections
            .iter()
            .zip(&vectors[2..2 + resume_sections.len()])
            .map(|((label, _), vector)| SectionVector {
                label: label.clone(),
                vector: vector.clone(),
            })
            .collect();
        let jd_vectors: Vec<SectionVector> = jd_sections
            .iter()
            .zip(&vectors[2 + resume_sections.len()..])
            .map(|((label, _), vector)| SectionVector {
                label: label.clone(),
                vector: vector.clone(),
            })
            .collect();

        compare(resume_doc, jd_doc, &resume_vectors, &jd_vectors)
    }

    /// Embeds fragments, consulting the cache per fragment. Only cache
    /// misses go to the provider, in one batched call.
    async fn embed_all(
        &self,
        fragments: &[String],
    ) -> Result<Vec<EmbeddingVector>, crate::embedding::EmbeddingError> {
        let mut resolved: Vec<Option<EmbeddingVector>> = vec![None; fragments.len()];
        let mut miss_indices = Vec::new();
        let mut miss_texts = Vec::new();

        if let Some(cache) = &self.cache {
            for (i, fragment) in fragments.iter().enumerate() {
                let key = fingerprint(self.embedder.id(), fragment);
                match cache.get(&key).await {
                    Some(vector) if vector.dimension() == self.embedder.dimension() => {
                        resolved[i] = Some(vector);
                    }
                    _ => {
                        miss_indices.push(i);
                        miss_texts.push(fragment.clone());
                    }
                }
            }
            debug!(
                hits = fragments.len() - miss_indices.len(),
                misses = miss_indices.len(),
                "embedding cache consulted"
            );
        } else {
            miss_indices.extend(0..fragments.len());
            miss_texts.extend(fragments.iter().cloned());
        }

        if !miss_texts.is_empty() {
            let fresh = self.embedder.embed_batch(&miss_texts).await?;
            if let Some(cache) = &self.cache {
                for (text, vector) in miss_texts.iter().zip(&fresh) {
                    let key = fingerprint(self.embedder.id(), text);
                    cache.put(&key, vector).await;
                }
            }
            for (i, vector) in miss_indices.into_iter().zip(fresh) {
                resolved[i] = Some(vector);
            }
        }

        Ok(resolved.into_iter().map(|v| v.expect("all fragments resolved")).collect())
    }
}

/// Labelled sections with embeddable content. Unlabelled preamble and
/// empty bodies are excluded from section matching.
fn embeddable_sections(text: &NormalizedText) -> Vec<(String, String)> {
    text.sections
        .iter()
        .filter_map(|s| {
            let label = s.label.clone()?;
            let body = s.body();
            if body.trim().is_empty() {
                return None;
            }
            Some((label, body))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use async_trait::async_trait;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    const DIM: usize = 8;

    /// Deterministic offline provider: token-hash bag vectors, so identical
    /// texts embed identically and token overlap raises cosine similarity.
    struct StaticProvider;

    fn bag_vector(text: &str) -> Vec<f32> {
        let mut values = [0.0f32; DIM];
        for token in crate::matching::profile::tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            values[(hasher.finish() % DIM as u64) as usize] += 1.0;
        }
        values.to_vec()
    }

    #[async_trait]
    impl EmbeddingProvider for StaticProvider {
        fn id(&self) -> &str {
            "static:test"
        }
        fn dimension(&self) -> usize {
            DIM
        }
        async fn embed_batch(
            &self,
            fragments: &[String],
        ) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
            Ok(fragments
                .iter()
                .map(|f| EmbeddingVector::new("static:test", bag_vector(f)))
                .collect())
        }
    }

    /// Provider that always fails with a non-transient rejection.
    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn id(&self) -> &str {
            "failing:test"
        }
        fn dimension(&self) -> usize {
            DIM
        }
        async fn embed_batch(
            &self,
            _fragments: &[String],
        ) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
            Err(EmbeddingError::Rejected {
                status: 401,
                message: "invalid credentials".to_string(),
            })
        }
    }

    /// Provider that never completes within any reasonable deadline.
    struct SleepingProvider;

    #[async_trait]
    impl EmbeddingProvider for SleepingProvider {
        fn id(&self) -> &str {
            "sleeping:test"
        }
        fn dimension(&self) -> usize {
            DIM
        }
        async fn embed_batch(
            &self,
            fragments: &[String],
        ) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(fragments
                .iter()
                .map(|f| EmbeddingVector::new("sleeping:test", bag_vector(f)))
                .collect())
        }
    }

    fn pipeline_with(embedder: Arc<dyn EmbeddingProvider>) -> MatchPipeline {
        MatchPipeline::new(
            embedder,
            None,
            SkillVocabulary::default(),
            StopwordList::default(),
            HeaderLexicon::default(),
        )
    }

    fn resume_doc(text: &str) -> Document {
        Document::new(DocumentKind::Resume, "test-resume", text)
    }

    fn jd_doc(text: &str) -> Document {
        Document::new(DocumentKind::JobDescription, "test-jd", text)
    }

    const RESUME: &str = "Experience\nBuilt REST APIs using Go and PostgreSQL";
    const JD: &str = "Requirements\nGo, PostgreSQL, Kubernetes";

    #[tokio::test]
    async fn test_end_to_end_match_report() {
        let pipeline = pipeline_with(Arc::new(StaticProvider));
        let report = pipeline
            .run(resume_doc(RESUME), jd_doc(JD), &MatchOptions::default())
            .await
            .unwrap();

        assert!((report.ats.skills_coverage - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            report.recommendations[0].affected_keyword.as_deref(),
            Some("kubernetes")
        );
        assert!((0.0..=100.0).contains(&report.composite_score));
        assert!(!report.degraded);
        assert!(report.similarity.is_some());
    }

    #[tokio::test]
    async fn test_identical_documents_semantic_score_is_one() {
        let text = "Experience\nGo, PostgreSQL, Kubernetes services";
        let pipeline = pipeline_with(Arc::new(StaticProvider));
        let report = pipeline
            .run(resume_doc(text), jd_doc(text), &MatchOptions::default())
            .await
            .unwrap();
        let overall = report.similarity.unwrap().overall;
        assert!((overall - 1.0).abs() < 1e-6, "was {overall}");
        assert!((report.ats.keyword_match_rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_jd_is_reported_not_scored() {
        let pipeline = pipeline_with(Arc::new(StaticProvider));
        let err = pipeline
            .run(resume_doc(RESUME), jd_doc("   "), &MatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::EmptyInput {
                document: DocumentKind::JobDescription,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_without_fallback() {
        let pipeline = pipeline_with(Arc::new(FailingProvider));
        let err = pipeline
            .run(resume_doc(RESUME), jd_doc(JD), &MatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_with_fallback() {
        let pipeline = pipeline_with(Arc::new(FailingProvider));
        let options = MatchOptions {
            lexical_fallback: true,
            ..MatchOptions::default()
        };
        let report = pipeline
            .run(resume_doc(RESUME), jd_doc(JD), &options)
            .await
            .unwrap();
        assert!(report.degraded);
        assert!(report.similarity.is_none());
        assert!(report
            .degraded_reason
            .as_deref()
            .unwrap()
            .contains("invalid credentials"));
        assert!((report.composite_score - report.ats.composite).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_is_timeout() {
        let pipeline = pipeline_with(Arc::new(SleepingProvider));
        let options = MatchOptions {
            timeout: Duration::from_millis(250),
            ..MatchOptions::default()
        };
        let err = pipeline
            .run(resume_doc(RESUME), jd_doc(JD), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout { deadline_ms: 250 }));
    }

    #[tokio::test]
    async fn test_ats_only_analysis_never_calls_provider() {
        // A failing provider proves the lexical path is embedding-free.
        let pipeline = pipeline_with(Arc::new(FailingProvider));
        let (resume, jd, ats) = pipeline
            .analyze_ats(&resume_doc(RESUME), &jd_doc(JD), &AtsWeights::default())
            .unwrap();
        assert!(resume.has_skill("go"));
        assert!(jd.has_skill("kubernetes"));
        assert!((ats.skills_coverage - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_options_validation() {
        let mut options = MatchOptions::default();
        options.validate().unwrap();

        options.semantic_blend = 1.4;
        assert!(options.validate().is_err());

        options.semantic_blend = 0.5;
        options.timeout = Duration::ZERO;
        assert!(options.validate().is_err());

        options.timeout = Duration::from_secs(5);
        options.ats_weights.keyword_match = 0.9;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_embeddable_sections_skip_preamble() {
        let text = normalize(
            "Jane Doe\n\nExperience\nBuilt APIs",
            DocumentKind::Resume,
            &HeaderLexicon::default(),
        )
        .unwrap();
        let sections = embeddable_sections(&text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].0, "experience");
    }
}
