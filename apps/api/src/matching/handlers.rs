//! Axum route handlers for the Match API.

use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::ats::{AtsScore, AtsWeights};
use crate::matching::pipeline::MatchOptions;
use crate::matching::profile::Profile;
use crate::matching::report::MatchReport;
use crate::matching::{Document, DocumentKind};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Caller-supplied option overrides. Everything is optional; whatever is
/// absent falls back to the server defaults. Overrides are validated before
/// any document is processed.
#[derive(Debug, Default, Deserialize)]
pub struct MatchOptionOverrides {
    pub ats_weights: Option<AtsWeights>,
    pub semantic_blend: Option<f64>,
    pub weak_section_threshold: Option<f64>,
    pub timeout_ms: Option<u64>,
    pub lexical_fallback: Option<bool>,
}

impl MatchOptionOverrides {
    pub fn resolve(&self, defaults: &MatchOptions) -> Result<MatchOptions, AppError> {
        let options = MatchOptions {
            ats_weights: self.ats_weights.unwrap_or(defaults.ats_weights),
            semantic_blend: self.semantic_blend.unwrap_or(defaults.semantic_blend),
            weak_section_threshold: self
                .weak_section_threshold
                .unwrap_or(defaults.weak_section_threshold),
            timeout: self
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            lexical_fallback: self.lexical_fallback.unwrap_or(defaults.lexical_fallback),
        };
        options.validate()?;
        Ok(options)
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_text: String,
    pub jd_text: String,
    #[serde(default)]
    pub options: MatchOptionOverrides,
}

#[derive(Debug, Deserialize)]
pub struct AtsScoreRequest {
    pub resume_text: String,
    pub jd_text: String,
    pub ats_weights: Option<AtsWeights>,
}

#[derive(Debug, Serialize)]
pub struct AtsScoreResponse {
    pub resume_profile: Profile,
    pub job_profile: Profile,
    pub ats: AtsScore,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub text: String,
    pub kind: DocumentKind,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
    /// Section labels found during normalization, in document order.
    pub sections: Vec<Option<String>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/match
///
/// Full pipeline: normalize → profile → embed → similarity → ATS → report.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchReport>, AppError> {
    validate_texts(&request.resume_text, &request.jd_text)?;
    let options = request.options.resolve(&state.options)?;

    let resume = Document::new(DocumentKind::Resume, "upload", request.resume_text);
    let jd = Document::new(DocumentKind::JobDescription, "upload", request.jd_text);

    let report = state.pipeline.run(resume, jd, &options).await?;
    Ok(Json(report))
}

/// POST /api/v1/match/ats
///
/// Lexical-only analysis. Never touches the embedding provider — useful as
/// a fast preview and as the manual degraded path.
pub async fn handle_ats_score(
    State(state): State<AppState>,
    Json(request): Json<AtsScoreRequest>,
) -> Result<Json<AtsScoreResponse>, AppError> {
    validate_texts(&request.resume_text, &request.jd_text)?;
    let weights = request.ats_weights.unwrap_or(state.options.ats_weights);
    weights.validate()?;

    let resume = Document::new(DocumentKind::Resume, "upload", request.resume_text);
    let jd = Document::new(DocumentKind::JobDescription, "upload", request.jd_text);

    let (resume_profile, job_profile, ats) = state.pipeline.analyze_ats(&resume, &jd, &weights)?;
    Ok(Json(AtsScoreResponse {
        resume_profile,
        job_profile,
        ats,
    }))
}

/// POST /api/v1/profile
///
/// Profile-extraction preview for a single document, so callers can see
/// what the matcher sees before running a full match.
pub async fn handle_extract_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let document = Document::new(request.kind, "upload", request.text);
    let (text, profile) = state.pipeline.extract(&document)?;

    Ok(Json(ProfileResponse {
        profile,
        sections: text.sections.into_iter().map(|s| s.label).collect(),
    }))
}

fn validate_texts(resume_text: &str, jd_text: &str) -> Result<(), AppError> {
    if resume_text.trim().is_empty() {
        return Err(AppError::Validation(
            "resume_text cannot be empty".to_string(),
        ));
    }
    if jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }
    Ok(())
}
