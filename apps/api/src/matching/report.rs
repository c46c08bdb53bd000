//! Composite Scorer & Gap Analyzer — merges semantic and lexical signals
//! into the final `MatchReport` with ranked, actionable recommendations.
//!
//! The report is the pipeline's only artifact: immutable once produced,
//! serialized under a stable versioned schema so the presentation layer
//! renders it without re-deriving anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching::ats::AtsScore;
use crate::matching::profile::Profile;
use crate::matching::similarity::SimilarityResult;

/// Bump when the serialized report shape changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    MissingKeyword,
    WeakSectionMatch,
    FormatIssue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub affected_keyword: Option<String>,
}

/// Final artifact for one (resume, job description) pair. A new request
/// produces a new report; nothing here is ever mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub schema_version: u32,
    pub request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub resume_profile: Profile,
    pub job_profile: Profile,
    /// None only on a degraded, lexical-only report.
    pub similarity: Option<SimilarityResult>,
    pub ats: AtsScore,
    /// Blended final score in [0,100].
    pub composite_score: f64,
    pub recommendations: Vec<Recommendation>,
    /// True when the semantic half was skipped (provider failure with the
    /// lexical fallback enabled). Never silently — the reason is recorded.
    pub degraded: bool,
    pub degraded_reason: Option<String>,
}

/// Blends the semantic overall score (in [0,1]) with the ATS composite (in
/// [0,100]). `blend` is the semantic share.
pub fn blend_scores(semantic_overall: f64, ats_composite: f64, blend: f64) -> f64 {
    (blend * semantic_overall * 100.0 + (1.0 - blend) * ats_composite).clamp(0.0, 100.0)
}

/// Enumerates job-side keywords and skills the resume lacks, plus weak
/// section matches and format issues. Ordering is deterministic:
/// missing keywords by job-side frequency descending (ties in job
/// insertion order), then weak sections in JD section order, then format
/// issues.
pub fn analyze_gaps(
    resume: &Profile,
    jd: &Profile,
    similarity: Option<&SimilarityResult>,
    ats: &AtsScore,
    weak_section_threshold: f64,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    // Missing keywords. jd.keywords preserves insertion order, and the sort
    // is stable, so equal frequencies keep that order.
    let mut missing: Vec<(&str, u32, bool)> = jd
        .keywords
        .iter()
        .filter(|k| !resume.has_keyword(&k.term) && !resume.has_skill(&k.term))
        .map(|k| (k.term.as_str(), k.count, jd.has_skill(&k.term)))
        .collect();
    missing.sort_by(|a, b| b.1.cmp(&a.1));

    for (term, count, is_skill) in missing {
        let message = if is_skill {
            format!(
                "The job calls for \"{term}\" ({count}x) but the resume never mentions it. Add it to your skills or experience if you have it."
            )
        } else {
            format!(
                "\"{term}\" appears {count}x in the job description but not in the resume."
            )
        };
        recommendations.push(Recommendation {
            kind: RecommendationKind::MissingKeyword,
            message,
            affected_keyword: Some(term.to_string()),
        });
    }

    // Weak section matches, in JD section order.
    if let Some(similarity) = similarity {
        for section in &similarity.sections {
            if section.score < weak_section_threshold {
                recommendations.push(Recommendation {
                    kind: RecommendationKind::WeakSectionMatch,
                    message: format!(
                        "Job section \"{}\" is only weakly covered (best match: resume \"{}\", score {:.2}). Consider expanding that part of the resume.",
                        section.jd_label, section.resume_label, section.score
                    ),
                    affected_keyword: None,
                });
            }
        }
    }

    for issue in &ats.format_issues {
        recommendations.push(Recommendation {
            kind: RecommendationKind::FormatIssue,
            message: issue.clone(),
            affected_keyword: None,
        });
    }

    recommendations
}

/// Assembles the final report from its parts.
#[allow(clippy::too_many_arguments)]
pub fn build_report(
    resume_profile: Profile,
    job_profile: Profile,
    similarity: Option<SimilarityResult>,
    ats: AtsScore,
    blend: f64,
    weak_section_threshold: f64,
    degraded_reason: Option<String>,
) -> MatchReport {
    let recommendations = analyze_gaps(
        &resume_profile,
        &job_profile,
        similarity.as_ref(),
        &ats,
        weak_section_threshold,
    );

    // Degraded reports have no semantic half: the ATS composite stands
    // alone rather than being silently blended with a default.
    let composite_score = match &similarity {
        Some(s) => blend_scores(s.overall, ats.composite, blend),
        None => ats.composite,
    };

    MatchReport {
        schema_version: SCHEMA_VERSION,
        request_id: Uuid::new_v4(),
        created_at: Utc::now(),
        resume_profile,
        job_profile,
        similarity,
        ats,
        composite_score,
        recommendations,
        degraded: degraded_reason.is_some(),
        degraded_reason,
    }
}
