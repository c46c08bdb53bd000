//! Similarity Engine — semantic distance between resume and job-description
//! vectors, at document and per-section granularity.
//!
//! Pure and deterministic: identical input vectors always produce identical
//! scores. All provider/dimension compatibility checks happen here before
//! any arithmetic.

use serde::{Deserialize, Serialize};

use crate::embedding::{EmbeddingError, EmbeddingVector};

/// Best resume match for one job-description section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionScore {
    pub jd_label: String,
    pub resume_label: String,
    /// Rescaled cosine in [0,1].
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Whole-document semantic score in [0,1].
    pub overall: f64,
    pub sections: Vec<SectionScore>,
}

/// A section's embedding alongside its label.
#[derive(Debug, Clone)]
pub struct SectionVector {
    pub label: String,
    pub vector: EmbeddingVector,
}

/// Cosine similarity in [-1,1]. Zero-magnitude vectors score 0 rather than
/// dividing by zero.
pub fn cosine(a: &EmbeddingVector, b: &EmbeddingVector) -> Result<f64, EmbeddingError> {
    a.check_comparable(b)?;

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.values.iter().zip(&b.values) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Maps cosine from [-1,1] to [0,1].
pub fn rescale(cosine: f64) -> f64 {
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Compares two documents. Per-section matching is greedy: each JD section
/// takes its best-scoring resume section, and a resume section may be the
/// best match for more than one JD section.
pub fn compare(
    resume_doc: &EmbeddingVector,
    jd_doc: &EmbeddingVector,
    resume_sections: &[SectionVector],
    jd_sections: &[SectionVector],
) -> Result<SimilarityResult, EmbeddingError> {
    let overall = rescale(cosine(resume_doc, jd_doc)?);

    let mut sections = Vec::with_capacity(jd_sections.len());
    for jd_section in jd_sections {
        let mut best: Option<(&SectionVector, f64)> = None;
        for resume_section in resume_sections {
            let score = cosine(&resume_section.vector, &jd_section.vector)?;
            let better = match best {
                Some((_, current)) => score > current,
                None => true,
            };
            if better {
                best = Some((resume_section, score));
            }
        }
        if let Some((winner, score)) = best {
            sections.push(SectionScore {
                jd_label: jd_section.label.clone(),
                resume_label: winner.label.clone(),
                score: rescale(score),
            });
        }
    }

    Ok(SimilarityResult { overall, sections })
}
