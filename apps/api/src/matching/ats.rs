//! ATS Compatibility Scorer — lexical and structural compatibility between
//! a resume and a job description, independent of embeddings.
//!
//! Four sub-scores, each in [0,1] before weighting: keyword match rate,
//! skills coverage, readability, and format compliance. The composite is
//! their weighted sum scaled to [0,100]. Keyword match and skills coverage
//! carry most of the weight; the two heuristics are advisory.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::normalizer::NormalizedText;
use crate::matching::profile::{tokenize, Profile};

/// Sub-score weights. Must sum to 1; validated before any document is
/// processed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtsWeights {
    pub keyword_match: f64,
    pub skills_coverage: f64,
    pub readability: f64,
    pub format_compliance: f64,
}

impl Default for AtsWeights {
    fn default() -> Self {
        Self {
            keyword_match: 0.40,
            skills_coverage: 0.30,
            readability: 0.15,
            format_compliance: 0.15,
        }
    }
}

impl AtsWeights {
    pub fn validate(&self) -> Result<(), AppError> {
        let weights = [
            self.keyword_match,
            self.skills_coverage,
            self.readability,
            self.format_compliance,
        ];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(AppError::Configuration(
                "ATS weights must each lie in [0,1]".to_string(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(AppError::Configuration(format!(
                "ATS weights must sum to 1, got {sum}"
            )));
        }
        Ok(())
    }
}

/// A job keyword found in the resume, with how often the resume uses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedKeyword {
    pub term: String,
    pub resume_count: u32,
}

/// Resume experience level estimated from the text, used to pick the
/// word-count band the length heuristic scores against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
}

impl ExperienceLevel {
    /// Optimal resume word-count band for this level.
    fn word_band(self) -> (usize, usize) {
        match self {
            ExperienceLevel::Entry => (300, 500),
            ExperienceLevel::Mid => (400, 700),
            ExperienceLevel::Senior => (500, 800),
            ExperienceLevel::Executive => (600, 1000),
        }
    }
}

/// Full ATS analysis for one (resume, job description) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtsScore {
    /// Weighted composite in [0,100].
    pub composite: f64,
    pub keyword_match_rate: f64,
    pub skills_coverage: f64,
    pub readability: f64,
    pub format_compliance: f64,
    pub matched_keywords: Vec<MatchedKeyword>,
    pub missing_keywords: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Matched keyword occurrences per 100 resume words.
    pub keyword_density: f64,
    pub experience_level: ExperienceLevel,
    pub format_issues: Vec<String>,
}

/// Scores the resume profile against the job profile. `resume_raw` is the
/// pre-normalization text: format analysis must see the decorative bullets
/// and tab runs the normalizer strips.
pub fn score_ats(
    resume: &Profile,
    jd: &Profile,
    resume_text: &NormalizedText,
    resume_raw: &str,
    weights: &AtsWeights,
) -> AtsScore {
    let (keyword_match_rate, matched_keywords, missing_keywords) = keyword_overlap(resume, jd);
    let (skills_coverage, missing_skills) = skills_overlap(resume, jd);
    let experience_level = estimate_experience_level(&resume_text.full_text);
    let readability = readability_score(resume_text, experience_level);
    let (format_compliance, format_issues) = format_compliance_score(resume_raw, resume_text);

    let composite = (weights.keyword_match * keyword_match_rate
        + weights.skills_coverage * skills_coverage
        + weights.readability * readability
        + weights.format_compliance * format_compliance)
        .clamp(0.0, 1.0)
        * 100.0;

    let keyword_density = keyword_density(resume_text, &matched_keywords);

    AtsScore {
        composite,
        keyword_match_rate,
        skills_coverage,
        readability,
        format_compliance,
        matched_keywords,
        missing_keywords,
        missing_skills,
        keyword_density,
        experience_level,
        format_issues,
    }
}

/// |resume ∩ job| / |job| over general keywords. An empty job keyword set
/// scores 0 — there is nothing to match against, so the rate is reported as
/// the degenerate zero rather than dividing by zero.
fn keyword_overlap(resume: &Profile, jd: &Profile) -> (f64, Vec<MatchedKeyword>, Vec<String>) {
    if jd.keywords.is_empty() {
        return (0.0, Vec::new(), Vec::new());
    }

    let mut matched = Vec::new();
    let mut missing = Vec::new();
    for keyword in &jd.keywords {
        let resume_count = resume.keyword_count(&keyword.term);
        if resume_count > 0 {
            matched.push(MatchedKeyword {
                term: keyword.term.clone(),
                resume_count,
            });
        } else {
            missing.push(keyword.term.clone());
        }
    }

    let rate = matched.len() as f64 / jd.keywords.len() as f64;
    (rate, matched, missing)
}

/// |resume ∩ job| / |job| over vocabulary skills, same empty-set rule.
fn skills_overlap(resume: &Profile, jd: &Profile) -> (f64, Vec<String>) {
    if jd.skills.is_empty() {
        return (0.0, Vec::new());
    }

    let missing: Vec<String> = jd
        .skills
        .iter()
        .filter(|s| !resume.has_skill(s))
        .cloned()
        .collect();
    let covered = jd.skills.len() - missing.len();
    (covered as f64 / jd.skills.len() as f64, missing)
}

/// Readability heuristic in [0,1]: average sentence length against an ideal
/// band, vocabulary diversity, and word count against the band for the
/// estimated experience level. Resume-only; the job description plays no
/// part.
fn readability_score(text: &NormalizedText, level: ExperienceLevel) -> f64 {
    let words = tokenize(&text.full_text);
    if words.is_empty() {
        return 0.0;
    }

    // Sentence length: 8–26 words reads well for a resume line.
    let sentences: Vec<&str> = text
        .full_text
        .split(|c| c == '.' || c == '!' || c == '?' || c == '\n')
        .filter(|s| s.split_whitespace().count() > 0)
        .collect();
    let avg_len = words.len() as f64 / sentences.len().max(1) as f64;
    let sentence_score = if (8.0..=26.0).contains(&avg_len) {
        1.0
    } else if avg_len < 8.0 {
        avg_len / 8.0
    } else {
        (26.0 / avg_len).max(0.0)
    };

    // Vocabulary diversity: type-token ratio, saturating at 0.6.
    let unique: std::collections::HashSet<&String> = words.iter().collect();
    let diversity = (unique.len() as f64 / words.len() as f64 / 0.6).min(1.0);

    // Length against the level's band.
    let (min_words, max_words) = level.word_band();
    let count = words.len();
    let length_score = if count < min_words {
        count as f64 / min_words as f64
    } else if count > max_words {
        max_words as f64 / count as f64
    } else {
        1.0
    };

    ((sentence_score + diversity + length_score) / 3.0).clamp(0.0, 1.0)
}

const EXPECTED_SECTIONS: &[&str] = &["experience", "education", "skills"];
const DECORATIVE_GLYPHS: &[char] = &['★', '◆', '→', '❖', '✦', '♦'];

/// Format compliance in [0,1]: expected sections present, contact info
/// findable, and no elements known to break automated parsers.
fn format_compliance_score(raw: &str, text: &NormalizedText) -> (f64, Vec<String>) {
    let mut score = 1.0f64;
    let mut issues = Vec::new();

    let mut missing_sections = Vec::new();
    for section in EXPECTED_SECTIONS {
        if !text.has_section(section) {
            missing_sections.push(*section);
        }
    }
    if !missing_sections.is_empty() {
        score -= 0.15 * missing_sections.len() as f64;
        issues.push(format!(
            "Missing standard section headers: {}",
            missing_sections.join(", ")
        ));
    }

    if !has_contact_info(raw) {
        score -= 0.15;
        issues.push("No email address or phone number found".to_string());
    }

    let tab_count = raw.matches('\t').count();
    if tab_count > 10 {
        score -= 0.1;
        issues.push("Excessive tab characters suggest a table layout".to_string());
    }

    for glyph in DECORATIVE_GLYPHS {
        if raw.contains(*glyph) {
            score -= 0.05;
            issues.push(format!(
                "Decorative character '{glyph}' may confuse automated parsers"
            ));
        }
    }

    // Runs of spaces mid-line are the classic multi-column export artifact.
    let columnar_lines = raw
        .lines()
        .filter(|l| l.trim().contains("    "))
        .count();
    if columnar_lines > 5 {
        score -= 0.1;
        issues.push("Multi-column layout detected; single column parses best".to_string());
    }

    (score.clamp(0.0, 1.0), issues)
}

fn has_contact_info(raw: &str) -> bool {
    let has_email = raw
        .split_whitespace()
        .any(|w| w.contains('@') && w.contains('.'));
    if has_email {
        return true;
    }
    // Phone: any run of 10+ digits ignoring separators.
    let mut digits = 0usize;
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits += 1;
            if digits >= 10 {
                return true;
            }
        } else if !matches!(c, ' ' | '-' | '(' | ')' | '+' | '.') {
            digits = 0;
        }
    }
    false
}

fn keyword_density(text: &NormalizedText, matched: &[MatchedKeyword]) -> f64 {
    let total_words = tokenize(&text.full_text).len();
    if total_words == 0 {
        return 0.0;
    }
    let occurrences: u32 = matched.iter().map(|m| m.resume_count).sum();
    f64::from(occurrences) / total_words as f64 * 100.0
}

/// Estimates seniority from "N+ years" phrases, falling back to title
/// indicators, then to length.
pub fn estimate_experience_level(text: &str) -> ExperienceLevel {
    if let Some(years) = max_years_of_experience(text) {
        return match years {
            0..=2 => ExperienceLevel::Entry,
            3..=5 => ExperienceLevel::Mid,
            6..=10 => ExperienceLevel::Senior,
            _ => ExperienceLevel::Executive,
        };
    }

    let lower = text.to_lowercase();
    let executive = ["chief", "vp", "vice president", "director", "cto", "ceo"];
    let senior = ["senior", "lead", "principal", "architect", "staff"];
    if executive.iter().any(|t| lower.contains(t)) {
        return ExperienceLevel::Executive;
    }
    if senior.iter().any(|t| lower.contains(t)) {
        return ExperienceLevel::Senior;
    }

    match text.split_whitespace().count() {
        0..=400 => ExperienceLevel::Entry,
        401..=600 => ExperienceLevel::Mid,
        _ => ExperienceLevel::Senior,
    }
}

/// Largest N from "N years", "N+ years", "N yrs" phrases.
fn max_years_of_experience(text: &str) -> Option<u32> {
    let tokens = tokenize(text);
    let mut max: Option<u32> = None;
    for window in tokens.windows(2) {
        let number = window[0].trim_end_matches('+');
        let Ok(n) = number.parse::<u32>() else {
            continue;
        };
        if n > 60 {
            continue; // a year like "2019", not a duration
        }
        if matches!(window[1].as_str(), "years" | "year" | "yrs" | "yr") {
            max = Some(max.map_or(n, |m| m.max(n)));
        }
    }
    max
}
