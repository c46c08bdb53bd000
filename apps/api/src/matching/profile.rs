//! Profile Extractor — derives a structured profile (skills, keyword
//! frequencies, experience entries) from normalized text.
//!
//! Deterministic and side-effect free: the same input and vocabulary always
//! produce the same profile. Experience parsing never fails the extraction;
//! a block that doesn't match the title/organization/date pattern degrades
//! to a description-only entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::matching::normalizer::NormalizedText;
use crate::matching::vocabulary::{SkillVocabulary, StopwordList};
use crate::matching::DocumentKind;

/// A general keyword with its occurrence count. Insertion order (first
/// occurrence in the document) is preserved — gap ranking depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub term: String,
    pub count: u32,
}

/// One position parsed from the resume's experience section. All header
/// fields are optional: a block that defies parsing still yields an entry
/// with just its description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub date_range: Option<String>,
    pub description: String,
}

/// Structured representation of one document.
///
/// Invariant: every skill also appears in `keywords`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Case-folded, deduplicated, in order of first occurrence.
    pub skills: Vec<String>,
    pub keywords: Vec<KeywordCount>,
    /// Resumes only; always empty for job descriptions.
    pub experience: Vec<ExperienceEntry>,
}

impl Profile {
    pub fn has_skill(&self, skill: &str) -> bool {
        let skill = skill.to_lowercase();
        self.skills.iter().any(|s| *s == skill)
    }

    pub fn has_keyword(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.keywords.iter().any(|k| k.term == term)
    }

    pub fn keyword_count(&self, term: &str) -> u32 {
        let term = term.to_lowercase();
        self.keywords
            .iter()
            .find(|k| k.term == term)
            .map(|k| k.count)
            .unwrap_or(0)
    }
}

pub fn extract_profile(
    text: &NormalizedText,
    kind: DocumentKind,
    vocabulary: &SkillVocabulary,
    stopwords: &StopwordList,
) -> Profile {
    let tokens = tokenize(&text.full_text);

    let mut keywords: Vec<KeywordCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let bump = |keywords: &mut Vec<KeywordCount>,
                index: &mut HashMap<String, usize>,
                term: &str| {
        if let Some(&i) = index.get(term) {
            keywords[i].count += 1;
        } else {
            index.insert(term.to_string(), keywords.len());
            keywords.push(KeywordCount {
                term: term.to_string(),
                count: 1,
            });
        }
    };

    let mut skills: Vec<String> = Vec::new();
    let push_skill = |skills: &mut Vec<String>, canonical: &str| {
        if !skills.iter().any(|s| s == canonical) {
            skills.push(canonical.to_string());
        }
    };

    // Single tokens: general keywords plus vocabulary skills.
    for token in &tokens {
        if let Some(canonical) = vocabulary.resolve(token) {
            push_skill(&mut skills, canonical);
        }
        if token.len() >= 3 && !stopwords.contains(token) && !token.chars().all(|c| c.is_numeric())
        {
            bump(&mut keywords, &mut index, token);
        }
    }

    // Multi-word vocabulary phrases ("machine learning", "spring boot").
    for window in 2..=3 {
        for phrase in tokens.windows(window) {
            let candidate = phrase.join(" ");
            if vocabulary.contains(&candidate) {
                push_skill(&mut skills, &candidate);
                bump(&mut keywords, &mut index, &candidate);
            }
        }
    }

    // Invariant: every skill appears in the keyword map. Short skill tokens
    // ("go", "r", "c++") are excluded from the general pass above, so count
    // their occurrences here.
    for skill in &skills {
        if !index.contains_key(skill) {
            let count = tokens.iter().filter(|t| *t == skill).count().max(1) as u32;
            index.insert(skill.clone(), keywords.len());
            keywords.push(KeywordCount {
                term: skill.clone(),
                count,
            });
        }
    }

    let experience = match kind {
        DocumentKind::Resume => extract_experience(text),
        DocumentKind::JobDescription => Vec::new(),
    };

    Profile {
        skills,
        keywords,
        experience,
    }
}

/// Lowercased tokens. Keeps `+`, `#`, and interior dots so "c++", "c#" and
/// "next.js" survive tokenization.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#' || c == '.' || c == '/'))
        .map(|t| t.trim_matches(|c| c == '.' || c == '/'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Experience extraction
// ────────────────────────────────────────────────────────────────────────────

const EXPERIENCE_LABELS: &[&str] = &["experience", "employment", "career history", "work history"];

fn extract_experience(text: &NormalizedText) -> Vec<ExperienceEntry> {
    let section = EXPERIENCE_LABELS
        .iter()
        .find_map(|label| text.section_containing(label));
    let Some(section) = section else {
        return Vec::new();
    };

    let mut entries: Vec<ExperienceEntry> = Vec::new();

    for paragraph in &section.paragraphs {
        let first_line = paragraph.lines().next().unwrap_or_default();
        match parse_entry_header(first_line) {
            Some(mut entry) => {
                entry.description = paragraph
                    .lines()
                    .skip(1)
                    .collect::<Vec<_>>()
                    .join("\n");
                entries.push(entry);
            }
            None => match entries.last_mut() {
                // Continuation of the previous entry's description.
                Some(last) => {
                    if !last.description.is_empty() {
                        last.description.push('\n');
                    }
                    last.description.push_str(paragraph);
                }
                // Parse miss with nothing to attach to: description-only entry.
                None => entries.push(ExperienceEntry {
                    title: None,
                    organization: None,
                    date_range: None,
                    description: paragraph.clone(),
                }),
            },
        }
    }

    entries
}

/// Attempts to parse a block's leading line as `Title at Organization
/// (dates)` or `Title, Organization, dates`. Returns None on a miss; the
/// caller decides how to degrade.
fn parse_entry_header(line: &str) -> Option<ExperienceEntry> {
    let (head, date_range) = split_date_range(line);
    let head = head.trim().trim_end_matches([',', '|', '—', '-']).trim();
    if head.is_empty() {
        return None;
    }

    let (title, organization) = split_title_organization(head)?;

    // A plausible title is short; long "heads" are prose, not headers.
    if title.split_whitespace().count() > 8 {
        return None;
    }
    // A bare capitalized line with neither organization nor dates is far
    // more likely to be description prose than a role header.
    if organization.is_none() && date_range.is_none() {
        return None;
    }

    Some(ExperienceEntry {
        title: Some(title),
        organization,
        date_range,
        description: String::new(),
    })
}

/// Splits a trailing date range off a header line. Recognizes a
/// parenthesized range ("(2019 - 2023)") or a trailing segment containing a
/// year ("Jan 2020 – Present").
fn split_date_range(line: &str) -> (String, Option<String>) {
    if let (Some(open), true) = (line.rfind('('), line.trim_end().ends_with(')')) {
        let inner = line[open + 1..line.trim_end().len() - 1].trim();
        if contains_year(inner) {
            return (line[..open].to_string(), Some(inner.to_string()));
        }
    }

    // Among candidate separators, take the longest tail that still looks
    // like a date range, so "Initech, Jan 2020 – Present" yields the full
    // range rather than just "Present".
    let mut best: Option<(usize, usize)> = None;
    for sep in [", ", " — ", " – ", " | "] {
        if let Some(pos) = line.rfind(sep) {
            let tail_start = pos + sep.len();
            let tail = line[tail_start..].trim();
            if contains_year(tail) && tail.split_whitespace().count() <= 5 {
                let longer = match best {
                    Some((_, start)) => tail.len() > line[start..].trim().len(),
                    None => true,
                };
                if longer {
                    best = Some((pos, tail_start));
                }
            }
        }
    }
    if let Some((pos, tail_start)) = best {
        return (
            line[..pos].to_string(),
            Some(line[tail_start..].trim().to_string()),
        );
    }

    (line.to_string(), None)
}

fn contains_year(text: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.contains("present") || lower.contains("current") {
        return true;
    }
    let bytes = text.as_bytes();
    bytes.windows(4).enumerate().any(|(i, w)| {
        w.iter().all(|b| b.is_ascii_digit())
            && (i == 0 || !bytes[i - 1].is_ascii_digit())
            && (i + 4 == bytes.len() || !bytes[i + 4].is_ascii_digit())
            && matches!(&text[i..i + 2], "19" | "20")
    })
}

fn split_title_organization(head: &str) -> Option<(String, Option<String>)> {
    for sep in [" at ", " — ", " – ", " | ", " @ "] {
        if let Some(pos) = head.find(sep) {
            let title = head[..pos].trim();
            let organization = head[pos + sep.len()..].trim();
            if title.is_empty() || organization.is_empty() {
                return None;
            }
            return Some((title.to_string(), Some(organization.to_string())));
        }
    }

    // "Title, Organization" — only when both halves are short.
    if let Some(pos) = head.find(", ") {
        let title = head[..pos].trim();
        let organization = head[pos + 2..].trim();
        if !title.is_empty()
            && !organization.is_empty()
            && title.split_whitespace().count() <= 5
            && organization.split_whitespace().count() <= 5
            && !organization.contains(", ")
        {
            return Some((title.to_string(), Some(organization.to_string())));
        }
        return None;
    }

    // Bare title line ("Senior Software Engineer") with a date we already
    // stripped, or a short title-cased line.
    if head.split_whitespace().count() <= 5 && looks_title_cased(head) {
        return Some((head.to_string(), None));
    }

    None
}

fn looks_title_cased(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }
    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    capitalized * 2 >= words.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::normalizer::{normalize, HeaderLexicon};

    fn extract(raw: &str, kind: DocumentKind) -> Profile {
        let text = normalize(raw, kind, &HeaderLexicon::default()).unwrap();
        extract_profile(
            &text,
            kind,
            &SkillVocabulary::default(),
            &StopwordList::default(),
        )
    }

    #[test]
    fn test_skills_found_from_vocabulary() {
        let profile = extract(
            "Experience: Built REST APIs using Go and PostgreSQL",
            DocumentKind::Resume,
        );
        assert!(profile.has_skill("go"));
        assert!(profile.has_skill("postgresql"));
        assert!(profile.has_skill("rest"));
        assert!(!profile.has_skill("kubernetes"));
    }

    #[test]
    fn test_skills_case_folded_and_deduplicated() {
        let profile = extract(
            "Skills: Go, go, GO, PostgreSQL and postgresql",
            DocumentKind::Resume,
        );
        let go_count = profile.skills.iter().filter(|s| *s == "go").count();
        assert_eq!(go_count, 1);
        assert!(profile.skills.iter().all(|s| *s == s.to_lowercase()));
    }

    #[test]
    fn test_every_skill_appears_in_keyword_map() {
        let profile = extract(
            "Requirements: Go, PostgreSQL, Kubernetes and machine learning",
            DocumentKind::JobDescription,
        );
        for skill in &profile.skills {
            assert!(
                profile.has_keyword(skill),
                "skill {skill} missing from keywords"
            );
        }
    }

    #[test]
    fn test_multi_word_phrase_detected() {
        let profile = extract(
            "Built machine learning pipelines with spring boot services",
            DocumentKind::Resume,
        );
        assert!(profile.has_skill("machine learning"));
        assert!(profile.has_skill("spring boot"));
    }

    #[test]
    fn test_stopwords_excluded_from_keywords() {
        let profile = extract(
            "The candidate must have experience with PostgreSQL",
            DocumentKind::JobDescription,
        );
        assert!(!profile.has_keyword("the"));
        assert!(!profile.has_keyword("must"));
        assert!(profile.has_keyword("postgresql"));
    }

    #[test]
    fn test_keyword_counts_accumulate() {
        let profile = extract(
            "PostgreSQL replication. PostgreSQL tuning. PostgreSQL backups.",
            DocumentKind::Resume,
        );
        assert_eq!(profile.keyword_count("postgresql"), 3);
    }

    #[test]
    fn test_keyword_insertion_order_preserved() {
        let profile = extract(
            "Requirements: Kubernetes, PostgreSQL, Kubernetes",
            DocumentKind::JobDescription,
        );
        let kubernetes_pos = profile
            .keywords
            .iter()
            .position(|k| k.term == "kubernetes")
            .unwrap();
        let postgres_pos = profile
            .keywords
            .iter()
            .position(|k| k.term == "postgresql")
            .unwrap();
        assert!(kubernetes_pos < postgres_pos);
    }

    #[test]
    fn test_tokenizer_keeps_symbol_skills() {
        let tokens = tokenize("C++ and C# with Next.js");
        assert!(tokens.contains(&"c++".to_string()));
        assert!(tokens.contains(&"c#".to_string()));
        assert!(tokens.contains(&"next.js".to_string()));
    }

    #[test]
    fn test_job_description_has_no_experience_entries() {
        let profile = extract(
            "Experience\n5+ years building services at scale",
            DocumentKind::JobDescription,
        );
        assert!(profile.experience.is_empty());
    }

    #[test]
    fn test_experience_header_with_at_and_dates() {
        let profile = extract(
            "Experience\nBackend Engineer at Acme Corp (2019 - 2023)\nBuilt billing APIs",
            DocumentKind::Resume,
        );
        assert_eq!(profile.experience.len(), 1);
        let entry = &profile.experience[0];
        assert_eq!(entry.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(entry.organization.as_deref(), Some("Acme Corp"));
        assert_eq!(entry.date_range.as_deref(), Some("2019 - 2023"));
        assert!(entry.description.contains("billing APIs"));
    }

    #[test]
    fn test_experience_header_comma_and_trailing_dates() {
        let profile = extract(
            "Experience\nData Engineer, Initech, Jan 2020 – Present\nOwned the warehouse",
            DocumentKind::Resume,
        );
        let entry = &profile.experience[0];
        assert_eq!(entry.title.as_deref(), Some("Data Engineer"));
        assert_eq!(entry.organization.as_deref(), Some("Initech"));
        assert_eq!(entry.date_range.as_deref(), Some("Jan 2020 – Present"));
    }

    #[test]
    fn test_experience_parse_miss_degrades_to_description_only() {
        let profile = extract(
            "Experience\nspent several years freelancing on various backend systems for clients",
            DocumentKind::Resume,
        );
        assert_eq!(profile.experience.len(), 1);
        let entry = &profile.experience[0];
        assert!(entry.title.is_none());
        assert!(entry.organization.is_none());
        assert!(entry.description.contains("freelancing"));
    }

    #[test]
    fn test_multiple_experience_entries_in_order() {
        let profile = extract(
            "Experience\nSenior Engineer at BigCo (2021 - 2024)\nLed the platform team\n\nEngineer at SmallCo (2018 - 2021)\nShipped the MVP",
            DocumentKind::Resume,
        );
        assert_eq!(profile.experience.len(), 2);
        assert_eq!(
            profile.experience[0].organization.as_deref(),
            Some("BigCo")
        );
        assert_eq!(
            profile.experience[1].organization.as_deref(),
            Some("SmallCo")
        );
    }

    #[test]
    fn test_resume_without_experience_section() {
        let profile = extract("Skills\nGo, PostgreSQL", DocumentKind::Resume);
        assert!(profile.experience.is_empty());
    }

    #[test]
    fn test_date_range_split_parenthesized() {
        let (head, dates) = split_date_range("Engineer at Acme (2019 - 2023)");
        assert_eq!(head.trim(), "Engineer at Acme");
        assert_eq!(dates.as_deref(), Some("2019 - 2023"));
    }

    #[test]
    fn test_date_range_absent() {
        let (head, dates) = split_date_range("Engineer at Acme");
        assert_eq!(head, "Engineer at Acme");
        assert!(dates.is_none());
    }

    #[test]
    fn test_contains_year() {
        assert!(contains_year("2019 - 2023"));
        assert!(contains_year("Jan 2020 – Present"));
        assert!(!contains_year("room 12345"));
        assert!(!contains_year("since forever"));
    }
}
