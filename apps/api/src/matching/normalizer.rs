//! Text Normalizer — cleans raw extracted document text into ordered,
//! labelled sections of paragraphs.
//!
//! Input is text already pulled out of a PDF/DOCX by an external extractor,
//! so it arrives with hyphenated line-wraps, stray control characters, and
//! decorative bullets. Everything downstream (profile extraction, embedding,
//! readability) works off the `NormalizedText` produced here.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::DocumentKind;

/// Headers recognized as section boundaries, matched case-insensitively
/// after trimming a trailing colon. Configurable; defaults cover the
/// vocabulary ATS parsers expect.
#[derive(Debug, Clone)]
pub struct HeaderLexicon {
    headers: Vec<String>,
}

const DEFAULT_HEADERS: &[&str] = &[
    "summary",
    "professional summary",
    "objective",
    "profile",
    "about me",
    "experience",
    "work experience",
    "professional experience",
    "employment",
    "employment history",
    "career history",
    "education",
    "academic background",
    "qualifications",
    "skills",
    "technical skills",
    "competencies",
    "technologies",
    "expertise",
    "projects",
    "certifications",
    "licenses",
    "credentials",
    "contact",
    "contact information",
    "personal details",
    "requirements",
    "responsibilities",
    "about us",
    "benefits",
    "languages",
    "achievements",
];

impl Default for HeaderLexicon {
    fn default() -> Self {
        Self {
            headers: DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl HeaderLexicon {
    /// Parses one header per line; blank lines and `#` comments are skipped.
    pub fn from_lines(input: &str) -> Self {
        let headers = input
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| l.to_lowercase())
            .collect();
        Self { headers }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        let needle = candidate.trim().trim_end_matches(':').trim().to_lowercase();
        self.headers.iter().any(|h| *h == needle)
    }
}

/// One labelled section of a normalized document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Lowercased header text; None for content before the first header.
    pub label: Option<String>,
    pub paragraphs: Vec<String>,
}

impl Section {
    pub fn body(&self) -> String {
        self.paragraphs.join("\n")
    }
}

/// Cleaned document text split into sections. Paragraph order is preserved;
/// sections that end up empty are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedText {
    pub sections: Vec<Section>,
    /// The full cleaned text, used for whole-document embedding and
    /// readability analysis.
    pub full_text: String,
}

impl NormalizedText {
    /// First section whose label contains `fragment` (case-insensitive).
    pub fn section_containing(&self, fragment: &str) -> Option<&Section> {
        let fragment = fragment.to_lowercase();
        self.sections
            .iter()
            .find(|s| s.label.as_deref().is_some_and(|l| l.contains(&fragment)))
    }

    pub fn has_section(&self, fragment: &str) -> bool {
        self.section_containing(fragment).is_some()
    }
}

const BULLET_MARKERS: &[char] = &['•', '‣', '▪', '▫', '◦', '◆', '★', '→', '*', '-'];

/// Normalizes raw extracted text. `EmptyInputError` (as
/// `AppError::EmptyInput`) when no tokens survive cleaning.
pub fn normalize(
    raw: &str,
    kind: DocumentKind,
    lexicon: &HeaderLexicon,
) -> Result<NormalizedText, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::EmptyInput {
            document: kind,
            detail: "document text is empty".to_string(),
        });
    }

    let cleaned = strip_control_chars(raw);
    let rejoined = rejoin_hyphenated_wraps(&cleaned);

    let mut sections: Vec<Section> = Vec::new();
    let mut current = Section {
        label: None,
        paragraphs: Vec::new(),
    };
    let mut pending: Vec<String> = Vec::new();

    // Paragraphs keep their internal line structure so downstream parsing
    // (experience headers) can still see the leading line.
    let flush_paragraph = |current: &mut Section, pending: &mut Vec<String>| {
        if !pending.is_empty() {
            current.paragraphs.push(pending.join("\n"));
            pending.clear();
        }
    };

    for line in rejoined.lines() {
        let (was_bullet, stripped) = strip_bullet_marker(line);
        let collapsed = collapse_whitespace(&stripped);

        if collapsed.is_empty() {
            flush_paragraph(&mut current, &mut pending);
            continue;
        }

        if !was_bullet && is_section_header(&collapsed, lexicon) {
            flush_paragraph(&mut current, &mut pending);
            if !current.paragraphs.is_empty() {
                sections.push(current);
            }
            current = Section {
                label: Some(
                    collapsed
                        .trim_end_matches(':')
                        .trim()
                        .to_lowercase(),
                ),
                paragraphs: Vec::new(),
            };
            continue;
        }

        if was_bullet {
            // Bullet items stand alone as paragraphs.
            flush_paragraph(&mut current, &mut pending);
            current.paragraphs.push(collapsed);
        } else {
            pending.push(collapsed);
        }
    }
    flush_paragraph(&mut current, &mut pending);
    if !current.paragraphs.is_empty() {
        sections.push(current);
    }

    let full_text = sections
        .iter()
        .flat_map(|s| s.label.iter().cloned().chain(s.paragraphs.iter().cloned()))
        .collect::<Vec<_>>()
        .join("\n");

    if !full_text.chars().any(|c| c.is_alphanumeric()) {
        return Err(AppError::EmptyInput {
            document: kind,
            detail: "no extractable tokens after cleaning".to_string(),
        });
    }

    Ok(NormalizedText {
        sections,
        full_text,
    })
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .collect()
}

/// Rejoins words the extractor split across lines with a trailing hyphen
/// ("devel-\nopment" → "development"). Only fires when the next line starts
/// lowercase, so real hyphenated compounds at line ends survive.
fn rejoin_hyphenated_wraps(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '-' {
            let rest = &text[i + 1..];
            let after_newline = rest.strip_prefix('\n');
            if let Some(after) = after_newline {
                if after
                    .chars()
                    .next()
                    .is_some_and(|n| n.is_lowercase())
                {
                    // Skip the newline; the word continues.
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn strip_bullet_marker(line: &str) -> (bool, String) {
    let trimmed = line.trim_start();
    for marker in BULLET_MARKERS {
        if let Some(rest) = trimmed.strip_prefix(*marker) {
            // Require whitespace after '-' and '*' so negative numbers and
            // emphasis don't register as bullets.
            if (*marker == '-' || *marker == '*') && !rest.starts_with(char::is_whitespace) {
                continue;
            }
            return (true, rest.trim_start().to_string());
        }
    }
    (false, line.to_string())
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A line is a section header when it matches the lexicon, or when it is a
/// short all-caps line ("EXPERIENCE", "TECHNICAL SKILLS").
fn is_section_header(line: &str, lexicon: &HeaderLexicon) -> bool {
    if lexicon.contains(line) {
        return true;
    }
    let word_count = line.split_whitespace().count();
    if word_count == 0 || word_count > 4 || line.len() > 40 {
        return false;
    }
    let has_letter = line.chars().any(|c| c.is_alphabetic());
    has_letter
        && line
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize_resume(raw: &str) -> NormalizedText {
        normalize(raw, DocumentKind::Resume, &HeaderLexicon::default()).unwrap()
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = normalize("   \n\n ", DocumentKind::JobDescription, &HeaderLexicon::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::EmptyInput {
                document: DocumentKind::JobDescription,
                ..
            }
        ));
    }

    #[test]
    fn test_punctuation_only_input_is_an_error() {
        let err =
            normalize("--- ***\n!!!", DocumentKind::Resume, &HeaderLexicon::default()).unwrap_err();
        assert!(matches!(err, AppError::EmptyInput { .. }));
    }

    #[test]
    fn test_whitespace_collapsed() {
        let text = normalize_resume("Built   REST\t\tAPIs   using Go");
        assert_eq!(text.sections[0].paragraphs[0], "Built REST APIs using Go");
    }

    #[test]
    fn test_control_characters_stripped() {
        let text = normalize_resume("Built\u{0} REST APIs\u{7} using Go");
        assert_eq!(text.full_text, "Built REST APIs using Go");
    }

    #[test]
    fn test_hyphenated_wrap_rejoined() {
        let text = normalize_resume("Led microservice devel-\nopment in Go");
        assert_eq!(
            text.sections[0].paragraphs[0],
            "Led microservice development in Go"
        );
    }

    #[test]
    fn test_hyphen_before_capital_preserved() {
        // A line ending in a hyphen followed by a capitalized line is not a wrap.
        let text = normalize_resume("Worked on X-\nRay imaging pipelines");
        assert!(text.full_text.contains("X-"));
    }

    #[test]
    fn test_sections_split_on_lexicon_headers() {
        let text = normalize_resume(
            "Jane Doe\n\nExperience:\nBuilt REST APIs using Go\n\nSkills\nGo, PostgreSQL",
        );
        let labels: Vec<_> = text.sections.iter().map(|s| s.label.clone()).collect();
        assert_eq!(
            labels,
            vec![
                None,
                Some("experience".to_string()),
                Some("skills".to_string())
            ]
        );
    }

    #[test]
    fn test_sections_split_on_all_caps_lines() {
        let text = normalize_resume("WORK HISTORY\nBuilt things\n\nTECH STACK\nGo and Rust");
        let labels: Vec<_> = text
            .sections
            .iter()
            .filter_map(|s| s.label.clone())
            .collect();
        assert_eq!(labels, vec!["work history", "tech stack"]);
    }

    #[test]
    fn test_empty_sections_dropped() {
        let text = normalize_resume("Experience:\n\nSkills\nGo, PostgreSQL");
        // "experience" has no content, so only "skills" survives.
        assert_eq!(text.sections.len(), 1);
        assert_eq!(text.sections[0].label.as_deref(), Some("skills"));
    }

    #[test]
    fn test_paragraph_order_preserved() {
        let text = normalize_resume("Experience\nFirst role\n\nSecond role\n\nThird role");
        assert_eq!(
            text.sections[0].paragraphs,
            vec!["First role", "Second role", "Third role"]
        );
    }

    #[test]
    fn test_bullets_become_standalone_paragraphs() {
        let text = normalize_resume("Experience\n• Built APIs\n• Led a team\nof four");
        assert_eq!(
            text.sections[0].paragraphs,
            vec!["Built APIs", "Led a team", "of four"]
        );
    }

    #[test]
    fn test_dash_bullet_requires_space() {
        let text = normalize_resume("Scored -3 versus baseline");
        assert_eq!(text.sections[0].paragraphs[0], "Scored -3 versus baseline");
    }

    #[test]
    fn test_section_lookup_by_fragment() {
        let text = normalize_resume("Work Experience\nBuilt APIs");
        assert!(text.has_section("experience"));
        assert!(!text.has_section("education"));
    }

    #[test]
    fn test_custom_lexicon_from_lines() {
        let lexicon = HeaderLexicon::from_lines("# comment\n\nwerdegang\nkenntnisse\n");
        assert!(lexicon.contains("Werdegang:"));
        assert!(lexicon.contains("kenntnisse"));
        assert!(!lexicon.contains("# comment"));
    }
}
