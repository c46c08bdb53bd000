//! Skill vocabulary and stopword list, supplied as configuration data.
//!
//! Both ship with compiled-in defaults and can be replaced wholesale from a
//! plain-text file (one entry per line). The vocabulary matches exact
//! case-insensitive tokens and phrases, plus near-miss single tokens at
//! edit distance 1 so one-character typos still register.

use std::collections::HashSet;

/// Curated skill terms, lowercased. Multi-word entries ("machine learning",
/// "spring boot") are matched as phrases.
#[derive(Debug, Clone)]
pub struct SkillVocabulary {
    exact: HashSet<String>,
    /// Entries preserved in declaration order for canonical spelling lookup.
    terms: Vec<String>,
}

const DEFAULT_SKILLS: &[&str] = &[
    // Languages
    "python", "javascript", "typescript", "java", "c++", "c#", "ruby", "go",
    "rust", "php", "swift", "kotlin", "scala", "r", "matlab", "sql",
    // Frameworks
    "react", "angular", "vue", "django", "flask", "express", "spring boot",
    "laravel", "rails", "next.js", "node.js", ".net",
    // Databases
    "mysql", "postgresql", "mongodb", "redis", "sqlite", "oracle", "cassandra",
    "dynamodb", "elasticsearch",
    // Cloud & infrastructure
    "aws", "azure", "gcp", "docker", "kubernetes", "terraform", "ansible",
    "jenkins", "git", "linux",
    // Methodologies & practice
    "agile", "scrum", "kanban", "devops", "ci/cd", "microservices", "rest",
    "grpc", "graphql", "machine learning", "data science", "deep learning",
    "project management",
    // Soft skills
    "leadership", "communication", "teamwork", "problem solving", "mentoring",
];

impl Default for SkillVocabulary {
    fn default() -> Self {
        Self::from_terms(DEFAULT_SKILLS.iter().map(|s| s.to_string()))
    }
}

impl SkillVocabulary {
    pub fn from_terms(terms: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for term in terms {
            let term = term.trim().to_lowercase();
            if term.is_empty() {
                continue;
            }
            if seen.insert(term.clone()) {
                ordered.push(term);
            }
        }
        Self {
            exact: seen,
            terms: ordered,
        }
    }

    /// Parses one skill per line; blank lines and `#` comments are skipped.
    pub fn from_lines(input: &str) -> Self {
        Self::from_terms(
            input
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(|l| l.to_string()),
        )
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.exact.contains(&term.to_lowercase())
    }

    /// Resolves a token to its canonical vocabulary spelling: exact match
    /// first, then a fuzzy match at edit distance 1 for tokens long enough
    /// that a single edit is plausibly a typo rather than a different word.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        let token = token.to_lowercase();
        if let Some(exact) = self.exact.get(&token) {
            return Some(exact.as_str());
        }
        if token.len() < 5 {
            return None;
        }
        self.terms
            .iter()
            .find(|term| {
                term.len() >= 5
                    && term.len().abs_diff(token.len()) <= 1
                    && levenshtein(term, &token) <= 1
            })
            .map(|t| t.as_str())
    }
}

/// Words excluded from the general keyword map. The defaults combine an
/// English stopword core with job-posting boilerplate ("requirements",
/// "preferred") that carries no matching signal.
#[derive(Debug, Clone)]
pub struct StopwordList {
    words: HashSet<String>,
}

const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "may",
    "more", "most", "my", "no", "not", "of", "on", "or", "our", "out", "over",
    "she", "should", "so", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "to", "under", "up", "was",
    "we", "were", "what", "when", "where", "which", "who", "will", "with",
    "would", "you", "your",
    // Job-posting boilerplate
    "experience", "skills", "requirements", "qualifications", "preferred",
    "required", "must", "plus", "years", "degree", "team", "work", "working",
    "role", "job", "candidate", "ability", "strong", "using", "knowledge",
];

impl Default for StopwordList {
    fn default() -> Self {
        Self {
            words: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl StopwordList {
    pub fn from_lines(input: &str) -> Self {
        Self {
            words: input
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(|l| l.to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }
}

/// Levenshtein edit distance, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr = vec![0usize; a.len() + 1];

    for (j, bc) in b.iter().enumerate() {
        curr[0] = j + 1;
        for (i, ac) in a.iter().enumerate() {
            let cost = usize::from(ac != bc);
            curr[i + 1] = (prev[i + 1] + 1).min(curr[i] + 1).min(prev[i] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[a.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("cat", "hat"), 1);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn test_default_vocabulary_has_core_skills() {
        let vocab = SkillVocabulary::default();
        assert!(vocab.contains("go"));
        assert!(vocab.contains("PostgreSQL"));
        assert!(vocab.contains("kubernetes"));
        assert!(vocab.contains("machine learning"));
    }

    #[test]
    fn test_resolve_exact_is_case_insensitive() {
        let vocab = SkillVocabulary::default();
        assert_eq!(vocab.resolve("Kubernetes"), Some("kubernetes"));
        assert_eq!(vocab.resolve("RUST"), Some("rust"));
    }

    #[test]
    fn test_resolve_fuzzy_catches_typo() {
        let vocab = SkillVocabulary::default();
        assert_eq!(vocab.resolve("kuberntes"), Some("kubernetes"));
        assert_eq!(vocab.resolve("postgresq"), Some("postgresql"));
    }

    #[test]
    fn test_short_tokens_never_fuzzy_match() {
        let vocab = SkillVocabulary::default();
        // "gol" is distance 1 from "go" but too short for fuzzing.
        assert_eq!(vocab.resolve("gol"), None);
        assert_eq!(vocab.resolve("jav"), None);
    }

    #[test]
    fn test_unrelated_token_does_not_match() {
        let vocab = SkillVocabulary::default();
        assert_eq!(vocab.resolve("gardening"), None);
    }

    #[test]
    fn test_from_lines_skips_comments_and_dedupes() {
        let vocab = SkillVocabulary::from_lines("# languages\nGo\nrust\nGO\n\nrust\n");
        assert_eq!(vocab.len(), 2);
        assert!(vocab.contains("go"));
        assert!(vocab.contains("rust"));
    }

    #[test]
    fn test_default_stopwords_cover_boilerplate() {
        let stopwords = StopwordList::default();
        assert!(stopwords.contains("the"));
        assert!(stopwords.contains("Requirements"));
        assert!(!stopwords.contains("postgresql"));
    }

    #[test]
    fn test_stopwords_from_lines() {
        let stopwords = StopwordList::from_lines("und\nder\ndie\n");
        assert!(stopwords.contains("und"));
        assert!(!stopwords.contains("the"));
    }
}
