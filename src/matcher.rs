use log::debug;
use regex::Regex;
use strsim::normalized_levenshtein;

use crate::models::{KeywordHit, SkillMatch};
use crate::normalizer::{fold_for_match, snippet_at, truncate_middle, SNIPPET_MAX_CHARS};

/// Normalized edit distance above which a fuzzy hit is rejected.
const FUZZY_MAX_DISTANCE: f64 = 0.25;
/// Terms shorter than this never go through the fuzzy pass.
const FUZZY_MIN_TERM_CHARS: usize = 4;
/// Windows shorter than this cannot count as a fuzzy hit.
const FUZZY_MIN_WINDOW_CHARS: usize = 3;

/// Matches one skill (its name plus project aliases) against the canonical
/// text: exact first, then fuzzy line scoring. Evidence is the surrounding
/// line of the first hit.
pub fn match_skill(skill: &str, terms: &[String], weight: f64, text: &str) -> SkillMatch {
    let (matched, evidence) = match_terms(terms, text);
    SkillMatch {
        term: skill.to_string(),
        weight: weight.max(0.0),
        matched,
        evidence,
    }
}

/// Keyword matching is the same two-pass algorithm without a weight.
pub fn match_keyword(term: &str, text: &str) -> KeywordHit {
    let (matched, evidence) = match_terms(std::slice::from_ref(&term.to_string()), text);
    KeywordHit {
        term: term.to_string(),
        matched,
        evidence,
    }
}

fn match_terms(terms: &[String], text: &str) -> (bool, Vec<String>) {
    for term in terms {
        if let Some(index) = exact_find(term, text) {
            return (true, vec![snippet_at(text, index)]);
        }
    }

    let mut best: Option<(f64, &str)> = None;
    for term in terms {
        if term.chars().count() < FUZZY_MIN_TERM_CHARS {
            continue;
        }
        let term_folded = fold_for_match(term);
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(distance) = fuzzy_line_distance(&term_folded, trimmed) {
                if distance <= FUZZY_MAX_DISTANCE
                    && best.map_or(true, |(d, _)| distance < d)
                {
                    best = Some((distance, trimmed));
                }
            }
        }
    }
    match best {
        Some((distance, line)) => {
            debug!("fuzzy match at distance {distance:.3}: {line}");
            (true, vec![truncate_middle(line, SNIPPET_MAX_CHARS)])
        }
        None => (false, Vec::new()),
    }
}

/// Case-insensitive exact search. Short alphanumeric terms are fenced with
/// non-alphanumeric guards so "go" cannot match inside "google".
pub(crate) fn exact_find(term: &str, text: &str) -> Option<usize> {
    let regex = exact_regex(term)?;
    if needs_word_fence(term) {
        regex
            .captures(text)
            .and_then(|cap| cap.get(1))
            .map(|m| m.start())
    } else {
        regex.find(text).map(|m| m.start())
    }
}

pub(crate) fn any_term_in(terms: &[String], text: &str) -> bool {
    terms.iter().any(|t| exact_find(t, text).is_some())
}

/// All exact-hit byte offsets across every term, for depth counting and
/// context inspection. Offsets are sorted and deduplicated.
pub(crate) fn mention_indices(terms: &[String], text: &str) -> Vec<usize> {
    let mut indices = Vec::new();
    for term in terms {
        let Some(regex) = exact_regex(term) else { continue };
        if needs_word_fence(term) {
            for cap in regex.captures_iter(text) {
                if let Some(m) = cap.get(1) {
                    indices.push(m.start());
                }
            }
        } else {
            for m in regex.find_iter(text) {
                indices.push(m.start());
            }
        }
    }
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn needs_word_fence(term: &str) -> bool {
    let chars: Vec<char> = term.chars().collect();
    chars.len() <= 5 && !chars.is_empty() && chars.iter().all(|c| c.is_ascii_alphanumeric())
}

fn exact_regex(term: &str) -> Option<Regex> {
    let escaped = regex::escape(term);
    let pattern = if needs_word_fence(term) {
        format!("(?i)(?:^|[^a-zA-Z0-9])({escaped})(?:[^a-zA-Z0-9]|$)")
    } else {
        format!("(?i){escaped}")
    };
    Regex::new(&pattern).ok()
}

/// Best normalized edit distance between the term and any term-sized word
/// window of the line; position within the line is ignored.
fn fuzzy_line_distance(term_folded: &str, line: &str) -> Option<f64> {
    let line_folded = fold_for_match(line);
    let words: Vec<&str> = line_folded.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let window_len = term_folded.split_whitespace().count().max(1);
    let mut best: Option<f64> = None;
    for window in words.windows(window_len.min(words.len())) {
        let candidate = window.join(" ");
        if candidate.chars().count() < FUZZY_MIN_WINDOW_CHARS {
            continue;
        }
        let distance = 1.0 - normalized_levenshtein(term_folded, &candidate);
        if best.map_or(true, |b| distance < b) {
            best = Some(distance);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_with_evidence_line() {
        let text = "Summary\nBuilt services in Rust and Go for five years.\nEducation";
        let m = match_skill("rust", &terms(&["rust"]), 1.0, text);
        assert!(m.matched);
        assert_eq!(m.evidence, vec!["Built services in Rust and Go for five years."]);
    }

    #[test]
    fn test_short_term_requires_word_fence() {
        let text = "React, Node.js, Go, TypeScript";
        assert!(match_skill("go", &terms(&["go"]), 1.0, text).matched);

        let negative = "Searching google for Django tutorials";
        assert!(!match_skill("go", &terms(&["go"]), 1.0, negative).matched);
    }

    #[test]
    fn test_short_term_at_line_edges() {
        assert!(match_skill("go", &terms(&["go"]), 1.0, "go").matched);
        assert!(match_skill("go", &terms(&["go"]), 1.0, "shipped in Go").matched);
    }

    #[test]
    fn test_alias_extends_matches() {
        let text = "Led a team of 8 engineers.";
        let unaliased = match_skill("leadership", &terms(&["leadership"]), 1.0, text);
        assert!(!unaliased.matched);

        let aliased = match_skill("leadership", &terms(&["leadership", "led"]), 1.0, text);
        assert!(aliased.matched);
        assert_eq!(aliased.evidence, vec!["Led a team of 8 engineers."]);
    }

    #[test]
    fn test_symbolic_terms_match_literally() {
        let text = "Ten years of C++ development";
        assert!(match_skill("c++", &terms(&["c++"]), 1.0, text).matched);
    }

    #[test]
    fn test_fuzzy_pass_catches_ocr_typos() {
        let text = "Deployed workloads on Kuberntes clusters";
        let m = match_skill("kubernetes", &terms(&["kubernetes"]), 1.0, text);
        assert!(m.matched);
        assert_eq!(m.evidence, vec!["Deployed workloads on Kuberntes clusters"]);
    }

    #[test]
    fn test_fuzzy_pass_skipped_for_short_terms() {
        // "goo" is not close enough and "go" is below the fuzzy length gate.
        let m = match_skill("go", &terms(&["go"]), 1.0, "goo stack");
        assert!(!m.matched);
        assert!(m.evidence.is_empty());
    }

    #[test]
    fn test_fuzzy_rejects_distant_terms() {
        let m = match_skill("postgresql", &terms(&["postgresql"]), 1.0, "wrote some firmware");
        assert!(!m.matched);
    }

    #[test]
    fn test_keyword_hit_shape() {
        let hit = match_keyword("microservices", "Migrated the monolith to microservices.");
        assert!(hit.matched);
        assert_eq!(hit.evidence.len(), 1);

        let miss = match_keyword("kafka", "No streaming here.");
        assert!(!miss.matched);
        assert!(miss.evidence.is_empty());
    }

    #[test]
    fn test_mention_indices_count_all_hits() {
        let text = "Python API.\nMore Python scripts.\npython everywhere.";
        let indices = mention_indices(&terms(&["python"]), text);
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn test_negative_weight_clamped() {
        let m = match_skill("rust", &terms(&["rust"]), -2.0, "Rust services");
        assert_eq!(m.weight, 0.0);
    }
}
