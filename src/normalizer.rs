use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Maximum length of an evidence snippet, in characters.
pub const SNIPPET_MAX_CHARS: usize = 220;

static DEHYPHEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{L})-\n(\p{L})").expect("dehyphen regex"));
static INLINE_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("inline ws regex"));
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").expect("blank run regex"));

/// Canonicalizes raw PDF-extracted text into the snippet-friendly form the
/// rest of the pipeline operates on. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    // Line endings, then the characters PDF extractors are known to leak.
    let mut text = raw.replace("\r\n", "\n").replace('\r', "\n");
    text = text.replace('\u{00A0}', " ");
    text = text.replace('\u{00AD}', "");
    // NUL frequently stands in for an en-dash in extracted date ranges.
    text = text.replace('\0', " - ");
    text.retain(|c| !c.is_ascii_control() || c == '\n' || c == '\t');

    // Per-line whitespace collapse before de-hyphenation, so a trailing
    // space never blocks the join and a second pass finds nothing new.
    let collapsed: Vec<String> = text
        .split('\n')
        .map(|line| INLINE_WS_RE.replace_all(line, " ").trim_end().to_string())
        .collect();
    text = collapsed.join("\n");

    // Join line-break hyphenation to a fixpoint: "mana-\ngement" -> "management".
    loop {
        let joined = DEHYPHEN_RE.replace_all(&text, "$1$2");
        if joined == text {
            break;
        }
        text = joined.into_owned();
    }

    // At most two consecutive blank lines survive.
    text = BLANK_RUN_RE.replace_all(&text, "\n\n\n").into_owned();
    text.trim().to_string()
}

/// Trimmed line surrounding `index` (a byte offset into `text`), truncated
/// to `SNIPPET_MAX_CHARS` with a middle ellipsis. Falls back to a character
/// window centered on the index when the line itself is blank.
pub fn snippet_at(text: &str, index: usize) -> String {
    let index = floor_char_boundary(text, index.min(text.len()));
    let line_start = text[..index].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let line_end = text[index..]
        .find('\n')
        .map(|p| index + p)
        .unwrap_or(text.len());

    let line = text[line_start..line_end].trim();
    if !line.is_empty() {
        return truncate_middle(line, SNIPPET_MAX_CHARS);
    }

    // Blank line: use a window of SNIPPET_MAX_CHARS chars centered on index.
    let half = SNIPPET_MAX_CHARS / 2;
    let positions: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    if positions.is_empty() {
        return String::new();
    }
    let at = positions.partition_point(|&p| p < index);
    let from = at.saturating_sub(half);
    let to = (at + half).min(positions.len());
    let start = positions[from];
    let end = if to == positions.len() {
        text.len()
    } else {
        positions[to]
    };
    truncate_middle(text[start..end].trim(), SNIPPET_MAX_CHARS)
}

/// Keeps the head and tail of an over-long string with an ellipsis between.
pub fn truncate_middle(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars || max_chars < 3 {
        return s.to_string();
    }
    let keep_front = (max_chars - 1) / 2;
    let keep_back = max_chars - 1 - keep_front;
    let front: String = s.chars().take(keep_front).collect();
    let back: String = s.chars().skip(count - keep_back).collect();
    format!("{front}…{back}")
}

/// Deterministic predicate for the OCR decision: true when the text is
/// dominated by single-letter tokens, the signature of columnar or
/// per-glyph PDF extraction.
pub fn looks_garbled(text: &str) -> bool {
    let tokens: Vec<&str> = text.unicode_words().collect();
    if tokens.is_empty() {
        return false;
    }
    let single = tokens.iter().filter(|t| is_single_letter(t)).count();
    if single as f64 / tokens.len() as f64 > 0.25 {
        return true;
    }

    let mut garbled_lines = 0;
    for line in text.lines() {
        let words: Vec<&str> = line.unicode_words().collect();
        if words.len() >= 8 {
            let singles = words.iter().filter(|t| is_single_letter(t)).count();
            if singles as f64 / words.len() as f64 > 0.6 {
                garbled_lines += 1;
                if garbled_lines >= 2 {
                    return true;
                }
            }
        }
    }
    false
}

fn is_single_letter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

/// Maps accented letters onto their base form, one output character per
/// input character ("é" -> "e", "à" -> "a"). Used for locale-insensitive
/// token matching throughout the pipeline.
pub(crate) fn fold_diacritics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if let Some(base) = c.nfd().find(|d| !is_combining_mark(*d)) {
            out.push(base);
        }
    }
    out
}

/// Lowercased, diacritic-folded view of `s`; the common preprocessing for
/// keyword tables.
pub(crate) fn fold_for_match(s: &str) -> String {
    fold_diacritics(s).to_lowercase()
}

pub(crate) fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings_and_nbsp() {
        let raw = "Line one\r\nLine\u{00A0}two\rLine three";
        assert_eq!(normalize_text(raw), "Line one\nLine two\nLine three");
    }

    #[test]
    fn test_normalize_nul_becomes_dash() {
        // PDF extraction of "2019–2021" with the en-dash lost to a NUL.
        let raw = "2019\u{0}2021";
        assert_eq!(normalize_text(raw), "2019 - 2021");
    }

    #[test]
    fn test_normalize_strips_control_chars_keeps_tabs_as_spaces() {
        let raw = "abc\u{0008}def\tghi";
        assert_eq!(normalize_text(raw), "abcdef ghi");
    }

    #[test]
    fn test_normalize_dehyphenates_line_breaks() {
        let raw = "software deve-\nlopment and mana-\ngement";
        assert_eq!(normalize_text(raw), "software development and management");
    }

    #[test]
    fn test_normalize_dehyphenates_chained_wraps() {
        let raw = "a-\nb-\nc";
        assert_eq!(normalize_text(raw), "abc");
    }

    #[test]
    fn test_normalize_keeps_real_hyphens() {
        let raw = "state-of-the-art tooling";
        assert_eq!(normalize_text(raw), raw);
    }

    #[test]
    fn test_normalize_collapses_blank_runs() {
        let raw = "top\n\n\n\n\n\nbottom";
        assert_eq!(normalize_text(raw), "top\n\n\nbottom");
    }

    #[test]
    fn test_normalize_collapses_inline_whitespace() {
        let raw = "Senior    Engineer\t\tAcme   ";
        assert_eq!(normalize_text(raw), "Senior Engineer Acme");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Line one\r\nLine\u{00A0}two\rLine three",
            "software deve-\nlopment and mana- \ngement",
            "2019\u{0}2021\n\n\n\n\nEDUCATION",
            "a-\nb-\nc",
            "  padded   text  \n\nwith\tgaps  ",
        ];
        for raw in samples {
            let once = normalize_text(raw);
            assert_eq!(normalize_text(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_snippet_returns_surrounding_line() {
        let text = "first line\nSenior Engineer at Acme, 2019 - present\nlast line";
        let idx = text.find("Acme").unwrap();
        assert_eq!(snippet_at(text, idx), "Senior Engineer at Acme, 2019 - present");
    }

    #[test]
    fn test_snippet_truncates_long_lines_in_the_middle() {
        let long_line = "x".repeat(500);
        let snippet = snippet_at(&long_line, 250);
        assert_eq!(snippet.chars().count(), SNIPPET_MAX_CHARS);
        assert!(snippet.contains('…'));
    }

    #[test]
    fn test_snippet_windows_on_blank_line() {
        let text = format!("{}\n\n{}", "a".repeat(300), "b".repeat(300));
        let blank_idx = 301; // inside the blank line
        let snippet = snippet_at(&text, blank_idx);
        assert!(!snippet.is_empty());
        assert!(snippet.chars().count() <= SNIPPET_MAX_CHARS);
    }

    #[test]
    fn test_truncate_middle_short_string_untouched() {
        assert_eq!(truncate_middle("short", 220), "short");
    }

    #[test]
    fn test_garble_detector_on_per_glyph_extraction() {
        let garbled = "J o h n D o e C u r r i c u l u m\nS e n i o r E n g i n e e r a t A c m e";
        assert!(looks_garbled(garbled));
    }

    #[test]
    fn test_garble_detector_accepts_clean_text() {
        let clean = "Senior Software Engineer with ten years of experience\n\
                     building distributed systems and leading small teams.";
        assert!(!looks_garbled(clean));
        assert!(!looks_garbled(""));
    }

    #[test]
    fn test_fold_diacritics() {
        assert_eq!(fold_for_match("Présent, Décembre, AOÛT"), "present, decembre, aout");
        assert_eq!(fold_for_match("expérience"), "experience");
    }
}
