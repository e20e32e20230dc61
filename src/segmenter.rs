use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::dates::{
    explicit_years_anchor, extract_intervals, internship_regex, mentions_internship,
    merge_intervals, months_to_years, total_months,
};
use crate::models::{MonthInterval, ParsedRole, YearMonth};
use crate::normalizer::fold_for_match;

static SECTION_START_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "experience",
        "experiences",
        "professionalexperience",
        "workexperience",
        "workhistory",
        "careerhistory",
        "employmenthistory",
        "employment",
        "parcoursprofessionnel",
        "parcours",
        "experienceprofessionnelle",
        "experiencesprofessionnelles",
        "emplois",
    ]
    .into_iter()
    .collect()
});

static SECTION_END_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "education",
        "formation",
        "formations",
        "skills",
        "technicalskills",
        "competences",
        "competencestechniques",
        "projects",
        "projets",
        "personalprojects",
        "certifications",
        "certification",
        "certificates",
        "languages",
        "langues",
        "hobbies",
        "interests",
        "centresdinteret",
        "loisirs",
        "references",
        "about",
        "aboutme",
        "summary",
        "profile",
        "profil",
        "objective",
        "awards",
        "publications",
        "volunteering",
        "benevolat",
        "contact",
    ]
    .into_iter()
    .collect()
});

static SKILL_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,|/•]").expect("separator regex"));

/// Byte span of the located Experience section within the canonical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpan {
    pub byte_start: usize,
    pub byte_end: usize,
}

/// Shared role-segmentation state: computed once per candidate and passed
/// by reference to every downstream analyzer.
#[derive(Debug, Clone)]
pub struct SegmentedResume {
    pub section: Option<SectionSpan>,
    pub roles: Vec<ParsedRole>,
}

fn line_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0usize;
    text.split('\n')
        .map(|line| {
            let start = offset;
            offset += line.len() + 1;
            (start, line)
        })
        .collect()
}

/// Letters-only, folded, lowercased view of a heading line:
/// "EXPÉRIENCE PROFESSIONNELLE" -> "experienceprofessionnelle".
fn normalize_heading(line: &str) -> String {
    fold_for_match(line)
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect()
}

fn looks_like_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return false;
    }
    let words = trimmed.split_whitespace().count();
    if words > 10 {
        return false;
    }
    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    let upper_ratio = if letters.is_empty() {
        0.0
    } else {
        upper as f64 / letters.len() as f64
    };
    upper_ratio >= 0.7 || words <= 5
}

fn is_start_heading(line: &str) -> bool {
    looks_like_heading(line) && SECTION_START_TOKENS.contains(normalize_heading(line).as_str())
}

fn is_end_heading(line: &str) -> bool {
    looks_like_heading(line) && SECTION_END_TOKENS.contains(normalize_heading(line).as_str())
}

/// A line that enumerates technologies rather than naming a position.
fn is_skill_list_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.chars().count() > 140 {
        return true;
    }
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let separators = SKILL_SEPARATOR_RE.find_iter(trimmed).count();
    if separators >= 3 && words.len() >= 4 {
        return true;
    }
    let short_tokens = words
        .iter()
        .filter(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).chars().count() <= 4)
        .count();
    short_tokens >= 5
}

/// Locates the Experience section and splits it into roles. When no
/// heading can be found the whole document is segmented instead, so
/// heading-less single-block resumes still produce roles.
pub fn segment(text: &str, now: YearMonth) -> SegmentedResume {
    let lines = line_offsets(text);

    let start_candidates: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, (_, line))| is_start_heading(line))
        .map(|(i, _)| i)
        .collect();

    let mut chosen: Option<(usize, usize)> = None; // (body first line, body end line)
    for (attempt, &start) in start_candidates.iter().enumerate() {
        let body_start = start + 1;
        let body_end = (body_start..lines.len())
            .find(|&i| is_end_heading(lines[i].1))
            .unwrap_or(lines.len());
        let body_chars: usize = lines[body_start..body_end]
            .iter()
            .map(|(_, l)| l.chars().count())
            .sum();
        match chosen {
            None => {
                chosen = Some((body_start, body_end));
                if body_chars >= 100 {
                    break;
                }
                // Undersized primary segment: keep looking, prefer larger.
            }
            Some((cs, ce)) => {
                let chosen_chars: usize =
                    lines[cs..ce].iter().map(|(_, l)| l.chars().count()).sum();
                if body_chars > chosen_chars {
                    chosen = Some((body_start, body_end));
                }
                break;
            }
        }
        if attempt >= 1 {
            break;
        }
    }

    let (section, seg_start, seg_end) = match chosen {
        Some((body_start, body_end)) => {
            let byte_start = lines.get(body_start).map(|(o, _)| *o).unwrap_or(text.len());
            let byte_end = if body_end < lines.len() {
                lines[body_end].0.saturating_sub(1)
            } else {
                text.len()
            };
            (
                Some(SectionSpan {
                    byte_start,
                    byte_end: byte_end.max(byte_start),
                }),
                body_start,
                body_end,
            )
        }
        None => (None, 0, lines.len()),
    };

    let roles = segment_roles(&lines[seg_start..seg_end], now);
    debug!(
        "segmented {} role(s), experience section found: {}",
        roles.len(),
        section.is_some()
    );
    SegmentedResume { section, roles }
}

fn segment_roles(lines: &[(usize, &str)], now: YearMonth) -> Vec<ParsedRole> {
    let per_line: Vec<Vec<MonthInterval>> = lines
        .iter()
        .map(|(_, line)| extract_intervals(line, now))
        .collect();
    let openings: Vec<usize> = per_line
        .iter()
        .enumerate()
        .filter(|(_, ivs)| !ivs.is_empty())
        .map(|(i, _)| i)
        .collect();

    let mut roles = Vec::with_capacity(openings.len());
    for (k, &open) in openings.iter().enumerate() {
        let block_end = openings.get(k + 1).copied().unwrap_or(lines.len());
        let block_lines: Vec<&str> = lines[open..block_end].iter().map(|(_, l)| *l).collect();
        let text_block = block_lines.join("\n");

        let title = role_title(lines, open, &per_line)
            .unwrap_or_else(|| lines[open].1.trim().to_string());

        let merged = merge_intervals(
            per_line[open..block_end]
                .iter()
                .flat_map(|ivs| ivs.iter().copied())
                .collect(),
        );
        if merged.is_empty() {
            continue;
        }
        let duration = total_months(&merged).max(1);
        let professional = !internship_regex()
            .is_match(&fold_for_match(&format!("{title}\n{text_block}")));

        roles.push(ParsedRole {
            title,
            start_month_index: merged[0].start,
            end_month_index: merged[merged.len() - 1].end,
            duration_months: duration,
            text_block,
            professional,
        });
    }
    roles
}

/// Title = up to two previous lines that are neither headings, nor skill
/// lists, nor role openings themselves.
fn role_title(
    lines: &[(usize, &str)],
    open: usize,
    per_line: &[Vec<MonthInterval>],
) -> Option<String> {
    let mut picked: Vec<&str> = Vec::new();
    for back in 1..=2usize {
        let Some(i) = open.checked_sub(back) else { break };
        let line = lines[i].1.trim();
        if line.is_empty() || !per_line[i].is_empty() {
            break;
        }
        if is_start_heading(line) || is_end_heading(line) || is_skill_list_line(line) {
            break;
        }
        picked.push(line);
    }
    if picked.is_empty() {
        None
    } else {
        picked.reverse();
        Some(picked.join(" "))
    }
}

/// Total professional years with the fallback chain: segmented roles, then
/// section intervals, then full-text intervals away from internship
/// markers, then explicit "X years experience" anchors.
pub fn years_of_experience(text: &str, seg: &SegmentedResume, now: YearMonth) -> Option<f64> {
    if !seg.roles.is_empty() {
        let months: i32 = seg
            .roles
            .iter()
            .filter(|r| r.professional)
            .map(|r| r.duration_months)
            .sum();
        return Some(months_to_years(months));
    }

    if let Some(span) = &seg.section {
        let body = &text[span.byte_start..span.byte_end.min(text.len())];
        let merged = merge_intervals(extract_intervals(body, now));
        if !merged.is_empty() {
            return Some(months_to_years(total_months(&merged)));
        }
    }

    let folded = fold_for_match(text);
    let merged = merge_intervals(non_internship_intervals(text, now));
    if !merged.is_empty() {
        return Some(months_to_years(total_months(&merged)));
    }
    let internship_only = mentions_internship(&folded);

    if let Some(anchor) = explicit_years_anchor(text) {
        if !internship_only {
            return Some(anchor);
        }
    }
    if internship_only {
        // All dated activity sits next to internship markers.
        return Some(0.0);
    }
    None
}

/// Intervals from lines that are not within one line of an internship
/// keyword, so a lone internship does not masquerade as employment.
fn non_internship_intervals(text: &str, now: YearMonth) -> Vec<MonthInterval> {
    let lines: Vec<&str> = text.split('\n').collect();
    let folded: Vec<String> = lines.iter().map(|l| fold_for_match(l)).collect();
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let near_internship = (i.saturating_sub(1)..=(i + 1).min(lines.len() - 1))
            .any(|j| internship_regex().is_match(&folded[j]));
        if near_internship {
            continue;
        }
        out.extend(extract_intervals(line, now));
    }
    out
}
