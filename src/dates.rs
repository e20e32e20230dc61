use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::models::{MonthInterval, YearMonth};
use crate::normalizer::fold_for_match;

/// Any interval at least this wide is a parse artifact, not a career.
const MAX_INTERVAL_MONTHS: i32 = 600;

/// Locale-independent "until now" phrases, matched on folded text.
const PRESENT: &str = "(?:present|current|actuellement|actuel|aujourd['’]?hui|a ce jour|ce jour|to date|today|en cours|ongoing|now|maintenant)";

/// Dash variants PDF extractors produce for date ranges.
const DASH: &str = "[–—―−~-]";

static MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let entries: &[(&str, u32)] = &[
        ("jan", 1), ("janv", 1), ("january", 1), ("janvier", 1),
        ("feb", 2), ("fev", 2), ("fevr", 2), ("february", 2), ("fevrier", 2),
        ("mar", 3), ("mars", 3), ("march", 3),
        ("apr", 4), ("avr", 4), ("april", 4), ("avril", 4),
        ("may", 5), ("mai", 5),
        ("jun", 6), ("juin", 6), ("june", 6),
        ("jul", 7), ("juil", 7), ("july", 7), ("juillet", 7),
        ("aug", 8), ("aou", 8), ("aout", 8), ("august", 8),
        ("sep", 9), ("sept", 9), ("september", 9), ("septembre", 9),
        ("oct", 10), ("october", 10), ("octobre", 10),
        ("nov", 11), ("november", 11), ("novembre", 11),
        ("dec", 12), ("december", 12), ("decembre", 12),
    ];
    entries.iter().copied().collect()
});

static YEAR_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(19\d{{2}}|20\d{{2}})\s*{DASH}\s*(?:((?:19|20)\d{{2}}|\d{{2}})\b|({PRESENT})\b)"
    ))
    .expect("year range regex")
});

static MONTH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b([a-z]{{3,10}})\.?\s*(\d{{4}})\s*(?:{DASH}|\bto\b|\bau\b|\ba\b)\s*(?:([a-z]{{3,10}})\.?\s*(\d{{4}})\b|(\d{{4}})\b|({PRESENT})\b)"
    ))
    .expect("month range regex")
});

static DAY_MONTH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})\s+([a-z]{{3,10}})\.?\s+(\d{{4}})\s*(?:{DASH}|\bto\b|\bau\b|\ba\b)\s*(?:(\d{{1,2}})\s+([a-z]{{3,10}})\.?\s+(\d{{4}})\b|({PRESENT})\b)"
    ))
    .expect("day month range regex")
});

static SLASH_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})\s*/\s*(\d{{4}})\s*(?:{DASH}|\bto\b|\bau\b|\ba\b)\s*(?:(\d{{1,2}})\s*/\s*(\d{{4}})\b|({PRESENT})\b)"
    ))
    .expect("slash range regex")
});

static DOTTED_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})\.(\d{{1,2}})\.(\d{{4}})\s*(?:{DASH}|\bto\b|\bau\b|\ba\b)\s*(?:(\d{{1,2}})\.(\d{{1,2}})\.(\d{{4}})\b|({PRESENT})\b)"
    ))
    .expect("dotted range regex")
});

static SINCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:since|depuis)\s+(?:([a-z]{3,10})\.?\s+)?(\d{4})\b").expect("since regex")
});

static FROM_TO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?:from|de)\s+([a-z]{{3,10}})\.?\s*(\d{{4}})\s*(?:\bto\b|\bau\b|\ba\b|jusqu['’]?a|{DASH})\s*(?:([a-z]{{3,10}})\.?\s*(\d{{4}})\b|({PRESENT})\b)"
    ))
    .expect("from-to regex")
});

static SINGLE_MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-z]{3,10})\.?\s+(\d{4})\b|\b(\d{1,2})\s*/\s*(\d{4})\b").expect("single month regex"));

static INTERNSHIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(stage|stagiaire|internship|intern|trainee|alternance|apprentissage|apprenti|pfe|sfe)\b|fin\s+d['’]?etudes")
        .expect("internship regex")
});

static YEARS_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\s*\+?\s*(?:years?|yrs?|ans)\b[\s,:]*(?:of\s+|d['’]\s*)?exp")
        .expect("years anchor regex")
});

/// Resolves a month-name token (folded, lowercase) to a 1-based month.
/// Accepts full and short EN/FR forms.
pub(crate) fn month_from_token(token: &str) -> Option<u32> {
    if let Some(m) = MONTHS.get(token) {
        return Some(*m);
    }
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 4 {
        let prefix: String = chars[..4].iter().collect();
        if let Some(m) = MONTHS.get(prefix.as_str()) {
            return Some(*m);
        }
    }
    if chars.len() > 3 {
        let prefix: String = chars[..3].iter().collect();
        if let Some(m) = MONTHS.get(prefix.as_str()) {
            return Some(*m);
        }
    }
    None
}

fn valid_year(year: i32, now: YearMonth) -> bool {
    (1950..=now.year + 1).contains(&year)
}

/// 4-digit years validate against [1950, now+1]; 2-digit years map into the
/// 2000s when plausible, else the 1900s, then revalidate.
fn normalize_year(raw: &str, now: YearMonth) -> Option<i32> {
    let n: i32 = raw.parse().ok()?;
    let year = if raw.len() == 2 {
        if n <= now.year % 100 + 1 {
            2000 + n
        } else {
            1900 + n
        }
    } else {
        n
    };
    valid_year(year, now).then_some(year)
}

fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + (month as i32 - 1)
}

/// Open intervals end at the current month index; the in-progress month is
/// not counted.
fn present_end(now: YearMonth) -> i32 {
    now.month_index()
}

fn push_interval(out: &mut Vec<MonthInterval>, spans: &mut Vec<(usize, usize)>, span: (usize, usize), start: i32, end: i32) {
    if let Some(interval) = MonthInterval::new(start, end) {
        if interval.width_months() < MAX_INTERVAL_MONTHS {
            out.push(interval);
            spans.push(span);
        }
    }
}

/// Runs all locale-aware extractors over `text` (any chunk: one line or a
/// whole document) and returns the raw, unmerged interval union.
pub fn extract_intervals(text: &str, now: YearMonth) -> Vec<MonthInterval> {
    let folded = fold_for_match(text);
    let mut out = Vec::new();
    // Byte spans of every range hit, so standalone month-year matches that
    // are really the head of a range are not double counted.
    let mut spans: Vec<(usize, usize)> = Vec::new();

    // YYYY - YYYY | YY | present
    for cap in YEAR_RANGE_RE.captures_iter(&folded) {
        let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let Some(start_year) = normalize_year(&cap[1], now) else { continue };
        let start = month_index(start_year, 1);
        let end = if cap.get(3).is_some() {
            present_end(now)
        } else {
            match normalize_year(&cap[2], now) {
                Some(end_year) => month_index(end_year, 1),
                None => continue,
            }
        };
        push_interval(&mut out, &mut spans, whole, start, end);
    }

    // Mon YYYY - [Mon] YYYY | present
    for cap in MONTH_RANGE_RE.captures_iter(&folded) {
        let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let Some(start_month) = month_from_token(&cap[1]) else { continue };
        let Some(start_year) = normalize_year(&cap[2], now) else { continue };
        let start = month_index(start_year, start_month);
        let end = if cap.get(6).is_some() {
            present_end(now)
        } else if let (Some(m), Some(y)) = (cap.get(3), cap.get(4)) {
            let Some(end_month) = month_from_token(m.as_str()) else { continue };
            match normalize_year(y.as_str(), now) {
                // Explicit end month is inclusive.
                Some(end_year) => month_index(end_year, end_month) + 1,
                None => continue,
            }
        } else if let Some(y) = cap.get(5) {
            // Bare end year mirrors the year-year rule: January, exclusive.
            match normalize_year(y.as_str(), now) {
                Some(end_year) => month_index(end_year, 1),
                None => continue,
            }
        } else {
            continue;
        };
        push_interval(&mut out, &mut spans, whole, start, end);
    }

    // DD Mon YYYY - DD Mon YYYY | present
    for cap in DAY_MONTH_RANGE_RE.captures_iter(&folded) {
        let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let Some(start_month) = month_from_token(&cap[2]) else { continue };
        let Some(start_year) = normalize_year(&cap[3], now) else { continue };
        let start = month_index(start_year, start_month);
        let end = if cap.get(7).is_some() {
            present_end(now)
        } else if let (Some(m), Some(y)) = (cap.get(5), cap.get(6)) {
            let Some(end_month) = month_from_token(m.as_str()) else { continue };
            match normalize_year(y.as_str(), now) {
                Some(end_year) => month_index(end_year, end_month) + 1,
                None => continue,
            }
        } else {
            continue;
        };
        push_interval(&mut out, &mut spans, whole, start, end);
    }

    // MM/YYYY - MM/YYYY | present
    for cap in SLASH_RANGE_RE.captures_iter(&folded) {
        let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let start_month: u32 = match cap[1].parse() {
            Ok(m) if (1..=12).contains(&m) => m,
            _ => continue,
        };
        let Some(start_year) = normalize_year(&cap[2], now) else { continue };
        let start = month_index(start_year, start_month);
        let end = if cap.get(5).is_some() {
            present_end(now)
        } else if let (Some(m), Some(y)) = (cap.get(3), cap.get(4)) {
            let end_month: u32 = match m.as_str().parse() {
                Ok(m) if (1..=12).contains(&m) => m,
                _ => continue,
            };
            match normalize_year(y.as_str(), now) {
                Some(end_year) => month_index(end_year, end_month) + 1,
                None => continue,
            }
        } else {
            continue;
        };
        push_interval(&mut out, &mut spans, whole, start, end);
    }

    // DD.MM.YYYY - DD.MM.YYYY | present (DD/MM precedence)
    for cap in DOTTED_RANGE_RE.captures_iter(&folded) {
        let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let Some(start_month) = dotted_month(&cap[1], &cap[2]) else { continue };
        let Some(start_year) = normalize_year(&cap[3], now) else { continue };
        let start = month_index(start_year, start_month);
        let end = if cap.get(7).is_some() {
            present_end(now)
        } else if let (Some(d), Some(m), Some(y)) = (cap.get(4), cap.get(5), cap.get(6)) {
            let Some(end_month) = dotted_month(d.as_str(), m.as_str()) else { continue };
            match normalize_year(y.as_str(), now) {
                Some(end_year) => month_index(end_year, end_month) + 1,
                None => continue,
            }
        } else {
            continue;
        };
        push_interval(&mut out, &mut spans, whole, start, end);
    }

    // Since/Depuis Mon YYYY, From/De Mon YYYY to ...
    for cap in SINCE_RE.captures_iter(&folded) {
        let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let month = cap
            .get(1)
            .and_then(|m| month_from_token(m.as_str()))
            .unwrap_or(1);
        let Some(year) = normalize_year(&cap[2], now) else { continue };
        push_interval(&mut out, &mut spans, whole, month_index(year, month), present_end(now));
    }
    for cap in FROM_TO_RE.captures_iter(&folded) {
        let whole = cap.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let Some(start_month) = month_from_token(&cap[1]) else { continue };
        let Some(start_year) = normalize_year(&cap[2], now) else { continue };
        let start = month_index(start_year, start_month);
        let end = if cap.get(5).is_some() {
            present_end(now)
        } else if let (Some(m), Some(y)) = (cap.get(3), cap.get(4)) {
            let Some(end_month) = month_from_token(m.as_str()) else { continue };
            match normalize_year(y.as_str(), now) {
                Some(end_year) => month_index(end_year, end_month) + 1,
                None => continue,
            }
        } else {
            continue;
        };
        push_interval(&mut out, &mut spans, whole, start, end);
    }

    // Standalone "Mon YYYY" only counts next to an internship marker.
    extract_internship_singles(&folded, now, &spans, &mut out);

    debug!("extracted {} raw interval(s)", out.len());
    out
}

/// DD/MM precedence: the month is the second number; fall back to the first
/// when only it is a plausible month.
fn dotted_month(first: &str, second: &str) -> Option<u32> {
    let d1: u32 = first.parse().ok()?;
    let d2: u32 = second.parse().ok()?;
    if (1..=12).contains(&d2) {
        Some(d2)
    } else if (1..=12).contains(&d1) {
        Some(d1)
    } else {
        None
    }
}

fn extract_internship_singles(
    folded: &str,
    now: YearMonth,
    range_spans: &[(usize, usize)],
    out: &mut Vec<MonthInterval>,
) {
    let mut offset = 0usize;
    let lines: Vec<(usize, &str)> = folded
        .split('\n')
        .map(|line| {
            let start = offset;
            offset += line.len() + 1;
            (start, line)
        })
        .collect();

    for (i, (line_start, line)) in lines.iter().enumerate() {
        let near_internship = (i.saturating_sub(1)..=(i + 1).min(lines.len() - 1))
            .any(|j| INTERNSHIP_RE.is_match(lines[j].1));
        if !near_internship {
            continue;
        }
        for cap in SINGLE_MONTH_YEAR_RE.captures_iter(line) {
            let m = cap.get(0).expect("whole match");
            let span = (line_start + m.start(), line_start + m.end());
            if range_spans
                .iter()
                .any(|&(s, e)| span.0 < e && s < span.1)
            {
                continue;
            }
            let parsed = if let (Some(tok), Some(y)) = (cap.get(1), cap.get(2)) {
                month_from_token(tok.as_str()).zip(normalize_year(y.as_str(), now))
            } else if let (Some(mm), Some(y)) = (cap.get(3), cap.get(4)) {
                match mm.as_str().parse::<u32>() {
                    Ok(m) if (1..=12).contains(&m) => Some(m).zip(normalize_year(y.as_str(), now)),
                    _ => None,
                }
            } else {
                None
            };
            if let Some((month, year)) = parsed {
                let idx = month_index(year, month);
                if let Some(interval) = MonthInterval::new(idx, idx + 1) {
                    out.push(interval);
                }
            }
        }
    }
}

/// Sorts by start and merges overlapping or touching intervals.
pub fn merge_intervals(mut intervals: Vec<MonthInterval>) -> Vec<MonthInterval> {
    intervals.retain(|iv| iv.width_months() < MAX_INTERVAL_MONTHS);
    intervals.sort_by_key(|iv| (iv.start, iv.end));
    let mut merged: Vec<MonthInterval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end => {
                last.end = last.end.max(iv.end);
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// Total months spanned by a merged interval set.
pub fn total_months(merged: &[MonthInterval]) -> i32 {
    merged.iter().map(MonthInterval::width_months).sum()
}

/// Months to years, rounded to 0.1 and clamped to [0, 50].
pub fn months_to_years(months: i32) -> f64 {
    let years = months.max(0) as f64 / 12.0;
    ((years * 10.0).round() / 10.0).clamp(0.0, 50.0)
}

/// Explicit "X years experience" / "X ans d'expérience" anchor; the
/// largest such claim wins.
pub fn explicit_years_anchor(text: &str) -> Option<f64> {
    let folded = fold_for_match(text);
    YEARS_ANCHOR_RE
        .captures_iter(&folded)
        .filter_map(|cap| cap[1].parse::<f64>().ok())
        .reduce(f64::max)
        .map(|y| y.clamp(0.0, 50.0))
}

/// True when the text reads as internship-only experience (used by the
/// fallback chain when no role could be segmented).
pub(crate) fn mentions_internship(folded_text: &str) -> bool {
    INTERNSHIP_RE.is_match(folded_text)
}

pub(crate) fn internship_regex() -> &'static Regex {
    &INTERNSHIP_RE
}
