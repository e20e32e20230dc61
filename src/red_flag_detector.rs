use log::debug;

use crate::career_analyzer::title_level;
use crate::matcher::any_term_in;
use crate::models::{FlagSeverity, ParsedRole, RedFlag, RedFlagReport, RedFlagType, YearMonth};

/// Aggregate penalty never exceeds this.
pub const MAX_TOTAL_PENALTY: u32 = 25;

/// A stint shorter than this many months counts toward job hopping.
const SHORT_STINT_MONTHS: i32 = 12;
/// Only roles ending inside this window are considered for hopping.
const HOPPING_WINDOW_MONTHS: i32 = 60;

const GAP_HIGH_MONTHS: i32 = 24;
const GAP_MEDIUM_MONTHS: i32 = 12;

const SENIOR_TITLE_TOKENS: &[&str] = &["senior", "sr", "lead", "principal", "staff"];
const LEADERSHIP_TITLE_TOKENS: &[&str] = &["lead", "principal", "architect", "head", "director"];

fn to_terms(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

/// Applies the red-flag rules in fixed order and caps the total penalty.
pub fn detect_red_flags(
    roles: &[ParsedRole],
    total_years: Option<f64>,
    now: YearMonth,
) -> RedFlagReport {
    let mut flags: Vec<RedFlag> = Vec::new();
    let professional: Vec<&ParsedRole> = roles.iter().filter(|r| r.professional).collect();

    detect_job_hopping(&professional, now, &mut flags);
    detect_employment_gaps(&professional, &mut flags);
    detect_title_inflation(&professional, total_years, &mut flags);
    detect_career_regression(&professional, &mut flags);

    let total: u32 = flags.iter().map(|f| f.penalty).sum();
    let total_penalty = total.min(MAX_TOTAL_PENALTY);
    if !flags.is_empty() {
        debug!("{} red flag(s), penalty {}", flags.len(), total_penalty);
    }
    RedFlagReport {
        flags,
        total_penalty,
    }
}

fn detect_job_hopping(professional: &[&ParsedRole], now: YearMonth, flags: &mut Vec<RedFlag>) {
    let window_start = now.month_index() - HOPPING_WINDOW_MONTHS;
    let short_stints: Vec<&&ParsedRole> = professional
        .iter()
        .filter(|r| r.end_month_index >= window_start)
        .filter(|r| r.duration_months < SHORT_STINT_MONTHS)
        .collect();

    let (severity, penalty) = match short_stints.len() {
        n if n >= 3 => (FlagSeverity::High, 10),
        2 => (FlagSeverity::Medium, 5),
        _ => return,
    };
    flags.push(RedFlag {
        flag_type: RedFlagType::JobHopping,
        severity,
        evidence: format!(
            "{} stints shorter than 12 months within the last 5 years",
            short_stints.len()
        ),
        penalty,
    });
}

fn detect_employment_gaps(professional: &[&ParsedRole], flags: &mut Vec<RedFlag>) {
    let mut ordered: Vec<&&ParsedRole> = professional.iter().collect();
    ordered.sort_by_key(|r| r.end_month_index);

    for pair in ordered.windows(2) {
        let gap = pair[1].start_month_index - pair[0].end_month_index;
        let (severity, penalty) = if gap > GAP_HIGH_MONTHS {
            (FlagSeverity::High, 8)
        } else if gap > GAP_MEDIUM_MONTHS {
            (FlagSeverity::Medium, 4)
        } else {
            continue;
        };
        flags.push(RedFlag {
            flag_type: RedFlagType::EmploymentGap,
            severity,
            evidence: format!(
                "{} month gap between \"{}\" and \"{}\"",
                gap, pair[0].title, pair[1].title
            ),
            penalty,
        });
    }
}

fn detect_title_inflation(
    professional: &[&ParsedRole],
    total_years: Option<f64>,
    flags: &mut Vec<RedFlag>,
) {
    let Some(years) = total_years else { return };
    let senior_terms = to_terms(SENIOR_TITLE_TOKENS);
    let leadership_terms = to_terms(LEADERSHIP_TITLE_TOKENS);

    if let Some(role) = professional
        .iter()
        .find(|r| any_term_in(&senior_terms, &r.title))
    {
        let (severity, penalty) = if years < 2.0 {
            (FlagSeverity::High, 10)
        } else if years < 3.0 {
            (FlagSeverity::Medium, 5)
        } else {
            (FlagSeverity::Low, 0)
        };
        if penalty > 0 {
            flags.push(RedFlag {
                flag_type: RedFlagType::TitleInflation,
                severity,
                evidence: format!(
                    "Senior title \"{}\" with only {:.1} years of experience",
                    role.title, years
                ),
                penalty,
            });
        }
    }

    if years < 4.0 {
        if let Some(role) = professional
            .iter()
            .find(|r| any_term_in(&leadership_terms, &r.title))
        {
            flags.push(RedFlag {
                flag_type: RedFlagType::TitleInflation,
                severity: FlagSeverity::High,
                evidence: format!(
                    "Leadership title \"{}\" with only {:.1} years of experience",
                    role.title, years
                ),
                penalty: 8,
            });
        }
    }
}

fn detect_career_regression(professional: &[&ParsedRole], flags: &mut Vec<RedFlag>) {
    let mut ordered: Vec<&&ParsedRole> = professional.iter().collect();
    ordered.sort_by_key(|r| r.start_month_index);

    for pair in ordered.windows(2) {
        if title_level(&pair[0].title) == 3 && title_level(&pair[1].title) == 1 {
            flags.push(RedFlag {
                flag_type: RedFlagType::CareerRegression,
                severity: FlagSeverity::Medium,
                evidence: format!(
                    "Moved from \"{}\" to \"{}\"",
                    pair[0].title, pair[1].title
                ),
                penalty: 5,
            });
        }
    }
}
