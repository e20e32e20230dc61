use log::debug;

use crate::matcher::{any_term_in, mention_indices};
use crate::models::{
    CareerTrajectory, ParsedRole, RecencyAnalysis, RecencyCategory, SeniorityAssessment,
    SeniorityIndicators, SeniorityLevel, SkillRecency, YearMonth,
};
use crate::normalizer::snippet_at;

const DEFAULT_SENIOR_TOKENS: &[&str] = &[
    "senior", "sr", "lead", "principal", "staff", "architect", "head", "director", "vp",
    "chief", "expert", "confirmé",
];

const DEFAULT_JUNIOR_TOKENS: &[&str] = &[
    "junior", "jr", "intern", "stagiaire", "trainee", "débutant", "apprenti", "graduate",
    "entry level",
];

/// Phrases that signal actual people leadership; each occurrence counts
/// double.
const LEADERSHIP_PHRASES: &[&str] = &[
    "team lead",
    "tech lead",
    "led a team",
    "led the team",
    "managed a team",
    "engineering manager",
    "encadrement",
    "direction technique",
];

/// Skill recency bands, in months before `now`.
const CURRENT_MAX_MONTHS: i32 = 1;
const RECENT_MAX_MONTHS: i32 = 24;
const STALE_MAX_MONTHS: i32 = 60;

const MAX_SENIORITY_EVIDENCE: usize = 6;

fn to_terms(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

/// Token-accumulation seniority assessment: senior and leadership hits push
/// up, junior hits push down, years of experience band on top.
pub fn assess_seniority(
    text: &str,
    years_experience: Option<f64>,
    indicators: Option<&SeniorityIndicators>,
) -> SeniorityAssessment {
    let senior_tokens: Vec<String> = match indicators {
        Some(ind) if !ind.senior.is_empty() => ind.senior.clone(),
        _ => to_terms(DEFAULT_SENIOR_TOKENS),
    };
    let junior_tokens: Vec<String> = match indicators {
        Some(ind) if !ind.junior.is_empty() => ind.junior.clone(),
        _ => to_terms(DEFAULT_JUNIOR_TOKENS),
    };

    let mut senior_score: i32 = 0;
    let mut junior_score: i32 = 0;
    let mut evidence: Vec<String> = Vec::new();

    let collect = |terms: &[String], per_hit: i32, score: &mut i32, evidence: &mut Vec<String>| {
        for term in terms {
            let hits = mention_indices(std::slice::from_ref(term), text);
            if hits.is_empty() {
                continue;
            }
            *score += per_hit * hits.len() as i32;
            let snippet = snippet_at(text, hits[0]);
            if !snippet.is_empty()
                && !evidence.contains(&snippet)
                && evidence.len() < MAX_SENIORITY_EVIDENCE
            {
                evidence.push(snippet);
            }
        }
    };

    collect(&senior_tokens, 1, &mut senior_score, &mut evidence);
    collect(
        &to_terms(LEADERSHIP_PHRASES),
        2,
        &mut senior_score,
        &mut evidence,
    );
    collect(&junior_tokens, 1, &mut junior_score, &mut evidence);

    if let Some(years) = years_experience {
        if years >= 5.0 {
            senior_score += 2;
        } else if years >= 3.0 {
            senior_score += 1;
        }
        if years < 2.0 {
            junior_score += 1;
        }
    }

    let net = senior_score - junior_score;
    let level = if net >= 3 {
        SeniorityLevel::Senior
    } else if net >= 1 {
        SeniorityLevel::Mid
    } else if net <= -1 {
        SeniorityLevel::Junior
    } else {
        SeniorityLevel::Unknown
    };
    let confidence = (0.5 + 0.1 * net.abs() as f64).clamp(0.3, 0.95);
    debug!("seniority net {net} -> {level:?} ({confidence:.2})");

    SeniorityAssessment {
        level,
        confidence,
        evidence,
    }
}

/// 3 = senior, 2 = mid, 1 = junior, inferred from title tokens alone.
pub(crate) fn title_level(title: &str) -> u8 {
    let senior = to_terms(DEFAULT_SENIOR_TOKENS);
    let junior = to_terms(DEFAULT_JUNIOR_TOKENS);
    if any_term_in(&junior, title) {
        1
    } else if any_term_in(&senior, title) {
        3
    } else {
        2
    }
}

/// Direction of level changes across roles ordered by start date.
pub fn career_trajectory(roles: &[ParsedRole]) -> CareerTrajectory {
    let mut ordered: Vec<&ParsedRole> = roles.iter().collect();
    ordered.sort_by_key(|r| r.start_month_index);
    let levels: Vec<u8> = ordered.iter().map(|r| title_level(&r.title)).collect();

    let mut ascending = 0usize;
    let mut descending = 0usize;
    for pair in levels.windows(2) {
        if pair[1] > pair[0] {
            ascending += 1;
        } else if pair[1] < pair[0] {
            descending += 1;
        }
    }

    if ascending > descending && ascending >= 1 {
        CareerTrajectory::Ascending
    } else if descending > ascending && descending >= 1 {
        CareerTrajectory::Descending
    } else if roles.len() >= 3 {
        CareerTrajectory::Stable
    } else {
        CareerTrajectory::Unclear
    }
}

/// How recently each skill was exercised in a professional role. Skills
/// matched only outside role blocks stay `unknown`.
pub fn skill_recency(
    skills: &[(String, Vec<String>)],
    roles: &[ParsedRole],
    now: YearMonth,
) -> Vec<SkillRecency> {
    let now_index = now.month_index();
    skills
        .iter()
        .map(|(skill, terms)| {
            let last_seen = roles
                .iter()
                .filter(|r| r.professional)
                .filter(|r| {
                    any_term_in(terms, &r.title) || any_term_in(terms, &r.text_block)
                })
                .map(|r| r.end_month_index)
                .max();
            let category = match last_seen {
                Some(end) => {
                    let age = now_index - end;
                    if age <= CURRENT_MAX_MONTHS {
                        RecencyCategory::Current
                    } else if age <= RECENT_MAX_MONTHS {
                        RecencyCategory::Recent
                    } else if age <= STALE_MAX_MONTHS {
                        RecencyCategory::Stale
                    } else {
                        RecencyCategory::Old
                    }
                }
                None => RecencyCategory::Unknown,
            };
            SkillRecency {
                skill: skill.clone(),
                category,
                multiplier: category.multiplier(),
                last_seen_month_index: last_seen,
            }
        })
        .collect()
}

/// Average multiplier of the skills whose recency is known, adjusted for
/// the overall trajectory.
pub fn recency_analysis(
    skills: &[(String, Vec<String>)],
    roles: &[ParsedRole],
    now: YearMonth,
) -> RecencyAnalysis {
    let skill_recency = skill_recency(skills, roles, now);
    let trajectory = career_trajectory(roles);

    let known: Vec<f64> = skill_recency
        .iter()
        .filter(|s| s.category != RecencyCategory::Unknown)
        .map(|s| s.multiplier)
        .collect();
    let base = if known.is_empty() {
        0.7
    } else {
        known.iter().sum::<f64>() / known.len() as f64
    };
    let adjustment = match trajectory {
        CareerTrajectory::Ascending => 0.1,
        CareerTrajectory::Descending => -0.15,
        _ => 0.0,
    };

    RecencyAnalysis {
        skill_recency,
        trajectory,
        recency_score: (base + adjustment).clamp(0.0, 1.0),
    }
}
