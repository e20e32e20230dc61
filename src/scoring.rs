use log::{debug, info};

use crate::models::{
    CandidateFeatures, ComponentScores, FlagSeverity, RelevantExperience, RoleRecency, RoleSpec,
    ScoreResult, ScoringWeights, SeniorityLevel, SkillDepth, SkillMatch,
};

/// Fallback weights used whenever the configured weights do not sum to a
/// positive value: must-have, nice-to-have, experience, skill depth,
/// seniority, recency, project scale, education.
pub const DEFAULT_WEIGHTS: [f64; 8] = [0.30, 0.10, 0.20, 0.10, 0.10, 0.08, 0.08, 0.04];

/// Roles requiring at least this many years are scored as senior roles.
const SENIOR_ROLE_MIN_YEARS: f64 = 5.0;
/// Lower bound of the mid-role band.
const MID_ROLE_MIN_YEARS: f64 = 3.0;

/// Computes the weighted score, applies red-flag penalties and evaluates
/// the role's hard filters.
pub fn score_candidate(features: &CandidateFeatures, role: &RoleSpec) -> ScoreResult {
    let weights = normalized_weights(&role.scoring.weights);

    let component_scores = ComponentScores {
        must_have: skills_score(&features.must_have),
        nice_to_have: skills_score(&features.nice_to_have),
        experience: relevant_experience_score(
            &features.relevant_experience,
            role.min_years_experience,
        ),
        skill_depth: skill_depth_score(&features.skill_depth),
        seniority: seniority_score(features, role.min_years_experience),
        recency: features.recency.recency_score.clamp(0.0, 1.0),
        project_scale: features.project_scale.scale_score.clamp(0.0, 1.0),
        education: education_score(features.education.education_score, role.min_years_experience),
    };

    let weighted = weights.must_have * component_scores.must_have
        + weights.nice_to_have * component_scores.nice_to_have
        + weights.experience * component_scores.experience
        + weights.skill_depth * component_scores.skill_depth
        + weights.seniority * component_scores.seniority
        + weights.recency * component_scores.recency
        + weights.project_scale * component_scores.project_scale
        + weights.education * component_scores.education;

    let raw_score = (100.0 * weighted).round();
    let total_penalty = features.red_flags.total_penalty;
    let overall_score = (raw_score - f64::from(total_penalty)).max(0.0);

    let threshold_reasons = evaluate_thresholds(features, role, &component_scores);
    let below_threshold = !threshold_reasons.is_empty();

    info!(
        "scored {:.0}/{:.0} (penalty {}), below threshold: {}",
        overall_score, raw_score, total_penalty, below_threshold
    );

    ScoreResult {
        overall_score,
        raw_score,
        component_scores,
        normalized_weights: weights,
        total_penalty,
        below_threshold,
        threshold_reasons,
    }
}

/// Normalizes the eight configurable weights; non-positive sums fall back
/// to `DEFAULT_WEIGHTS` silently.
pub fn normalized_weights(weights: &ScoringWeights) -> ComponentScores {
    let raw = [
        weights.must_have.max(0.0),
        weights.nice_to_have.max(0.0),
        weights.experience.max(0.0),
        weights.skill_depth.max(0.0),
        weights.seniority.max(0.0),
        weights.recency.max(0.0),
        weights.project_scale.max(0.0),
        weights.education.max(0.0),
    ];
    let sum: f64 = raw.iter().sum();
    let source = if sum <= 0.0 {
        debug!("weights sum non-positive, using defaults");
        DEFAULT_WEIGHTS
    } else {
        [
            raw[0] / sum,
            raw[1] / sum,
            raw[2] / sum,
            raw[3] / sum,
            raw[4] / sum,
            raw[5] / sum,
            raw[6] / sum,
            raw[7] / sum,
        ]
    };
    ComponentScores {
        must_have: source[0],
        nice_to_have: source[1],
        experience: source[2],
        skill_depth: source[3],
        seniority: source[4],
        recency: source[5],
        project_scale: source[6],
        education: source[7],
    }
}

/// Weighted match ratio; an empty or zero-weight skill set scores 1.
fn skills_score(matches: &[SkillMatch]) -> f64 {
    let total: f64 = matches.iter().map(|m| m.weight.max(0.0)).sum();
    if total <= 0.0 {
        return 1.0;
    }
    let matched: f64 = matches
        .iter()
        .filter(|m| m.matched)
        .map(|m| m.weight.max(0.0))
        .sum();
    matched / total
}

/// Piecewise curve of candidate years against the role minimum.
pub fn experience_curve(candidate_years: Option<f64>, min_years: f64) -> f64 {
    if min_years <= 0.0 {
        return 1.0;
    }
    let Some(years) = candidate_years else {
        return 0.0;
    };
    let ratio = years / min_years;
    if ratio >= 1.5 {
        1.0
    } else if ratio >= 1.0 {
        0.8 + 0.4 * (ratio - 1.0)
    } else if ratio >= 0.6 {
        0.4 + (ratio - 0.6)
    } else {
        0.67 * ratio
    }
}

/// Experience curve over relevant years plus a bonus when the relevant work
/// is ongoing or recent.
fn relevant_experience_score(relevant: &RelevantExperience, min_years: f64) -> f64 {
    let years = relevant.relevant_years.or(relevant.total_years);
    let base = experience_curve(years, min_years);
    let bonus = if relevant
        .roles
        .iter()
        .any(|r| r.relevant && r.professional && r.recency == RoleRecency::Current)
    {
        0.1
    } else if relevant
        .roles
        .iter()
        .any(|r| r.relevant && r.professional && r.recency == RoleRecency::Recent)
    {
        0.05
    } else {
        0.0
    };
    (base + bonus).clamp(0.0, 1.0)
}

/// Seniority fit is contextual to the role tier: a junior candidate is a
/// poor fit for a senior role but a fine fit for a junior one.
fn seniority_score(features: &CandidateFeatures, min_years: f64) -> f64 {
    let level = features.seniority.level;
    let confidence = features.seniority.confidence;

    let score = if min_years >= SENIOR_ROLE_MIN_YEARS {
        match level {
            SeniorityLevel::Senior => 0.9 + 0.1 * confidence,
            SeniorityLevel::Mid => 0.5 + 0.2 * confidence,
            SeniorityLevel::Junior => 0.2 - 0.1 * confidence,
            SeniorityLevel::Unknown => 0.5,
        }
    } else if min_years >= MID_ROLE_MIN_YEARS {
        match level {
            SeniorityLevel::Senior => 0.85,
            SeniorityLevel::Mid => 0.8 + 0.2 * confidence,
            SeniorityLevel::Junior => 0.4 - 0.1 * confidence,
            SeniorityLevel::Unknown => 0.5,
        }
    } else {
        match level {
            SeniorityLevel::Senior => 0.6,
            SeniorityLevel::Mid => 0.8,
            SeniorityLevel::Junior => 0.9,
            SeniorityLevel::Unknown => 0.5,
        }
    };
    score.clamp(0.0, 1.0)
}

/// Education matters less the more senior the role.
fn education_score(edu: f64, min_years: f64) -> f64 {
    let edu = edu.clamp(0.0, 1.0);
    let score = if min_years >= SENIOR_ROLE_MIN_YEARS {
        0.5 + 0.3 * edu
    } else if min_years >= MID_ROLE_MIN_YEARS {
        0.4 + 0.4 * edu
    } else {
        0.3 + 0.5 * edu
    };
    score.clamp(0.0, 1.0)
}

fn skill_depth_score(depths: &[SkillDepth]) -> f64 {
    if depths.is_empty() {
        return 0.5;
    }
    let avg: f64 = depths.iter().map(|d| d.depth_score).sum::<f64>() / depths.len() as f64;
    let high_ratio = depths
        .iter()
        .filter(|d| d.context_quality == crate::models::ContextQuality::High)
        .count() as f64
        / depths.len() as f64;
    (avg * 0.7 + high_ratio * 0.3).clamp(0.0, 1.0)
}

/// Hard filters never zero a score; they flag the candidate and explain
/// why. Both must-have rules contribute reasons when both fail.
fn evaluate_thresholds(
    features: &CandidateFeatures,
    role: &RoleSpec,
    components: &ComponentScores,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(filters) = &role.scoring.hard_filters {
        if let Some(min_ratio) = filters.min_must_have_match_ratio {
            let min_ratio = min_ratio.clamp(0.0, 1.0);
            if components.must_have < min_ratio {
                reasons.push(format!(
                    "Must-have skill match {:.2} below required minimum {:.2}",
                    components.must_have, min_ratio
                ));
            }
        }

        if filters.require_all_must_have_skills {
            let missing: Vec<&str> = features
                .must_have
                .iter()
                .filter(|m| !m.matched)
                .map(|m| m.term.as_str())
                .collect();
            if !missing.is_empty() {
                reasons.push(format!("Missing required skills: {}", missing.join(", ")));
            }
        }

        if let Some(min_relevant) = filters.min_relevant_experience_years {
            let relevant = features
                .relevant_experience
                .relevant_years
                .or(features.relevant_experience.total_years)
                .unwrap_or(0.0);
            if relevant < min_relevant.max(0.0) {
                reasons.push(format!(
                    "Relevant experience {:.1} years below required {:.1}",
                    relevant, min_relevant
                ));
            }
        }

        if let Some(max_penalty) = filters.max_red_flag_penalty {
            let max_penalty = max_penalty.clamp(0.0, 25.0);
            if f64::from(features.red_flags.total_penalty) > max_penalty {
                reasons.push(format!(
                    "Red-flag penalty {} exceeds maximum {:.0}",
                    features.red_flags.total_penalty, max_penalty
                ));
            }
        }
    }

    if role.min_years_experience >= SENIOR_ROLE_MIN_YEARS
        && features.seniority.level == SeniorityLevel::Junior
        && features.seniority.confidence > 0.6
    {
        reasons.push("Junior-level candidate for senior role".to_string());
    }

    let high_flags = features
        .red_flags
        .flags
        .iter()
        .filter(|f| f.severity == FlagSeverity::High)
        .count();
    if high_flags >= 2 {
        reasons.push(format!("{high_flags} high-severity red flags"));
    }

    reasons
}
