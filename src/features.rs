use log::info;

use crate::career_analyzer::{assess_seniority, recency_analysis};
use crate::dates::{extract_intervals, months_to_years};
use crate::matcher::{any_term_in, match_keyword, match_skill, mention_indices};
use crate::models::{
    CandidateFeatures, ContextQuality, KeywordHit, ProjectSpec, RelevantExperience, RelevantRole,
    RoleRecency, RoleSpec, SkillDepth, SkillMatch, YearMonth,
};
use crate::normalizer::{floor_char_boundary, fold_for_match};
use crate::parse_quality::{assess_parse_quality, build_warnings};
use crate::profile_analyzer::{analyze_education, analyze_project_scale};
use crate::red_flag_detector::detect_red_flags;
use crate::segmenter::{segment, years_of_experience, SegmentedResume};

/// Role endings this recent keep a role "current" / "recent".
const CURRENT_MAX_MONTHS: i32 = 1;
const RECENT_MAX_MONTHS: i32 = 24;

/// Depth-context radius around a mention, in characters.
const CONTEXT_RADIUS_CHARS: usize = 200;

const HIGH_SIGNAL_WORDS: &[&str] = &[
    "production",
    "enterprise",
    "platform",
    "architecture",
    "led",
    "designed",
    "scaled",
    "saas",
    "b2b",
    "distributed",
    "critical",
];

const MEDIUM_SIGNAL_WORDS: &[&str] = &[
    "project",
    "application",
    "feature",
    "integration",
    "service",
    "api",
];

/// Runs every extractor over one candidate's canonical text. The role
/// segmentation is computed once and shared by every consumer.
pub fn extract_features(
    text: &str,
    project: &ProjectSpec,
    role: &RoleSpec,
    now: YearMonth,
) -> CandidateFeatures {
    let seg = segment(text, now);
    let years_experience = years_of_experience(text, &seg, now);

    let must_have: Vec<SkillMatch> = role
        .must_have_skills
        .iter()
        .map(|s| match_skill(&s.skill, &project.terms_for(&s.skill), s.weight, text))
        .collect();
    let nice_to_have: Vec<SkillMatch> = role
        .nice_to_have_skills
        .iter()
        .map(|s| match_skill(&s.skill, &project.terms_for(&s.skill), s.weight, text))
        .collect();
    let keyword_hits: Vec<KeywordHit> = role
        .keywords
        .iter()
        .map(|k| match_keyword(k, text))
        .collect();

    let relevant_experience = relevant_experience(&seg, role, years_experience, now);

    let skill_terms: Vec<(String, Vec<String>)> = role
        .must_have_skills
        .iter()
        .chain(role.nice_to_have_skills.iter())
        .map(|s| (s.skill.clone(), project.terms_for(&s.skill)))
        .collect();

    let skill_depth = skill_depths(text, &skill_terms, &seg, now);
    let seniority = assess_seniority(text, years_experience, role.seniority_indicators.as_ref());
    let recency = recency_analysis(&skill_terms, &seg.roles, now);
    let red_flags = detect_red_flags(&seg.roles, years_experience, now);
    let project_scale = analyze_project_scale(text);
    let education = analyze_education(text);

    let dates_parsed = extract_intervals(text, now).len();
    let skills_total = must_have.len() + nice_to_have.len();
    let skills_matched = must_have
        .iter()
        .chain(nice_to_have.iter())
        .filter(|m| m.matched)
        .count();
    let parse_quality = assess_parse_quality(
        text,
        dates_parsed,
        seg.section.is_some(),
        skills_matched,
        skills_total,
    );
    let warnings = build_warnings(
        text,
        years_experience,
        role.min_years_experience,
        &red_flags,
        recency.trajectory,
        &parse_quality,
    );

    info!(
        "extracted features: {}/{} skills, {:?} years, {} role(s), {} red flag(s)",
        skills_matched,
        skills_total,
        years_experience,
        seg.roles.len(),
        red_flags.flags.len()
    );

    CandidateFeatures {
        must_have,
        nice_to_have,
        keyword_hits,
        years_experience,
        relevant_experience,
        skill_depth,
        seniority,
        recency,
        red_flags,
        project_scale,
        education,
        parse_quality,
        warnings,
    }
}

fn role_recency(end_month_index: i32, now: YearMonth) -> RoleRecency {
    let age = now.month_index() - end_month_index;
    if age <= CURRENT_MAX_MONTHS {
        RoleRecency::Current
    } else if age <= RECENT_MAX_MONTHS {
        RoleRecency::Recent
    } else {
        RoleRecency::Old
    }
}

/// Tags every parsed role for relevance and recency, and totals the months
/// that are both professional and relevant.
fn relevant_experience(
    seg: &SegmentedResume,
    role: &RoleSpec,
    total_years: Option<f64>,
    now: YearMonth,
) -> RelevantExperience {
    let keywords: Vec<String> = role
        .experience_relevance_keywords
        .iter()
        .map(|k| fold_for_match(k))
        .collect();

    let roles: Vec<RelevantRole> = seg
        .roles
        .iter()
        .map(|r| {
            let haystack = fold_for_match(&format!("{}\n{}", r.title, r.text_block));
            let relevant =
                keywords.is_empty() || keywords.iter().any(|k| haystack.contains(k.as_str()));
            RelevantRole {
                title: r.title.clone(),
                start_month_index: r.start_month_index,
                end_month_index: r.end_month_index,
                duration_months: r.duration_months,
                professional: r.professional,
                relevant,
                recency: role_recency(r.end_month_index, now),
            }
        })
        .collect();

    let relevant_years = if keywords.is_empty() {
        total_years
    } else {
        let months: i32 = roles
            .iter()
            .filter(|r| r.relevant && r.professional)
            .map(|r| r.duration_months)
            .sum();
        if roles.is_empty() && total_years.is_none() {
            None
        } else {
            Some(months_to_years(months))
        }
    };

    RelevantExperience {
        total_years,
        relevant_years,
        roles,
    }
}

fn skill_depths(
    text: &str,
    skill_terms: &[(String, Vec<String>)],
    seg: &SegmentedResume,
    now: YearMonth,
) -> Vec<SkillDepth> {
    let char_positions: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();

    skill_terms
        .iter()
        .map(|(skill, terms)| {
            let mentions = mention_indices(terms, text);
            let mention_count = mentions.len();

            let in_experience_section = seg
                .section
                .as_ref()
                .map(|span| {
                    mentions
                        .iter()
                        .any(|&i| i >= span.byte_start && i < span.byte_end)
                })
                .unwrap_or(false);

            let in_recent_role = seg
                .roles
                .iter()
                .filter(|r| r.professional)
                .filter(|r| role_recency(r.end_month_index, now) != RoleRecency::Old)
                .any(|r| any_term_in(terms, &r.title) || any_term_in(terms, &r.text_block));

            let context_quality = best_context_quality(text, &char_positions, &mentions);

            let quality_bonus = match context_quality {
                ContextQuality::High => 0.3,
                ContextQuality::Medium => 0.15,
                ContextQuality::Low => 0.0,
            };
            let mut depth_score = 0.3 * (mention_count as f64 / 5.0).min(1.0) + quality_bonus;
            if in_experience_section {
                depth_score += 0.2;
            }
            if in_recent_role {
                depth_score += 0.2;
            }

            SkillDepth {
                skill: skill.clone(),
                mention_count,
                in_experience_section,
                in_recent_role,
                context_quality,
                depth_score: depth_score.clamp(0.0, 1.0),
            }
        })
        .collect()
}

/// Best signal found in the ±200-char window around any mention.
fn best_context_quality(
    text: &str,
    char_positions: &[usize],
    mentions: &[usize],
) -> ContextQuality {
    let high: Vec<String> = HIGH_SIGNAL_WORDS.iter().map(|w| w.to_string()).collect();
    let medium: Vec<String> = MEDIUM_SIGNAL_WORDS.iter().map(|w| w.to_string()).collect();

    let mut best = ContextQuality::Low;
    for &mention in mentions {
        let at = char_positions.partition_point(|&p| p < mention);
        let from_char = at.saturating_sub(CONTEXT_RADIUS_CHARS);
        let to_char = (at + CONTEXT_RADIUS_CHARS).min(char_positions.len());
        let from = char_positions
            .get(from_char)
            .copied()
            .unwrap_or(0);
        let to = if to_char == char_positions.len() {
            text.len()
        } else {
            char_positions[to_char]
        };
        let window = &text[floor_char_boundary(text, from)..floor_char_boundary(text, to)];

        if any_term_in(&high, window) {
            return ContextQuality::High;
        }
        if any_term_in(&medium, window) {
            best = ContextQuality::Medium;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecencyCategory, RoleSkill, SeniorityLevel};
    use std::collections::HashMap;

    const NOW: YearMonth = YearMonth { year: 2025, month: 6 };

    fn project_with_aliases(aliases: &[(&str, &[&str])]) -> ProjectSpec {
        let mut map = HashMap::new();
        for (skill, list) in aliases {
            map.insert(
                skill.to_string(),
                list.iter().map(|s| s.to_string()).collect(),
            );
        }
        ProjectSpec {
            project_id: "test".to_string(),
            skill_aliases: map,
            roles: vec![],
        }
    }

    fn role_with_skills(min_years: f64, must: &[&str], relevance: &[&str]) -> RoleSpec {
        RoleSpec {
            role_id: "r1".to_string(),
            title: "Engineer".to_string(),
            min_years_experience: min_years,
            must_have_skills: must
                .iter()
                .map(|s| RoleSkill {
                    skill: s.to_string(),
                    weight: 1.0,
                })
                .collect(),
            experience_relevance_keywords: relevance.iter().map(|s| s.to_string()).collect(),
            ..RoleSpec::default()
        }
    }

    const RESUME: &str = "\
Jane Smith

PROFESSIONAL EXPERIENCE

Senior Backend Engineer
Acme SaaS
Jan 2020 - present
Designed the production Python platform. Led a team of 6.
Python, PostgreSQL, Docker in daily use.

Backend Developer
Webshop GmbH
2016 - 2020
Built Python e-commerce services.

EDUCATION
MSc Computer Science, 2016

SKILLS
Python, PostgreSQL, Docker, Kafka";

    #[test]
    fn test_full_feature_bundle() {
        let project = project_with_aliases(&[]);
        let role = role_with_skills(5.0, &["python", "kafka"], &[]);
        let features = extract_features(RESUME, &project, &role, NOW);

        assert!(features.must_have[0].matched);
        assert!(features.must_have[1].matched);
        // 65 months (Jan 2020 - present) + 48 months (2016 - 2020).
        assert_eq!(features.years_experience, Some(9.4));
        assert_eq!(features.seniority.level, SeniorityLevel::Senior);
        assert!(features.parse_quality.experience_section_found);
        assert!(features.red_flags.flags.is_empty());
    }

    #[test]
    fn test_relevant_experience_defaults_to_total_without_keywords() {
        let project = project_with_aliases(&[]);
        let role = role_with_skills(3.0, &["python"], &[]);
        let features = extract_features(RESUME, &project, &role, NOW);

        let rel = &features.relevant_experience;
        assert_eq!(rel.total_years, rel.relevant_years);
        assert_eq!(rel.roles.len(), 2);
        assert!(rel.roles.iter().all(|r| r.relevant));
        assert_eq!(rel.roles[0].recency, RoleRecency::Current);
        assert_eq!(rel.roles[1].recency, RoleRecency::Old);
    }

    #[test]
    fn test_relevance_keywords_partition_roles() {
        let project = project_with_aliases(&[]);
        let role = role_with_skills(3.0, &["python"], &["e-commerce"]);
        let features = extract_features(RESUME, &project, &role, NOW);

        let rel = &features.relevant_experience;
        assert!(!rel.roles[0].relevant);
        assert!(rel.roles[1].relevant);
        // Only the 2016-2020 role (48 months) is relevant.
        assert_eq!(rel.relevant_years, Some(4.0));
    }

    #[test]
    fn test_skill_depth_composition() {
        let project = project_with_aliases(&[]);
        let role = role_with_skills(3.0, &["python", "kafka"], &[]);
        let features = extract_features(RESUME, &project, &role, NOW);

        let python = &features.skill_depth[0];
        assert_eq!(python.skill, "python");
        assert!(python.mention_count >= 3);
        assert!(python.in_experience_section);
        assert!(python.in_recent_role);
        assert_eq!(python.context_quality, ContextQuality::High);
        assert!(python.depth_score > 0.8);

        // Kafka only appears in the skills list.
        let kafka = &features.skill_depth[1];
        assert!(!kafka.in_experience_section);
        assert!(!kafka.in_recent_role);
        assert!(kafka.depth_score < python.depth_score);
    }

    #[test]
    fn test_skills_list_only_recency_is_unknown() {
        let project = project_with_aliases(&[]);
        let role = role_with_skills(3.0, &["kafka"], &[]);
        let features = extract_features(RESUME, &project, &role, NOW);
        assert_eq!(
            features.recency.skill_recency[0].category,
            RecencyCategory::Unknown
        );
        assert_eq!(features.recency.skill_recency[0].multiplier, 0.7);
    }

    #[test]
    fn test_alias_expands_matching() {
        let text = "Sr Software Engineer. 2019 - present at Acme. Led a team of 8.";
        let project = project_with_aliases(&[("leadership", &["led"])]);
        let role = role_with_skills(5.0, &["leadership"], &[]);
        let features = extract_features(text, &project, &role, NOW);
        assert!(features.must_have[0].matched);
        assert_eq!(
            features.must_have[0].evidence,
            vec!["Sr Software Engineer. 2019 - present at Acme. Led a team of 8."]
        );
    }

    #[test]
    fn test_tiny_text_features_degrade_gracefully() {
        let project = project_with_aliases(&[]);
        let role = role_with_skills(2.0, &["python"], &[]);
        let features = extract_features("Short note.", &project, &role, NOW);
        assert_eq!(features.years_experience, None);
        assert!(!features.must_have[0].matched);
        assert!(features
            .warnings
            .iter()
            .any(|w| w.contains("Very little text")));
    }
}
