use log::info;

use crate::features::extract_features;
use crate::models::{AnalysisInput, CandidateAnalysis, RoleSpec};
use crate::normalizer::normalize_text;
use crate::scoring::score_candidate;

/// Stateless per-candidate analysis pipeline. The engine holds no mutable
/// state, so one instance can serve any number of candidates concurrently
/// (`Send + Sync`); determinism is guaranteed by the injected clock in the
/// input.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisEngine;

impl AnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Normalizes the raw text, extracts the feature bundle and scores it.
    /// Always returns an analysis; malformed input degrades the result
    /// instead of failing (the warnings and parse quality say how much).
    pub fn analyze(&self, input: &AnalysisInput) -> CandidateAnalysis {
        info!(
            "analyzing candidate {} against role {}",
            input.candidate_id, input.role.role_id
        );

        let role = clamped_role(input.role);
        let text = normalize_text(input.raw_text);
        let features = extract_features(&text, input.project, &role, input.now);
        let score = score_candidate(&features, &role);

        info!(
            "candidate {} scored {:.0} (below threshold: {})",
            input.candidate_id, score.overall_score, score.below_threshold
        );

        CandidateAnalysis {
            candidate_id: input.candidate_id.to_string(),
            role_id: role.role_id.clone(),
            features,
            score,
        }
    }
}

/// Free-function convenience over a throwaway engine.
pub fn analyze(input: &AnalysisInput) -> CandidateAnalysis {
    AnalysisEngine::new().analyze(input)
}

/// Minor spec violations are clamped rather than rejected: negative
/// minimum years and negative weights become zero.
fn clamped_role(role: &RoleSpec) -> RoleSpec {
    let mut role = role.clone();
    if role.min_years_experience < 0.0 {
        log::warn!(
            "role {}: negative minYearsExperience clamped to 0",
            role.role_id
        );
        role.min_years_experience = 0.0;
    }
    for skill in role
        .must_have_skills
        .iter_mut()
        .chain(role.nice_to_have_skills.iter_mut())
    {
        if skill.weight < 0.0 {
            log::warn!(
                "role {}: negative weight for \"{}\" clamped to 0",
                role.role_id,
                skill.skill
            );
            skill.weight = 0.0;
        }
    }
    role
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectSpec, RoleSkill, YearMonth};

    const NOW: YearMonth = YearMonth { year: 2025, month: 6 };

    #[test]
    fn test_analyze_is_deterministic() {
        let project = ProjectSpec::default();
        let role = RoleSpec {
            role_id: "r1".to_string(),
            min_years_experience: 3.0,
            must_have_skills: vec![RoleSkill {
                skill: "python".to_string(),
                weight: 1.0,
            }],
            ..RoleSpec::default()
        };
        let input = AnalysisInput {
            candidate_id: "c1",
            raw_text: "Python developer\n2018 - present building services.",
            project: &project,
            role: &role,
            now: NOW,
        };
        let a = analyze(&input);
        let b = analyze(&input);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_reanalyzing_canonical_text_is_stable() {
        let project = ProjectSpec::default();
        let role = RoleSpec {
            role_id: "r1".to_string(),
            ..RoleSpec::default()
        };
        let raw = "Engineer\u{00A0}at Acme\r\n2019 - 2021\r\n\r\n\r\n\r\nPython services";
        let canonical = normalize_text(raw);
        let input_raw = AnalysisInput {
            candidate_id: "c1",
            raw_text: raw,
            project: &project,
            role: &role,
            now: NOW,
        };
        let input_canonical = AnalysisInput {
            raw_text: &canonical,
            ..input_raw
        };
        let from_raw = analyze(&input_raw);
        let from_canonical = analyze(&input_canonical);
        assert_eq!(from_raw.features, from_canonical.features);
        assert_eq!(from_raw.score, from_canonical.score);
    }

    #[test]
    fn test_negative_spec_values_are_clamped() {
        let project = ProjectSpec::default();
        let role = RoleSpec {
            role_id: "r1".to_string(),
            min_years_experience: -2.0,
            must_have_skills: vec![RoleSkill {
                skill: "python".to_string(),
                weight: -1.0,
            }],
            ..RoleSpec::default()
        };
        let input = AnalysisInput {
            candidate_id: "c1",
            raw_text: "Python developer, 2019 - 2021",
            project: &project,
            role: &role,
            now: NOW,
        };
        let analysis = analyze(&input);
        // min years 0 means the experience requirement is satisfied.
        assert_eq!(analysis.score.component_scores.experience, 1.0);
        assert_eq!(analysis.features.must_have[0].weight, 0.0);
    }

    #[test]
    fn test_empty_text_still_returns_analysis() {
        let project = ProjectSpec::default();
        let role = RoleSpec {
            role_id: "r1".to_string(),
            min_years_experience: 5.0,
            ..RoleSpec::default()
        };
        let input = AnalysisInput {
            candidate_id: "c1",
            raw_text: "",
            project: &project,
            role: &role,
            now: NOW,
        };
        let analysis = analyze(&input);
        assert_eq!(analysis.features.years_experience, None);
        assert!(analysis.score.overall_score >= 0.0);
        assert!(!analysis.features.warnings.is_empty());
    }
}
