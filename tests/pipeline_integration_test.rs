use std::collections::HashMap;

use resume_ranker::models::{
    AnalysisInput, HardFilters, ProjectSpec, RecencyCategory, RoleSkill, RoleSpec, ScoringSpec,
    ScoringWeights, SeniorityLevel, YearMonth,
};
use resume_ranker::{analyze, AnalysisEngine};

const NOW: YearMonth = YearMonth { year: 2025, month: 6 };

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn project() -> ProjectSpec {
    ProjectSpec::default()
}

fn project_with_alias(skill: &str, aliases: &[&str]) -> ProjectSpec {
    let mut map = HashMap::new();
    map.insert(
        skill.to_string(),
        aliases.iter().map(|a| a.to_string()).collect(),
    );
    ProjectSpec {
        project_id: "hiring".to_string(),
        skill_aliases: map,
        roles: vec![],
    }
}

fn role(min_years: f64, must: &[(&str, f64)]) -> RoleSpec {
    RoleSpec {
        role_id: "role-under-test".to_string(),
        title: "Engineer".to_string(),
        min_years_experience: min_years,
        must_have_skills: must
            .iter()
            .map(|(skill, weight)| RoleSkill {
                skill: skill.to_string(),
                weight: *weight,
            })
            .collect(),
        ..RoleSpec::default()
    }
}

fn input<'a>(
    text: &'a str,
    project: &'a ProjectSpec,
    role: &'a RoleSpec,
) -> AnalysisInput<'a> {
    AnalysisInput {
        candidate_id: "candidate-1",
        raw_text: text,
        project,
        role,
        now: NOW,
    }
}

#[test]
fn test_senior_leadership_candidate() {
    init_logging();
    let text = "Sr Software Engineer. 2019 - present at Acme. Led a team of 8.";
    let project = project_with_alias("leadership", &["led"]);
    let role = role(5.0, &[("leadership", 1.0)]);
    let analysis = analyze(&input(text, &project, &role));

    assert_eq!(analysis.features.years_experience, Some(6.4));
    assert_eq!(analysis.features.seniority.level, SeniorityLevel::Senior);
    assert!(analysis.features.must_have[0].matched);
    assert_eq!(
        analysis.features.must_have[0].evidence,
        vec!["Sr Software Engineer. 2019 - present at Acme. Led a team of 8."]
    );
    // Curve 0.912 plus the current-role bonus, clamped.
    assert_eq!(analysis.score.component_scores.experience, 1.0);
    assert!(!analysis.score.below_threshold);
}

#[test]
fn test_internship_only_candidate_flagged() {
    let text = "Stagiaire – Mars 2024 – Juin 2024. PFE.";
    let project = project();
    let mut role = role(2.0, &[]);
    role.scoring.hard_filters = Some(HardFilters {
        min_relevant_experience_years: Some(1.0),
        ..HardFilters::default()
    });
    let analysis = analyze(&input(text, &project, &role));

    assert_eq!(analysis.features.years_experience, Some(0.0));
    assert!(analysis.score.below_threshold);
    assert!(analysis
        .score
        .threshold_reasons
        .iter()
        .any(|r| r.contains("Relevant experience")));
}

#[test]
fn test_junior_candidate_for_senior_role() {
    let text = "Junior Developer 2023–2024. Junior Developer 2024–present.";
    let project = project();
    let role = role(5.0, &[]);
    let analysis = analyze(&input(text, &project, &role));

    assert_eq!(analysis.features.seniority.level, SeniorityLevel::Junior);
    assert!(analysis.features.seniority.confidence > 0.6);
    assert!(analysis.score.below_threshold);
    assert!(analysis
        .score
        .threshold_reasons
        .contains(&"Junior-level candidate for senior role".to_string()));
}

#[test]
fn test_short_skill_word_boundary() {
    let text = "SKILLS\nReact, Node.js, Go, TypeScript";
    let project = project();
    let role = role(0.0, &[("go", 1.0)]);
    let analysis = analyze(&input(text, &project, &role));
    assert!(analysis.features.must_have[0].matched);

    let negative = "Worked mostly on Google integrations";
    let analysis = analyze(&input(negative, &project, &role));
    assert!(!analysis.features.must_have[0].matched);

    let aliased_project = project_with_alias("go", &["golang"]);
    let aliased_text = "Backend services in golang";
    let analysis = analyze(&AnalysisInput {
        candidate_id: "candidate-1",
        raw_text: aliased_text,
        project: &aliased_project,
        role: &role,
        now: NOW,
    });
    assert!(analysis.features.must_have[0].matched);
}

#[test]
fn test_fragmented_career_totals() {
    let text = "EXPERIENCE\n2015-2016, 2018-2019, 2020-2021, 2023-present\nConsulting work across several shops.";
    let project = project();
    let role = role(5.0, &[]);
    let analysis = analyze(&input(text, &project, &role));

    // 12 + 12 + 12 + 29 months across the merged interval union.
    assert_eq!(analysis.features.years_experience, Some(5.4));
    assert!(analysis.features.parse_quality.experience_section_found);
    assert!(analysis.features.parse_quality.dates_parsed >= 4);
}

#[test]
fn test_genuine_job_hopper_is_flagged() {
    let text = "\
EXPERIENCE

Consultant
Mar 2021 - Aug 2021
Short engagement.

Consultant
Jan 2022 - Jun 2022
Short engagement.

Consultant
Feb 2023 - Jul 2023
Short engagement.

Engineer
2024 - present
Ongoing work.";
    let project = project();
    let role = role(3.0, &[]);
    let analysis = analyze(&input(text, &project, &role));

    let hop = analysis
        .features
        .red_flags
        .flags
        .iter()
        .find(|f| format!("{:?}", f.flag_type) == "JobHopping")
        .expect("job hopping flag");
    assert_eq!(hop.penalty, 10);
    assert!(analysis.score.overall_score <= analysis.score.raw_score - 10.0);
}

#[test]
fn test_career_regression_and_descending_trajectory() {
    let text = "Senior Architect 2018-2022\nJunior Engineer 2022-2025";
    let project = project();
    let role = role(3.0, &[]);
    let analysis = analyze(&input(text, &project, &role));

    let regression = analysis
        .features
        .red_flags
        .flags
        .iter()
        .find(|f| format!("{:?}", f.flag_type) == "CareerRegression")
        .expect("regression flag");
    assert_eq!(regression.penalty, 5);
    assert_eq!(
        format!("{:?}", analysis.features.recency.trajectory),
        "Descending"
    );
    // Unknown-skill base 0.7 minus the descending adjustment.
    assert!((analysis.features.recency.recency_score - 0.55).abs() < 1e-9);
    assert!(analysis
        .features
        .warnings
        .iter()
        .any(|w| w.contains("descending")));
}

#[test]
fn test_determinism_byte_for_byte() {
    let text = "\
Jane Smith

EXPERIENCE

Senior Engineer
Acme
Jan 2019 - present
Python platform work at scale, led a team of 12.

EDUCATION
MSc Computer Science, 2014";
    let project = project_with_alias("python", &["py"]);
    let role = role(5.0, &[("python", 2.0)]);
    let engine = AnalysisEngine::new();

    let first = engine.analyze(&input(text, &project, &role));
    let second = engine.analyze(&input(text, &project, &role));
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_alias_expansion_is_monotone() {
    let text = "Delivered k8s migrations for clients.";
    let bare = project();
    let aliased = project_with_alias("kubernetes", &["k8s"]);
    let role = role(0.0, &[("kubernetes", 1.0)]);

    let without = analyze(&input(text, &bare, &role));
    let with = analyze(&input(text, &aliased, &role));

    // Adding an alias can only add matches, never remove them.
    assert!(!without.features.must_have[0].matched);
    assert!(with.features.must_have[0].matched);
}

#[test]
fn test_skills_list_only_skill_has_unknown_recency() {
    let text = "\
EXPERIENCE

Engineer
2019 - 2024
Backend work in Python.

SKILLS
Python, Terraform";
    let project = project();
    let role = role(3.0, &[("terraform", 1.0)]);
    let analysis = analyze(&input(text, &project, &role));

    let recency = &analysis.features.recency.skill_recency[0];
    assert_eq!(recency.category, RecencyCategory::Unknown);
    assert_eq!(recency.multiplier, 0.7);
}

#[test]
fn test_malformed_weights_fall_back_to_defaults() {
    let text = "Python developer, 2019 - 2023.";
    let project = project();
    let mut role = role(2.0, &[("python", 1.0)]);
    role.scoring = ScoringSpec {
        weights: ScoringWeights {
            must_have: -1.0,
            ..ScoringWeights::default()
        },
        hard_filters: None,
    };
    let analysis = analyze(&input(text, &project, &role));
    assert!((analysis.score.normalized_weights.must_have - 0.30).abs() < 1e-9);
    // Fallback is silent: no weight warning is emitted.
    assert!(analysis
        .features
        .warnings
        .iter()
        .all(|w| !w.contains("weight")));
}

#[test]
fn test_empty_text_degrades_gracefully() {
    let project = project();
    let role = role(5.0, &[("python", 1.0)]);
    let analysis = analyze(&input("", &project, &role));

    assert_eq!(analysis.features.years_experience, None);
    assert_eq!(
        format!("{:?}", analysis.features.parse_quality.overall),
        "Low"
    );
    assert!(analysis
        .features
        .warnings
        .iter()
        .any(|w| w.contains("Very little text")));
    assert!(analysis.score.overall_score >= 0.0);
}

#[test]
fn test_evidence_snippets_come_from_the_text() {
    let text = "\
EXPERIENCE

Data Engineer
Jan 2021 - present
Maintained Spark pipelines in production for analytics.";
    let project = project();
    let role = role(2.0, &[("spark", 1.0)]);
    let analysis = analyze(&input(text, &project, &role));

    let skill = &analysis.features.must_have[0];
    assert!(skill.matched);
    let evidence = &skill.evidence[0];
    assert!(!evidence.is_empty());
    assert!(text.contains(evidence.as_str()));
}
