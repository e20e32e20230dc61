use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A calendar month with an injected-clock friendly total ordering.
///
/// The pipeline never reads the system clock itself; callers pass the
/// `YearMonth` they want the analysis evaluated at (see `AnalysisInput`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1-based calendar month.
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month: month.clamp(1, 12),
        }
    }

    /// Total-month index: `year * 12 + (month - 1)`.
    pub fn month_index(&self) -> i32 {
        self.year * 12 + (self.month as i32 - 1)
    }

    pub fn from_index(index: i32) -> Self {
        Self {
            year: index.div_euclid(12),
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }

    /// Convenience for production callers; tests should inject a fixed value.
    pub fn now_utc() -> Self {
        let now = Utc::now();
        Self::new(now.year(), now.month())
    }
}

/// Right-open interval over month indices: `[start, end)`, `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthInterval {
    pub start: i32,
    pub end: i32,
}

impl MonthInterval {
    pub fn new(start: i32, end: i32) -> Option<Self> {
        if end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn width_months(&self) -> i32 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSkill {
    pub skill: String,
    #[serde(default = "default_skill_weight")]
    pub weight: f64,
}

fn default_skill_weight() -> f64 {
    1.0
}

/// Relative component weights; the scorer normalizes them. `budget` and
/// `contract` appear in role-spec files but are not consumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    #[serde(default)]
    pub must_have: f64,
    #[serde(default)]
    pub nice_to_have: f64,
    #[serde(default)]
    pub experience: f64,
    #[serde(default)]
    pub skill_depth: f64,
    #[serde(default)]
    pub seniority: f64,
    #[serde(default)]
    pub recency: f64,
    #[serde(default)]
    pub project_scale: f64,
    #[serde(default)]
    pub education: f64,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub contract: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardFilters {
    #[serde(default)]
    pub min_must_have_match_ratio: Option<f64>,
    #[serde(default)]
    pub require_all_must_have_skills: bool,
    #[serde(default)]
    pub min_relevant_experience_years: Option<f64>,
    #[serde(default)]
    pub max_red_flag_penalty: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSpec {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub hard_filters: Option<HardFilters>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeniorityIndicators {
    #[serde(default)]
    pub senior: Vec<String>,
    #[serde(default)]
    pub mid: Vec<String>,
    #[serde(default)]
    pub junior: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    #[serde(default)]
    pub role_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub min_years_experience: f64,
    #[serde(default)]
    pub must_have_skills: Vec<RoleSkill>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<RoleSkill>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub experience_relevance_keywords: Vec<String>,
    #[serde(default)]
    pub seniority_indicators: Option<SeniorityIndicators>,
    #[serde(default)]
    pub scoring: ScoringSpec,
}

/// Project-level configuration shared by all of the project's roles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub skill_aliases: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub roles: Vec<RoleSpec>,
}

impl RoleSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse role spec JSON")
    }
}

impl ProjectSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse project spec JSON")
    }

    /// The skill name plus every configured alias, in declaration order.
    pub fn terms_for(&self, skill: &str) -> Vec<String> {
        let mut terms = vec![skill.to_string()];
        if let Some(aliases) = self.skill_aliases.get(skill) {
            terms.extend(aliases.iter().cloned());
        }
        terms
    }
}

/// One segmented role from the Experience section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRole {
    pub title: String,
    pub start_month_index: i32,
    pub end_month_index: i32,
    /// Sum of the role's merged interval widths; always >= 1.
    pub duration_months: i32,
    pub text_block: String,
    pub professional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    pub term: String,
    pub weight: f64,
    pub matched: bool,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordHit {
    pub term: String,
    pub matched: bool,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleRecency {
    Current,
    Recent,
    Old,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantRole {
    pub title: String,
    pub start_month_index: i32,
    pub end_month_index: i32,
    pub duration_months: i32,
    pub professional: bool,
    pub relevant: bool,
    pub recency: RoleRecency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantExperience {
    pub total_years: Option<f64>,
    pub relevant_years: Option<f64>,
    pub roles: Vec<RelevantRole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextQuality {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDepth {
    pub skill: String,
    pub mention_count: usize,
    pub in_experience_section: bool,
    pub in_recent_role: bool,
    pub context_quality: ContextQuality,
    pub depth_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeniorityLevel {
    Senior,
    Mid,
    Junior,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeniorityAssessment {
    pub level: SeniorityLevel,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyCategory {
    Current,
    Recent,
    Stale,
    Old,
    Unknown,
}

impl RecencyCategory {
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Current => 1.0,
            Self::Recent => 0.85,
            Self::Stale => 0.6,
            Self::Old => 0.3,
            Self::Unknown => 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecency {
    pub skill: String,
    pub category: RecencyCategory,
    pub multiplier: f64,
    pub last_seen_month_index: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareerTrajectory {
    Ascending,
    Descending,
    Stable,
    Unclear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecencyAnalysis {
    pub skill_recency: Vec<SkillRecency>,
    pub trajectory: CareerTrajectory,
    pub recency_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlagType {
    JobHopping,
    EmploymentGap,
    TitleInflation,
    CareerRegression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedFlag {
    pub flag_type: RedFlagType,
    pub severity: FlagSeverity,
    pub evidence: String,
    pub penalty: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedFlagReport {
    pub flags: Vec<RedFlag>,
    /// Capped at 25.
    pub total_penalty: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectScale {
    pub max_user_scale: Option<u64>,
    pub max_team_size: Option<u32>,
    pub company_types: Vec<String>,
    pub impact_indicators: Vec<String>,
    pub scale_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeLevel {
    Bootcamp,
    Associate,
    Bachelors,
    Masters,
    Phd,
}

impl DegreeLevel {
    pub fn score(&self) -> f64 {
        match self {
            Self::Phd => 1.0,
            Self::Masters => 0.9,
            Self::Bachelors => 0.8,
            Self::Associate => 0.6,
            Self::Bootcamp => 0.55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeField {
    Cs,
    Engineering,
    Related,
    Unrelated,
    Unknown,
}

impl DegreeField {
    pub fn is_relevant(&self) -> bool {
        matches!(self, Self::Cs | Self::Engineering | Self::Related)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Degree {
    pub level: DegreeLevel,
    pub field: DegreeField,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub degrees: Vec<Degree>,
    pub best_degree: Option<Degree>,
    pub relevant_certifications: usize,
    pub education_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseQualityLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextExtraction {
    Good,
    Partial,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseQuality {
    pub overall: ParseQualityLevel,
    pub confidence: f64,
    pub text_extraction: TextExtraction,
    pub dates_parsed: usize,
    pub experience_section_found: bool,
    pub skills_matched: usize,
    pub issues: Vec<String>,
}

/// The full per-candidate feature bundle produced by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFeatures {
    pub must_have: Vec<SkillMatch>,
    pub nice_to_have: Vec<SkillMatch>,
    pub keyword_hits: Vec<KeywordHit>,
    pub years_experience: Option<f64>,
    pub relevant_experience: RelevantExperience,
    pub skill_depth: Vec<SkillDepth>,
    pub seniority: SeniorityAssessment,
    pub recency: RecencyAnalysis,
    pub red_flags: RedFlagReport,
    pub project_scale: ProjectScale,
    pub education: Education,
    pub parse_quality: ParseQuality,
    pub warnings: Vec<String>,
}

/// Per-component scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScores {
    pub must_have: f64,
    pub nice_to_have: f64,
    pub experience: f64,
    pub skill_depth: f64,
    pub seniority: f64,
    pub recency: f64,
    pub project_scale: f64,
    pub education: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// `max(0, raw_score - total_penalty)`.
    pub overall_score: f64,
    pub raw_score: f64,
    pub component_scores: ComponentScores,
    pub normalized_weights: ComponentScores,
    pub total_penalty: u32,
    pub below_threshold: bool,
    pub threshold_reasons: Vec<String>,
}

/// Immutable analysis output for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateAnalysis {
    pub candidate_id: String,
    pub role_id: String,
    pub features: CandidateFeatures,
    pub score: ScoreResult,
}

/// Everything the pipeline needs for one candidate. The clock is part of
/// the input so analyses are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub candidate_id: &'a str,
    pub raw_text: &'a str,
    pub project: &'a ProjectSpec,
    pub role: &'a RoleSpec,
    pub now: YearMonth,
}
