// Candidate analysis pipeline: canonical text in, explainable scored
// analysis out. See `engine::analyze` for the entry point.

pub mod career_analyzer;
pub mod dates;
pub mod engine;
pub mod errors;
pub mod features;
pub mod matcher;
pub mod models;
pub mod normalizer;
pub mod parse_quality;
pub mod profile_analyzer;
pub mod red_flag_detector;
pub mod scoring;
pub mod segmenter;

pub use engine::{analyze, AnalysisEngine};
pub use errors::{validate_role_spec, RankerError};
pub use models::{
    AnalysisInput, CandidateAnalysis, CandidateFeatures, MonthInterval, ProjectSpec, RoleSkill,
    RoleSpec, ScoreResult, YearMonth,
};
pub use normalizer::{looks_garbled, normalize_text};
