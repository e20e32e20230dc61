use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Degree, DegreeField, DegreeLevel, Education, ProjectScale};
use crate::normalizer::{floor_char_boundary, fold_for_match, truncate_middle, SNIPPET_MAX_CHARS};

static USER_SCALE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d[\d\s.,]*)\s*\+?\s*(millions?|mille|thousand|k|m)?\s*\b(users?|clients?|customers?|employees?|employes?|utilisateurs?|subscribers?|abonnes?)\b",
    )
    .expect("user scale regex")
});

static TEAM_SIZE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bteam of (\d{1,4})\b",
        r"\bequipe de (\d{1,4})\b",
        r"\bmanaged (\d{1,4})\b",
        r"\bencadrement de (\d{1,4})\b",
        r"\b(\d{1,4})[ -]person team\b",
        r"\b(\d{1,4}) direct reports\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("team size regex"))
    .collect()
});

const COMPANY_TYPE_TOKENS: &[&str] = &[
    "startup",
    "scale-up",
    "scaleup",
    "enterprise",
    "grand groupe",
    "pme",
    "faang",
    "fortune 500",
    "multinational",
    "agence",
    "agency",
];

const LARGE_COMPANY_TOKENS: &[&str] = &[
    "enterprise",
    "grand groupe",
    "faang",
    "fortune 500",
    "multinational",
];

const IMPACT_INDICATORS: &[&str] = &[
    "production",
    "launched",
    "migrated",
    "scaled",
    "shipped",
    "deployed",
    "revenue",
    "reduced",
    "increased",
    "optimized",
    "mis en production",
    "lancement",
];

static DEGREE_PATTERNS: Lazy<Vec<(DegreeLevel, Regex)>> = Lazy::new(|| {
    [
        (DegreeLevel::Phd, r"\bph\.?\s?d\b|\bdoctorat\b|\bdoctorate\b"),
        (
            DegreeLevel::Masters,
            r"\bmasters?\b|\bm\.?\s?sc\b|\bm\.?eng\b|\bmba\b|\bmastere\b|diplome d'ingenieur|ingenieur d'etat|\bbac\s*\+\s*5\b",
        ),
        (
            DegreeLevel::Bachelors,
            r"\bbachelors?\b|\bb\.?\s?sc\b|\bb\.?\s?eng\b|\blicence\b|\bbac\s*\+\s*3\b",
        ),
        (
            DegreeLevel::Associate,
            r"\bassociates?\b|\bdut\b|\bbts\b|\bdeug\b|\bbac\s*\+\s*2\b",
        ),
        (
            DegreeLevel::Bootcamp,
            r"\bbootcamp\b|\bnanodegree\b|certificat professionnel",
        ),
    ]
    .iter()
    .map(|(level, p)| (*level, Regex::new(p).expect("degree regex")))
    .collect()
});

const CS_FIELD_TOKENS: &[&str] = &[
    "computer science",
    "informatique",
    "software engineering",
    "computer engineering",
    "genie logiciel",
    "data science",
    "information technology",
    "computing",
];

const ENGINEERING_FIELD_TOKENS: &[&str] = &[
    "engineering",
    "ingenieur",
    "ingenierie",
    "genie",
    "electrical",
    "mechanical",
    "telecommunications",
    "telecom",
];

const RELATED_FIELD_TOKENS: &[&str] = &[
    "mathematics",
    "mathematiques",
    "physics",
    "physique",
    "statistics",
    "statistiques",
    "information systems",
    "systemes d'information",
];

const UNRELATED_FIELD_TOKENS: &[&str] = &[
    "business",
    "marketing",
    "finance",
    "biology",
    "law",
    "droit",
    "literature",
    "histoire",
    "psychology",
    "economics",
    "gestion",
];

static CERT_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"certifi(?:ed|cation|cat)").expect("cert regex"));

const CERT_RELEVANCE_TOKENS: &[&str] = &[
    "aws",
    "azure",
    "gcp",
    "google cloud",
    "kubernetes",
    "cka",
    "ckad",
    "scrum",
    "pmp",
    "cisco",
    "ccna",
    "comptia",
    "oracle",
    "java",
    "terraform",
    "devops",
];

/// Numeric and categorical signals about the scale the candidate has
/// worked at.
pub fn analyze_project_scale(text: &str) -> ProjectScale {
    let folded = fold_for_match(text);

    let max_user_scale = USER_SCALE_RE
        .captures_iter(&folded)
        .filter_map(|cap| {
            parse_scale_number(&cap[1], cap.get(2).map(|m| m.as_str()))
        })
        .max();

    let max_team_size = TEAM_SIZE_RES
        .iter()
        .flat_map(|re| re.captures_iter(&folded))
        .filter_map(|cap| cap[1].parse::<u32>().ok())
        .filter(|n| *n > 0 && *n < 10_000)
        .max();

    let company_types: Vec<String> = COMPANY_TYPE_TOKENS
        .iter()
        .filter(|t| folded.contains(*t))
        .map(|t| t.to_string())
        .collect();

    let impact_indicators: Vec<String> = IMPACT_INDICATORS
        .iter()
        .filter(|t| folded.contains(*t))
        .map(|t| t.to_string())
        .collect();

    let user_bonus = match max_user_scale {
        Some(n) if n >= 1_000_000 => 0.3,
        Some(n) if n >= 100_000 => 0.25,
        Some(n) if n >= 10_000 => 0.2,
        Some(n) if n >= 1_000 => 0.12,
        Some(n) if n >= 100 => 0.06,
        Some(_) => 0.02,
        None => 0.0,
    };
    let team_bonus = match max_team_size {
        Some(n) if n >= 20 => 0.2,
        Some(n) if n >= 10 => 0.15,
        Some(n) if n >= 5 => 0.1,
        Some(n) if n >= 2 => 0.05,
        _ => 0.0,
    };
    let company_bonus = if LARGE_COMPANY_TOKENS.iter().any(|t| folded.contains(t)) {
        0.1
    } else if !company_types.is_empty() {
        0.05
    } else {
        0.0
    };
    let indicator_bonus = (impact_indicators.len() as f64 * 0.02).min(0.1);

    let scale_score = (0.3 + user_bonus + team_bonus + company_bonus + indicator_bonus).clamp(0.0, 1.0);
    debug!(
        "scale: users {:?}, team {:?}, score {:.2}",
        max_user_scale, max_team_size, scale_score
    );

    ProjectScale {
        max_user_scale,
        max_team_size,
        company_types,
        impact_indicators,
        scale_score,
    }
}

/// "10,000", "1 200", "2" + "m"/"million"/"k" suffixes.
fn parse_scale_number(digits: &str, suffix: Option<&str>) -> Option<u64> {
    let cleaned: String = digits.chars().filter(|c| c.is_ascii_digit()).collect();
    let base: u64 = cleaned.parse().ok()?;
    if base == 0 {
        return None;
    }
    let multiplier = match suffix {
        Some("k") | Some("mille") | Some("thousand") => 1_000,
        Some("m") | Some("million") | Some("millions") => 1_000_000,
        _ => 1,
    };
    base.checked_mul(multiplier)
}

/// Degree families with a field classification from the surrounding
/// context, plus certification credit.
pub fn analyze_education(text: &str) -> Education {
    let folded = fold_for_match(text);
    let mut degrees: Vec<Degree> = Vec::new();

    for (level, regex) in DEGREE_PATTERNS.iter() {
        if let Some(m) = regex.find(&folded) {
            let field = classify_field(&folded, m.start(), m.end());
            let context = context_window(&folded, m.start(), m.end(), 60);
            degrees.push(Degree {
                level: *level,
                field,
                evidence: truncate_middle(context.trim(), SNIPPET_MAX_CHARS),
            });
        }
    }

    // Highest eligible degree: a clearly unrelated field does not count,
    // an unclassified one does.
    let best_degree = degrees
        .iter()
        .filter(|d| d.field != DegreeField::Unrelated)
        .max_by_key(|d| d.level)
        .cloned();

    let relevant_certifications = folded
        .lines()
        .filter(|line| CERT_LINE_RE.is_match(line))
        .filter(|line| CERT_RELEVANCE_TOKENS.iter().any(|t| line.contains(t)))
        .count();

    let base = best_degree
        .as_ref()
        .map(|d| d.level.score())
        .unwrap_or(0.5);
    let education_score =
        (base + 0.05 * relevant_certifications as f64).clamp(0.0, 1.0);

    Education {
        degrees,
        best_degree,
        relevant_certifications,
        education_score,
    }
}

fn classify_field(folded: &str, start: usize, end: usize) -> DegreeField {
    let context = context_window(folded, start, end, 100);
    if CS_FIELD_TOKENS.iter().any(|t| context.contains(t)) {
        DegreeField::Cs
    } else if ENGINEERING_FIELD_TOKENS.iter().any(|t| context.contains(t)) {
        DegreeField::Engineering
    } else if RELATED_FIELD_TOKENS.iter().any(|t| context.contains(t)) {
        DegreeField::Related
    } else if UNRELATED_FIELD_TOKENS.iter().any(|t| context.contains(t)) {
        DegreeField::Unrelated
    } else {
        DegreeField::Unknown
    }
}

fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = floor_char_boundary(text, start.saturating_sub(radius));
    let to = floor_char_boundary(text, (end + radius).min(text.len()));
    &text[from..to]
}
