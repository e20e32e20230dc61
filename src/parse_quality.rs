use log::debug;

use crate::models::{
    CareerTrajectory, FlagSeverity, ParseQuality, ParseQualityLevel, RedFlagReport, TextExtraction,
};
use crate::normalizer::looks_garbled;

/// Below this many characters the extraction is considered to have failed.
pub const MIN_TEXT_CHARS: usize = 200;

/// Additive confidence assessment of how much the rest of the analysis can
/// be trusted, from text volume, garble signals, date yield, section
/// detection and skill matching.
pub fn assess_parse_quality(
    text: &str,
    dates_parsed: usize,
    experience_section_found: bool,
    skills_matched: usize,
    skills_total: usize,
) -> ParseQuality {
    let mut confidence: f64 = 0.5;
    let mut issues: Vec<String> = Vec::new();

    let chars = text.chars().count();
    if chars >= 1500 {
        confidence += 0.15;
    } else if chars >= 600 {
        confidence += 0.1;
    } else if chars >= MIN_TEXT_CHARS {
        confidence += 0.05;
    } else {
        confidence -= 0.2;
        issues.push("Very little text was extracted".to_string());
    }

    let garble_ratio = non_latin_ratio(text);
    if garble_ratio > 0.1 {
        confidence -= 0.2;
        issues.push("High proportion of unexpected characters".to_string());
    }
    let garbled = looks_garbled(text);
    if garbled {
        confidence -= 0.1;
        issues.push("Text is dominated by single-letter tokens".to_string());
    }

    if dates_parsed >= 3 {
        confidence += 0.1;
    } else if dates_parsed >= 1 {
        confidence += 0.05;
    } else {
        confidence -= 0.1;
        issues.push("No dates could be parsed".to_string());
    }

    if experience_section_found {
        confidence += 0.1;
    } else {
        confidence -= 0.05;
        issues.push("Experience section was not found".to_string());
    }

    if skills_total > 0 {
        let ratio = skills_matched as f64 / skills_total as f64;
        if ratio >= 0.5 {
            confidence += 0.1;
        } else if ratio >= 0.2 {
            confidence += 0.05;
        } else if skills_matched == 0 {
            confidence -= 0.1;
            issues.push("None of the required skills were found".to_string());
        }
    }

    let confidence = confidence.clamp(0.0, 1.0);
    let overall = if confidence >= 0.7 {
        ParseQualityLevel::High
    } else if confidence >= 0.45 {
        ParseQualityLevel::Medium
    } else {
        ParseQualityLevel::Low
    };
    let text_extraction = if chars < MIN_TEXT_CHARS || garbled || garble_ratio > 0.1 {
        TextExtraction::Poor
    } else if chars >= 600 {
        TextExtraction::Good
    } else {
        TextExtraction::Partial
    };
    debug!("parse quality {overall:?} ({confidence:.2})");

    ParseQuality {
        overall,
        confidence,
        text_extraction,
        dates_parsed,
        experience_section_found,
        skills_matched,
        issues,
    }
}

/// Proportion of alphabetic characters outside the Latin and Arabic ranges
/// resumes legitimately use.
fn non_latin_ratio(text: &str) -> f64 {
    let mut alphabetic = 0usize;
    let mut unexpected = 0usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        alphabetic += 1;
        let code = c as u32;
        let expected = c.is_ascii_alphabetic()
            || (0x00C0..=0x024F).contains(&code)
            || (0x0600..=0x06FF).contains(&code);
        if !expected {
            unexpected += 1;
        }
    }
    if alphabetic == 0 {
        0.0
    } else {
        unexpected as f64 / alphabetic as f64
    }
}

/// Human-readable warnings surfaced alongside the analysis.
pub fn build_warnings(
    text: &str,
    years_experience: Option<f64>,
    min_years_experience: f64,
    red_flags: &RedFlagReport,
    trajectory: CareerTrajectory,
    parse_quality: &ParseQuality,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if text.chars().count() < MIN_TEXT_CHARS {
        warnings.push("Very little text was extracted from this resume".to_string());
    }
    if let Some(years) = years_experience {
        if years < 1.0 && min_years_experience >= 5.0 {
            warnings.push("Candidate appears very junior for a senior role".to_string());
        }
    }
    for flag in &red_flags.flags {
        if flag.severity == FlagSeverity::High {
            warnings.push(format!("High-severity red flag: {}", flag.evidence));
        }
    }
    if trajectory == CareerTrajectory::Descending {
        warnings.push("Career trajectory appears to be descending".to_string());
    }
    if parse_quality.overall == ParseQualityLevel::Low {
        warnings.push("Analysis confidence is low due to parse issues".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlagSeverity, RedFlag, RedFlagType};

    #[test]
    fn test_tiny_text_is_low_quality() {
        let quality = assess_parse_quality("short resume", 0, false, 0, 3);
        assert_eq!(quality.overall, ParseQualityLevel::Low);
        assert_eq!(quality.text_extraction, TextExtraction::Poor);
        assert!(!quality.issues.is_empty());
        assert!(quality.confidence < 0.45);
    }

    #[test]
    fn test_rich_resume_is_high_quality() {
        let text = "Senior engineer resume. ".repeat(80);
        let quality = assess_parse_quality(&text, 4, true, 3, 4);
        assert_eq!(quality.overall, ParseQualityLevel::High);
        assert_eq!(quality.text_extraction, TextExtraction::Good);
        assert!((quality.confidence - 0.95).abs() < 1e-9);
        assert!(quality.issues.is_empty());
    }

    #[test]
    fn test_garbled_text_penalized() {
        let mut garbled = String::from("R e s u m e o f J o h n\nS e n i o r D e v r o l e\n");
        garbled.push_str(&"plain filler text for volume. ".repeat(30));
        let quality = assess_parse_quality(&garbled, 2, true, 1, 2);
        assert!(quality
            .issues
            .iter()
            .any(|i| i.contains("single-letter")));
        assert_eq!(quality.text_extraction, TextExtraction::Poor);
    }

    #[test]
    fn test_non_latin_ratio_flags_tofu() {
        let text = "resume \u{4E00}\u{4E01}\u{4E02}\u{4E03}\u{4E04}\u{4E05} details";
        assert!(non_latin_ratio(text) > 0.1);
    }

    #[test]
    fn test_accented_text_is_expected() {
        let text = "Développeur expérimenté, diplômé en génie logiciel.";
        assert_eq!(non_latin_ratio(text), 0.0);
    }

    #[test]
    fn test_warnings_catalog() {
        let report = RedFlagReport {
            flags: vec![RedFlag {
                flag_type: RedFlagType::JobHopping,
                severity: FlagSeverity::High,
                evidence: "3 stints shorter than 12 months".to_string(),
                penalty: 10,
            }],
            total_penalty: 10,
        };
        let quality = assess_parse_quality("tiny", 0, false, 0, 1);
        let warnings = build_warnings(
            "tiny",
            Some(0.5),
            5.0,
            &report,
            CareerTrajectory::Descending,
            &quality,
        );
        assert!(warnings.iter().any(|w| w.contains("Very little text")));
        assert!(warnings.iter().any(|w| w.contains("very junior")));
        assert!(warnings.iter().any(|w| w.contains("High-severity red flag")));
        assert!(warnings.iter().any(|w| w.contains("descending")));
        assert!(warnings.iter().any(|w| w.contains("confidence is low")));
    }
}
