use serde::Serialize;
use thiserror::Error;

use crate::models::RoleSpec;

/// Typed failures surfaced to the upstream spec loader. The analysis
/// pipeline itself is total: malformed candidate text degrades the result,
/// it never produces an error.
#[derive(Error, Debug)]
pub enum RankerError {
    #[error("Invalid role spec: {message}")]
    InvalidRoleSpec { message: String },

    #[error("Invalid project spec: {message}")]
    InvalidProjectSpec { message: String },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum ErrorSeverity {
    High,
    Low,
}

impl RankerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRoleSpec { .. } => "ROLE_SPEC_ERROR",
            Self::InvalidProjectSpec { .. } => "PROJECT_SPEC_ERROR",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidRoleSpec { .. } => ErrorSeverity::High,
            Self::InvalidProjectSpec { .. } => ErrorSeverity::High,
        }
    }
}

/// Structural validation for the loader. The pipeline clamps minor
/// numeric violations on its own; this catches the ones that indicate a
/// broken spec file rather than sloppy numbers.
pub fn validate_role_spec(role: &RoleSpec) -> Result<(), RankerError> {
    if role.role_id.trim().is_empty() {
        return Err(RankerError::InvalidRoleSpec {
            message: "roleId must not be empty".to_string(),
        });
    }
    if !role.min_years_experience.is_finite() {
        return Err(RankerError::InvalidRoleSpec {
            message: format!(
                "minYearsExperience must be finite, got {}",
                role.min_years_experience
            ),
        });
    }
    for skill in role
        .must_have_skills
        .iter()
        .chain(role.nice_to_have_skills.iter())
    {
        if skill.skill.trim().is_empty() {
            return Err(RankerError::InvalidRoleSpec {
                message: "skill name must not be empty".to_string(),
            });
        }
        if !skill.weight.is_finite() {
            return Err(RankerError::InvalidRoleSpec {
                message: format!("weight for \"{}\" must be finite", skill.skill),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoleSkill;

    #[test]
    fn test_valid_spec_passes() {
        let role = RoleSpec {
            role_id: "backend".to_string(),
            must_have_skills: vec![RoleSkill {
                skill: "rust".to_string(),
                weight: 1.0,
            }],
            ..RoleSpec::default()
        };
        assert!(validate_role_spec(&role).is_ok());
    }

    #[test]
    fn test_empty_role_id_rejected() {
        let role = RoleSpec::default();
        let err = validate_role_spec(&role).unwrap_err();
        assert_eq!(err.error_code(), "ROLE_SPEC_ERROR");
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let role = RoleSpec {
            role_id: "backend".to_string(),
            must_have_skills: vec![RoleSkill {
                skill: "rust".to_string(),
                weight: f64::NAN,
            }],
            ..RoleSpec::default()
        };
        assert!(validate_role_spec(&role).is_err());
    }
}
