//! Boundary and range validation guards for numeric settings.
//!
//! This module provides constants and runtime validation functions that keep
//! generation runs bounded and every sampled value inside its domain.

use crate::error::ConfigError;

// ============================================================================
// Run Size Limits
// ============================================================================

/// Maximum number of installations generated in one run
pub const MAX_INSTALLATIONS_PER_RUN: usize = 100_000;

/// Minimum facilities drawn for one installation
pub const MIN_FACILITIES_PER_INSTALLATION: usize = 1;

/// Maximum facilities drawn for one installation
pub const MAX_FACILITIES_PER_INSTALLATION: usize = 500;

/// Minimum systems generated when a facility type has no registered system types
pub const MIN_FALLBACK_SYSTEMS: usize = 1;

/// Maximum systems generated when a facility type has no registered system types
pub const MAX_FALLBACK_SYSTEMS: usize = 100;

// ============================================================================
// Value Domains
// ============================================================================

/// Oldest construction age accepted for any entity, in years
pub const MAX_ENTITY_AGE_YEARS: u32 = 300;

/// Smallest dependency group id
pub const MIN_GROUP_ID: u8 = 1;

/// Largest dependency group id (single digit keeps position tokens unambiguous)
pub const MAX_GROUP_ID: u8 = 9;

/// Lower bound of condition values and thresholds
pub const MIN_CONDITION: f64 = 0.0;

/// Upper bound of condition values and thresholds
pub const MAX_CONDITION: f64 = 100.0;

/// Allowed deviation of a distribution's weight sum from 100
pub const DISTRIBUTION_WEIGHT_TOLERANCE: f64 = 0.01;

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates the number of installations requested for one run.
#[inline]
pub fn validate_installation_count(count: usize) -> Result<usize, ConfigError> {
    if count > MAX_INSTALLATIONS_PER_RUN {
        return Err(ConfigError::OutOfBounds {
            field: "installation_count",
            value: count as f64,
            min: 0.0,
            max: MAX_INSTALLATIONS_PER_RUN as f64,
        });
    }
    Ok(count)
}

/// Validates an inclusive count range `min..=max` against `lower..=upper`.
///
/// # Returns
/// Ok((min, max)) if the range is ordered and inside the limits
#[inline]
pub fn validate_count_range(
    field: &'static str,
    min: usize,
    max: usize,
    lower: usize,
    upper: usize,
) -> Result<(usize, usize), ConfigError> {
    if min > max {
        return Err(ConfigError::InvalidRange {
            field,
            min: min as f64,
            max: max as f64,
        });
    }
    for value in [min, max] {
        if value < lower || value > upper {
            return Err(ConfigError::OutOfBounds {
                field,
                value: value as f64,
                min: lower as f64,
                max: upper as f64,
            });
        }
    }
    Ok((min, max))
}

/// Validates a condition value or threshold lies within [0, 100].
#[inline]
pub fn validate_percentage(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() || !(MIN_CONDITION..=MAX_CONDITION).contains(&value) {
        return Err(ConfigError::OutOfBounds {
            field,
            value,
            min: MIN_CONDITION,
            max: MAX_CONDITION,
        });
    }
    Ok(value)
}

/// Validates the resiliency majority threshold, a whole percentage in 1..=100.
#[inline]
pub fn validate_resiliency_threshold(percent: u32) -> Result<u32, ConfigError> {
    if !(1..=100).contains(&percent) {
        return Err(ConfigError::OutOfBounds {
            field: "resiliency_threshold",
            value: percent as f64,
            min: 1.0,
            max: 100.0,
        });
    }
    Ok(percent)
}

/// Validates an age cap in whole years.
#[inline]
pub fn validate_age_years(field: &'static str, years: u32) -> Result<u32, ConfigError> {
    if years > MAX_ENTITY_AGE_YEARS {
        return Err(ConfigError::OutOfBounds {
            field,
            value: years as f64,
            min: 0.0,
            max: MAX_ENTITY_AGE_YEARS as f64,
        });
    }
    Ok(years)
}

/// Validates a dependency group id.
#[inline]
pub fn validate_group_id(id: u8) -> Result<u8, ConfigError> {
    if !(MIN_GROUP_ID..=MAX_GROUP_ID).contains(&id) {
        return Err(ConfigError::OutOfBounds {
            field: "group_id",
            value: id as f64,
            min: MIN_GROUP_ID as f64,
            max: MAX_GROUP_ID as f64,
        });
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_installation_count_limit() {
        assert!(validate_installation_count(0).is_ok());
        assert!(validate_installation_count(MAX_INSTALLATIONS_PER_RUN).is_ok());
        assert!(validate_installation_count(MAX_INSTALLATIONS_PER_RUN + 1).is_err());
    }

    #[test]
    fn test_count_range_ordering() {
        assert_eq!(validate_count_range("f", 8, 14, 1, 500), Ok((8, 14)));
        assert_matches!(
            validate_count_range("f", 14, 8, 1, 500),
            Err(ConfigError::InvalidRange { field: "f", .. })
        );
        assert_matches!(
            validate_count_range("f", 0, 8, 1, 500),
            Err(ConfigError::OutOfBounds { .. })
        );
    }

    #[test]
    fn test_percentage_rejects_nan() {
        assert!(validate_percentage("threshold", 25.0).is_ok());
        assert!(validate_percentage("threshold", 100.0).is_ok());
        assert!(validate_percentage("threshold", f64::NAN).is_err());
        assert!(validate_percentage("threshold", -0.5).is_err());
    }

    #[test]
    fn test_group_id_bounds() {
        assert!(validate_group_id(0).is_err());
        assert!(validate_group_id(1).is_ok());
        assert!(validate_group_id(9).is_ok());
        assert!(validate_group_id(10).is_err());
    }

    #[test]
    fn test_resiliency_threshold_bounds() {
        assert!(validate_resiliency_threshold(0).is_err());
        assert_eq!(validate_resiliency_threshold(70), Ok(70));
        assert!(validate_resiliency_threshold(101).is_err());
    }
}
