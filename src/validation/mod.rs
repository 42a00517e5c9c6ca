//! Boundary checks for numeric settings.
//!
//! Every limit that bounds the amount of work a generation run can do lives in
//! [`bounds`]. Settings and distribution compilation call into these validators
//! eagerly so sampling never has to re-check them.

pub mod bounds;

pub use bounds::{
    DISTRIBUTION_WEIGHT_TOLERANCE, MAX_ENTITY_AGE_YEARS, MAX_FACILITIES_PER_INSTALLATION,
    MAX_FALLBACK_SYSTEMS, MAX_GROUP_ID, MAX_INSTALLATIONS_PER_RUN, MIN_GROUP_ID,
    validate_age_years, validate_count_range, validate_group_id, validate_installation_count,
    validate_percentage, validate_resiliency_threshold,
};
