//! Domain value objects with the NewType pattern for type safety
//!
//! Entity identifiers wrap a [`Uuid`] in a distinct type per entity kind so a
//! facility id can never be passed where a system id is expected:
//!
//! ```rust,ignore
//! let facility_id = FacilityId::from(uuid);
//! let system_id = SystemId::from(other_uuid);
//! // lookup_facility(facility_id) ✓ OK
//! // lookup_facility(system_id)   ✗ Compile error!
//! ```
//!
//! The module also holds the small closed vocabularies of the domain
//! (dependency tiers, resiliency grades) and the calendar month used as the
//! reference point for ages and forecasts.

use crate::error::ConfigError;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, EnumIter, EnumString};
use uuid::Uuid;

// ============================================================================
// Entity identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID.
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the wrapped UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Consumes self and returns the inner UUID.
            pub fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

entity_id!(
    /// Unique identifier for an installation (site).
    InstallationId
);

entity_id!(
    /// Unique identifier for a facility within an installation.
    FacilityId
);

entity_id!(
    /// Unique identifier for a system within a facility.
    SystemId
);

// ============================================================================
// YearMonth - reference calendar month
// ============================================================================

/// A calendar month used as the reference point for ages and predictions.
///
/// # Validation
/// - month must be in 1..=12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u8,
}

impl YearMonth {
    /// Creates a validated year/month pair.
    pub fn new(year: i32, month: u8) -> Result<Self, ConfigError> {
        if !(1..=12).contains(&month) {
            return Err(ConfigError::OutOfBounds {
                field: "month",
                value: month as f64,
                min: 1.0,
                max: 12.0,
            });
        }
        Ok(Self { year, month })
    }

    /// The current local month.
    pub fn current() -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            year: today.year(),
            month: today.month() as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Months elapsed since January of `year`, the month an entity built in
    /// `year` is assumed to enter service. Zero when `year` is in the future.
    pub fn months_since_year(&self, year: i32) -> u32 {
        let months = (i64::from(self.year) - i64::from(year)) * 12 + i64::from(self.month) - 1;
        u32::try_from(months.max(0)).unwrap_or(u32::MAX)
    }

    /// Shifts this month by `months` (which may be negative), carrying into
    /// the year. Returns `None` when the year leaves the `i32` range.
    pub fn add_months(&self, months: i64) -> Option<Self> {
        let total = i64::from(self.year)
            .checked_mul(12)?
            .checked_add(i64::from(self.month) - 1)?
            .checked_add(months)?;
        let year = i32::try_from(total.div_euclid(12)).ok()?;
        let month = total.rem_euclid(12) as u8 + 1;
        Some(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ConfigError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::OutOfBounds {
            field: "reference_month",
            value: f64::NAN,
            min: 1.0,
            max: 12.0,
        };
        let (year, month) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> String {
        value.to_string()
    }
}

// ============================================================================
// DependencyTier
// ============================================================================

/// Position of a facility in its installation's dependency hierarchy.
///
/// Ordered top to bottom: `Primary < Secondary < Tertiary`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum DependencyTier {
    #[strum(to_string = "P", serialize = "Primary")]
    Primary,
    #[strum(to_string = "S", serialize = "Secondary")]
    Secondary,
    #[strum(to_string = "T", serialize = "Tertiary")]
    Tertiary,
}

impl DependencyTier {
    /// Single-letter code used in position tokens.
    pub fn letter(&self) -> char {
        match self {
            DependencyTier::Primary => 'P',
            DependencyTier::Secondary => 'S',
            DependencyTier::Tertiary => 'T',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'P' => Some(DependencyTier::Primary),
            'S' => Some(DependencyTier::Secondary),
            'T' => Some(DependencyTier::Tertiary),
            _ => None,
        }
    }

    /// Whether a facility in this tier can support one in `lower`.
    pub fn supports(&self, lower: DependencyTier) -> bool {
        *self < lower
    }
}

impl fmt::Display for DependencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// ============================================================================
// ResiliencyGrade
// ============================================================================

/// Ordinal redundancy rating, `G1` worst to `G4` best.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumIter,
    EnumString,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum ResiliencyGrade {
    #[strum(to_string = "G1", serialize = "1")]
    G1,
    #[strum(to_string = "G2", serialize = "2")]
    G2,
    #[strum(to_string = "G3", serialize = "3")]
    G3,
    #[strum(to_string = "G4", serialize = "4")]
    G4,
}

impl ResiliencyGrade {
    /// Grades from best to worst.
    pub const BEST_FIRST: [ResiliencyGrade; 4] = [
        ResiliencyGrade::G4,
        ResiliencyGrade::G3,
        ResiliencyGrade::G2,
        ResiliencyGrade::G1,
    ];

    /// Numeric level, 1 through 4.
    pub fn level(&self) -> u8 {
        match self {
            ResiliencyGrade::G1 => 1,
            ResiliencyGrade::G2 => 2,
            ResiliencyGrade::G3 => 3,
            ResiliencyGrade::G4 => 4,
        }
    }
}
