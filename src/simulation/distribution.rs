//! Weighted percentage distributions.
//!
//! A distribution is an ordered list of segments whose weights sum to 100.
//! Selection draws a uniform value in `[0, 100)` and walks the cumulative
//! weights left to right; the first segment whose cumulative bound exceeds the
//! draw wins. Validation happens once, when the distribution is built.
//!
//! # Example
//!
//! ```rust,ignore
//! let condition = NumericDistribution::new(
//!     "condition",
//!     &[
//!         SegmentSpec::pair(7.0, "1-50"),
//!         SegmentSpec::pair(88.0, "50-85"),
//!         SegmentSpec::pair(5.0, "85-100"),
//!     ],
//! )?;
//! let value = condition.sample(&mut rng);
//! ```

use crate::config::SegmentSpec;
use crate::domain::{DependencyTier, ResiliencyGrade};
use crate::error::ConfigError;
use crate::validation::bounds::DISTRIBUTION_WEIGHT_TOLERANCE;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::fmt;

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*-\s*(-?\d+(?:\.\d+)?)\s*$").expect("valid range regex")
});

static SEGMENT_TEXT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*:\s*(\S.*?)\s*$").expect("valid segment regex")
});

// ============================================================================
// Segment values
// ============================================================================

/// What a segment yields once selected.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentValue {
    /// Uniform draw from `min..=max`
    Range { min: f64, max: f64 },
    /// Returned verbatim
    Fixed(f64),
    /// Non-numeric label returned verbatim
    Category(String),
}

impl SegmentValue {
    /// Interprets segment text: `"1-50"` is a range (reversed bounds are
    /// swapped), `"3"` is a fixed number, anything else is a category.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some(caps) = RANGE_PATTERN.captures(trimmed) {
            let a = caps[1].parse::<f64>();
            let b = caps[2].parse::<f64>();
            if let (Ok(a), Ok(b)) = (a, b) {
                return SegmentValue::Range {
                    min: a.min(b),
                    max: a.max(b),
                };
            }
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => SegmentValue::Fixed(value),
            _ => SegmentValue::Category(trimmed.to_string()),
        }
    }

    /// Smallest and largest number this segment can produce.
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        match self {
            SegmentValue::Range { min, max } => Some((*min, *max)),
            SegmentValue::Fixed(value) => Some((*value, *value)),
            SegmentValue::Category(_) => None,
        }
    }
}

impl fmt::Display for SegmentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentValue::Range { min, max } => write!(f, "{min}-{max}"),
            SegmentValue::Fixed(value) => write!(f, "{value}"),
            SegmentValue::Category(label) => f.write_str(label),
        }
    }
}

/// One weighted segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub weight: f64,
    pub value: SegmentValue,
}

// ============================================================================
// Configuration form
// ============================================================================

impl TryFrom<&SegmentSpec> for Segment {
    type Error = ConfigError;

    fn try_from(spec: &SegmentSpec) -> Result<Self, Self::Error> {
        match spec {
            SegmentSpec::Pair { weight, value } => Ok(Segment {
                weight: *weight,
                value: SegmentValue::parse(&value.to_text()),
            }),
            SegmentSpec::Text(text) => {
                let malformed = || ConfigError::MalformedSegment(text.clone());
                let caps = SEGMENT_TEXT_PATTERN.captures(text).ok_or_else(malformed)?;
                let weight = caps[1].parse::<f64>().map_err(|_| malformed())?;
                Ok(Segment {
                    weight,
                    value: SegmentValue::parse(&caps[2]),
                })
            }
        }
    }
}

// ============================================================================
// ProbabilityDistribution
// ============================================================================

/// A validated weighted distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution {
    name: String,
    segments: Vec<Segment>,
    cumulative: Vec<f64>,
}

impl ProbabilityDistribution {
    /// Validates and builds a distribution.
    ///
    /// # Errors
    /// - no segments
    /// - a weight that is not finite and positive
    /// - weights summing to anything other than 100 (±0.01)
    pub fn new(name: impl Into<String>, segments: Vec<Segment>) -> Result<Self, ConfigError> {
        let name = name.into();
        if segments.is_empty() {
            return Err(ConfigError::EmptyDistribution { name });
        }

        let mut cumulative = Vec::with_capacity(segments.len());
        let mut total = 0.0;
        for (index, segment) in segments.iter().enumerate() {
            if !segment.weight.is_finite() || segment.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name,
                    index,
                    weight: segment.weight,
                });
            }
            total += segment.weight;
            cumulative.push(total);
        }

        if (total - 100.0).abs() > DISTRIBUTION_WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum {
                name,
                total,
                tolerance: DISTRIBUTION_WEIGHT_TOLERANCE,
            });
        }

        Ok(Self {
            name,
            segments,
            cumulative,
        })
    }

    /// Builds a distribution from its settings form.
    pub fn from_specs(name: impl Into<String>, specs: &[SegmentSpec]) -> Result<Self, ConfigError> {
        let segments = specs
            .iter()
            .map(Segment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(name, segments)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Index of the segment selected by one uniform draw in `[0, 100)`.
    pub fn select_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let draw = rng.gen_range(0.0..100.0);
        self.index_for_draw(draw)
    }

    /// Segment selection for a given draw. Draws past the last cumulative
    /// bound (weights summing slightly under 100) land on the last segment.
    pub fn index_for_draw(&self, draw: f64) -> usize {
        self.cumulative
            .iter()
            .position(|bound| draw < *bound)
            .unwrap_or(self.segments.len() - 1)
    }

    pub fn select_segment<R: Rng + ?Sized>(&self, rng: &mut R) -> &Segment {
        &self.segments[self.select_index(rng)]
    }

    /// Selects a segment, then resolves its value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Sample<'_> {
        let segment = self.select_segment(rng);
        match &segment.value {
            SegmentValue::Range { min, max } => Sample::Number(rng.gen_range(*min..=*max)),
            SegmentValue::Fixed(value) => Sample::Number(*value),
            SegmentValue::Category(label) => Sample::Category(label),
        }
    }
}

/// One drawn value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample<'a> {
    Number(f64),
    Category(&'a str),
}

// ============================================================================
// Typed distributions
// ============================================================================

/// A distribution whose every segment is numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericDistribution {
    inner: ProbabilityDistribution,
    bounds: Vec<(f64, f64)>,
}

impl NumericDistribution {
    pub fn new(name: impl Into<String>, specs: &[SegmentSpec]) -> Result<Self, ConfigError> {
        Self::try_from(ProbabilityDistribution::from_specs(name, specs)?)
    }

    pub fn inner(&self) -> &ProbabilityDistribution {
        &self.inner
    }

    /// Smallest and largest value any segment can produce.
    pub fn bounds(&self) -> (f64, f64) {
        self.bounds
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(a, b)| {
                (lo.min(a), hi.max(b))
            })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (min, max) = self.bounds[self.inner.select_index(rng)];
        if min == max {
            min
        } else {
            rng.gen_range(min..=max)
        }
    }
}

impl TryFrom<ProbabilityDistribution> for NumericDistribution {
    type Error = ConfigError;

    fn try_from(inner: ProbabilityDistribution) -> Result<Self, Self::Error> {
        let bounds = inner
            .segments()
            .iter()
            .map(|segment| {
                segment
                    .value
                    .numeric_bounds()
                    .ok_or_else(|| ConfigError::NonNumericSegment {
                        name: inner.name().to_string(),
                        value: segment.value.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { inner, bounds })
    }
}

/// A distribution over resiliency grades (`1`-`4` or `G1`-`G4`).
#[derive(Debug, Clone, PartialEq)]
pub struct GradeDistribution {
    inner: ProbabilityDistribution,
    grades: Vec<ResiliencyGrade>,
}

impl GradeDistribution {
    pub fn new(name: impl Into<String>, specs: &[SegmentSpec]) -> Result<Self, ConfigError> {
        let inner = ProbabilityDistribution::from_specs(name, specs)?;
        let grades = inner
            .segments()
            .iter()
            .map(|segment| {
                segment
                    .value
                    .to_string()
                    .parse::<ResiliencyGrade>()
                    .map_err(|_| ConfigError::InvalidGrade {
                        name: inner.name().to_string(),
                        value: segment.value.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { inner, grades })
    }

    pub fn inner(&self) -> &ProbabilityDistribution {
        &self.inner
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ResiliencyGrade {
        self.grades[self.inner.select_index(rng)]
    }
}

/// A distribution over dependency tiers (`P`, `S`, `T`).
#[derive(Debug, Clone, PartialEq)]
pub struct TierDistribution {
    inner: ProbabilityDistribution,
    tiers: Vec<DependencyTier>,
}

impl TierDistribution {
    pub fn new(name: impl Into<String>, specs: &[SegmentSpec]) -> Result<Self, ConfigError> {
        let inner = ProbabilityDistribution::from_specs(name, specs)?;
        let tiers = inner
            .segments()
            .iter()
            .map(|segment| {
                segment
                    .value
                    .to_string()
                    .parse::<DependencyTier>()
                    .map_err(|_| ConfigError::InvalidTier {
                        name: inner.name().to_string(),
                        value: segment.value.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { inner, tiers })
    }

    pub fn inner(&self) -> &ProbabilityDistribution {
        &self.inner
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DependencyTier {
        self.tiers[self.inner.select_index(rng)]
    }
}
