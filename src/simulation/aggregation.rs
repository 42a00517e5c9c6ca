//! Bottom-up aggregation of condition values and resiliency grades.
//!
//! Conditions fold upwards by arithmetic mean: systems into their facility,
//! facilities into their installation. An entity with no children keeps the
//! initial condition value.
//!
//! Resiliency grades are assigned tier by tier inside one installation:
//!
//! 1. Tertiary facilities sample a grade.
//! 2. Secondary facilities combine the grades of their Tertiary dependents.
//! 3. Primary facilities combine the grades of their Secondary and Tertiary
//!    dependents.
//!
//! A dependent of `F` is a lower-tier facility sharing a group with `F`.
//! Combining uses a majority threshold `p`: the result is the best grade `g`
//! such that at least `p` percent of the dependents are graded `g` or better,
//! and `G1` when no such grade exists. A facility without dependents samples.

use super::distribution::GradeDistribution;
use crate::domain::{DependencyChain, DependencyTier, ResiliencyGrade};
use crate::error::ConfigError;
use crate::validation::validate_resiliency_threshold;
use rand::Rng;

/// Mean of `values`, or `fallback` when there are none.
pub fn mean_condition<I>(values: I, fallback: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        fallback
    } else {
        sum / count as f64
    }
}

/// Majority-threshold combination of dependent grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResiliencyRule {
    threshold_percent: u32,
}

impl ResiliencyRule {
    /// # Errors
    /// `ConfigError::OutOfBounds` unless `threshold_percent` is in 1..=100.
    pub fn new(threshold_percent: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            threshold_percent: validate_resiliency_threshold(threshold_percent)?,
        })
    }

    pub fn threshold_percent(&self) -> u32 {
        self.threshold_percent
    }

    /// Combined grade, or `None` when there are no dependents.
    pub fn combine(&self, dependents: &[ResiliencyGrade]) -> Option<ResiliencyGrade> {
        if dependents.is_empty() {
            return None;
        }
        let total = dependents.len() as u64;
        let threshold = u64::from(self.threshold_percent);
        let combined = ResiliencyGrade::BEST_FIRST
            .into_iter()
            .take(3)
            .find(|&grade| {
                let at_least = dependents.iter().filter(|&&g| g >= grade).count() as u64;
                at_least * 100 >= threshold * total
            })
            .unwrap_or(ResiliencyGrade::G1);
        Some(combined)
    }
}

impl Default for ResiliencyRule {
    fn default() -> Self {
        Self {
            threshold_percent: 70,
        }
    }
}

/// Indices of the lower-tier chains sharing a group with `chains[index]`.
pub fn dependents_of(chains: &[DependencyChain], index: usize) -> Vec<usize> {
    let chain = &chains[index];
    chains
        .iter()
        .enumerate()
        .filter(|(other, candidate)| *other != index && chain.supports(candidate))
        .map(|(other, _)| other)
        .collect()
}

/// Folds child values into parent values after every child exists.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    fallback_condition: f64,
    rule: ResiliencyRule,
    grades: GradeDistribution,
}

impl AggregationEngine {
    pub fn new(fallback_condition: f64, rule: ResiliencyRule, grades: GradeDistribution) -> Self {
        Self {
            fallback_condition,
            rule,
            grades,
        }
    }

    pub fn fallback_condition(&self) -> f64 {
        self.fallback_condition
    }

    pub fn rule(&self) -> ResiliencyRule {
        self.rule
    }

    /// Mean of a facility's system conditions.
    pub fn facility_condition(&self, system_conditions: &[f64]) -> f64 {
        mean_condition(system_conditions.iter().copied(), self.fallback_condition)
    }

    /// Mean of an installation's facility conditions.
    pub fn installation_condition(&self, facility_conditions: &[f64]) -> f64 {
        mean_condition(facility_conditions.iter().copied(), self.fallback_condition)
    }

    /// Grades for every chain of one installation, in input order.
    ///
    /// Tiers are processed Tertiary first; within a tier, in input order, so
    /// random draws are reproducible.
    pub fn resiliency_grades<R: Rng + ?Sized>(
        &self,
        chains: &[DependencyChain],
        rng: &mut R,
    ) -> Vec<ResiliencyGrade> {
        let mut grades: Vec<Option<ResiliencyGrade>> = vec![None; chains.len()];

        for tier in [
            DependencyTier::Tertiary,
            DependencyTier::Secondary,
            DependencyTier::Primary,
        ] {
            for index in (0..chains.len()).filter(|&i| chains[i].tier() == tier) {
                let dependent_grades: Vec<ResiliencyGrade> = dependents_of(chains, index)
                    .into_iter()
                    .filter_map(|dependent| grades[dependent])
                    .collect();
                let grade = self
                    .rule
                    .combine(&dependent_grades)
                    .unwrap_or_else(|| self.grades.sample(rng));
                grades[index] = Some(grade);
            }
        }

        grades
            .into_iter()
            .map(|grade| grade.unwrap_or(ResiliencyGrade::G1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentSpec;
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use crate::domain::ResiliencyGrade::*;

    fn always(grade: &str) -> GradeDistribution {
        GradeDistribution::new("grade", &[SegmentSpec::pair(100.0, grade)]).unwrap()
    }

    fn chains(tokens: &[&str]) -> Vec<DependencyChain> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn test_mean_and_fallback() {
        assert_eq!(mean_condition(Vec::new(), 99.99), 99.99);
        assert!((mean_condition([10.0, 20.0, 60.0], 99.99) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_combine_unanimous() {
        let rule = ResiliencyRule::default();
        assert_eq!(rule.combine(&[G4, G4, G4]), Some(G4));
        assert_eq!(rule.combine(&[G1]), Some(G1));
        assert_eq!(rule.combine(&[]), None);
    }

    #[test]
    fn test_combine_majority_threshold() {
        let rule = ResiliencyRule::new(70).unwrap();
        // 7 of 10 at G3 or better
        let grades = [G3, G3, G3, G4, G4, G4, G4, G1, G1, G2];
        assert_eq!(rule.combine(&grades), Some(G3));
        // 6 of 10 at G2 or better
        let grades = [G2, G2, G2, G2, G2, G2, G1, G1, G1, G1];
        assert_eq!(rule.combine(&grades), Some(G1));
    }

    #[test]
    fn test_combine_threshold_edges() {
        let grades = [G4, G2];
        assert_eq!(ResiliencyRule::new(50).unwrap().combine(&grades), Some(G4));
        assert_eq!(ResiliencyRule::new(51).unwrap().combine(&grades), Some(G2));
        assert_eq!(ResiliencyRule::new(100).unwrap().combine(&grades), Some(G2));
    }

    #[test]
    fn test_threshold_outside_percent_range_rejected() {
        for percent in [0, 101] {
            assert_matches!(
                ResiliencyRule::new(percent),
                Err(ConfigError::OutOfBounds {
                    field: "resiliency_threshold",
                    ..
                })
            );
        }
        assert_eq!(ResiliencyRule::new(1).unwrap().threshold_percent(), 1);
        assert_eq!(ResiliencyRule::default().threshold_percent(), 70);
    }

    #[test]
    fn test_dependents_are_lower_tier_sharing_a_group() {
        let chains = chains(&["P12", "S2", "T1", "T3", "P3"]);
        assert_eq!(dependents_of(&chains, 0), vec![1, 2]);
        assert_eq!(dependents_of(&chains, 1), Vec::<usize>::new());
        assert_eq!(dependents_of(&chains, 4), vec![3]);
    }

    #[test]
    fn test_grades_flow_up_from_tertiary() {
        let engine = AggregationEngine::new(99.99, ResiliencyRule::default(), always("4"));
        let chains = chains(&["P1", "S1", "T1"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(engine.resiliency_grades(&chains, &mut rng), vec![G4, G4, G4]);
    }

    #[test]
    fn test_primary_without_dependents_samples() {
        let engine = AggregationEngine::new(99.99, ResiliencyRule::default(), always("G2"));
        let chains = chains(&["P1", "P2"]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(engine.resiliency_grades(&chains, &mut rng), vec![G2, G2]);
    }
}
