//! End-to-end generation of installation hierarchies.
//!
//! Each installation draws from its own ChaCha8 stream seeded from the run
//! seed and the installation index, so a run produces the same dataset
//! whether installations are generated sequentially or on the rayon pool.

use super::aggregation::{AggregationEngine, ResiliencyRule};
use super::dataset::{GeneratedDataset, InstallationBundle};
use super::dependency::DependencyChainBuilder;
use super::distribution::{GradeDistribution, NumericDistribution, TierDistribution};
use crate::config::{DistributionSettings, Settings};
use crate::domain::entities::FacilityParts;
use crate::domain::{
    DependencyChain, Facility, FacilityId, Installation, InstallationId, ReferenceData, System,
    SystemId, YearMonth,
};
use crate::error::{ConfigError, Result};
use crate::metrics::METRICS;
use crate::validation::bounds::{
    MAX_CONDITION, MAX_ENTITY_AGE_YEARS, MIN_CONDITION, validate_installation_count,
};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

// ============================================================================
// Seeding
// ============================================================================

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed for installation `index` of a run seeded with `base_seed`.
pub fn sub_seed(base_seed: u64, index: u64) -> u64 {
    splitmix64(base_seed ^ splitmix64(index))
}

/// Random source for installation `index` of a run.
pub fn rng_for_installation(base_seed: u64, index: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(sub_seed(base_seed, index))
}

fn random_uuid<R: RngCore + ?Sized>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Compiled distributions
// ============================================================================

/// Every configured distribution, validated.
#[derive(Debug, Clone)]
pub struct CompiledDistributions {
    pub condition: NumericDistribution,
    pub age: NumericDistribution,
    pub grade: GradeDistribution,
    pub tier: TierDistribution,
}

impl CompiledDistributions {
    pub fn compile(settings: &DistributionSettings) -> std::result::Result<Self, ConfigError> {
        let condition = NumericDistribution::new("condition", &settings.condition)?;
        let (lo, hi) = condition.bounds();
        for value in [lo, hi] {
            if !(MIN_CONDITION..=MAX_CONDITION).contains(&value) {
                return Err(ConfigError::OutOfBounds {
                    field: "distributions.condition",
                    value,
                    min: MIN_CONDITION,
                    max: MAX_CONDITION,
                });
            }
        }

        let age = NumericDistribution::new("age", &settings.age)?;
        let (youngest, _) = age.bounds();
        if youngest < 0.0 {
            return Err(ConfigError::OutOfBounds {
                field: "distributions.age",
                value: youngest,
                min: 0.0,
                max: f64::from(MAX_ENTITY_AGE_YEARS),
            });
        }

        Ok(Self {
            condition,
            age,
            grade: GradeDistribution::new("grade", &settings.grade)?,
            tier: TierDistribution::new("tier", &settings.tier)?,
        })
    }
}

// ============================================================================
// HierarchyGenerator
// ============================================================================

/// Whether installations are generated on the current thread or the rayon pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    Sequential,
    #[default]
    Parallel,
}

struct FacilityDraft {
    id: FacilityId,
    type_key: u32,
    construction_year: i32,
}

/// Generates installations from validated settings and reference data.
#[derive(Debug, Clone)]
pub struct HierarchyGenerator {
    settings: Arc<Settings>,
    reference: Arc<ReferenceData>,
    distributions: CompiledDistributions,
    chains: DependencyChainBuilder,
    aggregation: AggregationEngine,
    reference_month: YearMonth,
    facility_keys: Vec<u32>,
    system_keys: Vec<u32>,
    systems_by_facility: BTreeMap<u32, Vec<u32>>,
}

impl HierarchyGenerator {
    /// Validates everything up front; generation itself cannot fail on
    /// configuration. Ages and construction years are measured from
    /// `reference_month`.
    pub fn new(
        settings: Arc<Settings>,
        reference: Arc<ReferenceData>,
        reference_month: YearMonth,
    ) -> Result<Self> {
        settings.validate()?;
        reference.validate()?;

        let distributions = CompiledDistributions::compile(&settings.distributions)?;
        let sim = &settings.simulation;
        let chains = DependencyChainBuilder::new(
            distributions.tier.clone(),
            sim.group_count.as_tuple(),
            sim.group_pool.iter().copied(),
        )?;
        let aggregation = AggregationEngine::new(
            settings.degradation.initial_condition,
            ResiliencyRule::new(sim.resiliency_threshold)?,
            distributions.grade.clone(),
        );

        let facility_keys: Vec<u32> = reference.facility_types().keys().copied().collect();
        let system_keys: Vec<u32> = reference.system_types().keys().copied().collect();
        let systems_by_facility = facility_keys
            .iter()
            .map(|&key| (key, reference.system_keys_for(key)))
            .collect();

        Ok(Self {
            reference_month,
            settings,
            reference,
            distributions,
            chains,
            aggregation,
            facility_keys,
            system_keys,
            systems_by_facility,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn reference_month(&self) -> YearMonth {
        self.reference_month
    }

    pub fn distributions(&self) -> &CompiledDistributions {
        &self.distributions
    }

    pub fn aggregation(&self) -> &AggregationEngine {
        &self.aggregation
    }

    /// Generates `count` installations.
    ///
    /// Installation `i` draws from `rng_for_installation(seed, i)`, so both
    /// execution modes give identical datasets.
    pub fn generate_installations(
        &self,
        count: usize,
        seed: u64,
        mode: ExecutionMode,
    ) -> Result<GeneratedDataset> {
        validate_installation_count(count)?;
        let started = Instant::now();

        let bundles: Vec<InstallationBundle> = match mode {
            ExecutionMode::Sequential => (0..count)
                .map(|index| self.generate_indexed(seed, index))
                .collect(),
            ExecutionMode::Parallel => (0..count)
                .into_par_iter()
                .map(|index| self.generate_indexed(seed, index))
                .collect(),
        };

        let dataset = GeneratedDataset::from_bundles(seed, self.reference_month, bundles)?;
        let elapsed = started.elapsed();
        METRICS.record_generation_duration(elapsed);

        tracing::info!(
            installations = dataset.installations().len(),
            facilities = dataset.facilities().len(),
            systems = dataset.systems().len(),
            seed,
            mode = ?mode,
            elapsed_ms = elapsed.as_millis() as u64,
            "generation complete"
        );
        Ok(dataset)
    }

    fn generate_indexed(&self, seed: u64, index: usize) -> InstallationBundle {
        let span = tracing::debug_span!("generate_installation", installation_index = index, seed);
        let _enter = span.enter();
        let mut rng = rng_for_installation(seed, index as u64);
        self.generate_installation(&mut rng)
    }

    /// Generates one installation with all facilities and systems, fully
    /// aggregated.
    pub fn generate_installation<R: Rng + ?Sized>(&self, rng: &mut R) -> InstallationBundle {
        let installation_id = InstallationId::new(random_uuid(rng));
        let title = format!(
            "SIM_INSTALL_{}",
            &installation_id.as_uuid().simple().to_string()[..8]
        );

        let (min, max) = self.settings.simulation.facilities_per_installation.as_tuple();
        let facility_count = rng.gen_range(min..=max);

        let mut used_types = BTreeSet::new();
        let drafts: Vec<FacilityDraft> = (0..facility_count)
            .map(|_| {
                let type_key = self.pick_facility_type(&used_types, rng);
                used_types.insert(type_key);
                FacilityDraft {
                    id: FacilityId::new(random_uuid(rng)),
                    type_key,
                    construction_year: self
                        .sample_construction_year(self.settings.simulation.max_facility_age, rng),
                }
            })
            .collect();

        // installation-wide, so only after every facility is drawn
        let assignments = self.chains.assign(facility_count, rng);

        let mut systems = Vec::new();
        let mut facility_systems: Vec<(Vec<SystemId>, f64)> = Vec::with_capacity(facility_count);
        for draft in &drafts {
            let generated = self.generate_systems(draft, rng);
            let conditions: Vec<f64> = generated.iter().map(System::condition).collect();
            let condition = self.aggregation.facility_condition(&conditions);
            facility_systems.push((generated.iter().map(System::id).collect(), condition));
            systems.extend(generated);
        }

        let chains: Vec<DependencyChain> = assignments.iter().map(|a| a.chain.clone()).collect();
        let grades = self.aggregation.resiliency_grades(&chains, rng);

        let promoted = assignments.iter().filter(|a| a.promoted).count();
        let facilities: Vec<Facility> = drafts
            .into_iter()
            .zip(assignments)
            .zip(facility_systems)
            .zip(grades)
            .map(|(((draft, assignment), (system_ids, condition)), resiliency)| {
                Facility::from_parts(FacilityParts {
                    id: draft.id,
                    installation_id,
                    facility_type_key: draft.type_key,
                    construction_year: draft.construction_year,
                    chain: assignment.chain,
                    promoted: assignment.promoted,
                    resiliency,
                    system_ids,
                    condition,
                })
            })
            .collect();

        let facility_conditions: Vec<f64> = facilities.iter().map(Facility::condition).collect();
        let installation = Installation::new(
            installation_id,
            title,
            facilities.iter().map(Facility::id).collect(),
            self.aggregation.installation_condition(&facility_conditions),
        );

        METRICS.record_installation(facilities.len(), systems.len(), promoted);
        tracing::debug!(
            installation = %installation.title(),
            facilities = facilities.len(),
            systems = systems.len(),
            promoted,
            "generated installation"
        );

        InstallationBundle {
            installation,
            facilities,
            systems,
        }
    }

    /// Prefers facility types not yet used in this installation, repeating
    /// once every type has been used.
    fn pick_facility_type<R: Rng + ?Sized>(&self, used: &BTreeSet<u32>, rng: &mut R) -> u32 {
        let unused: Vec<u32> = self
            .facility_keys
            .iter()
            .copied()
            .filter(|key| !used.contains(key))
            .collect();
        let pool = if unused.is_empty() {
            &self.facility_keys
        } else {
            &unused
        };
        pool[rng.gen_range(0..pool.len())]
    }

    fn sample_construction_year<R: Rng + ?Sized>(&self, max_age: u32, rng: &mut R) -> i32 {
        let age = self.distributions.age.sample(rng).max(0.0).trunc() as u32;
        let age = age.min(max_age);
        self.reference_month.year() - age as i32
    }

    /// One system per registered type, ascending by key; a random count of
    /// uniformly drawn types when the facility type has none registered.
    fn generate_systems<R: Rng + ?Sized>(&self, draft: &FacilityDraft, rng: &mut R) -> Vec<System> {
        let registered = self
            .systems_by_facility
            .get(&draft.type_key)
            .cloned()
            .unwrap_or_default();

        let type_keys = if registered.is_empty() {
            let (min, max) = self.settings.simulation.fallback_systems.as_tuple();
            let count = rng.gen_range(min..=max);
            (0..count)
                .map(|_| self.system_keys[rng.gen_range(0..self.system_keys.len())])
                .collect()
        } else {
            registered
        };

        type_keys
            .into_iter()
            .map(|type_key| {
                let id = SystemId::new(random_uuid(rng));
                let condition = round2(self.distributions.condition.sample(rng));
                let year =
                    self.sample_construction_year(self.settings.simulation.max_system_age, rng);
                System::new(id, draft.id, type_key, year, condition)
            })
            .collect()
    }
}
