//! Synthetic hierarchy generation
//!
//! ```text
//! distribution  weighted segment sampling
//! dependency    tier/group chains and floating-facility repair
//! aggregation   condition means and resiliency roll-up
//! generator     installation -> facilities -> systems
//! dataset       id-keyed result maps
//! summary       counts and condition statistics
//! ```

pub mod aggregation;
pub mod dataset;
pub mod dependency;
pub mod distribution;
pub mod generator;
pub mod summary;

pub use aggregation::{AggregationEngine, ResiliencyRule, mean_condition};
pub use dataset::{GeneratedDataset, InstallationBundle};
pub use dependency::{ChainAssignment, DependencyChainBuilder};
pub use distribution::{
    GradeDistribution, NumericDistribution, ProbabilityDistribution, Sample, Segment,
    SegmentValue, TierDistribution,
};
pub use generator::{
    CompiledDistributions, ExecutionMode, HierarchyGenerator, rng_for_installation, sub_seed,
};
pub use summary::{ConditionStats, DatasetSummary};
