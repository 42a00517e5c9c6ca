//! Synthetic infrastructure datasets.
//!
//! Generates installations, their facilities and the systems inside them,
//! with sampled conditions and ages, dependency chains between facilities,
//! rolled-up conditions and resiliency grades, and forecasts when condition
//! values cross a degradation threshold.
//!
//! ```no_run
//! use infra_synth::{ExecutionMode, HierarchyGenerator, ReferenceData, Settings, YearMonth};
//! use std::sync::Arc;
//!
//! let generator = HierarchyGenerator::new(
//!     Arc::new(Settings::default()),
//!     Arc::new(ReferenceData::builtin()),
//!     YearMonth::new(2025, 1)?,
//! )?;
//! let dataset = generator.generate_installations(100, 42, ExecutionMode::Parallel)?;
//! # Ok::<(), infra_synth::SimError>(())
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod prediction;
pub mod simulation;
pub mod validation;
pub mod workbook;

pub use config::{ExportFormat, ExportLayout, RunConfig, Settings};
pub use domain::{
    ConditionAged, DependencyChain, DependencyTier, Facility, Installation, ReferenceData,
    ResiliencyGrade, System, YearMonth,
};
pub use error::{ConfigError, ErrorCode, Result, SimError};
pub use export::{ExportConfig, ExportReport, Exporter};
pub use logging::{LoggingConfig, init_logging};
pub use metrics::METRICS;
pub use prediction::{DegradationPredictor, PredictedCrossing, predict};
pub use simulation::{
    DatasetSummary, ExecutionMode, GeneratedDataset, HierarchyGenerator, InstallationBundle,
};
