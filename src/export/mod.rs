//! Dataset export
//!
//! Every run writes into `<output_directory>/<file_name>/`:
//!
//! | format | normalized                        | denormalized           |
//! |--------|-----------------------------------|------------------------|
//! | csv    | `<name>_<table>.csv` per table    | `<name>_records.csv`   |
//! | json   | `<name>.json`, nested tree        | `<name>.json`, rows    |
//! | xlsx   | `<name>.xlsx`, one sheet per table| `<name>.xlsx`          |
//!
//! plus `<name>_metadata.json` when metadata is enabled.

pub mod formats;
pub mod transform;

pub use transform::{
    Cell, DataTransformer, DenormalizedRow, FacilityRow, HistoryRow, InstallationNode,
    InstallationRow, NormalizedTables, SystemRow, Table, TabularRow,
};

use crate::config::{ExportFormat, ExportLayout, OutputSettings};
use crate::domain::ReferenceData;
use crate::error::Result;
use crate::prediction::DegradationPredictor;
use crate::simulation::GeneratedDataset;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

const DENORMALIZED_TABLE: &str = "records";

/// Where and how to export one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub file_name: String,
    pub format: ExportFormat,
    pub layout: ExportLayout,
    pub output_directory: PathBuf,
    pub include_time_series: bool,
    pub generate_metadata: bool,
    pub description: Option<String>,
}

impl ExportConfig {
    /// Directory this export writes into.
    pub fn run_directory(&self) -> PathBuf {
        self.output_directory.join(&self.file_name)
    }

    fn path(&self, suffix: &str, extension: &str) -> PathBuf {
        self.run_directory()
            .join(format!("{}{}.{}", self.file_name, suffix, extension))
    }
}

impl From<&OutputSettings> for ExportConfig {
    fn from(output: &OutputSettings) -> Self {
        Self {
            file_name: output.file_name.clone(),
            format: output.format,
            layout: output.layout,
            output_directory: output.directory.clone(),
            include_time_series: output.include_time_series,
            generate_metadata: output.generate_metadata,
            description: output.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub installations: usize,
    pub facilities: usize,
    pub systems: usize,
}

/// Contents of `<name>_metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportMetadata {
    pub generated_at: String,
    pub seed: u64,
    pub reference_month: String,
    pub counts: EntityCounts,
    pub format: ExportFormat,
    pub layout: ExportLayout,
    pub description: Option<String>,
    /// SHA-256 of the dataset's canonical JSON
    pub fingerprint: String,
}

/// Files written by one export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
    pub fingerprint: String,
}

/// SHA-256 hex digest of the dataset serialized as compact JSON.
///
/// Identical datasets always produce the same fingerprint.
pub fn dataset_fingerprint(dataset: &GeneratedDataset) -> Result<String> {
    let canonical = serde_json::to_vec(dataset)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{:x}", hasher.finalize()))
}

pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn export(
        &self,
        dataset: &GeneratedDataset,
        reference: &ReferenceData,
        predictor: DegradationPredictor,
    ) -> Result<ExportReport> {
        let directory = self.config.run_directory();
        fs::create_dir_all(&directory)?;

        let transformer = DataTransformer::new(dataset, reference, predictor)
            .with_time_series(self.config.include_time_series);
        let mut files = match self.config.layout {
            ExportLayout::Normalized => self.write_normalized(&transformer)?,
            ExportLayout::Denormalized => self.write_denormalized(&transformer)?,
        };

        let fingerprint = dataset_fingerprint(dataset)?;
        if self.config.generate_metadata {
            let path = self.config.path("_metadata", "json");
            formats::write_json(&self.metadata(dataset, &fingerprint), &path)?;
            files.push(path);
        }

        tracing::info!(
            directory = %directory.display(),
            files = files.len(),
            format = %self.config.format,
            "export complete"
        );

        Ok(ExportReport {
            directory,
            files,
            fingerprint,
        })
    }

    fn write_normalized(&self, transformer: &DataTransformer<'_>) -> Result<Vec<PathBuf>> {
        match self.config.format {
            ExportFormat::Csv => {
                let tables = transformer.normalized().tables();
                tables
                    .iter()
                    .map(|table| {
                        let path = self.config.path(&format!("_{}", table.name), "csv");
                        formats::write_csv_table(table, &path)?;
                        Ok(path)
                    })
                    .collect()
            }
            ExportFormat::Json => {
                let path = self.config.path("", "json");
                formats::write_json(&transformer.tree(), &path)?;
                Ok(vec![path])
            }
            ExportFormat::Xlsx => {
                let path = self.config.path("", "xlsx");
                formats::write_xlsx_tables(&transformer.normalized().tables(), &path)?;
                Ok(vec![path])
            }
        }
    }

    fn write_denormalized(&self, transformer: &DataTransformer<'_>) -> Result<Vec<PathBuf>> {
        let rows = transformer.denormalized();
        let path = match self.config.format {
            ExportFormat::Csv => {
                let path = self.config.path(&format!("_{DENORMALIZED_TABLE}"), "csv");
                formats::write_csv_table(&Table::from_rows(DENORMALIZED_TABLE, &rows), &path)?;
                path
            }
            ExportFormat::Json => {
                let path = self.config.path("", "json");
                formats::write_json(&rows, &path)?;
                path
            }
            ExportFormat::Xlsx => {
                let path = self.config.path("", "xlsx");
                formats::write_xlsx_tables(&[Table::from_rows(DENORMALIZED_TABLE, &rows)], &path)?;
                path
            }
        };
        Ok(vec![path])
    }

    fn metadata(&self, dataset: &GeneratedDataset, fingerprint: &str) -> ExportMetadata {
        ExportMetadata {
            generated_at: chrono::Local::now().to_rfc3339(),
            seed: dataset.seed(),
            reference_month: dataset.reference_month().to_string(),
            counts: EntityCounts {
                installations: dataset.installations().len(),
                facilities: dataset.facilities().len(),
                systems: dataset.systems().len(),
            },
            format: self.config.format,
            layout: self.config.layout,
            description: self.config.description.clone(),
            fingerprint: fingerprint.to_string(),
        }
    }
}
