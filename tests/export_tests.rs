//! Export to disk in every format and layout.

use infra_synth::config::{ExportFormat, ExportLayout, OutputSettings, Settings};
use infra_synth::domain::{ReferenceData, YearMonth};
use infra_synth::export::{ExportConfig, Exporter, dataset_fingerprint};
use infra_synth::prediction::DegradationPredictor;
use infra_synth::simulation::{ExecutionMode, GeneratedDataset, HierarchyGenerator};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn reference_month() -> YearMonth {
    YearMonth::new(2025, 2).unwrap()
}

fn dataset(seed: u64) -> GeneratedDataset {
    HierarchyGenerator::new(
        Arc::new(Settings::default()),
        Arc::new(ReferenceData::builtin()),
        reference_month(),
    )
    .unwrap()
    .generate_installations(3, seed, ExecutionMode::Sequential)
    .unwrap()
}

fn config(dir: &Path, format: ExportFormat, layout: ExportLayout) -> ExportConfig {
    ExportConfig {
        file_name: "run".to_string(),
        format,
        layout,
        output_directory: dir.to_path_buf(),
        include_time_series: false,
        generate_metadata: true,
        description: Some("test run".to_string()),
    }
}

fn predictor() -> DegradationPredictor {
    DegradationPredictor::new(99.99, 25.0, reference_month())
}

fn file_names(files: &[std::path::PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_normalized_csv_writes_table_per_entity() {
    let dir = tempdir().unwrap();
    let dataset = dataset(1);
    let report = Exporter::new(config(dir.path(), ExportFormat::Csv, ExportLayout::Normalized))
        .export(&dataset, &ReferenceData::builtin(), predictor())
        .unwrap();

    assert_eq!(report.directory, dir.path().join("run"));
    assert_eq!(
        file_names(&report.files),
        vec![
            "run_installations.csv",
            "run_facilities.csv",
            "run_systems.csv",
            "run_metadata.json"
        ]
    );

    let mut reader = csv::Reader::from_path(report.directory.join("run_systems.csv")).unwrap();
    assert_eq!(reader.records().count(), dataset.systems().len());

    let mut reader = csv::Reader::from_path(report.directory.join("run_facilities.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert!(headers.iter().any(|h| h == "position"));
    assert!(headers.iter().any(|h| h == "resiliency_grade"));
}

#[test]
fn test_time_series_adds_history_tables() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), ExportFormat::Csv, ExportLayout::Normalized);
    config.include_time_series = true;
    config.generate_metadata = false;
    let report = Exporter::new(config)
        .export(&dataset(2), &ReferenceData::builtin(), predictor())
        .unwrap();

    let names = file_names(&report.files);
    assert!(names.contains(&"run_facility_history.csv".to_string()));
    assert!(names.contains(&"run_system_history.csv".to_string()));
    assert!(!names.contains(&"run_metadata.json".to_string()));
}

#[test]
fn test_denormalized_csv_one_row_per_system() {
    let dir = tempdir().unwrap();
    let dataset = dataset(3);
    let report = Exporter::new(config(dir.path(), ExportFormat::Csv, ExportLayout::Denormalized))
        .export(&dataset, &ReferenceData::builtin(), predictor())
        .unwrap();

    let mut reader = csv::Reader::from_path(report.directory.join("run_records.csv")).unwrap();
    assert_eq!(reader.records().count(), dataset.systems().len());
}

#[test]
fn test_json_tree_nests_hierarchy() {
    let dir = tempdir().unwrap();
    let dataset = dataset(4);
    let report = Exporter::new(config(dir.path(), ExportFormat::Json, ExportLayout::Normalized))
        .export(&dataset, &ReferenceData::builtin(), predictor())
        .unwrap();

    let text = fs::read_to_string(report.directory.join("run.json")).unwrap();
    let tree: serde_json::Value = serde_json::from_str(&text).unwrap();
    let installations = tree.as_array().unwrap();
    assert_eq!(installations.len(), 3);
    let first = &installations[0];
    assert!(first["title"].as_str().unwrap().starts_with("SIM_INSTALL_"));
    assert!(!first["facilities"].as_array().unwrap().is_empty());
    assert!(first["facilities"][0]["systems"].is_array());
}

#[test]
fn test_xlsx_sheet_per_table() {
    let dir = tempdir().unwrap();
    let report = Exporter::new(config(dir.path(), ExportFormat::Xlsx, ExportLayout::Normalized))
        .export(&dataset(5), &ReferenceData::builtin(), predictor())
        .unwrap();

    let book = umya_spreadsheet::reader::xlsx::read(report.directory.join("run.xlsx")).unwrap();
    for sheet in ["installations", "facilities", "systems"] {
        assert!(book.get_sheet_by_name(sheet).is_some(), "missing sheet {sheet}");
    }
    let sheet = book.get_sheet_by_name("installations").unwrap();
    assert_eq!(sheet.get_value((1, 1)), "installation_id");
}

#[test]
fn test_metadata_records_run() {
    let dir = tempdir().unwrap();
    let dataset = dataset(6);
    let report = Exporter::new(config(dir.path(), ExportFormat::Json, ExportLayout::Denormalized))
        .export(&dataset, &ReferenceData::builtin(), predictor())
        .unwrap();

    let text = fs::read_to_string(report.directory.join("run_metadata.json")).unwrap();
    let metadata: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(metadata["seed"], 6);
    assert_eq!(metadata["reference_month"], "2025-02");
    assert_eq!(metadata["format"], "json");
    assert_eq!(metadata["layout"], "denormalized");
    assert_eq!(metadata["description"], "test run");
    assert_eq!(
        metadata["counts"]["systems"].as_u64().unwrap() as usize,
        dataset.systems().len()
    );
    assert_eq!(metadata["fingerprint"], report.fingerprint.as_str());
    assert_eq!(report.fingerprint.len(), 64);
}

#[test]
fn test_fingerprint_tracks_content() {
    assert_eq!(
        dataset_fingerprint(&dataset(7)).unwrap(),
        dataset_fingerprint(&dataset(7)).unwrap()
    );
    assert_ne!(
        dataset_fingerprint(&dataset(7)).unwrap(),
        dataset_fingerprint(&dataset(8)).unwrap()
    );
}

#[test]
fn test_config_from_output_settings() {
    let output = OutputSettings::default();
    let config = ExportConfig::from(&output);
    assert_eq!(config.file_name, "infrastructure_data");
    assert_eq!(config.format, ExportFormat::Csv);
    assert_eq!(config.layout, ExportLayout::Normalized);
    assert!(config.generate_metadata);
    assert_eq!(
        config.run_directory(),
        Path::new("output").join("infrastructure_data")
    );
}
