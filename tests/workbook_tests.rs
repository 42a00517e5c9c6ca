//! Reference workbooks: round trip and `Config` sheet overrides.

use infra_synth::config::{CountRange, RunConfig, SourceArgs};
use infra_synth::domain::{FacilityType, ReferenceData, SystemType};
use infra_synth::workbook::{
    CONFIG_SHEET, FACILITIES_SHEET, load_reference_workbook, write_reference_workbook,
};
use std::path::Path;
use tempfile::tempdir;

fn add_config_sheet(path: &Path, rows: &[(&str, &str)]) {
    let mut book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
    let sheet = book.new_sheet(CONFIG_SHEET).unwrap();
    sheet.get_cell_mut((1, 1)).set_value("Key");
    sheet.get_cell_mut((2, 1)).set_value("Value");
    for (row, (key, value)) in (2u32..).zip(rows) {
        sheet.get_cell_mut((1, row)).set_value(*key);
        sheet.get_cell_mut((2, row)).set_value(*value);
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

#[test]
fn test_builtin_catalogue_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reference.xlsx");
    write_reference_workbook(&ReferenceData::builtin(), &path).unwrap();

    let loaded = load_reference_workbook(&path).unwrap();
    assert_eq!(loaded.reference, ReferenceData::builtin());
    assert_eq!(loaded.overrides, Default::default());
}

#[test]
fn test_missing_workbook_is_an_error() {
    let dir = tempdir().unwrap();
    let error = load_reference_workbook(&dir.path().join("absent.xlsx")).unwrap_err();
    assert_eq!(error.code(), infra_synth::ErrorCode::WorkbookError);
}

#[test]
fn test_bad_rows_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reference.xlsx");
    let reference = ReferenceData::new(
        [FacilityType {
            key: 1,
            title: "Depot".into(),
            life_expectancy: 40,
            mission_criticality: 2,
        }],
        [SystemType {
            key: 1,
            title: "Pump".into(),
            life_expectancy: 20,
            facility_keys: vec![1],
        }],
    );
    write_reference_workbook(&reference, &path).unwrap();

    let mut book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
    let sheet = book.get_sheet_by_name_mut(FACILITIES_SHEET).unwrap();
    sheet.get_cell_mut((1, 3)).set_value("not a key");
    sheet.get_cell_mut((2, 3)).set_value("Broken");
    sheet.get_cell_mut((1, 4)).set_value("0");
    sheet.get_cell_mut((2, 4)).set_value("Placeholder");
    umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

    let loaded = load_reference_workbook(&path).unwrap();
    assert_eq!(loaded.reference, reference);
}

#[test]
fn test_config_sheet_overrides_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reference.xlsx");
    write_reference_workbook(&ReferenceData::builtin(), &path).unwrap();
    add_config_sheet(
        &path,
        &[
            ("Threshold", "30"),
            ("Facilities Per Installation", "4-6"),
            ("Resiliency Threshold", "60"),
            ("Unknown Setting", "1"),
        ],
    );

    let loaded = load_reference_workbook(&path).unwrap();
    assert_eq!(loaded.overrides.threshold, Some(30.0));
    assert_eq!(
        loaded.overrides.facilities_per_installation,
        Some(CountRange::new(4, 6))
    );

    let run = RunConfig::from_sources(&SourceArgs {
        config: None,
        reference_workbook: Some(path.clone()),
        reference_month: None,
    })
    .unwrap();
    assert_eq!(run.settings.degradation.threshold, 30.0);
    assert_eq!(run.settings.simulation.resiliency_threshold, 60);
    assert_eq!(
        run.settings.simulation.facilities_per_installation,
        CountRange::new(4, 6)
    );
    assert_eq!(run.settings.reference.workbook.as_deref(), Some(path.as_path()));
    assert_eq!(*run.reference, ReferenceData::builtin());
}

#[test]
fn test_invalid_reference_workbook_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reference.xlsx");
    let orphan = ReferenceData::new(
        [FacilityType {
            key: 1,
            title: "Depot".into(),
            life_expectancy: 40,
            mission_criticality: 2,
        }],
        [SystemType {
            key: 1,
            title: "Pump".into(),
            life_expectancy: 20,
            facility_keys: vec![9],
        }],
    );
    write_reference_workbook(&orphan, &path).unwrap();

    let result = RunConfig::from_sources(&SourceArgs {
        config: None,
        reference_workbook: Some(path),
        reference_month: None,
    });
    assert!(result.is_err());
}
