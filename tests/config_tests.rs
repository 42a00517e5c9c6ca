//! Settings files, command-line overrides and run resolution.

use assert_matches::assert_matches;
use clap::Parser;
use infra_synth::config::{
    Cli, Command, CountRange, ExportFormat, ExportLayout, RunConfig, Settings, SourceArgs,
    load_config_file,
};
use infra_synth::domain::{ReferenceData, YearMonth};
use std::fs;
use std::path::PathBuf;
use tempfile::{TempDir, tempdir};

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn source(config: Option<PathBuf>) -> SourceArgs {
    SourceArgs {
        config,
        reference_workbook: None,
        reference_month: None,
    }
}

#[test]
fn test_yaml_config() {
    let dir = tempdir().unwrap();
    let path = write(
        &dir,
        "settings.yaml",
        r#"
degradation:
  threshold: 35
simulation:
  facilities_per_installation: "2-4"
  reference_month: "2023-07"
distributions:
  tier:
    - "50: P"
    - "50: S"
output:
  format: json
  layout: denormalized
"#,
    );
    let settings = load_config_file(&path).unwrap();
    assert_eq!(settings.degradation.threshold, 35.0);
    assert_eq!(settings.degradation.initial_condition, 99.99);
    assert_eq!(settings.simulation.facilities_per_installation, CountRange::new(2, 4));
    assert_eq!(
        settings.simulation.reference_month,
        Some(YearMonth::new(2023, 7).unwrap())
    );
    assert_eq!(settings.distributions.tier.len(), 2);
    assert_eq!(settings.output.format, ExportFormat::Json);
    assert_eq!(settings.output.layout, ExportLayout::Denormalized);
}

#[test]
fn test_json_config() {
    let dir = tempdir().unwrap();
    let path = write(
        &dir,
        "settings.json",
        r#"{"simulation": {"group_pool": [2, 4, 6], "group_count": {"min": 1, "max": 2}}}"#,
    );
    let settings = load_config_file(&path).unwrap();
    assert_eq!(settings.simulation.group_pool, vec![2, 4, 6]);
    assert_eq!(settings.simulation.group_count, CountRange::new(1, 2));
    assert_eq!(settings.output, Settings::default().output);
}

#[test]
fn test_toml_config() {
    let dir = tempdir().unwrap();
    let path = write(
        &dir,
        "settings.toml",
        r#"
[simulation]
max_facility_age = 60
resiliency_threshold = 80

[output]
file_name = "campaign"
include_time_series = true

[[distributions.grade]]
weight = 100
value = "2"
"#,
    );
    let settings = load_config_file(&path).unwrap();
    assert_eq!(settings.simulation.max_facility_age, 60);
    assert_eq!(settings.simulation.resiliency_threshold, 80);
    assert_eq!(settings.output.file_name, "campaign");
    assert!(settings.output.include_time_series);
    assert_eq!(settings.distributions.grade.len(), 1);
}

#[test]
fn test_unusable_config_files() {
    let dir = tempdir().unwrap();
    assert!(load_config_file(&dir.path().join("missing.yaml")).is_err());
    let ini = write(&dir, "settings.ini", "threshold=3");
    assert!(load_config_file(&ini).is_err());
    let broken = write(&dir, "settings.json", "{ not json");
    assert!(load_config_file(&broken).is_err());
}

#[test]
fn test_from_sources_defaults() {
    let run = RunConfig::from_sources(&SourceArgs::default()).unwrap();
    let mut expected = Settings::default();
    expected.simulation.reference_month = Some(run.reference_month);
    assert_eq!(*run.settings, expected);
    assert_eq!(*run.reference, ReferenceData::builtin());
}

#[test]
fn test_default_settings_carry_no_reference_month() {
    assert_eq!(Settings::default().reference_month(), None);
}

#[test]
fn test_configured_reference_month_is_kept() {
    let dir = tempdir().unwrap();
    let path = write(
        &dir,
        "settings.yaml",
        "simulation:\n  reference_month: \"2019-04\"\n",
    );
    let run = RunConfig::from_sources(&source(Some(path))).unwrap();
    let expected = YearMonth::new(2019, 4).unwrap();
    assert_eq!(run.reference_month, expected);
    assert_eq!(run.settings.reference_month(), Some(expected));
}

#[test]
fn test_from_sources_validates_settings() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "settings.yaml", "degradation:\n  threshold: 140\n");
    assert!(RunConfig::from_sources(&source(Some(path))).is_err());
}

#[test]
fn test_reference_month_flag_wins() {
    let dir = tempdir().unwrap();
    let path = write(
        &dir,
        "settings.yaml",
        "simulation:\n  reference_month: \"2020-01\"\n",
    );
    let mut args = source(Some(path));
    args.reference_month = Some(YearMonth::new(2022, 9).unwrap());
    let run = RunConfig::from_sources(&args).unwrap();
    assert_eq!(run.reference_month, YearMonth::new(2022, 9).unwrap());
    assert_eq!(run.settings.reference_month(), Some(run.reference_month));
}

#[test]
fn test_generate_flags_override_output() {
    let cli = Cli::try_parse_from([
        "infra-synth",
        "generate",
        "--count",
        "5",
        "--seed",
        "9",
        "--format",
        "xlsx",
        "--layout",
        "denormalized",
        "--output-dir",
        "/tmp/runs",
        "--name",
        "trial",
        "--time-series",
    ])
    .unwrap();
    let Command::Generate(args) = cli.command else {
        panic!("expected generate");
    };
    assert_eq!(args.count, 5);
    assert_eq!(args.seed, 9);

    let run = RunConfig::from_sources(&args.source)
        .unwrap()
        .with_generate_args(&args)
        .unwrap();
    let output = &run.settings.output;
    assert_eq!(output.format, ExportFormat::Xlsx);
    assert_eq!(output.layout, ExportLayout::Denormalized);
    assert_eq!(output.directory, PathBuf::from("/tmp/runs"));
    assert_eq!(output.file_name, "trial");
    assert!(output.include_time_series);
}

#[test]
fn test_generate_rejects_oversized_runs() {
    let cli = Cli::try_parse_from(["infra-synth", "generate", "--count", "200000"]).unwrap();
    let Command::Generate(args) = cli.command else {
        panic!("expected generate");
    };
    let run = RunConfig::from_sources(&args.source).unwrap();
    assert!(run.with_generate_args(&args).is_err());
}

#[test]
fn test_predict_command_parses() {
    let cli = Cli::try_parse_from([
        "infra-synth",
        "predict",
        "--condition",
        "72.5",
        "--age-months",
        "96",
        "--reference-month",
        "2024-03",
        "--detailed",
    ])
    .unwrap();
    assert_matches!(
        cli.command,
        Command::Predict(args) if args.condition == 72.5
            && args.age_months == 96
            && args.detailed
            && args.reference_month == Some(YearMonth::new(2024, 3).unwrap())
    );
    assert!(Cli::try_parse_from(["infra-synth", "predict", "--condition", "50"]).is_err());
}
