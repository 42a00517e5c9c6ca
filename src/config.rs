use crate::domain::{ReferenceData, YearMonth};
use crate::error::ConfigError;
use crate::validation::bounds::{
    MAX_FACILITIES_PER_INSTALLATION, MAX_FALLBACK_SYSTEMS, MAX_GROUP_ID,
    MIN_FACILITIES_PER_INSTALLATION, MIN_FALLBACK_SYSTEMS, validate_age_years,
    validate_count_range, validate_group_id, validate_installation_count, validate_percentage,
    validate_resiliency_threshold,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_FILE_NAME: &str = "infrastructure_data";

// ============================================================================
// Distribution segments (settings form)
// ============================================================================

/// Scalar segment value as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Text(String),
}

impl SpecValue {
    pub(crate) fn to_text(&self) -> String {
        match self {
            SpecValue::Number(n) => n.to_string(),
            SpecValue::Text(s) => s.clone(),
        }
    }
}

/// A distribution segment: either `{weight, value}` or `"weight: value"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentSpec {
    Pair { weight: f64, value: SpecValue },
    Text(String),
}

impl SegmentSpec {
    pub fn pair(weight: f64, value: &str) -> Self {
        SegmentSpec::Pair {
            weight,
            value: SpecValue::Text(value.to_string()),
        }
    }
}

fn segments(pairs: &[(f64, &str)]) -> Vec<SegmentSpec> {
    pairs
        .iter()
        .map(|(weight, value)| SegmentSpec::pair(*weight, value))
        .collect()
}

// ============================================================================
// Settings
// ============================================================================

/// Inclusive count range, written `{min, max}` or `"8-14"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CountRangeRepr")]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn as_tuple(&self) -> (usize, usize) {
        (self.min, self.max)
    }
}

impl fmt::Display for CountRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for CountRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidRange {
            field: "count_range",
            min: f64::NAN,
            max: f64::NAN,
        };
        let (min, max) = match s.split_once('-') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (s.trim(), s.trim()),
        };
        Ok(Self {
            min: min.parse().map_err(|_| invalid())?,
            max: max.parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountRangeRepr {
    Pair { min: usize, max: usize },
    Text(String),
}

impl TryFrom<CountRangeRepr> for CountRange {
    type Error = ConfigError;

    fn try_from(repr: CountRangeRepr) -> Result<Self, Self::Error> {
        match repr {
            CountRangeRepr::Pair { min, max } => Ok(CountRange::new(min, max)),
            CountRangeRepr::Text(text) => text.parse(),
        }
    }
}

/// Degradation model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationSettings {
    /// Condition value below which an entity counts as degraded
    pub threshold: f64,
    /// Condition of a never-degraded entity; also the empty-aggregate fallback
    pub initial_condition: f64,
}

impl Default for DegradationSettings {
    fn default() -> Self {
        Self {
            threshold: 25.0,
            initial_condition: 99.99,
        }
    }
}

/// Hierarchy shape and generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub facilities_per_installation: CountRange,
    pub group_count: CountRange,
    pub group_pool: Vec<u8>,
    pub fallback_systems: CountRange,
    pub max_facility_age: u32,
    pub max_system_age: u32,
    pub resiliency_threshold: u32,
    /// Month ages and predictions are measured from; the current month when unset
    pub reference_month: Option<YearMonth>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            facilities_per_installation: CountRange::new(8, 14),
            group_count: CountRange::new(1, 3),
            group_pool: vec![1, 2, 3],
            fallback_systems: CountRange::new(3, 8),
            max_facility_age: 80,
            max_system_age: 80,
            resiliency_threshold: 70,
            reference_month: None,
        }
    }
}

/// Weighted distributions for every sampled field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionSettings {
    pub condition: Vec<SegmentSpec>,
    pub age: Vec<SegmentSpec>,
    pub grade: Vec<SegmentSpec>,
    pub tier: Vec<SegmentSpec>,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            condition: segments(&[(7.0, "1-50"), (88.0, "50-85"), (5.0, "85-100")]),
            age: segments(&[(50.0, "20-40"), (20.0, "10-20"), (20.0, "41-80"), (10.0, "0-9")]),
            grade: segments(&[(52.0, "1"), (32.0, "2"), (12.0, "3"), (4.0, "4")]),
            tier: segments(&[(34.0, "P"), (33.0, "S"), (33.0, "T")]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportLayout {
    /// One table per entity kind
    Normalized,
    /// One row per system joined with its facility and installation
    Denormalized,
}

impl fmt::Display for ExportLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportLayout::Normalized => write!(f, "normalized"),
            ExportLayout::Denormalized => write!(f, "denormalized"),
        }
    }
}

/// Where and how generated datasets are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub file_name: String,
    pub format: ExportFormat,
    pub layout: ExportLayout,
    pub include_time_series: bool,
    pub generate_metadata: bool,
    pub description: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            file_name: DEFAULT_FILE_NAME.to_string(),
            format: ExportFormat::Csv,
            layout: ExportLayout::Normalized,
            include_time_series: false,
            generate_metadata: true,
            description: None,
        }
    }
}

/// Source of the facility/system type tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceSettings {
    /// Reference workbook; the built-in catalogue is used when unset
    pub workbook: Option<PathBuf>,
}

/// Immutable settings shared by every component of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub degradation: DegradationSettings,
    pub simulation: SimulationSettings,
    pub distributions: DistributionSettings,
    pub output: OutputSettings,
    pub reference: ReferenceSettings,
}

impl Settings {
    /// Checks every scalar bound. Distributions are compiled (and checked) by
    /// the generator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_percentage("degradation.threshold", self.degradation.threshold)?;
        validate_percentage(
            "degradation.initial_condition",
            self.degradation.initial_condition,
        )?;

        let sim = &self.simulation;
        validate_count_range(
            "simulation.facilities_per_installation",
            sim.facilities_per_installation.min,
            sim.facilities_per_installation.max,
            MIN_FACILITIES_PER_INSTALLATION,
            MAX_FACILITIES_PER_INSTALLATION,
        )?;
        validate_count_range(
            "simulation.fallback_systems",
            sim.fallback_systems.min,
            sim.fallback_systems.max,
            MIN_FALLBACK_SYSTEMS,
            MAX_FALLBACK_SYSTEMS,
        )?;
        validate_count_range(
            "simulation.group_count",
            sim.group_count.min,
            sim.group_count.max,
            1,
            usize::from(MAX_GROUP_ID),
        )?;
        for id in &sim.group_pool {
            validate_group_id(*id)?;
        }
        validate_age_years("simulation.max_facility_age", sim.max_facility_age)?;
        validate_age_years("simulation.max_system_age", sim.max_system_age)?;
        validate_resiliency_threshold(sim.resiliency_threshold)?;
        Ok(())
    }

    /// Configured reference month, if any. Settings never consult the clock;
    /// `RunConfig::from_sources` resolves an unset month once.
    pub fn reference_month(&self) -> Option<YearMonth> {
        self.simulation.reference_month
    }

    /// Applies values found in a reference workbook's `Config` sheet.
    pub fn apply_workbook_overrides(&mut self, overrides: &WorkbookOverrides) {
        if let Some(threshold) = overrides.threshold {
            self.degradation.threshold = threshold;
        }
        if let Some(initial) = overrides.initial_condition {
            self.degradation.initial_condition = initial;
        }
        if let Some(percent) = overrides.resiliency_threshold {
            self.simulation.resiliency_threshold = percent;
        }
        if let Some(range) = overrides.facilities_per_installation {
            self.simulation.facilities_per_installation = range;
        }
        if let Some(range) = overrides.group_count {
            self.simulation.group_count = range;
        }
        if let Some(age) = overrides.max_facility_age {
            self.simulation.max_facility_age = age;
        }
        if let Some(age) = overrides.max_system_age {
            self.simulation.max_system_age = age;
        }
    }
}

/// Scalar values a reference workbook may override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookOverrides {
    pub threshold: Option<f64>,
    pub initial_condition: Option<f64>,
    pub resiliency_threshold: Option<u32>,
    pub facilities_per_installation: Option<CountRange>,
    pub group_count: Option<CountRange>,
    pub max_facility_age: Option<u32>,
    pub max_system_age: Option<u32>,
}

// ============================================================================
// Command line
// ============================================================================

#[derive(Parser, Debug, Clone)]
#[command(
    name = "infra-synth",
    about = "Synthetic infrastructure dataset generator",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate installations and export them
    Generate(GenerateArgs),
    /// Forecast when a condition value crosses the degradation threshold
    Predict(PredictArgs),
    /// Validate configuration and reference data without generating
    CheckConfig(SourceArgs),
}

/// Where settings and reference data come from.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    #[arg(
        long,
        env = "INFRA_SYNTH_CONFIG",
        value_name = "FILE",
        help = "Path to a configuration file (YAML, JSON or TOML)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "INFRA_SYNTH_REFERENCE_WORKBOOK",
        value_name = "FILE",
        help = "Reference workbook (.xlsx) with Facilities/Systems sheets"
    )]
    pub reference_workbook: Option<PathBuf>,

    #[arg(
        long,
        value_name = "YYYY-MM",
        help = "Reference month for ages and predictions (defaults to the current month)"
    )]
    pub reference_month: Option<YearMonth>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, short = 'n', value_name = "N", default_value_t = 10)]
    pub count: usize,

    #[arg(
        long,
        env = "INFRA_SYNTH_SEED",
        value_name = "SEED",
        default_value_t = 42,
        help = "Base seed; each installation derives its own sub-seed"
    )]
    pub seed: u64,

    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<ExportFormat>,

    #[arg(long, value_enum, value_name = "LAYOUT")]
    pub layout: Option<ExportLayout>,

    #[arg(long, env = "INFRA_SYNTH_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Base file name for exported files")]
    pub name: Option<String>,

    #[arg(long, help = "Include back-calculated condition history tables")]
    pub time_series: bool,

    #[arg(long, help = "Generate installations on the current thread only")]
    pub sequential: bool,

    #[arg(long, help = "Print metrics in Prometheus text format after the run")]
    pub emit_metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    #[arg(long, value_name = "VALUE")]
    pub condition: f64,

    #[arg(long, value_name = "MONTHS")]
    pub age_months: u32,

    #[arg(long, value_name = "VALUE", help = "Initial condition value (default 99.99)")]
    pub initial: Option<f64>,

    #[arg(long, value_name = "VALUE", help = "Degradation threshold (default 25)")]
    pub threshold: Option<f64>,

    #[arg(long, value_name = "YYYY-MM")]
    pub reference_month: Option<YearMonth>,

    #[arg(long, help = "Also report early/late crossings and the projected trajectory")]
    pub detailed: bool,
}

// ============================================================================
// Run configuration
// ============================================================================

/// Fully resolved inputs of a generation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub settings: Arc<Settings>,
    pub reference: Arc<ReferenceData>,
    /// Month ages and predictions are measured from, fixed for the whole run
    pub reference_month: YearMonth,
}

impl RunConfig {
    /// Resolves settings: defaults, then the config file, then the reference
    /// workbook's `Config` sheet, then command-line values.
    pub fn from_sources(source: &SourceArgs) -> Result<Self> {
        let mut settings = match source.config.as_ref() {
            Some(path) => load_config_file(path)?,
            None => Settings::default(),
        };

        let reference_month = source
            .reference_month
            .or(settings.simulation.reference_month)
            .unwrap_or_else(YearMonth::current);
        settings.simulation.reference_month = Some(reference_month);

        let workbook = source
            .reference_workbook
            .clone()
            .or_else(|| settings.reference.workbook.clone());

        let reference = match workbook.as_ref() {
            Some(path) => {
                let loaded = crate::workbook::load_reference_workbook(path)
                    .with_context(|| format!("failed to load reference workbook {:?}", path))?;
                settings.apply_workbook_overrides(&loaded.overrides);
                settings.reference.workbook = Some(path.clone());
                loaded.reference
            }
            None => ReferenceData::builtin(),
        };

        settings.validate().context("invalid settings")?;
        reference.validate().context("invalid reference data")?;

        Ok(Self {
            settings: Arc::new(settings),
            reference: Arc::new(reference),
            reference_month,
        })
    }

    /// Applies the output-related flags of `generate`.
    pub fn with_generate_args(mut self, args: &GenerateArgs) -> Result<Self> {
        validate_installation_count(args.count)?;
        let mut settings = (*self.settings).clone();
        let output = &mut settings.output;
        if let Some(format) = args.format {
            output.format = format;
        }
        if let Some(layout) = args.layout {
            output.layout = layout;
        }
        if let Some(dir) = args.output_dir.as_ref() {
            output.directory = dir.clone();
        }
        if let Some(name) = args.name.as_ref() {
            anyhow::ensure!(!name.trim().is_empty(), "output name must not be empty");
            output.file_name = name.clone();
        }
        output.include_time_series |= args.time_series;
        self.settings = Arc::new(settings);
        Ok(self)
    }
}

/// Loads a settings file; missing sections and fields keep their defaults.
pub fn load_config_file(path: &Path) -> Result<Settings> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
