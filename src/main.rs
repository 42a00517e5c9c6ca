use anyhow::Context;
use clap::Parser;
use infra_synth::config::{Cli, Command, GenerateArgs, PredictArgs, SourceArgs};
use infra_synth::{
    DatasetSummary, DegradationPredictor, DependencyTier, ExecutionMode, ExportConfig, Exporter,
    HierarchyGenerator, LoggingConfig, METRICS, RunConfig, Settings, SimError, YearMonth,
    init_logging, log_slow_operation, logging::command_span,
};
use serde_json::json;
use std::time::Instant;

const SLOW_EXPORT_MS: u64 = 5_000;

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => {
            let _span = command_span("generate").entered();
            generate(args)
        }
        Command::Predict(args) => {
            let _span = command_span("predict").entered();
            predict(args)
        }
        Command::CheckConfig(source) => {
            let _span = command_span("check-config").entered();
            check_config(source)
        }
    }
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render output")?
    );
    Ok(())
}

fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let run = RunConfig::from_sources(&args.source)?.with_generate_args(&args)?;
    let generator = HierarchyGenerator::new(
        run.settings.clone(),
        run.reference.clone(),
        run.reference_month,
    )
    .inspect_err(SimError::track)?;

    let mode = if args.sequential {
        ExecutionMode::Sequential
    } else {
        ExecutionMode::Parallel
    };
    let dataset = generator
        .generate_installations(args.count, args.seed, mode)
        .inspect_err(SimError::track)?;

    let summary = DatasetSummary::compute(&dataset, run.settings.degradation.threshold);
    tracing::info!(
        installations = summary.installations,
        facilities = summary.facilities,
        systems = summary.systems,
        primary = summary.tier_count(DependencyTier::Primary),
        promoted = summary.promoted_facilities,
        mean_installation_condition = summary.installation_condition.mean,
        degraded_systems = summary.system_condition.degraded,
        "dataset summary"
    );

    let started = Instant::now();
    let predictor = DegradationPredictor::from_settings(&run.settings, dataset.reference_month());
    let exporter = Exporter::new(ExportConfig::from(&run.settings.output));
    let report = exporter
        .export(&dataset, &run.reference, predictor)
        .inspect_err(SimError::track)
        .with_context(|| {
            format!(
                "failed to export into {}",
                exporter.config().run_directory().display()
            )
        })?;
    log_slow_operation!(started.elapsed(), SLOW_EXPORT_MS, "export finished");

    print_json(&json!({
        "directory": report.directory,
        "files": report.files,
        "fingerprint": report.fingerprint,
        "summary": summary,
    }))?;

    if args.emit_metrics {
        print!("{}", METRICS.encode());
    }
    Ok(())
}

fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let defaults = Settings::default();
    let reference = args.reference_month.unwrap_or_else(YearMonth::current);
    let predictor = DegradationPredictor::new(
        args.initial.unwrap_or(defaults.degradation.initial_condition),
        args.threshold.unwrap_or(defaults.degradation.threshold),
        reference,
    );

    let crossing = predictor.predict_value(args.condition, args.age_months);
    let mut output = json!({
        "condition": args.condition,
        "age_months": args.age_months,
        "initial": predictor.initial_value(),
        "threshold": predictor.threshold(),
        "reference_month": reference.to_string(),
        "prediction": crossing,
    });
    if crossing.is_none() {
        output["message"] = json!("no prediction");
    }
    if args.detailed {
        output["range"] = json!(predictor.predict_range(args.condition, args.age_months));
        output["trajectory"] = json!(predictor.trajectory(args.condition, args.age_months));
    }
    print_json(&output)
}

fn check_config(source: SourceArgs) -> anyhow::Result<()> {
    let run = RunConfig::from_sources(&source)?;
    let generator = HierarchyGenerator::new(
        run.settings.clone(),
        run.reference.clone(),
        run.reference_month,
    )
    .inspect_err(SimError::track)?;

    tracing::info!(
        facility_types = run.reference.facility_types().len(),
        system_types = run.reference.system_types().len(),
        "configuration is valid"
    );
    print_json(&json!({
        "valid": true,
        "reference_month": generator.reference_month().to_string(),
        "facility_types": run.reference.facility_types().len(),
        "system_types": run.reference.system_types().len(),
        "reference_workbook": run.settings.reference.workbook,
        "settings": *run.settings,
    }))
}
