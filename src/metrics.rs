/// Prometheus metrics for generation runs
///
/// Counters are process-wide; the CLI prints them in text exposition format
/// when asked to.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

/// Labels for prediction metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PredictionLabels {
    /// "predicted", "already_degraded" or "none"
    pub outcome: String,
}

/// Labels for error metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    /// Error category, see `ErrorCode::category`
    pub category: String,
}

/// Outcome of one degradation prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome {
    Predicted,
    AlreadyDegraded,
    NoPrediction,
}

impl PredictionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionOutcome::Predicted => "predicted",
            PredictionOutcome::AlreadyDegraded => "already_degraded",
            PredictionOutcome::NoPrediction => "none",
        }
    }
}

/// Central metrics collector with Prometheus registry
pub struct MetricsCollector {
    registry: RwLock<Registry>,

    pub installations_generated: Counter,
    pub facilities_generated: Counter,
    pub systems_generated: Counter,
    /// Facilities promoted to Primary by the chain repair pass
    pub facilities_promoted: Counter,
    pub predictions: Family<PredictionLabels, Counter>,
    pub errors: Family<ErrorLabels, Counter>,
    /// Wall time of whole generation runs
    pub generation_duration_seconds: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with all metrics registered
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("infra_synth");

        let installations_generated = Counter::default();
        registry.register(
            "installations_generated",
            "Installations generated",
            installations_generated.clone(),
        );

        let facilities_generated = Counter::default();
        registry.register(
            "facilities_generated",
            "Facilities generated",
            facilities_generated.clone(),
        );

        let systems_generated = Counter::default();
        registry.register(
            "systems_generated",
            "Systems generated",
            systems_generated.clone(),
        );

        let facilities_promoted = Counter::default();
        registry.register(
            "facilities_promoted",
            "Floating facilities promoted to the primary tier",
            facilities_promoted.clone(),
        );

        let predictions = Family::<PredictionLabels, Counter>::default();
        registry.register(
            "predictions",
            "Degradation predictions by outcome",
            predictions.clone(),
        );

        let errors = Family::<ErrorLabels, Counter>::default();
        registry.register("errors", "Errors by category", errors.clone());

        // Buckets: 1ms .. ~60s
        let generation_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.5, 12));
        registry.register(
            "generation_duration_seconds",
            "Generation run duration in seconds",
            generation_duration_seconds.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            installations_generated,
            facilities_generated,
            systems_generated,
            facilities_promoted,
            predictions,
            errors,
            generation_duration_seconds,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(error) = encode(&mut buffer, &registry) {
            tracing::warn!(%error, "failed to encode metrics");
        }
        buffer
    }

    /// Record one generated installation and its children
    pub fn record_installation(&self, facilities: usize, systems: usize, promoted: usize) {
        self.installations_generated.inc();
        self.facilities_generated.inc_by(facilities as u64);
        self.systems_generated.inc_by(systems as u64);
        self.facilities_promoted.inc_by(promoted as u64);
    }

    pub fn record_generation_duration(&self, duration: Duration) {
        self.generation_duration_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn record_prediction(&self, outcome: PredictionOutcome) {
        self.predictions
            .get_or_create(&PredictionLabels {
                outcome: outcome.as_str().to_string(),
            })
            .inc();
    }

    pub fn record_error(&self, category: &str) {
        self.errors
            .get_or_create(&ErrorLabels {
                category: category.to_string(),
            })
            .inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
