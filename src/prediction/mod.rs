//! Condition degradation forecasting.

pub mod decay;
pub mod history;

pub use decay::{
    CrossingRange, DegradationPredictor, MAX_TRAJECTORY_MONTHS, PredictedCrossing,
    TrajectoryPoint, decay_rate, predict,
};
pub use history::{HistoricalPoint, historical_series, sample_points};
