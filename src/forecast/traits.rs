// src/forecast/traits.rs

use std::fmt::Debug;

/// A point-forecasting model over a regular demand series.
///
/// The pipeline treats the model as an opaque service: it hands over the
/// weekly history and takes back `steps` future values.
pub trait Forecaster: Debug + Send + Sync {
    /// Short label written next to the forecast.
    fn name(&self) -> &'static str;

    /// Forecasts the next `steps` periods after `history`.
    ///
    /// # Arguments
    /// * `history` - Observed demand, oldest first, one value per period.
    /// * `steps` - Number of future periods to produce.
    fn forecast(&mut self, history: &[f64], steps: usize) -> Vec<f64>;
}
