// src/forecast/implementations.rs

use crate::forecast::traits::Forecaster;
use crate::pipeline::config::{ForecastConfig, ForecastMethod};

// =========================================================================
// 1. Naive (last value)
// =========================================================================

/// Repeats the most recent observation.
#[derive(Debug, Clone, Default)]
pub struct NaiveForecaster;

impl Forecaster for NaiveForecaster {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn forecast(&mut self, history: &[f64], steps: usize) -> Vec<f64> {
        let last = history.last().copied().unwrap_or(0.0);
        vec![last; steps]
    }
}

// =========================================================================
// 2. Moving average
// =========================================================================

/// Projects the mean of the last `window` periods, feeding each forecast
/// back into the window.
#[derive(Debug, Clone)]
pub struct MovingAverageForecaster {
    window: usize,
}

impl MovingAverageForecaster {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Forecaster for MovingAverageForecaster {
    fn name(&self) -> &'static str {
        "moving_average"
    }

    fn forecast(&mut self, history: &[f64], steps: usize) -> Vec<f64> {
        if history.is_empty() {
            return vec![0.0; steps];
        }
        let mut series = history.to_vec();
        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            let start = series.len().saturating_sub(self.window);
            let tail = &series[start..];
            let next = tail.iter().sum::<f64>() / tail.len() as f64;
            out.push(next);
            series.push(next);
        }
        out
    }
}

// =========================================================================
// 3. Simple exponential smoothing
// =========================================================================

/// Level-only exponential smoothing; the forecast is flat at the final
/// smoothed level.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothingForecaster {
    alpha: f64, // Smoothing factor (0.1 = very stable, 0.9 = reactive)
}

impl ExponentialSmoothingForecaster {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
        }
    }
}

impl Forecaster for ExponentialSmoothingForecaster {
    fn name(&self) -> &'static str {
        "exponential_smoothing"
    }

    fn forecast(&mut self, history: &[f64], steps: usize) -> Vec<f64> {
        let Some((first, rest)) = history.split_first() else {
            return vec![0.0; steps];
        };
        let level = rest
            .iter()
            .fold(*first, |level, x| self.alpha * x + (1.0 - self.alpha) * level);
        vec![level; steps]
    }
}

pub fn build_forecaster(config: &ForecastConfig) -> Box<dyn Forecaster> {
    match config.method {
        ForecastMethod::Naive => Box::new(NaiveForecaster),
        ForecastMethod::MovingAverage => Box::new(MovingAverageForecaster::new(config.window)),
        ForecastMethod::ExponentialSmoothing => {
            Box::new(ExponentialSmoothingForecaster::new(config.alpha))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_repeats_last_value() {
        assert_eq!(NaiveForecaster.forecast(&[3.0, 9.0], 3), vec![9.0, 9.0, 9.0]);
        assert_eq!(NaiveForecaster.forecast(&[], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn moving_average_rolls_forecasts_into_the_window() {
        let mut model = MovingAverageForecaster::new(2);
        let out = model.forecast(&[4.0, 8.0], 2);
        assert_eq!(out, vec![6.0, 7.0]);
    }

    #[test]
    fn smoothing_tracks_a_step_in_demand() {
        let mut model = ExponentialSmoothingForecaster::new(0.5);
        // 4 -> 4 -> 6 -> 7
        let out = model.forecast(&[4.0, 4.0, 8.0, 8.0], 1);
        assert_eq!(out, vec![7.0]);
    }

    #[test]
    fn builder_follows_the_configured_method() {
        let mut config = ForecastConfig::default();
        assert_eq!(build_forecaster(&config).name(), "exponential_smoothing");
        config.method = ForecastMethod::MovingAverage;
        assert_eq!(build_forecaster(&config).name(), "moving_average");
        config.method = ForecastMethod::Naive;
        assert_eq!(build_forecaster(&config).name(), "naive");
    }
}
