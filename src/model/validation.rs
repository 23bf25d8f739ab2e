// src/model/validation.rs

//! Per-field validation for derived values.
//!
//! Every computation that can degenerate (division by zero, NaN, a date
//! that does not parse) returns a [`Validated`] so the call site decides
//! the default and the diagnostics layer can count what happened.

use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    /// The computed value, untouched.
    Valid(T),
    /// The computation degenerated and `value` is the documented default.
    Clamped { value: T, reason: &'static str },
    /// No usable value exists.
    Rejected(String),
}

impl<T> Validated<T> {
    /// The usable value, whether computed or clamped.
    pub fn value(self) -> Option<T> {
        match self {
            Validated::Valid(v) | Validated::Clamped { value: v, .. } => Some(v),
            Validated::Rejected(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validated::Valid(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Validated::Valid(_) => None,
            Validated::Clamped { reason, .. } => Some(reason),
            Validated::Rejected(reason) => Some(reason.as_str()),
        }
    }
}

impl<T: Clone> Validated<T> {
    pub fn value_or(&self, default: T) -> T {
        match self {
            Validated::Valid(v) | Validated::Clamped { value: v, .. } => v.clone(),
            Validated::Rejected(_) => default,
        }
    }
}

/// `numerator / denominator`, or 0 when the quotient is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> Validated<f64> {
    if denominator == 0.0 {
        return Validated::Clamped {
            value: 0.0,
            reason: "division by zero",
        };
    }
    let quotient = numerator / denominator;
    if quotient.is_finite() {
        Validated::Valid(quotient)
    } else {
        Validated::Clamped {
            value: 0.0,
            reason: "non-finite ratio",
        }
    }
}

/// Rounds half to even into a non-negative integer; NaN, infinities and
/// negatives clamp to 0.
pub fn round_non_negative(value: f64) -> Validated<u64> {
    if !value.is_finite() {
        return Validated::Clamped {
            value: 0,
            reason: "non-finite result",
        };
    }
    let rounded = value.round_ties_even();
    if rounded < 0.0 {
        return Validated::Clamped {
            value: 0,
            reason: "negative result",
        };
    }
    Validated::Valid(rounded as u64)
}

/// Missing or non-numeric quantities become 0; the row is kept.
pub fn coerce_quantity(raw: Option<i64>) -> Validated<i64> {
    match raw {
        Some(q) => Validated::Valid(q),
        None => Validated::Clamped {
            value: 0,
            reason: "missing or non-numeric quantity",
        },
    }
}

/// Missing, non-numeric or non-finite amounts become 0.0; the row is kept.
pub fn coerce_amount(raw: Option<f64>) -> Validated<f64> {
    match raw {
        Some(a) if a.is_finite() => Validated::Valid(a),
        Some(_) => Validated::Clamped {
            value: 0.0,
            reason: "non-finite amount",
        },
        None => Validated::Clamped {
            value: 0.0,
            reason: "missing or non-numeric amount",
        },
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_date(raw: Option<&str>) -> Validated<NaiveDate> {
    let text = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Validated::Rejected("missing date".to_string()),
    };
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Validated::Valid(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Validated::Valid(datetime.date());
        }
    }
    Validated::Rejected(format!("unparseable date '{}'", text))
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sample standard deviation (n - 1), `None` with fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values.iter().copied())?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Median with linear interpolation between the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// A row removed from a table together with why.
#[derive(Debug, Clone, PartialEq)]
pub struct Dropped<T> {
    pub row: T,
    pub reason: String,
}

/// Result of an explicit filter: nothing disappears without a reason.
#[derive(Debug, Clone)]
pub struct Partitioned<K, D> {
    pub kept: Vec<K>,
    pub dropped: Vec<Dropped<D>>,
}

impl<K, D> Partitioned<K, D> {
    pub fn total(&self) -> usize {
        self.kept.len() + self.dropped.len()
    }
}

/// Splits `rows` into those `resolve` accepts and those it drops.
pub fn partition_rows<T, K, F>(rows: impl IntoIterator<Item = T>, mut resolve: F) -> Partitioned<K, T>
where
    F: FnMut(T) -> Result<K, Dropped<T>>,
{
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for row in rows {
        match resolve(row) {
            Ok(k) => kept.push(k),
            Err(d) => dropped.push(d),
        }
    }
    Partitioned { kept, dropped }
}
