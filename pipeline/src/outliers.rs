use serde::{Deserialize, Serialize};

use crate::{
    dataset::{FeatureColumn, RawDataset},
    error::{ErrorKind, PipelineError, Result},
};

/// Acceptable value range derived from the interquartile range rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
    /// Lower acceptance bound `Q1 - 1.5 * IQR`.
    pub lower: f64,
    /// Upper acceptance bound `Q3 + 1.5 * IQR`.
    pub upper: f64,
}

impl IqrBounds {
    /// Computes bounds over a non-empty column.
    pub fn from_column(values: &[f64]) -> Result<Self> {
        let q1 = quantile(values, 0.25)?;
        let q3 = quantile(values, 0.75)?;
        let iqr = q3 - q1;
        Ok(Self {
            q1,
            q3,
            lower: 1.5f64.mul_add(-iqr, q1),
            upper: 1.5f64.mul_add(iqr, q3),
        })
    }

    /// Whether a value lies inside the acceptable range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Result of one outlier-repair pass over a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierRepair {
    /// Bounds used for detection.
    pub bounds: IqrBounds,
    /// Median of the original, unrepaired column (the replacement value).
    pub median: f64,
    /// Number of values replaced.
    pub replaced: usize,
}

/// Applies the 1.5 * IQR rule to one column of the dataset.
///
/// Values outside the bounds are replaced with the median of the original
/// column. The pass is column-local and idempotent: the median always lies
/// inside the bounds, so repairing an already-repaired column replaces
/// nothing.
pub fn repair_column(dataset: &mut RawDataset, column: FeatureColumn) -> Result<OutlierRepair> {
    let values = dataset.column(column);
    let bounds = IqrBounds::from_column(&values)?;
    let median = quantile(&values, 0.5)?;
    let mut replaced = 0;
    let repaired: Vec<f64> = values
        .iter()
        .map(|&value| {
            if bounds.contains(value) {
                value
            } else {
                replaced += 1;
                median
            }
        })
        .collect();
    dataset.set_column(column, &repaired)?;
    Ok(OutlierRepair {
        bounds,
        median,
        replaced,
    })
}

/// Linear-interpolation quantile over an unsorted, non-empty slice.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(PipelineError::new(
            ErrorKind::DataQuality,
            "cannot take a quantile of an empty column",
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(PipelineError::new(
            ErrorKind::DataQuality,
            format!("quantile {q} outside [0, 1]"),
        ));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    if low == high {
        return Ok(sorted[low]);
    }
    let weight = position - low as f64;
    Ok(sorted[low].mul_add(1.0 - weight, sorted[high] * weight))
}
