//! Distributional statistics over numeric columns
//!
//! Sample standard deviation uses the n-1 denominator; percentiles use
//! linear interpolation at rank `p * (n - 1)` over the sorted values.

use serde::{Deserialize, Serialize};

/// Arithmetic mean; `None` on an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n-1 denominator); `None` for fewer than two
/// observations.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Percentile by linear interpolation over sorted values, `p` in [0, 1].
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
}

/// Median (50th percentile) over sorted values.
pub fn median(sorted: &[f64]) -> Option<f64> {
    percentile(sorted, 0.5)
}

/// Distributional summary for one quantitative column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantStats {
    pub mean: f64,
    /// `None` for a single observation (undefined sample std-dev)
    pub std_dev: Option<f64>,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub range: f64,
    pub min: f64,
    pub max: f64,
}

impl QuantStats {
    /// Compute the full summary; `None` on an empty value sequence.
    pub fn from_values(values: &[f64]) -> Option<QuantStats> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("validated values are finite"));

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let q1 = percentile(&sorted, 0.25)?;
        let q3 = percentile(&sorted, 0.75)?;
        Some(QuantStats {
            mean: mean(values)?,
            std_dev: sample_std_dev(values),
            median: median(&sorted)?,
            q1,
            q3,
            iqr: q3 - q1,
            range: max - min,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quartile_scenario() {
        let stats = QuantStats::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q1, 1.75);
        assert_eq!(stats.q3, 3.25);
        assert_eq!(stats.iqr, 1.5);
        assert_eq!(stats.range, 3.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_unsorted_input() {
        let stats = QuantStats::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q1, 1.75);
    }

    #[test]
    fn test_sample_std_dev() {
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138089935).abs() < 1e-9);
        assert_eq!(sample_std_dev(&[3.0]), None);
        assert_eq!(sample_std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_single_observation() {
        let stats = QuantStats::from_values(&[7.0]).unwrap();
        assert_eq!(stats.mean, 7.0);
        assert_eq!(stats.std_dev, None);
        assert_eq!(stats.median, 7.0);
        assert_eq!(stats.range, 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(QuantStats::from_values(&[]), None);
        assert_eq!(mean(&[]), None);
        assert_eq!(percentile(&[], 0.5), None);
    }
}
