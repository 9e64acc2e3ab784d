//! Descriptive statistics for numeric samples

use serde::{Deserialize, Serialize};

/// Count, location and spread of a sample
///
/// `std` is the sample standard deviation (ddof = 1), zero when n < 2.
/// An empty sample yields an all-zero summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub n: usize,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl DescriptiveStats {
    pub fn from_sample(sample: &[f64]) -> Self {
        if sample.is_empty() {
            return Self::default();
        }

        let mut sorted = sample.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            n: sample.len(),
            mean: mean(sample),
            std: sample_std(sample),
            median: percentile(&sorted, 50.0),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Arithmetic mean, zero for an empty sample
pub fn mean(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    sample.iter().sum::<f64>() / sample.len() as f64
}

/// Sample variance with Bessel's correction, zero when n < 2
pub fn sample_variance(sample: &[f64]) -> f64 {
    let n = sample.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(sample);
    sample.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation (ddof = 1), zero when n < 2
pub fn sample_std(sample: &[f64]) -> f64 {
    sample_variance(sample).sqrt()
}

/// Linear-interpolation percentile of already sorted data (0..=100)
pub fn percentile(sorted_data: &[f64], pct: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let index = (pct / 100.0).clamp(0.0, 1.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

/// Median of an unsorted sample
pub fn median(sample: &[f64]) -> f64 {
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile(&sorted, 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample_all_zero() {
        let stats = DescriptiveStats::from_sample(&[]);
        assert_eq!(stats, DescriptiveStats::default());
        assert_eq!(stats.n, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.max, 0.0);
    }

    #[test]
    fn test_single_value_zero_std() {
        let stats = DescriptiveStats::from_sample(&[4.0]);
        assert_eq!(stats.n, 1);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.median, 4.0);
    }

    #[test]
    fn test_known_sample() {
        let stats = DescriptiveStats::from_sample(&[8.0, 7.0, 9.0, 8.0, 10.0]);
        assert_eq!(stats.n, 5);
        assert!((stats.mean - 8.4).abs() < 1e-12);
        // var = (0.16 + 1.96 + 0.36 + 0.16 + 2.56) / 4 = 1.3
        assert!((stats.std - 1.3f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.median, 8.0);
        assert_eq!(stats.min, 7.0);
        assert_eq!(stats.max, 10.0);
    }

    #[test]
    fn test_median_even_length() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 5.0);
        assert!((percentile(&sorted, 2.5) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_variance_constant() {
        assert_eq!(sample_variance(&[5.0, 5.0, 5.0]), 0.0);
    }
}
