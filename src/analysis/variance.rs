// Variance homogeneity across the three strategy groups
//
// Brown-Forsythe variant of Levene's test (deviations from the group median).
// The static suite runs a fixed test list, so a near-zero static variance is
// the expected outcome and is reported as such rather than as a violation.

use crate::analysis::config::AnalysisConfig;
use crate::analysis::descriptive::{mean, median, sample_variance};
use crate::analysis::distributions::{clamp_probability, f_sf};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Sample variance of each strategy group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupVariances {
    #[serde(rename = "static")]
    pub static_: f64,
    pub automl: f64,
    pub random: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeterogeneityInterpretation {
    /// No evidence against equal variances
    Homogeneous,
    /// Unequal variances driven by a deterministic baseline
    ExpectedDeterministicBaseline,
    /// Unequal variances between stochastic groups
    Heteroscedastic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceHomogeneity {
    pub test_name: String,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub equal_variance: bool,
    pub group_variances: GroupVariances,
    pub static_is_deterministic: bool,
    /// Paired tests operate on differences, so this is always false
    pub affects_primary_test: bool,
    pub interpretation: HeterogeneityInterpretation,
    pub note: String,
}

crate::impl_sanitize!(VarianceHomogeneity { statistic, p_value });

/// Levene statistic W and p-value, median-centred
pub fn levene(groups: &[&[f64]]) -> Result<(f64, f64)> {
    let k = groups.len();
    if k < 2 {
        return Err(AnalysisError::InsufficientData {
            found: k,
            required: 2,
        });
    }
    if let Some(small) = groups.iter().find(|g| g.len() < 2) {
        return Err(AnalysisError::InsufficientData {
            found: small.len(),
            required: 2,
        });
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let center = median(g);
            g.iter().map(|x| (x - center).abs()).collect()
        })
        .collect();

    let total: usize = groups.iter().map(|g| g.len()).sum();
    let all: Vec<f64> = deviations.iter().flatten().copied().collect();
    let grand = mean(&all);

    let between: f64 = deviations
        .iter()
        .map(|z| z.len() as f64 * (mean(z) - grand).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .map(|z| {
            let zbar = mean(z);
            z.iter().map(|v| (v - zbar).powi(2)).sum::<f64>()
        })
        .sum();

    let d1 = (k - 1) as f64;
    let d2 = (total - k) as f64;

    if within == 0.0 {
        // Every group has constant spread about its median
        if between == 0.0 {
            return Ok((0.0, 1.0));
        }
        return Ok((f64::INFINITY, 0.0));
    }

    let w = (d2 / d1) * between / within;
    let p = clamp_probability(f_sf(w, d1, d2)?);
    Ok((w, p))
}

/// Levene's test over static/automl/random with the deterministic-baseline reading
pub fn variance_homogeneity(
    static_: &[f64],
    automl: &[f64],
    random: &[f64],
    config: &AnalysisConfig,
) -> Result<VarianceHomogeneity> {
    let (statistic, p_value) = levene(&[static_, automl, random])?;

    let group_variances = GroupVariances {
        static_: sample_variance(static_),
        automl: sample_variance(automl),
        random: sample_variance(random),
    };
    let static_is_deterministic = group_variances.static_ < config.deterministic_variance_threshold;
    let equal_variance = p_value >= config.significance_level;

    let (interpretation, note) = if equal_variance {
        (
            HeterogeneityInterpretation::Homogeneous,
            "No evidence of unequal variances across strategies.".to_string(),
        )
    } else if static_is_deterministic {
        (
            HeterogeneityInterpretation::ExpectedDeterministicBaseline,
            "Static suite runs a fixed test list, so its near-zero variance is expected. \
             Paired tests operate on per-experiment differences and are not affected."
                .to_string(),
        )
    } else {
        (
            HeterogeneityInterpretation::Heteroscedastic,
            "Variances differ across strategies. Treat unpaired comparisons with caution; \
             paired tests operate on differences and are not affected."
                .to_string(),
        )
    };

    tracing::debug!(statistic, p_value, ?interpretation, "variance homogeneity");

    Ok(VarianceHomogeneity {
        test_name: "Levene (median-centred)".to_string(),
        statistic: Some(statistic),
        p_value: Some(p_value),
        equal_variance,
        group_variances,
        static_is_deterministic,
        affects_primary_test: false,
        interpretation,
        note,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_spread_groups_homogeneous() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [11.0, 12.0, 13.0, 14.0, 15.0];
        let (w, p) = levene(&[&a, &b]).unwrap();
        assert!(w.abs() < 1e-12);
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_known_statistic() {
        // Deviations from medians: [1,0,1] and [10,0,10]
        // group means 2/3 and 20/3, grand mean 11/3
        // between = 3*(3)^2 * 2 = 54, within = 2/3 + 200/3 = 202/3
        // W = (4/1) * 54 / (202/3) = 648/202
        let (w, _) = levene(&[&[1.0, 2.0, 3.0], &[0.0, 10.0, 20.0]]).unwrap();
        assert!((w - 648.0 / 202.0).abs() < 1e-10, "w = {}", w);
    }

    #[test]
    fn test_deterministic_static_is_expected() {
        let config = AnalysisConfig::default();
        let static_ = [3.0, 3.0, 3.0, 3.0, 3.0, 3.0];
        let automl = [1.0, 15.0, 4.0, 12.0, 2.0, 14.0];
        let random = [0.0, 9.0, 2.0, 11.0, 1.0, 8.0];
        let result = variance_homogeneity(&static_, &automl, &random, &config).unwrap();
        assert!(result.static_is_deterministic);
        assert!(!result.affects_primary_test);
        assert!(!result.equal_variance, "p = {:?}", result.p_value);
        assert_eq!(
            result.interpretation,
            HeterogeneityInterpretation::ExpectedDeterministicBaseline
        );
    }

    #[test]
    fn test_too_small_group_is_error() {
        assert!(levene(&[&[1.0], &[1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_all_constant_groups() {
        let (w, p) = levene(&[&[1.0, 1.0], &[2.0, 2.0], &[3.0, 3.0]]).unwrap();
        assert_eq!(w, 0.0);
        assert_eq!(p, 1.0);
    }
}
