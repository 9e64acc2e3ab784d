// Configuration for the strategy comparison engine
//
// Defaults reproduce the conventional analysis: alpha = 0.05, 95% intervals,
// 10,000 bootstrap and permutation draws from a fixed seed.

use crate::error::{AnalysisError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a comparison run
///
/// # Example
/// ```
/// use adaptest::analysis::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.significance_level, 0.05); // 95% confidence
/// assert_eq!(config.bootstrap_resamples, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance level (alpha) used for every `reject_h0` decision
    ///
    /// - 0.05 (default): 95% confidence
    /// - 0.01: stricter, fewer false positives
    pub significance_level: f64,

    /// Confidence level for parametric and bootstrap intervals
    pub confidence_level: f64,

    /// Shapiro-Wilk threshold: differences are treated as normal when p > alpha
    pub normality_alpha: f64,

    /// Number of bootstrap resamples of the paired differences
    pub bootstrap_resamples: usize,

    /// Number of random sign-flip permutations
    pub permutation_resamples: usize,

    /// Master seed for every resampling routine
    ///
    /// Identical seed and inputs always give identical reports.
    pub seed: u64,

    /// Paired observations required before the full analysis runs
    pub min_paired_observations: usize,

    /// Baseline variance below which the static suite counts as deterministic
    pub deterministic_variance_threshold: f64,

    /// Upper bound reported when no sample size up to it reaches target power
    pub max_required_n: usize,

    /// Number of trailing learning-curve points checked for convergence
    pub stability_window: usize,

    /// Maximum p-value range across the window for a converged result
    pub stability_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            confidence_level: 0.95,
            normality_alpha: 0.05,
            bootstrap_resamples: 10_000,
            permutation_resamples: 10_000,
            seed: 42,
            min_paired_observations: 2,
            deterministic_variance_threshold: 0.01,
            max_required_n: 1000,
            stability_window: 5,
            stability_tolerance: 0.05,
        }
    }
}

impl AnalysisConfig {
    /// Stricter configuration (99% confidence)
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            confidence_level: 0.99,
            ..Self::default()
        }
    }

    /// Fewer resamples, for interactive use and tests
    pub fn quick() -> Self {
        Self {
            bootstrap_resamples: 1_000,
            permutation_resamples: 1_000,
            ..Self::default()
        }
    }

    /// Override the master seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and validate it
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let open_unit = |name: &str, value: f64| {
            if value > 0.0 && value < 1.0 {
                Ok(())
            } else {
                Err(AnalysisError::InvalidConfig(format!(
                    "{} must be in (0, 1), got {}",
                    name, value
                )))
            }
        };
        open_unit("significance_level", self.significance_level)?;
        open_unit("confidence_level", self.confidence_level)?;
        open_unit("normality_alpha", self.normality_alpha)?;

        if self.bootstrap_resamples == 0 || self.permutation_resamples == 0 {
            return Err(AnalysisError::InvalidConfig(
                "resample counts must be positive".to_string(),
            ));
        }

        if self.min_paired_observations < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_paired_observations must be >= 2, got {}",
                self.min_paired_observations
            )));
        }

        if self.deterministic_variance_threshold < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "deterministic_variance_threshold must be non-negative, got {}",
                self.deterministic_variance_threshold
            )));
        }

        if self.max_required_n < 3 {
            return Err(AnalysisError::InvalidConfig(format!(
                "max_required_n must be >= 3, got {}",
                self.max_required_n
            )));
        }

        if self.stability_window < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "stability_window must be >= 2, got {}",
                self.stability_window
            )));
        }

        if self.stability_tolerance <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "stability_tolerance must be positive, got {}",
                self.stability_tolerance
            )));
        }

        Ok(())
    }
}
