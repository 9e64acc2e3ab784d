// Paired comparison of two strategies measured on the same experiments
//
// Every pairwise comparison in the engine goes through `compare_paired`:
// automl vs static, automl vs random, random vs static, the efficiency
// ratios, and (with B = 0) the one-sample marginal-efficiency test.
//
// Decision procedure on diff = A - B:
// 1. all differences zero       -> "N/A - zero variance", p = 1
// 2. constant non-zero shift     -> Wilcoxon signed-rank (tie-corrected)
// 3. Shapiro-Wilk p > alpha      -> t-test on the differences
// 4. otherwise                   -> Wilcoxon signed-rank, zeros dropped

use crate::analysis::config::AnalysisConfig;
use crate::analysis::descriptive::{mean, sample_std};
use crate::analysis::distributions::{clamp_probability, t_quantile, t_sf};
use crate::analysis::normality::{check_normality, NormalityTest};
use crate::analysis::rank_tests::wilcoxon_signed_rank;
use crate::analysis::resampling::bootstrap_ci;
use crate::error::{AnalysisError, Result};
use crate::observation::PairedSample;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the alternative hypothesis on A - B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alternative {
    /// H1: A > B
    Greater,
    /// H1: A != B
    TwoSided,
}

impl Alternative {
    fn suffix(&self) -> &'static str {
        match self {
            Alternative::Greater => "one-sided",
            Alternative::TwoSided => "two-sided",
        }
    }
}

/// Paired (two samples) or one-sample (against zero) design
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Design {
    Paired,
    OneSample,
}

/// Result of one hypothesis test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub statistic: Option<f64>,
    /// Always within [0, 1]
    pub p_value: f64,
    pub df: Option<f64>,
    /// `p_value < significance_level`
    pub reject_h0: bool,
    pub alternative: Alternative,
    pub confidence_level: f64,
}

crate::impl_sanitize!(TestResult { statistic, df });

impl TestResult {
    pub fn new(
        test_name: impl Into<String>,
        statistic: Option<f64>,
        p_value: f64,
        df: Option<f64>,
        alternative: Alternative,
        alpha: f64,
    ) -> Self {
        let p_value = clamp_probability(p_value);
        Self {
            test_name: test_name.into(),
            statistic,
            p_value,
            df,
            reject_h0: p_value < alpha,
            alternative,
            confidence_level: 1.0 - alpha,
        }
    }
}

/// Qualitative magnitude of an effect size
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Medium,
    Large,
}

impl EffectMagnitude {
    /// Cohen's thresholds 0.2 / 0.5 / 0.8 on |d|
    pub fn from_cohens_d(d: f64) -> Self {
        let d = d.abs();
        if d < 0.2 {
            EffectMagnitude::Negligible
        } else if d < 0.5 {
            EffectMagnitude::Small
        } else if d < 0.8 {
            EffectMagnitude::Medium
        } else {
            EffectMagnitude::Large
        }
    }

    /// Thresholds 0.1 / 0.3 / 0.5 on Cramer's V
    pub fn from_cramers_v(v: f64) -> Self {
        if v < 0.1 {
            EffectMagnitude::Negligible
        } else if v < 0.3 {
            EffectMagnitude::Small
        } else if v < 0.5 {
            EffectMagnitude::Medium
        } else {
            EffectMagnitude::Large
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectMagnitude::Negligible => "negligible",
            EffectMagnitude::Small => "small",
            EffectMagnitude::Medium => "medium",
            EffectMagnitude::Large => "large",
        }
    }
}

impl fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Standardized mean difference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    /// `None` when the differences are a constant non-zero shift
    pub cohens_d: Option<f64>,
    pub interpretation: EffectMagnitude,
}

crate::impl_sanitize!(EffectSize { cohens_d });

impl EffectSize {
    pub fn from_differences(diff: &[f64]) -> Self {
        match cohens_d(diff) {
            Some(d) => Self {
                cohens_d: Some(d),
                interpretation: EffectMagnitude::from_cohens_d(d),
            },
            // Zero spread with a non-zero mean: unbounded standardized effect
            None => Self {
                cohens_d: None,
                interpretation: EffectMagnitude::Large,
            },
        }
    }
}

/// Cohen's d = mean(diff) / sd(diff)
///
/// A single difference uses sd = 1. Zero spread gives 0 when the mean is
/// zero and `None` (undefined) otherwise.
pub fn cohens_d(diff: &[f64]) -> Option<f64> {
    match diff.len() {
        0 => None,
        1 => Some(diff[0]),
        _ => {
            let m = mean(diff);
            let sd = sample_std(diff);
            if is_constant(diff) || sd == 0.0 {
                if m == 0.0 {
                    Some(0.0)
                } else {
                    None
                }
            } else {
                Some(m / sd)
            }
        }
    }
}

/// How an interval was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiMethod {
    ParametricT,
    PercentileBootstrap,
    InsufficientData,
}

/// Interval estimate of the mean difference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub mean_difference: f64,
    pub method: CiMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_resamples: Option<usize>,
}

crate::impl_sanitize!(ConfidenceInterval { lower, upper });

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => lo <= value && value <= hi,
            _ => false,
        }
    }
}

/// mean ± t(1 - (1 - level)/2, n - 1) · sd / sqrt(n)
pub fn parametric_ci(diff: &[f64], level: f64) -> Result<ConfidenceInterval> {
    let n = diff.len();
    let m = mean(diff);
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            found: n,
            required: 2,
        });
    }
    let se = sample_std(diff) / (n as f64).sqrt();
    let t_crit = t_quantile(1.0 - (1.0 - level) / 2.0, (n - 1) as f64)?;
    let half_width = if is_constant(diff) { 0.0 } else { t_crit * se };

    Ok(ConfidenceInterval {
        level,
        lower: Some(m - half_width),
        upper: Some(m + half_width),
        mean_difference: m,
        method: CiMethod::ParametricT,
        n_resamples: None,
    })
}

/// Full outcome of comparing sample A against sample B
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedComparison {
    pub label_a: String,
    pub label_b: String,
    pub n: usize,
    pub mean_a: f64,
    pub mean_b: f64,
    pub mean_difference: f64,
    /// Differences carry no spread (all equal)
    pub zero_variance: bool,
    pub normality: NormalityTest,
    pub primary: TestResult,
    pub effect_size: EffectSize,
    pub confidence_interval: ConfidenceInterval,
    pub confidence_interval_bootstrap: ConfidenceInterval,
}

crate::impl_sanitize!(PairedComparison {
    normality,
    primary,
    effect_size,
    confidence_interval,
    confidence_interval_bootstrap,
});

pub(crate) fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Normality check and primary significance test on the differences
///
/// Used directly by the learning curve, which needs no resampling.
pub fn primary_test(
    diff: &[f64],
    alternative: Alternative,
    design: Design,
    config: &AnalysisConfig,
) -> Result<(NormalityTest, TestResult)> {
    let n = diff.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            found: n,
            required: 2,
        });
    }
    let alpha = config.significance_level;

    if diff.iter().all(|d| *d == 0.0) {
        tracing::debug!(n, "zero-variance differences, no test performed");
        let normality = NormalityTest {
            test_name: "not applicable (zero variance)".to_string(),
            statistic: None,
            p_value: None,
            is_normal: false,
        };
        let result = TestResult::new(
            "N/A — zero variance",
            Some(0.0),
            1.0,
            None,
            alternative,
            alpha,
        );
        return Ok((normality, result));
    }

    if is_constant(diff) {
        tracing::debug!(n, shift = diff[0], "constant non-zero differences");
        let normality = NormalityTest {
            test_name: "not applicable (constant differences)".to_string(),
            statistic: None,
            p_value: None,
            is_normal: false,
        };
        let ranked = wilcoxon_signed_rank(diff, alternative)?;
        let result = TestResult::new(
            format!(
                "Wilcoxon signed-rank ({}, constant differences)",
                alternative.suffix()
            ),
            Some(ranked.statistic),
            ranked.p_value,
            None,
            alternative,
            alpha,
        );
        return Ok((normality, result));
    }

    let normality = match check_normality(diff, config.normality_alpha) {
        Ok(normality) => normality,
        Err(e) => {
            tracing::warn!("normality check failed, falling back to rank test: {}", e);
            NormalityTest {
                test_name: format!("Shapiro-Wilk failed ({})", e),
                statistic: None,
                p_value: None,
                is_normal: false,
            }
        }
    };

    let result = if normality.is_normal {
        let m = mean(diff);
        let se = sample_std(diff) / (n as f64).sqrt();
        let t = m / se;
        let df = (n - 1) as f64;
        let p_value = match alternative {
            Alternative::Greater => t_sf(t, df)?,
            Alternative::TwoSided => 2.0 * t_sf(t.abs(), df)?,
        };
        let name = match design {
            Design::Paired => "Paired t-test",
            Design::OneSample => "One-sample t-test",
        };
        TestResult::new(
            format!("{} ({})", name, alternative.suffix()),
            Some(t),
            p_value,
            Some(df),
            alternative,
            alpha,
        )
    } else {
        let ranked = wilcoxon_signed_rank(diff, alternative)?;
        TestResult::new(
            format!("Wilcoxon signed-rank ({})", alternative.suffix()),
            Some(ranked.statistic),
            ranked.p_value,
            None,
            alternative,
            alpha,
        )
    };

    tracing::debug!(
        test = %result.test_name,
        p_value = result.p_value,
        normal = normality.is_normal,
        "primary test"
    );
    Ok((normality, result))
}

/// Compare A against B on paired observations
///
/// # Example
/// ```
/// use adaptest::analysis::{compare_paired, AnalysisConfig, Alternative};
/// use adaptest::observation::PairedSample;
///
/// let sample = PairedSample {
///     label_a: "automl".into(),
///     label_b: "static".into(),
///     experiment_ids: (1..=5).map(|i| format!("e{}", i)).collect(),
///     a: vec![8.0, 7.0, 9.0, 8.0, 10.0],
///     b: vec![3.0, 3.0, 3.0, 3.0, 3.0],
/// };
/// let result = compare_paired(&sample, Alternative::Greater, &AnalysisConfig::quick()).unwrap();
/// assert!(result.primary.reject_h0);
/// ```
pub fn compare_paired(
    sample: &PairedSample,
    alternative: Alternative,
    config: &AnalysisConfig,
) -> Result<PairedComparison> {
    compare_with_design(sample, alternative, Design::Paired, config)
}

/// One-sample analogue: test `values` against zero
pub fn compare_against_zero(
    values: &[f64],
    label: &str,
    alternative: Alternative,
    config: &AnalysisConfig,
) -> Result<PairedComparison> {
    let sample = PairedSample {
        label_a: label.to_string(),
        label_b: "zero".to_string(),
        experiment_ids: (0..values.len()).map(|i| i.to_string()).collect(),
        a: values.to_vec(),
        b: vec![0.0; values.len()],
    };
    compare_with_design(&sample, alternative, Design::OneSample, config)
}

fn compare_with_design(
    sample: &PairedSample,
    alternative: Alternative,
    design: Design,
    config: &AnalysisConfig,
) -> Result<PairedComparison> {
    if sample.a.len() != sample.b.len() {
        return Err(AnalysisError::InvalidObservation {
            id: format!("{} vs {}", sample.label_a, sample.label_b),
            reason: format!(
                "paired samples differ in length ({} vs {})",
                sample.a.len(),
                sample.b.len()
            ),
        });
    }

    let diff = sample.differences();
    let (normality, primary) = primary_test(&diff, alternative, design, config)?;

    Ok(PairedComparison {
        label_a: sample.label_a.clone(),
        label_b: sample.label_b.clone(),
        n: diff.len(),
        mean_a: mean(&sample.a),
        mean_b: mean(&sample.b),
        mean_difference: mean(&diff),
        zero_variance: is_constant(&diff),
        normality,
        primary,
        effect_size: EffectSize::from_differences(&diff),
        confidence_interval: parametric_ci(&diff, config.confidence_level)?,
        confidence_interval_bootstrap: bootstrap_ci(
            &diff,
            config.confidence_level,
            config.bootstrap_resamples,
            config.seed,
        ),
    })
}
