// Post-hoc power and required sample size for the one-sided paired t-test

use crate::analysis::config::AnalysisConfig;
use crate::analysis::distributions::{noncentral_t_cdf, t_quantile};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Effects smaller than this cannot be extrapolated to a finite sample size
pub const MIN_DETECTABLE_EFFECT: f64 = 0.001;

/// Power of a one-sided paired t-test with `n` pairs and effect `d`
///
/// power = 1 - F(t_crit; n - 1, |d| sqrt(n)) with t_crit the (1 - alpha)
/// quantile of the central t. Zero when n < 2.
pub fn compute_power(n: usize, d: f64, alpha: f64) -> Result<f64> {
    if n < 2 {
        return Ok(0.0);
    }
    let df = (n - 1) as f64;
    let t_crit = t_quantile(1.0 - alpha, df)?;
    let delta = d.abs() * (n as f64).sqrt();
    Ok((1.0 - noncentral_t_cdf(t_crit, df, delta)?).clamp(0.0, 1.0))
}

/// Outcome of the sample-size search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequiredSampleSize {
    /// Smallest n reaching the target power
    Found { n: usize },
    /// No n below the search limit suffices; `n` is that limit
    ExceedsSearch { n: usize },
    /// |d| too small to extrapolate
    Undeterminable,
}

impl RequiredSampleSize {
    pub fn value(&self) -> Option<usize> {
        match self {
            RequiredSampleSize::Found { n } | RequiredSampleSize::ExceedsSearch { n } => Some(*n),
            RequiredSampleSize::Undeterminable => None,
        }
    }
}

/// Smallest n in 2..max_n with power >= target
///
/// Power grows monotonically with n, so the search gallops over doubling
/// sizes and then bisects the last bracket. The answer is the same as a
/// linear scan.
pub fn required_n(d: f64, target: f64, alpha: f64, max_n: usize) -> Result<RequiredSampleSize> {
    if !(d.abs() >= MIN_DETECTABLE_EFFECT) {
        return Ok(RequiredSampleSize::Undeterminable);
    }
    if max_n <= 2 {
        return Ok(RequiredSampleSize::ExceedsSearch { n: max_n });
    }

    let last = max_n - 1;
    let mut lo = 1; // power(lo) < target (n = 1 has zero power)
    let mut hi = 2;
    loop {
        if compute_power(hi, d, alpha)? >= target {
            break;
        }
        if hi == last {
            return Ok(RequiredSampleSize::ExceedsSearch { n: max_n });
        }
        lo = hi;
        hi = (hi * 2).min(last);
    }

    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if compute_power(mid, d, alpha)? >= target {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(RequiredSampleSize::Found { n: hi })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerInterpretation {
    /// Power >= 0.8
    Adequate,
    /// 0.5 <= power < 0.8
    Moderate,
    Underpowered,
    /// Effect size undefined or zero
    Undetermined,
}

/// Power block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerAnalysis {
    pub observed_n: usize,
    pub observed_cohens_d: Option<f64>,
    pub observed_power: Option<f64>,
    pub alpha: f64,
    pub required_n_80: RequiredSampleSize,
    pub required_n_90: RequiredSampleSize,
    pub interpretation: PowerInterpretation,
    pub note: String,
}

crate::impl_sanitize!(PowerAnalysis {
    observed_cohens_d,
    observed_power
});

/// Power analysis for the observed effect
///
/// An undefined d (constant non-zero differences) carries no finite
/// standardized effect; power is then reported as undetermined.
pub fn analyze_power(n: usize, d: Option<f64>, config: &AnalysisConfig) -> Result<PowerAnalysis> {
    let alpha = config.significance_level;

    let Some(d) = d.filter(|d| d.is_finite()) else {
        return Ok(PowerAnalysis {
            observed_n: n,
            observed_cohens_d: None,
            observed_power: None,
            alpha,
            required_n_80: RequiredSampleSize::Undeterminable,
            required_n_90: RequiredSampleSize::Undeterminable,
            interpretation: PowerInterpretation::Undetermined,
            note: "Cohen's d is undefined (differences have no spread); power cannot be estimated."
                .to_string(),
        });
    };

    let power = compute_power(n, d, alpha)?;
    let required_n_80 = required_n(d, 0.80, alpha, config.max_required_n)?;
    let required_n_90 = required_n(d, 0.90, alpha, config.max_required_n)?;

    let interpretation = if d.abs() < MIN_DETECTABLE_EFFECT {
        PowerInterpretation::Undetermined
    } else if power >= 0.8 {
        PowerInterpretation::Adequate
    } else if power >= 0.5 {
        PowerInterpretation::Moderate
    } else {
        PowerInterpretation::Underpowered
    };

    let note = match (interpretation, required_n_80) {
        (PowerInterpretation::Adequate, _) => format!(
            "With n = {} the test has {:.0}% power to detect d = {:.2}.",
            n,
            power * 100.0,
            d
        ),
        (PowerInterpretation::Undetermined, _) => {
            "Observed effect is too small to extrapolate a required sample size.".to_string()
        }
        (_, RequiredSampleSize::Found { n: needed }) => format!(
            "Power is {:.0}%; about {} paired experiments are needed for 80% power.",
            power * 100.0,
            needed
        ),
        (_, _) => format!(
            "Power is {:.0}%; more than {} paired experiments would be needed for 80% power.",
            power * 100.0,
            config.max_required_n
        ),
    };

    tracing::debug!(n, d, power, ?required_n_80, "power analysis");

    Ok(PowerAnalysis {
        observed_n: n,
        observed_cohens_d: Some(d),
        observed_power: Some(power),
        alpha,
        required_n_80,
        required_n_90,
        interpretation,
        note,
    })
}
