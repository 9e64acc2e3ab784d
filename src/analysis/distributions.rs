// Reference distributions used by the hypothesis tests
//
// Thin wrappers over statrs so that every caller gets the engine's error type
// and the p-value conventions in one place. The non-central t CDF is not
// provided by statrs and is integrated numerically here.

use crate::error::{AnalysisError, Result};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use statrs::function::gamma::ln_gamma;

fn students_t(df: f64) -> Result<StudentsT> {
    if !(df > 0.0) {
        return Err(AnalysisError::NumericInstability {
            context: format!("Student t with df = {}", df),
        });
    }
    StudentsT::new(0.0, 1.0, df).map_err(|e| AnalysisError::library("students_t", e))
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| AnalysisError::library("normal", e))
}

/// P(T <= t) for Student's t with `df` degrees of freedom
pub fn t_cdf(t: f64, df: f64) -> Result<f64> {
    Ok(students_t(df)?.cdf(t))
}

/// P(T > t) for Student's t with `df` degrees of freedom
pub fn t_sf(t: f64, df: f64) -> Result<f64> {
    Ok(students_t(df)?.sf(t))
}

/// Quantile of Student's t
pub fn t_quantile(p: f64, df: f64) -> Result<f64> {
    Ok(students_t(df)?.inverse_cdf(p))
}

/// Standard normal CDF
pub fn normal_cdf(z: f64) -> Result<f64> {
    Ok(standard_normal()?.cdf(z))
}

/// Standard normal survival function
pub fn normal_sf(z: f64) -> Result<f64> {
    Ok(standard_normal()?.sf(z))
}

/// Standard normal quantile
pub fn normal_quantile(p: f64) -> Result<f64> {
    Ok(standard_normal()?.inverse_cdf(p))
}

/// P(F > f) for the F distribution with (d1, d2) degrees of freedom
pub fn f_sf(f: f64, d1: f64, d2: f64) -> Result<f64> {
    let dist = FisherSnedecor::new(d1, d2)
        .map_err(|e| AnalysisError::library("fisher_snedecor", e))?;
    Ok(dist.sf(f))
}

/// Intervals for Simpson integration of the non-central t CDF (must be even)
const NCT_INTERVALS: usize = 4000;

/// CDF of the non-central t distribution
///
/// T' = (Z + delta) / sqrt(V / df) with V ~ chi-square(df). Conditioning on
/// S = sqrt(V / df):
///
///   P(T' <= t) = integral over s of Phi(t * s - delta) * f_S(s) ds
///
/// where f_S(s) = 2 (df/2)^(df/2) / Gamma(df/2) * s^(df-1) * exp(-df s^2 / 2).
/// The integrand is smooth and bounded for df >= 1.
pub fn noncentral_t_cdf(t: f64, df: f64, delta: f64) -> Result<f64> {
    if !(df >= 1.0) || !t.is_finite() || !delta.is_finite() {
        return Err(AnalysisError::NumericInstability {
            context: format!("non-central t with df = {}, t = {}, delta = {}", df, t, delta),
        });
    }

    let normal = standard_normal()?;
    let half = df / 2.0;
    let log_norm = std::f64::consts::LN_2 + half * half.ln() - ln_gamma(half);

    let density = |s: f64| -> f64 {
        if s <= 0.0 {
            return if df == 1.0 { log_norm.exp() } else { 0.0 };
        }
        (log_norm + (df - 1.0) * s.ln() - df * s * s / 2.0).exp()
    };

    // S concentrates around 1 with spread ~ 1/sqrt(2 df)
    let upper = 1.0 + 12.0 / (2.0 * df).sqrt();
    let h = upper / NCT_INTERVALS as f64;

    let integrand = |s: f64| normal.cdf(t * s - delta) * density(s);

    let mut sum = integrand(0.0) + integrand(upper);
    for i in 1..NCT_INTERVALS {
        let s = i as f64 * h;
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * integrand(s);
    }

    Ok((sum * h / 3.0).clamp(0.0, 1.0))
}

/// Clamp a probability into [0, 1], mapping NaN to 1 (no evidence)
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        1.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
