// Shapiro-Wilk normality test
//
// Royston (1992, 1995) approximation (algorithm AS R94): polynomial
// corrections for the two extreme coefficients, normal-score coefficients for
// the rest, and a log-normal approximation of W's null distribution.
// Valid for 3 <= n <= 5000.

use crate::analysis::descriptive::mean;
use crate::analysis::distributions::{normal_quantile, normal_sf};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Outcome of the normality check on paired differences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub test_name: String,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub is_normal: bool,
}

crate::impl_sanitize!(NormalityTest { statistic, p_value });

impl NormalityTest {
    /// Too few points to assess: normality is assumed
    pub fn assumed(n: usize) -> Self {
        Self {
            test_name: format!("not tested (n = {} < 3, normality assumed)", n),
            statistic: None,
            p_value: None,
            is_normal: true,
        }
    }
}

/// Run Shapiro-Wilk on `sample` when n >= 3, otherwise assume normality
pub fn check_normality(sample: &[f64], alpha: f64) -> Result<NormalityTest> {
    if sample.len() < 3 {
        return Ok(NormalityTest::assumed(sample.len()));
    }
    let (w, p) = shapiro_wilk(sample)?;
    Ok(NormalityTest {
        test_name: "Shapiro-Wilk".to_string(),
        statistic: Some(w),
        p_value: Some(p),
        is_normal: p > alpha,
    })
}

fn poly(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk W statistic and p-value
pub fn shapiro_wilk(sample: &[f64]) -> Result<(f64, f64)> {
    let n = sample.len();
    if n < 3 {
        return Err(AnalysisError::InsufficientData {
            found: n,
            required: 3,
        });
    }
    if n > 5000 {
        return Err(AnalysisError::StatisticalLibraryFailure(format!(
            "shapiro_wilk: n = {} exceeds 5000",
            n
        )));
    }

    let mut x = sample.to_vec();
    x.sort_by(|a, b| a.total_cmp(b));

    let range = x[n - 1] - x[0];
    if range <= f64::EPSILON * x[n - 1].abs().max(1.0) {
        return Err(AnalysisError::DegenerateVariance(
            "shapiro_wilk: all values identical".to_string(),
        ));
    }

    let a = coefficients(n)?;

    let xbar = mean(&x);
    let ssq: f64 = x.iter().map(|v| (v - xbar).powi(2)).sum();
    let num: f64 = a.iter().zip(&x).map(|(ai, xi)| ai * xi).sum();
    let w = ((num * num) / ssq).min(1.0);

    Ok((w, w_pvalue(w, n)?))
}

/// Coefficients a_1..a_n (antisymmetric: a_i = -a_{n+1-i})
fn coefficients(n: usize) -> Result<Vec<f64>> {
    let mut a = vec![0.0; n];
    if n == 3 {
        a[0] = -std::f64::consts::FRAC_1_SQRT_2;
        a[2] = std::f64::consts::FRAC_1_SQRT_2;
        return Ok(a);
    }

    let nf = n as f64;
    let mut m = Vec::with_capacity(n);
    for i in 1..=n {
        m.push(normal_quantile((i as f64 - 0.375) / (nf + 0.25))?);
    }
    let mm: f64 = m.iter().map(|v| v * v).sum();
    let u = 1.0 / nf.sqrt();

    let an = m[n - 1] / mm.sqrt() + poly(&C1, u);
    a[n - 1] = an;
    a[0] = -an;

    let (phi, first_free) = if n > 5 {
        let an1 = m[n - 2] / mm.sqrt() + poly(&C2, u);
        a[n - 2] = an1;
        a[1] = -an1;
        (
            (mm - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
                / (1.0 - 2.0 * an.powi(2) - 2.0 * an1.powi(2)),
            2,
        )
    } else {
        ((mm - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * an.powi(2)), 1)
    };

    if !(phi > 0.0) {
        return Err(AnalysisError::NumericInstability {
            context: format!("shapiro_wilk coefficients for n = {}", n),
        });
    }
    let scale = phi.sqrt();
    for i in first_free..(n - first_free) {
        a[i] = m[i] / scale;
    }
    Ok(a)
}

/// Upper-tail p-value of W under normality
fn w_pvalue(w: f64, n: usize) -> Result<f64> {
    if w >= 1.0 {
        return Ok(1.0);
    }
    let nf = n as f64;

    if n == 3 {
        // Exact distribution for n = 3
        let pi6 = 6.0 / std::f64::consts::PI;
        let stqr = std::f64::consts::PI / 3.0;
        let p = pi6 * (w.sqrt().asin() - stqr);
        return Ok(p.clamp(0.0, 1.0));
    }

    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = poly(&G, nf);
        if y >= gamma {
            return Ok(0.0);
        }
        y = -(gamma - y).ln();
        (poly(&C3, nf), poly(&C4, nf).exp())
    } else {
        let ln_n = nf.ln();
        (poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };

    Ok(normal_sf((y - m) / s)?.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_antisymmetric_and_unit_norm() {
        for n in [4, 5, 6, 10, 25] {
            let a = coefficients(n).unwrap();
            for i in 0..n {
                assert!((a[i] + a[n - 1 - i]).abs() < 1e-12);
            }
            let norm: f64 = a.iter().map(|v| v * v).sum();
            assert!((norm - 1.0).abs() < 1e-6, "n={} norm={}", n, norm);
        }
    }

    #[test]
    fn test_w_in_unit_interval() {
        let (w, p) = shapiro_wilk(&[5.0, 4.0, 6.0, 5.0, 7.0]).unwrap();
        assert!(w > 0.0 && w <= 1.0);
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_symmetric_sample_looks_normal() {
        let sample = [
            -1.6, -1.1, -0.8, -0.5, -0.3, -0.1, 0.0, 0.1, 0.3, 0.5, 0.8, 1.1, 1.6,
        ];
        let result = check_normality(&sample, 0.05).unwrap();
        assert!(result.is_normal, "p = {:?}", result.p_value);
        assert!(result.statistic.unwrap() > 0.95);
    }

    #[test]
    fn test_heavily_skewed_sample_rejected() {
        let sample = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 50.0];
        let result = check_normality(&sample, 0.05).unwrap();
        assert!(!result.is_normal, "p = {:?}", result.p_value);
    }

    #[test]
    fn test_n3_exact_formula() {
        // Equally spaced points give W = 1
        let (w, p) = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!((w - 1.0).abs() < 1e-12);
        assert!((p - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_small_n_assumed_normal() {
        let result = check_normality(&[1.0, 2.0], 0.05).unwrap();
        assert!(result.is_normal);
        assert!(result.p_value.is_none());
    }

    #[test]
    fn test_constant_sample_is_degenerate() {
        assert!(matches!(
            shapiro_wilk(&[2.0, 2.0, 2.0, 2.0]),
            Err(AnalysisError::DegenerateVariance(_))
        ));
    }
}
