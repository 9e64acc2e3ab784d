//! Multiple-comparison corrections for families of p-values
//!
//! All procedures return adjusted p-values in the input order, clipped to 1.
//! Holm controls the family-wise error rate and is the recommended default;
//! Benjamini-Hochberg controls the false discovery rate; Bonferroni is kept
//! for reference.

use serde::{Deserialize, Serialize};

/// Correction procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    Holm,
    BenjaminiHochberg,
    Bonferroni,
}

impl CorrectionMethod {
    pub fn apply(&self, p_values: &[f64]) -> Vec<f64> {
        match self {
            CorrectionMethod::Holm => holm(p_values),
            CorrectionMethod::BenjaminiHochberg => benjamini_hochberg(p_values),
            CorrectionMethod::Bonferroni => bonferroni(p_values),
        }
    }
}

fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    order
}

/// Holm step-down: running max of p_(i) * (k - i) over ascending ranks
pub fn holm(p_values: &[f64]) -> Vec<f64> {
    let k = p_values.len();
    let mut adjusted = vec![0.0; k];
    let mut running = 0.0_f64;
    for (rank, &idx) in ascending_order(p_values).iter().enumerate() {
        running = running.max(p_values[idx] * (k - rank) as f64);
        adjusted[idx] = running.min(1.0);
    }
    adjusted
}

/// Benjamini-Hochberg step-up: running min of p_(i) * k / i over descending ranks
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let k = p_values.len();
    let mut adjusted = vec![0.0; k];
    let mut running = f64::INFINITY;
    for (rank, &idx) in ascending_order(p_values).iter().enumerate().rev() {
        running = running.min(p_values[idx] * k as f64 / (rank + 1) as f64);
        adjusted[idx] = running.min(1.0);
    }
    adjusted
}

/// Bonferroni: p * k
pub fn bonferroni(p_values: &[f64]) -> Vec<f64> {
    let k = p_values.len() as f64;
    p_values.iter().map(|p| (p * k).min(1.0)).collect()
}

/// Summary of the per-protocol family of tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleComparisonSummary {
    pub n_comparisons: usize,
    pub recommended: CorrectionMethod,
    pub rejected_raw: usize,
    pub rejected_holm: usize,
    pub rejected_benjamini_hochberg: usize,
    pub rejected_bonferroni: usize,
    pub note: String,
}

crate::impl_sanitize!(MultipleComparisonSummary {});

impl MultipleComparisonSummary {
    pub fn from_p_values(raw: &[f64], alpha: f64) -> Self {
        let count = |ps: &[f64]| ps.iter().filter(|p| **p < alpha).count();
        let rejected_raw = count(raw);
        let rejected_holm = count(&holm(raw));

        let note = if rejected_raw > rejected_holm {
            format!(
                "{} of {} protocol comparisons are significant before correction but only {} after Holm; \
                 interpret uncorrected per-protocol results as exploratory.",
                rejected_raw,
                raw.len(),
                rejected_holm
            )
        } else {
            format!(
                "{} of {} protocol comparisons remain significant after Holm correction.",
                rejected_holm,
                raw.len()
            )
        };

        Self {
            n_comparisons: raw.len(),
            recommended: CorrectionMethod::Holm,
            rejected_raw,
            rejected_holm,
            rejected_benjamini_hochberg: count(&benjamini_hochberg(raw)),
            rejected_bonferroni: count(&bonferroni(raw)),
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-12, "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_holm_known_values() {
        // sorted: 0.01*4, 0.02*3, 0.03*2, 0.04*1 -> 0.04, 0.06, 0.06, 0.06
        let raw = [0.03, 0.01, 0.04, 0.02];
        assert_close(&holm(&raw), &[0.06, 0.04, 0.06, 0.06]);
    }

    #[test]
    fn test_bh_known_values() {
        // ascending 0.01,0.02,0.03,0.04 -> *4/1, *4/2, *4/3, *4/4 = 0.04 each
        let raw = [0.03, 0.01, 0.04, 0.02];
        assert_close(&benjamini_hochberg(&raw), &[0.04, 0.04, 0.04, 0.04]);
    }

    #[test]
    fn test_bonferroni_clips() {
        assert_close(&bonferroni(&[0.2, 0.6, 0.01]), &[0.6, 1.0, 0.03]);
    }

    #[test]
    fn test_empty_family() {
        assert!(holm(&[]).is_empty());
        assert!(benjamini_hochberg(&[]).is_empty());
        assert!(bonferroni(&[]).is_empty());
    }

    #[test]
    fn test_holm_dominates_raw_and_bh() {
        let raw = [0.001, 0.3, 0.04, 0.02, 0.9, 0.049];
        let h = holm(&raw);
        let bh = benjamini_hochberg(&raw);
        for i in 0..raw.len() {
            assert!(h[i] >= raw[i]);
            assert!(h[i] >= bh[i]);
            assert!(h[i] <= 1.0);
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = MultipleComparisonSummary::from_p_values(&[0.01, 0.04, 0.5], 0.05);
        assert_eq!(summary.n_comparisons, 3);
        assert_eq!(summary.rejected_raw, 2);
        // holm: 0.03, 0.08, 0.5
        assert_eq!(summary.rejected_holm, 1);
        assert_eq!(summary.rejected_bonferroni, 1);
        assert_eq!(summary.recommended, CorrectionMethod::Holm);
    }

    #[test]
    fn test_method_dispatch() {
        let raw = [0.01, 0.02];
        assert_eq!(CorrectionMethod::Holm.apply(&raw), holm(&raw));
        assert_eq!(CorrectionMethod::Bonferroni.apply(&raw), bonferroni(&raw));
    }
}
