// Rank-based tests: Wilcoxon signed-rank (paired) and Mann-Whitney U (independent)
//
// Exact null distributions are used for small samples without ties; larger or
// tied samples use the normal approximation with tie correction.

use crate::analysis::distributions::normal_sf;
use crate::analysis::paired::Alternative;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Largest number of non-zero differences for which the exact signed-rank
/// distribution is enumerated
const WILCOXON_EXACT_MAX_N: usize = 50;

/// Largest group size for the exact Mann-Whitney distribution
const MANN_WHITNEY_EXACT_MAX_N: usize = 8;

/// How a rank test's p-value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMethod {
    Exact,
    NormalApproximation,
}

/// Statistic and p-value of a rank test
#[derive(Debug, Clone, PartialEq)]
pub struct RankTestOutcome {
    pub statistic: f64,
    pub p_value: f64,
    /// Observations actually ranked (zeros dropped for signed-rank)
    pub n_effective: usize,
    pub method: RankMethod,
}

/// Average ranks (1-based) and sizes of tie groups larger than one
pub fn rank_with_ties(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; n];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end share the average of ranks start+1..=end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }
    (ranks, ties)
}

fn tie_term(ties: &[usize]) -> f64 {
    ties.iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum()
}

/// Wilcoxon signed-rank test of the differences against zero
///
/// Zero differences are dropped before ranking. For `Greater` the statistic
/// is T+ (sum of ranks of positive differences); for `TwoSided` it is
/// min(T+, T-).
pub fn wilcoxon_signed_rank(diffs: &[f64], alternative: Alternative) -> Result<RankTestOutcome> {
    let nonzero: Vec<f64> = diffs.iter().copied().filter(|d| *d != 0.0).collect();
    let n = nonzero.len();
    if n == 0 {
        return Err(AnalysisError::DegenerateVariance(
            "wilcoxon: all differences are zero".to_string(),
        ));
    }

    let magnitudes: Vec<f64> = nonzero.iter().map(|d| d.abs()).collect();
    let (ranks, ties) = rank_with_ties(&magnitudes);

    let t_plus: f64 = nonzero
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let total = (n * (n + 1)) as f64 / 2.0;
    let t_minus = total - t_plus;

    let statistic = match alternative {
        Alternative::Greater => t_plus,
        Alternative::TwoSided => t_plus.min(t_minus),
    };

    if ties.is_empty() && n <= WILCOXON_EXACT_MAX_N {
        let dist = signed_rank_distribution(n);
        // Without ties T+ is an integer
        let t = t_plus.round() as usize;
        let upper = tail_at_least(&dist, t);
        let lower = tail_at_most(&dist, t);
        let p_value = match alternative {
            Alternative::Greater => upper,
            Alternative::TwoSided => (2.0 * upper.min(lower)).min(1.0),
        };
        return Ok(RankTestOutcome {
            statistic,
            p_value,
            n_effective: n,
            method: RankMethod::Exact,
        });
    }

    let nf = n as f64;
    let mean = nf * (nf + 1.0) / 4.0;
    let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term(&ties) / 48.0;
    if var <= 0.0 {
        return Err(AnalysisError::NumericInstability {
            context: "wilcoxon: non-positive null variance".to_string(),
        });
    }
    let z = (t_plus - mean) / var.sqrt();
    let p_value = match alternative {
        Alternative::Greater => normal_sf(z)?,
        Alternative::TwoSided => (2.0 * normal_sf(z.abs())?).min(1.0),
    };

    Ok(RankTestOutcome {
        statistic,
        p_value,
        n_effective: n,
        method: RankMethod::NormalApproximation,
    })
}

/// Probability mass of T+ over 0..=n(n+1)/2 under H0
fn signed_rank_distribution(n: usize) -> Vec<f64> {
    let max = n * (n + 1) / 2;
    let mut counts = vec![0.0f64; max + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max).rev() {
            counts[s] += counts[s - k];
        }
    }
    let total = 2f64.powi(n as i32);
    counts.iter().map(|c| c / total).collect()
}

fn tail_at_least(dist: &[f64], t: usize) -> f64 {
    dist.iter().skip(t).sum::<f64>().min(1.0)
}

fn tail_at_most(dist: &[f64], t: usize) -> f64 {
    dist.iter().take(t + 1).sum::<f64>().min(1.0)
}

/// Mann-Whitney U test; `Greater` tests whether `x` tends to exceed `y`
///
/// The statistic is U for `x`.
pub fn mann_whitney_u(x: &[f64], y: &[f64], alternative: Alternative) -> Result<RankTestOutcome> {
    let (n1, n2) = (x.len(), y.len());
    if n1 == 0 || n2 == 0 {
        return Err(AnalysisError::InsufficientData {
            found: n1.min(n2),
            required: 1,
        });
    }

    let combined: Vec<f64> = x.iter().chain(y).copied().collect();
    let (ranks, ties) = rank_with_ties(&combined);
    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;

    if ties.is_empty() && n1 <= MANN_WHITNEY_EXACT_MAX_N && n2 <= MANN_WHITNEY_EXACT_MAX_N {
        let dist = mann_whitney_distribution(n1, n2);
        let u = u1.round() as usize;
        let upper = tail_at_least(&dist, u);
        let lower = tail_at_most(&dist, u);
        let p_value = match alternative {
            Alternative::Greater => upper,
            Alternative::TwoSided => (2.0 * upper.min(lower)).min(1.0),
        };
        return Ok(RankTestOutcome {
            statistic: u1,
            p_value,
            n_effective: n1 + n2,
            method: RankMethod::Exact,
        });
    }

    let (f1, f2) = (n1 as f64, n2 as f64);
    let big_n = f1 + f2;
    let mean = f1 * f2 / 2.0;
    let var = f1 * f2 / 12.0 * ((big_n + 1.0) - tie_term(&ties) / (big_n * (big_n - 1.0)));
    if var <= 0.0 {
        return Err(AnalysisError::NumericInstability {
            context: "mann_whitney: non-positive null variance".to_string(),
        });
    }
    let sd = var.sqrt();
    let p_value = match alternative {
        Alternative::Greater => normal_sf((u1 - mean - 0.5) / sd)?,
        Alternative::TwoSided => (2.0 * normal_sf(((u1 - mean).abs() - 0.5) / sd)?).min(1.0),
    };

    Ok(RankTestOutcome {
        statistic: u1,
        p_value: p_value.clamp(0.0, 1.0),
        n_effective: n1 + n2,
        method: RankMethod::NormalApproximation,
    })
}

/// Probability mass of U over 0..=n1*n2 under H0
///
/// Uses the recurrence f(m, n, u) = f(m-1, n, u-n) + f(m, n-1, u).
fn mann_whitney_distribution(n1: usize, n2: usize) -> Vec<f64> {
    // table[m][n] holds counts for group sizes (m, n)
    let mut table: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); n2 + 1]; n1 + 1];
    for m in 0..=n1 {
        for n in 0..=n2 {
            let mut counts = vec![0.0; m * n + 1];
            if m == 0 || n == 0 {
                counts[0] = 1.0;
            } else {
                for (u, slot) in counts.iter_mut().enumerate() {
                    let take_x = if u >= n {
                        table[m - 1][n].get(u - n).copied().unwrap_or(0.0)
                    } else {
                        0.0
                    };
                    let take_y = table[m][n - 1].get(u).copied().unwrap_or(0.0);
                    *slot = take_x + take_y;
                }
            }
            table[m][n] = counts;
        }
    }
    let counts = &table[n1][n2];
    let total: f64 = counts.iter().sum();
    counts.iter().map(|c| c / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_with_ties_averages() {
        let (ranks, ties) = rank_with_ties(&[10.0, 20.0, 20.0, 5.0]);
        assert_eq!(ranks, vec![2.0, 3.5, 3.5, 1.0]);
        assert_eq!(ties, vec![2]);
    }

    #[test]
    fn test_signed_rank_distribution_sums_to_one() {
        let dist = signed_rank_distribution(6);
        let total: f64 = dist.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        // P(T+ = 0) = 1/64
        assert!((dist[0] - 1.0 / 64.0).abs() < 1e-15);
    }

    #[test]
    fn test_wilcoxon_all_positive_exact() {
        // Five distinct positive differences: T+ = 15, p = 1/32
        let result =
            wilcoxon_signed_rank(&[1.0, 2.0, 3.0, 4.0, 5.0], Alternative::Greater).unwrap();
        assert_eq!(result.method, RankMethod::Exact);
        assert_eq!(result.statistic, 15.0);
        assert!((result.p_value - 1.0 / 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_wilcoxon_drops_zeros() {
        let result = wilcoxon_signed_rank(&[0.0, 0.0, 1.0, 2.0], Alternative::Greater).unwrap();
        assert_eq!(result.n_effective, 2);
    }

    #[test]
    fn test_wilcoxon_all_zero_is_degenerate() {
        assert!(wilcoxon_signed_rank(&[0.0, 0.0], Alternative::Greater).is_err());
    }

    #[test]
    fn test_wilcoxon_constant_shift_uses_tie_correction() {
        let result = wilcoxon_signed_rank(&[2.0, 2.0, 2.0], Alternative::Greater).unwrap();
        assert_eq!(result.method, RankMethod::NormalApproximation);
        // mean 3, var 3.5 - 0.5 = 3, z = 3 / sqrt(3)
        let expected = normal_sf(3f64.sqrt()).unwrap();
        assert!((result.p_value - expected).abs() < 1e-12);
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn test_wilcoxon_two_sided_symmetric() {
        let diffs = [1.0, -2.0, 3.0, -4.0, 5.0, -6.0];
        let two = wilcoxon_signed_rank(&diffs, Alternative::TwoSided).unwrap();
        assert!(two.p_value > 0.5);
        assert!(two.p_value <= 1.0);
    }

    #[test]
    fn test_mann_whitney_complete_separation_exact() {
        let x = [10.0, 11.0, 12.0];
        let y = [1.0, 2.0, 3.0];
        let result = mann_whitney_u(&x, &y, Alternative::Greater).unwrap();
        assert_eq!(result.method, RankMethod::Exact);
        assert_eq!(result.statistic, 9.0);
        // Only one of C(6,3) = 20 arrangements reaches U = 9
        assert!((result.p_value - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_mann_whitney_distribution_sums_to_one() {
        let dist = mann_whitney_distribution(4, 5);
        assert_eq!(dist.len(), 21);
        let total: f64 = dist.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mann_whitney_with_ties_normal() {
        let x = [5.0, 6.0, 6.0, 7.0, 8.0];
        let y = [3.0, 3.0, 4.0, 6.0];
        let result = mann_whitney_u(&x, &y, Alternative::Greater).unwrap();
        assert_eq!(result.method, RankMethod::NormalApproximation);
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn test_mann_whitney_empty_group() {
        assert!(mann_whitney_u(&[], &[1.0], Alternative::Greater).is_err());
    }
}
