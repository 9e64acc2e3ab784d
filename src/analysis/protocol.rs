// Per-protocol categorical comparison of static vs automl
//
// Each protocol gets a 2x2 table [vulnerable, not vulnerable] x [static,
// automl], Fisher's exact test (two-sided) and Cramer's V. The raw Fisher
// p-values form one family for the multiple-comparison corrections.

use crate::analysis::config::AnalysisConfig;
use crate::analysis::correction::{benjamini_hochberg, bonferroni, holm, MultipleComparisonSummary};
use crate::analysis::distributions::clamp_probability;
use crate::analysis::paired::EffectMagnitude;
use crate::error::{AnalysisError, Result};
use crate::observation::{ProtocolOutcomeRecord, Strategy};
use serde::{Deserialize, Serialize};
use statrs::function::factorial::ln_factorial;
use std::collections::BTreeMap;

/// Relative tolerance when collecting tables as extreme as the observed one
const FISHER_REL_TOL: f64 = 1e-7;

/// Tests and positives for one (protocol, strategy) cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolCounts {
    pub tests: u64,
    pub vulns: u64,
    pub rate: f64,
}

impl ProtocolCounts {
    fn record(&mut self, vulnerable: bool) {
        self.tests += 1;
        if vulnerable {
            self.vulns += 1;
        }
        self.rate = self.vulns as f64 / self.tests as f64;
    }

    pub fn from_counts(tests: u64, vulns: u64) -> Self {
        let rate = if tests == 0 {
            0.0
        } else {
            vulns as f64 / tests as f64
        };
        Self { tests, vulns, rate }
    }
}

/// 2x2 table: rows static / automl, columns vulnerable / not vulnerable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    pub fn from_counts(static_: &ProtocolCounts, automl: &ProtocolCounts) -> Self {
        Self {
            a: static_.vulns,
            b: static_.tests - static_.vulns,
            c: automl.vulns,
            d: automl.tests - automl.vulns,
        }
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }
}

fn ln_choose(n: u64, k: u64) -> f64 {
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// Two-sided Fisher exact p-value
///
/// Sums the hypergeometric probabilities of every table with the same
/// margins that is no more likely than the observed one.
pub fn fisher_exact(table: &ContingencyTable) -> f64 {
    let r1 = table.a + table.b;
    let r2 = table.c + table.d;
    let c1 = table.a + table.c;
    let n = table.total();
    if n == 0 {
        return 1.0;
    }

    let ln_denominator = ln_choose(n, c1);
    let prob = |x: u64| (ln_choose(r1, x) + ln_choose(r2, c1 - x) - ln_denominator).exp();

    let observed = prob(table.a);
    let threshold = observed * (1.0 + FISHER_REL_TOL);
    let lo = c1.saturating_sub(r2);
    let hi = r1.min(c1);

    let p: f64 = (lo..=hi).map(prob).filter(|p| *p <= threshold).sum();
    clamp_probability(p)
}

/// Cramer's V = sqrt(chi^2 / N), uncorrected Pearson chi-square
///
/// A table with an empty row or column has no association and gives 0.
pub fn cramers_v(table: &ContingencyTable) -> f64 {
    let n = table.total() as f64;
    let rows = [(table.a + table.b) as f64, (table.c + table.d) as f64];
    let cols = [(table.a + table.c) as f64, (table.b + table.d) as f64];
    if rows.iter().chain(cols.iter()).any(|m| *m == 0.0) {
        return 0.0;
    }

    let observed = [[table.a as f64, table.b as f64], [table.c as f64, table.d as f64]];
    let mut chi2 = 0.0;
    for i in 0..2 {
        for j in 0..2 {
            let expected = rows[i] * cols[j] / n;
            chi2 += (observed[i][j] - expected).powi(2) / expected;
        }
    }
    (chi2 / n).sqrt().min(1.0)
}

/// One protocol's row in the breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolComparison {
    pub protocol: String,
    #[serde(rename = "static")]
    pub static_: ProtocolCounts,
    pub automl: ProtocolCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random: Option<ProtocolCounts>,
    pub fisher_p: f64,
    pub fisher_p_holm: f64,
    pub fisher_p_bh: f64,
    pub fisher_p_bonferroni: f64,
    pub significant: bool,
    pub significant_holm: bool,
    pub cramers_v: Option<f64>,
    pub effect: EffectMagnitude,
}

crate::impl_sanitize!(ProtocolComparison { cramers_v });

/// Per-protocol block of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolBreakdown {
    pub protocols: Vec<ProtocolComparison>,
    pub multiple_comparison: MultipleComparisonSummary,
}

crate::impl_sanitize!(ProtocolBreakdown { protocols, multiple_comparison });

/// Aggregate long-form records into counts per protocol and strategy
pub fn aggregate(
    records: &[ProtocolOutcomeRecord],
) -> BTreeMap<String, BTreeMap<Strategy, ProtocolCounts>> {
    let mut table: BTreeMap<String, BTreeMap<Strategy, ProtocolCounts>> = BTreeMap::new();
    for record in records {
        table
            .entry(record.protocol.clone())
            .or_default()
            .entry(record.strategy)
            .or_default()
            .record(record.vulnerable);
    }
    table
}

/// Fisher + Cramer's V per protocol, with Holm / BH / Bonferroni adjustment
///
/// Protocols lacking either a static or an automl record are skipped.
pub fn protocol_breakdown(
    records: &[ProtocolOutcomeRecord],
    config: &AnalysisConfig,
) -> Result<ProtocolBreakdown> {
    let alpha = config.significance_level;
    let counts = aggregate(records);

    let mut rows: Vec<ProtocolComparison> = Vec::new();
    for (protocol, by_strategy) in &counts {
        let (Some(static_), Some(automl)) = (
            by_strategy.get(&Strategy::Static),
            by_strategy.get(&Strategy::Automl),
        ) else {
            tracing::debug!(protocol = %protocol, "skipping protocol without static/automl pair");
            continue;
        };

        let table = ContingencyTable::from_counts(static_, automl);
        let fisher_p = fisher_exact(&table);
        let v = cramers_v(&table);

        rows.push(ProtocolComparison {
            protocol: protocol.clone(),
            static_: *static_,
            automl: *automl,
            random: by_strategy.get(&Strategy::Random).copied(),
            fisher_p,
            fisher_p_holm: fisher_p,
            fisher_p_bh: fisher_p,
            fisher_p_bonferroni: fisher_p,
            significant: fisher_p < alpha,
            significant_holm: fisher_p < alpha,
            cramers_v: Some(v),
            effect: EffectMagnitude::from_cramers_v(v),
        });
    }

    if rows.is_empty() {
        return Err(AnalysisError::InsufficientData {
            found: 0,
            required: 1,
        });
    }

    let raw: Vec<f64> = rows.iter().map(|r| r.fisher_p).collect();
    let adjusted_holm = holm(&raw);
    let adjusted_bh = benjamini_hochberg(&raw);
    let adjusted_bonferroni = bonferroni(&raw);
    for (i, row) in rows.iter_mut().enumerate() {
        row.fisher_p_holm = adjusted_holm[i];
        row.fisher_p_bh = adjusted_bh[i];
        row.fisher_p_bonferroni = adjusted_bonferroni[i];
        row.significant_holm = adjusted_holm[i] < alpha;
    }

    let multiple_comparison = MultipleComparisonSummary::from_p_values(&raw, alpha);
    tracing::debug!(
        protocols = rows.len(),
        rejected_holm = multiple_comparison.rejected_holm,
        "per-protocol breakdown"
    );

    Ok(ProtocolBreakdown {
        protocols: rows,
        multiple_comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(
        protocol: &str,
        strategy: Strategy,
        tests: usize,
        vulns: usize,
    ) -> Vec<ProtocolOutcomeRecord> {
        (0..tests)
            .map(|i| ProtocolOutcomeRecord::new(protocol, strategy, i < vulns))
            .collect()
    }

    #[test]
    fn test_fisher_reference_table() {
        // [[2, 8], [8, 2]]: two-sided p = 0.02301
        let table = ContingencyTable { a: 2, b: 8, c: 8, d: 2 };
        let p = fisher_exact(&table);
        assert!((p - 0.023014).abs() < 1e-5, "p = {}", p);
    }

    #[test]
    fn test_fisher_identical_rows() {
        let table = ContingencyTable { a: 3, b: 7, c: 3, d: 7 };
        assert!((fisher_exact(&table) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fisher_empty_table() {
        let table = ContingencyTable { a: 0, b: 0, c: 0, d: 0 };
        assert_eq!(fisher_exact(&table), 1.0);
    }

    #[test]
    fn test_cramers_v_reference_table() {
        let table = ContingencyTable { a: 2, b: 8, c: 8, d: 2 };
        let v = cramers_v(&table);
        assert!((v - 0.6).abs() < 1e-12, "v = {}", v);
        assert_eq!(EffectMagnitude::from_cramers_v(v), EffectMagnitude::Large);
    }

    #[test]
    fn test_cramers_v_degenerate_margin() {
        let table = ContingencyTable { a: 0, b: 10, c: 0, d: 10 };
        assert_eq!(cramers_v(&table), 0.0);
    }

    #[test]
    fn test_breakdown_reference_scenario() {
        let mut all = records("mqtt", Strategy::Static, 10, 2);
        all.extend(records("mqtt", Strategy::Automl, 10, 8));
        let breakdown = protocol_breakdown(&all, &AnalysisConfig::default()).unwrap();
        let row = &breakdown.protocols[0];
        assert_eq!(row.protocol, "mqtt");
        assert!(row.significant);
        assert!(row.significant_holm);
        assert_eq!(row.effect, EffectMagnitude::Large);
        assert!((row.automl.rate - 0.8).abs() < 1e-12);
        assert!(row.random.is_none());
    }

    #[test]
    fn test_breakdown_orders_and_adjusts() {
        let mut all = records("mqtt", Strategy::Static, 10, 2);
        all.extend(records("mqtt", Strategy::Automl, 10, 8));
        all.extend(records("coap", Strategy::Static, 10, 4));
        all.extend(records("coap", Strategy::Automl, 10, 5));
        all.extend(records("coap", Strategy::Random, 6, 1));
        all.extend(records("http", Strategy::Automl, 4, 4));

        let breakdown = protocol_breakdown(&all, &AnalysisConfig::default()).unwrap();
        let names: Vec<&str> = breakdown.protocols.iter().map(|r| r.protocol.as_str()).collect();
        assert_eq!(names, vec!["coap", "mqtt"]);
        assert_eq!(breakdown.multiple_comparison.n_comparisons, 2);
        for row in &breakdown.protocols {
            assert!(row.fisher_p_holm >= row.fisher_p);
            assert!(row.fisher_p_holm >= row.fisher_p_bh);
        }
        assert_eq!(breakdown.protocols[0].random.unwrap().tests, 6);
    }

    #[test]
    fn test_breakdown_without_pairs_is_insufficient() {
        let all = records("http", Strategy::Automl, 4, 1);
        assert!(matches!(
            protocol_breakdown(&all, &AnalysisConfig::default()),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }
}
