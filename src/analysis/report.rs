// Report assembly: runs every analysis block over a dataset snapshot
//
// The assembler never fails. Rows that violate the data model are dropped
// with a warning, each block that errors is recorded as `None` plus a
// `BlockFailure`, and every non-finite value is cleared by a final
// sanitising pass before the report is returned.

use crate::analysis::conclusion::{Conclusion, SupportingEvidence, Verdict};
use crate::analysis::config::AnalysisConfig;
use crate::analysis::convergence::{learning_curve, LearningCurve};
use crate::analysis::descriptive::{mean, DescriptiveStats};
use crate::analysis::efficiency::{analyze_efficiency, EfficiencyAnalysis};
use crate::analysis::paired::{compare_paired, Alternative, PairedComparison};
use crate::analysis::power::{analyze_power, PowerAnalysis, RequiredSampleSize};
use crate::analysis::protocol::{protocol_breakdown, ProtocolBreakdown};
use crate::analysis::rank_tests::mann_whitney_u;
use crate::analysis::resampling::{permutation_test, PermutationTest};
use crate::analysis::variance::{
    variance_homogeneity, HeterogeneityInterpretation, VarianceHomogeneity,
};
use crate::dataset::Dataset;
use crate::error::{AnalysisError, Result};
use crate::observation::{
    ExperimentObservation, PairedSample, ProtocolOutcomeRecord, Strategy, StrategyOutcome,
};
use crate::sanitize::Sanitize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A block that could not be computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFailure {
    pub block: String,
    pub reason: String,
}

/// Which experiments took part in which analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleInfo {
    pub n_paired: usize,
    pub paired_experiments: Vec<String>,
    pub static_only_experiments: usize,
    pub experiments_with_random: usize,
}

/// One metric summarised per strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    #[serde(rename = "static")]
    pub static_: DescriptiveStats,
    pub automl: DescriptiveStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random: Option<DescriptiveStats>,
}

impl StrategyStats {
    fn over(paired: &[ExperimentObservation], metric: impl Fn(&StrategyOutcome) -> f64) -> Self {
        let collect = |strategy: Strategy| -> Vec<f64> {
            paired
                .iter()
                .filter_map(|o| o.outcome(strategy).map(&metric))
                .collect()
        };
        let random = collect(Strategy::Random);
        Self {
            static_: DescriptiveStats::from_sample(&collect(Strategy::Static)),
            automl: DescriptiveStats::from_sample(&collect(Strategy::Automl)),
            random: (!random.is_empty()).then(|| DescriptiveStats::from_sample(&random)),
        }
    }
}

/// Descriptive statistics over the paired experiments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveBlock {
    pub vulnerabilities: StrategyStats,
    pub tests_executed: StrategyStats,
    pub execution_time_sec: StrategyStats,
}

/// Comparisons against the random-selection control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomBaseline {
    pub n: usize,
    pub automl_vs_random: PairedComparison,
    pub random_vs_static: PairedComparison,
}

crate::impl_sanitize!(RandomBaseline {
    automl_vs_random,
    random_vs_static
});

/// Two-sided comparison of execution time (automl vs static)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTimeComparison {
    pub static_mean_sec: f64,
    pub automl_mean_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_mean_sec: Option<f64>,
    pub mean_difference_sec: f64,
    pub test_name: String,
    pub statistic: Option<f64>,
    pub p_value: f64,
    pub significant: bool,
}

crate::impl_sanitize!(ExecutionTimeComparison {
    random_mean_sec,
    statistic
});

/// Unpaired comparison: automl counts vs experiments that ran only static
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndependentTest {
    pub test_name: String,
    pub statistic: Option<f64>,
    pub p_value: f64,
    pub reject_h0: bool,
    pub automl_n: usize,
    pub static_only_n: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caveat: Option<String>,
}

crate::impl_sanitize!(IndependentTest { statistic });

/// Complete result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// False when fewer paired experiments than required were available, or
    /// when protocol rows were supplied but no protocol could be compared
    pub complete: bool,
    pub verdict: Verdict,
    pub sample: SampleInfo,
    pub descriptive: Option<DescriptiveBlock>,
    pub primary: Option<PairedComparison>,
    pub permutation_test: Option<PermutationTest>,
    pub variance_homogeneity: Option<VarianceHomogeneity>,
    pub power_analysis: Option<PowerAnalysis>,
    pub random_baseline: Option<RandomBaseline>,
    pub efficiency: Option<EfficiencyAnalysis>,
    pub execution_time: Option<ExecutionTimeComparison>,
    pub independent_test: Option<IndependentTest>,
    pub protocol_breakdown: Option<ProtocolBreakdown>,
    pub learning_curve: Option<LearningCurve>,
    pub conclusion: Conclusion,
    pub raw_pairs: Vec<ExperimentObservation>,
    pub warnings: Vec<BlockFailure>,
    pub config: AnalysisConfig,
}

crate::impl_sanitize!(AnalysisReport {} opt {
    primary,
    permutation_test,
    variance_homogeneity,
    power_analysis,
    random_baseline,
    efficiency,
    execution_time,
    independent_test,
    protocol_breakdown,
    learning_curve,
});

/// Collects block failures while the report is being assembled
struct BlockRunner {
    warnings: Vec<BlockFailure>,
}

impl BlockRunner {
    fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    fn fail(&mut self, block: &str, reason: String) {
        tracing::warn!(block, %reason, "analysis block failed");
        self.warnings.push(BlockFailure {
            block: block.to_string(),
            reason,
        });
    }

    fn run<T>(&mut self, block: &str, f: impl FnOnce() -> Result<T>) -> Option<T> {
        match f() {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(block, e.to_string());
                None
            }
        }
    }
}

/// Analyze a dataset snapshot
///
/// # Example
/// ```
/// use adaptest::analysis::{analyze, AnalysisConfig, Verdict};
/// use adaptest::dataset::Dataset;
/// use adaptest::observation::{ExperimentObservation, Strategy, StrategyOutcome};
///
/// let experiments = [(3, 8), (3, 7), (3, 9), (3, 8), (3, 10)]
///     .iter()
///     .enumerate()
///     .map(|(i, (s, a))| {
///         ExperimentObservation::new(format!("exp-{}", i))
///             .with(Strategy::Static, StrategyOutcome::new(*s, 20, 30.0))
///             .with(Strategy::Automl, StrategyOutcome::new(*a, 25, 40.0))
///     })
///     .collect();
///
/// let report = analyze(&Dataset::new(experiments, vec![]), &AnalysisConfig::quick());
/// assert_eq!(report.verdict, Verdict::AutomlSuperior);
/// ```
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> AnalysisReport {
    analyze_observations(&dataset.experiments, &dataset.protocol_outcomes, config)
}

/// Analyze observations supplied as plain slices
pub fn analyze_observations(
    experiments: &[ExperimentObservation],
    protocol_outcomes: &[ProtocolOutcomeRecord],
    config: &AnalysisConfig,
) -> AnalysisReport {
    let mut runner = BlockRunner::new();

    let config = match config.validate() {
        Ok(()) => config.clone(),
        Err(e) => {
            runner.fail("config", format!("{}; using defaults", e));
            AnalysisConfig::default()
        }
    };

    let experiments = accepted_experiments(experiments, &mut runner);
    let protocol_outcomes: Vec<ProtocolOutcomeRecord> = protocol_outcomes
        .iter()
        .filter_map(|r| match r.validate() {
            Ok(()) => {
                let mut record = r.clone();
                record.protocol = record.protocol.trim().to_lowercase();
                Some(record)
            }
            Err(e) => {
                runner.fail("input", e.to_string());
                None
            }
        })
        .collect();

    let paired: Vec<ExperimentObservation> = experiments
        .iter()
        .filter(|o| o.is_paired())
        .cloned()
        .collect();
    let static_only: Vec<&ExperimentObservation> = experiments
        .iter()
        .filter(|o| o.is_static_only())
        .collect();
    let with_random: Vec<ExperimentObservation> = paired
        .iter()
        .filter(|o| o.outcome(Strategy::Random).is_some())
        .cloned()
        .collect();

    let sample = SampleInfo {
        n_paired: paired.len(),
        paired_experiments: paired.iter().map(|o| o.experiment_id.clone()).collect(),
        static_only_experiments: static_only.len(),
        experiments_with_random: with_random.len(),
    };

    let required = config.min_paired_observations.max(2);
    if paired.len() < required {
        tracing::info!(found = paired.len(), required, "insufficient paired experiments");
        runner.fail(
            "primary",
            AnalysisError::InsufficientData {
                found: paired.len(),
                required,
            }
            .to_string(),
        );
        let mut report = AnalysisReport {
            complete: false,
            verdict: Verdict::InsufficientData,
            sample,
            descriptive: None,
            primary: None,
            permutation_test: None,
            variance_homogeneity: None,
            power_analysis: None,
            random_baseline: None,
            efficiency: None,
            execution_time: None,
            independent_test: None,
            protocol_breakdown: None,
            learning_curve: None,
            conclusion: Conclusion::insufficient_data(paired.len(), required),
            raw_pairs: paired,
            warnings: runner.warnings,
            config,
        };
        report.sanitize();
        return report;
    }

    let descriptive = DescriptiveBlock {
        vulnerabilities: StrategyStats::over(&paired, |o| o.vulns_found as f64),
        tests_executed: StrategyStats::over(&paired, |o| o.tests_executed as f64),
        execution_time_sec: StrategyStats::over(&paired, |o| o.execution_time_sec),
    };

    let vulns = |o: &StrategyOutcome| o.vulns_found as f64;
    let primary_sample =
        PairedSample::from_observations(&paired, Strategy::Automl, Strategy::Static, vulns);
    let primary = runner.run("primary", || {
        compare_paired(&primary_sample, Alternative::Greater, &config)
    });

    let diff = primary_sample.differences();
    let permutation = if diff.iter().any(|d| *d != 0.0) {
        Some(permutation_test(
            &diff,
            config.permutation_resamples,
            config.seed,
            config.significance_level,
        ))
    } else {
        None
    };

    let power = primary.as_ref().and_then(|p| {
        runner.run("power_analysis", || analyze_power(p.n, p.effect_size.cohens_d, &config))
    });

    let homogeneity = if with_random.len() >= 2 {
        let column = |s: Strategy| -> Vec<f64> {
            with_random
                .iter()
                .filter_map(|o| o.outcome(s).map(vulns))
                .collect()
        };
        runner.run("variance_homogeneity", || {
            variance_homogeneity(
                &column(Strategy::Static),
                &column(Strategy::Automl),
                &column(Strategy::Random),
                &config,
            )
        })
    } else {
        None
    };

    let random_baseline = if with_random.len() >= 2 {
        runner.run("random_baseline", || {
            let automl_random = PairedSample::from_observations(
                &with_random,
                Strategy::Automl,
                Strategy::Random,
                vulns,
            );
            let random_static = PairedSample::from_observations(
                &with_random,
                Strategy::Random,
                Strategy::Static,
                vulns,
            );
            Ok(RandomBaseline {
                n: with_random.len(),
                automl_vs_random: compare_paired(&automl_random, Alternative::Greater, &config)?,
                random_vs_static: compare_paired(&random_static, Alternative::Greater, &config)?,
            })
        })
    } else {
        tracing::debug!(n = with_random.len(), "random baseline skipped");
        None
    };

    let efficiency = runner.run("efficiency", || analyze_efficiency(&paired, &config));

    let execution_time = runner.run("execution_time", || {
        execution_time_comparison(&paired, &with_random, &config)
    });

    let independent_test = if static_only.is_empty() {
        None
    } else {
        runner.run("independent_test", || {
            independent_comparison(&primary_sample.a, &static_only, homogeneity.as_ref(), &config)
        })
    };

    let protocols = if protocol_outcomes.is_empty() {
        None
    } else {
        runner.run("protocol_breakdown", || {
            protocol_breakdown(&protocol_outcomes, &config)
        })
    };
    let protocols_missing = !protocol_outcomes.is_empty() && protocols.is_none();

    let curve = runner.run("learning_curve", || learning_curve(&paired, &config));

    let (verdict, conclusion) = match &primary {
        Some(p) => {
            let conclusion = Conclusion::from_primary(
                p,
                SupportingEvidence {
                    permutation: permutation.as_ref(),
                    power: power.as_ref(),
                    protocols: protocols.as_ref().map(|b| &b.multiple_comparison),
                },
            );
            (conclusion.verdict, conclusion)
        }
        None => (
            Verdict::InsufficientData,
            Conclusion::insufficient_data(paired.len(), required),
        ),
    };

    tracing::info!(
        ?verdict,
        n = paired.len(),
        warnings = runner.warnings.len(),
        "analysis complete"
    );

    let mut report = AnalysisReport {
        complete: !protocols_missing,
        verdict,
        sample,
        descriptive: Some(descriptive),
        primary,
        permutation_test: permutation,
        variance_homogeneity: homogeneity,
        power_analysis: power,
        random_baseline,
        efficiency,
        execution_time,
        independent_test,
        protocol_breakdown: protocols,
        learning_curve: curve,
        conclusion,
        raw_pairs: paired,
        warnings: runner.warnings,
        config,
    };
    report.sanitize();
    report
}

/// Drop invalid rows and repeated experiment ids (first occurrence wins)
fn accepted_experiments(
    experiments: &[ExperimentObservation],
    runner: &mut BlockRunner,
) -> Vec<ExperimentObservation> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(experiments.len());
    for obs in experiments {
        if let Err(e) = obs.validate() {
            runner.fail("input", e.to_string());
            continue;
        }
        if !seen.insert(obs.experiment_id.clone()) {
            runner.fail(
                "input",
                AnalysisError::DuplicateExperiment(obs.experiment_id.clone()).to_string(),
            );
            continue;
        }
        accepted.push(obs.clone());
    }
    accepted
}

fn execution_time_comparison(
    paired: &[ExperimentObservation],
    with_random: &[ExperimentObservation],
    config: &AnalysisConfig,
) -> Result<ExecutionTimeComparison> {
    let time = |o: &StrategyOutcome| o.execution_time_sec;
    let sample = PairedSample::from_observations(paired, Strategy::Automl, Strategy::Static, time);
    let comparison = compare_paired(&sample, Alternative::TwoSided, config)?;

    let random: Vec<f64> = with_random
        .iter()
        .filter_map(|o| o.outcome(Strategy::Random).map(time))
        .collect();

    Ok(ExecutionTimeComparison {
        static_mean_sec: comparison.mean_b,
        automl_mean_sec: comparison.mean_a,
        random_mean_sec: (!random.is_empty()).then(|| mean(&random)),
        mean_difference_sec: comparison.mean_difference,
        test_name: comparison.primary.test_name,
        statistic: comparison.primary.statistic,
        p_value: comparison.primary.p_value,
        significant: comparison.primary.reject_h0,
    })
}

fn independent_comparison(
    automl: &[f64],
    static_only: &[&ExperimentObservation],
    homogeneity: Option<&VarianceHomogeneity>,
    config: &AnalysisConfig,
) -> Result<IndependentTest> {
    if automl.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            found: automl.len(),
            required: 2,
        });
    }
    let static_vals: Vec<f64> = static_only
        .iter()
        .filter_map(|o| o.outcome(Strategy::Static).map(|s| s.vulns_found as f64))
        .collect();

    let outcome = mann_whitney_u(automl, &static_vals, Alternative::Greater)?;
    let p_value = outcome.p_value;

    let caveat = homogeneity
        .filter(|h| h.interpretation == HeterogeneityInterpretation::Heteroscedastic)
        .map(|h| h.note.clone());

    Ok(IndependentTest {
        test_name: "Mann-Whitney U (one-sided)".to_string(),
        statistic: Some(outcome.statistic),
        p_value,
        reject_h0: p_value < config.significance_level,
        automl_n: automl.len(),
        static_only_n: static_vals.len(),
        caveat,
    })
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}

fn fmt_required(value: RequiredSampleSize) -> String {
    match value {
        RequiredSampleSize::Found { n } => n.to_string(),
        RequiredSampleSize::ExceedsSearch { n } => format!(">= {}", n),
        RequiredSampleSize::Undeterminable => "undeterminable".to_string(),
    }
}

impl AnalysisReport {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary of the report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        match self.verdict {
            Verdict::AutomlSuperior => report.push_str("✅ AUTOML SUPERIOR TO STATIC\n\n"),
            Verdict::NoSignificantDifference => {
                report.push_str("➖ NO SIGNIFICANT DIFFERENCE\n\n")
            }
            Verdict::InsufficientData => report.push_str("⚠️  INSUFFICIENT DATA\n\n"),
        }
        report.push_str(&format!(
            "Paired experiments: {} (static-only: {}, with random: {})\n",
            self.sample.n_paired,
            self.sample.static_only_experiments,
            self.sample.experiments_with_random
        ));
        report.push_str(&format!(
            "Significance level: {} ({}% confidence)\n",
            self.config.significance_level,
            (1.0 - self.config.significance_level) * 100.0
        ));

        if let Some(desc) = &self.descriptive {
            let v = &desc.vulnerabilities;
            report.push_str("\n📋 Vulnerabilities found:\n");
            report.push_str(&format!(
                "  static  mean={:.2} std={:.2} median={:.1}\n",
                v.static_.mean, v.static_.std, v.static_.median
            ));
            report.push_str(&format!(
                "  automl  mean={:.2} std={:.2} median={:.1}\n",
                v.automl.mean, v.automl.std, v.automl.median
            ));
            if let Some(r) = &v.random {
                report.push_str(&format!(
                    "  random  mean={:.2} std={:.2} median={:.1}\n",
                    r.mean, r.std, r.median
                ));
            }
        }

        if let Some(p) = &self.primary {
            report.push_str("\n📊 AutoML vs Static:\n");
            report.push_str(&format!(
                "  {} (statistic={}, p={:.4})\n",
                p.primary.test_name,
                fmt_opt(p.primary.statistic, 3),
                p.primary.p_value
            ));
            report.push_str(&format!(
                "  mean difference={:.2}, Cohen's d={} ({})\n",
                p.mean_difference,
                fmt_opt(p.effect_size.cohens_d, 2),
                p.effect_size.interpretation
            ));
            report.push_str(&format!(
                "  {:.0}% CI parametric [{}, {}], bootstrap [{}, {}]\n",
                p.confidence_interval.level * 100.0,
                fmt_opt(p.confidence_interval.lower, 2),
                fmt_opt(p.confidence_interval.upper, 2),
                fmt_opt(p.confidence_interval_bootstrap.lower, 2),
                fmt_opt(p.confidence_interval_bootstrap.upper, 2)
            ));
        }

        if let Some(perm) = &self.permutation_test {
            report.push_str(&format!(
                "  permutation p={:.4} ({} draws)\n",
                perm.p_value, perm.n_permutations
            ));
        }

        if let Some(power) = &self.power_analysis {
            report.push_str("\n⚡ Power:\n");
            report.push_str(&format!(
                "  observed={}, n for 80%={}, n for 90%={}\n",
                fmt_opt(power.observed_power, 3),
                fmt_required(power.required_n_80),
                fmt_required(power.required_n_90)
            ));
        }

        if let Some(rb) = &self.random_baseline {
            report.push_str(&format!("\n🎲 Random baseline (n={}):\n", rb.n));
            for c in [&rb.automl_vs_random, &rb.random_vs_static] {
                report.push_str(&format!(
                    "  {} vs {}: diff={:.2}, p={:.4}\n",
                    c.label_a, c.label_b, c.mean_difference, c.primary.p_value
                ));
            }
        }

        if let Some(eff) = &self.efficiency {
            report.push_str("\n🎯 Efficiency (vulns per test):\n");
            report.push_str(&format!(
                "  static={:.4}, automl={:.4}, p={:.4}\n",
                eff.static_mean, eff.automl_mean, eff.test.p_value
            ));
            report.push_str(&format!(
                "  marginal={:.4} over {:.1} extra tests, p={:.4}\n",
                eff.marginal.mean, eff.marginal.extra_tests_mean, eff.marginal.test.p_value
            ));
        }

        if let Some(time) = &self.execution_time {
            report.push_str(&format!(
                "\n⏱️  Execution time: static={:.1}s, automl={:.1}s, p={:.4}\n",
                time.static_mean_sec, time.automl_mean_sec, time.p_value
            ));
        }

        if let Some(breakdown) = &self.protocol_breakdown {
            report.push_str(&format!(
                "\n🔌 Protocols ({} compared, {} significant after Holm):\n",
                breakdown.multiple_comparison.n_comparisons,
                breakdown.multiple_comparison.rejected_holm
            ));
            for row in &breakdown.protocols {
                report.push_str(&format!(
                    "  {} static={}/{} automl={}/{} p={:.4} p_holm={:.4} V={} ({})\n",
                    row.protocol,
                    row.static_.vulns,
                    row.static_.tests,
                    row.automl.vulns,
                    row.automl.tests,
                    row.fisher_p,
                    row.fisher_p_holm,
                    fmt_opt(row.cramers_v, 2),
                    row.effect
                ));
            }
        }

        if let Some(curve) = &self.learning_curve {
            report.push_str(&format!(
                "\n📈 Learning curve: {} points, converged={}\n",
                curve.points.len(),
                curve.converged
            ));
        }

        if !self.warnings.is_empty() {
            report.push_str(&format!("\n⚠️  Skipped blocks ({}):\n", self.warnings.len()));
            for w in &self.warnings {
                report.push_str(&format!("  - {}: {}\n", w.block, w.reason));
            }
        }

        report.push_str(&format!("\n{}\n", self.conclusion.text_en));
        report
    }
}
