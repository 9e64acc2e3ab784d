// Vulnerabilities-per-test efficiency and the marginal value of extra tests

use crate::analysis::config::AnalysisConfig;
use crate::analysis::descriptive::{mean, sample_std};
use crate::analysis::paired::{
    compare_against_zero, compare_paired, Alternative, ConfidenceInterval, EffectSize, TestResult,
};
use crate::error::Result;
use crate::observation::{ExperimentObservation, PairedSample, Strategy, StrategyOutcome};
use serde::{Deserialize, Serialize};

/// Productivity of the tests automl runs beyond the static suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginalEfficiency {
    pub mean: f64,
    pub std: f64,
    pub extra_tests_mean: f64,
    pub extra_vulns_mean: f64,
    /// Experiments where automl ran more tests than static
    pub n_with_extra_tests: usize,
    pub test: TestResult,
}

crate::impl_sanitize!(MarginalEfficiency { test });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyAnalysis {
    pub static_mean: f64,
    pub static_std: f64,
    pub automl_mean: f64,
    pub automl_std: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_std: Option<f64>,
    /// Relative gain of automl over static; undefined when static efficiency is 0
    pub automl_improvement_pct: Option<f64>,
    pub test: TestResult,
    pub effect_size: EffectSize,
    pub confidence_interval: ConfidenceInterval,
    pub marginal: MarginalEfficiency,
}

crate::impl_sanitize!(EfficiencyAnalysis {
    random_mean,
    random_std,
    automl_improvement_pct,
    test,
    effect_size,
    confidence_interval,
    marginal,
});

/// (automl_vulns - static_vulns) / (automl_tests - static_tests), 0 without extra tests
pub fn marginal_efficiency(static_: &StrategyOutcome, automl: &StrategyOutcome) -> f64 {
    let extra_tests = automl.tests_executed as f64 - static_.tests_executed as f64;
    if extra_tests <= 0.0 {
        return 0.0;
    }
    (automl.vulns_found as f64 - static_.vulns_found as f64) / extra_tests
}

/// Efficiency comparison over paired observations (each has static and automl)
pub fn analyze_efficiency(
    paired: &[ExperimentObservation],
    config: &AnalysisConfig,
) -> Result<EfficiencyAnalysis> {
    let sample = PairedSample::from_observations(
        paired,
        Strategy::Automl,
        Strategy::Static,
        StrategyOutcome::efficiency,
    );
    let comparison = compare_paired(&sample, Alternative::Greater, config)?;

    let random: Vec<f64> = paired
        .iter()
        .filter_map(|o| o.outcome(Strategy::Random).map(StrategyOutcome::efficiency))
        .collect();

    let static_mean = mean(&sample.b);
    let automl_mean = mean(&sample.a);
    let automl_improvement_pct =
        (static_mean > 0.0).then(|| (automl_mean - static_mean) / static_mean * 100.0);

    let mut marginal_values = Vec::with_capacity(paired.len());
    let mut extra_tests = Vec::with_capacity(paired.len());
    let mut extra_vulns = Vec::with_capacity(paired.len());
    for obs in paired {
        if let (Some(s), Some(a)) = (obs.outcome(Strategy::Static), obs.outcome(Strategy::Automl)) {
            marginal_values.push(marginal_efficiency(s, a));
            extra_tests.push(a.tests_executed as f64 - s.tests_executed as f64);
            extra_vulns.push(a.vulns_found as f64 - s.vulns_found as f64);
        }
    }
    let marginal_test = compare_against_zero(
        &marginal_values,
        "marginal_efficiency",
        Alternative::Greater,
        config,
    )?;

    let marginal = MarginalEfficiency {
        mean: mean(&marginal_values),
        std: sample_std(&marginal_values),
        extra_tests_mean: mean(&extra_tests),
        extra_vulns_mean: mean(&extra_vulns),
        n_with_extra_tests: extra_tests.iter().filter(|t| **t > 0.0).count(),
        test: marginal_test.primary,
    };

    tracing::debug!(
        static_mean,
        automl_mean,
        marginal = marginal.mean,
        "efficiency analysis"
    );

    Ok(EfficiencyAnalysis {
        static_mean,
        static_std: sample_std(&sample.b),
        automl_mean,
        automl_std: sample_std(&sample.a),
        random_mean: (!random.is_empty()).then(|| mean(&random)),
        random_std: (!random.is_empty()).then(|| sample_std(&random)),
        automl_improvement_pct,
        test: comparison.primary,
        effect_size: comparison.effect_size,
        confidence_interval: comparison.confidence_interval,
        marginal,
    })
}
