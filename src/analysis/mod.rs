// Statistical comparison of IoT testing strategies
//
// Decides whether the model-guided (automl) suite finds more vulnerabilities
// than the fixed (static) suite over paired experiments, how large the effect
// is, and how robust that conclusion is.
//
// Scientific Foundation:
// [1] Shapiro, S. S. & Wilk, M. B. (1965). An analysis of variance test for
//     normality. Biometrika 52. Royston's (1995) AS R94 approximation is used.
// [2] Wilcoxon, F. (1945). Individual comparisons by ranking methods.
// [3] Holm, S. (1979). A simple sequentially rejective multiple test procedure.
// [4] Benjamini, Y. & Hochberg, Y. (1995). Controlling the false discovery rate.
// [5] Brown, M. B. & Forsythe, A. B. (1974). Robust tests for the equality of
//     variances.
//
// Pipeline:
// - Paired comparator (normality -> t-test or Wilcoxon, Cohen's d, CIs)
// - Robustness: sign-flip permutation, percentile bootstrap, Levene
// - Power and required sample size (non-central t)
// - Per-protocol Fisher exact + Cramer's V with Holm / BH / Bonferroni
// - Efficiency and marginal efficiency, learning curve, conclusion text

mod config;
mod conclusion;
mod convergence;
pub mod correction;
mod descriptive;
pub mod distributions;
mod efficiency;
mod normality;
mod paired;
mod power;
mod protocol;
pub mod rank_tests;
mod report;
pub mod resampling;
mod variance;

pub use conclusion::{Conclusion, SupportingEvidence, Verdict};
pub use config::AnalysisConfig;
pub use convergence::{learning_curve, LearningCurve, LearningCurvePoint};
pub use correction::{
    benjamini_hochberg, bonferroni, holm, CorrectionMethod, MultipleComparisonSummary,
};
pub use descriptive::{mean, median, percentile, sample_std, sample_variance, DescriptiveStats};
pub use efficiency::{
    analyze_efficiency, marginal_efficiency, EfficiencyAnalysis, MarginalEfficiency,
};
pub use normality::{check_normality, shapiro_wilk, NormalityTest};
pub use paired::{
    cohens_d, compare_against_zero, compare_paired, parametric_ci, primary_test, Alternative,
    CiMethod, ConfidenceInterval, Design, EffectMagnitude, EffectSize, PairedComparison,
    TestResult,
};
pub use power::{
    analyze_power, compute_power, required_n, PowerAnalysis, PowerInterpretation,
    RequiredSampleSize,
};
pub use protocol::{
    aggregate, cramers_v, fisher_exact, protocol_breakdown, ContingencyTable, ProtocolBreakdown,
    ProtocolComparison, ProtocolCounts,
};
pub use report::{
    analyze, analyze_observations, AnalysisReport, BlockFailure, DescriptiveBlock,
    ExecutionTimeComparison, IndependentTest, RandomBaseline, SampleInfo, StrategyStats,
};
pub use resampling::{bootstrap_ci, permutation_test, PermutationTest};
pub use variance::{
    levene, variance_homogeneity, GroupVariances, HeterogeneityInterpretation, VarianceHomogeneity,
};
