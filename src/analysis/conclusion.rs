// Templated natural-language conclusion (English and Portuguese)
//
// Only computed numbers are substituted into fixed sentences, so identical
// reports always render identical text.

use crate::analysis::correction::MultipleComparisonSummary;
use crate::analysis::paired::{EffectMagnitude, PairedComparison};
use crate::analysis::power::PowerAnalysis;
use crate::analysis::resampling::PermutationTest;
use serde::{Deserialize, Serialize};

/// Machine-readable outcome of the primary comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AutomlSuperior,
    NoSignificantDifference,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conclusion {
    pub verdict: Verdict,
    pub text_en: String,
    pub text_pt: String,
}

/// Evidence the conclusion draws on besides the primary comparison
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportingEvidence<'a> {
    pub permutation: Option<&'a PermutationTest>,
    pub power: Option<&'a PowerAnalysis>,
    pub protocols: Option<&'a MultipleComparisonSummary>,
}

fn format_p(p: f64) -> String {
    if p < 0.001 {
        "p < 0.001".to_string()
    } else {
        format!("p = {:.4}", p)
    }
}

fn magnitude_pt(magnitude: EffectMagnitude) -> &'static str {
    match magnitude {
        EffectMagnitude::Negligible => "desprezível",
        EffectMagnitude::Small => "pequeno",
        EffectMagnitude::Medium => "médio",
        EffectMagnitude::Large => "grande",
    }
}

impl Conclusion {
    pub fn insufficient_data(found: usize, required: usize) -> Self {
        Self {
            verdict: Verdict::InsufficientData,
            text_en: format!(
                "Insufficient data: {} paired experiments available, at least {} required.",
                found, required
            ),
            text_pt: format!(
                "Dados insuficientes: {} experimentos pareados disponíveis, são necessários pelo menos {}.",
                found, required
            ),
        }
    }

    pub fn from_primary(primary: &PairedComparison, evidence: SupportingEvidence<'_>) -> Self {
        let test = &primary.primary;
        let p = format_p(test.p_value);
        let magnitude = primary.effect_size.interpretation;
        let (d_en, d_pt) = match primary.effect_size.cohens_d {
            Some(d) => (format!("{:.2}", d), format!("{:.2}", d)),
            None => ("undefined".to_string(), "indefinido".to_string()),
        };

        let (verdict, mut en, mut pt) = if test.reject_h0 {
            (
                Verdict::AutomlSuperior,
                format!(
                    "AutoML found significantly more vulnerabilities than the static suite \
                     (mean difference {:.2}, {}, {}, Cohen's d = {} ({})) across {} paired experiments.",
                    primary.mean_difference, test.test_name, p, d_en, magnitude, primary.n
                ),
                format!(
                    "O AutoML encontrou significativamente mais vulnerabilidades que a suíte estática \
                     (diferença média {:.2}, {}, {}, d de Cohen = {} ({})) em {} experimentos pareados.",
                    primary.mean_difference,
                    test.test_name,
                    p,
                    d_pt,
                    magnitude_pt(magnitude),
                    primary.n
                ),
            )
        } else {
            (
                Verdict::NoSignificantDifference,
                format!(
                    "No significant difference in vulnerabilities found between AutoML and the static suite \
                     (mean difference {:.2}, {}, {}) across {} paired experiments.",
                    primary.mean_difference, test.test_name, p, primary.n
                ),
                format!(
                    "Não houve diferença significativa de vulnerabilidades encontradas entre o AutoML e a suíte \
                     estática (diferença média {:.2}, {}, {}) em {} experimentos pareados.",
                    primary.mean_difference, test.test_name, p, primary.n
                ),
            )
        };

        if let Some(perm) = evidence.permutation {
            let agrees = perm.reject_h0 == test.reject_h0;
            en.push_str(&format!(
                " The permutation test {} this result ({}).",
                if agrees { "confirms" } else { "does not confirm" },
                format_p(perm.p_value)
            ));
            pt.push_str(&format!(
                " O teste de permutação {} este resultado ({}).",
                if agrees { "confirma" } else { "não confirma" },
                format_p(perm.p_value)
            ));
        }

        if let Some(power) = evidence.power.and_then(|p| p.observed_power) {
            en.push_str(&format!(" Post-hoc power is {:.0}%.", power * 100.0));
            pt.push_str(&format!(" O poder estatístico post-hoc é {:.0}%.", power * 100.0));
        }

        if let Some(summary) = evidence.protocols {
            en.push_str(&format!(
                " {} of {} protocols remain significant after Holm correction.",
                summary.rejected_holm, summary.n_comparisons
            ));
            pt.push_str(&format!(
                " {} de {} protocolos permanecem significativos após a correção de Holm.",
                summary.rejected_holm, summary.n_comparisons
            ));
        }

        Self {
            verdict,
            text_en: en,
            text_pt: pt,
        }
    }
}
