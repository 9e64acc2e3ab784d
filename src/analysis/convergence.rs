// Learning curve: how the primary decision evolves as experiments accumulate
//
// For every prefix of the paired experiments (k = 2..=n, input order) the
// primary test is re-run without resampling. Stability is judged on the last
// `stability_window` points.

use crate::analysis::config::AnalysisConfig;
use crate::analysis::descriptive::mean;
use crate::analysis::paired::{primary_test, Alternative, Design};
use crate::error::Result;
use crate::observation::{ExperimentObservation, Strategy};
use serde::{Deserialize, Serialize};

/// One prefix of the experiment series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurvePoint {
    pub n: usize,
    pub static_mean: f64,
    pub automl_mean: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_mean: Option<f64>,
    pub mean_difference: f64,
    pub p_value: f64,
    pub significant: bool,
}

crate::impl_sanitize!(LearningCurvePoint { random_mean });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    pub points: Vec<LearningCurvePoint>,
    pub window: usize,
    /// max - min of the p-values inside the window
    pub p_value_range: Option<f64>,
    pub direction_consistent: bool,
    pub converged: bool,
    /// Smallest n from which every later point agrees with the final decision
    pub minimum_n_for_stability: Option<usize>,
}

crate::impl_sanitize!(LearningCurve {
    points,
    p_value_range
});

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Build the learning curve over paired observations (automl vs static)
pub fn learning_curve(
    paired: &[ExperimentObservation],
    config: &AnalysisConfig,
) -> Result<LearningCurve> {
    let mut points = Vec::with_capacity(paired.len().saturating_sub(1));

    let mut static_vals = Vec::with_capacity(paired.len());
    let mut automl_vals = Vec::with_capacity(paired.len());
    let mut random_vals = Vec::new();

    for obs in paired {
        let (Some(s), Some(a)) = (
            obs.outcome(Strategy::Static),
            obs.outcome(Strategy::Automl),
        ) else {
            continue;
        };
        static_vals.push(s.vulns_found as f64);
        automl_vals.push(a.vulns_found as f64);
        if let Some(r) = obs.outcome(Strategy::Random) {
            random_vals.push(r.vulns_found as f64);
        }

        let k = static_vals.len();
        if k < 2 {
            continue;
        }
        let diff: Vec<f64> = automl_vals.iter().zip(&static_vals).map(|(a, s)| a - s).collect();
        let (_, result) = primary_test(&diff, Alternative::Greater, Design::Paired, config)?;

        points.push(LearningCurvePoint {
            n: k,
            static_mean: mean(&static_vals),
            automl_mean: mean(&automl_vals),
            random_mean: (!random_vals.is_empty()).then(|| mean(&random_vals)),
            mean_difference: mean(&diff),
            p_value: result.p_value,
            significant: result.reject_h0,
        });
    }

    let window = config.stability_window.max(1);
    let tail = &points[points.len().saturating_sub(window)..];

    let p_value_range = (!tail.is_empty()).then(|| {
        let max = tail.iter().map(|p| p.p_value).fold(f64::MIN, f64::max);
        let min = tail.iter().map(|p| p.p_value).fold(f64::MAX, f64::min);
        max - min
    });

    let first_sign = tail.first().map(|p| sign(p.mean_difference)).unwrap_or(0);
    let direction_consistent =
        first_sign != 0 && tail.iter().all(|p| sign(p.mean_difference) == first_sign);
    let same_decision = tail.windows(2).all(|w| w[0].significant == w[1].significant);

    let converged = tail.len() == window
        && direction_consistent
        && same_decision
        && p_value_range.is_some_and(|r| r < config.stability_tolerance);

    let minimum_n_for_stability = if converged {
        points.last().map(|last| {
            let start = points
                .iter()
                .rposition(|p| p.significant != last.significant)
                .map_or(0, |i| i + 1);
            points[start].n
        })
    } else {
        None
    };

    tracing::debug!(
        points = points.len(),
        converged,
        ?minimum_n_for_stability,
        "learning curve"
    );

    Ok(LearningCurve {
        points,
        window,
        p_value_range,
        direction_consistent,
        converged,
        minimum_n_for_stability,
    })
}
