//! Experiment observations and per-test protocol outcomes
//!
//! These are the only inputs the engine consumes. Rows are validated once,
//! at the dataset boundary; statistical routines assume valid values.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Testing strategy under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Fixed baseline suite
    Static,
    /// Model-guided adaptive suite
    Automl,
    /// Random-selection control
    Random,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Static => "static",
            Strategy::Automl => "automl",
            Strategy::Random => "random",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one strategy within one experiment run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    /// Vulnerabilities found
    pub vulns_found: u32,
    /// Tests executed (must be positive)
    pub tests_executed: u32,
    /// Wall-clock execution time in seconds
    pub execution_time_sec: f64,
}

impl StrategyOutcome {
    pub fn new(vulns_found: u32, tests_executed: u32, execution_time_sec: f64) -> Self {
        Self {
            vulns_found,
            tests_executed,
            execution_time_sec,
        }
    }

    /// Vulnerabilities per executed test
    pub fn efficiency(&self) -> f64 {
        if self.tests_executed == 0 {
            return 0.0;
        }
        self.vulns_found as f64 / self.tests_executed as f64
    }

    fn validate(&self, id: &str, strategy: Strategy) -> Result<()> {
        if self.tests_executed == 0 {
            return Err(AnalysisError::InvalidObservation {
                id: id.to_string(),
                reason: format!("{} tests_executed must be positive", strategy),
            });
        }
        if !self.execution_time_sec.is_finite() || self.execution_time_sec < 0.0 {
            return Err(AnalysisError::InvalidObservation {
                id: id.to_string(),
                reason: format!(
                    "{} execution_time_sec must be finite and non-negative, got {}",
                    strategy, self.execution_time_sec
                ),
            });
        }
        Ok(())
    }
}

/// One completed experiment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentObservation {
    pub experiment_id: String,
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_outcome: Option<StrategyOutcome>,
    #[serde(rename = "automl", default, skip_serializing_if = "Option::is_none")]
    pub automl_outcome: Option<StrategyOutcome>,
    #[serde(rename = "random", default, skip_serializing_if = "Option::is_none")]
    pub random_outcome: Option<StrategyOutcome>,
}

impl ExperimentObservation {
    pub fn new(experiment_id: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            static_outcome: None,
            automl_outcome: None,
            random_outcome: None,
        }
    }

    /// Attach the outcome of one strategy
    pub fn with(mut self, strategy: Strategy, outcome: StrategyOutcome) -> Self {
        match strategy {
            Strategy::Static => self.static_outcome = Some(outcome),
            Strategy::Automl => self.automl_outcome = Some(outcome),
            Strategy::Random => self.random_outcome = Some(outcome),
        }
        self
    }

    pub fn outcome(&self, strategy: Strategy) -> Option<&StrategyOutcome> {
        match strategy {
            Strategy::Static => self.static_outcome.as_ref(),
            Strategy::Automl => self.automl_outcome.as_ref(),
            Strategy::Random => self.random_outcome.as_ref(),
        }
    }

    /// Participates in the paired analysis (has both static and automl)
    pub fn is_paired(&self) -> bool {
        self.static_outcome.is_some() && self.automl_outcome.is_some()
    }

    /// Ran the static suite without an automl counterpart
    pub fn is_static_only(&self) -> bool {
        self.static_outcome.is_some() && self.automl_outcome.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.experiment_id.trim().is_empty() {
            return Err(AnalysisError::InvalidObservation {
                id: self.experiment_id.clone(),
                reason: "experiment_id must not be empty".to_string(),
            });
        }
        for strategy in [Strategy::Static, Strategy::Automl, Strategy::Random] {
            if let Some(outcome) = self.outcome(strategy) {
                outcome.validate(&self.experiment_id, strategy)?;
            }
        }
        Ok(())
    }
}

/// One executed test instance, tagged by protocol and strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolOutcomeRecord {
    pub protocol: String,
    pub strategy: Strategy,
    pub vulnerable: bool,
}

impl ProtocolOutcomeRecord {
    pub fn new(protocol: impl Into<String>, strategy: Strategy, vulnerable: bool) -> Self {
        Self {
            protocol: protocol.into(),
            strategy,
            vulnerable,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.protocol.trim().is_empty() {
            return Err(AnalysisError::InvalidObservation {
                id: format!("protocol record ({})", self.strategy),
                reason: "protocol name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Two equal-length samples aligned by experiment id; A is hypothesized greater
#[derive(Debug, Clone, PartialEq)]
pub struct PairedSample {
    pub label_a: String,
    pub label_b: String,
    pub experiment_ids: Vec<String>,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl PairedSample {
    /// Build from observations having both strategies, in input order
    pub fn from_observations<F>(
        observations: &[ExperimentObservation],
        a: Strategy,
        b: Strategy,
        metric: F,
    ) -> Self
    where
        F: Fn(&StrategyOutcome) -> f64,
    {
        let mut sample = Self {
            label_a: a.label().to_string(),
            label_b: b.label().to_string(),
            experiment_ids: Vec::new(),
            a: Vec::new(),
            b: Vec::new(),
        };
        for obs in observations {
            if let (Some(oa), Some(ob)) = (obs.outcome(a), obs.outcome(b)) {
                sample.experiment_ids.push(obs.experiment_id.clone());
                sample.a.push(metric(oa));
                sample.b.push(metric(ob));
            }
        }
        sample
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Element-wise `a - b`
    pub fn differences(&self) -> Vec<f64> {
        self.a.iter().zip(&self.b).map(|(a, b)| a - b).collect()
    }
}
