//! Input boundary: loading and validating experiment data
//!
//! # Example input
//!
//! ```json
//! {
//!   "experiments": [
//!     { "experiment_id": "exp-001",
//!       "static": { "vulns_found": 3, "tests_executed": 20, "execution_time_sec": 41.0 },
//!       "automl": { "vulns_found": 8, "tests_executed": 26, "execution_time_sec": 55.2 } }
//!   ],
//!   "protocol_outcomes": [
//!     { "protocol": "mqtt", "strategy": "automl", "vulnerable": true }
//!   ]
//! }
//! ```

use crate::error::{AnalysisError, Result};
use crate::observation::{ExperimentObservation, ProtocolOutcomeRecord};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Snapshot of every observation currently available
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub experiments: Vec<ExperimentObservation>,
    #[serde(default)]
    pub protocol_outcomes: Vec<ProtocolOutcomeRecord>,
}

impl Dataset {
    pub fn new(
        experiments: Vec<ExperimentObservation>,
        protocol_outcomes: Vec<ProtocolOutcomeRecord>,
    ) -> Self {
        Self {
            experiments,
            protocol_outcomes,
        }
    }

    /// Load a dataset from a JSON file and normalise it
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_json_str(&content)
            .with_context(|| format!("Invalid dataset in {}", path.display()))
    }

    /// Parse a dataset from a JSON string and normalise it
    ///
    /// Only malformed JSON or a wrong document shape is an error. Rows that
    /// break the data model are kept here and dropped with an "input"
    /// warning when the report is assembled.
    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        let mut dataset: Dataset =
            serde_json::from_str(content).context("Failed to parse dataset JSON")?;
        dataset.normalize();
        if let Err(e) = dataset.validate() {
            tracing::debug!(error = %e, "dataset contains rows that will be skipped");
        }
        Ok(dataset)
    }

    /// Lower-case and trim protocol names so "MQTT" and "mqtt " aggregate together
    pub fn normalize(&mut self) {
        for record in &mut self.protocol_outcomes {
            record.protocol = record.protocol.trim().to_lowercase();
        }
    }

    /// Check the data-model invariants on every row, stopping at the first violation
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for obs in &self.experiments {
            obs.validate()?;
            if !seen.insert(obs.experiment_id.as_str()) {
                return Err(AnalysisError::DuplicateExperiment(
                    obs.experiment_id.clone(),
                ));
            }
        }
        for record in &self.protocol_outcomes {
            record.validate()?;
        }
        Ok(())
    }

    pub fn paired_count(&self) -> usize {
        self.experiments.iter().filter(|o| o.is_paired()).count()
    }
}
