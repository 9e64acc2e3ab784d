//! CLI argument parsing for adaptest

use crate::analysis::AnalysisConfig;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the comparison report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "adaptest")]
#[command(version)]
#[command(
    about = "Statistical comparison of static, model-guided and random IoT test strategies",
    long_about = None
)]
pub struct Cli {
    /// Dataset of experiment observations (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Analysis configuration (TOML); unspecified keys keep their defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Master seed for bootstrap and permutation resampling
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Use 1,000 resamples instead of 10,000
    #[arg(long)]
    pub quick: bool,

    /// Use alpha = 0.01 and 99% intervals (ignored with --config)
    #[arg(long, conflicts_with = "config")]
    pub strict: bool,

    /// Enable debug tracing output to stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Build the analysis configuration from the file and flags
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None if self.strict => AnalysisConfig::strict(),
            None => AnalysisConfig::default(),
        };
        if self.quick {
            let quick = AnalysisConfig::quick();
            config.bootstrap_resamples = quick.bootstrap_resamples;
            config.permutation_resamples = quick.permutation_resamples;
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config.validate()?;
        Ok(config)
    }
}
