use adaptest::analysis::analyze;
use adaptest::cli::{Cli, OutputFormat};
use adaptest::dataset::Dataset;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = args.analysis_config().context("Invalid analysis configuration")?;
    let dataset = Dataset::from_file(&args.input)?;
    tracing::debug!(
        experiments = dataset.experiments.len(),
        paired = dataset.paired_count(),
        protocol_outcomes = dataset.protocol_outcomes.len(),
        "dataset loaded"
    );

    let report = analyze(&dataset, &config);

    match args.format {
        OutputFormat::Text => print!("{}", report.to_report_string()),
        OutputFormat::Json => println!(
            "{}",
            report.to_json().context("Failed to serialize report")?
        ),
    }

    Ok(())
}
