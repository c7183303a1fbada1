//! Process command - extract data from a single invoice file.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::{InvoicePipeline, PipelineOptions, ProcessOutcome, RefinementStatus};

use super::{load_config, output_dir_for, print_warnings, write_outputs};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (pdf, docx, doc, xlsx, xls, ods or txt)
    #[arg(required = true)]
    input: PathBuf,

    /// Skip LLM refinement even when a credential is configured
    #[arg(long)]
    no_llm: bool,

    /// Do not write the JSON file
    #[arg(long)]
    no_json: bool,

    /// Directory for the CSV/JSON output (default: next to the input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let options = PipelineOptions::resolve(&config, args.no_llm, args.no_json);
    debug!("Options: {:?}", options);

    let output_dir = output_dir_for(&args.input, args.output_dir.as_deref(), &config);
    let pipeline = InvoicePipeline::new(config, options);

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Processing {}...", args.input.display()));

    let outcome = pipeline.process(&args.input).await;
    pb.finish_and_clear();

    let written = write_outputs(&outcome, &output_dir)?;
    report(&outcome, options);
    for path in &written {
        println!("{} Output written to {}", style("✓").green(), path.display());
    }

    if let Some(failure) = &outcome.failure {
        if failure.is_input_error() {
            anyhow::bail!("{}", outcome.failure_message().unwrap_or_else(|| failure.to_string()));
        }
    }

    debug!("Processed in {}ms", outcome.processing_time_ms);
    Ok(())
}

/// Item table, warnings and the status line.
fn report(outcome: &ProcessOutcome, options: PipelineOptions) {
    if outcome.item_count() > 0 {
        println!("{}", outcome.export.table());
    }

    print_warnings(outcome);

    if options.llm_enabled {
        if let RefinementStatus::Unavailable { reason } = &outcome.refinement {
            eprintln!(
                "{} LLM refinement unavailable ({}); using heuristic results",
                style("ℹ").blue(),
                reason
            );
        }
    }

    let line = outcome.status_line();
    if outcome.failure.is_some() {
        eprintln!("{} {}", style("✗").red(), line);
    } else if outcome.item_count() == 0 {
        println!("{} {}", style("ℹ").blue(), line);
    } else {
        println!("{} {}", style("✓").green(), line);
    }
}
