//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use invex_core::export::ExportColumn;
use invex_core::{DocumentFormat, InvoicePipeline, PipelineOptions, ProcessOutcome};

use super::{load_config, output_dir_for, print_warnings, write_outputs};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files, e.g. "invoices/*.pdf"
    #[arg(required = true)]
    input: String,

    /// Output directory (default: next to each input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Skip LLM refinement
    #[arg(long)]
    no_llm: bool,

    /// Do not write JSON files
    #[arg(long)]
    no_json: bool,

    /// Also write summary.csv with every record
    #[arg(long)]
    summary: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let options = PipelineOptions::resolve(&config, args.no_llm, args.no_json);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && DocumentFormat::from_path(p).is_some())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let pipeline = InvoicePipeline::new(config.clone(), options);
    let mut outcomes = Vec::with_capacity(files.len());

    // Sequential: one file at a time through the external tools
    for path in &files {
        let outcome = pipeline.process(path).await;

        let dir = output_dir_for(path, args.output_dir.as_deref(), &config);
        if let Err(e) = write_outputs(&outcome, &dir) {
            warn!("Failed to write output for {}: {}", path.display(), e);
        }

        pb.inc(1);
        outcomes.push(outcome);
    }

    pb.finish_and_clear();

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    let failed: Vec<&ProcessOutcome> = outcomes.iter().filter(|o| !o.is_success()).collect();
    let items: usize = outcomes.iter().map(|o| o.item_count()).sum();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} items",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red(),
        items
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            println!("  - {}", outcome.status_line());
        }
    }

    for outcome in outcomes.iter().filter(|o| o.is_success() && !o.warnings.is_empty()) {
        debug!("{} warnings for {}", outcome.warnings.len(), outcome.file_name());
        eprintln!("{}:", outcome.file_name());
        print_warnings(outcome);
    }

    Ok(())
}

/// One CSV with the rows of every file, prefixed by file and status.
fn write_summary(path: &Path, outcomes: &[ProcessOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["file", "status"];
    header.extend(ExportColumn::names());
    header.push("error");
    wtr.write_record(&header)?;

    for outcome in outcomes {
        let file = outcome.file_name();
        let status = match (&outcome.failure, outcome.item_count()) {
            (Some(_), _) => "error",
            (None, 0) => "no_items",
            (None, _) => "success",
        };
        let error = outcome.failure_message().unwrap_or_default();

        for row in &outcome.export.rows {
            let mut record: Vec<&str> = vec![file.as_str(), status];
            record.extend(row.values().iter().map(String::as_str));
            record.push(error.as_str());
            wtr.write_record(&record)?;
        }
    }

    wtr.flush()?;
    Ok(())
}
