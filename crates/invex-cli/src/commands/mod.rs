//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

use invex_core::{InvexConfig, InvexError, ProcessOutcome};

/// Per-user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// `--config` if given, else the per-user file if present, else defaults.
/// Environment overrides are applied last.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvexConfig> {
    let config = match config_path {
        Some(path) => InvexConfig::from_file(Path::new(path))
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Using config at {}", path.display());
                InvexConfig::from_file(&path)?
            } else {
                InvexConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides())
}

/// Where outputs for `input` go.
pub fn output_dir_for(input: &Path, explicit: Option<&Path>, config: &InvexConfig) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.export.output_dir.clone())
        .or_else(|| input.parent().map(Path::to_path_buf))
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write `<stem>.csv` and, when produced, `<stem>.json`.
///
/// Skipped for inputs that do not exist: there is nothing to sit alongside.
pub fn write_outputs(outcome: &ProcessOutcome, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if matches!(outcome.failure, Some(InvexError::NotFound(_))) {
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir)?;
    let stem = outcome
        .source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");

    let mut written = Vec::new();

    let csv_path = dir.join(format!("{}.csv", stem));
    fs::write(&csv_path, &outcome.export.csv)?;
    written.push(csv_path);

    if let Some(json) = &outcome.export.json {
        let json_path = dir.join(format!("{}.json", stem));
        fs::write(&json_path, json)?;
        written.push(json_path);
    }

    for path in &written {
        debug!("Wrote {}", path.display());
    }
    Ok(written)
}

/// Warnings, grouped under the file they belong to.
pub fn print_warnings(outcome: &ProcessOutcome) {
    for warning in &outcome.warnings {
        eprintln!("  {} {}", style("!").yellow(), warning);
    }
}
