//! Standalone static asset staging command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sitepack_static::{status, StaticAssetStager};

use super::config::load_config;

/// Run the stage command against an already-built output directory.
pub fn run(root: &Path, config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let file_config = load_config(config_path)?;
    let config = file_config.stage_config(root, output);
    let output_dir = config.resolved_output();

    tracing::info!("Staging static assets into {}", output_dir.display());

    let report = StaticAssetStager::new(config).stage()?;

    if !report.warnings.is_empty() || !report.skipped.is_empty() {
        tracing::info!(
            "{} Staging finished with {} skipped and {} failed copies",
            status::WARN,
            report.skipped.len(),
            report.warnings.len()
        );
    }

    tracing::info!(
        "{} {} now holds {}",
        status::OK,
        output_dir.display(),
        report.listing
    );

    Ok(())
}
