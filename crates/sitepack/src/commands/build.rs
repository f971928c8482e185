//! Site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sitepack_static::{status, SiteBuilder, StaticAssetStager};

use super::config::load_config;

/// Run the build command.
pub fn run(
    root: &Path,
    config_path: &Path,
    output: Option<PathBuf>,
    minify: Option<bool>,
    stage: bool,
) -> Result<()> {
    tracing::info!("Building site...");

    let file_config = load_config(config_path)?;

    let mut config = file_config.build_config(root, output.clone());
    if let Some(minify) = minify {
        config.minify = minify;
    }

    let mut builder = SiteBuilder::new(config);
    if stage {
        let stager = StaticAssetStager::new(file_config.stage_config(root, output));
        builder = builder.with_hook(Box::new(stager));
    } else {
        tracing::info!("Skipping static asset staging");
    }

    let result = builder.build()?;

    tracing::info!(
        "{} Built {} pages with {} assets in {}ms",
        status::OK,
        result.pages,
        result.assets,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
