//! Build output verification command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sitepack_static::{inspect_output, status, VerifyError};

use super::config::load_config;

/// Run the verify command.
pub fn run(root: &Path, config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let output_dir = load_config(config_path)?.output_dir(root, output);

    let listing = match inspect_output(&output_dir) {
        Ok(listing) => listing,
        Err(e) => {
            if matches!(e, VerifyError::Missing(_) | VerifyError::Empty(_)) {
                tracing::error!("{} The build did not complete successfully.", status::FATAL);
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        "{} Verification passed: {} exists and contains {} entries",
        status::OK,
        output_dir.display(),
        listing.len()
    );
    tracing::info!("{} Contents: {}", status::OK, listing.preview());

    Ok(())
}
