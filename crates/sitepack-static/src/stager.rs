//! Static asset staging.
//!
//! Copies the favicon directory and a fixed list of root files into an
//! already-built output directory. Missing sources are warnings; only a
//! broken output directory is fatal.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::hooks::{BuildHook, HookError, WriteComplete};
use crate::output::{copy_durable, sync_dir};
use crate::status;
use crate::verify::{inspect_output, OutputListing, VerifyError};

/// Configuration for staging static assets.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Project root; relative paths below are resolved against it
    pub root: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Source directory of icon files
    pub favicon_dir: PathBuf,

    /// Destination of the icons, relative to the output directory
    pub favicon_target: PathBuf,

    /// Files copied from the root into the output root when present
    pub root_files: Vec<String>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_dir: PathBuf::from("dist"),
            favicon_dir: PathBuf::from("public/favicon"),
            favicon_target: PathBuf::from("favicon"),
            root_files: vec!["robots.txt".to_string(), "sitemap.xml".to_string()],
        }
    }
}

impl StageConfig {
    /// Output directory resolved against the root.
    pub fn resolved_output(&self) -> PathBuf {
        self.root.join(&self.output_dir)
    }
}

/// Errors that stop staging.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Output(#[from] VerifyError),
}

/// Outcome of a staging run.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Icon files copied
    pub favicons: usize,

    /// Root files copied
    pub root_files: usize,

    /// Optional sources that were absent
    pub skipped: Vec<PathBuf>,

    /// Copy failures downgraded to warnings
    pub warnings: Vec<String>,

    /// Output directory contents after staging
    pub listing: OutputListing,
}

/// Stages favicons and root files into the output directory.
pub struct StaticAssetStager {
    config: StageConfig,
}

/// Mutable tallies while staging.
#[derive(Default)]
struct Tally {
    favicons: usize,
    root_files: usize,
    skipped: Vec<PathBuf>,
    warnings: Vec<String>,
}

impl Tally {
    fn skip(&mut self, path: PathBuf, what: &str) {
        tracing::warn!("{} {} not found, skipping: {}", status::WARN, what, path.display());
        self.skipped.push(path);
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{} {}", status::WARN, message);
        self.warnings.push(message);
    }
}

impl StaticAssetStager {
    /// Create a new stager.
    pub fn new(config: StageConfig) -> Self {
        Self { config }
    }

    /// Stage into the configured output directory.
    pub fn stage(&self) -> Result<StageReport, StageError> {
        self.stage_into(&self.config.resolved_output())
    }

    /// Stage into `output_dir`, overriding the configured one.
    pub fn stage_into(&self, output_dir: &Path) -> Result<StageReport, StageError> {
        ensure_directory(output_dir)?;

        let mut tally = Tally::default();

        self.copy_favicons(output_dir, &mut tally);
        self.copy_root_files(output_dir, &mut tally);

        if let Err(e) = sync_dir(output_dir) {
            tally.warn(format!("Failed to sync {}: {}", output_dir.display(), e));
        }

        // An empty output here means the build never produced anything.
        let listing = inspect_output(output_dir)?;

        tracing::info!(
            "{} Staged {} favicon files and {} root files into {}",
            status::OK,
            tally.favicons,
            tally.root_files,
            output_dir.display()
        );

        Ok(StageReport {
            favicons: tally.favicons,
            root_files: tally.root_files,
            skipped: tally.skipped,
            warnings: tally.warnings,
            listing,
        })
    }

    /// Copy every regular file at the top of the favicon directory.
    fn copy_favicons(&self, output_dir: &Path, tally: &mut Tally) {
        let source = self.config.root.join(&self.config.favicon_dir);
        if !source.is_dir() {
            tally.skip(source, "Favicon directory");
            return;
        }

        let target = output_dir.join(&self.config.favicon_target);
        if let Err(e) = fs::create_dir_all(&target) {
            tally.warn(format!("Failed to create {}: {}", target.display(), e));
            return;
        }

        for entry in WalkDir::new(&source)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tally.warn(format!("Failed to read {}: {}", source.display(), e));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                tracing::debug!("Not a regular file, skipping: {}", entry.path().display());
                continue;
            }

            let dest = target.join(entry.file_name());
            match copy_durable(entry.path(), &dest) {
                Ok(_) => tally.favicons += 1,
                Err(e) => tally.warn(format!(
                    "Failed to copy {} to {}: {}",
                    entry.path().display(),
                    dest.display(),
                    e
                )),
            }
        }

        if let Err(e) = sync_dir(&target) {
            tally.warn(format!("Failed to sync {}: {}", target.display(), e));
        }

        tracing::info!(
            "{} Copied {} favicon files from {} to {}",
            status::OK,
            tally.favicons,
            source.display(),
            target.display()
        );
    }

    /// Copy each configured root file that exists.
    fn copy_root_files(&self, output_dir: &Path, tally: &mut Tally) {
        for name in &self.config.root_files {
            let source = self.config.root.join(name);
            if !source.is_file() {
                tally.skip(source, name);
                continue;
            }

            let dest = output_dir.join(name);
            match copy_durable(&source, &dest) {
                Ok(_) => {
                    tally.root_files += 1;
                    tracing::info!("{} Copied {}", status::OK, name);
                }
                Err(e) => tally.warn(format!("Failed to copy {}: {}", name, e)),
            }
        }
    }
}

impl BuildHook for StaticAssetStager {
    fn name(&self) -> &'static str {
        "static-asset-stager"
    }

    fn write_complete(&self, event: &WriteComplete) -> Result<(), HookError> {
        self.stage_into(&event.output_dir)?;
        Ok(())
    }
}

/// The stager never creates the output directory; it must already be built.
fn ensure_directory(path: &Path) -> Result<(), VerifyError> {
    match fs::metadata(path) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(VerifyError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VerifyError::Missing(path.to_path_buf()))
        }
        Err(source) => Err(VerifyError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
