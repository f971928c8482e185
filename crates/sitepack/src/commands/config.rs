//! Configuration file structure (sitepack.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};
use sitepack_static::{BuildConfig, EntryPoint, StageConfig};

/// Pages of the restaurant site, used when the config has no `[entries]`.
pub const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    ("main", "index.html"),
    ("about", "about.html"),
    ("menu", "menu.html"),
    ("contact", "contact.html"),
    ("reservation", "reservation.html"),
    ("private-dining", "private-dining.html"),
    ("wine", "wine.html"),
    ("privacy", "privacy.html"),
    ("terms", "terms.html"),
];

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteSettings,
    #[serde(default)]
    pub build: BuildSettings,
    /// Entry name -> source document, in declaration order
    #[serde(default, deserialize_with = "deserialize_entries")]
    pub entries: Option<Vec<(String, PathBuf)>>,
    #[serde(default)]
    pub stage: StageSettings,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteSettings {
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
    #[serde(default = "default_true")]
    pub minify: bool,
    #[serde(default = "default_true")]
    pub empty_out_dir: bool,
    #[serde(default)]
    pub manifest: bool,
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSettings {
    #[serde(default = "default_favicon_dir")]
    pub favicon_dir: PathBuf,
    #[serde(default = "default_favicon_target")]
    pub favicon_target: PathBuf,
    #[serde(default = "default_root_files")]
    pub root_files: Vec<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base: default_base(),
            output: default_output(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: true,
            empty_out_dir: true,
            manifest: false,
            public_dir: default_public_dir(),
        }
    }
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            favicon_dir: default_favicon_dir(),
            favicon_target: default_favicon_target(),
            root_files: default_root_files(),
        }
    }
}

fn default_base() -> String {
    "/".to_string()
}
fn default_output() -> PathBuf {
    PathBuf::from("dist")
}
fn default_true() -> bool {
    true
}
fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}
fn default_favicon_dir() -> PathBuf {
    PathBuf::from("public/favicon")
}
fn default_favicon_target() -> PathBuf {
    PathBuf::from("favicon")
}
fn default_root_files() -> Vec<String> {
    vec!["robots.txt".to_string(), "sitemap.xml".to_string()]
}

/// Read `[entries]` keeping the order the pages are written in.
///
/// `toml` is built with `preserve_order`, so the table iterates in
/// declaration order. Duplicate names are already a TOML parse error.
fn deserialize_entries<'de, D>(deserializer: D) -> Result<Option<Vec<(String, PathBuf)>>, D::Error>
where
    D: Deserializer<'de>,
{
    let table = toml::Table::deserialize(deserializer)?;
    let mut entries = Vec::with_capacity(table.len());
    for (name, value) in table {
        match value {
            toml::Value::String(source) => entries.push((name, PathBuf::from(source))),
            other => {
                return Err(de::Error::custom(format!(
                    "entry '{}' must be a path string, found {}",
                    name,
                    other.type_str()
                )));
            }
        }
    }
    Ok(Some(entries))
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

impl ConfigFile {
    /// Build settings for the orchestrator.
    pub fn build_config(&self, root: &Path, output: Option<PathBuf>) -> BuildConfig {
        let entries = match &self.entries {
            Some(entries) => entries
                .iter()
                .map(|(name, source)| EntryPoint::new(name.clone(), source.clone()))
                .collect(),
            None => DEFAULT_ENTRIES
                .iter()
                .map(|(name, source)| EntryPoint::new(*name, *source))
                .collect(),
        };

        BuildConfig {
            root: root.to_path_buf(),
            output_dir: output.unwrap_or_else(|| self.site.output.clone()),
            base_url: self.site.base.clone(),
            minify: self.build.minify,
            empty_out_dir: self.build.empty_out_dir,
            manifest: self.build.manifest,
            public_dir: self.build.public_dir.clone(),
            entries,
        }
    }

    /// Settings for the static asset stager.
    pub fn stage_config(&self, root: &Path, output: Option<PathBuf>) -> StageConfig {
        StageConfig {
            root: root.to_path_buf(),
            output_dir: output.unwrap_or_else(|| self.site.output.clone()),
            favicon_dir: self.stage.favicon_dir.clone(),
            favicon_target: self.stage.favicon_target.clone(),
            root_files: self.stage.root_files.clone(),
        }
    }

    /// Output directory resolved against the root.
    pub fn output_dir(&self, root: &Path, output: Option<PathBuf>) -> PathBuf {
        root.join(output.unwrap_or_else(|| self.site.output.clone()))
    }
}
