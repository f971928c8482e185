//! Initialize sitepack in a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub fn run(root: &Path, config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing sitepack...");

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());

    let favicon_dir = root.join("public/favicon");
    if !favicon_dir.exists() {
        fs::create_dir_all(&favicon_dir).context("Failed to create public/favicon")?;
        tracing::info!("Created public/favicon/");
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sitepack build' to package the site.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# sitepack configuration

[site]
# URL prefix for emitted asset references
base = "/"

# Output directory for the packaged site
output = "dist"

[build]
# Minify HTML, CSS and JS
minify = true

# Remove previous output before building
empty_out_dir = true

# Write .sitepack/manifest.json
manifest = false

# References into this directory are left for staging
public_dir = "public"

[entries]
main = "index.html"
about = "about.html"
menu = "menu.html"
contact = "contact.html"
reservation = "reservation.html"
private-dining = "private-dining.html"
wine = "wine.html"
privacy = "privacy.html"
terms = "terms.html"

[stage]
# Icon files copied into <output>/favicon after the build
favicon_dir = "public/favicon"
favicon_target = "favicon"

# Optional files copied into the output root when present
root_files = ["robots.txt", "sitemap.xml"]
"#;
