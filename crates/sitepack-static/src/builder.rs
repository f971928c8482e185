//! Multi-page site builder.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use crate::assets::{AssetKind, AssetPipeline};
use crate::hooks::{BuildHook, WriteComplete};
use crate::html::{minify_html, rewrite_references};
use crate::output::{clear_dir, sync_dir, write_durable};
use crate::refs::{
    is_local_reference, is_relative_specifier, rewrite_css_urls, rewrite_js_imports,
    split_suffix, Resolve,
};
use crate::status;

/// Directory under the output root that receives hashed assets.
pub const ASSETS_DIR: &str = "assets";

/// Manifest location relative to the output root.
pub const MANIFEST_PATH: &str = ".sitepack/manifest.json";

/// A named HTML document compiled into one output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Unique entry name (`main`, `menu`, ...)
    pub name: String,

    /// Source document, relative to the project root
    pub source: PathBuf,
}

impl EntryPoint {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Configuration for building a site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root; relative paths below are resolved against it
    pub root: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// URL prefix for emitted asset references: a path (`/bistro/`), an
    /// absolute URL (`https://cdn.example.com/`), or `./` for links
    /// relative to the referencing file
    pub base_url: String,

    /// Minify HTML/CSS/JS output
    pub minify: bool,

    /// Remove existing output contents before writing
    pub empty_out_dir: bool,

    /// Write `.sitepack/manifest.json`
    pub manifest: bool,

    /// Public directory; references into it are left for the stager
    pub public_dir: PathBuf,

    /// Entry points, in build order
    pub entries: Vec<EntryPoint>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_dir: PathBuf::from("dist"),
            base_url: "/".to_string(),
            minify: true,
            empty_out_dir: true,
            manifest: false,
            public_dir: PathBuf::from("public"),
            entries: vec![],
        }
    }
}

impl BuildConfig {
    /// Output directory resolved against the root.
    pub fn resolved_output(&self) -> PathBuf {
        self.root.join(&self.output_dir)
    }

    fn base(&self) -> Base {
        let base = self.base_url.trim();
        if base.is_empty() || base == "." || base == "./" {
            Base::Relative
        } else if base.contains("://") || base.starts_with("//") {
            let base = base.trim_end_matches('/');
            Base::Url(format!("{}/", base))
        } else {
            let trimmed = base.trim_matches('/');
            if trimmed.is_empty() {
                Base::Url("/".to_string())
            } else {
                Base::Url(format!("/{}/", trimmed))
            }
        }
    }
}

/// Prefix put in front of emitted asset paths.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Base {
    /// Site path or absolute URL, always ending in `/`
    Url(String),

    /// `./` or `../..` depending on where the referencing file lives
    Relative,
}

impl Base {
    /// Prefix for a file `depth` directories below the output root.
    fn prefix(&self, depth: usize) -> String {
        match self {
            Base::Url(url) => url.clone(),
            Base::Relative if depth == 0 => "./".to_string(),
            Base::Relative => "../".repeat(depth),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Base::Url(url) => url,
            Base::Relative => "./",
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of documents generated
    pub pages: usize,

    /// Number of hashed assets written
    pub assets: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No entry points configured")]
    NoEntries,

    #[error("Duplicate entry point name: {0}")]
    DuplicateEntry(String),

    #[error("Entry point '{name}' not found: {path}")]
    MissingEntry { name: String, path: PathBuf },

    #[error("Entry point '{name}' is outside the project root: {path}")]
    EntryOutsideRoot { name: String, path: PathBuf },

    #[error("Refusing to use {0} as output directory: it contains the project root")]
    UnsafeOutputDir(PathBuf),

    #[error("Failed to read {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Hook '{name}' failed: {message}")]
    Hook { name: &'static str, message: String },
}

/// Where a reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Document,
    Stylesheet,
    Script,
}

/// Reference rewriter for one kind of source text.
type Rewriter = for<'r> fn(&str, &mut Resolve<'r>) -> String;

/// Site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    hooks: Vec<Box<dyn BuildHook>>,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            hooks: Vec::new(),
        }
    }

    /// Register a hook to run once the output is durably written.
    pub fn with_hook(mut self, hook: Box<dyn BuildHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Build the site.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let output_dir = self.config.resolved_output();

        // Nothing touches the output until every entry is known to exist
        let sources = self.validate_entries()?;

        self.prepare_output(&output_dir)?;

        let mut compilation = Compilation::new(&self.config, &output_dir)?;
        let mut documents = Vec::with_capacity(sources.len());

        for (entry, source) in self.config.entries.iter().zip(&sources) {
            let document = compilation.build_page(entry, source)?;
            tracing::debug!("Built {} -> {}", entry.name, document.display());
            documents.push(document);
        }

        if self.config.manifest {
            compilation.write_manifest()?;
        }

        self.flush(&output_dir)?;

        let event = WriteComplete {
            output_dir: output_dir.clone(),
            documents,
        };

        for hook in &self.hooks {
            tracing::debug!("Running hook {}", hook.name());
            hook.write_complete(&event).map_err(|e| BuildError::Hook {
                name: hook.name(),
                message: e.to_string(),
            })?;
        }

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: event.documents.len(),
            assets: compilation.emitted.len(),
            duration_ms: duration.as_millis() as u64,
            output_dir,
        })
    }

    /// Check entry names are unique and every source document exists.
    ///
    /// Returns the resolved source paths in entry order.
    fn validate_entries(&self) -> Result<Vec<PathBuf>, BuildError> {
        if self.config.entries.is_empty() {
            return Err(BuildError::NoEntries);
        }

        let mut names = HashSet::new();
        let mut sources = Vec::with_capacity(self.config.entries.len());

        for entry in &self.config.entries {
            if !names.insert(entry.name.as_str()) {
                return Err(BuildError::DuplicateEntry(entry.name.clone()));
            }

            if !is_contained(&entry.source) {
                return Err(BuildError::EntryOutsideRoot {
                    name: entry.name.clone(),
                    path: entry.source.clone(),
                });
            }

            let source = self.config.root.join(&entry.source);
            if !source.is_file() {
                return Err(BuildError::MissingEntry {
                    name: entry.name.clone(),
                    path: source,
                });
            }

            sources.push(source);
        }

        Ok(sources)
    }

    /// Create the output directory, clearing it first when configured.
    fn prepare_output(&self, output_dir: &Path) -> Result<(), BuildError> {
        if output_dir.exists() {
            let root = fs::canonicalize(&self.config.root)
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
            let out = fs::canonicalize(output_dir)
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
            if root.starts_with(&out) {
                return Err(BuildError::UnsafeOutputDir(output_dir.to_path_buf()));
            }

            if self.config.empty_out_dir && out.is_dir() {
                let removed =
                    clear_dir(&out).map_err(|e| BuildError::WriteError(e.to_string()))?;
                tracing::debug!("Removed {} entries from {}", removed, out.display());
            }
        }

        fs::create_dir_all(output_dir).map_err(|e| BuildError::WriteError(e.to_string()))
    }

    /// Durability barrier: fsync every directory of the output tree.
    ///
    /// Files are already fsynced as they are written.
    fn flush(&self, output_dir: &Path) -> Result<(), BuildError> {
        let dirs = output_dirs(output_dir)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", output_dir.display(), e)))?;

        for dir in &dirs {
            sync_dir(dir).map_err(|e| BuildError::WriteError(format!("{}: {}", dir.display(), e)))?;
        }

        tracing::debug!("Synced {} output directories", dirs.len());
        Ok(())
    }
}

/// State of one build: the assets emitted so far and where they go.
struct Compilation<'a> {
    config: &'a BuildConfig,

    /// Canonical project root; only files below it are compiled
    root: PathBuf,

    output_dir: &'a Path,
    base: Base,

    /// Canonical source path -> path relative to the output root
    emitted: HashMap<PathBuf, String>,

    /// Stylesheets and scripts whose own references are being resolved
    in_progress: HashSet<PathBuf>,
}

impl<'a> Compilation<'a> {
    fn new(config: &'a BuildConfig, output_dir: &'a Path) -> Result<Self, BuildError> {
        let root = fs::canonicalize(&config.root).map_err(|e| BuildError::ReadError {
            path: config.root.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            config,
            root,
            output_dir,
            base: config.base(),
            emitted: HashMap::new(),
            in_progress: HashSet::new(),
        })
    }

    /// Build a single page.
    fn build_page(&mut self, entry: &EntryPoint, source: &Path) -> Result<PathBuf, BuildError> {
        let html = fs::read_to_string(source).map_err(|e| BuildError::ReadError {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

        let config = self.config;
        let page_dir = source.parent().unwrap_or(&config.root);
        let depth = nesting(&entry.source).unwrap_or(0);
        let html = self.rewrite(&html, rewrite_references, page_dir, Origin::Document, depth)?;

        let html = if config.minify {
            minify_html(&html)
        } else {
            html
        };

        let document = self.output_dir.join(&entry.source);
        write_durable(&document, html.as_bytes())
            .map_err(|e| BuildError::WriteError(format!("{}: {}", document.display(), e)))?;

        Ok(document)
    }

    /// Run `rewriter` over `text`, emitting every local file it references.
    ///
    /// `depth` is how far below the output root the rewritten file lands.
    fn rewrite(
        &mut self,
        text: &str,
        rewriter: Rewriter,
        from_dir: &Path,
        origin: Origin,
        depth: usize,
    ) -> Result<String, BuildError> {
        let prefix = self.base.prefix(depth);

        let mut failure = None;
        let rewritten = rewriter(text, &mut |value: &str| {
            if failure.is_some() {
                return None;
            }
            match self.resolve_reference(value, from_dir, origin) {
                Ok(Some(emitted)) => Some(format!("{}{}", prefix, emitted)),
                Ok(None) => None,
                Err(e) => {
                    failure = Some(e);
                    None
                }
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(rewritten),
        }
    }

    /// Emit the asset a reference points at.
    ///
    /// Returns the emitted path relative to the output root (with any query
    /// or fragment re-attached), or `None` when the value should be left as
    /// written. Missing files, files outside the root and circular
    /// references are warnings, not errors.
    fn resolve_reference(
        &mut self,
        value: &str,
        from_dir: &Path,
        origin: Origin,
    ) -> Result<Option<String>, BuildError> {
        if !is_local_reference(value) {
            return Ok(None);
        }

        let value = value.trim();
        if origin == Origin::Script && !is_relative_specifier(value) {
            tracing::warn!(
                "{} Bare module specifier left for the browser to resolve: {}",
                status::WARN,
                value
            );
            return Ok(None);
        }

        let (path, suffix) = split_suffix(value);
        let Some(kind) = AssetKind::from_path(Path::new(path)) else {
            return Ok(None);
        };

        let source = match path.strip_prefix('/') {
            Some(absolute) => self.root.join(absolute),
            None => from_dir.join(path),
        };

        if !source.is_file() {
            let public = self.config.root.join(&self.config.public_dir);
            let public_copy = public.join(path.trim_start_matches('/'));
            if origin == Origin::Document && public_copy.is_file() {
                tracing::debug!("Leaving public reference for staging: {}", value);
            } else {
                tracing::warn!(
                    "{} Referenced file not found, leaving as is: {} ({})",
                    status::WARN,
                    value,
                    source.display()
                );
            }
            return Ok(None);
        }

        let source = fs::canonicalize(&source).map_err(|e| BuildError::ReadError {
            path: source.clone(),
            message: e.to_string(),
        })?;
        if !source.starts_with(&self.root) {
            tracing::warn!(
                "{} Reference points outside the project root, leaving as is: {}",
                status::WARN,
                value
            );
            return Ok(None);
        }

        if let Some(emitted) = self.emitted.get(&source) {
            return Ok(Some(format!("{}{}", emitted, suffix)));
        }

        if !self.in_progress.insert(source.clone()) {
            tracing::warn!(
                "{} Circular reference, leaving as is: {} ({})",
                status::WARN,
                value,
                source.display()
            );
            return Ok(None);
        }
        let emitted = self.emit_asset(kind, &source);
        self.in_progress.remove(&source);

        Ok(Some(format!("{}{}", emitted?, suffix)))
    }

    /// Process, hash and write one asset; `source` is canonical.
    fn emit_asset(&mut self, kind: AssetKind, source: &Path) -> Result<String, BuildError> {
        let bytes = fs::read(source).map_err(|e| BuildError::ReadError {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        let processed = AssetPipeline::process(kind, source, bytes, self.config.minify);

        // Nested references change the content, so they go in before hashing
        let processed = match kind {
            AssetKind::Style | AssetKind::Script => self.rewrite_nested(kind, source, processed)?,
            AssetKind::Static => processed,
        };

        let hash = AssetPipeline::content_hash(&processed);
        let emitted = format!("{}/{}", ASSETS_DIR, AssetPipeline::hashed_name(source, &hash));

        write_durable(&self.output_dir.join(&emitted), &processed)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", emitted, e)))?;

        tracing::debug!("Emitted {} -> {}", source.display(), emitted);
        self.emitted.insert(source.to_path_buf(), emitted.clone());

        Ok(emitted)
    }

    /// Rewrite `url()`/`@import` in stylesheets and module specifiers in
    /// scripts, relative to the asset's own directory.
    fn rewrite_nested(
        &mut self,
        kind: AssetKind,
        source: &Path,
        bytes: Vec<u8>,
    ) -> Result<Vec<u8>, BuildError> {
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "{} {} is not UTF-8, references inside it are left as is",
                    status::WARN,
                    source.display()
                );
                return Ok(e.into_bytes());
            }
        };

        let from_dir = source.parent().unwrap_or(&self.root).to_path_buf();
        // Hashed assets all land in `assets/`, one level below the root
        let rewritten = match kind {
            AssetKind::Style => {
                self.rewrite(&text, rewrite_css_urls, &from_dir, Origin::Stylesheet, 1)?
            }
            _ => self.rewrite(&text, rewrite_js_imports, &from_dir, Origin::Script, 1)?,
        };

        Ok(rewritten.into_bytes())
    }

    /// Write the entry and asset manifest.
    fn write_manifest(&self) -> Result<(), BuildError> {
        let entries: BTreeMap<&str, String> = self
            .config
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.source.display().to_string()))
            .collect();

        let assets: BTreeMap<String, &str> = self
            .emitted
            .iter()
            .map(|(source, emitted)| {
                let key = source
                    .strip_prefix(&self.root)
                    .unwrap_or(source)
                    .display()
                    .to_string();
                (key, emitted.as_str())
            })
            .collect();

        let manifest = serde_json::json!({
            "base": self.base.as_str(),
            "entries": entries,
            "assets": assets,
        });

        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        write_durable(&self.output_dir.join(MANIFEST_PATH), json.as_bytes())
            .map_err(|e| BuildError::WriteError(e.to_string()))
    }
}

/// Every directory of the output tree, deepest first, the root last.
fn output_dirs(output_dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(output_dir).contents_first(true) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Number of directories a relative path descends through before its file
/// name, or `None` when it escapes the directory it is joined to.
fn nesting(path: &Path) -> Option<usize> {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1)?,
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    depth.checked_sub(1)
}

/// Whether a relative path stays inside the directory it is joined to.
fn is_contained(path: &Path) -> bool {
    nesting(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    use crate::hooks::HookError;

    const PAGES: &[(&str, &str)] = &[
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

    fn site() -> TempDir {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("js")).unwrap();
        fs::write(root.join("css/style.css"), ".menu {\n  color: red;\n}\n").unwrap();
        fs::write(
            root.join("js/main.js"),
            "const items = ['soup', 'salad'];\nconsole.log(items.length);\n",
        )
        .unwrap();

        for (name, file) in PAGES {
            fs::write(
                root.join(file),
                format!(
                    "<!DOCTYPE html>\n<html>\n  <head>\n    <!-- {name} -->\n    <link rel=\"stylesheet\" href=\"css/style.css\">\n  </head>\n  <body>\n    <h1>{name}</h1>\n    <a href=\"menu.html\">Menu</a>\n    <script type=\"module\" src=\"/js/main.js\"></script>\n  </body>\n</html>\n"
                ),
            )
            .unwrap();
        }

        temp
    }

    fn config_for(root: &Path) -> BuildConfig {
        BuildConfig {
            root: root.to_path_buf(),
            entries: PAGES
                .iter()
                .map(|(name, file)| EntryPoint::new(*name, *file))
                .collect(),
            ..Default::default()
        }
    }

    fn html_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".html"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn builds_one_document_per_entry() {
        let temp = site();

        let result = SiteBuilder::new(config_for(temp.path())).build().unwrap();

        assert_eq!(result.pages, PAGES.len());
        let mut expected: Vec<String> = PAGES.iter().map(|(_, f)| f.to_string()).collect();
        expected.sort();
        assert_eq!(html_files(&temp.path().join("dist")), expected);
    }

    #[test]
    fn hashes_shared_assets_once() {
        let temp = site();

        let result = SiteBuilder::new(config_for(temp.path())).build().unwrap();

        assert_eq!(result.assets, 2);
        let assets: Vec<String> = fs::read_dir(temp.path().join("dist/assets"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().any(|a| a.starts_with("style-") && a.ends_with(".css")));
        assert!(assets.iter().any(|a| a.starts_with("main-") && a.ends_with(".js")));
    }

    #[test]
    fn rewrites_references_and_minifies() {
        let temp = site();

        SiteBuilder::new(config_for(temp.path())).build().unwrap();

        let html = fs::read_to_string(temp.path().join("dist/menu.html")).unwrap();
        assert!(html.contains("href=\"/assets/style-"));
        assert!(html.contains("src=\"/assets/main-"));
        assert!(html.contains("href=\"menu.html\""));
        assert!(!html.contains("<!--"));
        assert!(!html.contains("\n  "));
    }

    #[test]
    fn keeps_markup_when_not_minifying() {
        let temp = site();
        let config = BuildConfig {
            minify: false,
            ..config_for(temp.path())
        };

        SiteBuilder::new(config).build().unwrap();

        let html = fs::read_to_string(temp.path().join("dist/wine.html")).unwrap();
        assert!(html.contains("<!-- wine -->"));
    }

    #[test]
    fn applies_base_url() {
        let temp = site();
        let config = BuildConfig {
            base_url: "bistro".to_string(),
            ..config_for(temp.path())
        };

        SiteBuilder::new(config).build().unwrap();

        let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert!(html.contains("href=\"/bistro/assets/style-"));
    }

    #[test]
    fn missing_entry_is_fatal_and_writes_nothing() {
        let temp = site();
        fs::remove_file(temp.path().join("wine.html")).unwrap();

        let result = SiteBuilder::new(config_for(temp.path())).build();

        assert!(matches!(
            result,
            Err(BuildError::MissingEntry { ref name, .. }) if name == "wine"
        ));
        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn rejects_duplicate_entry_names() {
        let temp = site();
        let mut config = config_for(temp.path());
        config.entries.push(EntryPoint::new("menu", "about.html"));

        let result = SiteBuilder::new(config).build();

        assert!(matches!(result, Err(BuildError::DuplicateEntry(ref n)) if n == "menu"));
    }

    #[test]
    fn rejects_entries_outside_root() {
        let temp = site();
        let config = BuildConfig {
            entries: vec![EntryPoint::new("escape", "../index.html")],
            ..config_for(temp.path())
        };

        let result = SiteBuilder::new(config).build();

        assert!(matches!(result, Err(BuildError::EntryOutsideRoot { .. })));
    }

    #[test]
    fn rejects_empty_entry_set() {
        let temp = site();
        let config = BuildConfig {
            entries: vec![],
            ..config_for(temp.path())
        };

        assert!(matches!(
            SiteBuilder::new(config).build(),
            Err(BuildError::NoEntries)
        ));
    }

    #[test]
    fn refuses_root_as_output() {
        let temp = site();
        let config = BuildConfig {
            output_dir: PathBuf::from("."),
            ..config_for(temp.path())
        };

        let result = SiteBuilder::new(config).build();

        assert!(matches!(result, Err(BuildError::UnsafeOutputDir(_))));
        assert!(temp.path().join("index.html").exists());
    }

    #[test]
    fn clears_stale_output() {
        let temp = site();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/stale.html"), "old").unwrap();

        SiteBuilder::new(config_for(temp.path())).build().unwrap();

        assert!(!temp.path().join("dist/stale.html").exists());
    }

    #[test]
    fn keeps_stale_output_when_not_emptying() {
        let temp = site();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/stale.html"), "old").unwrap();
        let config = BuildConfig {
            empty_out_dir: false,
            ..config_for(temp.path())
        };

        SiteBuilder::new(config).build().unwrap();

        assert!(temp.path().join("dist/stale.html").exists());
    }

    #[test]
    fn missing_asset_is_only_a_warning() {
        let temp = site();
        fs::remove_file(temp.path().join("css/style.css")).unwrap();

        let result = SiteBuilder::new(config_for(temp.path())).build().unwrap();

        assert_eq!(result.assets, 1);
        let html = fs::read_to_string(temp.path().join("dist/about.html")).unwrap();
        assert!(html.contains("href=\"css/style.css\""));
    }

    #[test]
    fn writes_manifest_when_enabled() {
        let temp = site();
        let config = BuildConfig {
            manifest: true,
            ..config_for(temp.path())
        };

        SiteBuilder::new(config).build().unwrap();

        let manifest: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(temp.path().join("dist").join(MANIFEST_PATH)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["entries"]["main"], "index.html");
        assert!(manifest["assets"]["css/style.css"]
            .as_str()
            .unwrap()
            .starts_with("assets/style-"));
    }

    struct CountingHook {
        calls: Arc<AtomicUsize>,
        seen_pages: Arc<AtomicUsize>,
    }

    impl BuildHook for CountingHook {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn write_complete(&self, event: &WriteComplete) -> Result<(), HookError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let present = event.documents.iter().filter(|d| d.is_file()).count();
            self.seen_pages.store(present, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn hooks_run_once_after_all_documents_exist() {
        let temp = site();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen_pages = Arc::new(AtomicUsize::new(0));

        SiteBuilder::new(config_for(temp.path()))
            .with_hook(Box::new(CountingHook {
                calls: Arc::clone(&calls),
                seen_pages: Arc::clone(&seen_pages),
            }))
            .build()
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen_pages.load(Ordering::SeqCst), PAGES.len());
    }

    struct FailingHook;

    impl BuildHook for FailingHook {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn write_complete(&self, _event: &WriteComplete) -> Result<(), HookError> {
            Err("output unusable".into())
        }
    }

    #[test]
    fn hook_failure_fails_build() {
        let temp = site();

        let result = SiteBuilder::new(config_for(temp.path()))
            .with_hook(Box::new(FailingHook))
            .build();

        assert!(matches!(result, Err(BuildError::Hook { name: "failing", .. })));
    }

    #[test]
    fn containment_check() {
        assert!(is_contained(Path::new("index.html")));
        assert!(is_contained(Path::new("pages/../menu.html")));
        assert!(!is_contained(Path::new("../menu.html")));
        assert!(!is_contained(Path::new("/etc/passwd")));
        assert!(!is_contained(Path::new(".")));
    }

    #[test]
    fn nesting_counts_directories() {
        assert_eq!(nesting(Path::new("index.html")), Some(0));
        assert_eq!(nesting(Path::new("events/tasting.html")), Some(1));
        assert_eq!(nesting(Path::new("./events/../menu.html")), Some(0));
        assert_eq!(nesting(Path::new("events/..")), None);
    }

    fn asset_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn find_asset(names: &[String], stem: &str, ext: &str) -> String {
        names
            .iter()
            .find(|n| n.starts_with(&format!("{stem}-")) && n.ends_with(ext))
            .unwrap_or_else(|| panic!("no {stem}-*{ext} in {names:?}"))
            .clone()
    }

    #[test]
    fn emits_files_referenced_from_stylesheets_and_scripts() {
        let temp = site();
        let root = temp.path();
        fs::create_dir_all(root.join("img")).unwrap();
        fs::write(root.join("img/hero.jpg"), [0xFFu8, 0xD8, 0xFF, 0xE0]).unwrap();
        fs::write(
            root.join("css/style.css"),
            ".hero {\n  background: url(../img/hero.jpg);\n}\n",
        )
        .unwrap();
        fs::write(root.join("js/menu.js"), "export const n = 3;\n").unwrap();
        fs::write(
            root.join("js/main.js"),
            "import { n } from './menu.js';\nconsole.log(n);\n",
        )
        .unwrap();

        let result = SiteBuilder::new(config_for(root)).build().unwrap();

        assert_eq!(result.assets, 4);
        let assets_dir = root.join("dist/assets");
        let names = asset_names(&assets_dir);
        let hero = find_asset(&names, "hero", ".jpg");
        let menu = find_asset(&names, "menu", ".js");

        assert_eq!(
            fs::read(assets_dir.join(&hero)).unwrap(),
            vec![0xFFu8, 0xD8, 0xFF, 0xE0]
        );

        let css = fs::read_to_string(assets_dir.join(find_asset(&names, "style", ".css"))).unwrap();
        assert!(css.contains(&format!("/assets/{hero}")), "{css}");
        assert!(!css.contains("../img/hero.jpg"));

        let js = fs::read_to_string(assets_dir.join(find_asset(&names, "main", ".js"))).unwrap();
        assert!(js.contains(&format!("/assets/{menu}")), "{js}");
        assert!(!js.contains("./menu.js"));
    }

    #[test]
    fn nested_hashes_follow_referenced_content() {
        let temp = site();
        let root = temp.path();
        fs::create_dir_all(root.join("img")).unwrap();
        fs::write(root.join("img/hero.jpg"), [1u8]).unwrap();
        fs::write(root.join("css/style.css"), ".hero{background:url(../img/hero.jpg)}").unwrap();

        SiteBuilder::new(config_for(root)).build().unwrap();
        let before = find_asset(&asset_names(&root.join("dist/assets")), "style", ".css");

        fs::write(root.join("img/hero.jpg"), [2u8]).unwrap();
        SiteBuilder::new(config_for(root)).build().unwrap();
        let after = find_asset(&asset_names(&root.join("dist/assets")), "style", ".css");

        assert_ne!(before, after);
    }

    #[test]
    fn circular_stylesheet_imports_terminate() {
        let temp = site();
        let root = temp.path();
        fs::write(root.join("css/style.css"), "@import \"theme.css\";\n.a { color: red; }\n").unwrap();
        fs::write(root.join("css/theme.css"), "@import \"style.css\";\n.b { color: blue; }\n").unwrap();
        let config = BuildConfig {
            minify: false,
            ..config_for(root)
        };

        let result = SiteBuilder::new(config).build().unwrap();

        assert_eq!(result.assets, 3);
        let names = asset_names(&root.join("dist/assets"));
        let theme = fs::read_to_string(
            root.join("dist/assets").join(find_asset(&names, "theme", ".css")),
        )
        .unwrap();
        assert!(theme.contains("@import \"style.css\""));
    }

    #[test]
    fn bare_module_specifiers_are_left_alone() {
        let temp = site();
        fs::write(
            temp.path().join("js/main.js"),
            "import confetti from \"canvas-confetti\";\nconfetti();\n",
        )
        .unwrap();
        let config = BuildConfig {
            minify: false,
            ..config_for(temp.path())
        };

        let result = SiteBuilder::new(config).build().unwrap();

        assert_eq!(result.assets, 2);
        let names = asset_names(&temp.path().join("dist/assets"));
        let js = fs::read_to_string(
            temp.path().join("dist/assets").join(find_asset(&names, "main", ".js")),
        )
        .unwrap();
        assert!(js.contains("from \"canvas-confetti\""));
    }

    #[test]
    fn references_outside_the_root_are_not_published() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        fs::create_dir_all(&root).unwrap();
        fs::write(temp.path().join("secret.txt"), "kitchen safe code").unwrap();
        fs::write(
            root.join("index.html"),
            "<a href=\"../secret.txt\">Notes</a>\n<img src=\"/../secret.txt\">\n",
        )
        .unwrap();
        let config = BuildConfig {
            root: root.clone(),
            entries: vec![EntryPoint::new("main", "index.html")],
            ..Default::default()
        };

        let result = SiteBuilder::new(config).build().unwrap();

        assert_eq!(result.assets, 0);
        assert!(!root.join("dist").join(ASSETS_DIR).exists());
        let html = fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert!(html.contains("href=\"../secret.txt\""));
    }

    #[test]
    fn base_forms() {
        let base = |url: &str| {
            BuildConfig {
                base_url: url.to_string(),
                ..Default::default()
            }
            .base()
        };

        assert_eq!(base("/"), Base::Url("/".to_string()));
        assert_eq!(base("bistro"), Base::Url("/bistro/".to_string()));
        assert_eq!(base("/bistro/"), Base::Url("/bistro/".to_string()));
        assert_eq!(
            base("https://cdn.example.com"),
            Base::Url("https://cdn.example.com/".to_string())
        );
        assert_eq!(
            base("https://cdn.example.com/bistro/"),
            Base::Url("https://cdn.example.com/bistro/".to_string())
        );
        assert_eq!(
            base("//cdn.example.com"),
            Base::Url("//cdn.example.com/".to_string())
        );
        assert_eq!(base("./"), Base::Relative);
        assert_eq!(base(""), Base::Relative);

        assert_eq!(Base::Relative.prefix(0), "./");
        assert_eq!(Base::Relative.prefix(2), "../../");
    }

    #[test]
    fn passes_remote_base_through() {
        let temp = site();
        let config = BuildConfig {
            base_url: "https://cdn.example.com/".to_string(),
            ..config_for(temp.path())
        };

        SiteBuilder::new(config).build().unwrap();

        let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert!(html.contains("href=\"https://cdn.example.com/assets/style-"));
        assert!(html.contains("src=\"https://cdn.example.com/assets/main-"));
    }

    #[test]
    fn relative_base_follows_document_depth() {
        let temp = site();
        let root = temp.path();
        fs::create_dir_all(root.join("events")).unwrap();
        fs::write(
            root.join("events/tasting.html"),
            "<link rel=\"stylesheet\" href=\"../css/style.css\">\n",
        )
        .unwrap();
        let mut config = BuildConfig {
            base_url: "./".to_string(),
            ..config_for(root)
        };
        config
            .entries
            .push(EntryPoint::new("tasting", "events/tasting.html"));

        SiteBuilder::new(config).build().unwrap();

        let index = fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert!(index.contains("href=\"./assets/style-"));
        let tasting = fs::read_to_string(root.join("dist/events/tasting.html")).unwrap();
        assert!(tasting.contains("href=\"../assets/style-"));
    }

    #[test]
    fn barrier_covers_every_output_directory() {
        let temp = site();
        let config = BuildConfig {
            manifest: true,
            ..config_for(temp.path())
        };
        SiteBuilder::new(config).build().unwrap();
        let dist = temp.path().join("dist");

        let dirs = output_dirs(&dist).unwrap();

        assert!(dirs.contains(&dist.join(".sitepack")));
        assert!(dirs.contains(&dist.join(ASSETS_DIR)));
        assert_eq!(dirs.last(), Some(&dist));
    }
}
