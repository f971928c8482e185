//! Asset pipeline for stylesheets, scripts and static files referenced by pages.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Number of hex characters of the content hash kept in file names.
const HASH_LEN: usize = 8;

/// How a referenced file is processed on its way into `assets/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// CSS, minified with lightningcss
    Style,
    /// JavaScript, minified with oxc
    Script,
    /// Anything else (images, fonts), copied as-is
    Static,
}

impl AssetKind {
    /// Classify a referenced path by extension.
    ///
    /// Returns `None` for documents and extensionless paths, which are links
    /// rather than assets.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "css" => Some(Self::Style),
            "js" | "mjs" => Some(Self::Script),
            "html" | "htm" => None,
            _ => Some(Self::Static),
        }
    }
}

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Process an asset's bytes for output.
    ///
    /// Minification failures are logged and the original bytes kept; a
    /// stylesheet that lightningcss rejects still ships.
    pub fn process(kind: AssetKind, source: &Path, bytes: Vec<u8>, minify: bool) -> Vec<u8> {
        if !minify || kind == AssetKind::Static {
            return bytes;
        }

        let Ok(text) = String::from_utf8(bytes.clone()) else {
            tracing::warn!("Not valid UTF-8, copying unminified: {}", source.display());
            return bytes;
        };

        let minified = match kind {
            AssetKind::Style => Self::minify_css(&text),
            AssetKind::Script => Self::minify_js(&text),
            AssetKind::Static => return bytes,
        };

        match minified {
            Ok(code) => code.into_bytes(),
            Err(e) => {
                tracing::warn!("{}: {}", source.display(), e);
                bytes
            }
        }
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Minify JavaScript by reprinting the oxc AST in compact form.
    pub fn minify_js(js: &str) -> Result<String, String> {
        use oxc_allocator::Allocator;
        use oxc_codegen::{Codegen, CodegenOptions};
        use oxc_parser::Parser;
        use oxc_span::SourceType;

        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, js, SourceType::mjs()).parse();

        if parsed.panicked || !parsed.errors.is_empty() {
            return Err(format!(
                "JS parse error ({} diagnostics)",
                parsed.errors.len().max(1)
            ));
        }

        let printed = Codegen::new()
            .with_options(CodegenOptions::minify())
            .build(&parsed.program);

        Ok(printed.code)
    }

    /// Short content hash used for cache-busting file names.
    pub fn content_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = format!("{:x}", hasher.finalize());
        digest[..HASH_LEN].to_string()
    }

    /// `app.css` + `1a2b3c4d` -> `app-1a2b3c4d.css`.
    pub fn hashed_name(source: &Path, hash: &str) -> String {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("asset");

        match source.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}-{}.{}", stem, hash, ext),
            None => format!("{}-{}", stem, hash),
        }
    }
}
