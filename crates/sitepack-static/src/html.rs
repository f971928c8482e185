//! HTML reference rewriting and whitespace minification.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::refs::{replace_quoted, rewrite_css_urls, Resolve};

/// `src`/`href` attributes with a double- or single-quoted value.
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?P<pre>\s(?:src|href)\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("Invalid reference regex")
});

/// Elements whose bodies are whitespace-sensitive or not HTML.
static RAW_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("Invalid raw block regex")
});

/// Regions whose contents are not markup attributes: comments and the
/// bodies of `<script>`, `<style>` and `<textarea>`.
static OPAQUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("Invalid opaque block regex")
});

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));

/// Rewrite every `src`/`href` attribute value through `resolve`.
///
/// `resolve` receives the raw value and returns the replacement, or `None`
/// to leave it as written. Quoting style is kept. Comments and script or
/// textarea bodies are never touched; the opening tags of those elements
/// are. Inline `<style>` bodies get their `url()` references rewritten.
pub fn rewrite_references(html: &str, resolve: &mut Resolve<'_>) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for block in OPAQUE_RE.find_iter(html) {
        out.push_str(&replace_quoted(&REFERENCE_RE, &html[last..block.start()], resolve));
        last = block.end();

        let block = block.as_str();
        if block.starts_with("<!--") {
            out.push_str(block);
            continue;
        }

        let tag_end = block.find('>').map_or(block.len(), |i| i + 1);
        let close_start = block.rfind("</").unwrap_or(block.len()).max(tag_end);
        let (open, rest) = block.split_at(tag_end);
        let (body, close) = rest.split_at(close_start - tag_end);

        out.push_str(&replace_quoted(&REFERENCE_RE, open, resolve));
        if open.len() > 6 && open[..6].eq_ignore_ascii_case("<style") {
            out.push_str(&rewrite_css_urls(body, resolve));
        } else {
            out.push_str(body);
        }
        out.push_str(close);
    }
    out.push_str(&replace_quoted(&REFERENCE_RE, &html[last..], resolve));

    out
}

/// Strip comments and collapse indentation and blank lines.
///
/// `<pre>`, `<textarea>`, `<script>` and `<style>` elements are copied
/// through untouched. Conditional comments (`<!--[if ...]>`) are kept.
pub fn minify_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for raw in RAW_BLOCK_RE.find_iter(html) {
        out.push_str(&collapse(&html[last..raw.start()], last > 0, true));
        out.push_str(raw.as_str());
        last = raw.end();
    }
    out.push_str(&collapse(&html[last..], last > 0, false));

    out
}

/// Minify a run of markup between raw blocks.
///
/// `after_raw` / `before_raw` keep a single newline where the run touches a
/// raw block and originally had whitespace there, so inline text does not
/// glue onto a neighbouring element.
fn collapse(segment: &str, after_raw: bool, before_raw: bool) -> String {
    let stripped: Cow<'_, str> = COMMENT_RE.replace_all(segment, |caps: &Captures| {
        if caps[0].starts_with("<!--[if") {
            caps[0].to_string()
        } else {
            String::new()
        }
    });

    let body = stripped
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if body.is_empty() {
        return if (after_raw || before_raw) && segment.chars().any(char::is_whitespace) {
            "\n".to_string()
        } else {
            String::new()
        };
    }

    let mut result = String::with_capacity(body.len() + 2);
    if after_raw && segment.starts_with(char::is_whitespace) {
        result.push('\n');
    }
    result.push_str(&body);
    if before_raw && segment.ends_with(char::is_whitespace) {
        result.push('\n');
    }
    result
}
