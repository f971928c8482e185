//! Locating and rewriting file references inside HTML attributes, CSS and JS.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Callback deciding the replacement for a reference, or `None` to keep it.
pub type Resolve<'a> = dyn FnMut(&str) -> Option<String> + 'a;

/// `url(...)` in any of its three quoting forms.
static CSS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?P<pre>url\(\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^'"()\s]+))(?P<post>\s*\))"#,
    )
    .expect("Invalid CSS url regex")
});

/// `@import "x.css"` (the `url()` form is covered by [`CSS_URL_RE`]).
static CSS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?P<pre>@import\s+)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("Invalid CSS import regex")
});

/// Static `import`/`export ... from` specifiers and `import("...")`.
static JS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<pre>\b(?:from|import)\s*\(?\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("Invalid JS import regex")
});

/// Schemes and prefixes that never point at a file in the project.
const EXTERNAL_PREFIXES: &[&str] = &[
    "http:", "https:", "//", "data:", "mailto:", "tel:", "javascript:", "#",
];

/// Whether a reference names a file inside the project.
pub fn is_local_reference(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    !lower.is_empty() && !EXTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Whether a JS module specifier is a path rather than a package name.
pub fn is_relative_specifier(value: &str) -> bool {
    value.starts_with("./") || value.starts_with("../") || value.starts_with('/')
}

/// Split `css/app.css?v=2#x` into `("css/app.css", "?v=2#x")`.
pub fn split_suffix(value: &str) -> (&str, &str) {
    match value.find(['?', '#']) {
        Some(i) => value.split_at(i),
        None => (value, ""),
    }
}

/// Replace every reference matched by `re`, keeping its quoting.
///
/// `re` must name the text before the value `pre`, the value itself `dq`,
/// `sq` or `bare`, and may name trailing text `post`.
pub(crate) fn replace_quoted(re: &Regex, text: &str, resolve: &mut Resolve<'_>) -> String {
    re.replace_all(text, |caps: &Captures| {
        let (value, quote) = if let Some(v) = caps.name("dq") {
            (v.as_str(), "\"")
        } else if let Some(v) = caps.name("sq") {
            (v.as_str(), "'")
        } else if let Some(v) = caps.name("bare") {
            (v.as_str(), "")
        } else {
            return caps[0].to_string();
        };

        match resolve(value) {
            Some(new_value) => format!(
                "{}{}{}{}{}",
                &caps["pre"],
                quote,
                new_value,
                quote,
                caps.name("post").map_or("", |m| m.as_str())
            ),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// Rewrite `url(...)` and `@import` references in a stylesheet.
pub fn rewrite_css_urls(css: &str, resolve: &mut Resolve<'_>) -> String {
    let css = replace_quoted(&CSS_URL_RE, css, resolve);
    replace_quoted(&CSS_IMPORT_RE, &css, resolve)
}

/// Rewrite module specifiers in a script.
pub fn rewrite_js_imports(js: &str, resolve: &mut Resolve<'_>) -> String {
    replace_quoted(&JS_IMPORT_RE, js, resolve)
}
