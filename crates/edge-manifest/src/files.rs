//! Build output file classification.

/// Kind of resource named in a preload hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadKind {
    Module,
    Script,
    Style,
    Image,
    Font,
}

impl PreloadKind {
    /// Value of the `as` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module | Self::Script => "script",
            Self::Style => "style",
            Self::Image => "image",
            Self::Font => "font",
        }
    }
}

impl std::fmt::Display for PreloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => write!(f, "module"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

const CSS_EXTENSIONS: &[&str] = &["css", "postcss", "sass", "scss", "less", "stylus", "styl"];

/// Strip a trailing `?query` when the query contains no dot.
fn strip_version_query(file: &str) -> &str {
    match file.split_once('?') {
        Some((base, query)) if !query.is_empty() && !query.contains('.') => base,
        _ => file,
    }
}

/// Whether the last path segment carries an extension (`name.ext`).
fn has_extension(file: &str) -> bool {
    let segment = file.rsplit('/').next().unwrap_or(file);
    match segment.rfind('.') {
        Some(dot) => {
            let before = &segment[..dot];
            let after = &segment[dot + 1..];
            !after.is_empty() && before.chars().last().is_some_and(|c| c != '.')
        }
        None => false,
    }
}

fn has_suffix(file: &str, suffixes: &[&str]) -> bool {
    let base = strip_version_query(file);
    suffixes
        .iter()
        .any(|ext| base.len() > ext.len() && base.ends_with(ext) && base[..base.len() - ext.len()].ends_with('.'))
}

/// Whether a build output is a script (`.js`, `.cjs`, `.mjs` or no extension).
pub fn is_js(file: &str) -> bool {
    has_suffix(file, &["js", "cjs", "mjs"]) || !has_extension(file)
}

/// Whether a build output is an ES module (`.mjs` or no extension).
pub fn is_module(file: &str) -> bool {
    has_suffix(file, &["mjs"]) || !has_extension(file)
}

/// Whether a build output is a stylesheet.
pub fn is_css(file: &str) -> bool {
    has_suffix(file, CSS_EXTENSIONS)
}

/// Extension of a file, ignoring any query string.
pub fn file_extension(file: &str) -> &str {
    let base = file.split('?').next().unwrap_or(file);
    base.rsplit('.').next().unwrap_or_default()
}

/// Preload kind inferred from a file extension.
pub fn preload_kind(extension: &str) -> Option<PreloadKind> {
    match extension {
        "js" | "cjs" | "mjs" => Some(PreloadKind::Script),
        "css" => Some(PreloadKind::Style),
        ext if ["jpg", "jpeg", "png", "svg", "gif", "webp", "ico"].contains(&ext) => {
            Some(PreloadKind::Image)
        }
        ext if ["woff", "woff2", "ttf", "otf", "eot"].contains(&ext) => Some(PreloadKind::Font),
        _ => None,
    }
}

/// Normalize a public path so it can be prefixed to file names.
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
