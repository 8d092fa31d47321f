use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub const SCRIPT: &str = ".js";
pub const STYLE: &str = ".css";

/// Call-style declaration: `depends("path");` (single or double quotes).
pub const SCRIPT_PATTERN: &str = r#"depends\(\s*["']([^"']+)["']\s*\);?"#;
/// At-rule declaration: `@depends "path";`.
pub const STYLE_PATTERN: &str = r#"@depends\s+"([^"']+)"\s*;"#;

regex!(SCRIPT_REGEX, SCRIPT_PATTERN);
regex!(STYLE_REGEX, STYLE_PATTERN);

/// Kinds tracked as dependency-free leaves unless configured otherwise.
pub const LEAF_KINDS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp", ".woff", ".woff2", ".ttf", ".otf",
];

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

static CONTENT_TYPES: &[(&str, &str)] = &[
    (".css", "text/css; charset=utf-8"),
    (".gif", "image/gif"),
    (".htm", "text/html; charset=utf-8"),
    (".html", "text/html; charset=utf-8"),
    (".ico", "image/vnd.microsoft.icon"),
    (".jpeg", "image/jpeg"),
    (".jpg", "image/jpeg"),
    (".js", "text/javascript; charset=utf-8"),
    (".json", "application/json"),
    (".map", "application/json"),
    (".mjs", "text/javascript; charset=utf-8"),
    (".otf", "font/otf"),
    (".png", "image/png"),
    (".svg", "image/svg+xml"),
    (".ttf", "font/ttf"),
    (".txt", "text/plain; charset=utf-8"),
    (".wasm", "application/wasm"),
    (".webp", "image/webp"),
    (".woff", "font/woff"),
    (".woff2", "font/woff2"),
];

/// MIME type for a kind (extension including the leading dot), compared
/// case-insensitively.
pub fn content_type(kind: &str) -> Option<&'static str> {
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(kind))
        .map(|(_, mime)| *mime)
}
