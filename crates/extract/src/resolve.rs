//! Canonical source paths.
//!
//! Every source is keyed by a slash-separated absolute path. Declared
//! references are resolved against the declaring file's directory and
//! normalized before they are stored, so that two dependency lists can be
//! compared with plain equality.

/// Normalizes a path into canonical absolute form.
///
/// Repeated slashes and `.` segments are dropped, `..` removes the previous
/// segment (and is ignored at the root), and the result always starts with
/// a single `/` and never ends with one (except the root itself).
///
/// ```
/// use livepkg_extract::canonicalize;
/// assert_eq!(canonicalize("ui//./beta/../main.js"), "/ui/main.js");
/// assert_eq!(canonicalize("/../main.js"), "/main.js");
/// assert_eq!(canonicalize(""), "/");
/// ```
pub fn canonicalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    let mut canonical = String::with_capacity(path.len() + 1);
    for segment in &segments {
        canonical.push('/');
        canonical.push_str(segment);
    }
    if canonical.is_empty() {
        canonical.push('/');
    }
    canonical
}

/// Directory portion of a canonical path (`/ui/main.js` → `/ui`).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

/// Resolves a declared reference into a canonical absolute path.
///
/// References starting with `/` are already absolute; anything else is
/// relative to the directory of `declaring`.
///
/// ```
/// use livepkg_extract::resolve;
/// assert_eq!(resolve("/ui/main.js", "alpha.js"), "/ui/alpha.js");
/// assert_eq!(resolve("/ui/beta/x.js", "../last.js"), "/ui/last.js");
/// assert_eq!(resolve("/ui/main.js", "/lib/x.js"), "/lib/x.js");
/// ```
pub fn resolve(declaring: &str, reference: &str) -> String {
    if reference.starts_with('/') {
        return canonicalize(reference);
    }
    canonicalize(&format!("{}/{}", parent(declaring), reference))
}

/// The kind of a source: extension of its final segment including the
/// leading dot, or an empty string when there is none.
///
/// ```
/// use livepkg_extract::kind_of;
/// assert_eq!(kind_of("/ui/main.js"), ".js");
/// assert_eq!(kind_of("/ui/v1.2/README"), "");
/// ```
pub fn kind_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(index) => &name[index..],
        None => "",
    }
}
