//! Specifier resolution.
//!
//! Two rule sets apply depending on where a specifier came from:
//!
//! - [`ResolveMode::Module`]: JS `import`, `export ... from` and `import()`.
//!   Bare names go through the import map and fail when unmapped.
//! - [`ResolveMode::Url`]: HTML attributes, CSS `@import`/`url()` and
//!   `new URL(x, import.meta.url)`. Plain URL joining, where `icon.png`
//!   means `./icon.png`.
//!
//! Resolution is a pure function of its inputs.

pub mod import_map;
pub mod marker;

use std::path::Path;

use url::Url;

pub use import_map::{ImportMap, ImportMapError};
pub use marker::{Marker, attach_marker, strip_markers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveMode {
    Module,
    Url,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Unresolved bare specifier '{specifier}' imported from {base}")]
    UnresolvedBareSpecifier { specifier: String, base: Url },

    #[error("Invalid specifier '{specifier}' relative to {base}: {reason}")]
    InvalidUrl {
        specifier: String,
        base: Url,
        reason: String,
    },

    #[error("Import map entry '{key}' cannot remap '{specifier}' outside its target")]
    InvalidMapping { specifier: String, key: String },
}

/// Resolve `specifier` against `base`.
pub fn resolve(
    specifier: &str,
    base: &Url,
    import_map: Option<&ImportMap>,
    mode: ResolveMode,
) -> Result<Url, ResolveError> {
    let invalid = |reason: url::ParseError| ResolveError::InvalidUrl {
        specifier: specifier.to_string(),
        base: base.clone(),
        reason: reason.to_string(),
    };

    match mode {
        ResolveMode::Url => base.join(specifier).map_err(invalid),
        ResolveMode::Module => {
            let as_url = parse_url_like(specifier, base).transpose().map_err(invalid)?;

            if let Some(map) = import_map {
                if let Some(mapped) = map.lookup(specifier, as_url.as_ref(), base) {
                    return mapped;
                }
            }

            as_url.ok_or_else(|| ResolveError::UnresolvedBareSpecifier {
                specifier: specifier.to_string(),
                base: base.clone(),
            })
        }
    }
}

/// Parse a URL-like specifier (`/x`, `./x`, `../x` or an absolute URL).
///
/// Returns `None` for bare specifiers.
pub fn parse_url_like(specifier: &str, base: &Url) -> Option<Result<Url, url::ParseError>> {
    if specifier.starts_with('/') || specifier.starts_with("./") || specifier.starts_with("../")
    {
        return Some(base.join(specifier));
    }
    Url::parse(specifier).ok().map(Ok)
}

/// URLs outside the `file` scheme are never loaded.
pub fn is_external(url: &Url) -> bool {
    url.scheme() != "file"
}

/// Directory URL for a filesystem root. The trailing slash matters for joins.
pub fn directory_url(path: &Path) -> Option<Url> {
    Url::from_directory_path(path).ok()
}

/// Path of `url` relative to `root`, without query or fragment.
///
/// Falls back to the URL path when `url` lives outside `root`.
pub fn relative_path(root: &Url, url: &Url) -> String {
    let path = url.path();
    path.strip_prefix(root.path())
        .unwrap_or_else(|| path.trim_start_matches('/'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("file:///site/src/main.js").unwrap()
    }

    #[test]
    fn test_relative_module_specifier() {
        let url = resolve("./util.js", &base(), None, ResolveMode::Module).unwrap();
        assert_eq!(url.as_str(), "file:///site/src/util.js");

        let url = resolve("../lib/x.js?raw#a", &base(), None, ResolveMode::Module).unwrap();
        assert_eq!(url.as_str(), "file:///site/lib/x.js?raw#a");
    }

    #[test]
    fn test_bare_specifier_requires_import_map() {
        let err = resolve("preact", &base(), None, ResolveMode::Module).unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvedBareSpecifier { .. }));

        let map = ImportMap::from_json(
            r#"{"imports": {"preact": "/site/vendor/preact.js"}}"#,
            &Url::parse("file:///site/").unwrap(),
        )
        .unwrap();
        let url = resolve("preact", &base(), Some(&map), ResolveMode::Module).unwrap();
        assert_eq!(url.as_str(), "file:///site/vendor/preact.js");
    }

    #[test]
    fn test_import_map_remaps_url_like_specifiers() {
        let map = ImportMap::from_json(
            r#"{"imports": {"/site/src/old.js": "/site/src/new.js"}}"#,
            &Url::parse("file:///site/").unwrap(),
        )
        .unwrap();
        let url = resolve("./old.js", &base(), Some(&map), ResolveMode::Module).unwrap();
        assert_eq!(url.as_str(), "file:///site/src/new.js");
    }

    #[test]
    fn test_url_mode_treats_names_as_relative() {
        let url = resolve("icon.png", &base(), None, ResolveMode::Url).unwrap();
        assert_eq!(url.as_str(), "file:///site/src/icon.png");
    }

    #[test]
    fn test_external_urls() {
        let url = resolve("https://cdn.example/x.js", &base(), None, ResolveMode::Module).unwrap();
        assert!(is_external(&url));
        let url = resolve("data:image/png;base64,AA", &base(), None, ResolveMode::Url).unwrap();
        assert!(is_external(&url));
        assert!(!is_external(&base()));
    }

    #[test]
    fn test_relative_path() {
        let root = Url::parse("file:///site/").unwrap();
        let url = Url::parse("file:///site/src/a.js?v=1").unwrap();
        assert_eq!(relative_path(&root, &url), "src/a.js");
    }
}
