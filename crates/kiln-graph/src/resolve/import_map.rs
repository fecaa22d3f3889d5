//! Import map parsing and specifier remapping.

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use super::{ResolveError, parse_url_like};

/// Errors raised while loading an import map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportMapError {
    #[error("Invalid import map JSON: {0}")]
    Json(String),

    #[error("Import map target for '{key}' must be a URL or relative path, got '{target}'")]
    InvalidTarget { key: String, target: String },

    #[error("Import map key '{key}' ends with '/' but its target '{target}' does not")]
    PrefixMismatch { key: String, target: String },

    #[error("Invalid import map scope '{0}'")]
    InvalidScope(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawImportMap {
    #[serde(default)]
    imports: IndexMap<String, String>,
    #[serde(default)]
    scopes: IndexMap<String, IndexMap<String, String>>,
}

/// Sorted specifier table. Keys are kept in descending code-unit order so
/// the first prefix hit is the longest one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SpecifierMap {
    entries: Vec<(String, Url)>,
}

impl SpecifierMap {
    fn parse(raw: IndexMap<String, String>, base: &Url) -> Result<Self, ImportMapError> {
        let mut entries = Vec::with_capacity(raw.len());
        for (key, target) in raw {
            let key = normalize_key(&key, base);
            let Some(Ok(target_url)) = parse_url_like(&target, base) else {
                return Err(ImportMapError::InvalidTarget { key, target });
            };
            if key.ends_with('/') && !target_url.as_str().ends_with('/') {
                return Err(ImportMapError::PrefixMismatch { key, target });
            }
            entries.push((key, target_url));
        }
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(Self { entries })
    }

    fn lookup(&self, normalized: &str) -> Option<Result<Url, ResolveError>> {
        for (key, target) in &self.entries {
            if key == normalized {
                return Some(Ok(target.clone()));
            }
            if key.ends_with('/') && normalized.starts_with(key.as_str()) {
                let rest = &normalized[key.len()..];
                let joined = target.join(rest).ok().filter(|url| url.as_str().starts_with(target.as_str()));
                return Some(joined.ok_or_else(|| ResolveError::InvalidMapping {
                    specifier: normalized.to_string(),
                    key: key.clone(),
                }));
            }
        }
        None
    }
}

/// A parsed import map with `imports` and `scopes`.
///
/// Keys and targets are normalized against the map's base URL at load time,
/// so lookups are plain string comparisons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    imports: SpecifierMap,
    scopes: Vec<(String, SpecifierMap)>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an import map document. Relative keys and targets resolve
    /// against `base` (usually the URL of the map file or the root dir).
    pub fn from_json(text: &str, base: &Url) -> Result<Self, ImportMapError> {
        let raw: RawImportMap =
            serde_json::from_str(text).map_err(|e| ImportMapError::Json(e.to_string()))?;

        let imports = SpecifierMap::parse(raw.imports, base)?;

        let mut scopes = Vec::with_capacity(raw.scopes.len());
        for (scope, map) in raw.scopes {
            let scope_url = base
                .join(&scope)
                .map_err(|_| ImportMapError::InvalidScope(scope.clone()))?;
            scopes.push((scope_url.to_string(), SpecifierMap::parse(map, base)?));
        }
        scopes.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(Self { imports, scopes })
    }

    pub fn is_empty(&self) -> bool {
        self.imports.entries.is_empty() && self.scopes.is_empty()
    }

    /// Look up a specifier as seen from `base`.
    ///
    /// `as_url` is the specifier already parsed as a URL when it is URL-like;
    /// those are matched by their absolute form. Returns `None` when no entry
    /// applies.
    pub(crate) fn lookup(
        &self,
        specifier: &str,
        as_url: Option<&Url>,
        base: &Url,
    ) -> Option<Result<Url, ResolveError>> {
        let normalized = as_url.map_or(specifier, Url::as_str);

        for (scope, map) in &self.scopes {
            let in_scope = base.as_str() == scope
                || (scope.ends_with('/') && base.as_str().starts_with(scope.as_str()));
            if in_scope {
                if let Some(found) = map.lookup(normalized) {
                    return Some(found);
                }
            }
        }

        self.imports.lookup(normalized)
    }
}

fn normalize_key(key: &str, base: &Url) -> String {
    match parse_url_like(key, base) {
        Some(Ok(url)) => url.to_string(),
        _ => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("file:///site/").unwrap()
    }

    #[test]
    fn test_exact_and_prefix_entries() {
        let map = ImportMap::from_json(
            r#"{"imports": {"preact": "./vendor/preact.js", "lib/": "./vendor/lib/"}}"#,
            &base(),
        )
        .unwrap();

        let hit = map.lookup("preact", None, &base()).unwrap().unwrap();
        assert_eq!(hit.as_str(), "file:///site/vendor/preact.js");

        let hit = map.lookup("lib/dom/index.js", None, &base()).unwrap().unwrap();
        assert_eq!(hit.as_str(), "file:///site/vendor/lib/dom/index.js");

        assert!(map.lookup("react", None, &base()).is_none());
    }

    #[test]
    fn test_longest_scope_wins() {
        let map = ImportMap::from_json(
            r#"{
                "imports": {"dep": "./dep-root.js"},
                "scopes": {
                    "/site/pages/": {"dep": "./dep-pages.js"},
                    "/site/pages/admin/": {"dep": "./dep-admin.js"}
                }
            }"#,
            &base(),
        )
        .unwrap();

        let admin = Url::parse("file:///site/pages/admin/panel.js").unwrap();
        let pages = Url::parse("file:///site/pages/home.js").unwrap();
        let other = Url::parse("file:///site/main.js").unwrap();

        let resolve = |from: &Url| map.lookup("dep", None, from).unwrap().unwrap().to_string();
        assert_eq!(resolve(&admin), "file:///site/dep-admin.js");
        assert_eq!(resolve(&pages), "file:///site/dep-pages.js");
        assert_eq!(resolve(&other), "file:///site/dep-root.js");
    }

    #[test]
    fn test_prefix_target_must_end_with_slash() {
        let err = ImportMap::from_json(r#"{"imports": {"lib/": "./vendor/lib"}}"#, &base())
            .unwrap_err();
        assert!(matches!(err, ImportMapError::PrefixMismatch { .. }));
    }

    #[test]
    fn test_bare_target_rejected() {
        let err = ImportMap::from_json(r#"{"imports": {"a": "b"}}"#, &base()).unwrap_err();
        assert!(matches!(err, ImportMapError::InvalidTarget { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = ImportMap::from_json("{", &base()).unwrap_err();
        assert!(matches!(err, ImportMapError::Json(_)));
    }
}
