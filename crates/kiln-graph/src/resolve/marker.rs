//! Synthetic query markers.
//!
//! An import with `with { type: "css" }` loads the same file as a
//! `<link rel=stylesheet>`, but as a different kind of module. The marker
//! keeps the two apart in the visited set. It is always the last query pair,
//! and stripping it restores the original URL exactly.

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    CssModule,
    JsonModule,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CssModule => "as_css_module",
            Self::JsonModule => "as_json_module",
        }
    }

    fn from_pair(pair: &str) -> Option<Self> {
        match pair {
            "as_css_module" => Some(Self::CssModule),
            "as_json_module" => Some(Self::JsonModule),
            _ => None,
        }
    }

    /// Marker for an import attribute `type` value.
    pub fn from_import_type(value: &str) -> Option<Self> {
        match value {
            "css" => Some(Self::CssModule),
            "json" => Some(Self::JsonModule),
            _ => None,
        }
    }
}

/// Append `marker` as the last query pair, replacing any existing marker.
pub fn attach_marker(url: &Url, marker: Marker) -> Url {
    let (mut url, _) = strip_markers(url);
    let query = match url.query() {
        Some(query) if !query.is_empty() => format!("{}&{}", query, marker.as_str()),
        _ => marker.as_str().to_string(),
    };
    url.set_query(Some(&query));
    url
}

/// Remove synthetic markers, returning the clean URL and the marker found.
pub fn strip_markers(url: &Url) -> (Url, Option<Marker>) {
    let Some(query) = url.query() else {
        return (url.clone(), None);
    };

    let mut marker = None;
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| match Marker::from_pair(pair) {
            Some(found) => {
                marker = Some(found);
                false
            }
            None => true,
        })
        .collect();

    let mut stripped = url.clone();
    if marker.is_some() {
        if kept.is_empty() {
            stripped.set_query(None);
        } else {
            stripped.set_query(Some(&kept.join("&")));
        }
    }
    (stripped, marker)
}
