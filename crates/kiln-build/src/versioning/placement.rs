//! Embedding versions into public URLs and output paths.
//!
//! Both functions are pure. Versions never live on the module graph; they
//! are applied to emitted bytes only.

use url::Url;

use crate::config::VersionPlacement;

/// `lazy.js` -> `lazy.js?v=1a2b3c4d` or `lazy-1a2b3c4d.js`.
///
/// Fragments stay at the end.
pub fn versioned_path(path: &str, version: &str, placement: VersionPlacement) -> String {
    let (path, fragment) = match path.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (path, None),
    };

    let mut versioned = match placement {
        VersionPlacement::Query => {
            let separator = if path.contains('?') { '&' } else { '?' };
            format!("{path}{separator}v={version}")
        }
        VersionPlacement::Filename => {
            let (path, query) = match path.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (path, None),
            };
            let mut renamed = insert_version(path, version);
            if let Some(query) = query {
                renamed.push('?');
                renamed.push_str(query);
            }
            renamed
        }
    };

    if let Some(fragment) = fragment {
        versioned.push('#');
        versioned.push_str(fragment);
    }
    versioned
}

/// Same as [`versioned_path`] for an absolute URL.
pub fn versioned_url(url: &Url, version: &str, placement: VersionPlacement) -> Url {
    let mut versioned = url.clone();
    match placement {
        VersionPlacement::Query => {
            let query = match url.query() {
                Some(query) if !query.is_empty() => format!("{query}&v={version}"),
                _ => format!("v={version}"),
            };
            versioned.set_query(Some(&query));
        }
        VersionPlacement::Filename => {
            versioned.set_path(&insert_version(url.path(), version));
        }
    }
    versioned
}

/// Insert `-version` before the last extension of the final path segment.
fn insert_version(path: &str, version: &str) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{version}.{ext}"),
        _ => format!("{file}-{version}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_placement() {
        assert_eq!(
            versioned_path("lazy.js", "1a2b3c4d", VersionPlacement::Query),
            "lazy.js?v=1a2b3c4d"
        );
        assert_eq!(
            versioned_path("./a.css?theme=dark#top", "ff", VersionPlacement::Query),
            "./a.css?theme=dark&v=ff#top"
        );
    }

    #[test]
    fn test_filename_placement() {
        assert_eq!(
            versioned_path("lazy.js", "1a2b3c4d", VersionPlacement::Filename),
            "lazy-1a2b3c4d.js"
        );
        assert_eq!(
            versioned_path("../assets/util.shared.js", "ab", VersionPlacement::Filename),
            "../assets/util.shared-ab.js"
        );
        assert_eq!(
            versioned_path("static/LICENSE", "ab", VersionPlacement::Filename),
            "static/LICENSE-ab"
        );
        assert_eq!(
            versioned_path(".htaccess", "ab", VersionPlacement::Filename),
            ".htaccess-ab"
        );
    }

    #[test]
    fn test_versioned_url() {
        let url = Url::parse("https://example.com/app/lazy.js").unwrap();
        assert_eq!(
            versioned_url(&url, "1a2b", VersionPlacement::Query).as_str(),
            "https://example.com/app/lazy.js?v=1a2b"
        );
        assert_eq!(
            versioned_url(&url, "1a2b", VersionPlacement::Filename).as_str(),
            "https://example.com/app/lazy-1a2b.js"
        );
    }
}
