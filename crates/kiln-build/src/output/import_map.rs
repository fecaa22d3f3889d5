use std::collections::BTreeMap;

use serde::Serialize;

/// Import map emitted next to the build output.
///
/// Keys are ordered so the JSON is identical across builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputImportMap {
    imports: BTreeMap<String, String>,
}

impl OutputImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// First mapping for a specifier wins.
    pub fn insert(&mut self, specifier: impl Into<String>, target: impl Into<String>) {
        self.imports.entry(specifier.into()).or_insert_with(|| target.into());
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.imports
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Add a `<script type="importmap">` right after `<head>`, before the
    /// first `<script>` when there is no head, or at the very start.
    pub fn inject_html(&self, html: &str) -> String {
        let json = serde_json::to_string(self)
            .unwrap_or_else(|_| "{}".to_string())
            .replace("</", "<\\/");
        let tag = format!("<script type=\"importmap\">{json}</script>");

        let lower = html.to_ascii_lowercase();
        let head_end = lower
            .match_indices("<head")
            .find(|(at, _)| {
                lower[at + 5..]
                    .chars()
                    .next()
                    .is_some_and(|c| c == '>' || c.is_ascii_whitespace())
            })
            .and_then(|(at, _)| lower[at..].find('>').map(|end| at + end + 1));

        match head_end.or_else(|| lower.find("<script")) {
            Some(at) if head_end.is_some() => format!("{}\n{}{}", &html[..at], tag, &html[at..]),
            Some(at) => format!("{}{}\n{}", &html[..at], tag, &html[at..]),
            None => format!("{tag}\n{html}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> OutputImportMap {
        let mut map = OutputImportMap::new();
        map.insert("/lazy.js", "/lazy.js?v=1a2b3c4d");
        map.insert("/lazy.js", "/ignored.js");
        map
    }

    #[test]
    fn test_json_is_ordered_and_first_wins() {
        let mut map = map();
        map.insert("/a.js", "/a.js?v=0");
        let json: serde_json::Value = serde_json::from_str(&map.to_json()).unwrap();
        assert_eq!(json["imports"]["/lazy.js"], "/lazy.js?v=1a2b3c4d");
        let keys: Vec<&String> = map.as_map().keys().collect();
        assert_eq!(keys, vec!["/a.js", "/lazy.js"]);
    }

    #[test]
    fn test_inject_after_head() {
        let html = "<!doctype html><HEAD lang=en><title>x</title></head>";
        let injected = map().inject_html(html);
        assert!(injected.starts_with("<!doctype html><HEAD lang=en>\n<script type=\"importmap\">"));
        assert!(injected.ends_with("</script><title>x</title></head>"));
    }

    #[test]
    fn test_inject_without_head() {
        let injected = map().inject_html("<p>hi</p><script src=a.js></script>");
        assert!(injected.starts_with("<p>hi</p><script type=\"importmap\">"));

        let injected = map().inject_html("<p>hi</p>");
        assert!(injected.starts_with("<script type=\"importmap\">"));
        assert!(injected.ends_with("\n<p>hi</p>"));

        // `<header>` is not `<head>`
        let injected = map().inject_html("<header></header><script></script>");
        assert!(injected.starts_with("<header></header><script type=\"importmap\">"));
    }
}
