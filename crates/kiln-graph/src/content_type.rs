use serde::{Deserialize, Serialize};
use url::Url;

use crate::resolve::marker::{Marker, strip_markers};

/// Detected content type of a module node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    JavaScript,
    Json,
    Css,
    Html,
    Svg,
    Image,
    Font,
    Wasm,
    Text,
    Unknown,
}

/// Groups content types that can share one concatenated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFamily {
    Script,
    Style,
    Document,
    Binary,
}

impl ContentType {
    /// Derive the content type from a file extension string.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "json" | "webmanifest" => Self::Json,
            "css" => Self::Css,
            "html" | "htm" => Self::Html,
            "svg" => Self::Svg,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "ico" | "bmp" => Self::Image,
            "woff" | "woff2" | "ttf" | "otf" | "eot" => Self::Font,
            "wasm" => Self::Wasm,
            "txt" | "md" | "xml" | "map" => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// Infer the content type from a URL's path extension.
    ///
    /// Synthetic markers take precedence over the extension, so
    /// `theme.txt?as_css_module` is CSS.
    pub fn from_url(url: &Url) -> Self {
        let (stripped, marker) = strip_markers(url);
        match marker {
            Some(Marker::CssModule) => return Self::Css,
            Some(Marker::JsonModule) => return Self::Json,
            None => {}
        }

        let path = stripped.path();
        let file_name = path.rsplit('/').next().unwrap_or(path);
        // Inline children carry their type after the last '.' as well
        file_name
            .rsplit_once('.')
            .map_or(Self::Unknown, |(_, ext)| Self::from_extension(ext))
    }

    pub fn family(&self) -> ContentFamily {
        match self {
            Self::JavaScript => ContentFamily::Script,
            Self::Css => ContentFamily::Style,
            Self::Html => ContentFamily::Document,
            _ => ContentFamily::Binary,
        }
    }

    /// True when references can be extracted from the content.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::JavaScript | Self::Json | Self::Css | Self::Html | Self::Svg | Self::Text
        )
    }

    /// Canonical extension used when naming synthetic children of this type.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::JavaScript => "js",
            Self::Json => "json",
            Self::Css => "css",
            Self::Html => "html",
            Self::Svg => "svg",
            Self::Image => "bin",
            Self::Font => "font",
            Self::Wasm => "wasm",
            Self::Text => "txt",
            Self::Unknown => "bin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_uses_extension() {
        let url = Url::parse("file:///site/assets/Logo.PNG").unwrap();
        assert_eq!(ContentType::from_url(&url), ContentType::Image);

        let url = Url::parse("file:///site/main.mjs?x=1#frag").unwrap();
        assert_eq!(ContentType::from_url(&url), ContentType::JavaScript);
    }

    #[test]
    fn test_marker_overrides_extension() {
        let url = Url::parse("file:///site/theme.txt?as_css_module").unwrap();
        assert_eq!(ContentType::from_url(&url), ContentType::Css);
    }

    #[test]
    fn test_inline_child_type() {
        let url = Url::parse("file:///site/index.html@2.css").unwrap();
        assert_eq!(ContentType::from_url(&url), ContentType::Css);
        assert_eq!(ContentType::Css.family(), ContentFamily::Style);
    }
}
