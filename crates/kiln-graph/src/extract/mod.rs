//! Reference extraction.
//!
//! A [`Transform`] turns a source unit into its final content plus the
//! ordered references found in it. Transforms are looked up once per node in
//! a [`TransformRegistry`] keyed by [`ContentType`].

mod css;
mod html;
mod js;
mod raw;

pub use css::CssTransform;
pub use html::HtmlTransform;
pub use js::JsTransform;
pub use raw::RawTransform;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use url::Url;

use crate::content_type::ContentType;
use crate::diagnostics::SourcePosition;
use crate::reference::Reference;
use crate::resolve::Marker;
use crate::syntax::EsmSyntax;

/// One unit of source handed to a transform.
#[derive(Debug, Clone, Copy)]
pub struct SourceUnit<'a> {
    pub url: &'a Url,
    pub content_type: ContentType,
    pub content: &'a [u8],
}

impl<'a> SourceUnit<'a> {
    pub fn new(url: &'a Url, content_type: ContentType, content: &'a [u8]) -> Self {
        Self {
            url,
            content_type,
            content,
        }
    }

    pub fn text(&self) -> Result<&'a str, TransformError> {
        std::str::from_utf8(self.content).map_err(|e| {
            let valid = e.valid_up_to();
            let prefix = std::str::from_utf8(&self.content[..valid]).unwrap_or_default();
            TransformError::Encoding {
                url: self.url.clone(),
                position: Some(SourcePosition::from_offset(prefix, valid)),
            }
        })
    }
}

/// Per-build information available to transforms.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub root: &'a Url,
    /// Set when the unit is the body of an inline `<script>`/`<style>`.
    pub inline_parent: Option<&'a Url>,
}

/// Content of an inline child carried by an [`ExtractedReference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSource {
    pub content_type: ContentType,
    pub content: String,
}

/// A reference as found by a transform, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReference {
    pub reference: Reference,
    pub marker: Option<Marker>,
    pub inline: Option<InlineSource>,
}

impl ExtractedReference {
    pub fn new(reference: Reference) -> Self {
        Self {
            reference,
            marker: None,
            inline: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub code: Vec<u8>,
    pub map: Option<String>,
    /// In source order.
    pub references: Vec<ExtractedReference>,
    pub syntax: Option<EsmSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Syntax error in {url}: {message}")]
    Syntax {
        url: Url,
        message: String,
        position: Option<SourcePosition>,
    },

    #[error("{url} is not valid UTF-8")]
    Encoding {
        url: Url,
        position: Option<SourcePosition>,
    },

    #[error("Transform failed for {url}: {message}")]
    Other { url: Url, message: String },
}

impl TransformError {
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Self::Syntax { position, .. } | Self::Encoding { position, .. } => *position,
            Self::Other { .. } => None,
        }
    }

    pub(crate) fn syntax(unit: &SourceUnit<'_>, message: impl Into<String>, offset: Option<usize>) -> Self {
        let position = match (offset, unit.text()) {
            (Some(offset), Ok(text)) => Some(SourcePosition::from_offset(text, offset)),
            _ => None,
        };
        Self::Syntax {
            url: unit.url.clone(),
            message: message.into(),
            position,
        }
    }
}

/// Syntax-transform capability.
pub trait Transform: Send + Sync + std::fmt::Debug {
    fn transform(
        &self,
        unit: &SourceUnit<'_>,
        ctx: &TransformContext<'_>,
    ) -> Result<TransformOutput, TransformError>;
}

/// Content type to transform lookup.
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    transforms: FxHashMap<ContentType, Arc<dyn Transform>>,
    fallback: Arc<dyn Transform>,
}

impl TransformRegistry {
    /// Registry without any content-specific transform. Everything is raw.
    pub fn empty() -> Self {
        Self {
            transforms: FxHashMap::default(),
            fallback: Arc::new(RawTransform),
        }
    }

    /// JS, CSS and HTML extractors; raw passthrough for the rest.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ContentType::JavaScript, JsTransform::new());
        registry.register(ContentType::Css, CssTransform::new());
        registry.register(ContentType::Html, HtmlTransform::new());
        registry
    }

    pub fn register(&mut self, content_type: ContentType, transform: impl Transform + 'static) {
        self.transforms.insert(content_type, Arc::new(transform));
    }

    pub fn get(&self, content_type: ContentType) -> Arc<dyn Transform> {
        self.transforms
            .get(&content_type)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Extract the ordered references of a unit with the registry's transform.
pub fn extract_references(
    registry: &TransformRegistry,
    unit: &SourceUnit<'_>,
    ctx: &TransformContext<'_>,
) -> Result<Vec<ExtractedReference>, TransformError> {
    registry
        .get(unit.content_type)
        .transform(unit, ctx)
        .map(|output| output.references)
}

/// Skip specifiers that never name a loadable resource.
pub(crate) fn is_ignorable_specifier(specifier: &str) -> bool {
    let trimmed = specifier.trim();
    trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("data:")
        || trimmed.starts_with("javascript:")
        || trimmed.starts_with("mailto:")
        || trimmed.starts_with("about:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_falls_back_to_raw() {
        let registry = TransformRegistry::with_defaults();
        let url = Url::parse("file:///site/logo.png").unwrap();
        let root = Url::parse("file:///site/").unwrap();
        let unit = SourceUnit::new(&url, ContentType::Image, b"\x89PNG");
        let ctx = TransformContext {
            root: &root,
            inline_parent: None,
        };

        let output = registry.get(ContentType::Image).transform(&unit, &ctx).unwrap();
        assert_eq!(output.code, b"\x89PNG");
        assert!(output.references.is_empty());
    }

    #[test]
    fn test_ignorable_specifiers() {
        assert!(is_ignorable_specifier("#top"));
        assert!(is_ignorable_specifier("  "));
        assert!(is_ignorable_specifier("data:image/png;base64,AA"));
        assert!(!is_ignorable_specifier("./a.png"));
    }
}
