//! Reference edges between module nodes.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::resolve::ResolveMode;

/// How a source refers to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// `import`/`export ... from`, `<script src>`, CSS `@import`
    StaticImport,
    /// `import()`
    DynamicImport,
    /// `new URL(x, import.meta.url)`, `<img src>`, `<link href>`, CSS `url()`
    Asset,
    /// Inline `<script>`/`<style>` body
    Inline,
}

impl ReferenceKind {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::DynamicImport)
    }

    /// Whether the edge keeps its target alive for the failure policy.
    /// Everything except `import()` loads eagerly.
    pub fn is_eager(&self) -> bool {
        !self.is_dynamic()
    }
}

/// Half-open byte range into a node's transformed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ByteSpan {
    pub start: usize,
    pub end: usize,
}

impl ByteSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-owning handle to the `index`-th reference of `source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId {
    pub source: Url,
    pub index: usize,
}

/// A discovered dependency edge.
///
/// Once constructed the record does not change. Resolving it yields a new
/// record through [`Reference::resolved_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    kind: ReferenceKind,
    specifier: String,
    span: ByteSpan,
    statement: Option<ByteSpan>,
    mode: ResolveMode,
    resolved: Option<Url>,
    versioned: bool,
    mergeable: bool,
}

impl Reference {
    pub fn new(kind: ReferenceKind, specifier: impl Into<String>, span: ByteSpan) -> Self {
        let mode = match kind {
            ReferenceKind::StaticImport | ReferenceKind::DynamicImport => ResolveMode::Module,
            ReferenceKind::Asset | ReferenceKind::Inline => ResolveMode::Url,
        };
        Self {
            kind,
            specifier: specifier.into(),
            span,
            statement: None,
            mode,
            resolved: None,
            versioned: kind != ReferenceKind::Inline,
            mergeable: true,
        }
    }

    /// Span of the whole statement carrying the specifier.
    pub fn with_statement(mut self, statement: ByteSpan) -> Self {
        self.statement = Some(statement);
        self
    }

    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Mark that the target must not be concatenated into the importer's
    /// artifact through this edge.
    pub fn unmergeable(mut self) -> Self {
        self.mergeable = false;
        self
    }

    pub fn unversioned(mut self) -> Self {
        self.versioned = false;
        self
    }

    /// A new record identical to this one but pointing at `url`.
    pub fn resolved_to(&self, url: Url) -> Self {
        Self {
            resolved: Some(url),
            ..self.clone()
        }
    }

    /// The unresolved record this one was derived from.
    pub(crate) fn cleared(&self) -> Self {
        Self {
            resolved: None,
            ..self.clone()
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    pub fn span(&self) -> ByteSpan {
        self.span
    }

    pub fn statement(&self) -> Option<ByteSpan> {
        self.statement
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    pub fn resolved(&self) -> Option<&Url> {
        self.resolved.as_ref()
    }

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    pub fn is_mergeable(&self) -> bool {
        self.mergeable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_creates_new_record() {
        let reference = Reference::new(ReferenceKind::StaticImport, "./a.js", ByteSpan::new(8, 14));
        let url = Url::parse("file:///site/a.js").unwrap();
        let resolved = reference.resolved_to(url.clone());

        assert!(reference.resolved().is_none());
        assert_eq!(resolved.resolved(), Some(&url));
        assert_eq!(resolved.specifier(), reference.specifier());
        assert_eq!(resolved.mode(), ResolveMode::Module);
    }

    #[test]
    fn test_inline_references_are_not_versioned() {
        let inline = Reference::new(ReferenceKind::Inline, "inline #0", ByteSpan::default());
        assert!(!inline.is_versioned());
        assert_eq!(inline.mode(), ResolveMode::Url);
        assert!(ReferenceKind::Inline.is_eager());
        assert!(!ReferenceKind::DynamicImport.is_eager());
    }
}
