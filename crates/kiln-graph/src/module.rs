use std::sync::Arc;

use url::Url;

use crate::content_type::ContentType;
use crate::reference::Reference;
use crate::syntax::EsmSyntax;

/// A loaded resource in the module graph.
///
/// Content is the final transformed form and is shared behind an `Arc` so
/// cloning nodes out of the graph stays cheap.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub url: Url,
    pub content_type: ContentType,
    pub content: Arc<Vec<u8>>,
    /// Outgoing references in source order.
    pub references: Vec<Reference>,
    /// Raw digest of `content`, set once the content is final.
    pub content_hash: Option<String>,
    pub source_map: Option<String>,
    /// Owning document for inline `<script>`/`<style>` bodies.
    pub inline_parent: Option<Url>,
    pub syntax: Option<Arc<EsmSyntax>>,
}

impl ModuleNode {
    pub fn builder(url: Url, content_type: ContentType) -> ModuleNodeBuilder {
        ModuleNodeBuilder {
            node: Self {
                url,
                content_type,
                content: Arc::new(Vec::new()),
                references: Vec::new(),
                content_hash: None,
                source_map: None,
                inline_parent: None,
                syntax: None,
            },
        }
    }

    pub fn is_inline(&self) -> bool {
        self.inline_parent.is_some()
    }

    /// Content as UTF-8 text, if it is valid.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Resolved targets of all references, in source order.
    pub fn targets(&self) -> impl Iterator<Item = (&Reference, &Url)> {
        self.references
            .iter()
            .filter_map(|reference| reference.resolved().map(|url| (reference, url)))
    }

    /// Whether the node can be concatenated into another artifact at all.
    pub fn is_mergeable(&self) -> bool {
        self.syntax.as_ref().is_none_or(|syntax| syntax.is_mergeable())
    }
}

/// Builder for [`ModuleNode`].
pub struct ModuleNodeBuilder {
    node: ModuleNode,
}

impl ModuleNodeBuilder {
    pub fn content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.node.content = Arc::new(content.into());
        self
    }

    pub fn shared_content(mut self, content: Arc<Vec<u8>>) -> Self {
        self.node.content = content;
        self
    }

    pub fn references(mut self, references: Vec<Reference>) -> Self {
        self.node.references = references;
        self
    }

    pub fn content_hash(mut self, hash: impl Into<String>) -> Self {
        self.node.content_hash = Some(hash.into());
        self
    }

    pub fn source_map(mut self, map: Option<String>) -> Self {
        self.node.source_map = map;
        self
    }

    pub fn inline_parent(mut self, parent: Option<Url>) -> Self {
        self.node.inline_parent = parent;
        self
    }

    pub fn syntax(mut self, syntax: Option<EsmSyntax>) -> Self {
        self.node.syntax = syntax.map(Arc::new);
        self
    }

    pub fn build(self) -> ModuleNode {
        self.node
    }
}
