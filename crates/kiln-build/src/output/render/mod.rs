//! Chunk rendering.
//!
//! Every artifact is produced by span edits on the members' transformed
//! content: specifiers are replaced with public paths, import and export
//! syntax that concatenation makes redundant is removed, and a few
//! statements are generated at the top or bottom of the artifact. Nothing is
//! re-parsed and nothing on the graph is modified.

mod css;
mod html;
mod js;

use std::collections::BTreeSet;
use std::ops::Range;

use kiln_graph::resolve::{parse_url_like, strip_markers};
use kiln_graph::{ContentFamily, ModuleGraph, ModuleNode, Reference, ReferenceId, ReferenceKind};
use rustc_hash::FxHashMap as HashMap;
use url::Url;

use super::WriteError;
use super::import_map::OutputImportMap;
use super::layout::{Artifact, Layout, relative_public};
use crate::chunking::{Chunk, ChunkPlan};
use crate::config::{DynamicImportPolicy, VersionPlacement, VersioningConfig};
use crate::versioning::versioned_path;

/// Replace `range` of a member's text with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn remove(range: Range<usize>) -> Self {
        Self::new(range, "")
    }
}

/// Apply non-overlapping edits. An edit overlapping an earlier one, or one
/// that does not fall on character boundaries, is dropped.
pub(crate) fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end < edit.range.start {
            continue;
        }
        let (Some(kept), Some(_)) = (
            text.get(cursor..edit.range.start),
            text.get(edit.range.clone()),
        ) else {
            continue;
        };
        out.push_str(kept);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(text.get(cursor..).unwrap_or_default());
    out
}

/// Join artifact parts, making sure each one starts on its own line.
pub(crate) fn join_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(part);
    }
    out
}

pub(crate) struct Renderer<'a> {
    pub graph: &'a ModuleGraph,
    pub plan: &'a ChunkPlan,
    pub layout: &'a Layout,
    pub versioning: &'a VersioningConfig,
    /// Locals of non-root members that other chunks import.
    exported: HashMap<Url, BTreeSet<String>>,
}

impl<'a> Renderer<'a> {
    pub fn new(
        graph: &'a ModuleGraph,
        plan: &'a ChunkPlan,
        layout: &'a Layout,
        versioning: &'a VersioningConfig,
    ) -> Result<Self, WriteError> {
        let exported = js::mangled_exports(graph, plan)?;
        Ok(Self {
            graph,
            plan,
            layout,
            versioning,
            exported,
        })
    }

    pub fn render(&self, chunk: &Chunk, import_map: &OutputImportMap) -> Result<Vec<u8>, WriteError> {
        let family = chunk.content_type(self.graph).family();
        let rendered = match family {
            ContentFamily::Script => js::render(self, chunk)?,
            ContentFamily::Style => css::render(self, chunk)?,
            ContentFamily::Document => html::render(self, chunk, import_map)?,
            ContentFamily::Binary => None,
        };
        match rendered {
            Some(text) => Ok(text.into_bytes()),
            None => Ok(chunk
                .lead()
                .and_then(|lead| self.graph.node(lead))
                .map(|node| node.content.to_vec())
                .unwrap_or_default()),
        }
    }

    fn placement(&self) -> VersionPlacement {
        self.versioning.placement
    }

    /// Dynamic targets that are left out of their importer's version are
    /// referenced without one and reached through the import map instead.
    fn unversioned(&self, reference: &Reference) -> bool {
        reference.kind() == ReferenceKind::DynamicImport
            && self.versioning.dynamic_imports == DynamicImportPolicy::Exclude
    }

    /// Text that replaces the specifier of the `index`-th reference of
    /// `source` inside the artifact at `from`. `None` leaves it untouched.
    pub fn rewrite(
        &self,
        from: &Artifact,
        source: &ModuleNode,
        index: usize,
    ) -> Result<Option<String>, WriteError> {
        let Some(reference) = source.references.get(index) else {
            return Ok(None);
        };
        let id = ReferenceId {
            source: source.url.clone(),
            index,
        };
        if self.graph.is_unresolved(&id) {
            return Ok(None);
        }
        let Some(target) = reference.resolved() else {
            return Err(WriteError::UnresolvedReference {
                from: source.url.clone(),
                specifier: reference.specifier().to_string(),
            });
        };

        if self.graph.is_external(target) {
            // Bare names stay as written and go through the import map
            return Ok(match parse_url_like(reference.specifier(), &source.url) {
                None => None,
                Some(Ok(parsed)) if strip_markers(&parsed).0 == strip_markers(target).0 => None,
                Some(_) => Some(strip_markers(target).0.to_string()),
            });
        }
        if self.graph.is_pruned(target) || !self.graph.contains(target) {
            return Ok(None);
        }
        let Some(artifact) = self.layout.of(self.plan, target) else {
            return Err(WriteError::UnresolvedReference {
                from: source.url.clone(),
                specifier: reference.specifier().to_string(),
            });
        };

        let (stripped, _) = strip_markers(target);
        let unversioned = artifact.entry || !reference.is_versioned() || self.unversioned(reference);
        let mut path = relative_public(
            &from.file,
            if unversioned { &artifact.plain } else { &artifact.file },
        );
        if let Some(query) = stripped.query().filter(|query| !query.is_empty()) {
            path.push('?');
            path.push_str(query);
        }
        if !unversioned && self.placement() == VersionPlacement::Query {
            path = versioned_path(&path, &artifact.version, VersionPlacement::Query);
        }
        if let Some(fragment) = stripped.fragment() {
            path.push('#');
            path.push_str(fragment);
        }
        Ok(Some(path))
    }

    /// In-place specifier edits for every reference of `source` not claimed
    /// by `skip`. Inline references are never rewritten here.
    pub fn reference_edits(
        &self,
        from: &Artifact,
        source: &ModuleNode,
        skip: impl Fn(usize) -> bool,
    ) -> Result<Vec<Edit>, WriteError> {
        let mut edits = Vec::new();
        for (index, reference) in source.references.iter().enumerate() {
            if reference.kind() == ReferenceKind::Inline || skip(index) {
                continue;
            }
            if let Some(text) = self.rewrite(from, source, index)? {
                edits.push(Edit::new(reference.span().range(), text));
            }
        }
        Ok(edits)
    }

    /// Import map entries the artifacts rely on, under the public `base`.
    pub fn import_map(&self, base: &str) -> OutputImportMap {
        let mut map = OutputImportMap::new();
        for node in self.graph.live_nodes() {
            for reference in &node.references {
                let Some(target) = reference.resolved() else {
                    continue;
                };
                if self.graph.is_external(target) {
                    if parse_url_like(reference.specifier(), &node.url).is_none() {
                        map.insert(reference.specifier(), strip_markers(target).0.to_string());
                    }
                    continue;
                }
                if !self.unversioned(reference) {
                    continue;
                }
                match self.layout.of(self.plan, target) {
                    Some(artifact) if !artifact.entry => map.insert(
                        format!("{base}{}", artifact.plain),
                        format!("{base}{}", artifact.public(self.placement())),
                    ),
                    _ => {}
                }
            }
        }
        map
    }

    fn exported(&self, member: &Url) -> Option<&BTreeSet<String>> {
        self.exported.get(member)
    }
}

/// JS/CSS string literal for a specifier.
pub(crate) fn quote(specifier: &str) -> String {
    let mut quoted = String::with_capacity(specifier.len() + 2);
    quoted.push('"');
    for c in specifier.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
