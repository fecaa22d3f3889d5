//! HTML chunk rendering.

use kiln_graph::{ModuleNode, ReferenceKind};

use super::{Edit, Renderer, apply_edits};
use crate::chunking::Chunk;
use crate::output::WriteError;
use crate::output::import_map::OutputImportMap;
use crate::output::layout::Artifact;

/// The document with rewritten attributes, inline bodies rendered in place
/// and the import map injected when there is one.
pub(super) fn render(
    renderer: &Renderer<'_>,
    chunk: &Chunk,
    import_map: &OutputImportMap,
) -> Result<Option<String>, WriteError> {
    let Some(node) = chunk.lead().and_then(|lead| renderer.graph.node(lead)) else {
        return Ok(None);
    };
    let Some(text) = node.text() else {
        return Ok(None);
    };
    let artifact = renderer.layout.artifact(chunk.id);

    let mut edits = renderer.reference_edits(artifact, node, |_| false)?;
    for reference in &node.references {
        if reference.kind() != ReferenceKind::Inline {
            continue;
        }
        let Some(child) = reference.resolved().and_then(|url| renderer.graph.node(url)) else {
            continue;
        };
        if let Some(body) = render_inline(renderer, artifact, child)? {
            edits.push(Edit::new(reference.span().range(), body));
        }
    }

    let html = apply_edits(text, edits);
    if import_map.is_empty() {
        Ok(Some(html))
    } else {
        Ok(Some(import_map.inject_html(&html)))
    }
}

/// Inline `<script>`/`<style>` bodies only get their specifiers rewritten:
/// everything they import lives in an artifact of its own.
fn render_inline(
    renderer: &Renderer<'_>,
    artifact: &Artifact,
    child: &ModuleNode,
) -> Result<Option<String>, WriteError> {
    let Some(text) = child.text() else {
        return Ok(None);
    };
    let edits = renderer.reference_edits(artifact, child, |_| false)?;
    Ok(Some(apply_edits(text, edits)))
}
