//! CSS chunk rendering.

use indexmap::IndexSet;
use kiln_graph::ReferenceKind;

use super::{Edit, Renderer, apply_edits, join_parts, quote};
use crate::chunking::Chunk;
use crate::output::WriteError;

/// Members concatenated deps-first. `@import` rules of same-chunk members
/// are dropped; every other one moves to the top of the artifact, since
/// `@import` is only valid before any other rule.
pub(super) fn render(renderer: &Renderer<'_>, chunk: &Chunk) -> Result<Option<String>, WriteError> {
    let graph = renderer.graph;
    let artifact = renderer.layout.artifact(chunk.id);
    let mut hoisted: IndexSet<String> = IndexSet::new();
    let mut bodies = Vec::with_capacity(chunk.members.len());

    for member in &chunk.members {
        let Some(node) = graph.node(member) else {
            continue;
        };
        let Some(text) = node.text() else {
            if chunk.members.len() == 1 {
                return Ok(None);
            }
            continue;
        };

        let mut edits = Vec::new();
        let mut handled = Vec::new();
        for (index, reference) in node.references.iter().enumerate() {
            if reference.kind() != ReferenceKind::StaticImport {
                continue;
            }
            let Some(statement) = reference.statement() else {
                continue;
            };
            handled.push(index);
            edits.push(Edit::remove(statement.range()));

            let same_chunk = reference
                .resolved()
                .is_some_and(|target| renderer.plan.owner_of(target) == Some(chunk.id));
            if same_chunk {
                continue;
            }

            let rewritten = renderer.rewrite(artifact, node, index)?;
            let rule = match rewritten {
                Some(path) if reference.is_mergeable() => format!("@import {};", quote(&path)),
                rewritten => {
                    let rule = text.get(statement.range()).unwrap_or_default();
                    let span = reference.span();
                    let inner = span.start.saturating_sub(statement.start)
                        ..span.end.saturating_sub(statement.start);
                    match rewritten {
                        Some(path) => apply_edits(rule, vec![Edit::new(inner, path)]),
                        None => rule.to_string(),
                    }
                }
            };
            hoisted.insert(rule);
        }

        edits.extend(renderer.reference_edits(artifact, node, |index| handled.contains(&index))?);
        bodies.push(apply_edits(text, edits).trim_start().to_string());
    }

    let mut parts: Vec<String> = hoisted.into_iter().collect();
    parts.extend(bodies);
    let mut rendered = join_parts(parts);
    if chunk.members.len() > 1 && !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(Some(rendered))
}
