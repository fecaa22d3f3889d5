//! One node load: read, transform, resolve.
//!
//! Runs inside a spawned task. Nothing here touches the visited set; the
//! driver claims children after the task returns.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::content_type::ContentType;
use crate::context::BuildContext;
use crate::extract::{
    ExtractedReference, InlineSource, SourceUnit, TransformContext, TransformError,
    is_ignorable_specifier,
};
use crate::module::ModuleNode;
use crate::reference::{Reference, ReferenceKind};
use crate::resolve::{Marker, ResolveError, attach_marker, is_external, resolve, strip_markers};
use crate::runtime::RuntimeError;

/// What a task is asked to produce.
#[derive(Debug, Clone)]
pub(crate) enum LoadRequest {
    /// Read the URL through the runtime.
    Read(Url),
    /// Body of an inline `<script>`/`<style>`.
    Inline {
        url: Url,
        parent: Url,
        source: InlineSource,
    },
    /// Node from a previous build whose content is known to be unchanged.
    Reuse(ModuleNode),
}

impl LoadRequest {
    pub(crate) fn url(&self) -> &Url {
        match self {
            Self::Read(url) | Self::Inline { url, .. } => url,
            Self::Reuse(node) => &node.url,
        }
    }
}

/// A child discovered by a load, not yet claimed.
#[derive(Debug, Clone)]
pub(crate) struct ChildRequest {
    pub url: Url,
    pub inline: Option<(Url, InlineSource)>,
}

#[derive(Debug)]
pub(crate) struct Loaded {
    pub node: ModuleNode,
    pub children: Vec<ChildRequest>,
    pub externals: Vec<Url>,
    /// Reference index and why it did not resolve.
    pub unresolved: Vec<(usize, ResolveError)>,
    /// References left alone on purpose (fragments, `data:` and the like).
    pub skipped: Vec<usize>,
    pub reused: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum LoadFailure {
    #[error(transparent)]
    Read(#[from] RuntimeError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

#[derive(Debug)]
pub(crate) struct LoadOutcome {
    pub url: Url,
    pub result: Result<Loaded, LoadFailure>,
}

pub(crate) async fn load(ctx: Arc<BuildContext>, request: LoadRequest) -> LoadOutcome {
    let url = request.url().clone();
    let result = match request {
        LoadRequest::Read(url) => read_and_transform(&ctx, url, None).await,
        LoadRequest::Inline {
            url,
            parent,
            source,
        } => read_and_transform(&ctx, url, Some((parent, source))).await,
        LoadRequest::Reuse(node) => Ok(reuse(&ctx, node)),
    };
    LoadOutcome { url, result }
}

async fn read_and_transform(
    ctx: &BuildContext,
    url: Url,
    inline: Option<(Url, InlineSource)>,
) -> Result<Loaded, LoadFailure> {
    let (content_type, content, parent) = match inline {
        Some((parent, source)) => (
            source.content_type,
            source.content.into_bytes(),
            Some(parent),
        ),
        None => {
            let (stripped, _) = strip_markers(&url);
            let path = stripped
                .to_file_path()
                .map_err(|()| RuntimeError::Other(format!("{url} is not a file URL")))?;
            let content = ctx.runtime.read_file(&path).await?;
            (ContentType::from_url(&url), content, None)
        }
    };

    let unit = SourceUnit::new(&url, content_type, &content);
    let transform_ctx = TransformContext {
        root: &ctx.root,
        inline_parent: parent.as_ref(),
    };
    let output = ctx.registry.get(content_type).transform(&unit, &transform_ctx)?;
    debug!(
        url = %url,
        references = output.references.len(),
        "transformed module"
    );

    let mut resolved = Resolution::default();
    for (index, extracted) in output.references.into_iter().enumerate() {
        resolved.push_extracted(ctx, &url, index, extracted);
    }

    let content_hash = ctx.hash_algorithm.digest(&output.code);
    let node = ModuleNode::builder(url, content_type)
        .content(output.code)
        .references(resolved.references)
        .content_hash(content_hash)
        .source_map(output.map)
        .inline_parent(parent)
        .syntax(output.syntax)
        .build();

    Ok(Loaded {
        node,
        children: resolved.children,
        externals: resolved.externals,
        unresolved: resolved.unresolved,
        skipped: resolved.skipped,
        reused: false,
    })
}

/// Re-resolve an unchanged node's references without reading it again.
/// The import map may have changed between builds.
fn reuse(ctx: &BuildContext, mut node: ModuleNode) -> Loaded {
    debug!(url = %node.url, "reusing unchanged module");
    let mut resolved = Resolution::default();
    let previous = std::mem::take(&mut node.references);
    for (index, reference) in previous.into_iter().enumerate() {
        let marker = reference
            .resolved()
            .and_then(|target| strip_markers(target).1);
        let extracted = ExtractedReference {
            reference: reference.cleared(),
            marker,
            inline: None,
        };
        resolved.push_extracted(ctx, &node.url, index, extracted);
    }
    node.references = resolved.references;

    Loaded {
        node,
        children: resolved.children,
        externals: resolved.externals,
        unresolved: resolved.unresolved,
        skipped: resolved.skipped,
        reused: true,
    }
}

#[derive(Default)]
struct Resolution {
    references: Vec<Reference>,
    children: Vec<ChildRequest>,
    externals: Vec<Url>,
    unresolved: Vec<(usize, ResolveError)>,
    skipped: Vec<usize>,
}

impl Resolution {
    fn push_extracted(
        &mut self,
        ctx: &BuildContext,
        base: &Url,
        index: usize,
        extracted: ExtractedReference,
    ) {
        let ExtractedReference {
            reference,
            marker,
            inline,
        } = extracted;

        if reference.kind() == ReferenceKind::Inline {
            match inline_child_url(base, reference.specifier()) {
                Some(child) => {
                    self.children.push(ChildRequest {
                        url: child.clone(),
                        inline: inline.map(|source| (base.clone(), source)),
                    });
                    self.references.push(reference.resolved_to(child));
                }
                None => self.references.push(reference),
            }
            return;
        }

        if is_ignorable_specifier(reference.specifier()) {
            self.skipped.push(index);
            self.references.push(reference);
            return;
        }

        match resolve_target(ctx, base, &reference, marker) {
            Ok(target) if is_external(&target) => {
                self.externals.push(target.clone());
                self.references.push(reference.resolved_to(target));
            }
            Ok(target) => {
                self.children.push(ChildRequest {
                    url: target.clone(),
                    inline: None,
                });
                self.references.push(reference.resolved_to(target));
            }
            Err(err) => {
                self.unresolved.push((index, err));
                self.references.push(reference);
            }
        }
    }
}

fn resolve_target(
    ctx: &BuildContext,
    base: &Url,
    reference: &Reference,
    marker: Option<Marker>,
) -> Result<Url, ResolveError> {
    let import_map = ctx.import_map.as_deref();
    let target = resolve(reference.specifier(), base, import_map, reference.mode())?;
    Ok(match marker {
        Some(marker) => attach_marker(&target, marker),
        None => target,
    })
}

/// `file:///site/index.html` + `@0.css` -> `file:///site/index.html@0.css`
pub(crate) fn inline_child_url(parent: &Url, suffix: &str) -> Option<Url> {
    let mut base = parent.clone();
    base.set_query(None);
    base.set_fragment(None);
    Url::parse(&format!("{base}{suffix}")).ok()
}
