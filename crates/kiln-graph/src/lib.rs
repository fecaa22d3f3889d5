//! # kiln-graph
//!
//! URL resolution, reference extraction and concurrent module graph
//! construction for the kiln build engine.
//!
//! ## Overview
//!
//! Every resource is identified by its canonical [`url::Url`]. Starting from a
//! set of [`EntryPoint`]s, the [`GraphBuilder`] reads each file through a
//! [`Runtime`], runs the [`Transform`] registered for its [`ContentType`] to
//! find references, resolves them with [`resolve()`] and follows them until
//! the whole graph is loaded. The result is a [`ModuleGraph`] in canonical
//! order, independent of task scheduling.
//!
//! ```text
//!  entries ──► GraphBuilder ──► JoinSet of load tasks
//!                  │                 │
//!                  │     Runtime::read_file ─► Transform ─► resolve
//!                  │                 │
//!                  ◄──── children ───┘
//!                  │
//!                  ▼
//!            classify + canonical order ──► ModuleGraph
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kiln_graph::{BuildContext, EntryPoint, GraphBuilder, MemoryRuntime};
//! use url::Url;
//!
//! # async fn run() -> Result<(), kiln_graph::GraphError> {
//! let runtime = MemoryRuntime::new("/site");
//! runtime.insert("/site/main.js", "import './util.js';");
//! runtime.insert("/site/util.js", "export const x = 1;");
//!
//! let root = Url::parse("file:///site/").unwrap();
//! let ctx = BuildContext::new(Arc::new(runtime), root.clone());
//! let build = GraphBuilder::new(ctx)
//!     .build(vec![EntryPoint::new(root.join("main.js").unwrap(), "main.js")])
//!     .await?;
//! assert_eq!(build.graph.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod content_type;
pub mod context;
pub mod diagnostics;
pub mod extract;
pub mod graph;
pub mod hash;
pub mod module;
pub mod reference;
pub mod resolve;
pub mod runtime;
pub mod syntax;

pub use builder::{GraphBuild, GraphBuilder, GraphError};
pub use content_type::{ContentFamily, ContentType};
pub use context::{BuildContext, CancellationToken};
pub use diagnostics::{BuildDiagnostic, BuildReport, DiagnosticKind, Severity, SourcePosition};
pub use extract::{
    ExtractedReference, InlineSource, SourceUnit, Transform, TransformContext, TransformError,
    TransformOutput, TransformRegistry, extract_references,
};
pub use graph::{EntryPoint, ModuleGraph};
pub use hash::{ContentHasher, HashAlgorithm};
pub use module::{ModuleNode, ModuleNodeBuilder};
pub use reference::{ByteSpan, Reference, ReferenceId, ReferenceKind};
pub use resolve::{ImportMap, ImportMapError, Marker, ResolveError, ResolveMode, resolve};
pub use runtime::{MemoryRuntime, NativeRuntime, Runtime, RuntimeError, RuntimeResult};
pub use syntax::{
    EsmSyntax, ExportForm, ExportRecord, ImportBinding, ImportForm, ImportRecord, ImportedName,
    MergeBlocker,
};

/// Re-export so downstream crates use the same URL type.
pub use url;
