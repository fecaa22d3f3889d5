//! Module graph construction tests.
//!
//! These tests verify that:
//! 1. Node order is canonical (BFS from entries, references in source order)
//! 2. Cycles terminate and every edge is recorded
//! 3. Failures under dynamic imports are isolated, static ones are fatal and aggregated
//! 4. Cancellation never publishes a graph
//! 5. Rebuilds reuse unchanged nodes and mark dropped ones unreachable

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::*;
use kiln_graph::{
    BuildContext, CancellationToken, DiagnosticKind, GraphBuilder, GraphError, ImportMap,
    ReferenceKind,
};
use rustc_hash::FxHashSet;

#[tokio::test]
async fn test_diamond_is_loaded_once_in_canonical_order() {
    let runtime = project(&[
        ("main.js", "import './a.js';\nimport './b.js';\n"),
        ("a.js", "import './shared.js';\nexport const a = 1;\n"),
        ("b.js", "import './shared.js';\nexport const b = 2;\n"),
        ("shared.js", "export const shared = 0;\n"),
    ]);

    let build = builder(&runtime).build(vec![entry("main.js")]).await.unwrap();
    let graph = build.graph;

    assert_eq!(node_paths(&graph), vec!["main.js", "a.js", "b.js", "shared.js"]);
    assert_eq!(build.loaded, 4);
    assert_eq!(graph.incoming(&url("shared.js")).len(), 2);
    assert!(graph.warnings().is_empty());
    for node in graph.nodes() {
        assert!(node.content_hash.is_some());
    }
}

#[tokio::test]
async fn test_cycles_terminate_and_record_both_edges() {
    let runtime = project(&[
        ("a.js", "import { b } from './b.js';\nexport const a = () => b;\n"),
        ("b.js", "import { a } from './a.js';\nexport const b = () => a;\n"),
    ]);

    let graph = builder(&runtime)
        .build(vec![entry("a.js")])
        .await
        .unwrap()
        .graph;

    assert_eq!(node_paths(&graph), vec!["a.js", "b.js"]);
    assert_eq!(graph.incoming(&url("a.js")).len(), 1);
    assert_eq!(graph.incoming(&url("b.js")).len(), 1);
    assert_eq!(graph.static_cycles(), vec![vec![url("a.js"), url("b.js")]]);
}

#[tokio::test]
async fn test_html_scenario_discovers_every_kind_of_reference() {
    let runtime = project(&[
        (
            "main.html",
            "<html><head><script type=\"module\" src=\"./main.js\"></script></head></html>\n",
        ),
        (
            "main.js",
            "import { helper } from './util.js';\nhelper();\nconst lazy = () => import('./lazy.js');\nconst icon = new URL('./icon.png', import.meta.url);\n",
        ),
        ("util.js", "export function helper() {}\n"),
        ("lazy.js", "export default 'lazy';\n"),
        ("icon.png", "\u{89}PNG"),
    ]);

    let graph = builder(&runtime)
        .build(vec![entry("main.html")])
        .await
        .unwrap()
        .graph;

    assert_eq!(
        node_paths(&graph),
        vec!["main.html", "main.js", "util.js", "lazy.js", "icon.png"]
    );
    let kinds: Vec<_> = graph
        .node(&url("main.js"))
        .unwrap()
        .references
        .iter()
        .map(|reference| reference.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            ReferenceKind::StaticImport,
            ReferenceKind::DynamicImport,
            ReferenceKind::Asset
        ]
    );
}

#[tokio::test]
async fn test_inline_children_become_nodes() {
    let runtime = project(&[
        (
            "index.html",
            "<style>@import './theme.css';</style>\n<script type=\"module\">import './app.js';</script>\n",
        ),
        ("theme.css", "body { color: red; }\n"),
        ("app.js", "console.log('app');\n"),
    ]);

    let graph = builder(&runtime)
        .build(vec![entry("index.html")])
        .await
        .unwrap()
        .graph;

    assert_eq!(
        node_paths(&graph),
        vec![
            "index.html",
            "index.html@0.css",
            "index.html@1.js",
            "theme.css",
            "app.js"
        ]
    );
    let style = graph.node(&url("index.html@0.css")).unwrap();
    assert_eq!(style.inline_parent.as_ref(), Some(&url("index.html")));
}

#[tokio::test]
async fn test_failure_behind_dynamic_import_is_a_warning() {
    let runtime = project(&[
        ("main.js", "export const main = () => import('./lazy.js');\n"),
        ("lazy.js", "export const = ;\n"),
    ]);

    let graph = builder(&runtime)
        .build(vec![entry("main.js")])
        .await
        .unwrap()
        .graph;

    assert_eq!(node_paths(&graph), vec!["main.js"]);
    assert!(graph.is_pruned(&url("lazy.js")));
    assert_eq!(graph.warnings().len(), 1);
    assert_eq!(graph.warnings()[0].kind, DiagnosticKind::SyntaxError);
}

#[tokio::test]
async fn test_static_failures_are_aggregated_with_chains() {
    let runtime = project(&[
        ("main.js", "import './a.js';\nimport 'left-pad';\n"),
        ("a.js", "import './missing.js';\nexport const a = 1 +;\n"),
    ]);

    let err = builder(&runtime)
        .build(vec![entry("main.js")])
        .await
        .unwrap_err();

    let GraphError::Build(report) = err else {
        panic!("expected an aggregated report, got {err:?}");
    };
    let kinds: Vec<_> = report.errors().map(|d| d.kind).collect();
    // Source order of the references in main.js
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::SyntaxError,
            DiagnosticKind::UnresolvedBareSpecifier
        ]
    );

    let syntax = report.errors().next().unwrap();
    assert_eq!(syntax.chain, vec![url("main.js"), url("a.js")]);
    assert_eq!(syntax.position.map(|p| p.line), Some(2));

    let bare = report.errors().nth(1).unwrap();
    assert_eq!(bare.specifier.as_deref(), Some("left-pad"));
    assert_eq!(bare.position.map(|p| p.line), Some(2));
}

#[tokio::test]
async fn test_missing_static_import_reports_read_failure() {
    let runtime = project(&[("main.js", "import './gone.js';\n")]);

    let err = builder(&runtime)
        .build(vec![entry("main.js")])
        .await
        .unwrap_err();
    let report = err.report();
    assert_eq!(report.error_count(), 1);
    let diagnostic = report.errors().next().unwrap();
    assert_eq!(diagnostic.kind, DiagnosticKind::ReadFailure);
    assert_eq!(diagnostic.chain, vec![url("main.js"), url("gone.js")]);
}

#[tokio::test]
async fn test_unreadable_entry_point() {
    let runtime = project(&[]);
    let err = builder(&runtime)
        .build(vec![entry("index.html")])
        .await
        .unwrap_err();
    let report = err.report();
    assert_eq!(
        report.errors().next().map(|d| d.kind),
        Some(DiagnosticKind::UnreachableEntryPoint)
    );
}

#[tokio::test]
async fn test_import_map_resolves_bare_specifiers() {
    let runtime = project(&[
        ("main.js", "import { h } from 'preact';\nh();\n"),
        ("vendor/preact.js", "export const h = () => {};\n"),
    ]);
    let map = ImportMap::from_json(
        r#"{ "imports": { "preact": "./vendor/preact.js" } }"#,
        &root_url(),
    )
    .unwrap();

    let graph = GraphBuilder::new(context(&runtime).with_import_map(Some(map)))
        .build(vec![entry("main.js")])
        .await
        .unwrap()
        .graph;

    assert_eq!(node_paths(&graph), vec!["main.js", "vendor/preact.js"]);
}

#[tokio::test]
async fn test_external_urls_are_not_traversed() {
    let runtime = project(&[(
        "main.js",
        "import confetti from 'https://esm.sh/confetti';\nconfetti();\n",
    )]);

    let graph = builder(&runtime)
        .build(vec![entry("main.js")])
        .await
        .unwrap()
        .graph;
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.externals().count(), 1);
}

#[tokio::test]
async fn test_cancelled_build_publishes_nothing() {
    let memory = project(&[
        ("main.js", "import './a.js';\n"),
        ("a.js", "export const a = 1;\n"),
    ]);
    let runtime = SlowRuntime {
        inner: memory,
        delay: Duration::from_millis(500),
    };
    let cancel = CancellationToken::new();
    let ctx = BuildContext::new(Arc::new(runtime), root_url()).with_cancellation(cancel.clone());
    let builder = GraphBuilder::new(ctx);

    let handle = tokio::spawn(async move { builder.build(vec![entry("main.js")]).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("cancellation should end the build promptly")
        .unwrap();
    assert!(matches!(result, Err(GraphError::Cancelled)));
}

#[tokio::test]
async fn test_rebuild_reuses_unchanged_nodes() {
    let runtime = project(&[
        ("main.js", "import './a.js';\nimport './b.js';\n"),
        ("a.js", "export const a = 1;\n"),
        ("b.js", "export const b = 2;\n"),
    ]);
    let builder = builder(&runtime);
    let first = builder.build(vec![entry("main.js")]).await.unwrap().graph;

    runtime.insert("/site/a.js", "export const a = 42;\n");
    let changed: FxHashSet<_> = [url("a.js")].into_iter().collect();
    let second = builder
        .rebuild(vec![entry("main.js")], &first, &changed)
        .await
        .unwrap();

    assert_eq!(second.loaded, 1);
    assert_eq!(second.reused, 2);
    let before = first.node(&url("a.js")).unwrap().content_hash.clone();
    let after = second.graph.node(&url("a.js")).unwrap().content_hash.clone();
    assert_ne!(before, after);
    assert_eq!(
        first.node(&url("b.js")).unwrap().content_hash,
        second.graph.node(&url("b.js")).unwrap().content_hash
    );
}

#[tokio::test]
async fn test_rebuild_marks_dropped_nodes_unreachable() {
    let runtime = project(&[
        ("main.js", "import './a.js';\nimport './b.js';\n"),
        ("a.js", "export const a = 1;\n"),
        ("b.js", "export const b = 2;\n"),
    ]);
    let builder = builder(&runtime);
    let first = builder.build(vec![entry("main.js")]).await.unwrap().graph;

    runtime.insert("/site/main.js", "import './a.js';\n");
    let changed: FxHashSet<_> = [url("main.js")].into_iter().collect();
    let second = builder
        .rebuild(vec![entry("main.js")], &first, &changed)
        .await
        .unwrap()
        .graph;

    assert!(second.contains(&url("b.js")));
    assert!(second.is_unreachable(&url("b.js")));
    let live: Vec<_> = second.live_nodes().map(|node| node.url.clone()).collect();
    assert_eq!(live, vec![url("main.js"), url("a.js")]);
}
