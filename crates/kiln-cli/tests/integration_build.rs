//! End-to-end tests of the `kiln` binary.

mod helpers;

use helpers::Project;
use predicates::prelude::*;

#[test]
fn test_build_writes_manifest_and_outputs() {
    let project = Project::new();

    project
        .kiln()
        .args(["build", "index.html", "--root", "site"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Build completed"));

    let manifest = project.manifest("dist");
    assert_eq!(manifest["entries"]["index.html"], "/index.html");
    assert!(project.exists("dist/index.html"));
    assert!(project.exists("dist/main.js"));

    let html = project.read("dist/index.html");
    assert!(html.contains("./main.js?v="));
    assert!(html.contains("./style.css?v="));
}

#[test]
fn test_build_is_idempotent() {
    let project = Project::new();
    let build = || {
        project
            .kiln()
            .args(["build", "index.html", "--root", "site"])
            .assert()
            .success();
        project.read("dist/manifest.json")
    };

    assert_eq!(build(), build());
}

#[test]
fn test_filename_placement() {
    let project = Project::new();

    project
        .kiln()
        .args(["build", "index.html", "-r", "site", "--placement", "filename", "--hash-length", "10"])
        .assert()
        .success();

    let manifest = project.manifest("dist");
    let main = manifest["modules"]["main.js"].as_str().unwrap();
    assert!(
        predicate::str::is_match(r"^/main-[0-9a-f]{10}\.js$").unwrap().eval(main),
        "unexpected public path {main}"
    );
}

#[test]
fn test_unresolved_bare_specifier_fails() {
    let project = Project::new();
    project.write("site/main.js", "import _ from 'lodash';\n_.noop();\n");

    project
        .kiln()
        .args(["build", "index.html", "--root", "site"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kiln::unresolved_bare_specifier"));

    assert!(!project.exists("dist/manifest.json"));
}

#[test]
fn test_import_map_resolves_bare_specifier() {
    let project = Project::new();
    project.write("site/main.js", "import _ from 'lodash';\n_.noop();\n");
    project.write(
        "importmap.json",
        r#"{ "imports": { "lodash": "https://cdn.example/lodash.js" } }"#,
    );

    project
        .kiln()
        .args(["build", "index.html", "--root", "site", "--import-map", "importmap.json"])
        .assert()
        .success();

    let manifest = project.manifest("dist");
    assert_eq!(manifest["importMap"]["lodash"], "https://cdn.example/lodash.js");
}

#[test]
fn test_config_file_and_flag_layering() {
    let project = Project::new();
    project.write(
        "kiln.config.json",
        r#"{ "root": "site", "entries": ["index.html"], "outDir": "public" }"#,
    );

    project.kiln().arg("build").assert().success();
    assert!(project.exists("public/manifest.json"));

    project
        .kiln()
        .args(["build", "--out-dir", "flag-out"])
        .assert()
        .success();
    assert!(project.exists("flag-out/manifest.json"));
}

#[test]
fn test_env_overrides_config_file() {
    let project = Project::new();
    project.write(
        "kiln.config.json",
        r#"{ "root": "site", "entries": ["index.html"], "outDir": "public" }"#,
    );

    project
        .kiln()
        .env("KILN_OUT_DIR", "env-out")
        .arg("build")
        .assert()
        .success();
    assert!(project.exists("env-out/manifest.json"));
    assert!(!project.exists("public/manifest.json"));
}

#[test]
fn test_missing_entries_is_a_config_error() {
    let project = Project::new();

    project
        .kiln()
        .args(["build", "--root", "site"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("entries"));
}

#[test]
fn test_unknown_config_field_fails() {
    let project = Project::new();
    project.write("kiln.config.json", r#"{ "entries": ["index.html"], "minify": true }"#);

    project.kiln().arg("build").assert().failure();
}

#[test]
fn test_help_lists_commands() {
    let project = Project::new();

    project
        .kiln()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("watch"));
}
