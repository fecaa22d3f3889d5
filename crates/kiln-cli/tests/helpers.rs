#![allow(dead_code)]
#![allow(clippy::disallowed_methods)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub const INDEX_HTML: &str = r#"<!doctype html>
<html>
  <head><link rel="stylesheet" href="./style.css"></head>
  <body><script type="module" src="./main.js"></script></body>
</html>
"#;

pub const MAIN_JS: &str = r#"import { greet } from './util.js';
greet('kiln');
"#;

pub const UTIL_JS: &str = r#"export function greet(name) {
  console.log(`hello ${name}`);
}
"#;

pub const STYLE_CSS: &str = "body { margin: 0; }\n";

/// A project directory with a `site/` root.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        project.write("site/index.html", INDEX_HTML);
        project.write("site/main.js", MAIN_JS);
        project.write("site/util.js", UTIL_JS);
        project.write("site/style.css", STYLE_CSS);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path().join(relative).exists()
    }

    pub fn out(&self, relative: &str) -> PathBuf {
        self.path().join(relative)
    }

    /// `kiln` running in the project directory, without colors or
    /// inherited `KILN_*` settings.
    pub fn kiln(&self) -> Command {
        let mut cmd = Command::cargo_bin("kiln").unwrap();
        cmd.current_dir(self.path()).arg("--no-color");
        for (key, _) in std::env::vars() {
            if key.starts_with("KILN_") {
                cmd.env_remove(key);
            }
        }
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn manifest(&self, out_dir: &str) -> serde_json::Value {
        serde_json::from_str(&self.read(&format!("{out_dir}/manifest.json"))).unwrap()
    }
}
