//! Shared test utilities for kiln-build tests

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use kiln_build::{BuildConfig, Manifest, ManifestChunk};
use tempfile::TempDir;

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3, 4];

/// Project on disk: sources below `site/`, output below `dist/`.
pub struct Site {
    pub dir: TempDir,
}

impl Site {
    pub fn new(files: &[(&str, &[u8])]) -> Self {
        let site = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fs::create_dir_all(site.root()).unwrap();
        for (path, contents) in files {
            site.write(path, contents);
        }
        site
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("site")
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("dist")
    }

    pub fn write(&self, path: &str, contents: &[u8]) {
        let target = self.root().join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, contents).unwrap();
    }

    pub fn config(&self) -> BuildConfig {
        BuildConfig::new(self.root(), self.out())
    }

    pub fn read_out(&self, path: &str) -> String {
        fs::read_to_string(self.out().join(path)).unwrap()
    }

    /// Every output file, keyed by out-dir relative path.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(&self.out(), &self.out(), &mut files);
        files
    }
}

fn collect(base: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(base, &path, files);
        } else {
            let relative = path.strip_prefix(base).unwrap().to_string_lossy().replace('\\', "/");
            files.insert(relative, fs::read(&path).unwrap());
        }
    }
}

pub const MAIN_HTML: &str = r#"<!doctype html>
<html>
<head>
  <title>kiln</title>
</head>
<body>
  <script type="module" src="./main.js"></script>
</body>
</html>
"#;

pub const MAIN_JS: &str = r#"import { greet } from './util.js';

document.body.append(greet('kiln'));
document.body.addEventListener('click', () => import('./lazy.js'));
"#;

pub const UTIL_JS: &str = r#"export function greet(name) {
  return `hello ${name}`;
}
"#;

pub const LAZY_JS: &str = r#"const icon = new URL('./icon.png', import.meta.url);
export default icon.href;
"#;

/// `main.html` -> `main.js` -> (`util.js`, `import('./lazy.js')` -> `icon.png`)
pub fn scenario() -> Site {
    Site::new(&[
        ("main.html", MAIN_HTML.as_bytes()),
        ("main.js", MAIN_JS.as_bytes()),
        ("util.js", UTIL_JS.as_bytes()),
        ("lazy.js", LAZY_JS.as_bytes()),
        ("icon.png", PNG),
    ])
}

pub fn scenario_config(site: &Site) -> BuildConfig {
    site.config().entry("main.html", "main.html")
}

/// Chunk whose members include `member`.
pub fn chunk_with<'a>(manifest: &'a Manifest, member: &str) -> &'a ManifestChunk {
    manifest
        .chunks
        .iter()
        .find(|chunk| chunk.members.iter().any(|m| m == member))
        .unwrap_or_else(|| panic!("no chunk contains {member}"))
}

pub fn sorted(members: &[String]) -> Vec<&str> {
    let mut members: Vec<&str> = members.iter().map(String::as_str).collect();
    members.sort_unstable();
    members
}
