//! Build configuration types.
//!
//! [`BuildConfig`] is the library-level input of a build. It is plain data
//! with builder methods; file formats and environment layering live in the
//! CLI, which converts its own config into this one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kiln_graph::HashAlgorithm;
use kiln_graph::resolve::directory_url;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// How many hex characters of a version end up in output names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashLength {
    Short(usize),
    Full,
}

impl HashLength {
    pub fn apply<'a>(&self, version: &'a str) -> &'a str {
        match self {
            Self::Short(length) => &version[..(*length).min(version.len())],
            Self::Full => version,
        }
    }
}

impl Default for HashLength {
    fn default() -> Self {
        Self::Short(8)
    }
}

/// Where a version is embedded in a public URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPlacement {
    /// `lazy.js?v=1a2b3c4d`
    #[default]
    Query,
    /// `lazy-1a2b3c4d.js`
    Filename,
}

/// Whether `import()` targets feed their importer's version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicImportPolicy {
    /// Dynamic targets are versioned on their own and reached through the
    /// emitted import map.
    #[default]
    Exclude,
    Include,
}

/// What to do with static import cycles while versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CyclePolicy {
    #[default]
    SeedWithRawHash,
    Reject,
}

macro_rules! keyword_enum {
    ($ty:ty { $($text:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(format!(
                        "unknown value '{}' (expected one of: {})",
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

keyword_enum!(VersionPlacement { "query" => VersionPlacement::Query, "filename" => VersionPlacement::Filename });
keyword_enum!(DynamicImportPolicy { "exclude" => DynamicImportPolicy::Exclude, "include" => DynamicImportPolicy::Include });
keyword_enum!(CyclePolicy { "seed-with-raw-hash" => CyclePolicy::SeedWithRawHash, "reject" => CyclePolicy::Reject });

impl fmt::Display for VersionPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Filename => "filename",
        })
    }
}

/// Versioning settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersioningConfig {
    pub algorithm: HashAlgorithm,
    pub length: HashLength,
    pub placement: VersionPlacement,
    pub dynamic_imports: DynamicImportPolicy,
    pub cycles: CyclePolicy,
}

/// Code-splitting settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkingConfig {
    /// Extract modules reached from several roots into shared chunks
    /// instead of assigning them to the first root.
    pub shared_chunks: bool,
}

/// Where the source import map comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportMapSource {
    /// JSON file, relative paths resolve against the root directory.
    Path(PathBuf),
    /// JSON text.
    Inline(String),
}

/// Build configuration
///
/// ```
/// use kiln_build::{BuildConfig, VersionPlacement};
///
/// let config = BuildConfig::new("site", "dist")
///     .entry("index.html", "index.html")
///     .placement(VersionPlacement::Filename);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
    /// `(path relative to root_dir, output name)` in priority order.
    pub entries: Vec<(PathBuf, String)>,
    pub import_map: Option<ImportMapSource>,
    pub versioning: VersioningConfig,
    pub chunking: ChunkingConfig,
    /// Public path prefix of the output directory.
    pub base: String,
}

impl BuildConfig {
    pub fn new(root_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            out_dir: out_dir.into(),
            entries: Vec::new(),
            import_map: None,
            versioning: VersioningConfig::default(),
            chunking: ChunkingConfig::default(),
            base: "/".to_string(),
        }
    }

    pub fn entry(mut self, path: impl Into<PathBuf>, output_name: impl Into<String>) -> Self {
        self.entries.push((path.into(), output_name.into()));
        self
    }

    pub fn import_map(mut self, source: ImportMapSource) -> Self {
        self.import_map = Some(source);
        self
    }

    pub fn versioning(mut self, versioning: VersioningConfig) -> Self {
        self.versioning = versioning;
        self
    }

    pub fn placement(mut self, placement: VersionPlacement) -> Self {
        self.versioning.placement = placement;
        self
    }

    pub fn shared_chunks(mut self, enabled: bool) -> Self {
        self.chunking.shared_chunks = enabled;
        self
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Check everything that can be checked without touching the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::InvalidConfig("at least one entry is required".into()));
        }
        for (path, name) in &self.entries {
            if path.is_absolute() && !path.starts_with(&self.root_dir) {
                return Err(Error::InvalidConfig(format!(
                    "entry '{}' is outside the root directory",
                    path.display()
                )));
            }
            if name.is_empty() || name.starts_with('/') || name.split('/').any(|part| part == "..")
            {
                return Err(Error::InvalidConfig(format!(
                    "output name '{}' must be a relative path inside the output directory",
                    name
                )));
            }
        }
        if let HashLength::Short(length) = self.versioning.length {
            if !(4..=64).contains(&length) {
                return Err(Error::InvalidConfig(format!(
                    "hash length must be between 4 and 64, got {}",
                    length
                )));
            }
        }
        if !self.base.starts_with('/') || !self.base.ends_with('/') {
            return Err(Error::InvalidConfig(format!(
                "base '{}' must start and end with '/'",
                self.base
            )));
        }
        Ok(())
    }

    /// Absolute, normalized root directory.
    pub fn absolute_root(&self) -> Result<PathBuf> {
        absolute(&self.root_dir)
    }

    pub fn absolute_out_dir(&self) -> Result<PathBuf> {
        absolute(&self.out_dir)
    }

    /// Directory URL of the root, with the trailing slash joins rely on.
    pub fn root_url(&self) -> Result<Url> {
        let root = self.absolute_root()?;
        directory_url(&root).ok_or_else(|| {
            Error::InvalidConfig(format!("root '{}' is not a valid directory", root.display()))
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let cleaned = path.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::InvalidConfig(format!("Failed to get current directory: {}", e)))?;
    Ok(cwd.join(cleaned).clean())
}
