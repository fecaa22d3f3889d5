//! Configuration with multi-source loading.
//!
//! Priority: CLI > `KILN_*` environment variables > kiln.config.json > defaults

mod conversions;
mod defaults;
mod loading;
mod tests;
mod validation;

use std::path::PathBuf;

use kiln_build::{CyclePolicy, DynamicImportPolicy, HashAlgorithm, VersionPlacement};
use serde::{Deserialize, Serialize};

pub use defaults::*;
pub use loading::{CONFIG_FILE, ENV_PREFIX};

/// Contents of kiln.config.json.
///
/// ```json
/// {
///   "root": "site",
///   "entries": ["index.html", "admin/index.html=admin.html"],
///   "outDir": "dist",
///   "importMap": "site/importmap.json",
///   "placement": "filename",
///   "hashLength": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KilnConfig {
    /// `path` or `path=output-name`, relative to `root`
    #[serde(default)]
    pub entries: Vec<String>,

    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_map: Option<PathBuf>,

    #[serde(default)]
    pub hash: HashAlgorithm,

    #[serde(default = "default_hash_length")]
    pub hash_length: usize,

    #[serde(default)]
    pub full_hash: bool,

    #[serde(default)]
    pub placement: VersionPlacement,

    #[serde(default)]
    pub dynamic_imports: DynamicImportPolicy,

    #[serde(default)]
    pub cycles: CyclePolicy,

    #[serde(default)]
    pub shared_chunks: bool,

    #[serde(default = "default_base")]
    pub base: String,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            root: default_root(),
            out_dir: default_out_dir(),
            import_map: None,
            hash: HashAlgorithm::default(),
            hash_length: default_hash_length(),
            full_hash: false,
            placement: VersionPlacement::default(),
            dynamic_imports: DynamicImportPolicy::default(),
            cycles: CyclePolicy::default(),
            shared_chunks: false,
            base: default_base(),
        }
    }
}
