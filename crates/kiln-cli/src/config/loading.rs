use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::Serialize;

use crate::cli::BuildArgs;
use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "kiln.config.json";
pub const ENV_PREFIX: &str = "KILN_";

/// Flags that were actually given; unset ones leave lower layers alone.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    import_map: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<kiln_build::HashAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_hash: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    placement: Option<kiln_build::VersionPlacement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_imports: Option<kiln_build::DynamicImportPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycles: Option<kiln_build::CyclePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shared_chunks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<String>,
}

impl From<&BuildArgs> for Overrides {
    fn from(args: &BuildArgs) -> Self {
        let entries = (!args.entries.is_empty()).then(|| {
            args.entries
                .iter()
                .map(|(path, name)| match name {
                    Some(name) => format!("{path}={name}"),
                    None => path.clone(),
                })
                .collect()
        });
        let full_hash = if args.full_hash {
            Some(true)
        } else {
            args.hash_length.map(|_| false)
        };

        Self {
            entries,
            root: args.root.clone(),
            out_dir: args.out_dir.clone(),
            import_map: args.import_map.clone(),
            hash: args.hash.map(Into::into),
            hash_length: args.hash_length,
            full_hash,
            placement: args.placement.map(Into::into),
            dynamic_imports: args.dynamic_imports.map(Into::into),
            cycles: args.cycles.map(Into::into),
            shared_chunks: args.shared_chunks.then_some(true),
            base: args.base.clone(),
        }
    }
}

impl KilnConfig {
    /// Load configuration from every source, relative to `cwd`.
    pub fn load(args: &BuildArgs, cwd: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = Self::config_file(args.config.as_deref(), cwd)? {
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .map(|key| env_key(key.as_str()).into())
                .lowercase(false),
        );
        figment = figment.merge(Serialized::defaults(Overrides::from(args)));

        figment
            .extract()
            .map_err(|e| ConfigError::Extract(e.to_string()).into())
    }

    /// An explicit `--config` must exist; the default file is optional.
    fn config_file(explicit: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>> {
        match explicit {
            Some(path) => {
                let path = cwd.join(path);
                if path.is_file() {
                    Ok(Some(path))
                } else {
                    Err(ConfigError::NotFound(path).into())
                }
            }
            None => {
                let path = cwd.join(CONFIG_FILE);
                Ok(path.is_file().then_some(path))
            }
        }
    }
}

/// `OUT_DIR` -> `outDir`
pub(crate) fn env_key(key: &str) -> String {
    let mut camel = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !camel.is_empty();
        } else if upper {
            camel.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            camel.push(c.to_ascii_lowercase());
        }
    }
    camel
}
