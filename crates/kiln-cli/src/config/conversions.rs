use std::path::Path;

use kiln_build::{BuildConfig, HashLength, ImportMapSource, VersioningConfig};

use crate::cli::parse_entry;
use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

impl KilnConfig {
    /// Convert into the library config. Relative paths resolve against `cwd`.
    pub fn to_build_config(&self, cwd: &Path) -> Result<BuildConfig> {
        self.validate()?;

        let mut config = BuildConfig::new(cwd.join(&self.root), cwd.join(&self.out_dir));
        for entry in &self.entries {
            let (path, name) = parse_entry(entry).map_err(|hint| ConfigError::InvalidValue {
                field: "entries".to_string(),
                value: entry.clone(),
                hint,
            })?;
            let name = name.unwrap_or_else(|| path.clone());
            config = config.entry(path, name);
        }

        if let Some(import_map) = &self.import_map {
            config = config.import_map(ImportMapSource::Path(cwd.join(import_map)));
        }

        let length = if self.full_hash {
            HashLength::Full
        } else {
            HashLength::Short(self.hash_length)
        };

        Ok(config
            .versioning(VersioningConfig {
                algorithm: self.hash,
                length,
                placement: self.placement,
                dynamic_imports: self.dynamic_imports,
                cycles: self.cycles,
            })
            .shared_chunks(self.shared_chunks)
            .base(self.base.clone()))
    }
}
