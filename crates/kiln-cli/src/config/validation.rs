use crate::cli::parse_entry;
use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

impl KilnConfig {
    /// Validate the merged configuration.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "entries".to_string(),
                value: "[]".to_string(),
                hint: "Pass entries on the command line or list them in kiln.config.json"
                    .to_string(),
            }
            .into());
        }

        for entry in &self.entries {
            parse_entry(entry).map_err(|hint| ConfigError::InvalidValue {
                field: "entries".to_string(),
                value: entry.clone(),
                hint,
            })?;
        }

        if !self.full_hash && !(4..=64).contains(&self.hash_length) {
            return Err(ConfigError::InvalidValue {
                field: "hashLength".to_string(),
                value: self.hash_length.to_string(),
                hint: "Use a value between 4 and 64, or set fullHash".to_string(),
            }
            .into());
        }

        if !self.base.starts_with('/') || !self.base.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "base".to_string(),
                value: self.base.clone(),
                hint: "Base must start and end with '/', e.g. \"/static/\"".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
