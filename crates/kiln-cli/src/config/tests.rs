#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use std::path::{Path, PathBuf};

    use kiln_build::{HashLength, ImportMapSource, VersionPlacement};
    use tempfile::TempDir;

    use crate::cli::{BuildArgs, PlacementArg};
    use crate::config::loading::env_key;
    use crate::config::{CONFIG_FILE, KilnConfig};
    use crate::error::{CliError, ConfigError};

    fn write_config(dir: &Path, json: &str) {
        std::fs::write(dir.join(CONFIG_FILE), json).unwrap();
    }

    #[test]
    fn test_env_key_camel_case() {
        assert_eq!(env_key("OUT_DIR"), "outDir");
        assert_eq!(env_key("HASH_LENGTH"), "hashLength");
        assert_eq!(env_key("BASE"), "base");
        assert_eq!(env_key("_ROOT"), "root");
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = KilnConfig::load(&BuildArgs::default(), dir.path()).unwrap();
        assert_eq!(config, KilnConfig::default());
    }

    #[test]
    fn test_file_values_are_loaded() {
        let dir = TempDir::new().unwrap();
        write_config(
            dir.path(),
            r#"{ "entries": ["index.html"], "outDir": "public", "placement": "filename" }"#,
        );

        let config = KilnConfig::load(&BuildArgs::default(), dir.path()).unwrap();
        assert_eq!(config.entries, vec!["index.html".to_string()]);
        assert_eq!(config.out_dir, PathBuf::from("public"));
        assert_eq!(config.placement, VersionPlacement::Filename);
        assert_eq!(config.hash_length, 8);
    }

    #[test]
    fn test_cli_overrides_file_but_unset_flags_do_not() {
        let dir = TempDir::new().unwrap();
        write_config(
            dir.path(),
            r#"{ "entries": ["index.html"], "outDir": "public", "fullHash": true, "sharedChunks": true }"#,
        );

        let args = BuildArgs {
            placement: Some(PlacementArg::Filename),
            hash_length: Some(12),
            ..Default::default()
        };
        let config = KilnConfig::load(&args, dir.path()).unwrap();

        assert_eq!(config.entries, vec!["index.html".to_string()]);
        assert_eq!(config.out_dir, PathBuf::from("public"));
        assert!(config.shared_chunks);
        assert_eq!(config.placement, VersionPlacement::Filename);
        assert_eq!(config.hash_length, 12);
        assert!(!config.full_hash);
    }

    #[test]
    fn test_cli_entries_replace_file_entries() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), r#"{ "entries": ["a.html", "b.html"] }"#);

        let args = BuildArgs {
            entries: vec![("c.html".into(), Some("out/c.html".into()))],
            ..Default::default()
        };
        let config = KilnConfig::load(&args, dir.path()).unwrap();
        assert_eq!(config.entries, vec!["c.html=out/c.html".to_string()]);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let args = BuildArgs {
            config: Some(PathBuf::from("missing.json")),
            ..Default::default()
        };
        let err = KilnConfig::load(&args, dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), r#"{ "entries": ["a.html"], "minify": true }"#);
        let err = KilnConfig::load(&BuildArgs::default(), dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::Extract(_))));
    }

    #[test]
    fn test_validate_requires_entries() {
        let err = KilnConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "entries"
        ));
    }

    #[test]
    fn test_validate_base_and_hash_length() {
        let mut config = KilnConfig {
            entries: vec!["index.html".into()],
            ..Default::default()
        };
        config.base = "static".into();
        assert!(config.validate().is_err());

        config.base = "/static/".into();
        config.hash_length = 2;
        assert!(config.validate().is_err());

        config.full_hash = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_build_config_resolves_against_cwd() {
        let config = KilnConfig {
            entries: vec!["index.html".into(), "admin/index.html=admin.html".into()],
            root: PathBuf::from("site"),
            import_map: Some(PathBuf::from("site/importmap.json")),
            hash_length: 10,
            ..Default::default()
        };

        let build = config.to_build_config(Path::new("/work")).unwrap();
        assert_eq!(build.root_dir, PathBuf::from("/work/site"));
        assert_eq!(build.out_dir, PathBuf::from("/work/dist"));
        assert_eq!(
            build.entries,
            vec![
                (PathBuf::from("index.html"), "index.html".to_string()),
                (PathBuf::from("admin/index.html"), "admin.html".to_string()),
            ]
        );
        assert_eq!(
            build.import_map,
            Some(ImportMapSource::Path(PathBuf::from("/work/site/importmap.json")))
        );
        assert_eq!(build.versioning.length, HashLength::Short(10));
    }
}
