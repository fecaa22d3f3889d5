#[cfg(test)]
mod tests {
    use crate::cli::validation::{parse_entry, parse_hash_length};
    use crate::cli::{Cli, Command, PlacementArg};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_parse_entry_plain_and_renamed() {
        assert_eq!(parse_entry("index.html"), Ok(("index.html".into(), None)));
        assert_eq!(
            parse_entry("src/index.html=index.html"),
            Ok(("src/index.html".into(), Some("index.html".into())))
        );
    }

    #[test]
    fn test_parse_entry_rejects_escaping_names() {
        assert!(parse_entry("=x.html").is_err());
        assert!(parse_entry("a.html=").is_err());
        assert!(parse_entry("a.html=/abs.html").is_err());
        assert!(parse_entry("a.html=../up.html").is_err());
    }

    #[test]
    fn test_parse_hash_length_bounds() {
        assert_eq!(parse_hash_length("8"), Ok(8));
        assert_eq!(parse_hash_length("64"), Ok(64));
        assert!(parse_hash_length("3").is_err());
        assert!(parse_hash_length("65").is_err());
        assert!(parse_hash_length("eight").is_err());
    }

    #[test]
    fn test_build_command_parses_flags() {
        let cli = Cli::try_parse_from([
            "kiln",
            "build",
            "index.html",
            "admin/index.html=admin.html",
            "--root",
            "site",
            "--out-dir",
            "public",
            "--placement",
            "filename",
            "--hash-length",
            "12",
            "--shared-chunks",
        ])
        .unwrap();

        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.entries.len(), 2);
        assert_eq!(args.entries[1].1.as_deref(), Some("admin.html"));
        assert_eq!(args.root, Some(PathBuf::from("site")));
        assert_eq!(args.out_dir, Some(PathBuf::from("public")));
        assert_eq!(args.placement, Some(PlacementArg::Filename));
        assert_eq!(args.hash_length, Some(12));
        assert!(args.shared_chunks);
    }

    #[test]
    fn test_hash_length_conflicts_with_full_hash() {
        let result = Cli::try_parse_from(["kiln", "build", "--hash-length", "8", "--full-hash"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["kiln", "-v", "-q", "build"]).is_err());
    }

    #[test]
    fn test_watch_shares_build_flags() {
        let cli = Cli::try_parse_from([
            "kiln",
            "watch",
            "index.html",
            "--debounce",
            "250",
            "--import-map",
            "importmap.json",
        ])
        .unwrap();

        let Command::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.debounce, 250);
        assert_eq!(args.build.import_map, Some(PathBuf::from("importmap.json")));
    }
}
