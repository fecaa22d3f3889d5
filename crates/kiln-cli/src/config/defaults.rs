use std::path::PathBuf;

pub fn default_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_hash_length() -> usize {
    8
}

pub fn default_base() -> String {
    "/".to_string()
}
