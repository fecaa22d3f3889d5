/// Parse `path` or `path=name`.
///
/// The output name must be a relative path that stays inside the output
/// directory.
pub fn parse_entry(s: &str) -> Result<(String, Option<String>), String> {
    let (path, name) = match s.split_once('=') {
        Some((path, name)) => (path.trim(), Some(name.trim())),
        None => (s.trim(), None),
    };

    if path.is_empty() {
        return Err(format!("Entry path cannot be empty: '{}'", s));
    }
    if let Some(name) = name {
        if name.is_empty() {
            return Err(format!("Output name after '=' cannot be empty: '{}'", s));
        }
        if name.starts_with('/') || name.split('/').any(|part| part == "..") {
            return Err(format!(
                "Output name must stay inside the output directory: '{}'",
                name
            ));
        }
    }

    Ok((path.to_string(), name.map(str::to_string)))
}

/// Parse a hash length between 4 and 64.
pub fn parse_hash_length(s: &str) -> Result<usize, String> {
    let length: usize = s
        .parse()
        .map_err(|_| format!("Hash length must be a number: '{}'", s))?;
    if !(4..=64).contains(&length) {
        return Err(format!("Hash length must be between 4 and 64, got {}", length));
    }
    Ok(length)
}
