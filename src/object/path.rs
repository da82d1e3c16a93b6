//! Folder/prefix semantics over the flat key namespace

use std::collections::BTreeSet;

/// Normalize a listing/upload prefix. Empty stays empty (bucket root),
/// anything else gains a trailing `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}

/// Normalize a folder path by appending a trailing `/` if absent
pub fn normalize_folder_path(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Key stripped of everything up to and including the last `/`
pub fn basename(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

/// Full key for `name` under an (already normalized or empty) prefix
pub fn join_key(prefix: &str, name: &str) -> String {
    format!("{}{}", normalize_prefix(prefix), name)
}

/// Destination key when moving `source_key` into `folder`
pub fn move_destination_key(source_key: &str, folder: &str) -> String {
    format!("{}{}", normalize_folder_path(folder), basename(source_key))
}

/// All parent prefixes (including the root `""`) of the given keys.
///
/// Uploading "a/b/file.txt" affects the listings "", "a/" and "a/b/".
pub fn ancestor_prefixes(keys: &[String]) -> Vec<String> {
    let mut paths: BTreeSet<String> = BTreeSet::new();

    for key in keys {
        paths.insert(String::new());

        let mut end = 0;
        while let Some(offset) = key[end..].find('/') {
            end += offset + 1;
            // A key that is itself a folder marker is its own listing
            if end == key.len() {
                break;
            }
            if end > 1 {
                paths.insert(key[..end].to_string());
            }
        }
    }

    paths.into_iter().collect()
}
