//! Unique-name generation for renamed uploads

use std::collections::HashSet;

/// Split a name into `(base, ext)` at the last `.` of its final segment.
/// `ext` keeps the dot; no dot means an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let segment_start = name.rfind('/').map(|idx| idx + 1).unwrap_or(0);
    match name[segment_start..].rfind('.') {
        Some(dot) => name.split_at(segment_start + dot),
        None => (name, ""),
    }
}

/// First `"{base} (n){ext}"` with n = 1, 2, ... that is not in `existing`
pub fn generate_unique_name(original_name: &str, existing: &HashSet<String>) -> String {
    generate_unique_name_with(original_name, |candidate| existing.contains(candidate))
}

/// Same sequence as [`generate_unique_name`], with a caller-supplied test
/// for names that are already taken. Terminates as long as only finitely
/// many names are taken.
pub fn generate_unique_name_with<F>(original_name: &str, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let (base, ext) = split_extension(original_name);
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{} ({}){}", base, counter, ext);
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
