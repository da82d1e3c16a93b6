//! Object model - listing entries and key/prefix semantics
//!
//! This module is organized into submodules:
//! - `types`: Listing entries, buckets and display helpers
//! - `path`: Folder/prefix normalization and key arithmetic

mod path;
mod types;

pub use path::{
    ancestor_prefixes, basename, join_key, move_destination_key, normalize_folder_path,
    normalize_prefix,
};
pub use types::{format_size, Bucket, ObjectEntry};
