//! Listing entry types

use serde::{Deserialize, Serialize};

/// One entry of a bucket listing.
///
/// Folders are not physical objects: a key ending in `/`, or a zero-size
/// entry without a last-modified timestamp, is a prefix marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl ObjectEntry {
    pub fn file(name: impl Into<String>, size: u64, last_modified: impl Into<String>) -> Self {
        ObjectEntry {
            name: name.into(),
            size,
            last_modified: Some(last_modified.into()),
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        ObjectEntry {
            name: name.into(),
            size: 0,
            last_modified: None,
        }
    }

    // An empty object that carries a timestamp is a regular file.
    pub fn is_folder(&self) -> bool {
        if self.name.is_empty() {
            return false;
        }
        self.name.ends_with('/') || (self.size == 0 && self.last_modified.is_none())
    }

    /// Last path segment, without the trailing slash for folders
    pub fn display_name(&self) -> &str {
        let name = if self.is_folder() {
            self.name.strip_suffix('/').unwrap_or(&self.name)
        } else {
            &self.name
        };
        match name.rsplit('/').next() {
            Some(last) if !last.is_empty() => last,
            _ => name,
        }
    }
}

/// A bucket as listed by the store.
///
/// The listing is usually a plain array of names; an object form with a
/// creation date is accepted as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "BucketListing")]
pub struct Bucket {
    pub name: String,
    pub creation_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BucketListing {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        creation_date: Option<String>,
    },
}

impl From<BucketListing> for Bucket {
    fn from(listing: BucketListing) -> Self {
        match listing {
            BucketListing::Name(name) => Bucket {
                name,
                creation_date: None,
            },
            BucketListing::Detailed {
                name,
                creation_date,
            } => Bucket {
                name,
                creation_date,
            },
        }
    }
}

/// Human readable size with a 1024 base (`0 Bytes`, `1.5 KB`, `2 MB`)
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[unit])
}
