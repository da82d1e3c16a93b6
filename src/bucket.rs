//! Bucket naming rules and bucket create/remove

use crate::config::ApiConfig;
use crate::error::{StoreError, StoreResult};
use crate::transport::{self, HttpStore, ObjectLister};
use log::{info, warn};

const RESERVED_PREFIXES: [&str; 3] = ["xn--", "sthree-", "amzn-s3-demo-"];
const RESERVED_SUFFIXES: [&str; 4] = ["-s3alias", "--ol-s3", ".mrap", "--x-s3"];

fn invalid(message: &str) -> StoreError {
    StoreError::InvalidName(message.to_string())
}

fn looks_like_ip(name: &str) -> bool {
    let groups: Vec<&str> = name.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| !g.is_empty() && g.chars().all(|c| c.is_ascii_digit()))
}

/// Trimmed bucket name if it follows S3 bucket naming rules
pub fn validate_bucket_name(name: &str) -> StoreResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("Please enter a bucket name"));
    }
    if name.len() < 3 || name.len() > 63 {
        return Err(invalid(
            "Bucket name must be between 3 and 63 characters long",
        ));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-';
    if !name.chars().all(allowed) {
        return Err(invalid(
            "Bucket name can only contain lowercase letters, numbers, periods (.), and hyphens (-)",
        ));
    }
    let edge = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge(name.chars().next()) || !edge(name.chars().last()) {
        return Err(invalid(
            "Bucket name must begin and end with a letter or number",
        ));
    }
    if name.contains("..") {
        return Err(invalid(
            "Bucket name must not contain two adjacent periods",
        ));
    }
    if looks_like_ip(name) {
        return Err(invalid(
            "Bucket name must not be formatted as an IP address",
        ));
    }
    if RESERVED_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return Err(invalid("Bucket name contains a reserved prefix"));
    }
    if RESERVED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return Err(invalid("Bucket name contains a reserved suffix"));
    }
    Ok(name)
}

/// Validate `name` and create the bucket; returns the name used
pub async fn create_bucket(config: &ApiConfig, name: &str) -> StoreResult<String> {
    let name = validate_bucket_name(name)?;
    transport::create_bucket(config, name).await?;
    info!("bucket_created: {}", name);
    Ok(name.to_string())
}

/// Delete a bucket, refusing while it still holds objects
pub async fn delete_empty_bucket(config: &ApiConfig, name: &str) -> StoreResult<()> {
    let store = HttpStore::new(config, name)?;
    let entries = store.list_objects(None).await?;
    if !entries.is_empty() {
        warn!("bucket_delete_refused: {} entries={}", name, entries.len());
        return Err(StoreError::BucketNotEmpty(name.to_string()));
    }

    transport::delete_bucket(config, name).await?;
    info!("bucket_deleted: {}", name);
    Ok(())
}
