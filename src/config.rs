//! API endpoint configuration and URL construction

use crate::error::{StoreError, StoreResult};
use crate::object::normalize_prefix;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "v1";

/// Request timeout used when none is configured (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_URL: &str = "RUSTDOK_API_URL";
pub const ENV_API_VERSION: &str = "RUSTDOK_API_VERSION";
pub const ENV_API_TIMEOUT: &str = "RUSTDOK_API_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_version: String,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: default_timeout(),
        }
    }

    /// Build the configuration from the process environment.
    ///
    /// The API URL is required; version and timeout fall back to defaults.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_API_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                StoreError::Config(format!(
                    "API URL is not defined. Check your environment variable {}.",
                    ENV_API_URL
                ))
            })?;

        let api_version = lookup(ENV_API_VERSION)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let timeout = match lookup(ENV_API_TIMEOUT) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    StoreError::Config(format!("{} must be a number of seconds", ENV_API_TIMEOUT))
                })?;
                Duration::from_secs(secs)
            }
            None => default_timeout(),
        };

        Ok(ApiConfig {
            base_url,
            api_version,
            timeout,
        })
    }

    /// Root of every API route: `{base_url}/api/{version}`
    pub fn api_root(&self) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version
        )
    }

    pub fn buckets_url(&self) -> String {
        format!("{}/buckets", self.api_root())
    }

    /// Bucket resource itself (delete)
    pub fn bucket_resource_url(&self, bucket: &str) -> String {
        format!("{}/bucket/{}", self.api_root(), urlencoding::encode(bucket))
    }

    /// Object listing / upload URL for a bucket, scoped to an optional prefix
    pub fn bucket_url(&self, bucket: &str, prefix: Option<&str>) -> String {
        let base = format!(
            "{}/bucket/{}/objects",
            self.api_root(),
            urlencoding::encode(bucket)
        );
        match prefix.map(normalize_prefix).filter(|p| !p.is_empty()) {
            Some(p) => format!("{}?prefix={}", base, urlencoding::encode(&p)),
            None => base,
        }
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/bucket/{}/object/{}",
            self.api_root(),
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        )
    }

    pub fn download_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/bucket/{}/download/{}",
            self.api_root(),
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        )
    }

    pub fn folders_url(&self, bucket: &str) -> String {
        format!(
            "{}/bucket/{}/folders",
            self.api_root(),
            urlencoding::encode(bucket)
        )
    }

    pub fn move_url(&self, bucket: &str) -> String {
        format!(
            "{}/bucket/{}/move",
            self.api_root(),
            urlencoding::encode(bucket)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn from_lookup_requires_api_url() {
        let err = ApiConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let config =
            ApiConfig::from_lookup(lookup_from(&[(ENV_API_URL, "http://store:8080")])).unwrap();
        assert_eq!(config.api_version, "v1");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn from_lookup_rejects_bad_timeout() {
        let err = ApiConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "http://store"),
            (ENV_API_TIMEOUT, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn bucket_url_normalizes_and_encodes_prefix() {
        let config = ApiConfig::new("http://store:8080/");
        assert_eq!(
            config.bucket_url("photos", None),
            "http://store:8080/api/v1/bucket/photos/objects"
        );
        assert_eq!(
            config.bucket_url("photos", Some("")),
            "http://store:8080/api/v1/bucket/photos/objects"
        );
        assert_eq!(
            config.bucket_url("photos", Some("2024/trip")),
            "http://store:8080/api/v1/bucket/photos/objects?prefix=2024%2Ftrip%2F"
        );
    }

    #[test]
    fn object_url_encodes_whole_key() {
        let config = ApiConfig::new("http://store");
        assert_eq!(
            config.object_url("b", "docs/a b.txt"),
            "http://store/api/v1/bucket/b/object/docs%2Fa%20b.txt"
        );
        assert_eq!(
            config.download_url("b", "x.png"),
            "http://store/api/v1/bucket/b/download/x.png"
        );
    }
}
