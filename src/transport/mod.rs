//! Transport seams to the external object store
//!
//! - `http`: reqwest implementation against the store's REST API
//!
//! The orchestrator and folder operations only see the traits below, so
//! tests and alternative back ends can stand in for the HTTP client.

mod http;

use crate::error::StoreResult;
use crate::local::LocalFile;
use crate::object::ObjectEntry;
use async_trait::async_trait;

pub use http::{create_bucket, delete_bucket, list_buckets, HttpStore};

/// Receives the cumulative number of bytes handed to the network
pub type ProgressFn<'a> = &'a (dyn Fn(u64) + Send + Sync);

/// One object upload: `file` lands at `prefix + name`
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
    pub file: &'a LocalFile,
    /// Overwrite an existing object with the same key
    pub replace: bool,
}

#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// List entries under `prefix` (the bucket root when `None`)
    async fn list_objects(&self, prefix: Option<&str>) -> StoreResult<Vec<ObjectEntry>>;
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(&self, request: UploadRequest<'_>, progress: ProgressFn<'_>) -> StoreResult<()>;
}

#[async_trait]
pub trait ObjectMover: Send + Sync {
    /// Rename `source_key` to `destination_key`; the source is removed
    async fn move_object(&self, source_key: &str, destination_key: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait FolderCreator: Send + Sync {
    /// Create a zero-byte marker; `key` ends with `/`
    async fn create_folder(&self, key: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait ObjectRemover: Send + Sync {
    async fn delete_object(&self, key: &str) -> StoreResult<()>;
}
