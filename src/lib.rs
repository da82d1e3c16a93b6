//! Client-side upload and folder engine for a bucket-based object store.
//!
//! Folders are key prefixes over a flat namespace. Uploads are planned
//! against a listing snapshot, conflicts are resolved one at a time through
//! a prompt channel, and transfers run concurrently with per-item progress.

pub mod bucket;
pub mod config;
pub mod error;
pub mod folder;
pub mod local;
pub mod object;
pub mod transport;
pub mod upload;

pub use config::ApiConfig;
pub use error::{StoreError, StoreResult};
pub use local::{collect_folder_files, LocalFile, UploadSource};
pub use object::{Bucket, ObjectEntry};
pub use transport::HttpStore;
pub use upload::{
    listing_snapshot, BatchReport, ConflictPrompt, Resolution, UploadChannels, UploadEvent,
    UploadOrchestrator, UploadStatus,
};
