//! Upload orchestration
//!
//! Provides batch uploads into a bucket prefix with:
//! - Exact-match conflict detection against a listing snapshot
//! - One-at-a-time conflict resolution over a prompt channel (skip/rename/replace)
//! - Deterministic `name (n).ext` renames
//! - Concurrent transfers with per-item progress and a single settlement signal

mod conflict;
mod naming;
mod orchestrator;
mod types;

pub use conflict::{
    detect_conflicts, listing_snapshot, plan_uploads, resolve_conflicts, ConflictPrompt,
};
pub use naming::{generate_unique_name, generate_unique_name_with, split_extension};
pub use orchestrator::{UploadChannels, UploadOrchestrator};
pub use types::{
    BatchReport, ConflictRecord, PendingUpload, Resolution, UploadEvent, UploadProgress,
    UploadStatus,
};
