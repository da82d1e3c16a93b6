//! Upload orchestrator - conflict resolution, batch execution, settlement

use super::conflict::{detect_conflicts, plan_uploads, resolve_conflicts, ConflictPrompt};
use super::types::{
    percent_of, BatchReport, PendingUpload, UploadEvent, UploadProgress, UploadStatus,
};
use crate::error::{StoreError, StoreResult};
use crate::local::LocalFile;
use crate::object::{ancestor_prefixes, normalize_prefix, ObjectEntry};
use crate::transport::{UploadRequest, UploadTransport};
use chrono::Utc;
use futures_util::future::join_all;
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;

type SettledCallback = Box<dyn Fn(&BatchReport) + Send + Sync>;

static BATCH_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn build_batch_id() -> String {
    format!(
        "upload-{}-{}",
        Utc::now().timestamp_millis(),
        BATCH_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

/// Receiving ends handed to the UI layer
pub struct UploadChannels {
    pub events: mpsc::UnboundedReceiver<UploadEvent>,
    /// Conflict dialog requests, one outstanding at a time
    pub prompts: mpsc::Receiver<ConflictPrompt>,
}

pub struct UploadOrchestrator {
    transport: Arc<dyn UploadTransport>,
    events: mpsc::UnboundedSender<UploadEvent>,
    prompts: mpsc::Sender<ConflictPrompt>,
    on_settled: Option<SettledCallback>,
    active: Mutex<Vec<PendingUpload>>,
}

impl UploadOrchestrator {
    pub fn new(transport: Arc<dyn UploadTransport>) -> (Self, UploadChannels) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (prompts_tx, prompts_rx) = mpsc::channel(1);
        let orchestrator = UploadOrchestrator {
            transport,
            events: events_tx,
            prompts: prompts_tx,
            on_settled: None,
            active: Mutex::new(Vec::new()),
        };
        (
            orchestrator,
            UploadChannels {
                events: events_rx,
                prompts: prompts_rx,
            },
        )
    }

    /// Register the sink invoked once per settled batch
    pub fn with_settled_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&BatchReport) + Send + Sync + 'static,
    {
        self.on_settled = Some(Box::new(callback));
        self
    }

    /// Items of the current (or last) batch
    pub fn active_uploads(&self) -> Vec<PendingUpload> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discard the tracked items (progress view cleared)
    pub fn clear(&self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Turn a selection into a conflict-free plan and upload it.
    ///
    /// `existing` is the listing snapshot taken at submission time; it is
    /// not re-validated while the batch runs.
    pub async fn submit_batch(
        &self,
        files: Vec<LocalFile>,
        target_prefix: &str,
        existing: &[ObjectEntry],
    ) -> StoreResult<BatchReport> {
        if files.is_empty() {
            return Err(StoreError::EmptyBatch);
        }

        let prefix = normalize_prefix(target_prefix);
        let mut conflicts = detect_conflicts(&files, &prefix, existing);
        info!(
            "submit_batch: {} files prefix={:?} conflicts={}",
            files.len(),
            prefix,
            conflicts.len()
        );

        if !conflicts.is_empty() {
            resolve_conflicts(&self.prompts, &mut conflicts).await;
        }

        let plan = plan_uploads(files, &prefix, existing, &conflicts);
        Ok(self.execute_batch(plan, &prefix).await)
    }

    /// Upload every planned item concurrently and settle the batch once.
    ///
    /// Item failures are recorded in the report and never cancel siblings.
    pub async fn execute_batch(&self, plan: Vec<PendingUpload>, target_prefix: &str) -> BatchReport {
        let prefix = normalize_prefix(target_prefix);
        let batch_id = build_batch_id();
        info!("batch_start: {} items={}", batch_id, plan.len());

        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            *active = plan.clone();
        }
        let _ = self.events.send(UploadEvent::BatchStarted {
            batch_id: batch_id.clone(),
            items: plan.clone(),
        });

        let uploads = plan
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.run_item(&batch_id, &prefix, index, item));
        let items = join_all(uploads).await;

        let completed_keys: Vec<String> = items
            .iter()
            .filter(|item| item.status == UploadStatus::Completed)
            .map(|item| item.full_path.clone())
            .collect();
        let report = BatchReport {
            batch_id: batch_id.clone(),
            items,
            affected_prefixes: if completed_keys.is_empty() {
                Vec::new()
            } else {
                ancestor_prefixes(&completed_keys)
            },
        };

        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            *active = report.items.clone();
        }

        info!(
            "batch_settled: {} completed={} failed={}",
            batch_id,
            report.completed(),
            report.failed()
        );
        let _ = self.events.send(UploadEvent::BatchSettled(report.clone()));
        if let Some(callback) = &self.on_settled {
            callback(&report);
        }

        report
    }

    async fn run_item(
        &self,
        batch_id: &str,
        prefix: &str,
        index: usize,
        mut item: PendingUpload,
    ) -> PendingUpload {
        self.set_status(batch_id, index, &mut item, UploadStatus::Uploading, None);

        let total = item.size_bytes;
        let start_time = Instant::now();
        let last_percent = AtomicU64::new(0);
        let report = |sent: u64, percent: u32| {
            last_percent.store(percent as u64, Ordering::Relaxed);
            self.update_active(index, |active| active.progress_percent = percent);

            let elapsed = start_time.elapsed().as_secs_f64();
            let speed = if elapsed > 0.0 {
                sent as f64 / elapsed
            } else {
                0.0
            };
            let _ = self.events.send(UploadEvent::Progress(UploadProgress {
                batch_id: batch_id.to_string(),
                index,
                percent,
                uploaded_bytes: sent,
                total_bytes: total,
                speed,
            }));
        };
        let on_progress = |sent: u64| report(sent, percent_of(sent, total));

        let request = UploadRequest {
            prefix,
            name: &item.target_name,
            file: &item.file,
            replace: item.replace,
        };
        let result = self.transport.upload(request, &on_progress).await;
        item.progress_percent = last_percent.load(Ordering::Relaxed) as u32;

        match result {
            Ok(()) => {
                if item.progress_percent < 100 {
                    report(total, 100);
                    item.progress_percent = 100;
                }
                self.set_status(batch_id, index, &mut item, UploadStatus::Completed, None);
            }
            Err(e) => {
                self.set_status(
                    batch_id,
                    index,
                    &mut item,
                    UploadStatus::Error,
                    Some(e.to_string()),
                );
            }
        }

        item
    }

    fn set_status(
        &self,
        batch_id: &str,
        index: usize,
        item: &mut PendingUpload,
        status: UploadStatus,
        error: Option<String>,
    ) {
        match error.as_ref() {
            Some(err) => warn!(
                "upload_status: {}#{} {} -> {} error={}",
                batch_id, index, item.full_path, status, err
            ),
            None => info!(
                "upload_status: {}#{} {} -> {}",
                batch_id, index, item.full_path, status
            ),
        }

        item.status = status;
        item.error = error.clone();
        let progress = item.progress_percent;
        self.update_active(index, |active| {
            active.status = status;
            active.error = error.clone();
            active.progress_percent = progress;
        });
        let _ = self.events.send(UploadEvent::StatusChanged {
            batch_id: batch_id.to_string(),
            index,
            status,
            error,
        });
    }

    fn update_active<F>(&self, index: usize, update: F)
    where
        F: FnOnce(&mut PendingUpload),
    {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = active.get_mut(index) {
            update(entry);
        }
    }
}
