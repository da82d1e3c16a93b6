//! HTTP transport for the object store REST API

use super::{
    FolderCreator, ObjectLister, ObjectMover, ObjectRemover, ProgressFn, UploadRequest,
    UploadTransport,
};
use crate::config::ApiConfig;
use crate::error::{StoreError, StoreResult};
use crate::local::UploadSource;
use crate::object::{basename, join_key, Bucket, ObjectEntry};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

/// Upload body chunk size (256 KiB); progress is reported per chunk
const UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Debug, Serialize)]
struct MoveBody<'a> {
    source_key: &'a str,
    destination_key: &'a str,
}

/// Body of the folder and bucket create calls
#[derive(Debug, Serialize)]
struct NameBody<'a> {
    name: &'a str,
}

struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

fn build_client(config: &ApiConfig) -> StoreResult<Client> {
    Client::builder()
        .connect_timeout(config.timeout)
        .build()
        .map_err(|e| StoreError::Config(format!("Failed to create HTTP client: {}", e)))
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(StoreError::from_status(status, &text))
}

/// List all buckets visible to the API
pub async fn list_buckets(config: &ApiConfig) -> StoreResult<Vec<Bucket>> {
    let client = build_client(config)?;
    let response = client
        .get(config.buckets_url())
        .timeout(config.timeout)
        .send()
        .await?;
    let buckets = check_status(response).await?.json::<Vec<Bucket>>().await?;
    Ok(buckets)
}

/// Create a bucket; 409 means the name is already taken
pub async fn create_bucket(config: &ApiConfig, name: &str) -> StoreResult<()> {
    let client = build_client(config)?;
    let response = client
        .post(config.buckets_url())
        .timeout(config.timeout)
        .json(&NameBody { name })
        .send()
        .await?;
    match check_status(response).await {
        Ok(_) => Ok(()),
        Err(StoreError::Conflict(_)) => Err(StoreError::AlreadyExists(name.to_string())),
        Err(e) => Err(e),
    }
}

pub async fn delete_bucket(config: &ApiConfig, name: &str) -> StoreResult<()> {
    let client = build_client(config)?;
    let response = client
        .delete(config.bucket_resource_url(name))
        .timeout(config.timeout)
        .send()
        .await?;
    check_status(response).await?;
    Ok(())
}

/// Bucket-scoped client for the object store
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    config: ApiConfig,
    bucket: String,
}

impl HttpStore {
    pub fn new(config: &ApiConfig, bucket: impl Into<String>) -> StoreResult<Self> {
        Ok(HttpStore {
            client: build_client(config)?,
            config: config.clone(),
            bucket: bucket.into(),
        })
    }

    pub fn download_url(&self, key: &str) -> String {
        self.config.download_url(&self.bucket, key)
    }

    async fn open_source(
        source: &UploadSource,
    ) -> StoreResult<Box<dyn AsyncRead + Send + Sync + Unpin>> {
        match source {
            UploadSource::File(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::new(file))
            }
            UploadSource::Memory(data) => {
                Ok(Box::new(std::io::Cursor::new(SharedBytes(data.clone()))))
            }
        }
    }
}

#[async_trait]
impl ObjectLister for HttpStore {
    async fn list_objects(&self, prefix: Option<&str>) -> StoreResult<Vec<ObjectEntry>> {
        let url = self.config.bucket_url(&self.bucket, prefix);
        debug!("list_objects: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.config.timeout)
            .send()
            .await?;
        let entries = check_status(response)
            .await?
            .json::<Vec<ObjectEntry>>()
            .await?;

        info!(
            "list_objects: {} prefix={:?} entries={}",
            self.bucket,
            prefix,
            entries.len()
        );
        Ok(entries)
    }
}

#[async_trait]
impl UploadTransport for HttpStore {
    async fn upload(&self, request: UploadRequest<'_>, progress: ProgressFn<'_>) -> StoreResult<()> {
        // Names from an expanded folder carry their own sub-prefix
        let key = join_key(request.prefix, request.name);
        let file_name = basename(&key).to_string();
        let upload_prefix = &key[..key.len() - file_name.len()];
        if file_name.is_empty() {
            return Err(StoreError::InvalidName(format!(
                "upload target {} has no file name",
                key
            )));
        }

        let mut url = self.config.bucket_url(&self.bucket, Some(upload_prefix));
        if request.replace {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str("replace=true");
        }

        let reader = Self::open_source(&request.file.source).await?;
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();
        let mut sent: u64 = 0;
        let stream = ReaderStream::with_capacity(reader, UPLOAD_CHUNK_SIZE).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                let _ = sent_tx.send(sent);
            }
            chunk
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), request.file.size)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("objects", part);

        info!(
            "upload_start: {}/{} size={} replace={}",
            self.bucket, key, request.file.size, request.replace
        );

        let send = self.client.post(&url).multipart(form).send();
        tokio::pin!(send);
        let result = loop {
            tokio::select! {
                result = &mut send => break result,
                Some(bytes) = sent_rx.recv() => progress(bytes),
            }
        };
        while let Ok(bytes) = sent_rx.try_recv() {
            progress(bytes);
        }

        match result {
            Ok(response) => {
                check_status(response).await?;
                info!("upload_done: {}/{}", self.bucket, key);
                Ok(())
            }
            Err(e) => {
                warn!("upload_failed: {}/{} error={}", self.bucket, key, e);
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl ObjectMover for HttpStore {
    async fn move_object(&self, source_key: &str, destination_key: &str) -> StoreResult<()> {
        info!(
            "move_object: {} {} -> {}",
            self.bucket, source_key, destination_key
        );
        let response = self
            .client
            .post(self.config.move_url(&self.bucket))
            .timeout(self.config.timeout)
            .json(&MoveBody {
                source_key,
                destination_key,
            })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl FolderCreator for HttpStore {
    async fn create_folder(&self, key: &str) -> StoreResult<()> {
        // The folders endpoint takes the path without the trailing slash
        let name = key.strip_suffix('/').unwrap_or(key);
        info!("create_folder: {} {}", self.bucket, key);

        let response = self
            .client
            .post(self.config.folders_url(&self.bucket))
            .timeout(self.config.timeout)
            .json(&NameBody { name })
            .send()
            .await?;
        match check_status(response).await {
            Ok(_) => Ok(()),
            Err(StoreError::Conflict(_)) => Err(StoreError::AlreadyExists(key.to_string())),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ObjectRemover for HttpStore {
    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        info!("delete_object: {} {}", self.bucket, key);
        let response = self
            .client
            .delete(self.config.object_url(&self.bucket, key))
            .timeout(self.config.timeout)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
