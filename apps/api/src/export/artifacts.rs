use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::export::ExportError;

/// Pointer to a stored export artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
    pub key: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<ArtifactRef, ExportError>;
    async fn get(&self, key: &str) -> Result<Option<Bytes>, ExportError>;
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO
// ────────────────────────────────────────────────────────────────────────────

pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<ArtifactRef, ExportError> {
        let size_bytes = bytes.len() as u64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| ExportError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded export artifact to s3://{}/{}", self.bucket, key);
        Ok(ArtifactRef {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, ExportError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(ExportError::Storage(format!("S3 download failed: {service_error}")));
            }
        };
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ExportError::Storage(format!("S3 body read failed: {e}")))?;
        Ok(Some(data.into_bytes()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> ExportError {
    ExportError::Storage("memory artifact store lock poisoned".to_string())
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<ArtifactRef, ExportError> {
        let size_bytes = bytes.len() as u64;
        self.objects
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(ArtifactRef {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, ExportError> {
        let objects = self.objects.lock().map_err(poisoned)?;
        Ok(objects.get(key).map(|(bytes, _)| bytes.clone()))
    }
}
