use crate::config::StorageConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::MetadataDirective;
use aws_sdk_s3::Client as S3Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Reference to one stored object, addressed by its backend-assigned key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    key: String,
}

impl ObjectHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Object storage collaborator: byte blobs plus key-value metadata behind
/// string keys.
///
/// Injected into the upload pipeline and gallery assembler at construction
/// time so tests can substitute a double.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write raw bytes under the given key.
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<ObjectHandle>;

    /// Replace the object's user metadata.
    async fn set_metadata(
        &self,
        handle: &ObjectHandle,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// List objects under a key prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectHandle>>;

    /// Read the object's user metadata.
    async fn get_metadata(&self, handle: &ObjectHandle) -> Result<HashMap<String, String>>;

    /// Resolve a retrievable (possibly expiring) URL for the object.
    async fn download_url(&self, handle: &ObjectHandle) -> Result<String>;
}

/// S3-backed object store.
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    presigned_url_expiry: Duration,
}

impl S3ObjectStore {
    /// Create a new S3 object store from configuration.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 object store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            presigned_url_expiry: Duration::from_secs(config.presigned_url_expiry_secs),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, bytes), fields(size_bytes = bytes.len()))]
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<ObjectHandle> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .context("failed to upload object to S3")?;

        debug!(key, "object uploaded");
        Ok(ObjectHandle::new(key))
    }

    async fn set_metadata(
        &self,
        handle: &ObjectHandle,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        // S3 has no in-place metadata update; the idiom is a self-copy with
        // the REPLACE directive.
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .key(handle.key())
            .copy_source(format!("{}/{}", self.bucket, handle.key()))
            .metadata_directive(MetadataDirective::Replace)
            .set_metadata(Some(metadata))
            .send()
            .await
            .context("failed to attach object metadata")?;

        debug!(key = handle.key(), "object metadata attached");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectHandle>> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .context("failed to list objects")?;

        let handles: Vec<ObjectHandle> = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(ObjectHandle::new))
            .collect();

        Ok(handles)
    }

    async fn get_metadata(&self, handle: &ObjectHandle) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(handle.key())
            .send()
            .await
            .context("failed to read object metadata")?;

        Ok(response.metadata().cloned().unwrap_or_default())
    }

    async fn download_url(&self, handle: &ObjectHandle) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(self.presigned_url_expiry)
            .context("failed to create presigning config")?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(handle.key())
            .presigned(presigning_config)
            .await
            .context("failed to generate download URL")?;

        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_handle_identity() {
        let a = ObjectHandle::new("files/geoCamera-x.jpg");
        let b = ObjectHandle::new("files/geoCamera-x.jpg".to_string());
        assert_eq!(a, b);
        assert_eq!(a.key(), "files/geoCamera-x.jpg");
    }
}
