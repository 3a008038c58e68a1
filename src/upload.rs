use crate::device::{CapturedPhoto, Coordinates};
use crate::error::UploadError;
use crate::location::{LocationRecord, LocationResolver};
use crate::object_store::{ObjectHandle, ObjectStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Object key prefix shared by every photo this service writes.
pub const OBJECT_KEY_PREFIX: &str = "files/geoCamera-";

const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Generate a fresh object key: `files/geoCamera-<uuid>.jpg`.
///
/// V4 collision probability is negligible, so no collision handling exists.
pub fn new_object_key() -> String {
    format!("{OBJECT_KEY_PREFIX}{}.jpg", Uuid::new_v4())
}

/// One successfully stored photo: its backend key, a retrievable URL, and the
/// location metadata attached to it. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    #[serde(skip)]
    pub handle: ObjectHandle,
    pub url: String,
    pub metadata: LocationRecord,
}

/// Turns a captured photo into a stored, geotagged object.
///
/// Steps within one upload are strictly sequential: location is resolved
/// before anything touches the store, bytes land before metadata, metadata
/// before URL resolution. Every external call is attempted exactly once; all
/// recovery is an explicit user re-action.
pub struct UploadPipeline {
    resolver: LocationResolver,
    store: Arc<dyn ObjectStore>,
}

impl UploadPipeline {
    pub fn new(resolver: LocationResolver, store: Arc<dyn ObjectStore>) -> Self {
        Self { resolver, store }
    }

    /// Upload using the device geolocation flow.
    ///
    /// Nothing is written unless a complete location record was resolved
    /// first, so no object can ever gain incomplete metadata through this
    /// path. The photo is consumed either way; a failed attempt leaves no
    /// buffer behind to re-submit.
    #[instrument(skip(self, photo))]
    pub async fn upload(&self, photo: CapturedPhoto) -> Result<StoredImage, UploadError> {
        if photo.is_empty() {
            return Err(UploadError::NoPhoto);
        }

        let record = self.resolver.resolve().await?;
        self.persist(photo, record).await
    }

    /// Upload with coordinates the caller already holds (e.g. supplied per
    /// request over the HTTP surface). Skips only the device fix; place
    /// resolution and the write sequence are identical to [`upload`].
    ///
    /// [`upload`]: UploadPipeline::upload
    #[instrument(skip(self, photo))]
    pub async fn upload_at(
        &self,
        photo: CapturedPhoto,
        coordinates: Coordinates,
    ) -> Result<StoredImage, UploadError> {
        if photo.is_empty() {
            return Err(UploadError::NoPhoto);
        }

        let record = self.resolver.resolve_at(coordinates).await?;
        self.persist(photo, record).await
    }

    async fn persist(
        &self,
        photo: CapturedPhoto,
        record: LocationRecord,
    ) -> Result<StoredImage, UploadError> {
        let key = new_object_key();
        debug!(key, size_bytes = photo.len(), "uploading photo");

        let handle = self
            .store
            .upload(&key, photo.into_bytes(), JPEG_CONTENT_TYPE)
            .await
            .map_err(UploadError::Backend)?;

        // If this attach fails the object stays stored with no usable
        // metadata; the gallery filters it out as incomplete.
        self.store
            .set_metadata(&handle, record.to_metadata())
            .await
            .map_err(UploadError::Backend)?;

        let url = self
            .store
            .download_url(&handle)
            .await
            .map_err(UploadError::Backend)?;

        info!(key = handle.key(), place = %record.name, "photo uploaded");
        Ok(StoredImage {
            handle,
            url,
            metadata: record,
        })
    }
}
