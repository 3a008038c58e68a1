use crate::error::{GalleryError, MetadataError};
use crate::location::required;
use crate::object_store::{ObjectHandle, ObjectStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Prefix under which all uploaded photos live.
pub const LIST_PREFIX: &str = "files/";

/// Display-ready projection of a stored photo and its location metadata.
///
/// An entry exists iff the source object's metadata carries non-empty `name`,
/// `region`, and `country`. Coordinates are read but deliberately not
/// required; an object tagged without them still renders, just without a
/// maps link. That asymmetry mirrors the write-side contract, where a
/// metadata attach can fail after the bytes landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryEntry {
    pub url: String,
    pub name: String,
    pub region: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GalleryEntry {
    /// Project raw object metadata into an entry, rejecting incomplete
    /// records.
    pub fn from_metadata(
        url: String,
        metadata: &HashMap<String, String>,
    ) -> Result<Self, MetadataError> {
        Ok(Self {
            url,
            name: required(metadata, "name")?,
            region: required(metadata, "region")?,
            country: required(metadata, "country")?,
            latitude: optional_f64(metadata, "latitude"),
            longitude: optional_f64(metadata, "longitude"),
        })
    }

    /// Google Maps deep link for the entry's coordinates, when present.
    pub fn maps_url(&self) -> Option<String> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(format!(
                "https://www.google.com/maps/search/?api=1&query={latitude},{longitude}"
            )),
            _ => None,
        }
    }
}

fn optional_f64(metadata: &HashMap<String, String>, field: &str) -> Option<f64> {
    metadata.get(field).and_then(|value| value.parse().ok())
}

/// Projects the raw object listing into display records.
///
/// Per-object URL and metadata fetches fan out concurrently and join when all
/// complete; completion order is not preserved. A single object failing its
/// fetch, or carrying incomplete metadata, is logged and skipped without
/// failing the batch. Nothing is cached across refreshes.
pub struct GalleryAssembler {
    store: Arc<dyn ObjectStore>,
    concurrency: usize,
}

impl GalleryAssembler {
    pub fn new(store: Arc<dyn ObjectStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// List every stored photo and assemble the valid ones.
    ///
    /// Only the listing itself can fail the refresh as a whole.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        let handles = self
            .store
            .list(LIST_PREFIX)
            .await
            .map_err(GalleryError::ListFailed)?;

        Ok(self.assemble(handles).await)
    }

    /// Assemble entries for an already-fetched set of object handles.
    pub async fn assemble(&self, handles: Vec<ObjectHandle>) -> Vec<GalleryEntry> {
        let total = handles.len();

        let entries: Vec<GalleryEntry> = stream::iter(handles)
            .map(|handle| {
                let store = Arc::clone(&self.store);
                async move { fetch_entry(store, handle).await }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|entry| async move { entry })
            .collect()
            .await;

        debug!(
            total,
            valid = entries.len(),
            skipped = total - entries.len(),
            "gallery assembled"
        );
        entries
    }
}

async fn fetch_entry(store: Arc<dyn ObjectStore>, handle: ObjectHandle) -> Option<GalleryEntry> {
    let url = match store.download_url(&handle).await {
        Ok(url) => url,
        Err(error) => {
            warn!(key = handle.key(), error = %error, "skipping object: URL resolution failed");
            return None;
        }
    };

    let metadata = match store.get_metadata(&handle).await {
        Ok(metadata) => metadata,
        Err(error) => {
            warn!(key = handle.key(), error = %error, "skipping object: metadata fetch failed");
            return None;
        }
    };

    match GalleryEntry::from_metadata(url, &metadata) {
        Ok(entry) => Some(entry),
        Err(error) => {
            warn!(key = handle.key(), error = %error, "skipping object: location metadata incomplete");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MockObjectStore;

    fn metadata(name: &str, region: &str, country: &str) -> HashMap<String, String> {
        HashMap::from([
            ("name".to_string(), name.to_string()),
            ("region".to_string(), region.to_string()),
            ("country".to_string(), country.to_string()),
            ("latitude".to_string(), "48.8566".to_string()),
            ("longitude".to_string(), "2.3522".to_string()),
        ])
    }

    fn store_with_urls() -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store
            .expect_download_url()
            .returning(|handle| Ok(format!("https://storage.example/{}", handle.key())));
        store
    }

    fn assembler(store: MockObjectStore) -> GalleryAssembler {
        GalleryAssembler::new(Arc::new(store), 4)
    }

    #[tokio::test]
    async fn test_assemble_empty_input() {
        // No expectations: the store must not be touched for an empty batch.
        let assembler = assembler(MockObjectStore::new());
        assert!(assembler.assemble(vec![]).await.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_metadata_yields_zero_entries() {
        let mut store = store_with_urls();
        store
            .expect_get_metadata()
            .returning(|_| Ok(metadata("Paris", "", "France")));

        let entries = assembler(store)
            .assemble(vec![ObjectHandle::new("files/geoCamera-a.jpg")])
            .await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_valid_entries_survive_invalid_neighbors() {
        let mut store = store_with_urls();
        store.expect_get_metadata().returning(|handle| {
            if handle.key().contains("good") {
                Ok(metadata("Paris", "Ile-de-France", "France"))
            } else {
                Ok(HashMap::new())
            }
        });

        let entries = assembler(store)
            .assemble(vec![
                ObjectHandle::new("files/geoCamera-good.jpg"),
                ObjectHandle::new("files/geoCamera-bad.jpg"),
            ])
            .await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Paris");
        assert_eq!(entries[0].latitude, Some(48.8566));
    }

    #[tokio::test]
    async fn test_single_fetch_failure_does_not_fail_the_batch() {
        let mut store = store_with_urls();
        store.expect_get_metadata().returning(|handle| {
            if handle.key().contains("broken") {
                Err(anyhow::anyhow!("head request timed out"))
            } else {
                Ok(metadata("Oslo", "Oslo", "Norway"))
            }
        });

        let entries = assembler(store)
            .assemble(vec![
                ObjectHandle::new("files/geoCamera-broken.jpg"),
                ObjectHandle::new("files/geoCamera-ok.jpg"),
            ])
            .await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].country, "Norway");
    }

    #[tokio::test]
    async fn test_assemble_is_idempotent_as_a_multiset() {
        let handles = || {
            vec![
                ObjectHandle::new("files/geoCamera-1.jpg"),
                ObjectHandle::new("files/geoCamera-2.jpg"),
            ]
        };

        let mut store = store_with_urls();
        store.expect_get_metadata().returning(|handle| {
            if handle.key().contains('1') {
                Ok(metadata("Paris", "Ile-de-France", "France"))
            } else {
                Ok(metadata("Lyon", "Auvergne-Rhone-Alpes", "France"))
            }
        });

        let assembler = assembler(store);
        let mut first = assembler.assemble(handles()).await;
        let mut second = assembler.assemble(handles()).await;

        // Completion order is unspecified; compare as multisets.
        first.sort_by(|a, b| a.name.cmp(&b.name));
        second.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_fails_only_when_listing_fails() {
        let mut store = MockObjectStore::new();
        store
            .expect_list()
            .returning(|_| Err(anyhow::anyhow!("bucket unreachable")));

        let result = assembler(store).refresh().await;
        assert!(matches!(result, Err(GalleryError::ListFailed(_))));
    }

    #[test]
    fn test_entry_without_coordinates_is_still_valid() {
        let mut md = metadata("Paris", "Ile-de-France", "France");
        md.remove("latitude");
        md.remove("longitude");

        let entry = GalleryEntry::from_metadata("https://example/p.jpg".to_string(), &md).unwrap();
        assert_eq!(entry.latitude, None);
        assert_eq!(entry.maps_url(), None);
    }

    #[test]
    fn test_maps_url_format() {
        let entry =
            GalleryEntry::from_metadata("https://example/p.jpg".to_string(), &metadata("Paris", "Ile-de-France", "France"))
                .unwrap();
        assert_eq!(
            entry.maps_url().unwrap(),
            "https://www.google.com/maps/search/?api=1&query=48.8566,2.3522"
        );
    }
}
