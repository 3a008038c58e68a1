use thiserror::Error;

/// Device resource guarded by a platform permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Camera,
    Location,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Camera => write!(f, "camera"),
            Resource::Location => write!(f, "location"),
        }
    }
}

/// Failures produced by the upload pipeline.
///
/// Every variant aborts the current upload attempt; nothing is retried and no
/// partial object is written once a pre-upload step has failed.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The capture buffer was absent or empty.
    #[error("no captured photo to upload")]
    NoPhoto,
    /// A platform permission prompt was refused.
    #[error("{resource} permission denied")]
    PermissionDenied { resource: Resource },
    /// Device geolocation or the weather API lookup failed (network error,
    /// non-success status, or malformed response body).
    #[error("failed to resolve location: {0}")]
    LocationResolution(anyhow::Error),
    /// The storage backend rejected the byte upload, the metadata attach, or
    /// the download-URL resolution.
    #[error("storage backend error: {0}")]
    Backend(anyhow::Error),
}

/// Failures produced by the capture controller.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{resource} permission denied")]
    PermissionDenied { resource: Resource },
    /// The camera collaborator failed to produce a photo.
    #[error("camera capture failed: {0}")]
    Camera(anyhow::Error),
    /// A photo is already held; it must be retaken or uploaded first.
    #[error("a photo is already held")]
    AlreadyCaptured,
    /// Facing and flash may only change while the viewfinder is active.
    #[error("camera controls are locked while a photo is held")]
    ControlsLocked,
}

/// Batch-level gallery failure. Per-object failures are never fatal to the
/// batch; only the initial listing can fail a refresh as a whole.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("failed to list stored objects: {0}")]
    ListFailed(anyhow::Error),
}

/// Per-object metadata defects detected at the read boundary.
///
/// Non-fatal on the gallery side: the affected object is skipped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("metadata field `{0}` is missing")]
    Missing(&'static str),
    #[error("metadata field `{0}` is empty")]
    Empty(&'static str),
    #[error("metadata field `{field}` is not a number: `{value}`")]
    NotANumber { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_names_resource() {
        let err = UploadError::PermissionDenied {
            resource: Resource::Location,
        };
        assert_eq!(err.to_string(), "location permission denied");

        let err = CaptureError::PermissionDenied {
            resource: Resource::Camera,
        };
        assert_eq!(err.to_string(), "camera permission denied");
    }

    #[test]
    fn test_metadata_error_display() {
        assert_eq!(
            MetadataError::Empty("region").to_string(),
            "metadata field `region` is empty"
        );
    }
}
