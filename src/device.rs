use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pair of WGS84 coordinates reported by a geolocation fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Ephemeral handle to a just-taken picture.
///
/// Owned by the capture controller until it is consumed by an upload; moving
/// it into the pipeline is what guarantees one buffer can never be uploaded
/// twice concurrently.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    data: Vec<u8>,
    taken_at: DateTime<Utc>,
}

impl CapturedPhoto {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            taken_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Device camera collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Camera: Send + Sync {
    /// Prompt for camera access. Returns false when the user refuses.
    async fn request_permission(&self) -> bool;

    /// Take a picture with the current device settings.
    async fn capture(&self) -> Result<CapturedPhoto>;
}

/// Device geolocation collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Prompt for location access. Returns false when the user refuses.
    async fn request_permission(&self) -> bool;

    /// Resolve the device's current coordinates.
    async fn current_coordinates(&self) -> Result<Coordinates>;
}

/// Geolocator for deployments with no device fix of their own, where
/// coordinates arrive alongside each upload request instead.
///
/// It refuses the permission prompt, so the device-driven upload path fails
/// closed with a permission error rather than inventing a position.
pub struct RemoteClientGeolocator;

#[async_trait]
impl Geolocator for RemoteClientGeolocator {
    async fn request_permission(&self) -> bool {
        false
    }

    async fn current_coordinates(&self) -> Result<Coordinates> {
        bail!("no device geolocation available; coordinates must accompany each upload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_photo_emptiness() {
        assert!(CapturedPhoto::new(vec![]).is_empty());
        assert!(!CapturedPhoto::new(vec![0xff, 0xd8]).is_empty());
    }

    #[test]
    fn test_captured_photo_into_bytes() {
        let photo = CapturedPhoto::new(vec![1, 2, 3]);
        assert_eq!(photo.len(), 3);
        assert_eq!(photo.into_bytes(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_remote_client_geolocator_refuses_device_flow() {
        let geolocator = RemoteClientGeolocator;
        assert!(!geolocator.request_permission().await);
        assert!(geolocator.current_coordinates().await.is_err());
    }
}
