use crate::device::{Camera, CapturedPhoto};
use crate::error::{CaptureError, Resource};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Which lens the next capture uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Back,
    Front,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Facing::Back => Facing::Front,
            Facing::Front => Facing::Back,
        }
    }
}

/// Flash mode for the next capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Off,
    On,
}

impl Flash {
    pub fn toggled(self) -> Self {
        match self {
            Flash::Off => Flash::On,
            Flash::On => Flash::Off,
        }
    }
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Viewfinder active, no photo held.
    Idle,
    /// A photo is held, awaiting retake or upload.
    Captured,
}

/// Owns the transient capture state: the current photo, camera facing, and
/// flash mode.
///
/// The controller moves between `Idle` and `Captured`. Facing and flash
/// toggles are only honored while idle. `take` transfers ownership of the
/// held photo to the caller and returns the controller to `Idle`, so a
/// second trigger on the same buffer finds nothing to upload.
pub struct CaptureController {
    camera: Arc<dyn Camera>,
    facing: Facing,
    flash: Flash,
    held: Option<CapturedPhoto>,
}

impl CaptureController {
    pub fn new(camera: Arc<dyn Camera>) -> Self {
        Self {
            camera,
            facing: Facing::Back,
            flash: Flash::Off,
            held: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        if self.held.is_some() {
            CaptureState::Captured
        } else {
            CaptureState::Idle
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn flash(&self) -> Flash {
        self.flash
    }

    /// Take a picture and hold it for preview.
    ///
    /// Fails when a photo is already held, when camera permission is refused,
    /// or when the camera itself errors. On failure the controller stays in
    /// its previous state.
    #[instrument(skip(self))]
    pub async fn capture(&mut self) -> Result<(), CaptureError> {
        if self.held.is_some() {
            return Err(CaptureError::AlreadyCaptured);
        }

        if !self.camera.request_permission().await {
            return Err(CaptureError::PermissionDenied {
                resource: Resource::Camera,
            });
        }

        let photo = self.camera.capture().await.map_err(CaptureError::Camera)?;
        debug!(size_bytes = photo.len(), "photo captured");
        self.held = Some(photo);
        Ok(())
    }

    /// Discard the held photo and return to the viewfinder.
    pub fn retake(&mut self) {
        self.held = None;
    }

    /// Move the held photo out for upload, returning to `Idle`.
    ///
    /// Returns `None` when nothing is held, which is also what a re-entrant
    /// second trigger observes.
    pub fn take(&mut self) -> Option<CapturedPhoto> {
        self.held.take()
    }

    /// Flip between front and back lens. Only valid while idle.
    pub fn toggle_facing(&mut self) -> Result<Facing, CaptureError> {
        if self.held.is_some() {
            return Err(CaptureError::ControlsLocked);
        }
        self.facing = self.facing.toggled();
        Ok(self.facing)
    }

    /// Flip flash on/off. Only valid while idle.
    pub fn toggle_flash(&mut self) -> Result<Flash, CaptureError> {
        if self.held.is_some() {
            return Err(CaptureError::ControlsLocked);
        }
        self.flash = self.flash.toggled();
        Ok(self.flash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockCamera;

    fn granting_camera(bytes: Vec<u8>) -> MockCamera {
        let mut camera = MockCamera::new();
        camera.expect_request_permission().returning(|| true);
        camera
            .expect_capture()
            .returning(move || Ok(CapturedPhoto::new(bytes.clone())));
        camera
    }

    #[tokio::test]
    async fn test_capture_holds_photo() {
        let mut controller = CaptureController::new(Arc::new(granting_camera(vec![1, 2, 3])));
        assert_eq!(controller.state(), CaptureState::Idle);

        controller.capture().await.unwrap();
        assert_eq!(controller.state(), CaptureState::Captured);
    }

    #[tokio::test]
    async fn test_capture_while_captured_is_rejected() {
        let mut controller = CaptureController::new(Arc::new(granting_camera(vec![1])));
        controller.capture().await.unwrap();

        assert!(matches!(
            controller.capture().await,
            Err(CaptureError::AlreadyCaptured)
        ));
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let mut camera = MockCamera::new();
        camera.expect_request_permission().returning(|| false);

        let mut controller = CaptureController::new(Arc::new(camera));
        assert!(matches!(
            controller.capture().await,
            Err(CaptureError::PermissionDenied {
                resource: Resource::Camera
            })
        ));
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_take_moves_photo_out_exactly_once() {
        let mut controller = CaptureController::new(Arc::new(granting_camera(vec![9, 9])));
        controller.capture().await.unwrap();

        let photo = controller.take().expect("photo should be held");
        assert_eq!(photo.len(), 2);
        assert_eq!(controller.state(), CaptureState::Idle);

        // A double-tap on upload observes an empty buffer.
        assert!(controller.take().is_none());
    }

    #[tokio::test]
    async fn test_retake_discards_photo() {
        let mut controller = CaptureController::new(Arc::new(granting_camera(vec![7])));
        controller.capture().await.unwrap();

        controller.retake();
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(controller.take().is_none());
    }

    #[tokio::test]
    async fn test_toggles_only_while_idle() {
        let mut controller = CaptureController::new(Arc::new(granting_camera(vec![1])));

        assert_eq!(controller.toggle_facing().unwrap(), Facing::Front);
        assert_eq!(controller.toggle_flash().unwrap(), Flash::On);
        assert_eq!(controller.toggle_facing().unwrap(), Facing::Back);

        controller.capture().await.unwrap();
        assert!(matches!(
            controller.toggle_facing(),
            Err(CaptureError::ControlsLocked)
        ));
        assert!(matches!(
            controller.toggle_flash(),
            Err(CaptureError::ControlsLocked)
        ));
    }
}
