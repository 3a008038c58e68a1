//! GeoCamera
//!
//! Core of a geotagging camera app: captured photos are tagged with a
//! resolved place (city/region/country plus coordinates) and stored in cloud
//! object storage; a gallery view lists the stored photos back.
//!
//! ## Architecture
//!
//! ```text
//! Camera            Geolocation        Weather API
//! ┌────────────┐    ┌────────────┐    ┌────────────┐
//! │ Capture    │    │            │    │ Place      │
//! │ Controller │    │ Geolocator │───▶│ Resolver   │
//! └────────────┘    └────────────┘    └────────────┘
//!        │                 │                 │
//!        │          ┌──────┴─────────────────┘
//!        ▼          ▼
//! ┌─────────────────────┐         ┌──────────────┐
//! │ Upload Pipeline     │────────▶│ Object Store │
//! └─────────────────────┘         │  files/      │
//!                                 └──────────────┘
//!                                        │
//!                                        ▼
//!                                 ┌──────────────┐
//!                                 │ Gallery      │
//!                                 │ Assembler    │
//!                                 └──────────────┘
//! ```
//!
//! Every external collaborator sits behind a trait and is injected at
//! construction time, so the pipeline and assembler are testable against
//! doubles. Within one upload, steps are strictly sequential and attempted
//! exactly once: location must resolve completely before any byte is
//! written, so no object ever gains partial metadata through the pipeline.

pub mod api;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod gallery;
pub mod location;
pub mod object_store;
pub mod upload;

pub use capture::{CaptureController, CaptureState, Facing, Flash};
pub use config::Config;
pub use device::{Camera, CapturedPhoto, Coordinates, Geolocator, RemoteClientGeolocator};
pub use error::{CaptureError, GalleryError, MetadataError, Resource, UploadError};
pub use gallery::{GalleryAssembler, GalleryEntry};
pub use location::{LocationRecord, LocationResolver, PlaceResolver, WeatherApiClient};
pub use object_store::{ObjectHandle, ObjectStore, S3ObjectStore};
pub use upload::{StoredImage, UploadPipeline};
