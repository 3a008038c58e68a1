use crate::config::WeatherConfig;
use crate::device::{Coordinates, Geolocator};
use crate::error::{MetadataError, Resource, UploadError};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Metadata keys under which a location record is stored on an object.
const KEY_NAME: &str = "name";
const KEY_REGION: &str = "region";
const KEY_COUNTRY: &str = "country";
const KEY_LATITUDE: &str = "latitude";
const KEY_LONGITUDE: &str = "longitude";

/// Resolved place and coordinates attached to an uploaded photo.
///
/// Immutable once built; a record is only ever constructed with all five
/// fields present, so no partial record can reach the store through the
/// upload pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationRecord {
    /// Serialize to the string map the object store holds as metadata.
    pub fn to_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (KEY_NAME.to_string(), self.name.clone()),
            (KEY_REGION.to_string(), self.region.clone()),
            (KEY_COUNTRY.to_string(), self.country.clone()),
            (KEY_LATITUDE.to_string(), self.latitude.to_string()),
            (KEY_LONGITUDE.to_string(), self.longitude.to_string()),
        ])
    }

    /// Read a record back from object metadata, rejecting anything missing
    /// or blank. All five fields are required here; the gallery applies its
    /// own, looser, read-side rule.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, MetadataError> {
        Ok(Self {
            name: required(metadata, KEY_NAME)?,
            region: required(metadata, KEY_REGION)?,
            country: required(metadata, KEY_COUNTRY)?,
            latitude: required_f64(metadata, KEY_LATITUDE)?,
            longitude: required_f64(metadata, KEY_LONGITUDE)?,
        })
    }
}

/// Fetch a metadata field, rejecting absent or blank values.
pub(crate) fn required(
    metadata: &HashMap<String, String>,
    field: &'static str,
) -> Result<String, MetadataError> {
    let value = metadata.get(field).ok_or(MetadataError::Missing(field))?;
    if value.trim().is_empty() {
        return Err(MetadataError::Empty(field));
    }
    Ok(value.clone())
}

fn required_f64(
    metadata: &HashMap<String, String>,
    field: &'static str,
) -> Result<f64, MetadataError> {
    let value = required(metadata, field)?;
    value.parse().map_err(|_| MetadataError::NotANumber {
        field,
        value,
    })
}

/// Human-readable place resolved from a pair of coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolvedPlace {
    pub name: String,
    pub region: String,
    pub country: String,
}

/// Reverse-geocoding collaborator: coordinates in, named place out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, coordinates: Coordinates) -> Result<ResolvedPlace>;
}

/// Response envelope from the weather API; only the location block is used.
#[derive(Debug, Deserialize)]
struct CurrentConditions {
    location: ResolvedPlace,
}

/// weatherapi.com client used for reverse geocoding.
///
/// One attempt per call, no retry: a network error, non-success status, or
/// a body that does not parse is a resolution failure for the caller.
pub struct WeatherApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build weather API HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PlaceResolver for WeatherApiClient {
    #[instrument(skip(self), fields(latitude = coordinates.latitude, longitude = coordinates.longitude))]
    async fn resolve(&self, coordinates: Coordinates) -> Result<ResolvedPlace> {
        let url = format!("{}/current.json", self.base_url);
        let query = format!("{},{}", coordinates.latitude, coordinates.longitude);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query.as_str()),
                ("aqi", "yes"),
            ])
            .send()
            .await
            .context("weather API request failed")?;

        if !response.status().is_success() {
            bail!("weather API returned status {}", response.status());
        }

        let body: CurrentConditions = response
            .json()
            .await
            .context("malformed weather API response")?;

        debug!(place = %body.location.name, "place resolved");
        Ok(body.location)
    }
}

/// Produces a complete [`LocationRecord`] for the current moment by combining
/// a device geolocation fix with a reverse-geocoding lookup.
pub struct LocationResolver {
    geolocator: Arc<dyn Geolocator>,
    places: Arc<dyn PlaceResolver>,
}

impl LocationResolver {
    pub fn new(geolocator: Arc<dyn Geolocator>, places: Arc<dyn PlaceResolver>) -> Self {
        Self { geolocator, places }
    }

    /// Resolve via the device: permission prompt, then coordinates, then
    /// place lookup. Aborts at the first refusal or failure.
    pub async fn resolve(&self) -> Result<LocationRecord, UploadError> {
        if !self.geolocator.request_permission().await {
            return Err(UploadError::PermissionDenied {
                resource: Resource::Location,
            });
        }

        let coordinates = self
            .geolocator
            .current_coordinates()
            .await
            .map_err(UploadError::LocationResolution)?;

        self.resolve_at(coordinates).await
    }

    /// Resolve a place for coordinates the caller already holds.
    pub async fn resolve_at(&self, coordinates: Coordinates) -> Result<LocationRecord, UploadError> {
        let place = self
            .places
            .resolve(coordinates)
            .await
            .map_err(UploadError::LocationResolution)?;

        Ok(LocationRecord {
            name: place.name,
            region: place.region,
            country: place.country,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        })
    }
}
