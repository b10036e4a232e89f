/// Watermark composition: bake address, coordinates and capture time into
/// the photo pixels.
///
/// The actual rasterization is a platform capability behind
/// [`OverlayRenderer`]; this module owns what goes into the overlay and the
/// contract that composition never mutates the base image. Callers fall back
/// to the unmodified base bytes on any error here, so a broken render
/// backend can never block a capture.
pub mod panel;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use thiserror::Error;

use crate::location::format_coordinates;
use crate::types::LocationData;

pub use panel::PanelRenderer;

/// Errors from composing the overlay into a new image.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("failed to decode base image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("overlay render failed: {0}")]
    Render(String),
    #[error("failed to encode composed image: {0}")]
    Encode(#[source] image::ImageError),
}

/// The three text lines every watermark carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkData {
    /// Formatted address, or "Unknown location" when unresolved.
    pub address: String,
    /// Coordinates formatted as `{lat}° {N|S}, {lon}° {E|W}`.
    pub coordinates: String,
    /// Human-readable capture timestamp.
    pub date_time: String,
}

/// Prepare overlay content from a location and the capture timestamp.
pub fn prepare_watermark_data(location: &LocationData, captured_at: i64) -> WatermarkData {
    let address = location
        .address
        .as_ref()
        .map(|a| a.formatted_address.clone())
        .unwrap_or_else(|| "Unknown location".to_string());

    let coordinates = format_coordinates(location.latitude, location.longitude);

    let date_time = DateTime::from_timestamp_millis(captured_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| captured_at.to_string());

    WatermarkData {
        address,
        coordinates,
        date_time,
    }
}

/// Capability that flattens an overlay description into a new image.
///
/// Implementations must leave the base bytes untouched and return a fully
/// flattened copy.
#[async_trait]
pub trait OverlayRenderer: Send + Sync {
    async fn render(
        &self,
        base: &[u8],
        data: &WatermarkData,
    ) -> Result<Vec<u8>, CompositionError>;
}

/// Drives an [`OverlayRenderer`] with prepared watermark content.
pub struct Compositor {
    renderer: Arc<dyn OverlayRenderer>,
}

impl Compositor {
    pub fn new(renderer: Arc<dyn OverlayRenderer>) -> Self {
        Compositor { renderer }
    }

    /// Compose a watermarked copy of `base`.
    ///
    /// Errors are for the caller to absorb: the capture pipeline persists
    /// the original bytes when this fails.
    pub async fn compose(
        &self,
        base: &[u8],
        location: &LocationData,
        captured_at: i64,
    ) -> Result<Vec<u8>, CompositionError> {
        let data = prepare_watermark_data(location, captured_at);
        self.renderer.render(base, &data).await
    }
}
