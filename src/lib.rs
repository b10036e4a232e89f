//! camloc: the capture-to-record pipeline behind a geotagged photo app.
//!
//! The crate turns a raw camera frame into a durable, queryable record:
//! image bytes in the photo store, a [`types::PhotoRecord`] in the metadata
//! store, with best-effort location, reverse-geocoded address and a visual
//! watermark along the way. Partial failures degrade the record instead of
//! losing the photo.
//!
//! Platform facilities — camera, geolocation, geocoding, permission dialogs,
//! overlay rendering, the shared photo library — are capability traits the
//! embedding app implements. Screen layout, navigation and gesture handling
//! live entirely outside this crate.

pub mod location;
pub mod permissions;
pub mod pipeline;
pub mod storage;
pub mod types;
pub mod watermark;

pub use location::{
    format_coordinates, Geocoder, GeocodingError, LocationError, LocationResolver, Position,
    PositionProvider, ReverseGeocoder,
};
pub use permissions::{
    FixedPermissionGate, PermissionGate, PermissionKind, PermissionResponse, PermissionStatus,
};
pub use pipeline::{
    generate_photo_id, CameraRollExporter, CaptureError, CapturePipeline, CaptureRequest,
    CaptureState, DirectoryExporter,
};
pub use storage::{
    BlobPhotoStore, FileSystemPhotoStore, MetadataStore, PhotoStore, StorageError,
};
pub use types::{AddressData, ExifData, LocationData, PhotoRecord};
pub use watermark::{CompositionError, Compositor, OverlayRenderer, PanelRenderer, WatermarkData};
