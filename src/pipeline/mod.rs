/// The capture pipeline: raw camera frame in, durable photo record out.
///
/// Stages run strictly in sequence — geocode, watermark, photo store,
/// metadata store, camera-roll export — because each stage's output feeds
/// the next. The failure policy is the whole point:
///
/// - geocoding failure leaves the address absent, never aborts
/// - watermark failure falls back to the unmodified frame, never aborts
/// - a storage write failure is fatal and leaves no partial record
/// - camera-roll export failure is logged and swallowed
///
/// The pipeline does not serialize overlapping invocations; the UI's busy
/// flag keeps one capture in flight per screen. Once started, a capture
/// runs to completion even if the screen that launched it is gone — an
/// orphaned file beats a lost photo.
pub mod export;
pub mod state;

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::location::ReverseGeocoder;
use crate::storage::photos::photo_file_name;
use crate::storage::{MetadataStore, PhotoStore, StorageError};
use crate::types::{ExifData, LocationData, PhotoRecord};
use crate::watermark::Compositor;

pub use export::{CameraRollExporter, DirectoryExporter, ExportError};
pub use state::{CaptureEvent, CaptureState, InvalidTransition};

/// The one rejection `capture_and_persist` surfaces. Everything else
/// degrades the record instead of failing it.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not save the photo, please try again: {0}")]
    Storage(#[from] StorageError),
}

/// A raw capture handed to the pipeline by the camera screen.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Encoded image bytes straight from the camera.
    pub image: Vec<u8>,
    /// Location at capture time, if the resolver produced one. An already
    /// attached address is reused; otherwise the pipeline geocodes.
    pub location: Option<LocationData>,
    /// Whether to push a copy to the shared photo library.
    pub save_to_camera_roll: bool,
    /// EXIF block from the camera, when it reports one.
    pub exif: Option<ExifData>,
}

impl CaptureRequest {
    pub fn new(image: Vec<u8>) -> Self {
        CaptureRequest {
            image,
            location: None,
            save_to_camera_roll: true,
            exif: None,
        }
    }

    pub fn with_location(mut self, location: LocationData) -> Self {
        self.location = Some(location);
        self
    }

    pub fn camera_roll(mut self, enabled: bool) -> Self {
        self.save_to_camera_roll = enabled;
        self
    }

    pub fn with_exif(mut self, exif: ExifData) -> Self {
        self.exif = Some(exif);
        self
    }
}

/// Generate a collision-resistant photo id: capture millis plus a random
/// suffix. Ids are unique for the lifetime of the library, not just the
/// session.
pub fn generate_photo_id() -> String {
    format!(
        "{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Orchestrates a capture from raw frame to persisted record.
pub struct CapturePipeline {
    geocoder: ReverseGeocoder,
    compositor: Compositor,
    photo_store: Arc<dyn PhotoStore>,
    metadata: Arc<MetadataStore>,
    exporter: Option<Arc<dyn CameraRollExporter>>,
}

impl CapturePipeline {
    pub fn new(
        geocoder: ReverseGeocoder,
        compositor: Compositor,
        photo_store: Arc<dyn PhotoStore>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        CapturePipeline {
            geocoder,
            compositor,
            photo_store,
            metadata,
            exporter: None,
        }
    }

    /// Attach a camera-roll exporter. Without one the export stage is
    /// skipped entirely.
    pub fn with_exporter(mut self, exporter: Arc<dyn CameraRollExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn photo_store(&self) -> &Arc<dyn PhotoStore> {
        &self.photo_store
    }

    /// Turn a raw capture into a durable [`PhotoRecord`].
    pub async fn capture_and_persist(
        &self,
        request: CaptureRequest,
    ) -> Result<PhotoRecord, CaptureError> {
        let id = generate_photo_id();
        let captured_at = Utc::now().timestamp_millis();

        // Enrich the location with an address unless the caller already
        // resolved one. A failed lookup leaves the address absent.
        let location = match request.location {
            Some(mut location) => {
                if location.address.is_none() {
                    location.address = self
                        .geocoder
                        .resolve(location.latitude, location.longitude)
                        .await;
                }
                Some(location)
            }
            None => None,
        };

        // Watermark when there is a location to show, falling back to the
        // raw frame whenever the renderer cannot deliver.
        let image_to_store = match &location {
            Some(location) => match self
                .compositor
                .compose(&request.image, location, captured_at)
                .await
            {
                Ok(composed) => composed,
                Err(err) => {
                    warn!("watermark composition failed for {id}, storing original: {err}");
                    request.image.clone()
                }
            },
            None => request.image.clone(),
        };

        // From here failures are fatal: the photo bytes go first, and the
        // metadata insert is only attempted once they are durable.
        let image_location = self.photo_store.save(&image_to_store, &id).await?;

        let record = PhotoRecord {
            id: id.clone(),
            image_location: image_location.clone(),
            captured_at,
            location,
            exif: request.exif.clone(),
        };

        if let Err(err) = self.metadata.insert(record.clone()) {
            // Don't leave bytes behind for a record that was never inserted.
            if let Err(cleanup) = self.photo_store.delete(&image_location).await {
                warn!("failed to remove image for aborted capture {id}: {cleanup}");
            }
            return Err(err.into());
        }
        debug!("persisted photo {id} at {image_location}");

        // The in-app record is authoritative; export trouble is not ours to
        // surface.
        if request.save_to_camera_roll {
            if let Some(exporter) = &self.exporter {
                if let Err(err) = exporter
                    .export(&image_to_store, &photo_file_name(&id))
                    .await
                {
                    warn!("camera roll export failed for {id}: {err}");
                }
            }
        }

        Ok(record)
    }

    /// Delete a photo: store bytes first, then the metadata record. An
    /// unknown id is a no-op. A crash between the two steps leaves an
    /// orphaned record pointing at nothing, which readers tolerate.
    pub async fn delete_photo(&self, id: &str) -> Result<(), StorageError> {
        let Some(record) = self.metadata.get_by_id(id) else {
            return Ok(());
        };
        self.photo_store.delete(&record.image_location).await?;
        self.metadata.delete_by_id(id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::location::geocode::tests::{CountingGeocoder, FailingGeocoder};
    use crate::storage::BlobPhotoStore;
    use crate::watermark::tests::{BrokenRenderer, TaggingRenderer};
    use crate::watermark::OverlayRenderer;

    struct FullDisk;

    #[async_trait]
    impl PhotoStore for FullDisk {
        async fn save(&self, _image: &[u8], _id: &str) -> Result<String, StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
        async fn delete(&self, _location: &str) -> Result<(), StorageError> {
            Ok(())
        }
        async fn load(&self, location: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(location.to_string()))
        }
        async fn list_all(&self) -> Result<Vec<String>, StorageError> {
            Ok(Vec::new())
        }
        async fn total_size(&self) -> Result<u64, StorageError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct RecordingExporter {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CameraRollExporter for RecordingExporter {
        async fn export(&self, _image: &[u8], _file_name: &str) -> Result<(), ExportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ExportError::PermissionDenied)
            } else {
                Ok(())
            }
        }
    }

    struct TestRig {
        pipeline: CapturePipeline,
        geocoder_backend: Arc<CountingGeocoder>,
        photo_store: Arc<BlobPhotoStore>,
        metadata: Arc<MetadataStore>,
        _dir: tempfile::TempDir,
    }

    fn rig(renderer: Arc<dyn OverlayRenderer>) -> TestRig {
        let dir = tempfile::tempdir().unwrap();
        let geocoder_backend = Arc::new(CountingGeocoder::with_city("San Francisco", "CA"));
        let photo_store = Arc::new(BlobPhotoStore::new());
        let metadata =
            Arc::new(MetadataStore::open(dir.path().join("photos_metadata.json")).unwrap());
        let pipeline = CapturePipeline::new(
            ReverseGeocoder::new(geocoder_backend.clone()),
            Compositor::new(renderer),
            photo_store.clone(),
            metadata.clone(),
        );
        TestRig {
            pipeline,
            geocoder_backend,
            photo_store,
            metadata,
            _dir: dir,
        }
    }

    fn sf() -> LocationData {
        LocationData::new(37.7749, -122.4194)
    }

    #[tokio::test]
    async fn every_capture_gets_a_unique_id() {
        let rig = rig(Arc::new(TaggingRenderer));
        let mut seen = HashSet::new();
        for _ in 0..5 {
            let record = rig
                .pipeline
                .capture_and_persist(CaptureRequest::new(vec![1, 2, 3]))
                .await
                .unwrap();
            assert!(seen.insert(record.id));
        }
        assert_eq!(rig.metadata.count(), 5);
    }

    #[tokio::test]
    async fn capture_without_location_stores_original_bytes() {
        let rig = rig(Arc::new(TaggingRenderer));
        let record = rig
            .pipeline
            .capture_and_persist(CaptureRequest::new(vec![9, 9, 9]))
            .await
            .unwrap();

        assert!(record.location.is_none());
        let stored = rig.photo_store.load(&record.image_location).await.unwrap();
        assert_eq!(stored, vec![9, 9, 9]);
    }

    #[tokio::test]
    async fn geocode_failure_keeps_coordinates_and_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let photo_store = Arc::new(BlobPhotoStore::new());
        let metadata =
            Arc::new(MetadataStore::open(dir.path().join("photos_metadata.json")).unwrap());
        let pipeline = CapturePipeline::new(
            ReverseGeocoder::new(Arc::new(FailingGeocoder)),
            Compositor::new(Arc::new(TaggingRenderer)),
            photo_store.clone(),
            metadata,
        );

        let record = pipeline
            .capture_and_persist(CaptureRequest::new(vec![1, 2]).with_location(sf()))
            .await
            .unwrap();

        let location = record.location.unwrap();
        assert_eq!(location.latitude, 37.7749);
        assert_eq!(location.longitude, -122.4194);
        assert!(location.address.is_none());

        // Watermarked despite the missing address: the tagging renderer
        // appends the fallback address line.
        let stored = photo_store.load(&record.image_location).await.unwrap();
        assert!(stored.starts_with(&[1, 2]));
        assert!(stored.ends_with(b"Unknown location"));
    }

    #[tokio::test]
    async fn composition_failure_falls_back_to_original_bytes() {
        let rig = rig(Arc::new(BrokenRenderer));
        let record = rig
            .pipeline
            .capture_and_persist(CaptureRequest::new(vec![4, 5, 6]).with_location(sf()))
            .await
            .unwrap();

        assert!(record.location.is_some());
        let stored = rig.photo_store.load(&record.image_location).await.unwrap();
        assert_eq!(stored, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn storage_failure_is_fatal_and_leaves_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let metadata =
            Arc::new(MetadataStore::open(dir.path().join("photos_metadata.json")).unwrap());
        let pipeline = CapturePipeline::new(
            ReverseGeocoder::new(Arc::new(FailingGeocoder)),
            Compositor::new(Arc::new(TaggingRenderer)),
            Arc::new(FullDisk),
            metadata.clone(),
        );

        let result = pipeline
            .capture_and_persist(CaptureRequest::new(vec![1]))
            .await;
        assert!(matches!(result, Err(CaptureError::Storage(_))));
        assert_eq!(metadata.count(), 0);
    }

    #[tokio::test]
    async fn camera_roll_export_failure_is_swallowed() {
        let exporter = Arc::new(RecordingExporter {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let rig = rig(Arc::new(TaggingRenderer));
        let pipeline = rig.pipeline.with_exporter(exporter.clone());

        let record = pipeline
            .capture_and_persist(CaptureRequest::new(vec![7]).camera_roll(true))
            .await
            .unwrap();

        assert_eq!(exporter.calls.load(Ordering::SeqCst), 1);
        // The in-app record is still durable.
        assert!(rig.metadata.get_by_id(&record.id).is_some());
    }

    #[tokio::test]
    async fn camera_roll_export_respects_the_flag() {
        let exporter = Arc::new(RecordingExporter::default());
        let rig = rig(Arc::new(TaggingRenderer));
        let pipeline = rig.pipeline.with_exporter(exporter.clone());

        pipeline
            .capture_and_persist(CaptureRequest::new(vec![7]).camera_roll(false))
            .await
            .unwrap();
        assert_eq!(exporter.calls.load(Ordering::SeqCst), 0);

        pipeline
            .capture_and_persist(CaptureRequest::new(vec![7]).camera_roll(true))
            .await
            .unwrap();
        assert_eq!(exporter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn end_to_end_capture_with_san_francisco_fix() {
        let rig = rig(Arc::new(TaggingRenderer));

        // An older photo already in the library.
        rig.metadata
            .insert(PhotoRecord {
                id: "old".into(),
                image_location: "blob:old".into(),
                captured_at: 100,
                location: None,
                exif: None,
            })
            .unwrap();

        let record = rig
            .pipeline
            .capture_and_persist(CaptureRequest::new(vec![1]).with_location(sf()))
            .await
            .unwrap();

        let address = record.location.as_ref().unwrap().address.as_ref().unwrap();
        assert_eq!(address.formatted_address, "San Francisco, CA");

        let sorted = rig.metadata.list_sorted_by_time_desc();
        assert_eq!(sorted.first().unwrap().id, record.id);
    }

    #[tokio::test]
    async fn repeat_captures_in_one_cell_share_a_geocode_lookup() {
        let rig = rig(Arc::new(TaggingRenderer));

        let first = rig
            .pipeline
            .capture_and_persist(
                CaptureRequest::new(vec![1]).with_location(LocationData::new(37.77491, -122.41942)),
            )
            .await
            .unwrap();
        let second = rig
            .pipeline
            .capture_and_persist(
                CaptureRequest::new(vec![2]).with_location(LocationData::new(37.77493, -122.41941)),
            )
            .await
            .unwrap();

        let a = first.location.unwrap().address.unwrap();
        let b = second.location.unwrap().address.unwrap();
        assert_eq!(a, b);
        assert_eq!(rig.geocoder_backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caller_resolved_address_skips_geocoding() {
        let rig = rig(Arc::new(TaggingRenderer));
        let mut location = sf();
        location.address = Some(crate::types::AddressData::from_parts(
            None,
            Some("Oakland".into()),
            Some("CA".into()),
            None,
            None,
        ));

        let record = rig
            .pipeline
            .capture_and_persist(CaptureRequest::new(vec![1]).with_location(location))
            .await
            .unwrap();

        assert_eq!(
            record.location.unwrap().address.unwrap().formatted_address,
            "Oakland, CA"
        );
        assert_eq!(rig.geocoder_backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn camera_exif_rides_along_on_the_record() {
        let rig = rig(Arc::new(TaggingRenderer));
        let exif = ExifData {
            make: Some("Fujifilm".into()),
            model: Some("X-T5".into()),
            image_width: Some(7728),
            ..ExifData::default()
        };

        let record = rig
            .pipeline
            .capture_and_persist(CaptureRequest::new(vec![1]).with_exif(exif.clone()))
            .await
            .unwrap();

        assert_eq!(record.exif.as_ref(), Some(&exif));
        // And it survives the round trip through the store.
        assert_eq!(rig.metadata.get_by_id(&record.id).unwrap().exif, Some(exif));
    }

    #[tokio::test]
    async fn delete_removes_record_and_bytes() {
        let rig = rig(Arc::new(TaggingRenderer));
        let record = rig
            .pipeline
            .capture_and_persist(CaptureRequest::new(vec![1]))
            .await
            .unwrap();

        rig.pipeline.delete_photo(&record.id).await.unwrap();
        assert!(rig.metadata.get_by_id(&record.id).is_none());
        assert!(rig.photo_store.list_all().await.unwrap().is_empty());

        // Deleting again, or deleting something that never existed, is fine.
        rig.pipeline.delete_photo(&record.id).await.unwrap();
        rig.pipeline.delete_photo("never existed").await.unwrap();
    }

    #[test]
    fn photo_ids_combine_timestamp_and_randomness() {
        let id = generate_photo_id();
        let (millis, suffix) = id.split_once('_').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(suffix.len(), 32);
        assert_ne!(id, generate_photo_id());
    }
}
