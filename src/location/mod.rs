/// Location resolution: permission check, position fix, reverse geocoding.
///
/// Resolution never requests permissions itself. Requesting is the caller's
/// responsibility, kept orthogonal so a denial here is a clean failure the
/// UI can act on.
pub mod geocode;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::permissions::{PermissionGate, PermissionKind};
use crate::types::LocationData;

pub use geocode::{format_coordinates, Geocoder, GeocodingError, ReverseGeocoder};

/// Errors a resolution attempt can surface.
///
/// Geocoding failure is deliberately not represented here: a missing address
/// degrades the result instead of failing it.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission not granted")]
    PermissionDenied,
    #[error("no position fix available")]
    PositionUnavailable,
}

/// A raw position fix from the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Capability wrapping the platform's geolocation service.
///
/// Implementations should query with a high-accuracy hint and let the
/// platform's own timeout decide when a fix is unavailable.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self) -> Result<Position, LocationError>;
}

/// Resolves the device's current position into a [`LocationData`] with a
/// best-effort address.
pub struct LocationResolver {
    gate: Arc<dyn PermissionGate>,
    positions: Arc<dyn PositionProvider>,
    geocoder: ReverseGeocoder,
}

impl LocationResolver {
    pub fn new(
        gate: Arc<dyn PermissionGate>,
        positions: Arc<dyn PositionProvider>,
        geocoder: ReverseGeocoder,
    ) -> Self {
        LocationResolver {
            gate,
            positions,
            geocoder,
        }
    }

    /// The shared geocoder, so the capture pipeline reuses the same cache.
    pub fn geocoder(&self) -> &ReverseGeocoder {
        &self.geocoder
    }

    /// Resolve the current location.
    ///
    /// Fails with [`LocationError::PermissionDenied`] when the permission is
    /// anything but granted (no request is made), and with
    /// [`LocationError::PositionUnavailable`] when the platform has no fix.
    /// A geocoding failure still returns `Ok`, with `address: None`.
    pub async fn resolve_current(&self) -> Result<LocationData, LocationError> {
        let response = self.gate.check_status(PermissionKind::Location).await;
        if !response.is_granted() {
            return Err(LocationError::PermissionDenied);
        }

        let position = self.positions.current_position().await?;

        let address = self
            .geocoder
            .resolve(position.latitude, position.longitude)
            .await;

        Ok(LocationData {
            latitude: position.latitude,
            longitude: position.longitude,
            altitude: position.altitude,
            accuracy: position.accuracy,
            address,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::geocode::tests::{CountingGeocoder, FailingGeocoder};
    use super::*;
    use crate::permissions::FixedPermissionGate;

    struct FixedPosition(Position);

    #[async_trait]
    impl PositionProvider for FixedPosition {
        async fn current_position(&self) -> Result<Position, LocationError> {
            Ok(self.0)
        }
    }

    struct NoFix;

    #[async_trait]
    impl PositionProvider for NoFix {
        async fn current_position(&self) -> Result<Position, LocationError> {
            Err(LocationError::PositionUnavailable)
        }
    }

    fn sf_position() -> Position {
        Position {
            latitude: 37.7749,
            longitude: -122.4194,
            altitude: Some(16.0),
            accuracy: Some(5.0),
        }
    }

    #[tokio::test]
    async fn resolves_position_and_address() {
        let backend = Arc::new(CountingGeocoder::with_city("San Francisco", "CA"));
        let resolver = LocationResolver::new(
            Arc::new(FixedPermissionGate::allow_all()),
            Arc::new(FixedPosition(sf_position())),
            ReverseGeocoder::new(backend.clone()),
        );

        let location = resolver.resolve_current().await.unwrap();
        assert_eq!(location.latitude, 37.7749);
        assert_eq!(location.longitude, -122.4194);
        assert_eq!(location.altitude, Some(16.0));
        let address = location.address.unwrap();
        assert_eq!(address.formatted_address, "San Francisco, CA");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_permission_fails_without_requesting() {
        let resolver = LocationResolver::new(
            Arc::new(FixedPermissionGate::granting(vec![PermissionKind::Camera])),
            Arc::new(FixedPosition(sf_position())),
            ReverseGeocoder::new(Arc::new(FailingGeocoder)),
        );

        assert!(matches!(
            resolver.resolve_current().await,
            Err(LocationError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn no_fix_surfaces_position_unavailable() {
        let resolver = LocationResolver::new(
            Arc::new(FixedPermissionGate::allow_all()),
            Arc::new(NoFix),
            ReverseGeocoder::new(Arc::new(FailingGeocoder)),
        );

        assert!(matches!(
            resolver.resolve_current().await,
            Err(LocationError::PositionUnavailable)
        ));
    }

    #[tokio::test]
    async fn geocode_failure_still_yields_coordinates() {
        let resolver = LocationResolver::new(
            Arc::new(FixedPermissionGate::allow_all()),
            Arc::new(FixedPosition(sf_position())),
            ReverseGeocoder::new(Arc::new(FailingGeocoder)),
        );

        let location = resolver.resolve_current().await.unwrap();
        assert_eq!(location.latitude, 37.7749);
        assert!(location.address.is_none());
    }
}
