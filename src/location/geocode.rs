/// Reverse geocoding with a process-lifetime result cache.
///
/// Lookups are cached by coordinates rounded to 4 decimal places (an ~11 m
/// grid cell), so repeated captures from the same spot hit the platform
/// geocoder once per session. The cache is append-mostly with no eviction;
/// concurrent inserts for the same cell race benignly since both writers
/// compute the same value.
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use thiserror::Error;

use crate::types::AddressData;

/// Errors from the underlying geocoding backend.
///
/// Always non-fatal at call sites: a failed lookup leaves the address absent.
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("geocoding backend error: {0}")]
    Backend(String),
    #[error("no address candidates for coordinate")]
    NoResult,
}

/// Capability wrapping the platform's reverse geocoder.
///
/// Returns zero or one address candidates; `Ok(None)` means the backend
/// answered but had nothing for the coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<AddressData>, GeocodingError>;
}

/// Cache key: coordinates rounded to 4 decimal places.
fn cache_key(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.4},{longitude:.4}")
}

/// Format a coordinate pair for display and watermarking.
///
/// Six decimal places with hemisphere letters, e.g.
/// `33.865000° S, 151.209000° E`.
pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    let lat_dir = if latitude >= 0.0 { 'N' } else { 'S' };
    let lon_dir = if longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.6}° {}, {:.6}° {}",
        latitude.abs(),
        lat_dir,
        longitude.abs(),
        lon_dir
    )
}

/// A [`Geocoder`] behind the shared session cache.
///
/// Cloning is cheap and clones share the cache, so the location resolver and
/// the capture pipeline see the same entries.
#[derive(Clone)]
pub struct ReverseGeocoder {
    backend: Arc<dyn Geocoder>,
    cache: Arc<DashMap<String, AddressData>>,
}

impl ReverseGeocoder {
    pub fn new(backend: Arc<dyn Geocoder>) -> Self {
        ReverseGeocoder {
            backend,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Resolve a coordinate to an address, best effort.
    ///
    /// Cache hits cost nothing. On a miss the backend is queried and its
    /// first candidate cached. Backend errors and empty result sets are
    /// logged and reported as `None`; the coordinate itself is the
    /// load-bearing value, the address is enrichment.
    pub async fn resolve(&self, latitude: f64, longitude: f64) -> Option<AddressData> {
        let key = cache_key(latitude, longitude);

        if let Some(cached) = self.cache.get(&key) {
            debug!("geocode cache hit for {key}");
            return Some(cached.clone());
        }

        match self.backend.reverse_geocode(latitude, longitude).await {
            Ok(Some(address)) => {
                self.cache.insert(key, address.clone());
                Some(address)
            }
            Ok(None) => {
                warn!("no geocode result for {key}");
                None
            }
            Err(err) => {
                warn!("reverse geocoding failed for {key}: {err}");
                None
            }
        }
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached grid cells, mostly useful in tests.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for ReverseGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseGeocoder")
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}
