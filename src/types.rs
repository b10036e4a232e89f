/// Shared data structures for the photo library
///
/// These structs represent the data model that flows between the capture
/// pipeline, the two stores, and the embedding UI.
use serde::{Deserialize, Serialize};

/// A single persisted photo: the durable unit of the library.
///
/// Created exactly once per successful capture-and-save; never mutated in
/// place afterwards. The only lifecycle event after creation is deletion,
/// which removes the record entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Opaque unique identifier, generated at capture time.
    /// The sole foreign key between the photo store and the metadata store.
    pub id: String,
    /// Reference to the persisted image bytes (path or `blob:` URI).
    /// Owned by the photo store; this is only a handle.
    pub image_location: String,
    /// Capture timestamp, milliseconds since the Unix epoch. Set once.
    pub captured_at: i64,
    /// Geolocation at capture time, if one was available. Absence is
    /// permanent: records are never retroactively enriched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationData>,
    /// EXIF block the camera reported with the frame, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,
}

/// Geographic position attached to a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level, when the platform reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Reverse-geocoded address. Best-effort enrichment: stays `None` when
    /// geocoding fails or is unavailable, and that is not an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressData>,
}

impl LocationData {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        LocationData {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            address: None,
        }
    }
}

/// Structured address produced by reverse geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Comma-joined non-empty parts, or "Unknown location". Never empty.
    pub formatted_address: String,
}

impl AddressData {
    /// Build an address from its structured parts, deriving
    /// `formatted_address` from the non-empty ones.
    pub fn from_parts(
        street: Option<String>,
        city: Option<String>,
        region: Option<String>,
        country: Option<String>,
        postal_code: Option<String>,
    ) -> Self {
        let parts: Vec<&str> = [&street, &city, &region, &country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();

        let formatted_address = if parts.is_empty() {
            "Unknown location".to_string()
        } else {
            parts.join(", ")
        };

        AddressData {
            street,
            city,
            region,
            country,
            postal_code,
            formatted_address,
        }
    }
}

/// EXIF block reported by the camera alongside a raw capture.
///
/// Rides along on the capture request and is persisted on the record when
/// present; nothing requires it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_address_joins_non_empty_parts() {
        let address = AddressData::from_parts(
            Some("Market St".into()),
            Some("San Francisco".into()),
            Some("CA".into()),
            None,
            Some("94103".into()),
        );
        assert_eq!(address.formatted_address, "Market St, San Francisco, CA");
    }

    #[test]
    fn formatted_address_skips_empty_strings() {
        let address = AddressData::from_parts(
            Some(String::new()),
            Some("Sydney".into()),
            None,
            Some("Australia".into()),
            None,
        );
        assert_eq!(address.formatted_address, "Sydney, Australia");
    }

    #[test]
    fn formatted_address_falls_back_to_sentinel() {
        let address = AddressData::from_parts(None, None, None, None, None);
        assert_eq!(address.formatted_address, "Unknown location");
        assert!(!address.formatted_address.is_empty());
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = PhotoRecord {
            id: "1700000000000_abc".into(),
            image_location: "/photos/photo_1700000000000_abc.jpg".into(),
            captured_at: 1_700_000_000_000,
            location: Some(LocationData::new(37.7749, -122.4194)),
            exif: Some(ExifData {
                make: Some("Fujifilm".into()),
                ..ExifData::default()
            }),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: PhotoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
