//! Tracked entities and position samples.
//!
//! This module owns the wire contract for position data: the vehicle listing,
//! the per-vehicle route points, and the whole-table tag movement scatter.
//! Rows missing numeric coordinates are silently dropped before anything
//! reaches the renderer; the remote store is authoritative for everything
//! else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use relieftrack_store::{Order, StoreClient};

use crate::error::Result;
use crate::geo::LatLng;

/// Table holding the vehicle listing.
const VEHICLES_TABLE: &str = "camiones";

/// Table holding per-vehicle route points.
const ROUTE_POINTS_TABLE: &str = "recorrido_puntos";

/// Table holding tag reader movements.
const MOVEMENTS_TABLE: &str = "rfid_movimientos";

/// A trackable source of position samples, selected by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
    /// Stable identifier in the remote store.
    pub id: i64,
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
}

/// One timestamped position reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSample {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// When the sample was recorded. Tag movements carry no timestamp; their
    /// reader-assigned row order is the monotonic signal instead.
    pub recorded_at: Option<DateTime<Utc>>,
    /// Free-form descriptor: movement type or original coordinate string.
    pub descriptor: Option<String>,
}

impl PositionSample {
    /// Create a sample from raw coordinates.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            recorded_at: None,
            descriptor: None,
        }
    }

    /// The sample's position as a coordinate.
    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// A source of ordered position samples for a tracked entity.
///
/// The polling controller drives this seam; the store-backed implementation
/// below is the production source, tests substitute their own.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Fetch the ordered samples for `entity_id`.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success response from the store.
    async fn positions(&self, entity_id: i64) -> Result<Vec<PositionSample>>;
}

/// Accept a JSON number for a coordinate; anything else becomes `None`.
fn lenient_coord<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_f64))
}

/// Parse the store's timestamp shapes: RFC 3339 or `YYYY-MM-DD HH:MM:SS+00`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    None
}

/// Wire row of the route points table.
#[derive(Debug, Deserialize)]
struct RoutePointRow {
    #[serde(default, deserialize_with = "lenient_coord")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    lon: Option<f64>,
    #[serde(default)]
    coo: Option<String>,
    #[serde(default)]
    recorded_at: Option<String>,
}

impl RoutePointRow {
    /// Convert to a sample, or `None` when the coordinates are not numeric.
    fn into_sample(self) -> Option<PositionSample> {
        let (lat, lon) = (self.lat?, self.lon?);
        Some(PositionSample {
            lat,
            lon,
            recorded_at: self.recorded_at.as_deref().and_then(parse_timestamp),
            descriptor: self.coo,
        })
    }
}

/// Wire row of the tag movements table.
#[derive(Debug, Deserialize)]
struct MovementRow {
    #[serde(default, deserialize_with = "lenient_coord")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    lon: Option<f64>,
    #[serde(default)]
    movimiento: Option<String>,
}

impl MovementRow {
    fn into_sample(self) -> Option<PositionSample> {
        let (lat, lon) = (self.lat?, self.lon?);
        Some(PositionSample {
            lat,
            lon,
            recorded_at: None,
            descriptor: self.movimiento,
        })
    }
}

/// Store-backed reader of entities and position samples.
#[derive(Debug, Clone)]
pub struct GeoDataClient {
    store: StoreClient,
}

impl GeoDataClient {
    /// Wrap a store client.
    #[must_use]
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// List the tracked vehicles, sorted by display name.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success response.
    pub async fn entities(&self) -> Result<Vec<TrackedEntity>> {
        let mut entities: Vec<TrackedEntity> =
            self.store.select(VEHICLES_TABLE).fetch().await?;
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entities)
    }

    /// Fetch every tag movement for scatter rendering, in reader order.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success response.
    pub async fn movements(&self) -> Result<Vec<PositionSample>> {
        let rows: Vec<MovementRow> = self
            .store
            .select(MOVEMENTS_TABLE)
            .order("movimiento", Order::Ascending)
            .fetch()
            .await?;
        let total = rows.len();
        let samples: Vec<PositionSample> =
            rows.into_iter().filter_map(MovementRow::into_sample).collect();
        debug!(total, kept = samples.len(), "fetched tag movements");
        Ok(samples)
    }
}

#[async_trait]
impl PositionSource for GeoDataClient {
    async fn positions(&self, entity_id: i64) -> Result<Vec<PositionSample>> {
        let rows: Vec<RoutePointRow> = self
            .store
            .select(ROUTE_POINTS_TABLE)
            .eq("camion_id", entity_id)
            .order("recorded_at", Order::Ascending)
            .fetch()
            .await?;
        let total = rows.len();
        let samples: Vec<PositionSample> =
            rows.into_iter().filter_map(RoutePointRow::into_sample).collect();
        debug!(entity_id, total, kept = samples.len(), "fetched route points");
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_entity_deserialize() {
        let json = r#"[{"id": 1, "nombre": "Camion Norte"}, {"id": 2, "nombre": "Camion Sur"}]"#;
        let entities: Vec<TrackedEntity> = serde_json::from_str(json).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name, "Camion Norte");
        assert_eq!(entities[1].id, 2);
    }

    #[test]
    fn test_route_row_with_numeric_coords() {
        let json = r#"{"camion_id": 7, "lat": 19.43, "lon": -99.13, "coo": "19.43,-99.13", "recorded_at": "2025-10-01T12:00:00+00:00"}"#;
        let row: RoutePointRow = serde_json::from_str(json).unwrap();
        let sample = row.into_sample().unwrap();

        assert!((sample.lat - 19.43).abs() < f64::EPSILON);
        assert_eq!(sample.descriptor.as_deref(), Some("19.43,-99.13"));
        assert!(sample.recorded_at.is_some());
    }

    #[test]
    fn test_route_row_missing_coords_is_dropped() {
        let json = r#"{"camion_id": 7, "recorded_at": "2025-10-01T12:00:00+00:00"}"#;
        let row: RoutePointRow = serde_json::from_str(json).unwrap();
        assert!(row.into_sample().is_none());
    }

    #[test]
    fn test_route_row_string_coords_is_dropped() {
        // A malformed row must not fail the whole decode, only be filtered.
        let json = r#"{"camion_id": 7, "lat": "19.43", "lon": -99.13}"#;
        let row: RoutePointRow = serde_json::from_str(json).unwrap();
        assert!(row.into_sample().is_none());
    }

    #[test]
    fn test_route_row_null_coords_is_dropped() {
        let json = r#"{"camion_id": 7, "lat": null, "lon": null}"#;
        let row: RoutePointRow = serde_json::from_str(json).unwrap();
        assert!(row.into_sample().is_none());
    }

    #[test]
    fn test_movement_row_carries_descriptor() {
        let json = r#"{"id": 3, "rfid_uid": "A1B2", "movimiento": "entrada", "lat": 19.4, "lon": -99.1}"#;
        let row: MovementRow = serde_json::from_str(json).unwrap();
        let sample = row.into_sample().unwrap();

        assert_eq!(sample.descriptor.as_deref(), Some("entrada"));
        assert!(sample.recorded_at.is_none());
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let parsed = parse_timestamp("2025-10-01T12:30:00+00:00").unwrap();
        assert_eq!(parsed.timestamp(), 1_759_321_800);
    }

    #[test]
    fn test_parse_timestamp_store_shape() {
        // The shape the intake workflow writes back: space separator, "+00".
        assert!(parse_timestamp("2025-10-01 12:30:00+00").is_some());
    }

    #[test]
    fn test_parse_timestamp_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_position_sample_position() {
        let sample = PositionSample::new(19.43, -99.13);
        let position = sample.position();
        assert!((position.lat - 19.43).abs() < f64::EPSILON);
        assert!((position.lon + 99.13).abs() < f64::EPSILON);
    }

    #[test]
    fn test_integer_coords_accepted() {
        let json = r#"{"camion_id": 7, "lat": 19, "lon": -99}"#;
        let row: RoutePointRow = serde_json::from_str(json).unwrap();
        let sample = row.into_sample().unwrap();
        assert!((sample.lat - 19.0).abs() < f64::EPSILON);
    }
}
