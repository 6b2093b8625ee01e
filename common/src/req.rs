use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::model::{CellInfo, LocationInformation};

// ===============================================
// requests
// ===============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub imei: String,
    pub imsi: String,
    pub readable_name: String,
    pub psk: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSource {
    pub imei: String,
    pub imsi: String,
    pub readable_name: String,
}

impl AuthRequest {
    /// Splits off the shared secret, leaving the device identity.
    pub fn into_source(self) -> (NewSource, String) {
        (
            NewSource {
                imei: self.imei,
                imsi: self.imsi,
                readable_name: self.readable_name,
            },
            self.psk,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMeasurement {
    pub version: String,
    pub source_id: String,
    pub timestamp: DateTime<Utc>,
    pub location_information: Option<LocationInformation>,
    pub battery: f64,
    pub cell_info: Vec<CellInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementQuery {
    pub measurement_fields: Option<FieldProjection>,
}

/// Geographic cutout plus optional fix age (ms) and accuracy (m) ranges.
/// All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingBoxQuery {
    pub latitude_lower_bound: f64,
    pub latitude_upper_bound: f64,
    pub longitude_lower_bound: f64,
    pub longitude_upper_bound: f64,
    pub min_location_age: Option<u64>,
    pub max_location_age: Option<u64>,
    pub min_location_accuracy: Option<f64>,
    pub max_location_accuracy: Option<f64>,
    pub measurement_fields: Option<FieldProjection>,
}

/// Top-level fields to keep when rendering a measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldProjection(pub Vec<String>);

impl FieldProjection {
    /// Identifier is always part of a projected document.
    pub const ALWAYS_KEPT: &'static str = "id";

    pub fn parse(fields: &str) -> Self {
        Self(
            fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn contains(&self, field: &str) -> bool {
        field == Self::ALWAYS_KEPT || self.0.iter().any(|f| f == field)
    }

    /// Drops every top-level key not listed. Non-object values are returned unchanged.
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::Object(obj) => Value::Object(
                obj.into_iter()
                    .filter(|(key, _)| self.contains(key))
                    .collect::<Map<String, Value>>(),
            ),
            other => other,
        }
    }
}

// ===============================================
// responses
// ===============================================

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct StatusResponse {
    pub status: u16,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct AuthResponse {
    pub status: u16,
    pub source_id: String,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct MeasurementResponse {
    pub status: u16,
    pub result: Value,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct MeasurementsResponse {
    pub status: u16,
    pub len: usize,
    pub results: Vec<Value>,
}

/// `message` is either plain text or a map of field name to reasons.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: Value,
}
