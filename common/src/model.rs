// keep in sync with db.rs of backend
use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};

/// Radio-type dependent key/value readings, e.g. `ci`, `tac` or `rsrp`.
pub type CellAttributes = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Source {
    pub id: String,
    pub imei: String,
    pub imsi: String,
    pub readable_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CellType {
    Lte,
    Umts,
    Cdma,
    Gsm,
}

impl CellType {
    pub const ALL: [CellType; 4] = [CellType::Lte, CellType::Umts, CellType::Cdma, CellType::Gsm];

    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Lte => "LTE",
            CellType::Umts => "UMTS",
            CellType::Cdma => "CDMA",
            CellType::Gsm => "GSM",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CellInfo {
    pub active: bool, // serving cell
    #[serde(rename = "type")]
    pub cell_type: CellType,
    pub cell_identity: CellAttributes,
    pub cell_signal_strength: CellAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LocationInformation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64, // m
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>, // m
    pub age: u64, // ms since the fix was obtained
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Measurement {
    pub id: String,
    pub version: String,
    pub source_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_information: Option<LocationInformation>,
    pub battery: f64,
    #[serde(default)]
    pub cell_info: Vec<CellInfo>,
}
