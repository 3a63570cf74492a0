// Device and live status domain models
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::map_scene::{LatLng, LivePosition};

/// Raw IO elements keyed by numeric code or upstream alias. The map is
/// carried through to the client untouched so unknown codes still render.
pub type IoElementMap = BTreeMap<String, IoValue>;

/// One IO element value. Devices report either a bare scalar or an object
/// with the scalar and its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IoValue {
    Scalar(f64),
    Detailed {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
}

impl IoValue {
    pub fn value(&self) -> f64 {
        match self {
            IoValue::Scalar(value) => *value,
            IoValue::Detailed { value, .. } => *value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealTimeStatus {
    pub connection_status: ConnectionStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub ignition: bool,
    pub satellites: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_kmh: f64,
    pub heading_deg: f64,
    pub io_elements: IoElementMap,
}

/// Everything the backend knows about one device at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub imei: String,
    pub device_model: String,
    pub firmware_version: Option<String>,
    pub plate_number: Option<String>,
    pub sim_number: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub real_time_status: Option<RealTimeStatus>,
}

impl DeviceSnapshot {
    pub fn is_online(&self) -> bool {
        self.real_time_status
            .as_ref()
            .map(|status| status.connection_status == ConnectionStatus::Online)
            .unwrap_or(false)
    }

    /// Marker input for the map scene, present only when the snapshot
    /// carries a complete real-time fix.
    pub fn live_position(&self) -> Option<LivePosition> {
        let status = self.real_time_status.as_ref()?;
        let lat = status.latitude?;
        let lng = status.longitude?;
        Some(LivePosition {
            point: LatLng::new(lat, lng),
            speed_kmh: status.speed_kmh,
            heading_deg: status.heading_deg,
        })
    }
}
