// Serializable view models served to the console frontend
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::device::{DeviceSnapshot, IoElementMap};
use crate::domain::elements;
use crate::domain::history::{HistoryPage, HistoryRow};
use crate::domain::map_scene::{LatLng, MapView};
use crate::domain::movement::MovementStatus;
use crate::domain::summary::SummaryStats;
use crate::domain::window::{TimePreset, TimeWindow};

pub const ONLINE_BADGE: &str = "🟢 Online";
pub const OFFLINE_BADGE: &str = "🟡 Offline";
pub const UNASSIGNED_VEHICLE: &str = "Unassigned Vehicle";
pub const MISSING_SIM: &str = "N/A";

/// Identity strip above the map: plate, connection badge and the live
/// signals the header renders directly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderView {
    pub plate_number: String,
    pub online: bool,
    pub status_badge: String,
    pub imei: String,
    pub device_model: String,
    pub sim_number: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub ignition: &'static str,
    pub power_badge: Option<String>,
    pub satellites: u32,
}

impl HeaderView {
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        let status = snapshot.real_time_status.as_ref();
        let online = snapshot.is_online();
        let signals = status
            .map(|s| elements::decode(&s.io_elements))
            .unwrap_or_default();
        Self {
            plate_number: snapshot
                .plate_number
                .clone()
                .unwrap_or_else(|| UNASSIGNED_VEHICLE.to_string()),
            online,
            status_badge: if online { ONLINE_BADGE } else { OFFLINE_BADGE }.to_string(),
            imei: snapshot.imei.clone(),
            device_model: snapshot.device_model.clone(),
            sim_number: snapshot
                .sim_number
                .clone()
                .unwrap_or_else(|| MISSING_SIM.to_string()),
            last_seen: status.and_then(|s| s.last_seen).or(snapshot.last_seen),
            ignition: if status.map(|s| s.ignition).unwrap_or(false) {
                "ON"
            } else {
                "OFF"
            },
            power_badge: signals.power_voltage.map(|volts| format!("{volts:.1}V")),
            satellites: status.map(|s| s.satellites).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowView {
    pub preset: TimePreset,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WindowView {
    pub fn new(preset: TimePreset, window: &TimeWindow) -> Self {
        Self {
            preset,
            start: window.start,
            end: window.end,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub distance_km: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub ignition_on_samples: u64,
}

impl SummaryView {
    pub fn from_stats(stats: &SummaryStats) -> Self {
        Self {
            distance_km: round2(stats.distance_traveled_m / 1000.0),
            max_speed_kmh: stats.max_speed_kmh,
            avg_speed_kmh: stats.avg_speed_kmh,
            ignition_on_samples: stats.ignition_on_samples,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One history row as the table renders it. Decoding and movement
/// classification happen here, when the row is turned into view state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRowView {
    pub time: DateTime<Utc>,
    pub status: MovementStatus,
    pub speed_kmh: f64,
    pub fuel_percent: Option<f64>,
    pub odometer_km: Option<f64>,
    pub position: Option<LatLng>,
    pub elements: IoElementMap,
}

impl HistoryRowView {
    pub fn from_row(row: &HistoryRow) -> Self {
        let speed = row.telemetry.map(|t| t.speed_kmh).unwrap_or(0.0);
        let signals = elements::decode(&row.elements);
        Self {
            time: row.time,
            status: MovementStatus::classify(speed, signals.ignition_on),
            speed_kmh: speed,
            fuel_percent: signals.fuel_percent,
            odometer_km: signals.odometer_km,
            position: row
                .gps
                .filter(|fix| !fix.is_null_island())
                .map(|fix| LatLng::new(fix.latitude, fix.longitude)),
            elements: row.elements.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub rows: Vec<HistoryRowView>,
    pub page: u32,
    pub has_next: bool,
}

impl HistoryView {
    pub fn from_page(page: &HistoryPage) -> Self {
        Self {
            rows: page.rows.iter().map(HistoryRowView::from_row).collect(),
            page: page.page,
            has_next: page.has_next,
        }
    }
}

/// Complete render model for one open device view. A served view is
/// always `ready`; a failed open never produces one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub view_id: Uuid,
    pub device_id: String,
    pub state: &'static str,
    pub header: HeaderView,
    pub window: WindowView,
    pub map: MapView,
    pub summary: Option<SummaryView>,
    pub history: HistoryView,
    pub last_refreshed: DateTime<Utc>,
}

/// Incremental updates fanned out to event-stream subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ViewEvent {
    /// Full model, sent once when a subscriber attaches.
    View {
        view: DeviceView,
    },
    /// A live snapshot refresh landed.
    Snapshot {
        header: HeaderView,
        map: MapView,
        last_refreshed: DateTime<Utc>,
    },
    /// A window change finished loading.
    Window {
        window: WindowView,
        summary: Option<SummaryView>,
        map: MapView,
        history: HistoryView,
    },
    /// A page change finished loading.
    History {
        history: HistoryView,
    },
}

impl ViewEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ViewEvent::View { .. } => "view",
            ViewEvent::Snapshot { .. } => "snapshot",
            ViewEvent::Window { .. } => "window",
            ViewEvent::History { .. } => "history",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::{ConnectionStatus, IoValue, RealTimeStatus};
    use crate::domain::history::{GpsFix, TelemetrySample};

    fn online_snapshot() -> DeviceSnapshot {
        let mut io_elements = IoElementMap::new();
        io_elements.insert("67".to_string(), IoValue::Scalar(24_300.0));
        DeviceSnapshot {
            imei: "860000000000001".to_string(),
            device_model: "FMB920".to_string(),
            firmware_version: Some("03.29.01".to_string()),
            plate_number: Some("B 1234 XYZ".to_string()),
            sim_number: Some("89620012345".to_string()),
            last_seen: None,
            real_time_status: Some(RealTimeStatus {
                connection_status: ConnectionStatus::Online,
                last_seen: None,
                ignition: true,
                satellites: 9,
                latitude: Some(-6.2),
                longitude: Some(106.8),
                speed_kmh: 0.0,
                heading_deg: 0.0,
                io_elements,
            }),
        }
    }

    #[test]
    fn test_header_for_online_device() {
        let header = HeaderView::from_snapshot(&online_snapshot());
        assert_eq!(header.status_badge, "🟢 Online");
        assert!(header.online);
        assert_eq!(header.ignition, "ON");
        assert_eq!(header.power_badge.as_deref(), Some("24.3V"));
        assert_eq!(header.satellites, 9);
        assert_eq!(header.plate_number, "B 1234 XYZ");
        assert_eq!(header.sim_number, "89620012345");
    }

    #[test]
    fn test_header_fallbacks_without_status() {
        let snapshot = DeviceSnapshot {
            imei: "860000000000002".to_string(),
            device_model: "FMB130".to_string(),
            firmware_version: None,
            plate_number: None,
            sim_number: None,
            last_seen: None,
            real_time_status: None,
        };
        let header = HeaderView::from_snapshot(&snapshot);
        assert_eq!(header.status_badge, "🟡 Offline");
        assert!(!header.online);
        assert_eq!(header.ignition, "OFF");
        assert_eq!(header.power_badge, None);
        assert_eq!(header.satellites, 0);
        assert_eq!(header.plate_number, "Unassigned Vehicle");
        assert_eq!(header.sim_number, "N/A");
    }

    #[test]
    fn test_row_view_classifies_and_filters_null_island() {
        let mut elements = IoElementMap::new();
        elements.insert("239".to_string(), IoValue::Scalar(1.0));
        let row = HistoryRow {
            time: Utc::now(),
            gps: Some(GpsFix {
                latitude: 0.0,
                longitude: 0.0,
            }),
            telemetry: Some(TelemetrySample { speed_kmh: 0.0 }),
            elements,
        };
        let view = HistoryRowView::from_row(&row);
        assert_eq!(view.status, MovementStatus::Idle);
        assert_eq!(view.position, None);
    }

    #[test]
    fn test_row_without_telemetry_reads_as_stopped() {
        let row = HistoryRow {
            time: Utc::now(),
            gps: Some(GpsFix {
                latitude: -6.2,
                longitude: 106.8,
            }),
            telemetry: None,
            elements: IoElementMap::new(),
        };
        let view = HistoryRowView::from_row(&row);
        assert_eq!(view.speed_kmh, 0.0);
        assert_eq!(view.status, MovementStatus::Stopped);
        assert_eq!(view.position, Some(LatLng::new(-6.2, 106.8)));
    }

    #[test]
    fn test_summary_distance_rendered_in_km() {
        let view = SummaryView::from_stats(&SummaryStats {
            distance_traveled_m: 15_500.0,
            max_speed_kmh: 92.0,
            avg_speed_kmh: 41.5,
            ignition_on_samples: 120,
        });
        assert_eq!(view.distance_km, 15.5);
        assert_eq!(view.max_speed_kmh, 92.0);
        assert_eq!(view.ignition_on_samples, 120);
    }
}
