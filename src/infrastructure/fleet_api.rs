// Fleet backend repository implementation
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::fleet_repository::{FleetApiError, FleetRepository};
use crate::domain::device::{ConnectionStatus, DeviceSnapshot, IoElementMap, RealTimeStatus};
use crate::domain::history::{GpsFix, HistoryBatch, HistoryRow, TelemetrySample};
use crate::domain::summary::SummaryStats;
use crate::domain::track::{Track, TrackPoint};
use crate::domain::window::TimeWindow;

#[derive(Debug, Clone)]
pub struct FleetApiClient {
    base_url: String,
    api_token: String,
    client: reqwest::Client,
}

impl FleetApiClient {
    pub fn new(
        base_url: String,
        api_token: String,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client,
        })
    }

    fn device_url(&self, device_id: &str) -> String {
        format!(
            "{}/devices/{}",
            self.base_url,
            urlencoding::encode(device_id)
        )
    }

    fn summary_url(&self, device_id: &str, window: &TimeWindow) -> String {
        format!(
            "{}/telemetry/{}/summary?start={}&end={}",
            self.base_url,
            urlencoding::encode(device_id),
            urlencoding::encode(&window.start_iso()),
            urlencoding::encode(&window.end_iso()),
        )
    }

    fn track_url(&self, device_id: &str, window: &TimeWindow, max_points: u32) -> String {
        format!(
            "{}/telemetry/{}/track?start={}&end={}&maxPoints={}",
            self.base_url,
            urlencoding::encode(device_id),
            urlencoding::encode(&window.start_iso()),
            urlencoding::encode(&window.end_iso()),
            max_points,
        )
    }

    fn history_url(&self, device_id: &str) -> String {
        format!(
            "{}/history/{}",
            self.base_url,
            urlencoding::encode(device_id)
        )
    }

    async fn send<T>(&self, request: reqwest::RequestBuilder) -> Result<T, FleetApiError>
    where
        T: DeserializeOwned,
    {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|error| FleetApiError::Transport(error.into()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FleetApiError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FleetApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|error| FleetApiError::Transport(error.into()))?;
        serde_json::from_str(&body).map_err(|error| FleetApiError::Decode(error.to_string()))
    }
}

#[async_trait]
impl FleetRepository for FleetApiClient {
    async fn fetch_device(&self, device_id: &str) -> Result<DeviceSnapshot, FleetApiError> {
        let url = self.device_url(device_id);
        let envelope: DeviceEnvelope = self.send(self.client.get(&url)).await?;
        Ok(envelope.data.into_domain())
    }

    async fn fetch_summary(
        &self,
        device_id: &str,
        window: &TimeWindow,
    ) -> Result<SummaryStats, FleetApiError> {
        let url = self.summary_url(device_id, window);
        let envelope: SummaryEnvelope = self.send(self.client.get(&url)).await?;
        Ok(envelope.data.statistics.into_domain())
    }

    async fn fetch_track(
        &self,
        device_id: &str,
        window: &TimeWindow,
        max_points: u32,
    ) -> Result<Track, FleetApiError> {
        let url = self.track_url(device_id, window, max_points);
        let envelope: TrackEnvelope = self.send(self.client.get(&url)).await?;
        Ok(envelope.data.into_domain())
    }

    async fn fetch_history(
        &self,
        device_id: &str,
        window: &TimeWindow,
        page: u32,
        limit: u32,
    ) -> Result<HistoryBatch, FleetApiError> {
        let url = self.history_url(device_id);
        let request = HistoryRequest::new(window, page, limit);
        let envelope: HistoryEnvelope = self.send(self.client.post(&url).json(&request)).await?;
        Ok(envelope.into_domain())
    }
}

// Error bodies are JSON `{"error": ...}` when the backend produced them
// and free text when a proxy did.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBodyDto>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.chars().take(200).collect(),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBodyDto {
    error: String,
}

/// History queries always send explicit bounds; the backend's own preset
/// vocabulary is bypassed with `custom`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRequest {
    time_preset: &'static str,
    time_params: TimeParams,
    pagination: PaginationParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeParams {
    start_time: String,
    end_time: String,
}

#[derive(Debug, Serialize)]
struct PaginationParams {
    enabled: bool,
    page: u32,
    limit: u32,
}

impl HistoryRequest {
    fn new(window: &TimeWindow, page: u32, limit: u32) -> Self {
        Self {
            time_preset: "custom",
            time_params: TimeParams {
                start_time: window.start_iso(),
                end_time: window.end_iso(),
            },
            pagination: PaginationParams {
                enabled: true,
                page,
                limit,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceEnvelope {
    data: DeviceDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceDto {
    imei: String,
    #[serde(default)]
    device_model: String,
    #[serde(default)]
    firmware_version: Option<String>,
    #[serde(default)]
    last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    vehicle: Option<VehicleDto>,
    #[serde(default)]
    sim_card: Option<SimCardDto>,
    #[serde(default)]
    real_time_status: Option<RealTimeStatusDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleDto {
    #[serde(default)]
    plate_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimCardDto {
    #[serde(default)]
    sim_number: Option<String>,
}

// The nested status keeps the ingest pipeline's snake_case keys while the
// device record itself is camelCase.
#[derive(Debug, Deserialize)]
struct RealTimeStatusDto {
    #[serde(default)]
    connection_status: Option<String>,
    #[serde(default)]
    last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    ignition: bool,
    #[serde(default)]
    satellites: u32,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    heading: f64,
    #[serde(default)]
    io_elements: IoElementMap,
}

impl DeviceDto {
    fn into_domain(self) -> DeviceSnapshot {
        DeviceSnapshot {
            imei: self.imei,
            device_model: self.device_model,
            firmware_version: self.firmware_version,
            plate_number: self.vehicle.and_then(|vehicle| vehicle.plate_number),
            sim_number: self.sim_card.and_then(|sim| sim.sim_number),
            last_seen: self.last_seen,
            real_time_status: self.real_time_status.map(RealTimeStatusDto::into_domain),
        }
    }
}

impl RealTimeStatusDto {
    fn into_domain(self) -> RealTimeStatus {
        // Anything other than a literal "online" reads as offline.
        let connection_status = match self.connection_status.as_deref() {
            Some("online") => ConnectionStatus::Online,
            _ => ConnectionStatus::Offline,
        };
        RealTimeStatus {
            connection_status,
            last_seen: self.last_seen,
            ignition: self.ignition,
            satellites: self.satellites,
            latitude: self.latitude,
            longitude: self.longitude,
            speed_kmh: self.speed,
            heading_deg: self.heading,
            io_elements: self.io_elements,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    data: SummaryDataDto,
}

#[derive(Debug, Deserialize)]
struct SummaryDataDto {
    statistics: StatisticsDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatisticsDto {
    distance_traveled: f64,
    max_speed: f64,
    avg_speed: f64,
    ignition_on_time: u64,
}

impl StatisticsDto {
    fn into_domain(self) -> SummaryStats {
        SummaryStats {
            distance_traveled_m: self.distance_traveled,
            max_speed_kmh: self.max_speed,
            avg_speed_kmh: self.avg_speed,
            ignition_on_samples: self.ignition_on_time,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrackEnvelope {
    data: TrackDataDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackDataDto {
    track: Vec<TrackPointDto>,
}

#[derive(Debug, Deserialize)]
struct TrackPointDto {
    coordinates: Vec<f64>,
}

impl TrackDataDto {
    // Points arrive as GeoJSON-style [longitude, latitude] pairs. Entries
    // without both coordinates are dropped.
    fn into_domain(self) -> Track {
        let points = self
            .track
            .into_iter()
            .filter_map(|point| match point.coordinates.as_slice() {
                [longitude, latitude, ..] => Some(TrackPoint::new(*longitude, *latitude)),
                _ => None,
            })
            .collect();
        Track::new(points)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    data: Vec<HistoryRowDto>,
    #[serde(default)]
    meta: Option<HistoryMetaDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryMetaDto {
    #[serde(default)]
    returned_records: u32,
}

#[derive(Debug, Deserialize)]
struct HistoryRowDto {
    time: DateTime<Utc>,
    #[serde(default)]
    gps: Option<GpsDto>,
    #[serde(default)]
    telemetry: Option<TelemetryDto>,
    #[serde(default)]
    elements: IoElementMap,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GpsDto {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TelemetryDto {
    speed: f64,
}

impl HistoryEnvelope {
    fn into_domain(self) -> HistoryBatch {
        let returned_records = self.meta.map(|meta| meta.returned_records).unwrap_or(0);
        let rows = self
            .data
            .into_iter()
            .map(HistoryRowDto::into_domain)
            .collect();
        HistoryBatch {
            rows,
            returned_records,
        }
    }
}

impl HistoryRowDto {
    fn into_domain(self) -> HistoryRow {
        HistoryRow {
            time: self.time,
            gps: self.gps.map(|gps| GpsFix {
                latitude: gps.latitude,
                longitude: gps.longitude,
            }),
            telemetry: self.telemetry.map(|telemetry| TelemetrySample {
                speed_kmh: telemetry.speed,
            }),
            elements: self.elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::device::IoValue;

    fn client() -> FleetApiClient {
        FleetApiClient::new(
            "http://localhost:3000/api/v1/".to_string(),
            "secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn window() -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        TimeWindow::new(start, end)
    }

    #[test]
    fn test_device_payload_maps_to_snapshot() {
        let payload = r#"{
            "data": {
                "imei": "860000000000001",
                "deviceModel": "FMB920",
                "firmwareVersion": "03.29.01",
                "lastSeen": "2024-03-05T09:58:11.000Z",
                "vehicle": { "plateNumber": "B 1234 XYZ" },
                "simCard": { "simNumber": "89620012345" },
                "realTimeStatus": {
                    "connection_status": "online",
                    "last_seen": "2024-03-05T09:59:41.000Z",
                    "ignition": true,
                    "satellites": 11,
                    "latitude": -6.2088,
                    "longitude": 106.8456,
                    "speed": 42.5,
                    "heading": 135,
                    "io_elements": {
                        "67": 24300,
                        "84": { "value": 62.5, "unit": "%" }
                    }
                }
            }
        }"#;

        let envelope: DeviceEnvelope = serde_json::from_str(payload).unwrap();
        let snapshot = envelope.data.into_domain();

        assert_eq!(snapshot.imei, "860000000000001");
        assert_eq!(snapshot.device_model, "FMB920");
        assert_eq!(snapshot.plate_number.as_deref(), Some("B 1234 XYZ"));
        assert_eq!(snapshot.sim_number.as_deref(), Some("89620012345"));
        assert!(snapshot.is_online());

        let status = snapshot.real_time_status.as_ref().unwrap();
        assert!(status.ignition);
        assert_eq!(status.satellites, 11);
        assert_eq!(status.speed_kmh, 42.5);
        assert_eq!(status.heading_deg, 135.0);
        assert_eq!(
            status.io_elements.get("67"),
            Some(&IoValue::Scalar(24_300.0))
        );
        assert_eq!(
            status.io_elements.get("84"),
            Some(&IoValue::Detailed {
                value: 62.5,
                unit: Some("%".to_string()),
            })
        );
    }

    #[test]
    fn test_bare_device_payload_still_maps() {
        let payload = r#"{ "data": { "imei": "860000000000002" } }"#;

        let envelope: DeviceEnvelope = serde_json::from_str(payload).unwrap();
        let snapshot = envelope.data.into_domain();

        assert_eq!(snapshot.imei, "860000000000002");
        assert_eq!(snapshot.device_model, "");
        assert_eq!(snapshot.plate_number, None);
        assert_eq!(snapshot.sim_number, None);
        assert!(!snapshot.is_online());
        assert!(snapshot.real_time_status.is_none());
    }

    #[test]
    fn test_unknown_connection_status_reads_offline() {
        let payload = r#"{
            "data": {
                "imei": "860000000000003",
                "realTimeStatus": { "connection_status": "degraded" }
            }
        }"#;

        let envelope: DeviceEnvelope = serde_json::from_str(payload).unwrap();
        let snapshot = envelope.data.into_domain();
        assert!(!snapshot.is_online());
    }

    #[test]
    fn test_summary_statistics_parse() {
        let payload = r#"{
            "data": {
                "statistics": {
                    "distanceTraveled": 15500.4,
                    "maxSpeed": 92,
                    "avgSpeed": 41.5,
                    "ignitionOnTime": 120
                }
            }
        }"#;

        let envelope: SummaryEnvelope = serde_json::from_str(payload).unwrap();
        let stats = envelope.data.statistics.into_domain();

        assert_eq!(stats.distance_traveled_m, 15_500.4);
        assert_eq!(stats.max_speed_kmh, 92.0);
        assert_eq!(stats.avg_speed_kmh, 41.5);
        assert_eq!(stats.ignition_on_samples, 120);
    }

    #[test]
    fn test_track_points_keep_upstream_order() {
        let payload = r#"{
            "data": {
                "track": [
                    { "coordinates": [106.80, -6.20] },
                    { "coordinates": [106.81, -6.21, 54.0] },
                    { "coordinates": [106.82] }
                ]
            }
        }"#;

        let envelope: TrackEnvelope = serde_json::from_str(payload).unwrap();
        let track = envelope.data.into_domain();

        assert_eq!(track.points.len(), 2);
        assert_eq!(track.points[0], TrackPoint::new(106.80, -6.20));
        assert_eq!(track.points[1], TrackPoint::new(106.81, -6.21));
    }

    #[test]
    fn test_empty_track_payload() {
        let envelope: TrackEnvelope = serde_json::from_str(r#"{ "data": {} }"#).unwrap();
        assert!(envelope.data.into_domain().is_empty());
    }

    #[test]
    fn test_history_rows_with_optional_sections() {
        let payload = r#"{
            "data": [
                {
                    "time": "2024-03-05T10:15:00.000Z",
                    "gps": { "latitude": -6.2, "longitude": 106.8 },
                    "telemetry": { "speed": 38 },
                    "elements": { "239": { "value": 1 }, "ignition": { "value": 0 } }
                },
                { "time": "2024-03-05T10:15:10.000Z" }
            ],
            "meta": { "returnedRecords": 2 }
        }"#;

        let envelope: HistoryEnvelope = serde_json::from_str(payload).unwrap();
        let batch = envelope.into_domain();

        assert_eq!(batch.returned_records, 2);
        assert_eq!(batch.rows.len(), 2);

        let first = &batch.rows[0];
        assert_eq!(
            first.time,
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 0).unwrap()
        );
        assert_eq!(first.gps.unwrap().latitude, -6.2);
        assert_eq!(first.telemetry.unwrap().speed_kmh, 38.0);
        assert_eq!(first.elements.len(), 2);

        let second = &batch.rows[1];
        assert_eq!(second.gps, None);
        assert_eq!(second.telemetry, None);
        assert!(second.elements.is_empty());
    }

    #[test]
    fn test_history_without_meta_reports_zero_records() {
        let envelope: HistoryEnvelope = serde_json::from_str(r#"{ "data": [] }"#).unwrap();
        let batch = envelope.into_domain();
        assert_eq!(batch.returned_records, 0);
        assert!(batch.rows.is_empty());
    }

    #[test]
    fn test_history_request_wire_shape() {
        let request = HistoryRequest::new(&window(), 3, 50);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["timePreset"], "custom");
        assert_eq!(value["timeParams"]["startTime"], "2024-03-05T10:00:00.000Z");
        assert_eq!(value["timeParams"]["endTime"], "2024-03-05T12:00:00.000Z");
        assert_eq!(value["pagination"]["enabled"], true);
        assert_eq!(value["pagination"]["page"], 3);
        assert_eq!(value["pagination"]["limit"], 50);
    }

    #[test]
    fn test_urls_encode_path_and_query_values() {
        let client = client();
        assert_eq!(
            client.device_url("TRK 01/A"),
            "http://localhost:3000/api/v1/devices/TRK%2001%2FA"
        );
        assert_eq!(
            client.summary_url("dev-1", &window()),
            "http://localhost:3000/api/v1/telemetry/dev-1/summary?start=2024-03-05T10%3A00%3A00.000Z&end=2024-03-05T12%3A00%3A00.000Z"
        );
        assert_eq!(
            client.track_url("dev-1", &window(), 500),
            "http://localhost:3000/api/v1/telemetry/dev-1/track?start=2024-03-05T10%3A00%3A00.000Z&end=2024-03-05T12%3A00%3A00.000Z&maxPoints=500"
        );
        assert_eq!(
            client.history_url("dev-1"),
            "http://localhost:3000/api/v1/history/dev-1"
        );
    }

    #[test]
    fn test_error_message_prefers_json_error_field() {
        assert_eq!(
            error_message(r#"{ "error": "Device not found" }"#),
            "Device not found"
        );
        assert_eq!(error_message("upstream timed out"), "upstream timed out");
    }
}
