// Repository trait for the fleet backend API
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::device::DeviceSnapshot;
use crate::domain::history::HistoryBatch;
use crate::domain::summary::SummaryStats;
use crate::domain::track::Track;
use crate::domain::window::TimeWindow;

/// Failures talking to the fleet backend. `NotFound` stays separate so
/// callers can tell a missing device from an unreachable backend.
#[derive(Debug, Error)]
pub enum FleetApiError {
    #[error("device not found")]
    NotFound,
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend request failed: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("could not decode backend response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait FleetRepository: Send + Sync {
    /// Fetch the device record with its embedded real-time status.
    async fn fetch_device(&self, device_id: &str) -> Result<DeviceSnapshot, FleetApiError>;

    /// Fetch aggregate statistics for one time window.
    async fn fetch_summary(
        &self,
        device_id: &str,
        window: &TimeWindow,
    ) -> Result<SummaryStats, FleetApiError>;

    /// Fetch the downsampled route for one time window.
    async fn fetch_track(
        &self,
        device_id: &str,
        window: &TimeWindow,
        max_points: u32,
    ) -> Result<Track, FleetApiError>;

    /// Fetch one page of raw history records.
    async fn fetch_history(
        &self,
        device_id: &str,
        window: &TimeWindow,
        page: u32,
        limit: u32,
    ) -> Result<HistoryBatch, FleetApiError>;
}
