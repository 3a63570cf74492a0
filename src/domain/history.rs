// History page domain models
use chrono::{DateTime, Utc};

use crate::domain::device::IoElementMap;

pub const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsFix {
    /// A zeroed fix is how the ingest pipeline reports "no fix".
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySample {
    pub speed_kmh: f64,
}

/// One raw record from the history endpoint. The gps and telemetry
/// sub-records are independently optional.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub time: DateTime<Utc>,
    pub gps: Option<GpsFix>,
    pub telemetry: Option<TelemetrySample>,
    pub elements: IoElementMap,
}

/// One upstream response worth of rows plus the record count the backend
/// reported for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryBatch {
    pub rows: Vec<HistoryRow>,
    pub returned_records: u32,
}

/// A loaded page as a view session holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub rows: Vec<HistoryRow>,
    pub page: u32,
    pub has_next: bool,
}

impl HistoryPage {
    pub fn empty(page: u32) -> Self {
        Self {
            rows: Vec::new(),
            page,
            has_next: false,
        }
    }
}
