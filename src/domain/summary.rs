// Summary statistics domain model

/// Aggregates the backend computes over one time window. Distance arrives
/// in meters, speeds in km/h.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryStats {
    pub distance_traveled_m: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub ignition_on_samples: u64,
}
