// Movement status derivation
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementStatus {
    Moving,
    Idle,
    Stopped,
}

impl MovementStatus {
    /// Speed wins over ignition: any positive speed is Moving, ignition on
    /// while stationary is Idle, everything else is Stopped.
    pub fn classify(speed_kmh: f64, ignition_on: bool) -> Self {
        if speed_kmh > 0.0 {
            MovementStatus::Moving
        } else if ignition_on {
            MovementStatus::Idle
        } else {
            MovementStatus::Stopped
        }
    }
}
