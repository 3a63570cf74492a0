// IO element decoding
use crate::domain::device::{IoElementMap, IoValue};

pub const IGNITION_CODE: &str = "239";
pub const IGNITION_ALIAS: &str = "ignition";
pub const FUEL_LEVEL_CODE: &str = "84";
pub const FUEL_LEVEL_ALIAS: &str = "fuel_level";
pub const ODOMETER_CODE: &str = "16";
pub const ODOMETER_ALIAS: &str = "odometer";
pub const POWER_VOLTAGE_CODE: &str = "67";

/// Well-known signals pulled out of one element map. Unreported signals
/// stay `None`, except ignition which reads as off.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecodedSignals {
    pub ignition_on: bool,
    pub fuel_percent: Option<f64>,
    pub odometer_km: Option<f64>,
    pub power_voltage: Option<f64>,
}

/// Decodes one element map. Ignition is on only when the element reads
/// exactly 1. Power voltage arrives in millivolts and is scaled to volts.
pub fn decode(elements: &IoElementMap) -> DecodedSignals {
    DecodedSignals {
        ignition_on: named_or_coded(elements, IGNITION_ALIAS, IGNITION_CODE)
            .map(|value| value == 1.0)
            .unwrap_or(false),
        fuel_percent: named_or_coded(elements, FUEL_LEVEL_ALIAS, FUEL_LEVEL_CODE),
        odometer_km: named_or_coded(elements, ODOMETER_ALIAS, ODOMETER_CODE),
        power_voltage: elements
            .get(POWER_VOLTAGE_CODE)
            .map(|value| value.value() / 1000.0),
    }
}

// The alias entry wins whenever its key is present, even when its value
// is zero.
fn named_or_coded(elements: &IoElementMap, alias: &str, code: &str) -> Option<f64> {
    elements
        .get(alias)
        .or_else(|| elements.get(code))
        .map(IoValue::value)
}
