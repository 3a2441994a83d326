//! Conversion of raw records to calibrated glucose values.
//!
//! _Requires Cargo feature `std`._

use crate::fram::{calibration::CalibrationInfo, record::GlucoseRecord};

extern crate std;

/// Thermistor coefficients, constant first.
const THERMISTOR: [f64; 4] = [0.0009180023, 0.0001964561, 0.0000007061775, 0.00000005283566];

const KELVIN: f64 = 273.15;

/// Temperature the sensitivity coefficients are referenced to, in Celsius.
const REFERENCE_TEMPERATURE: f64 = 32.5;

/// Apply the factory calibration to a raw record.
///
/// Fills in the record's `value` (mg/dL) and `temperature` (Celsius). Records
/// that are not yet valid, and images without calibration, are returned
/// unchanged, as are records for which the transform is undefined.
///
/// Only the offset `i3`, the slope `i4` and the temperature reference `i6`
/// take part. `i1`, `i2` and `i5` are ignored, so the value is not the one
/// the sensor vendor's own algorithm would report.
///
/// This transform is frozen: its outputs are fixed by regression vectors and
/// must not drift.
pub fn factory_glucose(raw: &GlucoseRecord, calibration: &CalibrationInfo) -> GlucoseRecord {
    let converted = (raw.slot_index >= 0 && !calibration.is_empty())
        .then(|| convert(raw, calibration))
        .flatten();

    match converted {
        Some((value, temperature)) => GlucoseRecord {
            value: Some(value),
            temperature: Some(temperature),
            ..*raw
        },
        None => *raw,
    }
}

fn convert(raw: &GlucoseRecord, calibration: &CalibrationInfo) -> Option<(i32, f64)> {
    let adjustment = f64::from(i32::from(raw.temperature_adjustment) + calibration.i6);
    let span = f64::from(calibration.i4 - calibration.i3);

    if adjustment == 0.0 || span == 0.0 {
        return None;
    }

    let resistance = f64::from(raw.raw_temperature) * 72_500.0 / adjustment - 1_000.0;
    if resistance <= 0.0 {
        return None;
    }

    let ln = resistance.ln();
    let [a, b, c, d] = THERMISTOR;
    let temperature = 1.0 / (d * ln.powi(3) + c * ln.powi(2) + b * ln + a) - KELVIN;

    let glucose = 65.0 * f64::from(i32::from(raw.raw_value) - calibration.i3) / span;
    let compensated = glucose * 1.045_f64.powf(REFERENCE_TEMPERATURE - temperature);

    Some((compensated.round() as i32, temperature))
}
