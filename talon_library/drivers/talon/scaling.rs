//! Native sensor units <-> engineering units
//!
//! Native positions are sensor ticks; native velocities are ticks per 100 ms.
//! When the scalar for a sensor is unavailable (no CPR or pot turns configured)
//! every conversion passes the value through unscaled.

use serde::{Deserialize, Serialize};

use super::FeedbackDevice;

/// ADC counts per rotation of a single-turn analog sensor
pub const NATIVE_ADC_UNITS_PER_ROTATION: f64 = 1024.0;

/// Pulse-width codes per rotation (magnetic encoders and pulse-width sensors)
pub const NATIVE_PWD_UNITS_PER_ROTATION: f64 = 4096.0;

/// 100 ms velocity periods per minute
const PERIODS_PER_MINUTE: f64 = 600.0;

/// Sensor characteristics needed for unit scaling
///
/// Zero in either field means "not configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Encoder codes per revolution
    pub codes_per_rev: u32,
    /// Full-scale turns of an analog potentiometer/encoder
    pub pot_turns: u32,
}

impl SensorConfig {
    pub fn new(codes_per_rev: u32, pot_turns: u32) -> Self {
        Self {
            codes_per_rev,
            pot_turns,
        }
    }
}

/// Unit conversions for one device
///
/// `selected` is the feedback device the Talon is actually configured with.
/// It matters when looking up quadrature scaling: a magnetic encoder also
/// drives the quadrature input at its own fixed resolution, and an edge
/// counter puts the quadrature decoder in 1x mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitScaler {
    selected: FeedbackDevice,
    sensor: SensorConfig,
}

impl UnitScaler {
    pub fn new(selected: FeedbackDevice, sensor: SensorConfig) -> Self {
        Self { selected, sensor }
    }

    pub fn selected(&self) -> FeedbackDevice {
        self.selected
    }

    pub fn sensor(&self) -> SensorConfig {
        self.sensor
    }

    pub fn select(&mut self, device: FeedbackDevice) {
        self.selected = device;
    }

    pub fn set_codes_per_rev(&mut self, codes_per_rev: u32) {
        self.sensor.codes_per_rev = codes_per_rev;
    }

    pub fn set_pot_turns(&mut self, turns: u32) {
        self.sensor.pot_turns = turns;
    }

    /// Native units per rotation of `device`, `None` when not configured
    pub fn native_units_per_rotation(&self, device: FeedbackDevice) -> Option<f64> {
        let cpr = self.sensor.codes_per_rev;
        match device {
            FeedbackDevice::QuadratureEncoder => {
                if self.selected.is_magnetic() {
                    return Some(NATIVE_PWD_UNITS_PER_ROTATION);
                }
                if cpr == 0 {
                    return None;
                }
                let edges_per_code = match self.selected {
                    FeedbackDevice::EdgeCounterRising | FeedbackDevice::EdgeCounterFalling => 1.0,
                    _ => 4.0,
                };
                Some(edges_per_code * f64::from(cpr))
            }
            FeedbackDevice::EdgeCounterRising | FeedbackDevice::EdgeCounterFalling => {
                (cpr != 0).then(|| f64::from(cpr))
            }
            FeedbackDevice::AnalogPotentiometer | FeedbackDevice::AnalogEncoder => {
                let turns = self.sensor.pot_turns;
                (turns != 0).then(|| NATIVE_ADC_UNITS_PER_ROTATION / f64::from(turns))
            }
            FeedbackDevice::MagneticEncoderRelative
            | FeedbackDevice::MagneticEncoderAbsolute
            | FeedbackDevice::PulseWidth => Some(NATIVE_PWD_UNITS_PER_ROTATION),
        }
    }

    pub fn rotations_to_native(&self, device: FeedbackDevice, rotations: f64) -> i32 {
        match self.native_units_per_rotation(device) {
            Some(scalar) => (rotations * scalar) as i32,
            None => rotations as i32,
        }
    }

    pub fn native_to_rotations(&self, device: FeedbackDevice, native: i32) -> f64 {
        match self.native_units_per_rotation(device) {
            Some(scalar) => f64::from(native) / scalar,
            None => f64::from(native),
        }
    }

    /// RPM to native ticks per 100 ms
    pub fn rpm_to_native_velocity(&self, device: FeedbackDevice, rpm: f64) -> i32 {
        match self.native_units_per_rotation(device) {
            Some(scalar) => (rpm * scalar / PERIODS_PER_MINUTE) as i32,
            None => rpm as i32,
        }
    }

    /// Native ticks per 100 ms to RPM
    pub fn native_velocity_to_rpm(&self, device: FeedbackDevice, native: i32) -> f64 {
        match self.native_units_per_rotation(device) {
            Some(scalar) => f64::from(native) * PERIODS_PER_MINUTE / scalar,
            None => f64::from(native),
        }
    }
}

// ============================================================================
// Free functions (device is both the lookup and the selection)
// ============================================================================

pub fn native_units_per_rotation(device: FeedbackDevice, sensor: &SensorConfig) -> Option<f64> {
    UnitScaler::new(device, *sensor).native_units_per_rotation(device)
}

pub fn rotations_to_native(device: FeedbackDevice, sensor: &SensorConfig, rotations: f64) -> i32 {
    UnitScaler::new(device, *sensor).rotations_to_native(device, rotations)
}

pub fn native_to_rotations(device: FeedbackDevice, sensor: &SensorConfig, native: i32) -> f64 {
    UnitScaler::new(device, *sensor).native_to_rotations(device, native)
}

pub fn rpm_to_native_velocity(device: FeedbackDevice, sensor: &SensorConfig, rpm: f64) -> i32 {
    UnitScaler::new(device, *sensor).rpm_to_native_velocity(device, rpm)
}

pub fn native_velocity_to_rpm(device: FeedbackDevice, sensor: &SensorConfig, native: i32) -> f64 {
    UnitScaler::new(device, *sensor).native_velocity_to_rpm(device, native)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const QUAD: FeedbackDevice = FeedbackDevice::QuadratureEncoder;

    #[test]
    fn test_quadrature_uses_4x_cpr() {
        let sensor = SensorConfig::new(1000, 0);
        assert_eq!(native_units_per_rotation(QUAD, &sensor), Some(4000.0));
        assert_eq!(rotations_to_native(QUAD, &sensor, 2.0), 8000);
        assert_eq!(rpm_to_native_velocity(QUAD, &sensor, 600.0), 4000);
        assert_abs_diff_eq!(native_velocity_to_rpm(QUAD, &sensor, 4000), 600.0);
    }

    #[test]
    fn test_edge_counters_use_1x_cpr() {
        let sensor = SensorConfig::new(250, 0);
        for device in [
            FeedbackDevice::EdgeCounterRising,
            FeedbackDevice::EdgeCounterFalling,
        ] {
            assert_eq!(native_units_per_rotation(device, &sensor), Some(250.0));
            // Quadrature lookup while an edge counter is selected is 1x as well
            let scaler = UnitScaler::new(device, sensor);
            assert_eq!(scaler.native_units_per_rotation(QUAD), Some(250.0));
        }
    }

    #[test]
    fn test_magnetic_selection_overrides_quadrature_cpr() {
        let scaler = UnitScaler::new(
            FeedbackDevice::MagneticEncoderRelative,
            SensorConfig::new(1000, 0),
        );
        assert_eq!(scaler.native_units_per_rotation(QUAD), Some(4096.0));

        let unconfigured = UnitScaler::new(
            FeedbackDevice::MagneticEncoderAbsolute,
            SensorConfig::default(),
        );
        assert_eq!(unconfigured.native_units_per_rotation(QUAD), Some(4096.0));
    }

    #[test]
    fn test_pulse_width_family_is_fixed() {
        for device in [
            FeedbackDevice::MagneticEncoderRelative,
            FeedbackDevice::MagneticEncoderAbsolute,
            FeedbackDevice::PulseWidth,
        ] {
            assert_eq!(
                native_units_per_rotation(device, &SensorConfig::default()),
                Some(4096.0)
            );
        }
    }

    #[test]
    fn test_analog_scalar() {
        let sensor = SensorConfig::new(0, 10);
        assert_eq!(
            native_units_per_rotation(FeedbackDevice::AnalogPotentiometer, &sensor),
            Some(102.4)
        );
        assert_eq!(
            rotations_to_native(FeedbackDevice::AnalogEncoder, &sensor, 5.0),
            512
        );
    }

    #[test]
    fn test_unconfigured_is_identity() {
        let sensor = SensorConfig::default();
        for device in [
            QUAD,
            FeedbackDevice::EdgeCounterRising,
            FeedbackDevice::AnalogPotentiometer,
            FeedbackDevice::AnalogEncoder,
        ] {
            assert_eq!(native_units_per_rotation(device, &sensor), None);
            assert_eq!(rotations_to_native(device, &sensor, 3.7), 3);
            assert_eq!(rotations_to_native(device, &sensor, -3.7), -3);
            assert_eq!(native_to_rotations(device, &sensor, 1234), 1234.0);
            assert_eq!(rpm_to_native_velocity(device, &sensor, 99.9), 99);
            assert_eq!(native_velocity_to_rpm(device, &sensor, -42), -42.0);
        }
    }

    #[test]
    fn test_truncates_toward_zero() {
        let sensor = SensorConfig::new(1000, 0);
        assert_eq!(rotations_to_native(QUAD, &sensor, 0.00049), 1);
        assert_eq!(rotations_to_native(QUAD, &sensor, -0.00049), -1);
        assert_eq!(rotations_to_native(QUAD, &sensor, -0.0002), 0);
    }

    #[test]
    fn test_round_trip_within_one_native_unit() {
        let configs = [
            (QUAD, SensorConfig::new(360, 0)),
            (FeedbackDevice::EdgeCounterFalling, SensorConfig::new(128, 0)),
            (FeedbackDevice::AnalogPotentiometer, SensorConfig::new(0, 3)),
            (FeedbackDevice::PulseWidth, SensorConfig::default()),
        ];

        for (device, sensor) in configs {
            let scalar = native_units_per_rotation(device, &sensor).unwrap();
            for x in [-12.34, -0.5, 0.0, 0.001, 1.0, 7.77, 250.0] {
                let native = rotations_to_native(device, &sensor, x);
                let back = native_to_rotations(device, &sensor, native);
                assert_abs_diff_eq!(back, x, epsilon = 1.0 / scalar);

                let rpm = x * 100.0;
                let native = rpm_to_native_velocity(device, &sensor, rpm);
                let back = native_velocity_to_rpm(device, &sensor, native);
                assert_abs_diff_eq!(back, rpm, epsilon = 600.0 / scalar);
            }
        }
    }

    #[test]
    fn test_scaler_setters() {
        let mut scaler = UnitScaler::default();
        assert_eq!(scaler.native_units_per_rotation(QUAD), None);
        scaler.set_codes_per_rev(1024);
        assert_eq!(scaler.native_units_per_rotation(QUAD), Some(4096.0));
        scaler.select(FeedbackDevice::EdgeCounterRising);
        assert_eq!(scaler.native_units_per_rotation(QUAD), Some(1024.0));
        scaler.set_pot_turns(1);
        assert_eq!(
            scaler.native_units_per_rotation(FeedbackDevice::AnalogEncoder),
            Some(1024.0)
        );
        assert_eq!(scaler.sensor(), SensorConfig::new(1024, 1));
    }
}
