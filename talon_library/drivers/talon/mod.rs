//! Talon SRX motor-controller driver
//!
//! This module provides the driver for a Talon SRX on the CAN bus. The bus
//! itself is reached through the [`TalonTransport`] trait; everything above it
//! (unit scaling, the control-mode state machine, the parameter proxy and the
//! [`TalonSrx`] facade) is transport independent.
//!
//! # Available Transports
//!
//! - `SimulationTalonTransport` - Always available, simulates a Talon SRX in memory
//!
//! # Layout
//!
//! ```text
//! TalonSrx (device.rs)
//!   ├── ControlModeMachine (control.rs)   mode, enable flag, setpoint, inversion
//!   ├── UnitScaler (scaling.rs)           native ticks <-> rotations / RPM
//!   ├── ParameterProxy (params.rs)        request -> settle -> read back
//!   └── ModeObserver (observer.rs)        notified on every applied mode
//! ```

pub mod config;
mod control;
mod device;
mod observer;
mod params;
mod scaling;
mod simulation;

pub use config::{DevicesConfig, ProfileConfig, TalonDeviceConfig};
pub use control::{encode_demand, ControlModeMachine};
pub use device::TalonSrx;
pub use observer::{LogModeObserver, ModeObserver, NoopModeObserver};
pub use params::{ParamId, ParameterProxy, SETTLE_DELAY};
pub use scaling::{
    native_to_rotations, native_units_per_rotation, native_velocity_to_rpm, rotations_to_native,
    rpm_to_native_velocity, SensorConfig, UnitScaler,
};
pub use simulation::SimulationTalonTransport;

use serde::{Deserialize, Serialize};
use talon_core::{DriverStatus, TalonResult};

/// Full-scale applied throttle in native units
pub const THROTTLE_FULL_SCALE: f64 = 1023.0;

/// Nominal bus voltage used by the throttle/voltage conversions
pub const NOMINAL_BUS_VOLTAGE: f64 = 12.0;

// ============================================================================
// Enumerations
// ============================================================================

/// Talon control mode
///
/// Exactly one mode is active at a time. `Disabled` is always reachable and is
/// what the wire-level mode selector is forced to on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Fraction of bus voltage, -1.0 to 1.0
    PercentOutput,
    /// Closed-loop position, in rotations
    Position,
    /// Closed-loop velocity, in RPM
    Velocity,
    /// Closed-loop current, in amperes
    Current,
    /// Output voltage, in volts
    Voltage,
    /// Mirror another Talon, value is its device id
    Follower,
    #[default]
    Disabled,
}

impl ControlMode {
    pub const ALL: [ControlMode; 7] = [
        ControlMode::PercentOutput,
        ControlMode::Position,
        ControlMode::Velocity,
        ControlMode::Current,
        ControlMode::Voltage,
        ControlMode::Follower,
        ControlMode::Disabled,
    ];

    /// Wire code carried in the control frame's mode selector
    pub const fn code(self) -> i32 {
        match self {
            ControlMode::PercentOutput => 0,
            ControlMode::Position => 1,
            ControlMode::Velocity => 2,
            ControlMode::Current => 3,
            ControlMode::Voltage => 4,
            ControlMode::Follower => 5,
            ControlMode::Disabled => 15,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    /// True for the modes where the Talon runs its own feedback loop
    pub const fn is_closed_loop(self) -> bool {
        matches!(
            self,
            ControlMode::Position | ControlMode::Velocity | ControlMode::Current
        )
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlMode::PercentOutput => "PercentOutput",
            ControlMode::Position => "Position",
            ControlMode::Velocity => "Velocity",
            ControlMode::Current => "Current",
            ControlMode::Voltage => "Voltage",
            ControlMode::Follower => "Follower",
            ControlMode::Disabled => "Disabled",
        };
        write!(f, "{}", name)
    }
}

/// Sensor used by the Talon for closed-loop feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackDevice {
    #[default]
    QuadratureEncoder,
    AnalogPotentiometer,
    AnalogEncoder,
    EdgeCounterRising,
    EdgeCounterFalling,
    MagneticEncoderRelative,
    MagneticEncoderAbsolute,
    PulseWidth,
}

impl FeedbackDevice {
    pub const ALL: [FeedbackDevice; 8] = [
        FeedbackDevice::QuadratureEncoder,
        FeedbackDevice::AnalogPotentiometer,
        FeedbackDevice::AnalogEncoder,
        FeedbackDevice::EdgeCounterRising,
        FeedbackDevice::EdgeCounterFalling,
        FeedbackDevice::MagneticEncoderRelative,
        FeedbackDevice::MagneticEncoderAbsolute,
        FeedbackDevice::PulseWidth,
    ];

    /// Wire code for the feedback device select field
    pub const fn code(self) -> i32 {
        match self {
            FeedbackDevice::QuadratureEncoder => 0,
            FeedbackDevice::AnalogPotentiometer => 2,
            FeedbackDevice::AnalogEncoder => 3,
            FeedbackDevice::EdgeCounterRising => 4,
            FeedbackDevice::EdgeCounterFalling => 5,
            FeedbackDevice::MagneticEncoderRelative => 6,
            FeedbackDevice::MagneticEncoderAbsolute => 7,
            FeedbackDevice::PulseWidth => 8,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    /// Magnetic encoders report their own resolution over pulse width
    pub const fn is_magnetic(self) -> bool {
        matches!(
            self,
            FeedbackDevice::MagneticEncoderRelative | FeedbackDevice::MagneticEncoderAbsolute
        )
    }

    /// Sensors whose presence is visible through the pulse-width input
    pub const fn uses_pulse_width(self) -> bool {
        matches!(
            self,
            FeedbackDevice::PulseWidth
                | FeedbackDevice::MagneticEncoderRelative
                | FeedbackDevice::MagneticEncoderAbsolute
        )
    }
}

/// Whether a feedback sensor appears to be connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackDeviceStatus {
    /// The Talon has no way to tell for this sensor type
    #[default]
    Unknown,
    Present,
    NotPresent,
}

/// Status frames whose broadcast period can be changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFrameRate {
    General,
    Feedback,
    QuadEncoder,
    AnalogTempVbat,
    PulseWidth,
}

/// Control-frame fields that are not device parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlField {
    ProfileSlotSelect,
    FeedbackDeviceSelect,
    RevFeedbackSensor,
    RevMotDuringCloseLoop,
    /// Limit switch override mask, see `TalonSrx::enable_limit_switch`
    OverrideLimitSwitchEnable,
    /// 0 = use boot setting, 1 = coast, 2 = brake
    OverrideBrakeType,
    /// Throttle units per 10 ms
    RampThrottle,
}

// ============================================================================
// Telemetry
// ============================================================================

/// Fault latches reported by the Talon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    OverTemp,
    UnderVoltage,
    ForwardLimit,
    ReverseLimit,
    HardwareFailure,
    ForwardSoftLimit,
    ReverseSoftLimit,
}

/// One set of fault bits (either live or sticky)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Faults {
    pub over_temp: bool,
    pub under_voltage: bool,
    pub forward_limit: bool,
    pub reverse_limit: bool,
    pub hardware_failure: bool,
    pub forward_soft_limit: bool,
    pub reverse_soft_limit: bool,
}

impl Faults {
    pub fn get(&self, kind: FaultKind) -> bool {
        match kind {
            FaultKind::OverTemp => self.over_temp,
            FaultKind::UnderVoltage => self.under_voltage,
            FaultKind::ForwardLimit => self.forward_limit,
            FaultKind::ReverseLimit => self.reverse_limit,
            FaultKind::HardwareFailure => self.hardware_failure,
            FaultKind::ForwardSoftLimit => self.forward_soft_limit,
            FaultKind::ReverseSoftLimit => self.reverse_soft_limit,
        }
    }

    pub fn set(&mut self, kind: FaultKind, value: bool) {
        match kind {
            FaultKind::OverTemp => self.over_temp = value,
            FaultKind::UnderVoltage => self.under_voltage = value,
            FaultKind::ForwardLimit => self.forward_limit = value,
            FaultKind::ReverseLimit => self.reverse_limit = value,
            FaultKind::HardwareFailure => self.hardware_failure = value,
            FaultKind::ForwardSoftLimit => self.forward_soft_limit = value,
            FaultKind::ReverseSoftLimit => self.reverse_soft_limit = value,
        }
    }

    pub fn any(&self) -> bool {
        *self != Faults::default()
    }
}

/// Latest status-frame contents, in native units
///
/// Limit switch inputs are raw pin levels: `0` means the switch is closed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub sensor_position: i32,
    pub sensor_velocity: i32,
    pub enc_position: i32,
    pub enc_velocity: i32,
    pub enc_index_rise_events: i32,
    pub quad_a_pin: i32,
    pub quad_b_pin: i32,
    pub quad_idx_pin: i32,
    /// 24-bit: low 10 bits are the ADC, upper bits track over/underflow
    pub analog_in_with_ov: i32,
    pub analog_in_velocity: i32,
    pub pulse_width_position: i32,
    pub pulse_width_velocity: i32,
    pub pulse_width_rise_to_fall_us: i32,
    pub pulse_width_rise_to_rise_us: i32,
    pub pulse_width_present: bool,
    /// -1023 to 1023
    pub applied_throttle: i32,
    pub close_loop_error: i32,
    /// Amperes
    pub current: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Volts
    pub battery_voltage: f64,
    pub limit_switch_closed_forward: i32,
    pub limit_switch_closed_reverse: i32,
    pub brake_is_enabled: bool,
    pub faults: Faults,
    pub sticky_faults: Faults,
}

// ============================================================================
// Closed-loop gains
// ============================================================================

/// Gains for one closed-loop profile slot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
    /// Integral zone, native units; 0 disables it
    pub izone: i32,
    /// Volts per second; 0 disables ramping
    pub close_loop_ramp_rate: f64,
}

impl PidGains {
    pub fn new(p: f64, i: f64, d: f64) -> Self {
        Self {
            p,
            i,
            d,
            ..Default::default()
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// The narrow command/query surface a Talon bus backend presents
///
/// Sends are fire-and-forget: `Ok(())` means the frame was queued, not that
/// the device acted on it. Reads return whatever the backend last received.
pub trait TalonTransport {
    // Lifecycle methods

    fn init(&mut self) -> TalonResult<()>;

    fn shutdown(&mut self) -> TalonResult<()>;

    fn is_available(&self) -> bool;

    fn status(&self) -> DriverStatus;

    /// Period at which the control frame is re-sent, already bounded by the caller
    fn set_control_period_ms(&mut self, period_ms: u32) -> TalonResult<()>;

    // Control frame

    fn send_mode_and_demand(&mut self, mode_code: i32, demand: i32) -> TalonResult<()>;

    fn set_control_field(&mut self, field: ControlField, value: i32) -> TalonResult<()>;

    // Parameters

    fn send_param_write(&mut self, param: ParamId, value: f64) -> TalonResult<()>;

    fn request_param(&mut self, param: ParamId) -> TalonResult<()>;

    /// Last response received for `param`, 0.0 if none ever arrived
    fn read_param_response(&self, param: ParamId) -> f64;

    fn clear_sticky_faults(&mut self) -> TalonResult<()>;

    // Status frames

    fn telemetry(&self) -> Telemetry;
}

impl<T: TalonTransport + ?Sized> TalonTransport for Box<T> {
    fn init(&mut self) -> TalonResult<()> {
        (**self).init()
    }

    fn shutdown(&mut self) -> TalonResult<()> {
        (**self).shutdown()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn status(&self) -> DriverStatus {
        (**self).status()
    }

    fn set_control_period_ms(&mut self, period_ms: u32) -> TalonResult<()> {
        (**self).set_control_period_ms(period_ms)
    }

    fn send_mode_and_demand(&mut self, mode_code: i32, demand: i32) -> TalonResult<()> {
        (**self).send_mode_and_demand(mode_code, demand)
    }

    fn set_control_field(&mut self, field: ControlField, value: i32) -> TalonResult<()> {
        (**self).set_control_field(field, value)
    }

    fn send_param_write(&mut self, param: ParamId, value: f64) -> TalonResult<()> {
        (**self).send_param_write(param, value)
    }

    fn request_param(&mut self, param: ParamId) -> TalonResult<()> {
        (**self).request_param(param)
    }

    fn read_param_response(&self, param: ParamId) -> f64 {
        (**self).read_param_response(param)
    }

    fn clear_sticky_faults(&mut self) -> TalonResult<()> {
        (**self).clear_sticky_faults()
    }

    fn telemetry(&self) -> Telemetry {
        (**self).telemetry()
    }
}
