//! Talon SRX device facade

use std::time::Duration;

use talon_core::{DriverStatus, TalonError, TalonResult};

use super::config::TalonDeviceConfig;
use super::control::ControlModeMachine;
use super::observer::{LogModeObserver, ModeObserver};
use super::params::{ParamId, ParameterProxy, SlotGain};
use super::scaling::{SensorConfig, UnitScaler};
use super::{
    ControlField, ControlMode, FaultKind, Faults, FeedbackDevice, FeedbackDeviceStatus, PidGains,
    StatusFrameRate, TalonTransport, NOMINAL_BUS_VOLTAGE, THROTTLE_FULL_SCALE,
};

/// Bounds for the control frame period, milliseconds
const CONTROL_PERIOD_RANGE: (u32, u32) = (1, 95);

/// Bounds for a status frame period, milliseconds
const STATUS_PERIOD_RANGE: (u32, u32) = (1, 255);

/// Low 10 bits of the analog input are the ADC reading
const ANALOG_RAW_MASK: i32 = 0x3FF;

/// A Talon SRX motor controller
///
/// The only type callers need: composes the control-mode state machine, the
/// unit scaler and the parameter proxy over a [`TalonTransport`].
///
/// A freshly constructed device has PercentOutput selected, control enabled,
/// profile slot 0 active and a setpoint of 0.0; the wire selector reads
/// Disabled until the first [`set_output`](Self::set_output).
///
/// # Example
///
/// ```rust,ignore
/// let mut talon = TalonSrx::new(1, transport)?;
/// talon.configure_feedback_device(FeedbackDevice::QuadratureEncoder)?;
/// talon.configure_encoder_resolution(360)?;
/// talon.change_control_mode(ControlMode::Position)?;
/// talon.set_output(2.5)?; // rotations
/// ```
pub struct TalonSrx<T: TalonTransport> {
    device_number: u8,
    transport: T,
    control: ControlModeMachine,
    scaler: UnitScaler,
    params: ParameterProxy,
    observer: Box<dyn ModeObserver>,
    profile: u8,
    released: bool,
}

impl<T: TalonTransport> TalonSrx<T> {
    pub fn new(device_number: u8, transport: T) -> TalonResult<Self> {
        Self::construct(device_number, None, transport, Box::new(LogModeObserver))
    }

    /// Construct with a control frame period, clamped to 1..=95 ms
    pub fn with_control_period(device_number: u8, period_ms: u32, transport: T) -> TalonResult<Self> {
        Self::construct(
            device_number,
            Some(period_ms),
            transport,
            Box::new(LogModeObserver),
        )
    }

    /// Construct with a custom mode observer
    ///
    /// The observer already sees the construction-time PercentOutput mode.
    pub fn with_observer<O: ModeObserver + 'static>(
        device_number: u8,
        transport: T,
        observer: O,
    ) -> TalonResult<Self> {
        Self::construct(device_number, None, transport, Box::new(observer))
    }

    /// Replace the parameter settle delay (default 4 ms)
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.params.set_settle_delay(settle_delay);
        self
    }

    fn construct(
        device_number: u8,
        period_ms: Option<u32>,
        mut transport: T,
        observer: Box<dyn ModeObserver>,
    ) -> TalonResult<Self> {
        if !transport.status().is_operational() {
            transport.init()?;
        }
        if let Some(period) = period_ms {
            let (min, max) = CONTROL_PERIOD_RANGE;
            transport.set_control_period_ms(period.clamp(min, max))?;
        }

        let mut talon = Self {
            device_number,
            transport,
            control: ControlModeMachine::new(),
            scaler: UnitScaler::new(FeedbackDevice::QuadratureEncoder, SensorConfig::default()),
            params: ParameterProxy::default(),
            observer,
            profile: 0,
            released: false,
        };
        talon.set_profile(0)?;
        talon.apply_control_mode(ControlMode::PercentOutput)?;

        log::info!("{} created", talon.description());
        Ok(talon)
    }

    /// Force Disabled and shut the transport down
    pub fn release(mut self) -> TalonResult<()> {
        self.disable_control()?;
        self.transport.shutdown()?;
        self.released = true;
        log::info!("{} released", self.description());
        Ok(())
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn device_id(&self) -> u8 {
        self.device_number
    }

    pub fn description(&self) -> String {
        format!("Talon SRX ID {}", self.device_number)
    }

    pub fn status(&self) -> DriverStatus {
        self.transport.status()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settle_delay(&self) -> Duration {
        self.params.settle_delay()
    }

    // ========================================================================
    // Control state
    // ========================================================================

    /// Send `value` in the units of the current mode
    ///
    /// | mode | unit |
    /// |---|---|
    /// | PercentOutput | fraction of bus voltage, -1.0..=1.0 |
    /// | Position | rotations |
    /// | Velocity | RPM |
    /// | Current | amperes |
    /// | Voltage | volts |
    /// | Follower | device id to follow |
    ///
    /// Ignored while control is disabled.
    pub fn set_output(&mut self, value: f64) -> TalonResult<()> {
        self.control
            .set_output(value, &self.scaler, &mut self.transport)
            .map(|_| ())
    }

    pub fn set_setpoint(&mut self, value: f64) -> TalonResult<()> {
        self.set_output(value)
    }

    /// Last value accepted by [`set_output`](Self::set_output)
    pub fn setpoint(&self) -> f64 {
        self.control.setpoint()
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control.mode()
    }

    pub fn change_control_mode(&mut self, mode: ControlMode) -> TalonResult<()> {
        if mode != self.control.mode() {
            self.apply_control_mode(mode)?;
        }
        Ok(())
    }

    /// Change mode by wire code; unknown codes are rejected
    pub fn set_control_mode_code(&mut self, code: i32) -> TalonResult<()> {
        let mode = ControlMode::from_code(code).ok_or_else(|| {
            TalonError::invalid_argument(format!("unknown control mode code {}", code))
        })?;
        self.change_control_mode(mode)
    }

    fn apply_control_mode(&mut self, mode: ControlMode) -> TalonResult<()> {
        self.control.apply_mode(mode, &mut self.transport)?;
        self.observer.on_mode_applied(self.device_number, mode);
        Ok(())
    }

    pub fn enable_control(&mut self) -> TalonResult<()> {
        self.change_control_mode(self.control.mode())?;
        self.control.enable();
        Ok(())
    }

    pub fn enable(&mut self) -> TalonResult<()> {
        self.enable_control()
    }

    /// Neutral the output; the selected mode is kept for the next enable
    pub fn disable_control(&mut self) -> TalonResult<()> {
        self.control.disable(&mut self.transport)
    }

    pub fn disable(&mut self) -> TalonResult<()> {
        self.disable_control()
    }

    pub fn is_control_enabled(&self) -> bool {
        self.control.is_enabled()
    }

    pub fn is_enabled(&self) -> bool {
        self.is_control_enabled()
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.control.set_inverted(inverted);
    }

    pub fn inverted(&self) -> bool {
        self.control.is_inverted()
    }

    /// Disable and clear the integral accumulator
    pub fn reset(&mut self) -> TalonResult<()> {
        self.disable_control()?;
        self.clear_i_accum()
    }

    /// Output sink for an external PID loop (PercentOutput only)
    pub fn pid_write(&mut self, output: f64) -> TalonResult<()> {
        self.control.check_pid_write()?;
        self.set_output(output)
    }

    /// Input source for an external PID loop
    pub fn pid_get(&self) -> f64 {
        self.position()
    }

    /// Feedback in the units of the current mode
    pub fn get_feedback(&self) -> f64 {
        let telemetry = self.transport.telemetry();
        let device = self.scaler.selected();
        match self.control.mode() {
            ControlMode::Voltage => self.output_voltage(),
            ControlMode::Current => telemetry.current,
            ControlMode::Velocity => self
                .scaler
                .native_velocity_to_rpm(device, telemetry.sensor_velocity),
            ControlMode::Position => self
                .scaler
                .native_to_rotations(device, telemetry.sensor_position),
            _ => f64::from(telemetry.applied_throttle) / THROTTLE_FULL_SCALE,
        }
    }

    // ========================================================================
    // Sensors
    // ========================================================================

    pub fn configure_feedback_device(&mut self, device: FeedbackDevice) -> TalonResult<()> {
        self.scaler.select(device);
        self.transport
            .set_control_field(ControlField::FeedbackDeviceSelect, device.code())
    }

    pub fn feedback_device(&self) -> FeedbackDevice {
        self.scaler.selected()
    }

    /// Codes per revolution of the quadrature/edge encoder
    ///
    /// The value is kept locally for scaling and also written to the device
    /// for reporting purposes.
    pub fn configure_encoder_resolution(&mut self, codes_per_rev: u32) -> TalonResult<()> {
        self.scaler.set_codes_per_rev(codes_per_rev);
        self.params.write_parameter(
            &mut self.transport,
            ParamId::NumberEncoderCpr,
            f64::from(codes_per_rev),
        )
    }

    pub fn configure_potentiometer_turns(&mut self, turns: u32) -> TalonResult<()> {
        self.scaler.set_pot_turns(turns);
        self.params
            .write_parameter(&mut self.transport, ParamId::NumberPotTurns, f64::from(turns))
    }

    pub fn sensor_config(&self) -> SensorConfig {
        self.scaler.sensor()
    }

    pub fn scaler(&self) -> &UnitScaler {
        &self.scaler
    }

    /// Sensor position in rotations
    pub fn position(&self) -> f64 {
        let native = self.transport.telemetry().sensor_position;
        self.scaler.native_to_rotations(self.scaler.selected(), native)
    }

    /// Overwrite the sensor position, in rotations
    pub fn set_position(&mut self, rotations: f64) -> TalonResult<()> {
        let native = self
            .scaler
            .rotations_to_native(self.scaler.selected(), rotations);
        self.set_parameter(ParamId::SensorPosition, f64::from(native))
    }

    /// Sensor velocity in RPM
    pub fn speed(&self) -> f64 {
        let native = self.transport.telemetry().sensor_velocity;
        self.scaler
            .native_velocity_to_rpm(self.scaler.selected(), native)
    }

    pub fn enc_position(&self) -> i32 {
        self.transport.telemetry().enc_position
    }

    pub fn set_enc_position(&mut self, native: i32) -> TalonResult<()> {
        self.set_parameter(ParamId::EncPosition, f64::from(native))
    }

    pub fn enc_velocity(&self) -> i32 {
        self.transport.telemetry().enc_velocity
    }

    pub fn pulse_width_position(&self) -> i32 {
        self.transport.telemetry().pulse_width_position
    }

    pub fn set_pulse_width_position(&mut self, native: i32) -> TalonResult<()> {
        self.set_parameter(ParamId::PwdPosition, f64::from(native))
    }

    pub fn pulse_width_velocity(&self) -> i32 {
        self.transport.telemetry().pulse_width_velocity
    }

    pub fn pulse_width_rise_to_fall_us(&self) -> i32 {
        self.transport.telemetry().pulse_width_rise_to_fall_us
    }

    pub fn pulse_width_rise_to_rise_us(&self) -> i32 {
        self.transport.telemetry().pulse_width_rise_to_rise_us
    }

    /// Analog input including overflow bits (24-bit)
    pub fn analog_in_position(&self) -> i32 {
        self.transport.telemetry().analog_in_with_ov
    }

    /// Raw 10-bit ADC reading
    pub fn analog_in_raw(&self) -> i32 {
        self.analog_in_position() & ANALOG_RAW_MASK
    }

    pub fn set_analog_position(&mut self, native: i32) -> TalonResult<()> {
        self.set_parameter(ParamId::AinPosition, f64::from(native))
    }

    pub fn analog_in_velocity(&self) -> i32 {
        self.transport.telemetry().analog_in_velocity
    }

    pub fn number_of_quad_idx_rises(&self) -> i32 {
        self.transport.telemetry().enc_index_rise_events
    }

    pub fn pin_state_quad_a(&self) -> i32 {
        self.transport.telemetry().quad_a_pin
    }

    pub fn pin_state_quad_b(&self) -> i32 {
        self.transport.telemetry().quad_b_pin
    }

    pub fn pin_state_quad_idx(&self) -> i32 {
        self.transport.telemetry().quad_idx_pin
    }

    /// Only pulse-width based sensors can be detected
    pub fn is_sensor_present(&self, device: FeedbackDevice) -> FeedbackDeviceStatus {
        if !device.uses_pulse_width() {
            return FeedbackDeviceStatus::Unknown;
        }
        if self.transport.telemetry().pulse_width_present {
            FeedbackDeviceStatus::Present
        } else {
            FeedbackDeviceStatus::NotPresent
        }
    }

    pub fn reverse_sensor(&mut self, flip: bool) -> TalonResult<()> {
        self.transport
            .set_control_field(ControlField::RevFeedbackSensor, i32::from(flip))
    }

    /// Flip the motor output during closed-loop modes
    pub fn reverse_output(&mut self, flip: bool) -> TalonResult<()> {
        self.transport
            .set_control_field(ControlField::RevMotDuringCloseLoop, i32::from(flip))
    }

    /// Zero the sensor position on each index pulse edge
    ///
    /// The polarity is always written while the feature is off so the device
    /// never zeroes on the wrong edge.
    pub fn enable_zero_sensor_position_on_index(
        &mut self,
        enable: bool,
        rising_edge: bool,
    ) -> TalonResult<()> {
        let polarity = f64::from(u8::from(rising_edge));
        if enable {
            self.set_parameter(ParamId::QuadIdxPolarity, polarity)?;
            self.set_parameter(ParamId::ClearPositionOnIdx, 1.0)
        } else {
            self.set_parameter(ParamId::ClearPositionOnIdx, 0.0)?;
            self.set_parameter(ParamId::QuadIdxPolarity, polarity)
        }
    }

    /// Change how often a status frame is broadcast, clamped to 1..=255 ms
    pub fn set_status_frame_rate_ms(
        &mut self,
        frame: StatusFrameRate,
        period_ms: u32,
    ) -> TalonResult<()> {
        let param = match frame {
            StatusFrameRate::General => ParamId::Status1FrameRate,
            StatusFrameRate::Feedback => ParamId::Status2FrameRate,
            StatusFrameRate::QuadEncoder => ParamId::Status3FrameRate,
            StatusFrameRate::AnalogTempVbat => ParamId::Status4FrameRate,
            StatusFrameRate::PulseWidth => ParamId::Status8FrameRate,
        };
        let (min, max) = STATUS_PERIOD_RANGE;
        self.set_parameter(param, f64::from(period_ms.clamp(min, max)))
    }

    // ========================================================================
    // Electrical
    // ========================================================================

    /// Amperes
    pub fn output_current(&self) -> f64 {
        self.transport.telemetry().current
    }

    /// Volts, estimated from bus voltage and applied throttle
    pub fn output_voltage(&self) -> f64 {
        let telemetry = self.transport.telemetry();
        telemetry.battery_voltage * f64::from(telemetry.applied_throttle) / THROTTLE_FULL_SCALE
    }

    pub fn bus_voltage(&self) -> f64 {
        self.transport.telemetry().battery_voltage
    }

    /// Degrees Celsius
    pub fn temperature(&self) -> f64 {
        self.transport.telemetry().temperature
    }

    /// Symmetric closed-loop peak output
    pub fn config_max_output_voltage(&mut self, volts: f64) -> TalonResult<()> {
        self.config_peak_output_voltage(volts, -volts)
    }

    pub fn config_peak_output_voltage(&mut self, forward: f64, reverse: f64) -> TalonResult<()> {
        let (forward, reverse) = output_limits_to_throttle(forward, reverse);
        self.set_parameter(ParamId::PeakPosOutput, forward)?;
        self.set_parameter(ParamId::PeakNegOutput, reverse)
    }

    pub fn config_nominal_output_voltage(&mut self, forward: f64, reverse: f64) -> TalonResult<()> {
        let (forward, reverse) = output_limits_to_throttle(forward, reverse);
        self.set_parameter(ParamId::NominalPosOutput, forward)?;
        self.set_parameter(ParamId::NominalNegOutput, reverse)
    }

    /// Open-loop output ramp in volts per second
    pub fn set_voltage_ramp_rate(&mut self, volts_per_sec: f64) -> TalonResult<()> {
        // throttle units per 10 ms
        let rate = (volts_per_sec * THROTTLE_FULL_SCALE / NOMINAL_BUS_VOLTAGE / 100.0) as i32;
        self.transport
            .set_control_field(ControlField::RampThrottle, rate)
    }

    /// Voltage-compensation ramp in volts per second
    pub fn set_voltage_compensation_ramp_rate(&mut self, volts_per_sec: f64) -> TalonResult<()> {
        self.set_parameter(ParamId::VoltageCompensationRate, volts_per_sec / 1000.0)
    }

    // ========================================================================
    // Closed loop
    // ========================================================================

    /// Select closed-loop profile slot 0 or 1
    pub fn set_profile(&mut self, slot: u8) -> TalonResult<()> {
        check_profile(slot)?;
        self.profile = slot;
        self.transport
            .set_control_field(ControlField::ProfileSlotSelect, i32::from(slot))
    }

    pub fn profile(&self) -> u8 {
        self.profile
    }

    /// Select `profile` and write all of its gains
    pub fn configure_pid(&mut self, gains: PidGains, profile: u8) -> TalonResult<()> {
        check_profile(profile)?;
        self.set_profile(profile)?;
        self.set_p(gains.p)?;
        self.set_i(gains.i)?;
        self.set_d(gains.d)?;
        self.set_f(gains.f)?;
        self.set_izone(gains.izone)?;
        self.set_close_loop_ramp_rate(gains.close_loop_ramp_rate)
    }

    /// P, I and D on the active profile; F, izone and ramp are zeroed
    pub fn set_pid(&mut self, p: f64, i: f64, d: f64) -> TalonResult<()> {
        self.configure_pid(PidGains::new(p, i, d), self.profile)
    }

    pub fn set_p(&mut self, p: f64) -> TalonResult<()> {
        self.write_slot(SlotGain::P, p)
    }

    pub fn set_i(&mut self, i: f64) -> TalonResult<()> {
        self.write_slot(SlotGain::I, i)
    }

    pub fn set_d(&mut self, d: f64) -> TalonResult<()> {
        self.write_slot(SlotGain::D, d)
    }

    pub fn set_f(&mut self, f: f64) -> TalonResult<()> {
        self.write_slot(SlotGain::F, f)
    }

    pub fn set_izone(&mut self, izone: i32) -> TalonResult<()> {
        self.write_slot(SlotGain::IZone, f64::from(izone))
    }

    /// Closed-loop output ramp in volts per second, 0 disables
    pub fn set_close_loop_ramp_rate(&mut self, volts_per_sec: f64) -> TalonResult<()> {
        // throttle units per ms
        let rate = (volts_per_sec * THROTTLE_FULL_SCALE / NOMINAL_BUS_VOLTAGE / 1000.0) as i32;
        self.write_slot(SlotGain::CloseLoopRampRate, f64::from(rate))
    }

    pub fn p(&mut self) -> TalonResult<f64> {
        self.read_slot(SlotGain::P)
    }

    pub fn i(&mut self) -> TalonResult<f64> {
        self.read_slot(SlotGain::I)
    }

    pub fn d(&mut self) -> TalonResult<f64> {
        self.read_slot(SlotGain::D)
    }

    pub fn f(&mut self) -> TalonResult<f64> {
        self.read_slot(SlotGain::F)
    }

    pub fn izone(&mut self) -> TalonResult<i32> {
        Ok(self.read_slot(SlotGain::IZone)? as i32)
    }

    /// Volts per second
    pub fn close_loop_ramp_rate(&mut self) -> TalonResult<f64> {
        let throttle_per_ms = self.read_slot(SlotGain::CloseLoopRampRate)?;
        Ok(throttle_per_ms / THROTTLE_FULL_SCALE * NOMINAL_BUS_VOLTAGE * 1000.0)
    }

    pub fn firmware_version(&mut self) -> TalonResult<i32> {
        Ok(self.get_parameter(ParamId::FirmwareVersion)? as i32)
    }

    /// Integral accumulator of the closed loop
    pub fn i_accum(&mut self) -> TalonResult<i32> {
        Ok(self.get_parameter(ParamId::PidIAccum)? as i32)
    }

    pub fn clear_i_accum(&mut self) -> TalonResult<()> {
        self.set_parameter(ParamId::PidIAccum, 0.0)
    }

    /// Closed-loop error in native units
    pub fn closed_loop_error(&self) -> i32 {
        self.transport.telemetry().close_loop_error
    }

    /// Error band (native units) inside which the active profile stops driving
    pub fn set_allowable_closed_loop_err(&mut self, native: i32) -> TalonResult<()> {
        self.write_slot(SlotGain::AllowableClosedLoopErr, f64::from(native))
    }

    fn write_slot(&mut self, gain: SlotGain, value: f64) -> TalonResult<()> {
        self.set_parameter(gain.param(self.profile), value)
    }

    fn read_slot(&mut self, gain: SlotGain) -> TalonResult<f64> {
        self.get_parameter(gain.param(self.profile))
    }

    /// Write any parameter; nothing is read back
    pub fn set_parameter(&mut self, param: ParamId, value: f64) -> TalonResult<()> {
        self.params.write_parameter(&mut self.transport, param, value)
    }

    /// Read any parameter, blocking for the settle delay
    pub fn get_parameter(&mut self, param: ParamId) -> TalonResult<f64> {
        self.params.read_parameter(&mut self.transport, param)
    }

    // ========================================================================
    // Limits
    // ========================================================================

    pub fn is_fwd_limit_switch_closed(&self) -> bool {
        self.transport.telemetry().limit_switch_closed_forward == 0
    }

    pub fn is_rev_limit_switch_closed(&self) -> bool {
        self.transport.telemetry().limit_switch_closed_reverse == 0
    }

    pub fn brake_enabled_during_neutral(&self) -> bool {
        self.transport.telemetry().brake_is_enabled
    }

    /// Enable or override the hardware limit switches
    pub fn enable_limit_switch(&mut self, forward: bool, reverse: bool) -> TalonResult<()> {
        let mask = 4 + 2 * i32::from(forward) + i32::from(reverse);
        self.transport
            .set_control_field(ControlField::OverrideLimitSwitchEnable, mask)
    }

    pub fn config_fwd_limit_switch_normally_open(&mut self, normally_open: bool) -> TalonResult<()> {
        self.set_parameter(
            ParamId::OnBootLimitSwitchForwardNormallyClosed,
            normally_closed_flag(normally_open),
        )
    }

    pub fn config_rev_limit_switch_normally_open(&mut self, normally_open: bool) -> TalonResult<()> {
        self.set_parameter(
            ParamId::OnBootLimitSwitchReverseNormallyClosed,
            normally_closed_flag(normally_open),
        )
    }

    /// Brake (true) or coast (false) in neutral, overriding the boot setting
    pub fn enable_brake_mode(&mut self, brake: bool) -> TalonResult<()> {
        let value = if brake { 2 } else { 1 };
        self.transport
            .set_control_field(ControlField::OverrideBrakeType, value)
    }

    /// Forward soft limit in rotations
    pub fn set_forward_soft_limit(&mut self, rotations: f64) -> TalonResult<()> {
        let native = self
            .scaler
            .rotations_to_native(self.scaler.selected(), rotations);
        self.set_parameter(ParamId::SoftLimitForThreshold, f64::from(native))
    }

    /// Reverse soft limit in rotations
    pub fn set_reverse_soft_limit(&mut self, rotations: f64) -> TalonResult<()> {
        let native = self
            .scaler
            .rotations_to_native(self.scaler.selected(), rotations);
        self.set_parameter(ParamId::SoftLimitRevThreshold, f64::from(native))
    }

    /// Last reported forward soft limit, native units (not requested)
    pub fn forward_soft_limit(&self) -> i32 {
        self.transport
            .read_param_response(ParamId::SoftLimitForThreshold) as i32
    }

    /// Last reported reverse soft limit, native units (not requested)
    pub fn reverse_soft_limit(&self) -> i32 {
        self.transport
            .read_param_response(ParamId::SoftLimitRevThreshold) as i32
    }

    pub fn enable_forward_soft_limit(&mut self, enable: bool) -> TalonResult<()> {
        self.set_parameter(ParamId::SoftLimitForEnable, f64::from(u8::from(enable)))
    }

    pub fn enable_reverse_soft_limit(&mut self, enable: bool) -> TalonResult<()> {
        self.set_parameter(ParamId::SoftLimitRevEnable, f64::from(u8::from(enable)))
    }

    pub fn is_forward_soft_limit_enabled(&self) -> bool {
        self.transport
            .read_param_response(ParamId::SoftLimitForEnable)
            != 0.0
    }

    pub fn is_reverse_soft_limit_enabled(&self) -> bool {
        self.transport
            .read_param_response(ParamId::SoftLimitRevEnable)
            != 0.0
    }

    // ========================================================================
    // Faults
    // ========================================================================

    pub fn fault(&self, kind: FaultKind) -> bool {
        self.faults().get(kind)
    }

    pub fn sticky_fault(&self, kind: FaultKind) -> bool {
        self.sticky_faults().get(kind)
    }

    pub fn faults(&self) -> Faults {
        self.transport.telemetry().faults
    }

    /// Hardware failure has no sticky latch and always reads false
    pub fn sticky_faults(&self) -> Faults {
        let mut sticky = self.transport.telemetry().sticky_faults;
        sticky.hardware_failure = false;
        sticky
    }

    pub fn clear_sticky_faults(&mut self) -> TalonResult<()> {
        self.transport.clear_sticky_faults()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Push a device configuration through the ordinary setters
    ///
    /// The active profile slot is restored afterwards.
    pub fn apply_config(&mut self, config: &TalonDeviceConfig) -> TalonResult<()> {
        self.configure_feedback_device(config.feedback_device)?;
        if config.codes_per_rev > 0 {
            self.configure_encoder_resolution(config.codes_per_rev)?;
        }
        if config.pot_turns > 0 {
            self.configure_potentiometer_turns(config.pot_turns)?;
        }
        self.set_inverted(config.inverted);
        self.reverse_sensor(config.reverse_sensor)?;
        self.reverse_output(config.reverse_output)?;
        if let Some(brake) = config.brake_mode {
            self.enable_brake_mode(brake)?;
        }
        self.params
            .set_settle_delay(Duration::from_millis(config.settle_delay_ms));

        let active = self.profile;
        for profile in &config.profiles {
            self.configure_pid(profile.gains(), profile.slot)?;
        }
        self.set_profile(active)?;

        if let Some(limit) = config.forward_soft_limit {
            self.set_forward_soft_limit(limit)?;
            self.enable_forward_soft_limit(true)?;
        }
        if let Some(limit) = config.reverse_soft_limit {
            self.set_reverse_soft_limit(limit)?;
            self.enable_reverse_soft_limit(true)?;
        }
        if let Some((forward, reverse)) = config.peak_output_voltage {
            self.config_peak_output_voltage(forward, reverse)?;
        }
        if let Some((forward, reverse)) = config.nominal_output_voltage {
            self.config_nominal_output_voltage(forward, reverse)?;
        }

        log::debug!("{} configured", self.description());
        Ok(())
    }
}

impl<T: TalonTransport> Drop for TalonSrx<T> {
    fn drop(&mut self) {
        if self.released || !self.transport.status().is_operational() {
            return;
        }
        log::warn!("{} dropped without release, disabling", self.description());
        if let Err(e) = self.control.disable(&mut self.transport) {
            log::warn!("{}: disable on drop failed: {}", self.description(), e);
        }
    }
}

impl<T: TalonTransport> std::fmt::Debug for TalonSrx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TalonSrx")
            .field("device_number", &self.device_number)
            .field("control", &self.control)
            .field("scaler", &self.scaler)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

fn check_profile(slot: u8) -> TalonResult<()> {
    if slot > 1 {
        return Err(TalonError::invalid_argument(format!(
            "Talon PID profile must be 0 or 1, got {}",
            slot
        )));
    }
    Ok(())
}

/// Clamp forward to [0, 12] V and reverse to [-12, 0] V, then scale to throttle
fn output_limits_to_throttle(forward: f64, reverse: f64) -> (f64, f64) {
    let forward = forward.clamp(0.0, NOMINAL_BUS_VOLTAGE);
    let reverse = reverse.clamp(-NOMINAL_BUS_VOLTAGE, 0.0);
    (
        THROTTLE_FULL_SCALE * forward / NOMINAL_BUS_VOLTAGE,
        THROTTLE_FULL_SCALE * reverse / NOMINAL_BUS_VOLTAGE,
    )
}

fn normally_closed_flag(normally_open: bool) -> f64 {
    if normally_open {
        0.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::talon::SimulationTalonTransport;
    use approx::assert_relative_eq;

    fn talon() -> (TalonSrx<SimulationTalonTransport>, SimulationTalonTransport) {
        let sim = SimulationTalonTransport::new();
        let talon = TalonSrx::new(5, sim.clone())
            .unwrap()
            .with_settle_delay(Duration::ZERO);
        (talon, sim)
    }

    #[test]
    fn test_construction_sequence() {
        let (talon, sim) = talon();
        assert_eq!(talon.control_mode(), ControlMode::PercentOutput);
        assert!(talon.is_control_enabled());
        assert_eq!(talon.setpoint(), 0.0);
        assert_eq!(talon.profile(), 0);
        assert_eq!(talon.feedback_device(), FeedbackDevice::QuadratureEncoder);
        assert_eq!(talon.sensor_config(), SensorConfig::default());
        assert_eq!(sim.mode_history(), vec![ControlMode::Disabled.code()]);
        assert_eq!(sim.control_field(ControlField::ProfileSlotSelect), Some(0));
        assert_eq!(talon.description(), "Talon SRX ID 5");
        assert!(talon.status().is_operational());
    }

    #[test]
    fn test_control_period_is_clamped() {
        let sim = SimulationTalonTransport::new();
        let _talon = TalonSrx::with_control_period(1, 500, sim.clone()).unwrap();
        assert_eq!(sim.control_period_ms(), 95);

        let sim = SimulationTalonTransport::new();
        let _talon = TalonSrx::with_control_period(1, 0, sim.clone()).unwrap();
        assert_eq!(sim.control_period_ms(), 1);
    }

    #[test]
    fn test_feedback_dispatch() {
        let (mut talon, sim) = talon();
        talon.configure_encoder_resolution(1000).unwrap();
        sim.update_telemetry(|t| {
            t.applied_throttle = 512;
            t.battery_voltage = 12.0;
            t.current = 3.25;
            t.sensor_position = 8000;
            t.sensor_velocity = 4000;
        });

        assert_relative_eq!(talon.get_feedback(), 512.0 / 1023.0);

        talon.change_control_mode(ControlMode::Voltage).unwrap();
        assert_relative_eq!(talon.get_feedback(), 12.0 * 512.0 / 1023.0);

        talon.change_control_mode(ControlMode::Current).unwrap();
        assert_relative_eq!(talon.get_feedback(), 3.25);

        talon.change_control_mode(ControlMode::Velocity).unwrap();
        assert_relative_eq!(talon.get_feedback(), 600.0);

        talon.change_control_mode(ControlMode::Position).unwrap();
        assert_relative_eq!(talon.get_feedback(), 2.0);
    }

    #[test]
    fn test_enable_keeps_mode_and_disable_keeps_mode() {
        let (mut talon, sim) = talon();
        talon.change_control_mode(ControlMode::Current).unwrap();
        talon.disable_control().unwrap();
        assert!(!talon.is_enabled());
        assert_eq!(talon.control_mode(), ControlMode::Current);

        talon.enable_control().unwrap();
        assert!(talon.is_enabled());
        // construction, Current, disable; enable adds nothing
        assert_eq!(sim.mode_history(), vec![15, 15, 15]);
    }

    #[test]
    fn test_set_control_mode_code() {
        let (mut talon, _sim) = talon();
        talon.set_control_mode_code(2).unwrap();
        assert_eq!(talon.control_mode(), ControlMode::Velocity);
        let err = talon.set_control_mode_code(9).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(talon.control_mode(), ControlMode::Velocity);
    }

    #[test]
    fn test_reset_disables_and_clears_accumulator() {
        let (mut talon, sim) = talon();
        talon.reset().unwrap();
        assert!(!talon.is_enabled());
        assert_eq!(sim.param(ParamId::PidIAccum), Some(0.0));
    }

    #[test]
    fn test_output_voltage_limits() {
        let (mut talon, sim) = talon();
        talon.config_peak_output_voltage(20.0, 3.0).unwrap();
        assert_eq!(sim.param(ParamId::PeakPosOutput), Some(1023.0));
        assert_eq!(sim.param(ParamId::PeakNegOutput), Some(0.0));

        talon.config_max_output_voltage(6.0).unwrap();
        assert_eq!(sim.param(ParamId::PeakPosOutput), Some(511.5));
        assert_eq!(sim.param(ParamId::PeakNegOutput), Some(-511.5));

        talon.config_nominal_output_voltage(-1.0, -20.0).unwrap();
        assert_eq!(sim.param(ParamId::NominalPosOutput), Some(0.0));
        assert_eq!(sim.param(ParamId::NominalNegOutput), Some(-1023.0));
    }

    #[test]
    fn test_ramp_rates() {
        let (mut talon, sim) = talon();
        talon.set_voltage_ramp_rate(6.0).unwrap();
        // 6 * 1023 / 12 / 100 = 5.115
        assert_eq!(sim.control_field(ControlField::RampThrottle), Some(5));

        talon.set_voltage_compensation_ramp_rate(2.0).unwrap();
        assert_eq!(sim.param(ParamId::VoltageCompensationRate), Some(0.002));

        talon.set_close_loop_ramp_rate(120.0).unwrap();
        // 120 * 1023 / 12 / 1000 = 10.23
        assert_eq!(sim.param(ParamId::Slot0CloseLoopRampRate), Some(10.0));
        assert_relative_eq!(
            talon.close_loop_ramp_rate().unwrap(),
            10.0 / 1023.0 * 12.0 * 1000.0
        );
    }

    #[test]
    fn test_limit_switch_and_brake_fields() {
        let (mut talon, sim) = talon();
        talon.enable_limit_switch(true, false).unwrap();
        assert_eq!(
            sim.control_field(ControlField::OverrideLimitSwitchEnable),
            Some(6)
        );
        talon.enable_limit_switch(false, true).unwrap();
        assert_eq!(
            sim.control_field(ControlField::OverrideLimitSwitchEnable),
            Some(5)
        );

        talon.enable_brake_mode(true).unwrap();
        assert_eq!(sim.control_field(ControlField::OverrideBrakeType), Some(2));
        talon.enable_brake_mode(false).unwrap();
        assert_eq!(sim.control_field(ControlField::OverrideBrakeType), Some(1));

        talon.config_fwd_limit_switch_normally_open(true).unwrap();
        talon.config_rev_limit_switch_normally_open(false).unwrap();
        assert_eq!(
            sim.param(ParamId::OnBootLimitSwitchForwardNormallyClosed),
            Some(0.0)
        );
        assert_eq!(
            sim.param(ParamId::OnBootLimitSwitchReverseNormallyClosed),
            Some(1.0)
        );
    }

    #[test]
    fn test_drop_without_release_disables() {
        let (mut talon, sim) = talon();
        talon.set_output(0.5).unwrap();
        assert_eq!(sim.mode_code(), ControlMode::PercentOutput.code());
        drop(talon);
        assert_eq!(sim.mode_code(), ControlMode::Disabled.code());
        assert!(sim.status().is_operational());
    }

    #[test]
    fn test_release_shuts_transport_down() {
        let (talon, sim) = talon();
        talon.release().unwrap();
        assert_eq!(sim.status(), DriverStatus::Shutdown);
        assert_eq!(sim.mode_code(), ControlMode::Disabled.code());
    }
}
