//! Simulation Talon SRX transport

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use talon_core::{DriverStatus, TalonError, TalonResult};

use super::{
    ControlField, ControlMode, ParamId, TalonTransport, Telemetry, NOMINAL_BUS_VOLTAGE,
    THROTTLE_FULL_SCALE,
};

/// Firmware version reported by the simulated device (1.10)
pub const SIM_FIRMWARE_VERSION: f64 = 266.0;

/// Sensor velocity at full throttle, native units per 100 ms
const FREE_SPEED: f64 = 1000.0;
/// Motor current at full throttle, amperes
const FULL_THROTTLE_CURRENT: f64 = 40.0;
/// Velocity time constant for open-loop modes, seconds
const VELOCITY_TAU: f64 = 0.1;
/// Closed-loop acceleration limit, native units per 100 ms per second
const MAX_ACCEL: f64 = 10_000.0;
const POSITION_GAIN: f64 = 2.0;
const AMBIENT_TEMPERATURE: f64 = 25.0;

/// Entries kept in the mode-selector and parameter-write logs
pub const HISTORY_CAPACITY: usize = 256;

#[derive(Debug)]
struct SimState {
    status: DriverStatus,
    control_period_ms: u32,
    mode_code: i32,
    mode_history: VecDeque<i32>,
    demand: i32,
    fields: HashMap<ControlField, i32>,
    params: HashMap<ParamId, f64>,
    responses: HashMap<ParamId, f64>,
    param_writes: VecDeque<(ParamId, f64)>,
    responsive: bool,
    sticky_clears: u32,
    telemetry: Telemetry,
    /// Sensor position without truncation, native units
    position: f64,
    /// Native units per 100 ms
    velocity: f64,
}

impl SimState {
    fn new() -> Self {
        let mut params = HashMap::new();
        params.insert(ParamId::FirmwareVersion, SIM_FIRMWARE_VERSION);

        Self {
            status: DriverStatus::Uninitialized,
            control_period_ms: 10,
            mode_code: ControlMode::Disabled.code(),
            mode_history: VecDeque::with_capacity(HISTORY_CAPACITY),
            demand: 0,
            fields: HashMap::new(),
            params,
            responses: HashMap::new(),
            param_writes: VecDeque::with_capacity(HISTORY_CAPACITY),
            responsive: true,
            sticky_clears: 0,
            telemetry: Telemetry {
                battery_voltage: NOMINAL_BUS_VOLTAGE,
                temperature: AMBIENT_TEMPERATURE,
                // Limit switch inputs read 0 when closed
                limit_switch_closed_forward: 1,
                limit_switch_closed_reverse: 1,
                ..Default::default()
            },
            position: 0.0,
            velocity: 0.0,
        }
    }

    fn check_operational(&mut self) -> TalonResult<()> {
        if !self.status.is_operational() {
            return Err(TalonError::driver("Driver not initialized"));
        }
        self.status = DriverStatus::Running;
        Ok(())
    }

    /// What the device would answer for `param` right now
    fn device_value(&self, param: ParamId) -> f64 {
        let t = &self.telemetry;
        match param {
            ParamId::SensorPosition => f64::from(t.sensor_position),
            ParamId::EncPosition => f64::from(t.enc_position),
            ParamId::PwdPosition => f64::from(t.pulse_width_position),
            ParamId::AinPosition => f64::from(t.analog_in_with_ov),
            _ => self.params.get(&param).copied().unwrap_or(0.0),
        }
    }

    fn apply_param_side_effects(&mut self, param: ParamId, value: f64) {
        let native = value as i32;
        match param {
            ParamId::SensorPosition => {
                self.position = f64::from(native);
                self.telemetry.sensor_position = native;
            }
            ParamId::EncPosition => self.telemetry.enc_position = native,
            ParamId::PwdPosition => self.telemetry.pulse_width_position = native,
            ParamId::AinPosition => self.telemetry.analog_in_with_ov = native,
            _ => {}
        }
    }

    fn soft_limit(&self, enable: ParamId, threshold: ParamId) -> Option<f64> {
        let enabled = self.params.get(&enable).copied().unwrap_or(0.0) != 0.0;
        enabled.then(|| self.params.get(&threshold).copied().unwrap_or(0.0))
    }

    fn step(&mut self, dt: f64) {
        let mode = ControlMode::from_code(self.mode_code);
        let demand = f64::from(self.demand);
        let battery = self.telemetry.battery_voltage.max(1.0);
        let closed_loop = matches!(
            mode,
            Some(ControlMode::Velocity) | Some(ControlMode::Position)
        );

        let mut throttle = match mode {
            Some(ControlMode::PercentOutput) => demand,
            Some(ControlMode::Voltage) => demand / 256.0 / battery * THROTTLE_FULL_SCALE,
            Some(ControlMode::Current) => {
                demand / 1000.0 / FULL_THROTTLE_CURRENT * THROTTLE_FULL_SCALE
            }
            Some(ControlMode::Velocity) => {
                self.ramp_velocity(demand.clamp(-FREE_SPEED, FREE_SPEED), dt);
                self.velocity / FREE_SPEED * THROTTLE_FULL_SCALE
            }
            Some(ControlMode::Position) => {
                let target = (demand - self.position) * POSITION_GAIN;
                self.ramp_velocity(target.clamp(-FREE_SPEED, FREE_SPEED), dt);
                self.velocity / FREE_SPEED * THROTTLE_FULL_SCALE
            }
            _ => 0.0,
        }
        .clamp(-THROTTLE_FULL_SCALE, THROTTLE_FULL_SCALE);

        let forward = self.soft_limit(ParamId::SoftLimitForEnable, ParamId::SoftLimitForThreshold);
        let reverse = self.soft_limit(ParamId::SoftLimitRevEnable, ParamId::SoftLimitRevThreshold);
        let fwd_tripped = throttle > 0.0 && forward.is_some_and(|limit| self.position >= limit);
        let rev_tripped = throttle < 0.0 && reverse.is_some_and(|limit| self.position <= limit);

        if fwd_tripped || rev_tripped {
            throttle = 0.0;
            self.velocity = 0.0;
        } else if !closed_loop {
            let target = throttle / THROTTLE_FULL_SCALE * FREE_SPEED;
            self.velocity += (target - self.velocity) * (dt / VELOCITY_TAU).min(1.0);
        }

        // velocity is per 100 ms
        self.position += self.velocity * dt * 10.0;

        let current = throttle.abs() / THROTTLE_FULL_SCALE * FULL_THROTTLE_CURRENT;
        let temperature = self.telemetry.temperature
            + (current * 0.05 - (self.telemetry.temperature - AMBIENT_TEMPERATURE) * 0.02) * dt;

        let error = match mode {
            Some(ControlMode::Position) => demand - self.position,
            Some(ControlMode::Velocity) => demand - self.velocity,
            Some(ControlMode::Current) => demand - current * 1000.0,
            _ => 0.0,
        };

        let t = &mut self.telemetry;
        t.applied_throttle = throttle as i32;
        t.sensor_position = self.position as i32;
        t.sensor_velocity = self.velocity as i32;
        t.enc_position = t.sensor_position;
        t.enc_velocity = t.sensor_velocity;
        t.close_loop_error = error as i32;
        t.current = current;
        t.temperature = temperature;
        t.battery_voltage = NOMINAL_BUS_VOLTAGE - current * 0.02;
        t.faults.forward_soft_limit = fwd_tripped;
        t.faults.reverse_soft_limit = rev_tripped;
        t.sticky_faults.forward_soft_limit |= fwd_tripped;
        t.sticky_faults.reverse_soft_limit |= rev_tripped;
        t.brake_is_enabled = self.fields.get(&ControlField::OverrideBrakeType) == Some(&2);
    }

    fn ramp_velocity(&mut self, target: f64, dt: f64) {
        let max_delta = MAX_ACCEL * dt;
        let diff = target - self.velocity;
        if diff.abs() <= max_delta {
            self.velocity = target;
        } else {
            self.velocity += diff.signum() * max_delta;
        }
    }
}

/// Simulation Talon SRX transport
///
/// Keeps an in-memory device: the control frame, the parameter store, the
/// status frames and a crude motor model. Clones share the same device, so a
/// test can hold one handle while a [`TalonSrx`](super::TalonSrx) owns another.
#[derive(Debug, Clone)]
pub struct SimulationTalonTransport {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulationTalonTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded<E>(log: &mut VecDeque<E>, entry: E) {
    if log.len() == HISTORY_CAPACITY {
        log.pop_front();
    }
    log.push_back(entry);
}

impl SimulationTalonTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// The last [`HISTORY_CAPACITY`] mode selectors sent, oldest first
    pub fn mode_history(&self) -> Vec<i32> {
        self.state.lock().mode_history.iter().copied().collect()
    }

    pub fn mode_code(&self) -> i32 {
        self.state.lock().mode_code
    }

    pub fn last_demand(&self) -> i32 {
        self.state.lock().demand
    }

    pub fn control_field(&self, field: ControlField) -> Option<i32> {
        self.state.lock().fields.get(&field).copied()
    }

    pub fn control_period_ms(&self) -> u32 {
        self.state.lock().control_period_ms
    }

    /// Value held in the simulated parameter store
    pub fn param(&self, param: ParamId) -> Option<f64> {
        self.state.lock().params.get(&param).copied()
    }

    /// The last [`HISTORY_CAPACITY`] parameter writes received, oldest first
    pub fn param_writes(&self) -> Vec<(ParamId, f64)> {
        self.state.lock().param_writes.iter().copied().collect()
    }

    pub fn sticky_fault_clears(&self) -> u32 {
        self.state.lock().sticky_clears
    }

    // ========================================================================
    // Injection
    // ========================================================================

    /// When false, parameter requests go unanswered
    pub fn set_responsive(&self, responsive: bool) {
        self.state.lock().responsive = responsive;
    }

    pub fn inject_param_response(&self, param: ParamId, value: f64) {
        self.state.lock().responses.insert(param, value);
    }

    pub fn set_telemetry(&self, telemetry: Telemetry) {
        let mut state = self.state.lock();
        state.position = f64::from(telemetry.sensor_position);
        state.velocity = f64::from(telemetry.sensor_velocity);
        state.telemetry = telemetry;
    }

    pub fn update_telemetry<F: FnOnce(&mut Telemetry)>(&self, f: F) {
        let mut state = self.state.lock();
        f(&mut state.telemetry);
        state.position = f64::from(state.telemetry.sensor_position);
        state.velocity = f64::from(state.telemetry.sensor_velocity);
    }

    /// Advance the motor model by `dt` seconds
    pub fn simulate_tick(&self, dt: f64) {
        self.state.lock().step(dt);
    }
}

impl TalonTransport for SimulationTalonTransport {
    fn init(&mut self) -> TalonResult<()> {
        let mut state = self.state.lock();
        state.status = DriverStatus::Ready;
        log::debug!("simulation transport ready");
        Ok(())
    }

    fn shutdown(&mut self) -> TalonResult<()> {
        let mut state = self.state.lock();
        state.mode_code = ControlMode::Disabled.code();
        state.velocity = 0.0;
        state.status = DriverStatus::Shutdown;
        Ok(())
    }

    fn is_available(&self) -> bool {
        true // Simulation is always available
    }

    fn status(&self) -> DriverStatus {
        self.state.lock().status.clone()
    }

    fn set_control_period_ms(&mut self, period_ms: u32) -> TalonResult<()> {
        self.state.lock().control_period_ms = period_ms;
        Ok(())
    }

    fn send_mode_and_demand(&mut self, mode_code: i32, demand: i32) -> TalonResult<()> {
        let mut state = self.state.lock();
        state.check_operational()?;
        state.mode_code = mode_code;
        push_bounded(&mut state.mode_history, mode_code);
        state.demand = demand;
        Ok(())
    }

    fn set_control_field(&mut self, field: ControlField, value: i32) -> TalonResult<()> {
        let mut state = self.state.lock();
        state.check_operational()?;
        state.fields.insert(field, value);
        Ok(())
    }

    fn send_param_write(&mut self, param: ParamId, value: f64) -> TalonResult<()> {
        let mut state = self.state.lock();
        state.check_operational()?;
        state.params.insert(param, value);
        push_bounded(&mut state.param_writes, (param, value));
        state.apply_param_side_effects(param, value);
        Ok(())
    }

    fn request_param(&mut self, param: ParamId) -> TalonResult<()> {
        let mut state = self.state.lock();
        state.check_operational()?;
        if state.responsive {
            let value = state.device_value(param);
            state.responses.insert(param, value);
        }
        Ok(())
    }

    fn read_param_response(&self, param: ParamId) -> f64 {
        self.state
            .lock()
            .responses
            .get(&param)
            .copied()
            .unwrap_or(0.0)
    }

    fn clear_sticky_faults(&mut self) -> TalonResult<()> {
        let mut state = self.state.lock();
        state.check_operational()?;
        state.telemetry.sticky_faults = Default::default();
        state.sticky_clears += 1;
        Ok(())
    }

    fn telemetry(&self) -> Telemetry {
        self.state.lock().telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ready() -> SimulationTalonTransport {
        let mut sim = SimulationTalonTransport::new();
        sim.init().unwrap();
        sim
    }

    #[test]
    fn test_sends_require_init() {
        let mut sim = SimulationTalonTransport::new();
        assert_eq!(sim.status(), DriverStatus::Uninitialized);
        let err = sim.send_mode_and_demand(0, 100).unwrap_err();
        assert_eq!(err.to_string(), "Driver error: Driver not initialized");
        assert!(sim.send_param_write(ParamId::Slot0P, 1.0).is_err());

        sim.init().unwrap();
        assert_eq!(sim.status(), DriverStatus::Ready);
        sim.send_mode_and_demand(0, 100).unwrap();
        assert_eq!(sim.status(), DriverStatus::Running);

        sim.shutdown().unwrap();
        assert_eq!(sim.status(), DriverStatus::Shutdown);
        assert!(sim.send_mode_and_demand(0, 100).is_err());
    }

    #[test]
    fn test_clones_share_device() {
        let mut sim = ready();
        let observer = sim.clone();
        sim.send_mode_and_demand(2, 4000).unwrap();
        assert_eq!(observer.mode_history(), vec![2]);
        assert_eq!(observer.last_demand(), 4000);
    }

    #[test]
    fn test_request_copies_store_into_response() {
        let mut sim = ready();
        assert_eq!(sim.read_param_response(ParamId::FirmwareVersion), 0.0);
        sim.request_param(ParamId::FirmwareVersion).unwrap();
        assert_eq!(
            sim.read_param_response(ParamId::FirmwareVersion),
            SIM_FIRMWARE_VERSION
        );

        sim.inject_param_response(ParamId::Slot1D, 3.5);
        assert_eq!(sim.read_param_response(ParamId::Slot1D), 3.5);
    }

    #[test]
    fn test_sensor_position_write_moves_sensor() {
        let mut sim = ready();
        sim.send_param_write(ParamId::SensorPosition, 1234.0).unwrap();
        assert_eq!(sim.telemetry().sensor_position, 1234);
        sim.request_param(ParamId::SensorPosition).unwrap();
        assert_eq!(sim.read_param_response(ParamId::SensorPosition), 1234.0);
    }

    #[test]
    fn test_percent_output_spins_up() {
        let mut sim = ready();
        sim.send_mode_and_demand(ControlMode::PercentOutput.code(), 1023)
            .unwrap();
        for _ in 0..100 {
            sim.simulate_tick(0.01);
        }
        let t = sim.telemetry();
        assert_eq!(t.applied_throttle, 1023);
        assert!(t.sensor_velocity > 900);
        assert!(t.sensor_position > 0);
        assert_relative_eq!(t.current, FULL_THROTTLE_CURRENT);
        assert!(t.battery_voltage < NOMINAL_BUS_VOLTAGE);
    }

    #[test]
    fn test_velocity_mode_reaches_target() {
        let mut sim = ready();
        sim.send_mode_and_demand(ControlMode::Velocity.code(), 500)
            .unwrap();
        for _ in 0..20 {
            sim.simulate_tick(0.01);
        }
        let t = sim.telemetry();
        assert_eq!(t.sensor_velocity, 500);
        assert_eq!(t.close_loop_error, 0);
    }

    #[test]
    fn test_position_mode_converges() {
        let mut sim = ready();
        sim.send_mode_and_demand(ControlMode::Position.code(), 2000)
            .unwrap();
        for _ in 0..500 {
            sim.simulate_tick(0.01);
        }
        let t = sim.telemetry();
        assert!((t.sensor_position - 2000).abs() <= 5);
    }

    #[test]
    fn test_disabled_coasts_down() {
        let mut sim = ready();
        sim.send_mode_and_demand(ControlMode::PercentOutput.code(), 1023)
            .unwrap();
        for _ in 0..50 {
            sim.simulate_tick(0.01);
        }
        sim.send_mode_and_demand(ControlMode::Disabled.code(), 1023)
            .unwrap();
        for _ in 0..200 {
            sim.simulate_tick(0.01);
        }
        let t = sim.telemetry();
        assert_eq!(t.applied_throttle, 0);
        assert_eq!(t.sensor_velocity, 0);
    }

    #[test]
    fn test_forward_soft_limit_stops_motor() {
        let mut sim = ready();
        sim.send_param_write(ParamId::SoftLimitForThreshold, 100.0)
            .unwrap();
        sim.send_param_write(ParamId::SoftLimitForEnable, 1.0).unwrap();
        sim.send_mode_and_demand(ControlMode::PercentOutput.code(), 1023)
            .unwrap();
        for _ in 0..100 {
            sim.simulate_tick(0.01);
        }
        let t = sim.telemetry();
        assert!(t.faults.forward_soft_limit);
        assert!(t.sticky_faults.forward_soft_limit);
        assert_eq!(t.applied_throttle, 0);

        sim.clear_sticky_faults().unwrap();
        assert!(!sim.telemetry().sticky_faults.forward_soft_limit);
        assert_eq!(sim.sticky_fault_clears(), 1);
    }

    #[test]
    fn test_history_logs_are_bounded() {
        let mut sim = ready();
        for demand in 0..(HISTORY_CAPACITY as i32 + 10) {
            sim.send_mode_and_demand(0, demand).unwrap();
            sim.send_param_write(ParamId::Slot0P, f64::from(demand)).unwrap();
        }
        assert_eq!(sim.mode_history().len(), HISTORY_CAPACITY);
        let writes = sim.param_writes();
        assert_eq!(writes.len(), HISTORY_CAPACITY);
        assert_eq!(writes[0], (ParamId::Slot0P, 10.0));
        assert_eq!(sim.last_demand(), HISTORY_CAPACITY as i32 + 9);
    }
}
