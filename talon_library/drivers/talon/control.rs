//! Control-mode state machine and demand encoding

use talon_core::{TalonError, TalonResult};

use super::scaling::{SensorConfig, UnitScaler};
use super::{ControlMode, FeedbackDevice, TalonTransport, THROTTLE_FULL_SCALE};

/// Encode `value` as the control frame's demand for `mode`
///
/// Returns `None` for `Disabled`, which carries no demand of its own.
/// Inversion never applies to `Position` (an absolute target) or `Follower`.
pub fn encode_demand(
    mode: ControlMode,
    value: f64,
    inverted: bool,
    device: FeedbackDevice,
    sensor: &SensorConfig,
) -> Option<i32> {
    encode_with(mode, value, inverted, device, &UnitScaler::new(device, *sensor))
}

fn encode_with(
    mode: ControlMode,
    value: f64,
    inverted: bool,
    device: FeedbackDevice,
    scaler: &UnitScaler,
) -> Option<i32> {
    let signed = if inverted { -value } else { value };
    let demand = match mode {
        ControlMode::PercentOutput => (signed * THROTTLE_FULL_SCALE) as i32,
        ControlMode::Follower => value as i32,
        // 8.8 fixed point volts
        ControlMode::Voltage => (signed * 256.0).round() as i32,
        ControlMode::Velocity => scaler.rpm_to_native_velocity(device, signed),
        ControlMode::Position => scaler.rotations_to_native(device, value),
        // milliamps
        ControlMode::Current => (signed * 1000.0) as i32,
        ControlMode::Disabled => return None,
    };
    Some(demand)
}

/// Mode, enable flag, cached setpoint and inversion for one device
///
/// Every transition forces the wire-level selector to `Disabled` so that a
/// demand sent under the old mode is never reinterpreted under the new one.
/// The selector is restored by the next [`set_output`](Self::set_output).
#[derive(Debug, Clone)]
pub struct ControlModeMachine {
    mode: ControlMode,
    enabled: bool,
    setpoint: f64,
    inverted: bool,
    last_demand: i32,
    warned_disabled: bool,
}

impl Default for ControlModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlModeMachine {
    pub fn new() -> Self {
        Self {
            mode: ControlMode::Disabled,
            enabled: true,
            setpoint: 0.0,
            inverted: false,
            last_demand: 0,
            warned_disabled: false,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    /// Demand most recently sent with a non-disabled selector
    pub fn last_demand(&self) -> i32 {
        self.last_demand
    }

    /// Send the Disabled selector, then make `mode` current
    ///
    /// Nothing changes when the send fails.
    pub fn apply_mode<T: TalonTransport + ?Sized>(
        &mut self,
        mode: ControlMode,
        transport: &mut T,
    ) -> TalonResult<()> {
        transport.send_mode_and_demand(ControlMode::Disabled.code(), self.last_demand)?;
        log::debug!("control mode {} -> {}", self.mode, mode);
        self.mode = mode;
        if mode == ControlMode::Disabled {
            self.enabled = false;
        }
        Ok(())
    }

    /// Apply `mode` unless it is already current; returns whether it was applied
    pub fn change_mode<T: TalonTransport + ?Sized>(
        &mut self,
        mode: ControlMode,
        transport: &mut T,
    ) -> TalonResult<bool> {
        if mode == self.mode {
            return Ok(false);
        }
        self.apply_mode(mode, transport)?;
        Ok(true)
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.warned_disabled = false;
    }

    /// Send the Disabled selector and drop the enable flag; the mode is kept
    pub fn disable<T: TalonTransport + ?Sized>(&mut self, transport: &mut T) -> TalonResult<()> {
        transport.send_mode_and_demand(ControlMode::Disabled.code(), self.last_demand)?;
        self.enabled = false;
        Ok(())
    }

    /// Cache and send `value` under the current mode
    ///
    /// Mode and demand are re-sent on every call. Returns `Ok(false)` when
    /// control is disabled, in which case nothing is cached or sent. The
    /// setpoint and demand are only cached once the send succeeds.
    pub fn set_output<T: TalonTransport + ?Sized>(
        &mut self,
        value: f64,
        scaler: &UnitScaler,
        transport: &mut T,
    ) -> TalonResult<bool> {
        if !self.enabled {
            if !self.warned_disabled {
                log::warn!("output {} dropped: control is disabled", value);
                self.warned_disabled = true;
            }
            return Ok(false);
        }

        let demand = encode_with(self.mode, value, self.inverted, scaler.selected(), scaler)
            .unwrap_or(self.last_demand);
        transport.send_mode_and_demand(self.mode.code(), demand)?;
        self.setpoint = value;
        self.last_demand = demand;
        Ok(true)
    }

    /// Closed-loop feedback writes are only legal in PercentOutput
    pub fn check_pid_write(&self) -> TalonResult<()> {
        if self.mode != ControlMode::PercentOutput {
            return Err(TalonError::invalid_mode(format!(
                "PID output only supported in PercentOutput mode (current mode: {})",
                self.mode
            )));
        }
        Ok(())
    }
}
