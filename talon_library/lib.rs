//! # Talon Library
//!
//! Driver for the Talon SRX CAN motor controller.
//!
//! ## Structure
//!
//! ```text
//! talon_library/
//! ── drivers/
//!    ── talon/      # Unit scaling, control modes, parameter proxy, device facade
//!    ── factory.rs  # Build transports and devices from configuration
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use talon_library::{ControlMode, SimulationTalonTransport, TalonSrx};
//!
//! let mut talon = TalonSrx::new(3, SimulationTalonTransport::new())?;
//! talon.configure_encoder_resolution(1000)?;
//! talon.change_control_mode(ControlMode::Velocity)?;
//! talon.enable_control()?;
//! talon.set_output(600.0)?;
//! ```

pub mod drivers;

pub use drivers::talon::{
    ControlField, ControlMode, FaultKind, Faults, FeedbackDevice, FeedbackDeviceStatus,
    LogModeObserver, ModeObserver, NoopModeObserver, ParamId, PidGains, SensorConfig,
    SimulationTalonTransport, StatusFrameRate, TalonSrx, TalonTransport, Telemetry, UnitScaler,
};
pub use drivers::talon::{DevicesConfig, ProfileConfig, TalonDeviceConfig};

pub use talon_core::{DriverStatus, TalonError, TalonResult};
