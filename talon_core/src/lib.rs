//! # Talon Core
//!
//! Shared building blocks for the Talon SRX motor-controller driver:
//!
//! - **Errors**: [`TalonError`] and the [`TalonResult`] alias used across the workspace
//! - **Driver status**: the lifecycle state every transport reports
//! - **Config**: YAML/TOML loading for device configuration files
//!
//! The driver itself (unit scaling, control-mode state machine, parameter
//! proxy and device facade) lives in `talon_library`.

pub mod config;
pub mod driver;
pub mod error;

pub use driver::DriverStatus;
pub use error::{TalonError, TalonResult};
