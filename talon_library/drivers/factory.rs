//! Driver Factory - Create transports and devices from configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use talon_library::drivers::factory::create_device;
//! use talon_library::DevicesConfig;
//!
//! let config = DevicesConfig::find_and_load()?;
//! let mut talon = create_device(config.get("arm").unwrap())?;
//! talon.enable_control()?;
//! ```

use talon_core::{TalonError, TalonResult};

use super::talon::{SimulationTalonTransport, TalonDeviceConfig, TalonSrx, TalonTransport};

/// Transport handed out by the factory
pub type BoxedTransport = Box<dyn TalonTransport + Send>;

/// Backend names accepted by [`create_transport`]
pub const AVAILABLE_BACKENDS: &[&str] = &["simulation"];

/// Create a transport for a backend name
///
/// # Supported Backends
///
/// - `simulation` (alias `sim`) - Always available, simulates a Talon SRX in memory
pub fn create_transport(backend: &str) -> TalonResult<BoxedTransport> {
    match backend {
        "simulation" | "sim" => Ok(Box::new(SimulationTalonTransport::new())),
        other => Err(TalonError::driver(format!(
            "Talon backend '{}' is not available. Available: {}",
            other,
            AVAILABLE_BACKENDS.join(", ")
        ))),
    }
}

/// Create and configure a device from its configuration
pub fn create_device(config: &TalonDeviceConfig) -> TalonResult<TalonSrx<BoxedTransport>> {
    let transport = create_transport(&config.backend)?;
    create_device_with(config, transport)
}

/// Create and configure a device over an existing transport
pub fn create_device_with<T: TalonTransport>(
    config: &TalonDeviceConfig,
    transport: T,
) -> TalonResult<TalonSrx<T>> {
    if !config.enabled {
        return Err(TalonError::config(format!(
            "Talon SRX ID {} is disabled in configuration",
            config.device_number
        )));
    }
    config.validate()?;

    let mut talon =
        TalonSrx::with_control_period(config.device_number, config.control_period_ms, transport)?;
    talon.apply_config(config)?;
    Ok(talon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::talon::{ControlField, FeedbackDevice, ParamId, ProfileConfig};
    use std::time::Duration;

    #[test]
    fn test_create_simulation_transport() {
        for name in ["simulation", "sim"] {
            let transport = create_transport(name).unwrap();
            assert!(transport.is_available());
        }
    }

    #[test]
    fn test_unknown_backend() {
        let err = match create_transport("socketcan") {
            Ok(_) => panic!("socketcan should not be a built-in backend"),
            Err(e) => e,
        };
        assert!(err.is_driver());
        assert!(err.to_string().contains("'socketcan' is not available"));
        assert!(err.to_string().contains("simulation"));
    }

    #[test]
    fn test_create_device_applies_config() {
        let mut config = TalonDeviceConfig::new(3);
        config.feedback_device = FeedbackDevice::MagneticEncoderRelative;
        config.control_period_ms = 200;
        config.settle_delay_ms = 0;
        config.brake_mode = Some(true);
        config.profiles.push(ProfileConfig {
            slot: 1,
            p: 2.0,
            ..Default::default()
        });
        config.forward_soft_limit = Some(1.0);

        let sim = SimulationTalonTransport::new();
        let talon = create_device_with(&config, sim.clone()).unwrap();

        assert_eq!(talon.device_id(), 3);
        assert_eq!(talon.feedback_device(), FeedbackDevice::MagneticEncoderRelative);
        assert_eq!(talon.settle_delay(), Duration::ZERO);
        assert_eq!(talon.profile(), 0);
        assert_eq!(sim.control_period_ms(), 95);
        assert_eq!(sim.control_field(ControlField::FeedbackDeviceSelect), Some(6));
        assert_eq!(sim.control_field(ControlField::OverrideBrakeType), Some(2));
        assert_eq!(sim.param(ParamId::Slot1P), Some(2.0));
        // 1 rotation of a magnetic encoder
        assert_eq!(sim.param(ParamId::SoftLimitForThreshold), Some(4096.0));
        assert_eq!(sim.param(ParamId::SoftLimitForEnable), Some(1.0));
    }

    #[test]
    fn test_disabled_device_is_refused() {
        let mut config = TalonDeviceConfig::new(1);
        config.enabled = false;
        assert!(create_device(&config).is_err());
    }

    #[test]
    fn test_create_device_boxed() {
        let talon = create_device(&TalonDeviceConfig::new(2)).unwrap();
        assert_eq!(talon.description(), "Talon SRX ID 2");
        talon.release().unwrap();
    }
}
