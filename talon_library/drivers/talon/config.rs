//! Device configuration files
//!
//! # Example (YAML)
//!
//! ```yaml
//! devices:
//!   left_drive:
//!     device_number: 1
//!     feedback_device: quadrature_encoder
//!     codes_per_rev: 360
//!     brake_mode: true
//!     profiles:
//!       - slot: 0
//!         p: 0.8
//!         f: 0.2
//!     forward_soft_limit: 12.5
//!     peak_output_voltage: [10.0, -10.0]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use talon_core::{config, TalonError, TalonResult};

use super::{FeedbackDevice, PidGains};

/// File names searched by [`DevicesConfig::find_and_load`], in order
pub const CONFIG_FILE_NAMES: [&str; 3] = ["talon.yaml", "talon.yml", "talon.toml"];

/// Every device in a configuration file, by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicesConfig {
    #[serde(default)]
    pub devices: BTreeMap<String, TalonDeviceConfig>,
}

impl DevicesConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> TalonResult<Self> {
        let cfg: Self = config::from_file(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(contents: &str) -> TalonResult<Self> {
        let cfg: Self = config::from_yaml(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> TalonResult<Self> {
        let cfg: Self = config::from_toml(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> TalonResult<()> {
        config::save(self, path)
    }

    /// Load the first of `talon.yaml`, `talon.yml`, `talon.toml` in `dir`
    pub fn find_and_load_in<P: AsRef<Path>>(dir: P) -> TalonResult<Self> {
        let dir = dir.as_ref();
        let candidates: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(|n| dir.join(n)).collect();
        match config::find_existing(candidates) {
            Some(path) => Self::from_file(path),
            None => Err(TalonError::config(format!(
                "No device config found in {} (looked for {})",
                dir.display(),
                CONFIG_FILE_NAMES.join(", ")
            ))),
        }
    }

    /// Load from the working directory
    pub fn find_and_load() -> TalonResult<Self> {
        Self::find_and_load_in(std::env::current_dir()?)
    }

    pub fn get(&self, name: &str) -> Option<&TalonDeviceConfig> {
        self.devices.get(name)
    }

    pub fn validate(&self) -> TalonResult<()> {
        for (name, device) in &self.devices {
            device.validate().map_err(|e| match e {
                TalonError::InvalidArgument(msg) => {
                    TalonError::invalid_argument(format!("device '{}': {}", name, msg))
                }
                TalonError::Config(msg) => {
                    TalonError::config(format!("device '{}': {}", name, msg))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Configuration for one Talon SRX
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalonDeviceConfig {
    /// Transport backend name
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub device_number: u8,
    /// Control frame period, clamped to 1..=95 ms when applied
    #[serde(default = "default_control_period")]
    pub control_period_ms: u32,
    #[serde(default)]
    pub feedback_device: FeedbackDevice,
    #[serde(default)]
    pub codes_per_rev: u32,
    #[serde(default)]
    pub pot_turns: u32,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub reverse_sensor: bool,
    #[serde(default)]
    pub reverse_output: bool,
    /// Leave unset to keep the boot setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brake_mode: Option<bool>,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<ProfileConfig>,
    /// Rotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_soft_limit: Option<f64>,
    /// Rotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_soft_limit: Option<f64>,
    /// `[forward, reverse]` volts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_output_voltage: Option<(f64, f64)>,
    /// `[forward, reverse]` volts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_output_voltage: Option<(f64, f64)>,
}

impl TalonDeviceConfig {
    pub fn new(device_number: u8) -> Self {
        Self {
            backend: default_backend(),
            enabled: true,
            device_number,
            control_period_ms: default_control_period(),
            feedback_device: FeedbackDevice::default(),
            codes_per_rev: 0,
            pot_turns: 0,
            inverted: false,
            reverse_sensor: false,
            reverse_output: false,
            brake_mode: None,
            settle_delay_ms: default_settle_delay(),
            profiles: Vec::new(),
            forward_soft_limit: None,
            reverse_soft_limit: None,
            peak_output_voltage: None,
            nominal_output_voltage: None,
        }
    }

    pub fn validate(&self) -> TalonResult<()> {
        for profile in &self.profiles {
            if profile.slot > 1 {
                return Err(TalonError::invalid_argument(format!(
                    "profile slot must be 0 or 1, got {}",
                    profile.slot
                )));
            }
        }
        if let (Some(fwd), Some(rev)) = (self.forward_soft_limit, self.reverse_soft_limit) {
            if fwd < rev {
                return Err(TalonError::config(format!(
                    "forward soft limit {} is below reverse soft limit {}",
                    fwd, rev
                )));
            }
        }
        Ok(())
    }
}

/// Gains for one profile slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub slot: u8,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
    pub izone: i32,
    /// Volts per second
    pub close_loop_ramp_rate: f64,
}

impl ProfileConfig {
    pub fn gains(&self) -> PidGains {
        PidGains {
            p: self.p,
            i: self.i,
            d: self.d,
            f: self.f,
            izone: self.izone,
            close_loop_ramp_rate: self.close_loop_ramp_rate,
        }
    }
}

fn default_backend() -> String {
    "simulation".to_string()
}

fn default_true() -> bool {
    true
}

fn default_control_period() -> u32 {
    10
}

fn default_settle_delay() -> u64 {
    4
}
