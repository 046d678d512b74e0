use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::*;
use talon_library::drivers::AVAILABLE_BACKENDS;
use talon_library::{DevicesConfig, TalonDeviceConfig};

pub fn run_check(path: Option<PathBuf>) -> Result<()> {
    let config = match &path {
        Some(path) => DevicesConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => DevicesConfig::find_and_load()?,
    };

    if config.devices.is_empty() {
        println!("{} No devices defined", "[WARN]".yellow());
        return Ok(());
    }

    let mut warnings = 0;
    for (name, device) in &config.devices {
        print_device(name, device);
        for warning in device_warnings(device) {
            println!("    {} {}", "[WARN]".yellow(), warning);
            warnings += 1;
        }
    }

    println!(
        "\n{} {} device(s) valid, {} warning(s)",
        "[OK]".green(),
        config.devices.len(),
        warnings
    );
    Ok(())
}

fn print_device(name: &str, device: &TalonDeviceConfig) {
    let state = if device.enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };
    println!(
        "{} (Talon SRX ID {}, {}, {})",
        name.cyan().bold(),
        device.device_number,
        device.backend,
        state
    );
    println!(
        "    feedback: {:?}, cpr: {}, pot turns: {}",
        device.feedback_device, device.codes_per_rev, device.pot_turns
    );
    println!(
        "    control period: {} ms, settle delay: {} ms",
        device.control_period_ms, device.settle_delay_ms
    );
    for profile in &device.profiles {
        println!(
            "    slot {}: p={} i={} d={} f={} izone={} ramp={} V/s",
            profile.slot,
            profile.p,
            profile.i,
            profile.d,
            profile.f,
            profile.izone,
            profile.close_loop_ramp_rate
        );
    }
    if let (Some(fwd), Some(rev)) = (device.forward_soft_limit, device.reverse_soft_limit) {
        println!("    soft limits: {} .. {} rotations", rev, fwd);
    }
}

/// Settings that load fine but will not behave as written
fn device_warnings(device: &TalonDeviceConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if !(1..=95).contains(&device.control_period_ms) {
        warnings.push(format!(
            "control_period_ms {} will be clamped to 1..=95",
            device.control_period_ms
        ));
    }
    let backend_known = device.backend == "sim" || AVAILABLE_BACKENDS.contains(&device.backend.as_str());
    if !backend_known {
        warnings.push(format!(
            "backend '{}' is not available (available: {})",
            device.backend,
            AVAILABLE_BACKENDS.join(", ")
        ));
    }
    let scaled_positions = device.forward_soft_limit.is_some() || device.reverse_soft_limit.is_some();
    if scaled_positions && device.codes_per_rev == 0 && device.pot_turns == 0 {
        warnings.push("soft limits are in native units: no codes_per_rev or pot_turns set".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_warnings() {
        let mut device = TalonDeviceConfig::new(1);
        assert!(device_warnings(&device).is_empty());

        device.control_period_ms = 0;
        device.backend = "socketcan".to_string();
        device.forward_soft_limit = Some(3.0);
        assert_eq!(device_warnings(&device).len(), 3);

        device.backend = "sim".to_string();
        device.codes_per_rev = 1024;
        assert_eq!(device_warnings(&device).len(), 1);
    }

    #[test]
    fn test_check_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.yaml");
        std::fs::write(&path, "devices:\n  arm:\n    device_number: 3\n").unwrap();
        assert!(run_check(Some(path)).is_ok());

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "devices:\n  arm:\n    device_number: 3\n    profiles:\n      - slot: 4\n")
            .unwrap();
        assert!(run_check(Some(bad)).is_err());
    }
}
