use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use colored::*;
use talon_library::drivers::create_device_with;
use talon_library::{ControlMode, DevicesConfig, SimulationTalonTransport, TalonSrx};

/// Modes selectable from the command line
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Percent,
    Position,
    Velocity,
    Current,
    Voltage,
}

impl From<ModeArg> for ControlMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Percent => ControlMode::PercentOutput,
            ModeArg::Position => ControlMode::Position,
            ModeArg::Velocity => ControlMode::Velocity,
            ModeArg::Current => ControlMode::Current,
            ModeArg::Voltage => ControlMode::Voltage,
        }
    }
}

pub struct RunOptions {
    pub config: PathBuf,
    pub device: String,
    pub mode: ModeArg,
    pub setpoint: f64,
    pub cycles: u32,
    pub period_ms: Option<u32>,
    pub json: bool,
}

/// One cycle of a simulated run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSample {
    pub cycle: u32,
    pub feedback: f64,
    pub position: f64,
    pub speed: f64,
    pub current: f64,
    pub bus_voltage: f64,
    pub temperature: f64,
}

pub fn run_device(opts: RunOptions) -> Result<()> {
    let config = DevicesConfig::from_file(&opts.config)
        .with_context(|| format!("failed to load {}", opts.config.display()))?;
    let device = config.get(&opts.device).ok_or_else(|| {
        let names: Vec<&str> = config.devices.keys().map(String::as_str).collect();
        anyhow!(
            "no device '{}' in {} (defined: {})",
            opts.device,
            opts.config.display(),
            names.join(", ")
        )
    })?;

    if device.backend != "simulation" && device.backend != "sim" {
        tracing::warn!(
            "device '{}' uses backend '{}'; running against the simulation instead",
            opts.device,
            device.backend
        );
    }

    let period_ms = opts.period_ms.unwrap_or(device.control_period_ms).max(1);
    let sim = SimulationTalonTransport::new();
    let mut talon = create_device_with(device, sim.clone())
        .with_context(|| format!("failed to set up device '{}'", opts.device))?;

    let mode = ControlMode::from(opts.mode);
    tracing::info!(
        "{}: {} at {} for {} cycles of {} ms",
        talon.description(),
        mode,
        opts.setpoint,
        opts.cycles,
        period_ms
    );

    let samples = drive(&mut talon, &sim, mode, opts.setpoint, opts.cycles, period_ms)?;

    if !opts.json {
        println!(
            "{:>6} {:>12} {:>12} {:>12} {:>10}",
            "cycle".bold(),
            "feedback".bold(),
            "position".bold(),
            "speed".bold(),
            "current".bold()
        );
    }
    for sample in &samples {
        if opts.json {
            let line = serde_json::json!({
                "cycle": sample.cycle,
                "mode": mode.to_string(),
                "setpoint": opts.setpoint,
                "feedback": sample.feedback,
                "position": sample.position,
                "speed": sample.speed,
                "current": sample.current,
                "bus_voltage": sample.bus_voltage,
                "temperature": sample.temperature,
            });
            println!("{}", line);
        } else {
            println!(
                "{:>6} {:>12.4} {:>12.4} {:>12.2} {:>10.2}",
                sample.cycle, sample.feedback, sample.position, sample.speed, sample.current
            );
        }
    }

    if let Some(last) = samples.last() {
        tracing::info!(
            "finished: feedback {:.4} for setpoint {}",
            last.feedback,
            opts.setpoint
        );
    }
    talon.release()?;
    Ok(())
}

/// Enable `mode` at `setpoint` and step the simulation once per cycle
fn drive(
    talon: &mut TalonSrx<SimulationTalonTransport>,
    sim: &SimulationTalonTransport,
    mode: ControlMode,
    setpoint: f64,
    cycles: u32,
    period_ms: u32,
) -> Result<Vec<CycleSample>> {
    talon.change_control_mode(mode)?;
    talon.enable_control()?;

    let dt = f64::from(period_ms) / 1000.0;
    let mut samples = Vec::with_capacity(cycles as usize);
    for cycle in 0..cycles {
        talon.set_output(setpoint)?;
        sim.simulate_tick(dt);
        samples.push(CycleSample {
            cycle,
            feedback: talon.get_feedback(),
            position: talon.position(),
            speed: talon.speed(),
            current: talon.output_current(),
            bus_voltage: talon.bus_voltage(),
            temperature: talon.temperature(),
        });
    }

    talon.disable_control()?;
    Ok(samples)
}
