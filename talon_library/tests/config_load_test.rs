// Loading device files and building devices from them
use talon_library::drivers::{create_device, create_device_with};
use talon_library::{
    ControlField, ControlMode, DevicesConfig, FeedbackDevice, ParamId, SimulationTalonTransport,
};

const DEVICES_YAML: &str = r#"
devices:
  elevator:
    device_number: 12
    control_period_ms: 20
    feedback_device: magnetic_encoder_relative
    reverse_sensor: true
    settle_delay_ms: 0
    profiles:
      - slot: 0
        p: 0.3
        close_loop_ramp_rate: 12.0
      - slot: 1
        p: 0.9
        f: 0.1
    forward_soft_limit: 20.0
    reverse_soft_limit: 0.0
    nominal_output_voltage: [0.5, -0.5]
  intake:
    device_number: 13
    enabled: false
"#;

#[test]
fn test_yaml_file_to_configured_device() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("talon.yml"), DEVICES_YAML).unwrap();

    let config = DevicesConfig::find_and_load_in(dir.path()).unwrap();
    let elevator = config.get("elevator").unwrap();

    let sim = SimulationTalonTransport::new();
    let mut talon = create_device_with(elevator, sim.clone()).unwrap();

    assert_eq!(talon.device_id(), 12);
    assert_eq!(sim.control_period_ms(), 20);
    assert_eq!(talon.feedback_device(), FeedbackDevice::MagneticEncoderRelative);
    assert_eq!(sim.control_field(ControlField::RevFeedbackSensor), Some(1));
    assert_eq!(sim.control_field(ControlField::RevMotDuringCloseLoop), Some(0));
    // Brake mode left at the boot setting
    assert_eq!(sim.control_field(ControlField::OverrideBrakeType), None);

    assert_eq!(sim.param(ParamId::Slot0P), Some(0.3));
    // 12 * 1023 / 12 / 1000 = 1.023
    assert_eq!(sim.param(ParamId::Slot0CloseLoopRampRate), Some(1.0));
    assert_eq!(sim.param(ParamId::Slot1P), Some(0.9));
    assert_eq!(sim.param(ParamId::Slot1F), Some(0.1));
    assert_eq!(talon.profile(), 0);

    assert_eq!(sim.param(ParamId::SoftLimitForThreshold), Some(20.0 * 4096.0));
    assert_eq!(sim.param(ParamId::SoftLimitRevThreshold), Some(0.0));
    assert_eq!(sim.param(ParamId::NominalPosOutput), Some(1023.0 * 0.5 / 12.0));

    // Configuration never changes the construction-time mode
    assert_eq!(talon.control_mode(), ControlMode::PercentOutput);
    talon.set_output(1.0).unwrap();
    assert_eq!(sim.last_demand(), 1023);
}

#[test]
fn test_disabled_entry_is_refused() {
    let config = DevicesConfig::from_yaml(DEVICES_YAML).unwrap();
    let err = create_device(config.get("intake").unwrap()).unwrap_err();
    assert!(err.to_string().contains("disabled"));
}

#[test]
fn test_unknown_backend_is_a_driver_error() {
    let config = DevicesConfig::from_yaml(
        "devices:\n  left:\n    device_number: 1\n    backend: socketcan\n",
    )
    .unwrap();
    let err = create_device(config.get("left").unwrap()).unwrap_err();
    assert!(err.is_driver());
}
