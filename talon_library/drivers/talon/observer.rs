//! Mode-change notifications

use super::ControlMode;

/// Receives every applied control-mode transition
///
/// Called exactly once per applied transition, including the PercentOutput
/// application made while the device is constructed. Requests for the mode
/// that is already current are not transitions and are not reported.
pub trait ModeObserver: Send {
    fn on_mode_applied(&mut self, device_number: u8, mode: ControlMode);
}

/// Logs transitions at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogModeObserver;

impl ModeObserver for LogModeObserver {
    fn on_mode_applied(&mut self, device_number: u8, mode: ControlMode) {
        log::debug!(
            "Talon SRX ID {}: mode {} (code {})",
            device_number,
            mode,
            mode.code()
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModeObserver;

impl ModeObserver for NoopModeObserver {
    fn on_mode_applied(&mut self, _device_number: u8, _mode: ControlMode) {}
}

impl<F> ModeObserver for F
where
    F: FnMut(u8, ControlMode) + Send,
{
    fn on_mode_applied(&mut self, device_number: u8, mode: ControlMode) {
        self(device_number, mode)
    }
}
