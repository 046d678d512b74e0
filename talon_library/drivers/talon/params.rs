//! Device parameter ids and the request/settle/read proxy

use std::time::Duration;

use talon_core::TalonResult;

use super::TalonTransport;

/// Default wait between a parameter request and reading its response
pub const SETTLE_DELAY: Duration = Duration::from_millis(4);

macro_rules! param_ids {
    ($($(#[$meta:meta])* $name:ident = $code:expr,)+) => {
        /// Talon parameter ids and their wire codes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ParamId {
            $($(#[$meta])* $name,)+
        }

        impl ParamId {
            pub const ALL: &'static [ParamId] = &[$(ParamId::$name,)+];

            pub const fn code(self) -> u32 {
                match self {
                    $(ParamId::$name => $code,)+
                }
            }
        }
    };
}

param_ids! {
    Slot0P = 1,
    Slot0I = 2,
    Slot0D = 3,
    Slot0F = 4,
    Slot0IZone = 5,
    /// Throttle units per millisecond
    Slot0CloseLoopRampRate = 6,
    Slot1P = 11,
    Slot1I = 12,
    Slot1D = 13,
    Slot1F = 14,
    Slot1IZone = 15,
    Slot1CloseLoopRampRate = 16,
    SoftLimitForThreshold = 21,
    SoftLimitRevThreshold = 22,
    SoftLimitForEnable = 23,
    SoftLimitRevEnable = 24,
    OnBootBrakeMode = 31,
    OnBootLimitSwitchForwardNormallyClosed = 32,
    OnBootLimitSwitchReverseNormallyClosed = 33,
    SensorPosition = 73,
    EncPosition = 77,
    FirmwareVersion = 89,
    PidIAccum = 93,
    Status1FrameRate = 94,
    Status2FrameRate = 95,
    Status3FrameRate = 96,
    Status4FrameRate = 97,
    Status8FrameRate = 98,
    ClearPositionOnIdx = 100,
    PeakPosOutput = 104,
    NominalPosOutput = 105,
    PeakNegOutput = 106,
    NominalNegOutput = 107,
    QuadIdxPolarity = 108,
    Slot0AllowableClosedLoopErr = 111,
    NumberPotTurns = 112,
    NumberEncoderCpr = 113,
    PwdPosition = 114,
    AinPosition = 115,
    VoltageCompensationRate = 116,
    Slot1AllowableClosedLoopErr = 117,
}

impl ParamId {
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.code() == code)
    }
}

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Which gain of a closed-loop profile slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotGain {
    P,
    I,
    D,
    F,
    IZone,
    CloseLoopRampRate,
    AllowableClosedLoopErr,
}

impl SlotGain {
    /// Parameter id for this gain in `slot` (anything but 0 is slot 1)
    pub(crate) fn param(self, slot: u8) -> ParamId {
        let slot0 = slot == 0;
        match (self, slot0) {
            (SlotGain::P, true) => ParamId::Slot0P,
            (SlotGain::P, false) => ParamId::Slot1P,
            (SlotGain::I, true) => ParamId::Slot0I,
            (SlotGain::I, false) => ParamId::Slot1I,
            (SlotGain::D, true) => ParamId::Slot0D,
            (SlotGain::D, false) => ParamId::Slot1D,
            (SlotGain::F, true) => ParamId::Slot0F,
            (SlotGain::F, false) => ParamId::Slot1F,
            (SlotGain::IZone, true) => ParamId::Slot0IZone,
            (SlotGain::IZone, false) => ParamId::Slot1IZone,
            (SlotGain::CloseLoopRampRate, true) => ParamId::Slot0CloseLoopRampRate,
            (SlotGain::CloseLoopRampRate, false) => ParamId::Slot1CloseLoopRampRate,
            (SlotGain::AllowableClosedLoopErr, true) => ParamId::Slot0AllowableClosedLoopErr,
            (SlotGain::AllowableClosedLoopErr, false) => ParamId::Slot1AllowableClosedLoopErr,
        }
    }
}

/// Request/response wrapper over the transport's parameter store
///
/// The device gives no completion signal for a read: the proxy sends the
/// request, blocks for the settle delay and then returns whatever response is
/// cached. A device that has not answered yields the stale (or default) value.
/// Never call [`read_parameter`](Self::read_parameter) from the control path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterProxy {
    settle_delay: Duration,
}

impl Default for ParameterProxy {
    fn default() -> Self {
        Self::new(SETTLE_DELAY)
    }
}

impl ParameterProxy {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn set_settle_delay(&mut self, settle_delay: Duration) {
        self.settle_delay = settle_delay;
    }

    /// Request `param`, wait out the settle delay, return the cached response
    pub fn read_parameter<T: TalonTransport + ?Sized>(
        &self,
        transport: &mut T,
        param: ParamId,
    ) -> TalonResult<f64> {
        transport.request_param(param)?;
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
        let value = transport.read_param_response(param);
        log::trace!(
            "param {} read {} after {:?}",
            param,
            value,
            self.settle_delay
        );
        Ok(value)
    }

    /// Queue a parameter write; nothing is read back
    pub fn write_parameter<T: TalonTransport + ?Sized>(
        &self,
        transport: &mut T,
        param: ParamId,
        value: f64,
    ) -> TalonResult<()> {
        log::debug!("param {} <- {}", param, value);
        transport.send_param_write(param, value)
    }
}
