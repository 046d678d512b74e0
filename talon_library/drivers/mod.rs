//! Hardware drivers
//!
//! # Architecture
//!
//! ```text
//! Caller (control loop, CLI)
//!   │
//!   └── TalonSrx facade (drivers::talon)
//!           │
//!           └── TalonTransport trait
//!                   ├── Simulation transport (always available)
//!                   └── External transports (implement the trait)
//! ```
//!
//! # Adding a New Transport
//!
//! 1. Implement [`talon::TalonTransport`] for the bus type
//! 2. Add its backend name to [`factory::create_transport`]

pub mod factory;
pub mod talon;

pub use factory::{
    create_device, create_device_with, create_transport, BoxedTransport, AVAILABLE_BACKENDS,
};
pub use talon::{SimulationTalonTransport, TalonSrx, TalonTransport};
