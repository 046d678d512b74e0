//! Unified error handling for the Talon SRX driver
//!
//! Every fallible operation in the workspace returns [`TalonResult`]. Unconfigured
//! unit scaling and unanswered parameter reads are deliberately *not* errors;
//! they degrade to identity conversion and stale values respectively.

use thiserror::Error;

/// Main error type for Talon driver operations
#[derive(Debug, Error)]
pub enum TalonError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A closed-loop feedback write was attempted outside PercentOutput mode
    #[error("Invalid control mode: {0}")]
    InvalidMode(String),

    /// An argument was outside its legal domain (profile slot, mode code, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport/driver lifecycle errors
    #[error("Driver error: {0}")]
    Driver(String),

    /// Bus communication errors
    #[error("Communication error: {0}")]
    Communication(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Catch-all for other error types
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using TalonError
pub type TalonResult<T> = Result<T, TalonError>;

impl From<serde_json::Error> for TalonError {
    fn from(err: serde_json::Error) -> Self {
        TalonError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for TalonError {
    fn from(err: serde_yaml::Error) -> Self {
        TalonError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for TalonError {
    fn from(err: toml::de::Error) -> Self {
        TalonError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for TalonError {
    fn from(err: toml::ser::Error) -> Self {
        TalonError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<&str> for TalonError {
    fn from(msg: &str) -> Self {
        TalonError::Other(msg.to_string())
    }
}

impl From<String> for TalonError {
    fn from(msg: String) -> Self {
        TalonError::Other(msg)
    }
}

// Helper methods
impl TalonError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TalonError::Config(msg.into())
    }

    /// Create a driver error
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        TalonError::Driver(msg.into())
    }

    /// Create a communication error
    pub fn communication<S: Into<String>>(msg: S) -> Self {
        TalonError::Communication(msg.into())
    }

    /// Create an invalid mode error
    pub fn invalid_mode<S: Into<String>>(msg: S) -> Self {
        TalonError::InvalidMode(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        TalonError::InvalidArgument(msg.into())
    }

    /// Check if this is an invalid mode error
    pub fn is_invalid_mode(&self) -> bool {
        matches!(self, TalonError::InvalidMode(_))
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, TalonError::InvalidArgument(_))
    }

    /// Check if this is a driver lifecycle error
    pub fn is_driver(&self) -> bool {
        matches!(self, TalonError::Driver(_))
    }
}
