//! # Error Types
//!
//! Custom error types for Joymask using `thiserror`.

use thiserror::Error;

use crate::controller::identity::Guid;

/// Main error type for Joymask
#[derive(Debug, Error)]
pub enum JoymaskError {
    /// Every duplicate index (0-31) for a hardware GUID is already taken.
    ///
    /// This is unrecoverable: the device must not be constructed.
    #[error("Too many duplicate devices for GUID {guid}")]
    TooManyDuplicateDevices {
        /// GUID whose occupancy mask is full
        guid: Guid,
    },

    /// Controller I/O errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No usable joystick was found
    #[error("No joystick found")]
    ControllerNotFound,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joymask
pub type Result<T> = std::result::Result<T, JoymaskError>;
