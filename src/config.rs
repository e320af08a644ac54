//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; an empty file yields the defaults.
//!
//! ```toml
//! [devices]
//! deadzone = 25000
//!
//! [layout]
//! up = 0
//! down = 1
//! left = 2
//! right = 3
//!
//! [source]
//! axis_min = 0
//! axis_max = 255
//!
//! [logging]
//! level = "info"
//! file = "joymask.log"
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::controller::calibration::{AXIS_EXTENT, DEFAULT_DEADZONE};
use crate::controller::device::JoystickProfile;
use crate::controller::mapping::{DefaultLayout, LOGICAL_BITS};
use crate::controller::source::AxisRange;
use crate::error::{JoymaskError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub devices: DevicesConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings applied to every new joystick
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DevicesConfig {
    #[serde(default = "default_deadzone")]
    pub deadzone: i32,
}

/// Logical bits the default joystick layout drives
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "default_up_bit")]
    pub up: u8,

    #[serde(default = "default_down_bit")]
    pub down: u8,

    #[serde(default = "default_left_bit")]
    pub left: u8,

    #[serde(default = "default_right_bit")]
    pub right: u8,
}

/// Raw stick range reported by evdev
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SourceConfig {
    #[serde(default = "default_axis_min")]
    pub axis_min: i32,

    #[serde(default = "default_axis_max")]
    pub axis_max: i32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to this file when set
    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_deadzone() -> i32 { DEFAULT_DEADZONE }

fn default_up_bit() -> u8 { 0 }
fn default_down_bit() -> u8 { 1 }
fn default_left_bit() -> u8 { 2 }
fn default_right_bit() -> u8 { 3 }

fn default_axis_min() -> i32 { 0 }
fn default_axis_max() -> i32 { 255 }

fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for DevicesConfig {
    fn default() -> Self {
        Self { deadzone: default_deadzone() }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            up: default_up_bit(),
            down: default_down_bit(),
            left: default_left_bit(),
            right: default_right_bit(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            axis_min: default_axis_min(),
            axis_max: default_axis_max(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> JoymaskError {
    JoymaskError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joymask::config::Config;
    ///
    /// let config = Config::load("joymask.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Config` if parsing or validation fails
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if !(0..=AXIS_EXTENT).contains(&self.devices.deadzone) {
            return Err(invalid(format!(
                "deadzone must be between 0 and {}",
                AXIS_EXTENT
            )));
        }

        let bits = [
            ("up", self.layout.up),
            ("down", self.layout.down),
            ("left", self.layout.left),
            ("right", self.layout.right),
        ];
        for (name, bit) in bits {
            if usize::from(bit) >= LOGICAL_BITS {
                return Err(invalid(format!(
                    "layout {} bit {} is out of bounds (must be 0-{})",
                    name,
                    bit,
                    LOGICAL_BITS - 1
                )));
            }
        }
        for (i, (name, bit)) in bits.iter().enumerate() {
            if let Some((other, _)) = bits[i + 1..].iter().find(|(_, b)| b == bit) {
                return Err(invalid(format!(
                    "layout {} and {} must use different bits",
                    name, other
                )));
            }
        }

        if self.source.axis_min >= self.source.axis_max {
            return Err(invalid("axis_min must be less than axis_max"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if self.logging.file.as_deref().is_some_and(str::is_empty) {
            return Err(invalid("log file cannot be empty when set"));
        }

        Ok(())
    }

    /// Settings for new joysticks
    #[must_use]
    pub fn joystick_profile(&self) -> JoystickProfile {
        JoystickProfile {
            deadzone: self.devices.deadzone,
            layout: DefaultLayout {
                up: self.layout.up,
                down: self.layout.down,
                left: self.layout.left,
                right: self.layout.right,
            },
        }
    }

    /// Raw stick range for the evdev source
    #[must_use]
    pub fn axis_range(&self) -> AxisRange {
        AxisRange {
            min: self.source.axis_min,
            max: self.source.axis_max,
        }
    }
}
