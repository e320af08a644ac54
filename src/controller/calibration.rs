//! # Calibration Module
//!
//! Applies per-axis deadzones to raw joystick axis values.
//!
//! ## Deadzone
//!
//! Axis values arrive on a signed ±32767 range. A value whose magnitude is
//! at most the axis deadzone is treated as centered; beyond it the axis is
//! pushed in the positive or negative direction. There is no analog output,
//! only the direction.
//!
//! ## Usage
//!
//! ```
//! use joymask::controller::calibration::Deadzones;
//! use joymask::controller::mapping::AxisDirection;
//!
//! let deadzones = Deadzones::default(); // 25000 on every axis
//!
//! assert_eq!(deadzones.classify(0, 25000), None);
//! assert_eq!(deadzones.classify(0, 30000), Some(AxisDirection::Positive));
//! assert_eq!(deadzones.classify(0, -30000), Some(AxisDirection::Negative));
//! ```

use super::mapping::{AxisDirection, MAX_AXES};

/// Default deadzone threshold, on the ±32767 axis range.
pub const DEFAULT_DEADZONE: i32 = 25_000;

/// Largest magnitude an axis can report.
pub const AXIS_EXTENT: i32 = 32_767;

/// Deadzone thresholds for every axis of a joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadzones {
    thresholds: [i32; MAX_AXES],
}

impl Default for Deadzones {
    fn default() -> Self {
        Self::uniform(DEFAULT_DEADZONE)
    }
}

impl Deadzones {
    /// Uses the same threshold on every axis, clamped to `0..=AXIS_EXTENT`.
    ///
    /// # Examples
    ///
    /// ```
    /// use joymask::controller::calibration::Deadzones;
    ///
    /// let deadzones = Deadzones::uniform(8000);
    /// assert_eq!(deadzones.threshold(3), Some(8000));
    /// ```
    #[must_use]
    pub fn uniform(threshold: i32) -> Self {
        Self {
            thresholds: [threshold.clamp(0, AXIS_EXTENT); MAX_AXES],
        }
    }

    /// Threshold for `axis`, or `None` for an axis the table does not cover.
    #[must_use]
    pub fn threshold(&self, axis: usize) -> Option<i32> {
        self.thresholds.get(axis).copied()
    }

    /// Overrides the threshold of one axis.
    ///
    /// Returns `false` (and changes nothing) for an unknown axis.
    pub fn set(&mut self, axis: usize, threshold: i32) -> bool {
        match self.thresholds.get_mut(axis) {
            Some(slot) => {
                *slot = threshold.clamp(0, AXIS_EXTENT);
                true
            }
            None => false,
        }
    }

    /// Classifies a raw axis value.
    ///
    /// Returns `None` when the axis is centered, including for axes outside
    /// the table.
    #[must_use]
    pub fn classify(&self, axis: usize, value: i32) -> Option<AxisDirection> {
        let threshold = self.threshold(axis)?;

        if value.unsigned_abs() <= threshold.unsigned_abs() {
            None
        } else if value > 0 {
            Some(AxisDirection::Positive)
        } else {
            Some(AxisDirection::Negative)
        }
    }
}
