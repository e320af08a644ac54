//! # Remap Capture Module
//!
//! Gesture recognition for interactive remapping.
//!
//! While a device is capturing, its raw events no longer drive the live
//! bitmask. They are fed to a [`RemapCapture`], which first *arms* one
//! physical control and then *commits* once the control completes its
//! gesture:
//!
//! | Control | Arms on | Commits on |
//! |---------|---------|------------|
//! | Axis | leaving the deadzone | returning to center |
//! | Hat | one axis-aligned direction | returning to center |
//! | Button | press | release of the same button |
//! | Key | - | key-down (Escape cancels) |
//!
//! Only one control can be armed at a time. Events from any other control,
//! and from the armed control moving to a different direction, are ignored
//! until the armed gesture completes.
//!
//! The capture itself never touches a mapping table; it reports a
//! [`Gesture`] and leaves applying the [`Binding`] to the device.

use super::keys::{key_name, VK_ESCAPE};
use super::mapping::{AxisDirection, Binding, HatDirection, HatPosition};

/// The control a capture is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Armed {
    /// Nothing armed yet.
    Idle,
    Axis { axis: usize, direction: AxisDirection },
    Hat { hat: usize, direction: HatDirection },
    Button { button: usize },
}

/// Outcome of feeding one raw event to a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// The event does not advance the capture.
    Ignored,
    /// The event armed a control.
    Armed,
    /// The gesture completed; the target mask should be bound to this control.
    Commit(Binding),
    /// The user backed out; nothing should be bound.
    Cancel,
}

/// State of one remap session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapCapture {
    target: u32,
    armed: Armed,
}

impl RemapCapture {
    /// Starts a capture for the logical bits in `target`.
    #[must_use]
    pub fn new(target: u32) -> Self {
        Self {
            target,
            armed: Armed::Idle,
        }
    }

    /// Logical mask being remapped.
    #[must_use]
    pub fn target(&self) -> u32 {
        self.target
    }

    #[must_use]
    pub fn armed(&self) -> Armed {
        self.armed
    }

    /// Axis moved to `direction` (`None` = centered).
    pub fn on_axis(&mut self, axis: usize, direction: Option<AxisDirection>) -> Gesture {
        match (self.armed, direction) {
            (Armed::Idle, Some(direction)) => {
                self.armed = Armed::Axis { axis, direction };
                Gesture::Armed
            }
            (Armed::Axis { axis: armed, direction }, None) if armed == axis => {
                Gesture::Commit(Binding::Axis { axis, direction })
            }
            _ => Gesture::Ignored,
        }
    }

    /// Hat moved to `position`.
    pub fn on_hat(&mut self, hat: usize, position: HatPosition) -> Gesture {
        match self.armed {
            Armed::Idle => match position.single() {
                Some(direction) => {
                    self.armed = Armed::Hat { hat, direction };
                    Gesture::Armed
                }
                None => Gesture::Ignored,
            },
            Armed::Hat { hat: armed, direction } if armed == hat && position.is_centered() => {
                Gesture::Commit(Binding::Hat { hat, direction })
            }
            _ => Gesture::Ignored,
        }
    }

    /// Button pressed or released.
    pub fn on_button(&mut self, button: usize, pressed: bool) -> Gesture {
        match (self.armed, pressed) {
            (Armed::Idle, true) => {
                self.armed = Armed::Button { button };
                Gesture::Armed
            }
            (Armed::Button { button: armed }, false) if armed == button => {
                Gesture::Commit(Binding::Button { button })
            }
            _ => Gesture::Ignored,
        }
    }

    /// Keyboard key went down or up. Key-up is ignored.
    pub fn on_key(&mut self, code: u32, scan_code: u32, extended: bool, down: bool) -> Gesture {
        if !down {
            return Gesture::Ignored;
        }

        if code == VK_ESCAPE {
            return Gesture::Cancel;
        }

        Gesture::Commit(Binding::Key {
            code,
            name: key_name(code, scan_code, extended),
        })
    }
}
