//! # Keyboard Hook Module
//!
//! Contract for the OS-level keyboard hook used during keyboard capture.
//!
//! While a keyboard device captures a new binding, key presses must reach
//! the device instead of the host's normal input path. The host supplies a
//! [`KeyboardHook`] that redirects them; the device installs it when a
//! capture starts and uninstalls it on every way out (commit, cancel,
//! replacement by a new capture, or drop). Redirected key events are fed back
//! through [`Device::on_key`](super::device::Device::on_key).

/// Opaque native window handle the hook is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub usize);

/// Installs and removes the keyboard redirection hook.
#[cfg_attr(test, mockall::automock)]
pub trait KeyboardHook {
    /// Starts redirecting key events for `window`.
    fn install(&mut self, window: WindowHandle);

    /// Stops redirecting key events.
    fn uninstall(&mut self);
}
