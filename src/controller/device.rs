//! # Device Module
//!
//! One physical input device (the keyboard or a joystick) and its logical state.
//!
//! A [`Device`] owns a [`MappingTable`], a deadzone table, the running
//! bitmask of held logical inputs, and, while remapping, a [`RemapCapture`].
//! All raw events go through [`Device::dispatch`], which routes them by mode:
//!
//! - **Live**: joystick events update the bitmask through the mapping table.
//! - **Capturing**: events drive the capture gesture instead. When the gesture
//!   completes the table is rewritten, the capture ends, and the owner that
//!   requested the remap is told which mask was committed.
//!
//! Keyboard devices have no live path. The host polls key state itself and
//! uses the keyboard's table (see [`Device::keyboard_state`]) to translate it.
//!
//! ## Usage
//!
//! ```
//! use joymask::controller::device::{Device, JoystickProfile};
//! use joymask::controller::identity::{Guid, GuidRegistry};
//!
//! let registry = GuidRegistry::shared();
//! let mut pad = Device::joystick("Gamepad", Guid::new([1; 16]), &registry, &JoystickProfile::default())?;
//!
//! pad.on_axis(0, 30_000); // stick right, past the 25000 deadzone
//! assert_eq!(pad.current_state(), 1 << 3);
//!
//! pad.on_axis(0, 0);
//! assert_eq!(pad.current_state(), 0);
//! # Ok::<(), joymask::error::JoymaskError>(())
//! ```
//!
//! # Thread Safety
//!
//! `Device` is not thread-safe. All events for all devices are expected on
//! one thread.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use tracing::{debug, info, warn};

use super::calibration::{Deadzones, DEFAULT_DEADZONE};
use super::capture::{Gesture, RemapCapture};
use super::hook::{KeyboardHook, WindowHandle};
use super::identity::{DeviceIdentity, Guid, SharedRegistry};
use super::mapping::{
    AxisDirection, Binding, DefaultLayout, HatPosition, MappingTable, LOGICAL_BITS,
};
use crate::error::Result;

/// Receives the result of a remap session.
pub trait MappingOwner {
    /// Called exactly once per capture that completes.
    ///
    /// `mask` is the committed target mask, or zero if the user cancelled
    /// (Escape during keyboard capture) and nothing changed.
    ///
    /// The device borrows the owner mutably for the call. If the owner is
    /// already borrowed when the capture ends (an event fed from inside its
    /// own borrow), the call is skipped; the same mask is returned from
    /// [`Device::dispatch`] so the host can deliver it instead.
    fn done_mapping(&mut self, device: &Device, mask: u32);
}

/// Non-owning handle to a [`MappingOwner`].
///
/// The device drops its handle when the capture ends, however it ends.
pub type OwnerHandle = Weak<RefCell<dyn MappingOwner>>;

/// What kind of hardware a device wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Keyboard,
    Joystick,
}

/// A raw event from the host's polling loop or keyboard hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    /// Axis position on the ±32767 range.
    Axis { axis: usize, value: i32 },
    Hat { hat: usize, position: HatPosition },
    Button { button: usize, pressed: bool },
    Key { code: u32, scan_code: u32, extended: bool, down: bool },
}

/// Result of [`Device::mapping_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingName<'a> {
    /// Display name of the first bound key.
    Bound(&'a str),
    /// None of the requested bits is bound.
    Unbound,
    /// This device kind has no display names (joysticks).
    Unsupported,
}

impl<'a> MappingName<'a> {
    /// The name, or an empty string.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match self {
            MappingName::Bound(name) => name,
            MappingName::Unbound | MappingName::Unsupported => "",
        }
    }
}

/// Construction parameters for joystick devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickProfile {
    /// Deadzone applied to every axis.
    pub deadzone: i32,
    /// Logical bits bound to the sticks and first hat.
    pub layout: DefaultLayout,
}

impl Default for JoystickProfile {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_DEADZONE,
            layout: DefaultLayout::default(),
        }
    }
}

enum Mode {
    Live,
    Capturing {
        owner: OwnerHandle,
        capture: RemapCapture,
    },
}

/// A keyboard or joystick translated into logical input bits.
pub struct Device {
    name: String,
    kind: DeviceKind,
    identity: Option<DeviceIdentity>,
    table: MappingTable,
    deadzones: Deadzones,
    state: u32,
    mode: Mode,
    hook: Option<Box<dyn KeyboardHook>>,
    hook_installed: bool,
}

impl Device {
    /// Creates the keyboard device with an empty key table.
    ///
    /// `hook` redirects key events to this device during capture.
    #[must_use]
    pub fn keyboard(hook: Box<dyn KeyboardHook>) -> Self {
        Self {
            name: "Keyboard".to_string(),
            kind: DeviceKind::Keyboard,
            identity: None,
            table: MappingTable::new(),
            deadzones: Deadzones::default(),
            state: 0,
            mode: Mode::Live,
            hook: Some(hook),
            hook_installed: false,
        }
    }

    /// Creates a joystick device with the default layout from `profile`.
    ///
    /// # Errors
    ///
    /// Returns `TooManyDuplicateDevices` if 32 joysticks with this GUID are
    /// already live. The device is not created.
    pub fn joystick(
        name: impl Into<String>,
        guid: Guid,
        registry: &SharedRegistry,
        profile: &JoystickProfile,
    ) -> Result<Self> {
        let identity = DeviceIdentity::acquire(registry, guid)?;
        let name = name.into();

        info!("Joystick '{}' connected (GUID {}, index {})", name, guid, identity.index());

        Ok(Self {
            name,
            kind: DeviceKind::Joystick,
            identity: Some(identity),
            table: MappingTable::with_default_layout(&profile.layout),
            deadzones: Deadzones::uniform(profile.deadzone),
            state: 0,
            mode: Mode::Live,
            hook: None,
            hook_installed: false,
        })
    }

    /// Display name of the device.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    #[must_use]
    pub fn is_keyboard(&self) -> bool {
        self.kind == DeviceKind::Keyboard
    }

    /// Hardware GUID (all zero for the keyboard).
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.identity.as_ref().map_or(Guid::ZERO, DeviceIdentity::guid)
    }

    /// Index among live joysticks sharing this GUID.
    #[must_use]
    pub fn index(&self) -> Option<u8> {
        self.identity.as_ref().map(DeviceIdentity::index)
    }

    /// True if no other live device shares this device's GUID.
    ///
    /// Always true for the keyboard.
    #[must_use]
    pub fn is_only_such_device(&self) -> bool {
        self.identity
            .as_ref()
            .map_or(true, DeviceIdentity::is_only_such_device)
    }

    /// Logical bits currently held on this device.
    #[must_use]
    pub fn current_state(&self) -> u32 {
        self.state
    }

    #[must_use]
    pub fn mapping_table(&self) -> &MappingTable {
        &self.table
    }

    /// Mutable table access, for restoring saved bindings.
    pub fn mapping_table_mut(&mut self) -> &mut MappingTable {
        &mut self.table
    }

    #[must_use]
    pub fn deadzones(&self) -> &Deadzones {
        &self.deadzones
    }

    /// Overrides the deadzone of one axis. Returns `false` for an unknown axis.
    pub fn set_deadzone(&mut self, axis: usize, threshold: i32) -> bool {
        self.deadzones.set(axis, threshold)
    }

    /// Key code bound to logical `bit`, for host-side key polling.
    #[must_use]
    pub fn key_code(&self, bit: usize) -> Option<u32> {
        self.table.key(bit).map(|binding| binding.code)
    }

    /// Binds a key to one logical bit without a capture session.
    ///
    /// Returns `false` if `bit` is outside the logical bit space.
    pub fn bind_key(&mut self, bit: usize, code: u32, name: &str) -> bool {
        if bit >= LOGICAL_BITS {
            return false;
        }
        self.table.bind_keys(1u32 << bit, code, name);
        true
    }

    /// Logical bits whose bound key `is_down` reports as pressed.
    pub fn keyboard_state(&self, mut is_down: impl FnMut(u32) -> bool) -> u32 {
        (0..LOGICAL_BITS)
            .filter_map(|bit| self.table.key(bit).map(|binding| (bit, binding.code)))
            .filter(|(_, code)| is_down(*code))
            .fold(0, |mask, (bit, _)| mask | (1u32 << bit))
    }

    /// Display name bound to the bits of `mask`.
    ///
    /// Joysticks have no naming scheme and always report `Unsupported`.
    #[must_use]
    pub fn mapping_name(&self, mask: u32) -> MappingName<'_> {
        match self.kind {
            DeviceKind::Keyboard => self
                .table
                .key_name(mask)
                .map_or(MappingName::Unbound, MappingName::Bound),
            DeviceKind::Joystick => MappingName::Unsupported,
        }
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        matches!(self.mode, Mode::Capturing { .. })
    }

    /// Mask being remapped, if a capture is active.
    #[must_use]
    pub fn capture_target(&self) -> Option<u32> {
        match &self.mode {
            Mode::Live => None,
            Mode::Capturing { capture, .. } => Some(capture.target()),
        }
    }

    pub fn on_axis(&mut self, axis: usize, value: i32) -> Option<u32> {
        self.dispatch(RawEvent::Axis { axis, value })
    }

    pub fn on_hat(&mut self, hat: usize, position: HatPosition) -> Option<u32> {
        self.dispatch(RawEvent::Hat { hat, position })
    }

    pub fn on_button(&mut self, button: usize, pressed: bool) -> Option<u32> {
        self.dispatch(RawEvent::Button { button, pressed })
    }

    pub fn on_key(&mut self, code: u32, scan_code: u32, extended: bool, down: bool) -> Option<u32> {
        self.dispatch(RawEvent::Key {
            code,
            scan_code,
            extended,
            down,
        })
    }

    /// Handles one raw event according to the current mode.
    ///
    /// Events for the wrong device kind or for controls without a table
    /// entry are dropped.
    ///
    /// Returns the mask passed to the owner when this event ends a capture
    /// (zero on cancel), and `None` otherwise.
    pub fn dispatch(&mut self, event: RawEvent) -> Option<u32> {
        if !self.accepts(&event) {
            return None;
        }

        if let Mode::Live = self.mode {
            self.apply_live(event);
            return None;
        }

        let direction = match event {
            RawEvent::Axis { axis, value } => self.deadzones.classify(axis, value),
            _ => None,
        };

        let Mode::Capturing { capture, .. } = &mut self.mode else {
            return None;
        };

        let gesture = match event {
            RawEvent::Axis { axis, .. } => capture.on_axis(axis, direction),
            RawEvent::Hat { hat, position } => capture.on_hat(hat, position),
            RawEvent::Button { button, pressed } => capture.on_button(button, pressed),
            RawEvent::Key {
                code,
                scan_code,
                extended,
                down,
            } => capture.on_key(code, scan_code, extended, down),
        };

        match gesture {
            Gesture::Ignored => None,
            Gesture::Armed => {
                debug!("{}: armed by {:?}", self.name, event);
                None
            }
            Gesture::Commit(binding) => self.finish_capture(Some(binding)),
            Gesture::Cancel => self.finish_capture(None),
        }
    }

    /// Starts remapping `target` on this device.
    ///
    /// Any capture already running is cancelled first (without notifying its
    /// owner). On the keyboard, the key hook is installed for `window`.
    /// A zero `target` is rejected and leaves the device live.
    pub fn start_mapping(&mut self, owner: OwnerHandle, target: u32, window: WindowHandle) {
        self.cancel_mapping();

        if target == 0 {
            warn!("{}: Ignoring mapping request for an empty mask", self.name);
            return;
        }

        info!("{}: Starting mapping {:08x}", self.name, target);

        self.mode = Mode::Capturing {
            owner,
            capture: RemapCapture::new(target),
        };

        if let Some(hook) = self.hook.as_mut() {
            hook.install(window);
            self.hook_installed = true;
        }
    }

    /// Abandons any capture in progress. Safe to call at any time.
    pub fn cancel_mapping(&mut self) {
        self.release_hook();

        if let Mode::Capturing { capture, .. } = &self.mode {
            debug!("{}: Cancelled mapping {:08x}", self.name, capture.target());
        }
        self.mode = Mode::Live;
    }

    /// Removes every binding that produces any of `bits`.
    pub fn clear_mapping(&mut self, bits: u32) {
        self.table.clear(bits);
        debug!("{}: Cleared mappings for {:08x}", self.name, bits);
    }

    fn accepts(&self, event: &RawEvent) -> bool {
        match (self.kind, event) {
            (DeviceKind::Keyboard, RawEvent::Key { .. }) => true,
            (DeviceKind::Joystick, RawEvent::Axis { axis, .. }) => self.table.axis(*axis).is_some(),
            (DeviceKind::Joystick, RawEvent::Hat { hat, .. }) => self.table.hat(*hat).is_some(),
            (DeviceKind::Joystick, RawEvent::Button { button, .. }) => {
                self.table.button(*button).is_some()
            }
            _ => false,
        }
    }

    fn apply_live(&mut self, event: RawEvent) {
        match event {
            RawEvent::Axis { axis, value } => {
                let Some(mapping) = self.table.axis(axis).copied() else {
                    return;
                };
                let direction = self.deadzones.classify(axis, value);

                self.state &= !mapping.centered();
                if let Some(direction) = direction {
                    self.state |= mapping.mask(direction);
                }

                debug!(
                    "{}: axis={}; value={}; state={:08x}",
                    self.name,
                    axis,
                    direction.map_or("0", AxisDirection::symbol),
                    self.state
                );
            }
            RawEvent::Hat { hat, position } => {
                let Some(mapping) = self.table.hat(hat).copied() else {
                    return;
                };

                self.state &= !mapping.centered();
                self.state |= mapping.held(position);

                debug!(
                    "{}: hat={}; value={}; state={:08x}",
                    self.name,
                    hat,
                    position.numpad(),
                    self.state
                );
            }
            RawEvent::Button { button, pressed } => {
                let Some(mapping) = self.table.button(button).copied() else {
                    return;
                };

                let key = if pressed {
                    mapping.pressed()
                } else {
                    mapping.released()
                };
                if key == 0 {
                    return;
                }

                if pressed {
                    self.state |= key;
                } else {
                    self.state &= !key;
                }

                debug!(
                    "{}: button={}; value={}; state={:08x}",
                    self.name, button, pressed as u8, self.state
                );
            }
            // Keyboard state is polled by the host
            RawEvent::Key { .. } => {}
        }
    }

    fn finish_capture(&mut self, binding: Option<Binding>) -> Option<u32> {
        let Mode::Capturing { owner, capture } = std::mem::replace(&mut self.mode, Mode::Live)
        else {
            return None;
        };
        self.release_hook();

        let committed = match binding {
            Some(binding) => {
                self.table.bind(&binding, capture.target());
                info!("{}: Mapped {} to {:08x}", self.name, binding, capture.target());
                capture.target()
            }
            None => {
                info!("{}: Mapping {:08x} cancelled", self.name, capture.target());
                0
            }
        };

        self.notify(&owner, committed);
        Some(committed)
    }

    fn notify(&self, owner: &OwnerHandle, mask: u32) {
        let Some(owner) = owner.upgrade() else {
            debug!("{}: Mapping owner is gone", self.name);
            return;
        };

        match owner.try_borrow_mut() {
            Ok(mut owner) => owner.done_mapping(self, mask),
            Err(_) => warn!("{}: Mapping owner is busy, result {:08x} left to the caller", self.name, mask),
        };
    }

    fn release_hook(&mut self) {
        if !self.hook_installed {
            return;
        }

        if let Some(hook) = self.hook.as_mut() {
            hook.uninstall();
        }
        self.hook_installed = false;
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.release_hook();
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("identity", &self.identity)
            .field("state", &format_args!("{:08x}", self.state))
            .field("capture_target", &self.capture_target())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::hook::MockKeyboardHook;
    use crate::controller::identity::GuidRegistry;
    use crate::controller::keys::VK_ESCAPE;
    use crate::controller::mapping::{HatDirection, MAX_AXES};
    use crate::error::JoymaskError;
    use mockall::predicate::eq;
    use std::rc::Rc;

    const BIT_UP: u32 = 1 << 0;
    const BIT_DOWN: u32 = 1 << 1;
    const BIT_LEFT: u32 = 1 << 2;
    const BIT_RIGHT: u32 = 1 << 3;
    const BIT_FIRE: u32 = 1 << 4;
    const BIT_JUMP: u32 = 1 << 7;

    const PAD: Guid = Guid::new([0x5A; 16]);
    const WINDOW: WindowHandle = WindowHandle(0x1234);

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, u32)>,
    }

    impl MappingOwner for Recorder {
        fn done_mapping(&mut self, device: &Device, mask: u32) {
            self.calls.push((device.name().to_string(), mask));
        }
    }

    fn owner() -> (Rc<RefCell<Recorder>>, OwnerHandle) {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let shared: Rc<RefCell<dyn MappingOwner>> = recorder.clone();
        let handle = Rc::downgrade(&shared);
        (recorder, handle)
    }

    fn pad(registry: &SharedRegistry) -> Device {
        Device::joystick("Test Pad", PAD, registry, &JoystickProfile::default()).unwrap()
    }

    fn permissive_hook() -> Box<MockKeyboardHook> {
        let mut hook = MockKeyboardHook::new();
        hook.expect_install().return_const(());
        hook.expect_uninstall().return_const(());
        Box::new(hook)
    }

    // ==================== Live Axis Tests ====================

    #[test]
    fn test_axis_end_to_end() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_axis(0, 30_000);
        assert_eq!(device.current_state(), BIT_RIGHT);

        device.on_axis(0, 0);
        assert_eq!(device.current_state(), 0);
    }

    #[test]
    fn test_axis_within_deadzone_is_centered() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_axis(1, -25_000);
        assert_eq!(device.current_state(), 0);

        device.on_axis(1, -25_001);
        assert_eq!(device.current_state(), BIT_UP);

        device.on_axis(1, 12_000);
        assert_eq!(device.current_state(), 0);
    }

    #[test]
    fn test_axis_direction_flip_clears_previous() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_axis(0, 32_767);
        device.on_axis(0, -32_768);
        assert_eq!(device.current_state(), BIT_LEFT);
    }

    #[test]
    fn test_axes_combine() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_axis(0, -30_000);
        device.on_axis(1, 30_000);
        assert_eq!(device.current_state(), BIT_LEFT | BIT_DOWN);

        device.on_axis(0, 0);
        assert_eq!(device.current_state(), BIT_DOWN);
    }

    #[test]
    fn test_custom_deadzone() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        assert!(device.set_deadzone(0, 1000));
        device.on_axis(0, 1500);
        assert_eq!(device.current_state(), BIT_RIGHT);

        // Axes 0 and 2 share the LEFT|RIGHT centered mask
        device.on_axis(0, 0);
        assert_eq!(device.deadzones().threshold(2), Some(DEFAULT_DEADZONE));
        device.on_axis(2, 1500);
        assert_eq!(device.current_state(), 0, "axis2 keeps the default deadzone");

        device.on_axis(2, 25_001);
        assert_eq!(device.current_state(), BIT_RIGHT);
    }

    #[test]
    fn test_centered_axis_clears_shared_bits() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_axis(0, 30_000);
        assert_eq!(device.current_state(), BIT_RIGHT);

        device.on_axis(2, 0);
        assert_eq!(device.current_state(), 0);
    }

    #[test]
    fn test_unknown_controls_are_ignored() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_axis(MAX_AXES, 32_000);
        device.on_axis(usize::MAX, -32_000);
        device.on_hat(17, HatPosition::UP);
        device.on_button(99, true);
        assert_eq!(device.current_state(), 0);
    }

    // ==================== Live Hat Tests ====================

    #[test]
    fn test_hat_diagonal_ors_two_masks() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_hat(0, HatPosition::UP | HatPosition::RIGHT);
        assert_eq!(device.current_state(), BIT_UP | BIT_RIGHT);

        device.on_hat(0, HatPosition::UP);
        assert_eq!(device.current_state(), BIT_UP);

        device.on_hat(0, HatPosition::CENTERED);
        assert_eq!(device.current_state(), 0);
    }

    #[test]
    fn test_hat_centering_clears_shared_bits() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        // Stick and hat share BIT_RIGHT; the hat's centered mask clears it
        device.on_axis(0, 30_000);
        device.on_hat(0, HatPosition::RIGHT);
        device.on_hat(0, HatPosition::CENTERED);
        assert_eq!(device.current_state(), 0);
    }

    // ==================== Live Button Tests ====================

    #[test]
    fn test_unmapped_button_is_inert() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.on_axis(0, 30_000);
        device.on_button(0, true);
        assert_eq!(device.current_state(), BIT_RIGHT);
        device.on_button(0, false);
        assert_eq!(device.current_state(), BIT_RIGHT);
    }

    #[test]
    fn test_mapped_button_press_release() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        device
            .mapping_table_mut()
            .bind(&Binding::Button { button: 2 }, BIT_FIRE);

        device.on_button(2, true);
        assert_eq!(device.current_state(), BIT_FIRE);
        device.on_button(2, false);
        assert_eq!(device.current_state(), 0);
    }

    // ==================== Joystick Capture Tests ====================

    #[test]
    fn test_axis_capture_commits_once() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_JUMP, WINDOW);
        assert!(device.is_capturing());
        assert_eq!(device.capture_target(), Some(BIT_JUMP));

        device.on_axis(1, 30_000);
        assert_eq!(device.current_state(), 0, "capture suppresses live updates");
        assert!(recorder.borrow().calls.is_empty());

        device.on_axis(1, 0);
        assert_eq!(recorder.borrow().calls, vec![("Test Pad".to_string(), BIT_JUMP)]);
        assert!(!device.is_capturing());

        let axis = *device.mapping_table().axis(1).unwrap();
        assert_eq!(axis.mask(AxisDirection::Positive), BIT_JUMP);
        assert_eq!(axis.mask(AxisDirection::Negative), BIT_UP);
        assert_eq!(axis.centered(), BIT_JUMP | BIT_UP);

        // Same gesture again is live input now, not a second commit
        device.on_axis(1, 30_000);
        assert_eq!(device.current_state(), BIT_JUMP);
        device.on_axis(1, 0);
        assert_eq!(device.current_state(), 0);
        assert_eq!(recorder.borrow().calls.len(), 1);
    }

    #[test]
    fn test_axis_capture_ignores_opposite_direction() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_JUMP, WINDOW);
        device.on_axis(0, -30_000);
        device.on_axis(0, 30_000);
        device.on_axis(0, 0);

        assert_eq!(recorder.borrow().calls.len(), 1);
        let axis = *device.mapping_table().axis(0).unwrap();
        assert_eq!(axis.mask(AxisDirection::Negative), BIT_JUMP);
        assert_eq!(axis.mask(AxisDirection::Positive), BIT_RIGHT);
    }

    #[test]
    fn test_hat_capture() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_FIRE, WINDOW);
        device.on_hat(0, HatPosition::DOWN | HatPosition::LEFT);
        device.on_hat(0, HatPosition::CENTERED);
        assert!(device.is_capturing(), "diagonals cannot be captured");

        device.on_hat(0, HatPosition::DOWN);
        device.on_hat(0, HatPosition::CENTERED);
        assert_eq!(recorder.borrow().calls, vec![("Test Pad".to_string(), BIT_FIRE)]);

        let hat = *device.mapping_table().hat(0).unwrap();
        assert_eq!(hat.mask(HatDirection::Down), BIT_FIRE);
        assert_eq!(hat.centered(), BIT_UP | BIT_RIGHT | BIT_LEFT | BIT_FIRE);
    }

    #[test]
    fn test_button_capture() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_FIRE, WINDOW);
        device.on_button(5, true);
        device.on_button(6, true);
        device.on_button(6, false);
        assert!(recorder.borrow().calls.is_empty());

        device.on_button(5, false);
        assert_eq!(recorder.borrow().calls.len(), 1);
        assert_eq!(device.mapping_table().button(5).unwrap().pressed(), BIT_FIRE);
        assert_eq!(device.mapping_table().button(5).unwrap().released(), BIT_FIRE);
        assert_eq!(device.mapping_table().button(6).unwrap().pressed(), 0);
    }

    #[test]
    fn test_start_mapping_replaces_previous_capture() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (first, first_handle) = owner();
        let (second, second_handle) = owner();

        device.start_mapping(first_handle, BIT_FIRE, WINDOW);
        device.on_button(1, true);

        device.start_mapping(second_handle, BIT_JUMP, WINDOW);
        // Release of the button armed by the replaced capture does nothing
        device.on_button(1, false);
        assert!(device.is_capturing());

        device.on_button(3, true);
        device.on_button(3, false);

        assert!(first.borrow().calls.is_empty());
        assert_eq!(second.borrow().calls, vec![("Test Pad".to_string(), BIT_JUMP)]);
    }

    #[test]
    fn test_cancel_mapping_is_idempotent() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.cancel_mapping();
        device.start_mapping(handle, BIT_FIRE, WINDOW);
        device.on_axis(0, 30_000);
        device.cancel_mapping();
        device.cancel_mapping();

        assert!(!device.is_capturing());
        assert_eq!(device.capture_target(), None);
        device.on_axis(0, 0);
        assert!(recorder.borrow().calls.is_empty());
        assert_eq!(
            *device.mapping_table(),
            MappingTable::with_default_layout(&DefaultLayout::default())
        );

        device.on_axis(0, 30_000);
        assert_eq!(device.current_state(), BIT_RIGHT, "live input resumes after cancel");
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (_recorder, handle) = owner();

        device.start_mapping(handle, 0, WINDOW);
        assert!(!device.is_capturing());
    }

    #[test]
    fn test_dropped_owner_still_commits() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_FIRE, WINDOW);
        drop(recorder);

        device.on_button(0, true);
        device.on_button(0, false);
        assert!(!device.is_capturing());
        assert_eq!(device.mapping_table().button(0).unwrap().pressed(), BIT_FIRE);
    }

    #[test]
    fn test_dispatch_reports_committed_mask() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_FIRE, WINDOW);
        assert_eq!(device.on_button(2, true), None);
        assert_eq!(device.on_button(2, false), Some(BIT_FIRE));
        assert_eq!(device.on_button(2, true), None);
        assert_eq!(recorder.borrow().calls, vec![("Test Pad".to_string(), BIT_FIRE)]);
    }

    #[test]
    fn test_busy_owner_result_returned_to_caller() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_FIRE, WINDOW);
        device.on_button(2, true);

        let held = recorder.borrow_mut();
        assert_eq!(device.on_button(2, false), Some(BIT_FIRE));
        drop(held);

        assert!(recorder.borrow().calls.is_empty());
        assert!(!device.is_capturing());
        assert_eq!(device.mapping_table().button(2).unwrap().pressed(), BIT_FIRE);
    }

    #[test]
    fn test_joystick_ignores_key_events() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);
        let (recorder, handle) = owner();

        device.start_mapping(handle, BIT_FIRE, WINDOW);
        device.on_key(0x41, 0x1E, false, true);
        assert!(device.is_capturing());
        assert!(recorder.borrow().calls.is_empty());
    }

    // ==================== Keyboard Capture Tests ====================

    #[test]
    fn test_keyboard_multi_bit_capture() {
        let mut keyboard = Device::keyboard(permissive_hook());
        keyboard.bind_key(0, 0x57, "W");
        let (recorder, handle) = owner();

        keyboard.start_mapping(handle, BIT_UP | BIT_RIGHT, WINDOW);
        keyboard.on_key(0x44, 0x20, false, true);

        assert_eq!(keyboard.key_code(0), Some(0x44));
        assert_eq!(keyboard.key_code(3), Some(0x44));
        assert_eq!(keyboard.mapping_name(BIT_RIGHT), MappingName::Bound("D"));
        assert_eq!(recorder.borrow().calls, vec![("Keyboard".to_string(), BIT_UP | BIT_RIGHT)]);
        assert!(!keyboard.is_capturing());
    }

    #[test]
    fn test_keyboard_capture_clears_key_elsewhere() {
        let mut keyboard = Device::keyboard(permissive_hook());
        keyboard.bind_key(4, 0x20, "Space");
        let (_recorder, handle) = owner();

        keyboard.start_mapping(handle, BIT_UP, WINDOW);
        keyboard.on_key(0x20, 0x39, false, true);

        assert_eq!(keyboard.key_code(0), Some(0x20));
        assert_eq!(keyboard.key_code(4), None);
    }

    #[test]
    fn test_keyboard_escape_commits_zero() {
        let mut keyboard = Device::keyboard(permissive_hook());
        keyboard.bind_key(0, 0x57, "W");
        let (recorder, handle) = owner();

        keyboard.start_mapping(handle, BIT_UP, WINDOW);
        assert_eq!(keyboard.on_key(VK_ESCAPE, 0x01, false, true), Some(0));

        assert_eq!(recorder.borrow().calls, vec![("Keyboard".to_string(), 0)]);
        assert_eq!(keyboard.key_code(0), Some(0x57), "escape leaves bindings untouched");
        assert!(!keyboard.is_capturing());
    }

    #[test]
    fn test_keyboard_key_up_ignored_during_capture() {
        let mut keyboard = Device::keyboard(permissive_hook());
        let (recorder, handle) = owner();

        keyboard.start_mapping(handle, BIT_FIRE, WINDOW);
        keyboard.on_key(0x41, 0x1E, false, false);
        assert!(keyboard.is_capturing());
        assert!(recorder.borrow().calls.is_empty());
    }

    #[test]
    fn test_keyboard_keys_outside_capture_change_nothing() {
        let mut keyboard = Device::keyboard(permissive_hook());
        keyboard.bind_key(1, 0x53, "S");
        let before = keyboard.mapping_table().clone();

        keyboard.on_key(0x53, 0x1F, false, true);
        keyboard.on_key(0x53, 0x1F, false, false);
        assert_eq!(*keyboard.mapping_table(), before);
        assert_eq!(keyboard.current_state(), 0);
    }

    #[test]
    fn test_keyboard_ignores_joystick_events() {
        let mut keyboard = Device::keyboard(permissive_hook());
        let (recorder, handle) = owner();

        keyboard.start_mapping(handle, BIT_FIRE, WINDOW);
        keyboard.on_button(0, true);
        keyboard.on_button(0, false);
        keyboard.on_axis(0, 30_000);
        keyboard.on_axis(0, 0);
        assert!(keyboard.is_capturing());
        assert!(recorder.borrow().calls.is_empty());
    }

    #[test]
    fn test_hook_installed_and_released_on_commit() {
        let mut hook = MockKeyboardHook::new();
        hook.expect_install().with(eq(WINDOW)).times(1).return_const(());
        hook.expect_uninstall().times(1).return_const(());

        let mut keyboard = Device::keyboard(Box::new(hook));
        let (_recorder, handle) = owner();

        keyboard.start_mapping(handle, BIT_FIRE, WINDOW);
        keyboard.on_key(0x46, 0x21, false, true);
        keyboard.cancel_mapping();
    }

    #[test]
    fn test_hook_released_when_capture_replaced() {
        let mut hook = MockKeyboardHook::new();
        hook.expect_install().times(2).return_const(());
        hook.expect_uninstall().times(2).return_const(());

        let mut keyboard = Device::keyboard(Box::new(hook));
        let (_first, first_handle) = owner();
        let (_second, second_handle) = owner();

        keyboard.start_mapping(first_handle, BIT_FIRE, WINDOW);
        keyboard.start_mapping(second_handle, BIT_JUMP, WINDOW);
        keyboard.cancel_mapping();
    }

    #[test]
    fn test_hook_released_on_drop() {
        let mut hook = MockKeyboardHook::new();
        hook.expect_install().times(1).return_const(());
        hook.expect_uninstall().times(1).return_const(());

        let mut keyboard = Device::keyboard(Box::new(hook));
        let (_recorder, handle) = owner();
        keyboard.start_mapping(handle, BIT_FIRE, WINDOW);
        drop(keyboard);
    }

    #[test]
    fn test_hook_untouched_without_capture() {
        let mut hook = MockKeyboardHook::new();
        hook.expect_install().never();
        hook.expect_uninstall().never();

        let mut keyboard = Device::keyboard(Box::new(hook));
        keyboard.cancel_mapping();
        keyboard.clear_mapping(u32::MAX);
    }

    #[test]
    fn test_keyboard_state_from_polled_keys() {
        let mut keyboard = Device::keyboard(permissive_hook());
        keyboard.bind_key(0, 0x57, "W");
        keyboard.bind_key(2, 0x41, "A");
        keyboard.bind_key(4, 0x20, "Space");

        let held = keyboard.keyboard_state(|code| code == 0x57 || code == 0x20);
        assert_eq!(held, BIT_UP | BIT_FIRE);
        assert_eq!(keyboard.keyboard_state(|_| false), 0);
        assert!(!keyboard.bind_key(LOGICAL_BITS, 0x20, "Space"));
    }

    // ==================== Naming & Clearing Tests ====================

    #[test]
    fn test_mapping_name() {
        let registry = GuidRegistry::shared();
        let device = pad(&registry);
        assert_eq!(device.mapping_name(BIT_UP), MappingName::Unsupported);
        assert_eq!(device.mapping_name(BIT_UP).as_str(), "");

        let mut keyboard = Device::keyboard(permissive_hook());
        assert_eq!(keyboard.mapping_name(BIT_UP), MappingName::Unbound);
        keyboard.bind_key(0, 0x26, "Up");
        assert_eq!(keyboard.mapping_name(BIT_UP | BIT_DOWN).as_str(), "Up");
    }

    #[test]
    fn test_clear_mapping() {
        let registry = GuidRegistry::shared();
        let mut device = pad(&registry);

        device.clear_mapping(BIT_RIGHT);
        device.on_axis(0, 30_000);
        device.on_hat(0, HatPosition::RIGHT);
        assert_eq!(device.current_state(), 0);

        device.on_axis(0, -30_000);
        assert_eq!(device.current_state(), BIT_LEFT);
        assert_eq!(device.mapping_table().axis(0).unwrap().centered(), BIT_LEFT);
    }

    // ==================== Identity Tests ====================

    #[test]
    fn test_keyboard_identity() {
        let keyboard = Device::keyboard(permissive_hook());
        assert!(keyboard.is_keyboard());
        assert_eq!(keyboard.kind(), DeviceKind::Keyboard);
        assert_eq!(keyboard.name(), "Keyboard");
        assert_eq!(keyboard.guid(), Guid::ZERO);
        assert_eq!(keyboard.index(), None);
        assert!(keyboard.is_only_such_device());
    }

    #[test]
    fn test_duplicate_joysticks() {
        let registry = GuidRegistry::shared();
        let first = pad(&registry);
        assert!(first.is_only_such_device());

        let second = pad(&registry);
        assert_eq!(first.index(), Some(0));
        assert_eq!(second.index(), Some(1));
        assert!(!first.is_only_such_device());
        assert!(!second.is_only_such_device());

        drop(first);
        assert!(second.is_only_such_device());

        let third = pad(&registry);
        assert_eq!(third.index(), Some(0), "freed index is reused");
        assert_eq!(third.guid(), PAD);
    }

    #[test]
    fn test_33rd_joystick_fails() {
        let registry = GuidRegistry::shared();
        let devices: Vec<_> = (0..32).map(|_| pad(&registry)).collect();

        let result = Device::joystick("Test Pad", PAD, &registry, &JoystickProfile::default());
        assert!(matches!(result, Err(JoymaskError::TooManyDuplicateDevices { .. })));

        drop(devices);
        assert_eq!(registry.borrow().occupancy(PAD), 0);
    }

    #[test]
    fn test_profile_layout_and_deadzone() {
        let registry = GuidRegistry::shared();
        let profile = JoystickProfile {
            deadzone: 5000,
            layout: DefaultLayout { up: 10, down: 11, left: 12, right: 13 },
        };
        let mut device = Device::joystick("Arcade Stick", PAD, &registry, &profile).unwrap();

        device.on_axis(0, 6000);
        assert_eq!(device.current_state(), 1 << 13);
        assert_eq!(device.deadzones().threshold(3), Some(5000));
    }
}
