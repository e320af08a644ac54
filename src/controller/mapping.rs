//! # Mapping Table Module
//!
//! Translates physical controls into logical input masks.
//!
//! A logical input is one bit of a 32-bit mask ("move left", "button 3", ...).
//! The vocabulary of bits belongs to the host; this module only stores which
//! physical control produces which mask.
//!
//! ## Tables
//!
//! | Control | Index | Slots |
//! |---------|-------|-------|
//! | Axis | 0..4 | centered, positive, negative |
//! | Hat | 0..4 | centered, up, right, down, left |
//! | Button | 0..32 | pressed, released |
//! | Key | logical bit 0..32 | raw key code + display name |
//!
//! For axes and hats the `centered` slot is always the OR of the directional
//! slots. It is used as a clearing mask when the control returns to neutral.
//!
//! ## Usage
//!
//! ```
//! use joymask::controller::mapping::{AxisDirection, DefaultLayout, MappingTable};
//!
//! let layout = DefaultLayout::default();
//! let table = MappingTable::with_default_layout(&layout);
//!
//! let axis = table.axis(0).unwrap();
//! assert_eq!(axis.mask(AxisDirection::Positive), layout.right_mask());
//! assert_eq!(axis.centered(), layout.left_mask() | layout.right_mask());
//! ```

use std::fmt;
use std::ops::BitOr;

/// Width of the logical bit space.
pub const LOGICAL_BITS: usize = 32;
/// Number of axes with a mapping entry.
pub const MAX_AXES: usize = 4;
/// Number of hats with a mapping entry.
pub const MAX_HATS: usize = 4;
/// Number of buttons with a mapping entry.
pub const MAX_BUTTONS: usize = 32;

/// Direction of an axis pushed past its deadzone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisDirection {
    Positive,
    Negative,
}

impl AxisDirection {
    /// `+` or `-`, as shown in log output.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            AxisDirection::Positive => "+",
            AxisDirection::Negative => "-",
        }
    }
}

/// One of the four axis-aligned hat directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HatDirection {
    Up,
    Right,
    Down,
    Left,
}

impl HatDirection {
    /// Every direction, in slot order.
    pub const ALL: [HatDirection; 4] = [
        HatDirection::Up,
        HatDirection::Right,
        HatDirection::Down,
        HatDirection::Left,
    ];

    /// Bit of this direction in a [`HatPosition`].
    #[must_use]
    pub fn bit(self) -> u8 {
        match self {
            HatDirection::Up => 0x01,
            HatDirection::Right => 0x02,
            HatDirection::Down => 0x04,
            HatDirection::Left => 0x08,
        }
    }
}

/// Raw hat position: a set of direction bits, empty when centered.
///
/// Diagonals have two bits set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HatPosition(u8);

impl HatPosition {
    pub const CENTERED: HatPosition = HatPosition(0x00);
    pub const UP: HatPosition = HatPosition(0x01);
    pub const RIGHT: HatPosition = HatPosition(0x02);
    pub const DOWN: HatPosition = HatPosition(0x04);
    pub const LEFT: HatPosition = HatPosition(0x08);

    /// Builds a position from raw bits. Bits above the four directions are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    /// Raw direction bits.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_centered(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn contains(self, direction: HatDirection) -> bool {
        self.0 & direction.bit() != 0
    }

    /// The direction this position points in, if it is exactly one
    /// axis-aligned direction. Diagonals and center yield `None`.
    #[must_use]
    pub fn single(self) -> Option<HatDirection> {
        HatDirection::ALL
            .into_iter()
            .find(|direction| direction.bit() == self.0)
    }

    /// Numeric keypad notation (5 = center, 8 = up, 9 = up-right, ...).
    #[must_use]
    pub fn numpad(self) -> u8 {
        let mut dir = 5;

        if self.contains(HatDirection::Up) {
            dir = 8;
        } else if self.contains(HatDirection::Down) {
            dir = 2;
        }

        if self.contains(HatDirection::Left) {
            dir -= 1;
        } else if self.contains(HatDirection::Right) {
            dir += 1;
        }

        dir
    }
}

impl BitOr for HatPosition {
    type Output = HatPosition;

    fn bitor(self, rhs: HatPosition) -> HatPosition {
        HatPosition(self.0 | rhs.0)
    }
}

impl From<HatDirection> for HatPosition {
    fn from(direction: HatDirection) -> Self {
        HatPosition(direction.bit())
    }
}

/// Masks produced by one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisMapping {
    centered: u32,
    positive: u32,
    negative: u32,
}

impl AxisMapping {
    #[must_use]
    pub fn new(positive: u32, negative: u32) -> Self {
        Self {
            centered: positive | negative,
            positive,
            negative,
        }
    }

    /// Clearing mask applied whenever the axis moves.
    #[must_use]
    pub fn centered(&self) -> u32 {
        self.centered
    }

    #[must_use]
    pub fn mask(&self, direction: AxisDirection) -> u32 {
        match direction {
            AxisDirection::Positive => self.positive,
            AxisDirection::Negative => self.negative,
        }
    }

    /// Binds one direction to `mask` and refreshes the centered mask.
    pub fn bind(&mut self, direction: AxisDirection, mask: u32) {
        match direction {
            AxisDirection::Positive => self.positive = mask,
            AxisDirection::Negative => self.negative = mask,
        }
        self.centered = self.positive | self.negative;
    }

    fn clear(&mut self, bits: u32) {
        for slot in [&mut self.positive, &mut self.negative] {
            if *slot & bits != 0 {
                *slot = 0;
            }
        }
        self.centered = self.positive | self.negative;
    }
}

/// Masks produced by one hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HatMapping {
    centered: u32,
    up: u32,
    right: u32,
    down: u32,
    left: u32,
}

impl HatMapping {
    #[must_use]
    pub fn new(up: u32, right: u32, down: u32, left: u32) -> Self {
        Self {
            centered: up | right | down | left,
            up,
            right,
            down,
            left,
        }
    }

    /// Clearing mask applied whenever the hat moves.
    #[must_use]
    pub fn centered(&self) -> u32 {
        self.centered
    }

    #[must_use]
    pub fn mask(&self, direction: HatDirection) -> u32 {
        match direction {
            HatDirection::Up => self.up,
            HatDirection::Right => self.right,
            HatDirection::Down => self.down,
            HatDirection::Left => self.left,
        }
    }

    /// Bits held while the hat is at `position`.
    ///
    /// Up wins over down and left wins over right if a device reports both.
    #[must_use]
    pub fn held(&self, position: HatPosition) -> u32 {
        let mut held = 0;

        if position.contains(HatDirection::Up) {
            held |= self.up;
        } else if position.contains(HatDirection::Down) {
            held |= self.down;
        }

        if position.contains(HatDirection::Left) {
            held |= self.left;
        } else if position.contains(HatDirection::Right) {
            held |= self.right;
        }

        held
    }

    /// Binds one direction to `mask` and refreshes the centered mask.
    pub fn bind(&mut self, direction: HatDirection, mask: u32) {
        *self.slot_mut(direction) = mask;
        self.refresh_centered();
    }

    fn slot_mut(&mut self, direction: HatDirection) -> &mut u32 {
        match direction {
            HatDirection::Up => &mut self.up,
            HatDirection::Right => &mut self.right,
            HatDirection::Down => &mut self.down,
            HatDirection::Left => &mut self.left,
        }
    }

    fn refresh_centered(&mut self) {
        self.centered = self.up | self.right | self.down | self.left;
    }

    fn clear(&mut self, bits: u32) {
        for direction in HatDirection::ALL {
            let slot = self.slot_mut(direction);
            if *slot & bits != 0 {
                *slot = 0;
            }
        }
        self.refresh_centered();
    }
}

/// Masks produced by one button. A zero mask means unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonMapping {
    pressed: u32,
    released: u32,
}

impl ButtonMapping {
    #[must_use]
    pub fn new(pressed: u32, released: u32) -> Self {
        Self { pressed, released }
    }

    /// Bits set while the button is pressed.
    #[must_use]
    pub fn pressed(&self) -> u32 {
        self.pressed
    }

    /// Bits cleared when the button is released.
    #[must_use]
    pub fn released(&self) -> u32 {
        self.released
    }

    /// Maps the button as a held input: both slots become `mask`.
    pub fn bind(&mut self, mask: u32) {
        self.pressed = mask;
        self.released = mask;
    }

    fn clear(&mut self, bits: u32) {
        for slot in [&mut self.pressed, &mut self.released] {
            if *slot & bits != 0 {
                *slot = 0;
            }
        }
    }
}

/// A keyboard key bound to one logical bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    /// Raw virtual-key code.
    pub code: u32,
    /// Human-readable key name.
    pub name: String,
}

/// A physical control that a capture session can bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Axis { axis: usize, direction: AxisDirection },
    Hat { hat: usize, direction: HatDirection },
    Button { button: usize },
    Key { code: u32, name: String },
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Axis { axis, direction } => write!(f, "axis{} {}", axis, direction.symbol()),
            Binding::Hat { hat, direction } => {
                write!(f, "hat{} {}", hat, HatPosition::from(*direction).numpad())
            }
            Binding::Button { button } => write!(f, "button{}", button),
            Binding::Key { code, name } => write!(f, "key 0x{:02X} ({})", code, name),
        }
    }
}

/// Logical bits used by the default joystick layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultLayout {
    pub up: u8,
    pub down: u8,
    pub left: u8,
    pub right: u8,
}

impl Default for DefaultLayout {
    fn default() -> Self {
        Self {
            up: 0,
            down: 1,
            left: 2,
            right: 3,
        }
    }
}

impl DefaultLayout {
    #[must_use]
    pub fn up_mask(&self) -> u32 {
        bit_mask(self.up)
    }

    #[must_use]
    pub fn down_mask(&self) -> u32 {
        bit_mask(self.down)
    }

    #[must_use]
    pub fn left_mask(&self) -> u32 {
        bit_mask(self.left)
    }

    #[must_use]
    pub fn right_mask(&self) -> u32 {
        bit_mask(self.right)
    }
}

fn bit_mask(bit: u8) -> u32 {
    1u32.checked_shl(u32::from(bit)).unwrap_or(0)
}

/// Per-device mapping from physical controls to logical masks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    axes: [AxisMapping; MAX_AXES],
    hats: [HatMapping; MAX_HATS],
    buttons: [ButtonMapping; MAX_BUTTONS],
    keys: [Option<KeyBinding>; LOGICAL_BITS],
}

impl MappingTable {
    /// Creates an empty table: every control unmapped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a joystick table with both sticks and the first hat bound to
    /// the four directions of `layout`.
    ///
    /// Stick Y axes report positive when pushed down.
    #[must_use]
    pub fn with_default_layout(layout: &DefaultLayout) -> Self {
        let mut table = Self::new();

        let horizontal = AxisMapping::new(layout.right_mask(), layout.left_mask());
        let vertical = AxisMapping::new(layout.down_mask(), layout.up_mask());
        table.axes[0] = horizontal;
        table.axes[1] = vertical;
        table.axes[2] = horizontal;
        table.axes[3] = vertical;

        table.hats[0] = HatMapping::new(
            layout.up_mask(),
            layout.right_mask(),
            layout.down_mask(),
            layout.left_mask(),
        );

        table
    }

    #[must_use]
    pub fn axis(&self, axis: usize) -> Option<&AxisMapping> {
        self.axes.get(axis)
    }

    #[must_use]
    pub fn hat(&self, hat: usize) -> Option<&HatMapping> {
        self.hats.get(hat)
    }

    #[must_use]
    pub fn button(&self, button: usize) -> Option<&ButtonMapping> {
        self.buttons.get(button)
    }

    /// Key bound to logical `bit`, if any.
    #[must_use]
    pub fn key(&self, bit: usize) -> Option<&KeyBinding> {
        self.keys.get(bit).and_then(Option::as_ref)
    }

    /// Name of the first bound key among the bits of `mask`.
    #[must_use]
    pub fn key_name(&self, mask: u32) -> Option<&str> {
        self.keys
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1u32 << bit) != 0)
            .find_map(|(_, binding)| binding.as_ref())
            .map(|binding| binding.name.as_str())
    }

    /// Writes `mask` into the slot named by `binding`.
    ///
    /// Returns `false` if the control index has no table entry.
    pub fn bind(&mut self, binding: &Binding, mask: u32) -> bool {
        match binding {
            Binding::Axis { axis, direction } => match self.axes.get_mut(*axis) {
                Some(mapping) => {
                    mapping.bind(*direction, mask);
                    true
                }
                None => false,
            },
            Binding::Hat { hat, direction } => match self.hats.get_mut(*hat) {
                Some(mapping) => {
                    mapping.bind(*direction, mask);
                    true
                }
                None => false,
            },
            Binding::Button { button } => match self.buttons.get_mut(*button) {
                Some(mapping) => {
                    mapping.bind(mask);
                    true
                }
                None => false,
            },
            Binding::Key { code, name } => {
                self.bind_keys(mask, *code, name);
                true
            }
        }
    }

    /// Binds key `code` to every logical bit of `mask`.
    ///
    /// A key backs at most one set of bits: slots outside `mask` that were
    /// bound to `code` are cleared.
    pub fn bind_keys(&mut self, mask: u32, code: u32, name: &str) {
        for (bit, slot) in self.keys.iter_mut().enumerate() {
            if mask & (1u32 << bit) != 0 {
                *slot = Some(KeyBinding {
                    code,
                    name: name.to_string(),
                });
            } else if slot.as_ref().is_some_and(|binding| binding.code == code) {
                *slot = None;
            }
        }
    }

    /// Removes every binding that produces any of `bits`.
    ///
    /// Centered masks are recomputed afterwards.
    pub fn clear(&mut self, bits: u32) {
        for (bit, slot) in self.keys.iter_mut().enumerate() {
            if bits & (1u32 << bit) != 0 {
                *slot = None;
            }
        }

        self.axes.iter_mut().for_each(|axis| axis.clear(bits));
        self.hats.iter_mut().for_each(|hat| hat.clear(bits));
        self.buttons.iter_mut().for_each(|button| button.clear(bits));
    }
}
