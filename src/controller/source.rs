//! # Joystick Source Module
//!
//! Reads joysticks through the Linux evdev interface and turns their events
//! into [`RawEvent`]s.
//!
//! ## Device Detection
//!
//! Every `/dev/input/event*` node is opened; a node counts as a joystick if
//! it reports gamepad or joystick buttons, or a stick axis together with any
//! button. Its [`Guid`] is built from the bus, vendor, product and version
//! IDs, so two controllers of the same model share a GUID.
//!
//! ## Event Translation
//!
//! | evdev | Raw event |
//! |-------|-----------|
//! | ABS_X, ABS_Y, ABS_Z, ABS_RZ | axes 0-3, scaled onto ±32767 |
//! | ABS_HAT0X/Y .. ABS_HAT3X/Y | hats 0-3, X and Y merged into direction bits |
//! | BTN_SOUTH .. 0x13F | buttons 0-15 |
//! | BTN_TRIGGER .. 0x12F | buttons 16-31 |
//!
//! Key auto-repeat, sync events and everything else are dropped.

use std::path::Path;

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::calibration::AXIS_EXTENT;
use super::device::RawEvent;
use super::identity::Guid;
use super::mapping::{HatPosition, MAX_HATS};
use crate::error::{JoymaskError, Result};

/// First gamepad button code (BTN_SOUTH).
const GAMEPAD_BUTTON_FIRST: u16 = 0x130;
/// Last code of the gamepad button block.
const GAMEPAD_BUTTON_LAST: u16 = 0x13F;
/// First joystick button code (BTN_TRIGGER).
const JOYSTICK_BUTTON_FIRST: u16 = 0x120;
/// Last code of the joystick button block.
const JOYSTICK_BUTTON_LAST: u16 = 0x12F;
/// Button index of BTN_TRIGGER.
const JOYSTICK_BUTTON_OFFSET: usize = 16;

/// evdev key value for auto-repeat.
const KEY_REPEAT: i32 = 2;

/// Raw range reported by a device's stick axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl Default for AxisRange {
    /// DualSense-style 8-bit sticks.
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

impl AxisRange {
    /// Scales a raw value onto ±32767, clamping values outside the range.
    ///
    /// # Examples
    ///
    /// ```
    /// use joymask::controller::source::AxisRange;
    ///
    /// let range = AxisRange { min: 0, max: 255 };
    /// assert_eq!(range.normalize(0), -32767);
    /// assert_eq!(range.normalize(255), 32767);
    /// assert!(range.normalize(128).abs() < 200);
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: i32) -> i32 {
        let span = i64::from(self.max) - i64::from(self.min);
        if span <= 0 {
            return 0;
        }

        let extent = i64::from(AXIS_EXTENT);
        let offset = 2 * i64::from(raw) - i64::from(self.min) - i64::from(self.max);
        let scaled = (offset * extent / span).clamp(-extent, extent);

        // In range after the clamp
        scaled as i32
    }
}

/// Stateful evdev-to-[`RawEvent`] translator for one device.
///
/// evdev reports each hat as two independent axes; the translator remembers
/// both halves to produce a combined [`HatPosition`].
#[derive(Debug, Clone)]
pub struct EventTranslator {
    range: AxisRange,
    hats: [(i32, i32); MAX_HATS],
}

impl EventTranslator {
    #[must_use]
    pub fn new(range: AxisRange) -> Self {
        Self {
            range,
            hats: [(0, 0); MAX_HATS],
        }
    }

    /// Translates one evdev event, or returns `None` if it has no counterpart.
    pub fn translate(&mut self, event: &InputEvent) -> Option<RawEvent> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => self.translate_axis(axis, event.value()),
            InputEventKind::Key(key) => translate_button(key, event.value()),
            _ => None,
        }
    }

    fn translate_axis(&mut self, axis: AbsoluteAxisType, value: i32) -> Option<RawEvent> {
        let stick = match axis {
            AbsoluteAxisType::ABS_X => Some(0),
            AbsoluteAxisType::ABS_Y => Some(1),
            AbsoluteAxisType::ABS_Z => Some(2),
            AbsoluteAxisType::ABS_RZ => Some(3),
            _ => None,
        };
        if let Some(stick) = stick {
            return Some(RawEvent::Axis {
                axis: stick,
                value: self.range.normalize(value),
            });
        }

        let code = axis.0;
        if !(AbsoluteAxisType::ABS_HAT0X.0..=AbsoluteAxisType::ABS_HAT3Y.0).contains(&code) {
            return None;
        }

        let offset = usize::from(code - AbsoluteAxisType::ABS_HAT0X.0);
        let hat = offset / 2;
        let halves = self.hats.get_mut(hat)?;
        if offset % 2 == 0 {
            halves.0 = value.signum();
        } else {
            halves.1 = value.signum();
        }

        Some(RawEvent::Hat {
            hat,
            position: hat_position(*halves),
        })
    }
}

fn hat_position((x, y): (i32, i32)) -> HatPosition {
    let mut position = HatPosition::CENTERED;

    match y {
        -1 => position = position | HatPosition::UP,
        1 => position = position | HatPosition::DOWN,
        _ => {}
    }
    match x {
        -1 => position = position | HatPosition::LEFT,
        1 => position = position | HatPosition::RIGHT,
        _ => {}
    }

    position
}

fn translate_button(key: Key, value: i32) -> Option<RawEvent> {
    if value == KEY_REPEAT {
        return None;
    }

    let code = key.code();
    let button = match code {
        GAMEPAD_BUTTON_FIRST..=GAMEPAD_BUTTON_LAST => usize::from(code - GAMEPAD_BUTTON_FIRST),
        JOYSTICK_BUTTON_FIRST..=JOYSTICK_BUTTON_LAST => {
            usize::from(code - JOYSTICK_BUTTON_FIRST) + JOYSTICK_BUTTON_OFFSET
        }
        _ => return None,
    };

    Some(RawEvent::Button {
        button,
        pressed: value != 0,
    })
}

/// Builds a GUID from evdev input IDs, in the layout SDL uses on Linux.
#[must_use]
pub fn guid_from_ids(bus: u16, vendor: u16, product: u16, version: u16) -> Guid {
    let mut bytes = [0u8; 16];
    for (slot, id) in [bus, vendor, product, version].into_iter().enumerate() {
        bytes[slot * 4..slot * 4 + 2].copy_from_slice(&id.to_le_bytes());
    }
    Guid::new(bytes)
}

/// An opened evdev joystick.
pub struct JoystickSource {
    device: evdev::Device,
    device_path: String,
    name: String,
    guid: Guid,
    translator: EventTranslator,
}

impl std::fmt::Debug for JoystickSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoystickSource")
            .field("device_path", &self.device_path)
            .field("name", &self.name)
            .field("guid", &self.guid)
            .finish_non_exhaustive()
    }
}

impl JoystickSource {
    /// Opens every joystick under `/dev/input`, in path order.
    ///
    /// # Errors
    ///
    /// - `Controller`: `/dev/input` is missing or unreadable
    /// - `ControllerNotFound`: no joystick could be opened
    pub fn scan(range: AxisRange) -> Result<Vec<Self>> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(JoymaskError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| JoymaskError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| JoymaskError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Deterministic order keeps duplicate indices stable across runs
        entries.sort_by_key(|entry| entry.path());

        let mut sources = Vec::new();
        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("event"));
            if !is_event_node {
                continue;
            }

            match evdev::Device::open(&path) {
                Ok(device) if is_joystick(&device) => {
                    let source = Self::from_device(device, path.to_string_lossy().to_string(), range);
                    info!(
                        "Found joystick '{}' at {} (GUID {})",
                        source.name, source.device_path, source.guid
                    );
                    sources.push(source);
                }
                Ok(_) => debug!("Skipping non-joystick input device {}", path.display()),
                Err(e) => debug!("Could not open {}: {}", path.display(), e),
            }
        }

        if sources.is_empty() {
            return Err(JoymaskError::ControllerNotFound);
        }
        Ok(sources)
    }

    fn from_device(device: evdev::Device, device_path: String, range: AxisRange) -> Self {
        let id = device.input_id();
        let guid = guid_from_ids(id.bus_type().0, id.vendor(), id.product(), id.version());
        let name = device.name().unwrap_or("Unknown Joystick").to_string();

        Self {
            device,
            device_path,
            name,
            guid,
            translator: EventTranslator::new(range),
        }
    }

    /// `/dev/input/eventX` path of this joystick.
    #[must_use]
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Waits for the next batch of events and translates it.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if reading fails (e.g. the joystick was unplugged).
    pub fn fetch_events(&mut self) -> Result<Vec<RawEvent>> {
        let translator = &mut self.translator;
        let events = self
            .device
            .fetch_events()
            .map_err(|e| JoymaskError::Controller(format!("Failed to fetch events: {}", e)))?;

        Ok(events.filter_map(|event| translator.translate(&event)).collect())
    }

    /// Forwards events tagged with `slot` until the device fails or the
    /// receiver goes away. Blocks; run it on a blocking thread.
    pub fn pump(mut self, slot: usize, tx: mpsc::Sender<(usize, RawEvent)>) {
        loop {
            let events = match self.fetch_events() {
                Ok(events) => events,
                Err(e) => {
                    warn!("Joystick '{}' stopped: {}", self.name, e);
                    return;
                }
            };

            for event in events {
                if tx.blocking_send((slot, event)).is_err() {
                    return;
                }
            }
        }
    }
}

fn is_joystick(device: &evdev::Device) -> bool {
    let Some(keys) = device.supported_keys() else {
        return false;
    };

    let has_pad_buttons = keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_TRIGGER);
    let has_stick = device
        .supported_absolute_axes()
        .is_some_and(|axes| axes.contains(AbsoluteAxisType::ABS_X));

    has_pad_buttons || (has_stick && keys.iter().next().is_some())
}
