//! # Key Names Module
//!
//! Virtual-key codes and display names for keyboard bindings.
//!
//! Key events carry a virtual-key code, a hardware scan code and an
//! "extended" flag. The code identifies the binding; the name is what the
//! host shows next to the bound input. Extended keys share a virtual-key
//! code with their left-hand or main-block twin (right Ctrl, numpad Enter),
//! so the flag picks the name.
//!
//! ```
//! use joymask::controller::keys::{key_name, VK_CONTROL, VK_RETURN};
//!
//! assert_eq!(key_name(VK_RETURN, 0x1C, false), "Enter");
//! assert_eq!(key_name(VK_RETURN, 0x1C, true), "Numpad Enter");
//! assert_eq!(key_name(VK_CONTROL, 0x1D, true), "Right Ctrl");
//! assert_eq!(key_name(0xE8, 0, false), "Key Code 0xE8");
//! ```

pub const VK_BACK: u32 = 0x08;
pub const VK_TAB: u32 = 0x09;
pub const VK_RETURN: u32 = 0x0D;
pub const VK_SHIFT: u32 = 0x10;
pub const VK_CONTROL: u32 = 0x11;
pub const VK_MENU: u32 = 0x12;
pub const VK_PAUSE: u32 = 0x13;
pub const VK_CAPITAL: u32 = 0x14;
/// Cancels a keyboard capture without changing any binding.
pub const VK_ESCAPE: u32 = 0x1B;
pub const VK_SPACE: u32 = 0x20;
pub const VK_PRIOR: u32 = 0x21;
pub const VK_NEXT: u32 = 0x22;
pub const VK_END: u32 = 0x23;
pub const VK_HOME: u32 = 0x24;
pub const VK_LEFT: u32 = 0x25;
pub const VK_UP: u32 = 0x26;
pub const VK_RIGHT: u32 = 0x27;
pub const VK_DOWN: u32 = 0x28;
pub const VK_INSERT: u32 = 0x2D;
pub const VK_DELETE: u32 = 0x2E;
pub const VK_NUMPAD0: u32 = 0x60;
pub const VK_MULTIPLY: u32 = 0x6A;
pub const VK_ADD: u32 = 0x6B;
pub const VK_SUBTRACT: u32 = 0x6D;
pub const VK_DECIMAL: u32 = 0x6E;
pub const VK_DIVIDE: u32 = 0x6F;
pub const VK_F1: u32 = 0x70;
pub const VK_F24: u32 = 0x87;
pub const VK_NUMLOCK: u32 = 0x90;
pub const VK_SCROLL: u32 = 0x91;
pub const VK_LSHIFT: u32 = 0xA0;
pub const VK_RSHIFT: u32 = 0xA1;
pub const VK_LCONTROL: u32 = 0xA2;
pub const VK_RCONTROL: u32 = 0xA3;
pub const VK_LMENU: u32 = 0xA4;
pub const VK_RMENU: u32 = 0xA5;
pub const VK_OEM_1: u32 = 0xBA;
pub const VK_OEM_PLUS: u32 = 0xBB;
pub const VK_OEM_COMMA: u32 = 0xBC;
pub const VK_OEM_MINUS: u32 = 0xBD;
pub const VK_OEM_PERIOD: u32 = 0xBE;
pub const VK_OEM_2: u32 = 0xBF;
pub const VK_OEM_3: u32 = 0xC0;
pub const VK_OEM_4: u32 = 0xDB;
pub const VK_OEM_5: u32 = 0xDC;
pub const VK_OEM_6: u32 = 0xDD;
pub const VK_OEM_7: u32 = 0xDE;

/// Display name for a key.
///
/// Unknown codes fall back to `Key Code 0xNN`. The scan code is not
/// consulted for naming; it is accepted so callers can pass the full event.
#[must_use]
pub fn key_name(code: u32, _scan_code: u32, extended: bool) -> String {
    if let Some(name) = fixed_name(code, extended) {
        return name.to_string();
    }

    match code {
        // Digits and letters name themselves
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(code)
            .map(String::from)
            .unwrap_or_else(|| fallback_name(code)),
        VK_NUMPAD0..=0x69 => format!("Numpad {}", code - VK_NUMPAD0),
        VK_F1..=VK_F24 => format!("F{}", code - VK_F1 + 1),
        _ => fallback_name(code),
    }
}

fn fallback_name(code: u32) -> String {
    format!("Key Code 0x{:02X}", code)
}

fn fixed_name(code: u32, extended: bool) -> Option<&'static str> {
    let name = match (code, extended) {
        (VK_RETURN, true) => "Numpad Enter",
        (VK_RETURN, false) => "Enter",
        (VK_CONTROL, true) | (VK_RCONTROL, _) => "Right Ctrl",
        (VK_CONTROL, false) | (VK_LCONTROL, _) => "Ctrl",
        (VK_MENU, true) | (VK_RMENU, _) => "Right Alt",
        (VK_MENU, false) | (VK_LMENU, _) => "Alt",
        (VK_SHIFT, _) | (VK_LSHIFT, _) => "Shift",
        (VK_RSHIFT, _) => "Right Shift",
        (VK_BACK, _) => "Backspace",
        (VK_TAB, _) => "Tab",
        (VK_PAUSE, _) => "Pause",
        (VK_CAPITAL, _) => "Caps Lock",
        (VK_ESCAPE, _) => "Esc",
        (VK_SPACE, _) => "Space",
        (VK_PRIOR, _) => "Page Up",
        (VK_NEXT, _) => "Page Down",
        (VK_END, _) => "End",
        (VK_HOME, _) => "Home",
        (VK_LEFT, _) => "Left",
        (VK_UP, _) => "Up",
        (VK_RIGHT, _) => "Right",
        (VK_DOWN, _) => "Down",
        (VK_INSERT, _) => "Insert",
        (VK_DELETE, _) => "Delete",
        (VK_MULTIPLY, _) => "Numpad *",
        (VK_ADD, _) => "Numpad +",
        (VK_SUBTRACT, _) => "Numpad -",
        (VK_DECIMAL, _) => "Numpad .",
        (VK_DIVIDE, _) => "Numpad /",
        (VK_NUMLOCK, _) => "Num Lock",
        (VK_SCROLL, _) => "Scroll Lock",
        (VK_OEM_1, _) => ";",
        (VK_OEM_PLUS, _) => "=",
        (VK_OEM_COMMA, _) => ",",
        (VK_OEM_MINUS, _) => "-",
        (VK_OEM_PERIOD, _) => ".",
        (VK_OEM_2, _) => "/",
        (VK_OEM_3, _) => "`",
        (VK_OEM_4, _) => "[",
        (VK_OEM_5, _) => "\\",
        (VK_OEM_6, _) => "]",
        (VK_OEM_7, _) => "'",
        _ => return None,
    };
    Some(name)
}
