//! # Device Identity Module
//!
//! Disambiguates physically identical joysticks.
//!
//! Two controllers of the same model report the same hardware GUID. The
//! [`GuidRegistry`] keeps a 32-bit occupancy mask per GUID and hands each live
//! device the lowest free index, so bindings can be told apart by
//! `(guid, index)`.
//!
//! The registry is owned by the application and shared with every joystick
//! [`Device`](super::device::Device) through a [`SharedRegistry`] handle. A
//! device holds its slot as a [`DeviceIdentity`], which releases the index
//! when dropped.
//!
//! ## Usage
//!
//! ```
//! use joymask::controller::identity::{DeviceIdentity, Guid, GuidRegistry};
//!
//! let registry = GuidRegistry::shared();
//! let guid = Guid::new([7; 16]);
//!
//! let first = DeviceIdentity::acquire(&registry, guid)?;
//! let second = DeviceIdentity::acquire(&registry, guid)?;
//! assert_eq!((first.index(), second.index()), (0, 1));
//! assert!(!first.is_only_such_device());
//!
//! drop(second);
//! assert!(first.is_only_such_device());
//! # Ok::<(), joymask::error::JoymaskError>(())
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{JoymaskError, Result};

/// Number of duplicate indices available per GUID.
pub const MAX_DUPLICATES: u8 = 32;

/// Opaque 16-byte hardware identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    /// All-zero GUID, used by the keyboard.
    pub const ZERO: Guid = Guid([0; 16]);

    /// Wraps raw GUID bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw GUID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// Registry handle shared between the application and its devices.
///
/// All device events are handled on one thread, so no lock is needed.
pub type SharedRegistry = Rc<RefCell<GuidRegistry>>;

/// Occupancy masks for every GUID seen so far.
///
/// Entries are created on the first device of a GUID and are never removed,
/// even once their mask drops back to zero.
#[derive(Debug, Default)]
pub struct GuidRegistry {
    occupancy: HashMap<Guid, u32>,
}

impl GuidRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry wrapped for sharing with devices.
    #[must_use]
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Claims the lowest free index for `guid`.
    ///
    /// # Errors
    ///
    /// Returns `TooManyDuplicateDevices` when all 32 indices are in use.
    pub fn assign(&mut self, guid: Guid) -> Result<u8> {
        let mask = self.occupancy.entry(guid).or_insert(0);

        let index = (0..MAX_DUPLICATES)
            .find(|i| *mask & (1u32 << i) == 0)
            .ok_or(JoymaskError::TooManyDuplicateDevices { guid })?;

        *mask |= 1u32 << index;
        debug!("Assigned index {} for GUID {} (occupancy {:08x})", index, guid, *mask);
        Ok(index)
    }

    /// Frees `index` for `guid`. Unknown GUIDs and out-of-range indices are ignored.
    pub fn release(&mut self, guid: Guid, index: u8) {
        if index >= MAX_DUPLICATES {
            return;
        }

        if let Some(mask) = self.occupancy.get_mut(&guid) {
            *mask &= !(1u32 << index);
            debug!("Released index {} for GUID {} (occupancy {:08x})", index, guid, *mask);
        }
    }

    /// Current occupancy mask for `guid` (zero if never seen).
    #[must_use]
    pub fn occupancy(&self, guid: Guid) -> u32 {
        self.occupancy.get(&guid).copied().unwrap_or(0)
    }

    /// Number of GUIDs tracked, including entries whose mask is zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    /// True if no GUID has ever been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }
}

/// A live device's claim on a `(guid, index)` slot.
///
/// Dropping the identity releases the index.
pub struct DeviceIdentity {
    registry: SharedRegistry,
    guid: Guid,
    index: u8,
}

impl DeviceIdentity {
    /// Claims the next free index for `guid` in `registry`.
    ///
    /// # Errors
    ///
    /// Returns `TooManyDuplicateDevices` when 32 devices with this GUID are live.
    pub fn acquire(registry: &SharedRegistry, guid: Guid) -> Result<Self> {
        let index = registry.borrow_mut().assign(guid)?;
        Ok(Self {
            registry: Rc::clone(registry),
            guid,
            index,
        })
    }

    /// Hardware GUID.
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Disambiguation index among live devices sharing this GUID.
    #[must_use]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// True if this is the only live device with its GUID.
    #[must_use]
    pub fn is_only_such_device(&self) -> bool {
        self.registry.borrow().occupancy(self.guid).count_ones() == 1
    }
}

impl Drop for DeviceIdentity {
    fn drop(&mut self) {
        self.registry.borrow_mut().release(self.guid, self.index);
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("guid", &self.guid)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
