//! # Joymask Library
//!
//! Fuse a keyboard and any number of joysticks into one logical input bitmask.
//!
//! Each physical device is wrapped in a [`controller::device::Device`] that
//! translates raw axis, hat, button and key events into logical bits through
//! its mapping table. Any logical input can be remapped interactively: a
//! capture session reinterprets the next gesture on the device as the new
//! binding for the requested bits.

pub mod config;
pub mod controller;
pub mod error;
