//! # Controller Module
//!
//! Per-device input mapping for keyboards and joysticks.
//!
//! This module handles:
//! - Duplicate-device bookkeeping by GUID
//! - Per-device mapping tables from physical controls to logical bits
//! - Deadzone classification of analog axes
//! - Folding raw events into a 32-bit logical bitmask
//! - Interactive remapping with an owner callback
//! - Reading joysticks through evdev

pub mod calibration;
pub mod capture;
pub mod device;
pub mod hook;
pub mod identity;
pub mod keys;
pub mod mapping;
pub mod source;
