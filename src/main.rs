//! # Joymask
//!
//! Watch every connected joystick and log the combined logical bitmask.
//!
//! ```bash
//! joymask [CONFIG.toml] [--remap BIT]
//! ```
//!
//! With `--remap`, the first joystick starts in capture mode for the given
//! logical bit: move a stick, press a hat direction or a button, and the
//! control is rebound before live reporting continues.

use std::cell::RefCell;
use std::ffi::OsStr;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use joymask::config::{Config, LoggingConfig};
use joymask::controller::device::{Device, JoystickProfile, MappingOwner};
use joymask::controller::hook::WindowHandle;
use joymask::controller::identity::{Guid, GuidRegistry, SharedRegistry};
use joymask::controller::mapping::LOGICAL_BITS;
use joymask::controller::source::JoystickSource;
use joymask::error::JoymaskError;

/// Events buffered between the reader threads and the main loop
const EVENT_QUEUE_DEPTH: usize = 256;

/// Command-line options
#[derive(Debug, Default, PartialEq)]
struct Options {
    config_path: Option<String>,
    remap_bit: Option<u8>,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Options::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if arg == "--remap" {
                let value = args.next().context("--remap needs a bit number")?;
                let bit: u8 = value
                    .parse()
                    .with_context(|| format!("invalid bit number '{}'", value))?;
                if usize::from(bit) >= LOGICAL_BITS {
                    bail!("bit {} is out of bounds (must be 0-{})", bit, LOGICAL_BITS - 1);
                }
                options.remap_bit = Some(bit);
            } else if arg.starts_with("--") {
                bail!("unknown option '{}'", arg);
            } else if options.config_path.is_none() {
                options.config_path = Some(arg);
            } else {
                bail!("unexpected argument '{}'", arg);
            }
        }

        Ok(options)
    }
}

/// Logs the outcome of a `--remap` session
struct RemapReporter;

impl MappingOwner for RemapReporter {
    fn done_mapping(&mut self, device: &Device, mask: u32) {
        if mask == 0 {
            info!("Remap on '{}' cancelled", device.name());
        } else {
            info!("Remap on '{}' done for mask {:#010x}", device.name(), mask);
        }
    }
}

/// Installs the stdout subscriber and, when configured, a file writer.
///
/// `RUST_LOG` overrides the configured level. The returned guard must stay
/// alive for buffered file output to be flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match config.file.as_deref().map(Path::new) {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| OsStr::new("joymask.log"));

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Wraps one joystick, or skips it with a warning if it cannot be tracked.
fn open_device(
    name: &str,
    guid: Guid,
    registry: &SharedRegistry,
    profile: &JoystickProfile,
) -> Option<Device> {
    match Device::joystick(name, guid, registry, profile) {
        Ok(device) => Some(device),
        Err(e) => {
            warn!("Skipping joystick '{}': {}", name, e);
            None
        }
    }
}

fn combined_state(devices: &[Device]) -> u32 {
    devices.iter().fold(0, |state, device| state | device.current_state())
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::parse(std::env::args().skip(1))?;
    let config = match &options.config_path {
        Some(path) => Config::load(path).with_context(|| format!("failed to load {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);
    info!("Joymask v{} starting...", env!("CARGO_PKG_VERSION"));

    let sources = JoystickSource::scan(config.axis_range())?;
    let registry = GuidRegistry::shared();
    let profile = config.joystick_profile();
    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

    let mut devices = Vec::with_capacity(sources.len());
    for source in sources {
        let Some(device) = open_device(source.name(), source.guid(), &registry, &profile) else {
            continue;
        };
        let slot = devices.len();
        devices.push(device);

        // Readers block in the kernel; plain threads keep shutdown from waiting on them
        let tx = tx.clone();
        std::thread::Builder::new()
            .name(format!("joystick-{}", slot))
            .spawn(move || source.pump(slot, tx))?;
    }
    drop(tx);

    if devices.is_empty() {
        return Err(JoymaskError::ControllerNotFound.into());
    }

    let reporter: Rc<RefCell<dyn MappingOwner>> = Rc::new(RefCell::new(RemapReporter));
    if let (Some(bit), Some(device)) = (options.remap_bit, devices.first_mut()) {
        info!("Remapping bit {} on '{}': move a control now", bit, device.name());
        device.start_mapping(Rc::downgrade(&reporter), 1 << bit, WindowHandle::default());
    }

    info!("Watching {} joystick(s), press Ctrl+C to exit", devices.len());

    let mut state = 0u32;
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some((slot, event)) = event else {
                    warn!("All joysticks disconnected");
                    break;
                };

                if let Some(device) = devices.get_mut(slot) {
                    device.dispatch(event);
                }

                let combined = combined_state(&devices);
                if combined != state {
                    info!("Logical state {:#010x}", combined);
                    state = combined;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}
