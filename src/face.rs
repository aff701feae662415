//! Status codes for the piggy bank's face display
//!
//! The face is a microcontroller on a serial line. It understands a single
//! ASCII digit per update.

use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;
use tokio::runtime::RuntimeFlavor;

use crate::{Error, Result};

/// Default serial device (primary UART on a Pi with Bluetooth enabled)
pub const DEFAULT_PORT: &str = "/dev/ttyS0";

/// Default baud rate
pub const DEFAULT_BAUD: u32 = 9600;

/// Delay after opening the port; the microcontroller resets on open
pub const DEFAULT_BOOT_DELAY: Duration = Duration::from_secs(2);

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Expression shown on the face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceStatus {
    /// Display off (shutdown)
    Off,
    /// Resting face, ready for a gesture
    Normal,
    /// Thinking face while an action runs
    Processing,
}

impl FaceStatus {
    /// Wire code understood by the display firmware
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Normal => 1,
            Self::Processing => 3,
        }
    }

    /// Look up a status by wire code
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Normal),
            3 => Some(Self::Processing),
            _ => None,
        }
    }

    /// Bytes written to the serial line
    #[must_use]
    pub fn to_wire(self) -> Vec<u8> {
        self.code().to_string().into_bytes()
    }
}

impl std::fmt::Display for FaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Normal => write!(f, "normal"),
            Self::Processing => write!(f, "processing"),
        }
    }
}

/// Receives status updates
///
/// Called from the sampling task, so implementations should return
/// quickly. `SerialFace` may block for its boot delay when it (re)opens
/// the port.
pub trait StatusSink {
    /// Show `status`
    ///
    /// # Errors
    ///
    /// Returns error if the display cannot be reached
    fn send(&mut self, status: FaceStatus) -> Result<()>;
}

impl<T: StatusSink + ?Sized> StatusSink for Box<T> {
    fn send(&mut self, status: FaceStatus) -> Result<()> {
        (**self).send(status)
    }
}

/// Face display on a serial port
///
/// The port is opened on first use and kept open. A failed write drops it
/// so the next update reopens the port. Opening waits out the boot delay
/// on the calling thread; on a multi-threaded runtime that thread is
/// handed off first so timers and other tasks keep running.
pub struct SerialFace {
    path: String,
    baud: u32,
    boot_delay: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialFace {
    /// Create a face on `path` at `baud`
    #[must_use]
    pub fn new(path: impl Into<String>, baud: u32) -> Self {
        Self {
            path: path.into(),
            baud,
            boot_delay: DEFAULT_BOOT_DELAY,
            port: None,
        }
    }

    /// Override the post-open delay
    #[must_use]
    pub fn with_boot_delay(mut self, boot_delay: Duration) -> Self {
        self.boot_delay = boot_delay;
        self
    }

    /// Serial device path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn ensure_port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        if self.port.is_none() {
            let port = serialport::new(&self.path, self.baud)
                .timeout(WRITE_TIMEOUT)
                .open()
                .map_err(|e| Error::Face(format!("failed to open {}: {e}", self.path)))?;

            tracing::debug!(port = %self.path, baud = self.baud, "face serial port opened");
            settle(self.boot_delay);
            self.port = Some(port);
        }

        self.port
            .as_mut()
            .ok_or_else(|| Error::Face("serial port unavailable".to_string()))
    }
}

impl StatusSink for SerialFace {
    fn send(&mut self, status: FaceStatus) -> Result<()> {
        let wire = status.to_wire();
        let port = self.ensure_port()?;

        let written = port.write_all(&wire).and_then(|()| port.flush());
        if let Err(e) = written {
            self.port = None;
            return Err(Error::Face(format!("write to {} failed: {e}", self.path)));
        }

        tracing::debug!(%status, code = status.code(), "face updated");
        Ok(())
    }
}

/// Wait for the display to boot without stalling a runtime worker
fn settle(delay: Duration) {
    if delay.is_zero() {
        return;
    }

    let multi_thread = tokio::runtime::Handle::try_current()
        .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
    if multi_thread {
        tokio::task::block_in_place(|| std::thread::sleep(delay));
    } else {
        std::thread::sleep(delay);
    }
}

/// Face that only logs, for running without the display attached
#[derive(Debug, Default)]
pub struct LogFace;

impl StatusSink for LogFace {
    fn send(&mut self, status: FaceStatus) -> Result<()> {
        tracing::info!(%status, code = status.code(), "face status");
        Ok(())
    }
}
