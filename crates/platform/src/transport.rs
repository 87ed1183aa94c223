//! Controller transport abstraction
//!
//! A transport moves exactly one command descriptor block (CDB), one status
//! and at most one data buffer per call. It knows nothing about pixels.
//! Two implementations exist in this workspace:
//!
//! | Implementation | Crate | Backing |
//! |----------------|-------|---------|
//! | `SgTransport` | `it8951` | Linux SG_IO ioctl on `/dev/sgN` |
//! | `EmulatedIt8951` | `eink-emulator` | in-memory controller model |

use std::path::PathBuf;

/// Data phase of a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPhase<'a> {
    /// Command only.
    None,
    /// Host-to-device payload.
    Write(&'a [u8]),
    /// Device-to-host response of exactly this many bytes.
    Read(usize),
}

impl DataPhase<'_> {
    /// Number of bytes moved in the data phase.
    pub fn len(&self) -> usize {
        match self {
            DataPhase::None => 0,
            DataPhase::Write(data) => data.len(),
            DataPhase::Read(len) => *len,
        }
    }

    /// True when no data moves.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Synchronous command/response channel to one controller.
///
/// Every call blocks until the device completes or the per-call timeout
/// elapses. Errors are returned as-is; retry and reset policy belong to the
/// caller.
pub trait Transport {
    /// Execute one transaction. Returns the response bytes for
    /// [`DataPhase::Read`] and an empty vector otherwise.
    fn send(&mut self, cdb: &[u8], phase: DataPhase<'_>) -> Result<Vec<u8>, TransportError>;

    /// Close the current handle (if any) and open the same device again.
    fn reopen(&mut self) -> Result<(), TransportError>;

    /// Release the handle. Idempotent.
    fn close(&mut self);

    /// True while a handle is held.
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, cdb: &[u8], phase: DataPhase<'_>) -> Result<Vec<u8>, TransportError> {
        (**self).send(cdb, phase)
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        (**self).reopen()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Transport faults
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device node could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        /// Device path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
    /// The ioctl itself failed.
    #[error("device I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The device (or the host adapter / kernel driver) reported a non-zero status.
    #[error(
        "device status {status:#04x} (host {host_status:#06x}, driver {driver_status:#06x}, sense key {sense_key:#x})"
    )]
    Status {
        /// SCSI status byte.
        status: u8,
        /// Host adapter status.
        host_status: u16,
        /// Kernel driver status.
        driver_status: u16,
        /// Sense key from fixed-format sense data, 0 when absent.
        sense_key: u8,
    },
    /// No completion within the per-call timeout.
    #[error("command timed out after {timeout_ms} ms")]
    Timeout {
        /// Timeout that elapsed.
        timeout_ms: u32,
    },
    /// The device returned fewer bytes than requested.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Requested length.
        expected: usize,
        /// Delivered length.
        actual: usize,
    },
    /// The handle was closed.
    #[error("transport is closed")]
    Closed,
}

impl TransportError {
    /// Sense key for ILLEGAL REQUEST.
    pub const SENSE_ILLEGAL_REQUEST: u8 = 0x05;

    /// SCSI CHECK CONDITION status.
    pub const CHECK_CONDITION: u8 = 0x02;

    /// Build the error a controller returns when it rejects a command.
    pub fn illegal_request() -> Self {
        Self::Status {
            status: Self::CHECK_CONDITION,
            host_status: 0,
            driver_status: 0,
            sense_key: Self::SENSE_ILLEGAL_REQUEST,
        }
    }
}
