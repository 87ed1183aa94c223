//! Linux generic-SCSI (SG_IO) transport
//!
//! The IT8951 USB bridge enumerates as a mass-storage device and accepts
//! vendor CDBs through the sg driver. Each [`Transport::send`] is one
//! blocking `ioctl(SG_IO)` with a 32-byte sense buffer.

use std::ffi::{c_int, c_uchar, c_uint, c_ushort, c_void};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;

use platform::{DataPhase, Transport, TransportError};

// ─── sg driver ABI (<scsi/sg.h>) ─────────────────────────────────────────────

const SG_IO: c_uint = 0x2285;
const SG_GET_VERSION_NUM: c_uint = 0x2282;
/// sg v3 interface, required for `sg_io_hdr`.
const SG_MIN_VERSION: c_int = 30_000;

const SG_DXFER_NONE: c_int = -1;
const SG_DXFER_TO_DEV: c_int = -2;
const SG_DXFER_FROM_DEV: c_int = -3;

const SG_INFO_OK_MASK: c_uint = 0x1;
const SG_INFO_OK: c_uint = 0x0;

const DID_TIME_OUT: c_ushort = 0x03;
const DRIVER_STATUS_MASK: c_ushort = 0x0f;
const DRIVER_TIMEOUT: c_ushort = 0x06;

const SENSE_LEN: c_uchar = 32;

/// `struct sg_io_hdr`
#[repr(C)]
struct SgIoHdr {
    interface_id: c_int,
    dxfer_direction: c_int,
    cmd_len: c_uchar,
    mx_sb_len: c_uchar,
    iovec_count: c_ushort,
    dxfer_len: c_uint,
    dxferp: *mut c_void,
    cmdp: *const c_uchar,
    sbp: *mut c_uchar,
    timeout: c_uint,
    flags: c_uint,
    pack_id: c_int,
    usr_ptr: *mut c_void,
    status: c_uchar,
    masked_status: c_uchar,
    msg_status: c_uchar,
    sb_len_wr: c_uchar,
    host_status: c_ushort,
    driver_status: c_ushort,
    resid: c_int,
    duration: c_uint,
    info: c_uint,
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// SG_IO transport bound to one device path.
///
/// The path is the only state that survives [`reopen`](Transport::reopen).
#[derive(Debug)]
pub struct SgTransport {
    path: PathBuf,
    file: Option<File>,
    timeout_ms: u32,
}

impl SgTransport {
    /// Per-command timeout used by [`open`](Self::open).
    pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;

    /// Open `path` read-write, non-blocking, and check it is an sg node.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TransportError> {
        Self::open_with_timeout(path, Self::DEFAULT_TIMEOUT_MS)
    }

    /// Like [`open`](Self::open) with a custom per-command timeout.
    pub fn open_with_timeout(path: impl Into<PathBuf>, timeout_ms: u32) -> Result<Self, TransportError> {
        let path = path.into();
        let file = open_device(&path)?;
        tracing::debug!(path = %path.display(), timeout_ms, "Opened SG device");
        Ok(Self {
            path,
            file: Some(file),
            timeout_ms,
        })
    }

    /// Device path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-command timeout.
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

fn open_device(path: &Path) -> Result<File, TransportError> {
    let open_error = |source| TransportError::Open {
        path: path.to_path_buf(),
        source,
    };
    // sg treats O_EXCL as exclusive access; with O_NONBLOCK a second opener gets EBUSY.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_EXCL)
        .open(path)
        .map_err(open_error)?;
    check_sg_node(&file).map_err(open_error)?;
    Ok(file)
}

fn check_sg_node(file: &File) -> io::Result<()> {
    let mut version: c_int = 0;
    // SAFETY: SG_GET_VERSION_NUM writes a single c_int through the pointer,
    // which refers to a live local for the duration of the call.
    let rc = unsafe {
        libc::ioctl(
            file.as_raw_fd(),
            SG_GET_VERSION_NUM as _,
            ptr::addr_of_mut!(version),
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    if version < SG_MIN_VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("sg driver version {version} lacks SG_IO v3"),
        ));
    }
    Ok(())
}

fn check_status(hdr: &SgIoHdr, sense: &[u8], timeout_ms: u32) -> Result<(), TransportError> {
    if hdr.info & SG_INFO_OK_MASK == SG_INFO_OK {
        return Ok(());
    }
    if hdr.host_status == DID_TIME_OUT || hdr.driver_status & DRIVER_STATUS_MASK == DRIVER_TIMEOUT {
        return Err(TransportError::Timeout { timeout_ms });
    }
    // Fixed-format sense data: key in the low nibble of byte 2.
    let sense_key = match sense.get(2) {
        Some(byte) if hdr.sb_len_wr > 2 => byte & 0x0f,
        _ => 0,
    };
    Err(TransportError::Status {
        status: hdr.status,
        host_status: hdr.host_status,
        driver_status: hdr.driver_status,
        sense_key,
    })
}

impl Transport for SgTransport {
    fn send(&mut self, cdb: &[u8], phase: DataPhase<'_>) -> Result<Vec<u8>, TransportError> {
        let file = self.file.as_ref().ok_or(TransportError::Closed)?;
        let cmd_len = c_uchar::try_from(cdb.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "CDB longer than 255 bytes"))?;

        let mut response = match phase {
            DataPhase::Read(len) => vec![0u8; len],
            DataPhase::None | DataPhase::Write(_) => Vec::new(),
        };
        let (direction, dxferp) = match phase {
            DataPhase::None => (SG_DXFER_NONE, ptr::null_mut()),
            // The kernel only reads from a TO_DEV buffer.
            DataPhase::Write(data) => (SG_DXFER_TO_DEV, data.as_ptr().cast_mut().cast::<c_void>()),
            DataPhase::Read(_) => (SG_DXFER_FROM_DEV, response.as_mut_ptr().cast::<c_void>()),
        };
        let dxfer_len = c_uint::try_from(phase.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "data phase exceeds 4 GiB"))?;

        let mut sense = [0u8; SENSE_LEN as usize];
        let mut hdr = SgIoHdr {
            interface_id: c_int::from(b'S'),
            dxfer_direction: direction,
            cmd_len,
            mx_sb_len: SENSE_LEN,
            iovec_count: 0,
            dxfer_len,
            dxferp,
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: self.timeout_ms,
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        // SAFETY: `hdr` matches `struct sg_io_hdr`. `cdb`, `sense` and the
        // data buffer (the caller's payload or `response`) outlive this
        // blocking call, and their lengths are the ones recorded in `hdr`.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), SG_IO as _, ptr::addr_of_mut!(hdr)) };
        if rc < 0 {
            return Err(TransportError::Io(io::Error::last_os_error()));
        }
        check_status(&hdr, &sense, self.timeout_ms)?;

        tracing::debug!(
            opcode = cdb.get(6).copied().unwrap_or(0),
            len = phase.len(),
            duration_ms = hdr.duration,
            "SG_IO"
        );

        if let DataPhase::Read(expected) = phase {
            let resid = usize::try_from(hdr.resid).unwrap_or(0);
            let actual = expected.saturating_sub(resid);
            if actual < expected {
                return Err(TransportError::ShortRead { expected, actual });
            }
        }
        Ok(response)
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        self.file = None;
        self.file = Some(open_device(&self.path)?);
        tracing::debug!(path = %self.path.display(), "Reopened SG device");
        Ok(())
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn header() -> SgIoHdr {
        SgIoHdr {
            interface_id: c_int::from(b'S'),
            dxfer_direction: SG_DXFER_NONE,
            cmd_len: 16,
            mx_sb_len: SENSE_LEN,
            iovec_count: 0,
            dxfer_len: 0,
            dxferp: ptr::null_mut(),
            cmdp: ptr::null(),
            sbp: ptr::null_mut(),
            timeout: 0,
            flags: 0,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        }
    }

    #[test]
    fn test_ok_status() {
        assert!(check_status(&header(), &[], 10).is_ok());
    }

    #[test]
    fn test_check_condition_reports_sense_key() {
        let mut hdr = header();
        hdr.info = 1;
        hdr.status = 0x02;
        hdr.sb_len_wr = 18;
        let mut sense = [0u8; 32];
        sense[0] = 0x70;
        sense[2] = 0x05;
        match check_status(&hdr, &sense, 10) {
            Err(TransportError::Status {
                status, sense_key, ..
            }) => {
                assert_eq!(status, 0x02);
                assert_eq!(sense_key, TransportError::SENSE_ILLEGAL_REQUEST);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_host_timeout() {
        let mut hdr = header();
        hdr.info = 1;
        hdr.host_status = DID_TIME_OUT;
        assert!(matches!(
            check_status(&hdr, &[], 10_000),
            Err(TransportError::Timeout { timeout_ms: 10_000 })
        ));
    }

    #[test]
    fn test_open_missing_node() {
        let err = SgTransport::open("/nonexistent/sg9").unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn test_regular_file_is_not_sg_node() {
        let err = SgTransport::open("/proc/self/status");
        assert!(err.is_err());
    }
}
