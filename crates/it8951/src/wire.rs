//! IT8951 vendor command wire format
//!
//! Every command is a 16-byte CDB starting `0xFE 0x00` with the opcode in
//! byte 6. Integer fields in payloads and responses are big-endian, except
//! the controller memory addresses, which the firmware keeps little-endian.
//!
//! | Record | Length | Layout |
//! |--------|--------|--------|
//! | [`DeviceInfoRecord`] | 112 | see field docs |
//! | [`LoadAreaHeader`] | 20 | addr (LE u32), x, y, w, h (BE i32) |
//! | [`DisplayAreaHeader`] | 28 | addr (LE u32), mode, x, y, w, h, wait (BE i32) |

use platform::{DeviceInfo, DisplayError, Rect, RefreshMode, UnknownRefreshMode};

/// Length of every vendor CDB.
pub const CDB_LEN: usize = 16;

/// Largest pixel payload one load-area command may carry.
pub const TRANSFER_CEILING: usize = 60_800;

/// Controller signature carried in the device-info query.
pub const SIGNATURE: [u8; 4] = *b"8951";

/// First two bytes of every vendor CDB.
const VENDOR_PREFIX: [u8; 2] = [0xFE, 0x00];

/// Version bytes the query CDB carries after the opcode.
const QUERY_VERSION: [u8; 4] = [0x01, 0x00, 0x02, 0x00];

/// Byte index of the opcode inside the CDB.
const OPCODE_OFFSET: usize = 6;

/// Vendor command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Read the 112-byte device-info record.
    QueryDeviceInfo = 0x80,
    /// Stage pixels into controller memory.
    LoadImageArea = 0xA2,
    /// Repaint a rectangle from controller memory.
    DisplayArea = 0x94,
}

impl Opcode {
    /// Opcode byte as it appears at CDB offset 6.
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Build the CDB for this command.
    pub fn cdb(self) -> [u8; CDB_LEN] {
        let mut cdb = [0u8; CDB_LEN];
        cdb[..2].copy_from_slice(&VENDOR_PREFIX);
        cdb[OPCODE_OFFSET] = self.byte();
        if self == Opcode::QueryDeviceInfo {
            cdb[2..6].copy_from_slice(&SIGNATURE);
            cdb[8..12].copy_from_slice(&QUERY_VERSION);
        }
        cdb
    }

    /// Identify the command a CDB carries.
    pub fn parse(cdb: &[u8]) -> Result<Self, WireError> {
        if cdb.len() != CDB_LEN {
            return Err(WireError::Length {
                record: "CDB",
                expected: CDB_LEN,
                actual: cdb.len(),
            });
        }
        if cdb[..2] != VENDOR_PREFIX {
            return Err(WireError::NotVendorCommand);
        }
        let opcode = Opcode::try_from(cdb[OPCODE_OFFSET])?;
        if opcode == Opcode::QueryDeviceInfo && cdb[2..6] != SIGNATURE {
            return Err(WireError::Signature);
        }
        Ok(opcode)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x80 => Ok(Opcode::QueryDeviceInfo),
            0xA2 => Ok(Opcode::LoadImageArea),
            0x94 => Ok(Opcode::DisplayArea),
            other => Err(WireError::UnknownOpcode(other)),
        }
    }
}

/// Malformed or unrepresentable wire data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Buffer has the wrong size for the record.
    #[error("{record} needs {expected} bytes, got {actual}")]
    Length {
        /// Record name.
        record: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// CDB does not start with the vendor prefix.
    #[error("not an IT8951 vendor command")]
    NotVendorCommand,
    /// Opcode byte is not one of [`Opcode`].
    #[error("unknown vendor opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// Device-info query without the `"8951"` signature.
    #[error("device-info query carries the wrong signature")]
    Signature,
    /// Rectangle field does not fit a signed 32-bit wire field.
    #[error("rectangle {0} does not fit signed 32-bit header fields")]
    CoordinateOverflow(Rect),
    /// Header carries a negative coordinate or extent.
    #[error("header field {field} is negative ({value})")]
    NegativeField {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: i32,
    },
    /// Device reported a zero or oversized panel.
    #[error("device reported an invalid {width}x{height} panel")]
    Geometry {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },
    /// Display-area header names an unknown waveform.
    #[error(transparent)]
    RefreshMode(#[from] UnknownRefreshMode),
}

impl From<WireError> for DisplayError {
    fn from(err: WireError) -> Self {
        DisplayError::MalformedResponse(err.to_string())
    }
}

fn check_len(record: &'static str, expected: usize, buf: &[u8]) -> Result<(), WireError> {
    if buf.len() < expected {
        return Err(WireError::Length {
            record,
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

fn be_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn be_i32(buf: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn put(buf: &mut [u8], at: usize, bytes: [u8; 4]) {
    buf[at..at + 4].copy_from_slice(&bytes);
}

fn wire_coords(rect: Rect) -> Result<[i32; 4], WireError> {
    let field = |v: u32| i32::try_from(v).map_err(|_| WireError::CoordinateOverflow(rect));
    Ok([
        field(rect.x)?,
        field(rect.y)?,
        field(rect.width)?,
        field(rect.height)?,
    ])
}

fn rect_from_wire(x: i32, y: i32, width: i32, height: i32) -> Result<Rect, WireError> {
    let field = |field: &'static str, value: i32| {
        u32::try_from(value).map_err(|_| WireError::NegativeField { field, value })
    };
    Ok(Rect::new(
        field("x", x)?,
        field("y", y)?,
        field("width", width)?,
        field("height", height)?,
    ))
}

/// Length of the device-info response.
pub const DEVICE_INFO_LEN: usize = 112;

/// Device-info response.
///
/// Bytes 76..112 are reserved: written as zero, ignored when read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceInfoRecord {
    /// Offset 0, BE.
    pub standard_cmd_no: u32,
    /// Offset 4, BE.
    pub extended_cmd_no: u32,
    /// Offset 8, BE.
    pub signature: u32,
    /// Offset 12, BE.
    pub version: u32,
    /// Panel width in pixels. Offset 16, BE.
    pub width: u32,
    /// Panel height in pixels. Offset 20, BE.
    pub height: u32,
    /// Update buffer address. Offset 24, LE.
    pub update_buffer_addr: u32,
    /// Image buffer address, the target of every load and display command.
    /// Offset 28, LE.
    pub image_buffer_addr: u32,
    /// Offset 32, BE.
    pub temperature_segment: u32,
    /// Offset 36, BE.
    pub ui_mode: u32,
    /// Offsets 40..72, BE.
    pub frame_count: [u32; 8],
    /// Offset 72, BE.
    pub buffer_count: u32,
}

impl DeviceInfoRecord {
    /// Record describing a panel, as an emulated controller would report it.
    pub fn for_panel(width: u32, height: u32, image_buffer_addr: u32) -> Self {
        Self {
            signature: u32::from_be_bytes(SIGNATURE),
            width,
            height,
            image_buffer_addr,
            ..Self::default()
        }
    }

    /// Parse the 112-byte response.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != DEVICE_INFO_LEN {
            return Err(WireError::Length {
                record: "device info",
                expected: DEVICE_INFO_LEN,
                actual: buf.len(),
            });
        }
        let mut frame_count = [0u32; 8];
        for (i, slot) in frame_count.iter_mut().enumerate() {
            *slot = be_u32(buf, 40 + 4 * i);
        }
        Ok(Self {
            standard_cmd_no: be_u32(buf, 0),
            extended_cmd_no: be_u32(buf, 4),
            signature: be_u32(buf, 8),
            version: be_u32(buf, 12),
            width: be_u32(buf, 16),
            height: be_u32(buf, 20),
            update_buffer_addr: le_u32(buf, 24),
            image_buffer_addr: le_u32(buf, 28),
            temperature_segment: be_u32(buf, 32),
            ui_mode: be_u32(buf, 36),
            frame_count,
            buffer_count: be_u32(buf, 72),
        })
    }

    /// Serialize into the 112-byte response.
    pub fn encode(&self) -> [u8; DEVICE_INFO_LEN] {
        let mut buf = [0u8; DEVICE_INFO_LEN];
        put(&mut buf, 0, self.standard_cmd_no.to_be_bytes());
        put(&mut buf, 4, self.extended_cmd_no.to_be_bytes());
        put(&mut buf, 8, self.signature.to_be_bytes());
        put(&mut buf, 12, self.version.to_be_bytes());
        put(&mut buf, 16, self.width.to_be_bytes());
        put(&mut buf, 20, self.height.to_be_bytes());
        put(&mut buf, 24, self.update_buffer_addr.to_le_bytes());
        put(&mut buf, 28, self.image_buffer_addr.to_le_bytes());
        put(&mut buf, 32, self.temperature_segment.to_be_bytes());
        put(&mut buf, 36, self.ui_mode.to_be_bytes());
        for (i, count) in self.frame_count.iter().enumerate() {
            put(&mut buf, 40 + 4 * i, count.to_be_bytes());
        }
        put(&mut buf, 72, self.buffer_count.to_be_bytes());
        buf
    }

    /// Geometry and buffer address, rejecting panels that the signed header
    /// fields could not address.
    pub fn device_info(&self) -> Result<DeviceInfo, WireError> {
        let addressable = |v: u32| v > 0 && i32::try_from(v).is_ok();
        if !addressable(self.width) || !addressable(self.height) {
            return Err(WireError::Geometry {
                width: self.width,
                height: self.height,
            });
        }
        Ok(DeviceInfo {
            width: self.width,
            height: self.height,
            buffer_addr: self.image_buffer_addr,
        })
    }
}

/// Length of [`LoadAreaHeader`] on the wire.
pub const LOAD_AREA_HEADER_LEN: usize = 20;

/// Header of the load-image-area payload. Pixel bytes follow it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadAreaHeader {
    /// Image buffer address (LE).
    pub addr: u32,
    /// Left edge (BE).
    pub x: i32,
    /// Top edge (BE).
    pub y: i32,
    /// Width (BE).
    pub width: i32,
    /// Height (BE).
    pub height: i32,
}

impl LoadAreaHeader {
    /// Header staging `rect` at `addr`.
    pub fn new(addr: u32, rect: Rect) -> Result<Self, WireError> {
        let [x, y, width, height] = wire_coords(rect)?;
        Ok(Self {
            addr,
            x,
            y,
            width,
            height,
        })
    }

    /// Serialize.
    pub fn encode(&self) -> [u8; LOAD_AREA_HEADER_LEN] {
        let mut buf = [0u8; LOAD_AREA_HEADER_LEN];
        put(&mut buf, 0, self.addr.to_le_bytes());
        put(&mut buf, 4, self.x.to_be_bytes());
        put(&mut buf, 8, self.y.to_be_bytes());
        put(&mut buf, 12, self.width.to_be_bytes());
        put(&mut buf, 16, self.height.to_be_bytes());
        buf
    }

    /// Parse the header at the start of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        check_len("load-area header", LOAD_AREA_HEADER_LEN, buf)?;
        Ok(Self {
            addr: le_u32(buf, 0),
            x: be_i32(buf, 4),
            y: be_i32(buf, 8),
            width: be_i32(buf, 12),
            height: be_i32(buf, 16),
        })
    }

    /// The staged rectangle.
    pub fn rect(&self) -> Result<Rect, WireError> {
        rect_from_wire(self.x, self.y, self.width, self.height)
    }

    /// Header followed by pixel bytes, ready for a single write.
    pub fn payload(&self, pixels: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(LOAD_AREA_HEADER_LEN + pixels.len());
        payload.extend_from_slice(&self.encode());
        payload.extend_from_slice(pixels);
        payload
    }

    /// Split a load-area payload into header and pixel bytes.
    pub fn split_payload(payload: &[u8]) -> Result<(Self, &[u8]), WireError> {
        let header = Self::decode(payload)?;
        Ok((header, &payload[LOAD_AREA_HEADER_LEN..]))
    }
}

/// Length of [`DisplayAreaHeader`] on the wire.
pub const DISPLAY_AREA_HEADER_LEN: usize = 28;

/// Payload of the display-area command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayAreaHeader {
    /// Image buffer address (LE).
    pub addr: u32,
    /// [`RefreshMode`] wire value (BE).
    pub mode: i32,
    /// Left edge (BE).
    pub x: i32,
    /// Top edge (BE).
    pub y: i32,
    /// Width (BE).
    pub width: i32,
    /// Height (BE).
    pub height: i32,
    /// Wait until the controller is ready (BE). Always 1 from this driver.
    pub wait_ready: i32,
}

impl DisplayAreaHeader {
    /// Header repainting `rect` from `addr` with `mode`.
    pub fn new(addr: u32, rect: Rect, mode: RefreshMode) -> Result<Self, WireError> {
        let [x, y, width, height] = wire_coords(rect)?;
        Ok(Self {
            addr,
            mode: mode.wire_value(),
            x,
            y,
            width,
            height,
            wait_ready: 1,
        })
    }

    /// Serialize.
    pub fn encode(&self) -> [u8; DISPLAY_AREA_HEADER_LEN] {
        let mut buf = [0u8; DISPLAY_AREA_HEADER_LEN];
        put(&mut buf, 0, self.addr.to_le_bytes());
        put(&mut buf, 4, self.mode.to_be_bytes());
        put(&mut buf, 8, self.x.to_be_bytes());
        put(&mut buf, 12, self.y.to_be_bytes());
        put(&mut buf, 16, self.width.to_be_bytes());
        put(&mut buf, 20, self.height.to_be_bytes());
        put(&mut buf, 24, self.wait_ready.to_be_bytes());
        buf
    }

    /// Parse.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        check_len("display-area header", DISPLAY_AREA_HEADER_LEN, buf)?;
        Ok(Self {
            addr: le_u32(buf, 0),
            mode: be_i32(buf, 4),
            x: be_i32(buf, 8),
            y: be_i32(buf, 12),
            width: be_i32(buf, 16),
            height: be_i32(buf, 20),
            wait_ready: be_i32(buf, 24),
        })
    }

    /// The repainted rectangle.
    pub fn rect(&self) -> Result<Rect, WireError> {
        rect_from_wire(self.x, self.y, self.width, self.height)
    }

    /// The requested waveform.
    pub fn refresh_mode(&self) -> Result<RefreshMode, WireError> {
        Ok(RefreshMode::try_from(self.mode)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_cdb_bytes() {
        assert_eq!(
            Opcode::QueryDeviceInfo.cdb(),
            [
                0xFE, 0x00, 0x38, 0x39, 0x35, 0x31, 0x80, 0x00, 0x01, 0x00, 0x02, 0x00, 0, 0, 0, 0
            ]
        );
    }

    #[test]
    fn test_write_cdbs_carry_only_opcode() {
        let load = Opcode::LoadImageArea.cdb();
        assert_eq!(&load[..2], &[0xFE, 0x00]);
        assert_eq!(load[6], 0xA2);
        assert!(load[7..].iter().all(|&b| b == 0));
        assert_eq!(Opcode::DisplayArea.cdb()[6], 0x94);
    }

    #[test]
    fn test_parse_rejects_foreign_commands() {
        assert_eq!(Opcode::parse(&[0x12; CDB_LEN]), Err(WireError::NotVendorCommand));
        let mut cdb = Opcode::DisplayArea.cdb();
        cdb[6] = 0x77;
        assert_eq!(Opcode::parse(&cdb), Err(WireError::UnknownOpcode(0x77)));
        let mut query = Opcode::QueryDeviceInfo.cdb();
        query[2] = b'7';
        assert_eq!(Opcode::parse(&query), Err(WireError::Signature));
        assert!(matches!(
            Opcode::parse(&Opcode::DisplayArea.cdb()[..12]),
            Err(WireError::Length { .. })
        ));
    }

    #[test]
    fn test_device_info_endianness() {
        let mut buf = [0u8; DEVICE_INFO_LEN];
        buf[16..20].copy_from_slice(&[0x00, 0x00, 0x07, 0x50]); // 1872 BE
        buf[20..24].copy_from_slice(&[0x00, 0x00, 0x05, 0x7C]); // 1404 BE
        buf[28..32].copy_from_slice(&[0xE0, 0x36, 0x12, 0x00]); // 0x001236E0 LE

        let info = DeviceInfoRecord::decode(&buf).unwrap().device_info().unwrap();
        assert_eq!(info.width, 1872);
        assert_eq!(info.height, 1404);
        assert_eq!(info.buffer_addr, 0x0012_36E0);
    }

    #[test]
    fn test_device_info_rejects_short_response() {
        assert!(matches!(
            DeviceInfoRecord::decode(&[0u8; 100]),
            Err(WireError::Length {
                expected: 112,
                actual: 100,
                ..
            })
        ));
    }

    #[test]
    fn test_device_info_rejects_empty_panel() {
        let record = DeviceInfoRecord::for_panel(0, 1404, 0);
        assert_eq!(
            record.device_info(),
            Err(WireError::Geometry {
                width: 0,
                height: 1404
            })
        );
        let huge = DeviceInfoRecord::for_panel(0x8000_0000, 10, 0);
        assert!(huge.device_info().is_err());
    }

    #[test]
    fn test_load_area_header_layout() {
        let header = LoadAreaHeader::new(0x0012_36E0, Rect::new(5, 6, 7, 8)).unwrap();
        assert_eq!(
            header.encode(),
            [
                0xE0, 0x36, 0x12, 0x00, // addr LE
                0, 0, 0, 5, // x
                0, 0, 0, 6, // y
                0, 0, 0, 7, // w
                0, 0, 0, 8, // h
            ]
        );
    }

    #[test]
    fn test_display_area_header_layout() {
        let header =
            DisplayAreaHeader::new(1, Rect::new(0, 0, 200, 150), RefreshMode::FastBinary).unwrap();
        let buf = header.encode();
        assert_eq!(&buf[0..4], &[1, 0, 0, 0]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 4]);
        assert_eq!(&buf[16..20], &[0, 0, 0, 200]);
        assert_eq!(&buf[20..24], &[0, 0, 0, 150]);
        assert_eq!(&buf[24..28], &[0, 0, 0, 1]);
    }

    #[test]
    fn test_header_rejects_unaddressable_rect() {
        let rect = Rect::new(u32::MAX, 0, 1, 1);
        assert_eq!(LoadAreaHeader::new(0, rect), Err(WireError::CoordinateOverflow(rect)));
    }

    #[test]
    fn test_split_payload() {
        let header = LoadAreaHeader::new(9, Rect::new(1, 2, 2, 2)).unwrap();
        let payload = header.payload(&[10, 20, 30, 40]);
        let (decoded, pixels) = LoadAreaHeader::split_payload(&payload).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(pixels, &[10, 20, 30, 40]);
    }

    #[test]
    fn test_negative_header_field() {
        let header = LoadAreaHeader {
            addr: 0,
            x: -1,
            y: 0,
            width: 1,
            height: 1,
        };
        assert_eq!(
            header.rect(),
            Err(WireError::NegativeField {
                field: "x",
                value: -1
            })
        );
    }

    #[test]
    fn test_wire_error_maps_to_malformed_response() {
        let err: DisplayError = WireError::UnknownOpcode(0x33).into();
        assert!(matches!(err, DisplayError::MalformedResponse(ref msg) if msg.contains("0x33")));
    }
}
