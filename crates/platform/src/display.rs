//! Display abstraction layer

use crate::image_source::{DecodeError, ImageSource};
use crate::transport::TransportError;

/// Value of a fully white 8-bit grayscale pixel.
pub const WHITE: u8 = 0xFF;

/// Value of a fully black 8-bit grayscale pixel.
pub const BLACK: u8 = 0x00;

/// IT8951 waveform selector.
///
/// The discriminants are the values the controller firmware expects in the
/// display-area command and must not change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RefreshMode {
    /// INIT: full-panel flash cycle that purges ghosting. Slowest.
    FullInit = 0,
    /// DU: direct update, monochrome, no flash.
    DirectUpdate = 1,
    /// GC16: 16-level grayscale. Highest fidelity, used for anything meant to persist.
    #[default]
    HighQualityGrayscale = 2,
    /// A2: fast two-level update for previews and animation.
    FastBinary = 4,
}

impl RefreshMode {
    /// Every mode the controller accepts, in wire-value order.
    pub const ALL: [RefreshMode; 4] = [
        RefreshMode::FullInit,
        RefreshMode::DirectUpdate,
        RefreshMode::HighQualityGrayscale,
        RefreshMode::FastBinary,
    ];

    /// Value written into the display-area header.
    pub const fn wire_value(self) -> i32 {
        self as i32
    }

    /// Human-readable name (controller datasheet naming)
    pub fn name(&self) -> &'static str {
        match self {
            RefreshMode::FullInit => "INIT",
            RefreshMode::DirectUpdate => "DU",
            RefreshMode::HighQualityGrayscale => "GC16",
            RefreshMode::FastBinary => "A2",
        }
    }

    /// Check if this mode clears ghosting
    pub fn clears_ghosting(&self) -> bool {
        *self == RefreshMode::FullInit
    }

    /// Check if this mode accumulates ghosting
    pub fn accumulates_ghosting(&self) -> bool {
        !self.clears_ghosting()
    }
}

/// A wire value that does not name a [`RefreshMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown refresh mode {0}")]
pub struct UnknownRefreshMode(pub i32);

impl TryFrom<i32> for RefreshMode {
    type Error = UnknownRefreshMode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RefreshMode::FullInit),
            1 => Ok(RefreshMode::DirectUpdate),
            2 => Ok(RefreshMode::HighQualityGrayscale),
            4 => Ok(RefreshMode::FastBinary),
            other => Err(UnknownRefreshMode(other)),
        }
    }
}

impl core::fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Panel geometry and controller image-buffer address.
///
/// Re-derived from the controller after every open and every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Panel width in pixels.
    pub width: u32,
    /// Panel height in pixels.
    pub height: u32,
    /// Address of the image buffer in controller memory.
    pub buffer_addr: u32,
}

impl DeviceInfo {
    /// Rectangle covering the whole panel.
    pub fn panel(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Byte length of a full-panel 8-bit frame.
    pub fn frame_len(&self) -> usize {
        self.panel().area()
    }
}

/// Axis-aligned rectangle in panel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels (scan-lines).
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels (and bytes, at 8 bpp) covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the rectangle lies entirely inside a `width`×`height` panel.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }

    /// True when `(px, py)` lies inside the rectangle.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x
            && py >= self.y
            && u64::from(px) < u64::from(self.x) + u64::from(self.width)
            && u64::from(py) < u64::from(self.y) + u64::from(self.height)
    }
}

impl core::fmt::Display for Rect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// An 8-bit grayscale rectangle of pixels, row-major.
///
/// Construction enforces `data.len() == width * height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion<'a> {
    rect: Rect,
    data: &'a [u8],
}

impl<'a> PixelRegion<'a> {
    /// Pair pixel bytes with the rectangle they cover.
    ///
    /// Fails with [`DisplayError::LengthMismatch`] when the byte count does
    /// not equal the rectangle's area, and with [`DisplayError::EmptyRegion`]
    /// for a zero-sized rectangle.
    pub fn new(rect: Rect, data: &'a [u8]) -> Result<Self, DisplayError> {
        if rect.is_empty() {
            return Err(DisplayError::EmptyRegion(rect));
        }
        if data.len() != rect.area() {
            return Err(DisplayError::LengthMismatch {
                rect,
                expected: rect.area(),
                actual: data.len(),
            });
        }
        Ok(Self { rect, data })
    }

    /// The covered rectangle.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Row-major pixel bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Bytes of scan-line `row` (relative to the region's top edge).
    pub fn row(&self, row: u32) -> Option<&'a [u8]> {
        self.rows(row, 1).map(|r| r.data)
    }

    /// The `count` whole scan-lines starting at `first` (relative to the
    /// region's top edge), as a region positioned on the panel.
    ///
    /// Returns `None` when the span is empty or runs past the bottom edge.
    pub fn rows(&self, first: u32, count: u32) -> Option<PixelRegion<'a>> {
        if count == 0 || first.checked_add(count)? > self.rect.height {
            return None;
        }
        let width = self.rect.width as usize;
        let start = (first as usize).checked_mul(width)?;
        let end = start.checked_add((count as usize).checked_mul(width)?)?;
        Some(PixelRegion {
            rect: Rect::new(self.rect.x, self.rect.y.checked_add(first)?, self.rect.width, count),
            data: self.data.get(start..end)?,
        })
    }
}

/// Display errors
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    /// Pixel byte count does not match the target rectangle.
    #[error("region {rect} needs {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Target rectangle.
        rect: Rect,
        /// `width * height`.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// Zero-width or zero-height rectangle.
    #[error("region {0} is empty")]
    EmptyRegion(Rect),
    /// Rectangle extends past the panel edge.
    #[error("region {rect} exceeds the {width}x{height} panel")]
    OutOfBounds {
        /// Offending rectangle.
        rect: Rect,
        /// Panel width.
        width: u32,
        /// Panel height.
        height: u32,
    },
    /// A single scan-line is larger than one transfer may carry.
    #[error("scan-line of {width} bytes exceeds the {ceiling}-byte transfer ceiling")]
    RegionTooWide {
        /// Region width in bytes.
        width: u32,
        /// Transfer ceiling in bytes.
        ceiling: usize,
    },
    /// The controller answered with something that does not parse.
    #[error("malformed controller response: {0}")]
    MalformedResponse(String),
    /// The session is mid-reset (or a reset failed) and the handle is not usable.
    #[error("display session is recovering; call reset()")]
    NotReady,
    /// Transport fault, propagated unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Image could not be loaded or decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl DisplayError {
    /// True for errors that indicate a caller bug rather than a device fault.
    ///
    /// These are raised before any transport call is made.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::LengthMismatch { .. }
                | Self::EmptyRegion(_)
                | Self::OutOfBounds { .. }
                | Self::RegionTooWide { .. }
        )
    }
}

/// Display driver trait for e-paper panels
///
/// The façade application code talks to. Implementations own exactly one
/// device handle; callers that share a panel across threads must serialize
/// access themselves (see the display owner in the `dreamcam` crate).
pub trait DisplayDriver {
    /// Current geometry and buffer address.
    fn info(&self) -> DeviceInfo;

    /// Rectangle covering the whole panel.
    fn panel(&self) -> Rect {
        self.info().panel()
    }

    /// Stage `data` into `rect` and refresh that rectangle once with `mode`.
    ///
    /// `data.len()` must equal `rect.width * rect.height`; otherwise nothing
    /// is written and a contract-violation error is returned.
    fn display(&mut self, data: &[u8], rect: Rect, mode: RefreshMode) -> Result<(), DisplayError>;

    /// Decode, convert to 8-bit luma, resize to the panel and display full-screen.
    fn show_image(&mut self, source: ImageSource, mode: RefreshMode) -> Result<(), DisplayError> {
        let info = self.info();
        let frame = source.to_panel_gray(info.width, info.height)?;
        self.display(frame.as_raw(), info.panel(), mode)
    }

    /// Paint the whole panel white.
    fn clear(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        let info = self.info();
        let white = vec![WHITE; info.frame_len()];
        self.display(&white, info.panel(), mode)
    }

    /// Reopen the device, re-query geometry and clear with [`RefreshMode::FullInit`].
    fn reset(&mut self) -> Result<DeviceInfo, DisplayError>;

    /// Release the device handle. Calling it twice is harmless.
    fn close(&mut self);
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for Box<D> {
    fn info(&self) -> DeviceInfo {
        (**self).info()
    }

    fn display(&mut self, data: &[u8], rect: Rect, mode: RefreshMode) -> Result<(), DisplayError> {
        (**self).display(data, rect, mode)
    }

    fn show_image(&mut self, source: ImageSource, mode: RefreshMode) -> Result<(), DisplayError> {
        (**self).show_image(source, mode)
    }

    fn clear(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        (**self).clear(mode)
    }

    fn reset(&mut self) -> Result<DeviceInfo, DisplayError> {
        (**self).reset()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_mode_wire_values() {
        assert_eq!(RefreshMode::FullInit.wire_value(), 0);
        assert_eq!(RefreshMode::DirectUpdate.wire_value(), 1);
        assert_eq!(RefreshMode::HighQualityGrayscale.wire_value(), 2);
        assert_eq!(RefreshMode::FastBinary.wire_value(), 4);
    }

    #[test]
    fn test_refresh_mode_try_from() {
        for mode in RefreshMode::ALL {
            assert_eq!(RefreshMode::try_from(mode.wire_value()), Ok(mode));
        }
        assert_eq!(RefreshMode::try_from(3), Err(UnknownRefreshMode(3)));
        assert_eq!(RefreshMode::try_from(-1), Err(UnknownRefreshMode(-1)));
    }

    #[test]
    fn test_refresh_mode_ghosting() {
        assert!(RefreshMode::FullInit.clears_ghosting());
        assert!(RefreshMode::FastBinary.accumulates_ghosting());
        assert!(RefreshMode::HighQualityGrayscale.accumulates_ghosting());
    }

    #[test]
    fn test_region_rejects_length_mismatch() {
        let data = [0u8; 99];
        let err = PixelRegion::new(Rect::new(0, 0, 10, 10), &data).unwrap_err();
        assert!(matches!(
            err,
            DisplayError::LengthMismatch {
                expected: 100,
                actual: 99,
                ..
            }
        ));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_region_rejects_empty() {
        let err = PixelRegion::new(Rect::new(3, 3, 0, 10), &[]).unwrap_err();
        assert!(matches!(err, DisplayError::EmptyRegion(_)));
    }

    #[test]
    fn test_region_rows() {
        let data: Vec<u8> = (0..12).collect();
        let region = PixelRegion::new(Rect::new(0, 0, 4, 3), &data).unwrap();
        assert_eq!(region.row(0), Some(&[0, 1, 2, 3][..]));
        assert_eq!(region.row(2), Some(&[8, 9, 10, 11][..]));
        assert_eq!(region.row(3), None);
    }

    #[test]
    fn test_region_row_span_keeps_panel_position() {
        let data: Vec<u8> = (0..20).collect();
        let region = PixelRegion::new(Rect::new(7, 30, 4, 5), &data).unwrap();
        let span = region.rows(2, 2).unwrap();
        assert_eq!(span.rect(), Rect::new(7, 32, 4, 2));
        assert_eq!(span.data(), &[8, 9, 10, 11, 12, 13, 14, 15]);
        assert!(region.rows(4, 2).is_none());
        assert!(region.rows(0, 0).is_none());
    }

    #[test]
    fn test_rect_bounds() {
        let r = Rect::new(5, 5, 10, 10);
        assert!(r.fits_within(15, 15));
        assert!(!r.fits_within(14, 15));
        assert!(r.contains(5, 5));
        assert!(r.contains(14, 14));
        assert!(!r.contains(15, 14));
        assert!(!Rect::new(u32::MAX, 0, 2, 1).fits_within(u32::MAX, 1));
    }

    #[test]
    fn test_device_info_panel() {
        let info = DeviceInfo {
            width: 1872,
            height: 1404,
            buffer_addr: 0x0012_36e0,
        };
        assert_eq!(info.panel(), Rect::new(0, 0, 1872, 1404));
        assert_eq!(info.frame_len(), 1872 * 1404);
    }
}
