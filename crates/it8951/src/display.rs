//! IT8951 display façade
//!
//! Implements [`DisplayDriver`] on top of [`Controller`]: validates regions,
//! chunks uploads under the transfer ceiling, repaints once per call and
//! owns the session recovery state.

use platform::{DeviceInfo, DisplayDriver, DisplayError, PixelRegion, Rect, RefreshMode, Transport, WHITE};

use crate::chunk::ChunkPlan;
use crate::controller::Controller;
use crate::session::SessionState;
use crate::wire::TRANSFER_CEILING;

/// One open panel.
///
/// Opening queries geometry and clears the panel with
/// [`RefreshMode::FullInit`]; [`reset`](DisplayDriver::reset) repeats both
/// on a freshly reopened handle.
#[derive(Debug)]
pub struct Display<T> {
    controller: Controller<T>,
    info: DeviceInfo,
    session: SessionState,
    transfer_ceiling: usize,
}

impl<T: Transport> Display<T> {
    /// Open a session on `transport`: query the device, then clear it.
    pub fn new(transport: T) -> Result<Self, DisplayError> {
        Self::with_transfer_ceiling(transport, TRANSFER_CEILING)
    }

    /// Like [`new`](Self::new) with a custom per-write pixel ceiling.
    pub fn with_transfer_ceiling(transport: T, transfer_ceiling: usize) -> Result<Self, DisplayError> {
        let mut controller = Controller::new(transport);
        let info = controller.query_device_info()?;
        let mut display = Self {
            controller,
            info,
            session: SessionState::new(),
            transfer_ceiling,
        };
        display.paint_white(RefreshMode::FullInit)?;
        Ok(display)
    }

    /// Current session state.
    pub fn session(&self) -> SessionState {
        self.session
    }

    /// Pixel bytes carried by one load-area write at most.
    pub fn transfer_ceiling(&self) -> usize {
        self.transfer_ceiling
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        self.controller.transport()
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        self.controller.transport_mut()
    }

    fn ensure_live(&self) -> Result<(), DisplayError> {
        if self.session.is_live() {
            Ok(())
        } else {
            Err(DisplayError::NotReady)
        }
    }

    /// Validate, stage every chunk, then repaint `rect` once.
    fn paint(&mut self, data: &[u8], rect: Rect, mode: RefreshMode) -> Result<(), DisplayError> {
        let region = PixelRegion::new(rect, data)?;
        if !rect.fits_within(self.info.width, self.info.height) {
            return Err(DisplayError::OutOfBounds {
                rect,
                width: self.info.width,
                height: self.info.height,
            });
        }
        let plan = ChunkPlan::new(region, self.transfer_ceiling)?;
        tracing::debug!(%rect, %mode, chunks = plan.chunk_count(), "display");

        for chunk in plan {
            self.controller.upload_region(chunk)?;
        }
        self.controller.trigger_refresh(rect, mode)
    }

    fn paint_white(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        let white = vec![WHITE; self.info.frame_len()];
        self.paint(&white, self.info.panel(), mode)
    }

    fn reopen_and_clear(&mut self) -> Result<DeviceInfo, DisplayError> {
        self.controller.forget_device_info();
        self.controller.transport_mut().reopen()?;
        self.info = self.controller.query_device_info()?;
        self.paint_white(RefreshMode::FullInit)?;
        Ok(self.info)
    }
}

#[cfg(target_os = "linux")]
impl Display<crate::sg::SgTransport> {
    /// Open the panel behind a generic-SCSI node such as `/dev/sg0`.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self, DisplayError> {
        Self::new(crate::sg::SgTransport::open(path)?)
    }
}

impl<T: Transport> DisplayDriver for Display<T> {
    fn info(&self) -> DeviceInfo {
        self.info
    }

    fn display(&mut self, data: &[u8], rect: Rect, mode: RefreshMode) -> Result<(), DisplayError> {
        self.ensure_live()?;
        self.paint(data, rect, mode)
    }

    fn clear(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        self.ensure_live()?;
        self.paint_white(mode)
    }

    fn reset(&mut self) -> Result<DeviceInfo, DisplayError> {
        self.session.begin_reset();
        tracing::info!(attempt = self.session.failed_attempts().saturating_add(1), "Resetting display");
        match self.reopen_and_clear() {
            Ok(info) => {
                self.session.on_reset_completed();
                tracing::info!("Display reset complete");
                Ok(info)
            }
            Err(err) => {
                self.session.on_reset_failed();
                tracing::warn!(error = %err, "Display reset failed");
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        if self.controller.transport().is_open() {
            tracing::debug!("Closing display");
        }
        self.controller.transport_mut().close();
    }
}
