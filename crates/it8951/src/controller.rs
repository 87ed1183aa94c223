//! IT8951 controller protocol
//!
//! Three vendor commands on top of a [`Transport`]. Staging
//! ([`upload_region`](Controller::upload_region)) and repainting
//! ([`trigger_refresh`](Controller::trigger_refresh)) are separate so the
//! display façade can stage many chunks and repaint once.

use platform::{DataPhase, DeviceInfo, DisplayError, PixelRegion, Rect, RefreshMode, Transport};

use crate::wire::{
    DEVICE_INFO_LEN, DeviceInfoRecord, DisplayAreaHeader, LoadAreaHeader, Opcode,
};

/// Protocol layer over one transport.
///
/// Geometry is held only while it is known to be current: it is dropped when
/// a reset begins and re-populated by the next
/// [`query_device_info`](Self::query_device_info).
#[derive(Debug)]
pub struct Controller<T> {
    transport: T,
    info: Option<DeviceInfo>,
}

impl<T: Transport> Controller<T> {
    /// Wrap a transport. No command is sent.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            info: None,
        }
    }

    /// Geometry from the last successful query, if still current.
    pub fn info(&self) -> Option<DeviceInfo> {
        self.info
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Discard cached geometry; staging and refresh fail until re-queried.
    pub fn forget_device_info(&mut self) {
        self.info = None;
    }

    /// Query panel geometry and the image buffer address.
    pub fn query_device_info(&mut self) -> Result<DeviceInfo, DisplayError> {
        let response = self.transport.send(
            &Opcode::QueryDeviceInfo.cdb(),
            DataPhase::Read(DEVICE_INFO_LEN),
        )?;
        let record = DeviceInfoRecord::decode(&response)?;
        let info = record.device_info()?;
        tracing::info!(
            width = info.width,
            height = info.height,
            buffer_addr = %format!("{:#010x}", info.buffer_addr),
            "IT8951 discovered"
        );
        self.info = Some(info);
        Ok(info)
    }

    /// Stage pixels into controller memory with one load-area write.
    ///
    /// Does not repaint. The caller keeps each call under the transfer
    /// ceiling.
    pub fn upload_region(&mut self, region: PixelRegion<'_>) -> Result<(), DisplayError> {
        let info = self.current_info()?;
        let header = LoadAreaHeader::new(info.buffer_addr, region.rect())?;
        let payload = header.payload(region.data());
        self.transport
            .send(&Opcode::LoadImageArea.cdb(), DataPhase::Write(&payload))?;
        Ok(())
    }

    /// Repaint `rect` from controller memory using `mode`.
    pub fn trigger_refresh(&mut self, rect: Rect, mode: RefreshMode) -> Result<(), DisplayError> {
        let info = self.current_info()?;
        let header = DisplayAreaHeader::new(info.buffer_addr, rect, mode)?;
        self.transport
            .send(&Opcode::DisplayArea.cdb(), DataPhase::Write(&header.encode()))?;
        Ok(())
    }

    fn current_info(&self) -> Result<DeviceInfo, DisplayError> {
        self.info.ok_or(DisplayError::NotReady)
    }
}
