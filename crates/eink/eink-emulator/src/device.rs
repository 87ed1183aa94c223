//! Emulated IT8951 controller
//!
//! [`EmulatedIt8951`] implements [`Transport`] and answers the same vendor
//! CDBs as the USB bridge, parsed with the driver's own wire records. It
//! keeps two framebuffers:
//!
//! - **memory**: controller image buffer, written by load-area commands;
//! - **panel**: what the glass shows, copied from memory by display-area
//!   commands, one rectangle at a time.
//!
//! Anything the real firmware would reject (bad signature, wrong buffer
//! address, off-panel rectangle, oversize transfer, mismatched data phase)
//! fails with CHECK CONDITION / ILLEGAL REQUEST and changes nothing.
//!
//! An [`EmulatorProbe`] shares the state so tests and the simulator can
//! inspect pixels, the event log and statistics, or inject faults, after the
//! transport has been moved into a display.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use eink_specs::PanelSpec;
use it8951::wire::{
    DeviceInfoRecord, DisplayAreaHeader, LoadAreaHeader, Opcode, DEVICE_INFO_LEN,
    DISPLAY_AREA_HEADER_LEN, TRANSFER_CEILING,
};
use platform::{DataPhase, Rect, RefreshMode, Transport, TransportError};

use crate::config::EmulatorConfig;
use crate::framebuffer::Framebuffer;
use crate::stats::DisplayStats;

/// Timeout a wedged controller reports.
const WEDGED_TIMEOUT_MS: u32 = 10_000;

/// One accepted command (or handle change), in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorEvent {
    /// Device-info query answered.
    Query,
    /// Pixels staged into controller memory.
    Upload {
        /// Staged rectangle.
        rect: Rect,
    },
    /// Rectangle repainted from controller memory.
    Refresh {
        /// Repainted rectangle.
        rect: Rect,
        /// Waveform.
        mode: RefreshMode,
    },
    /// Handle reopened.
    Reopen,
    /// Handle closed.
    Close,
}

/// Failure the next command reports instead of executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// No completion within the timeout.
    Timeout,
    /// The ioctl fails.
    Io,
    /// CHECK CONDITION with a medium-error sense key.
    CheckCondition,
}

impl Fault {
    fn into_error(self) -> TransportError {
        match self {
            Fault::Timeout => TransportError::Timeout {
                timeout_ms: WEDGED_TIMEOUT_MS,
            },
            Fault::Io => TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "emulated USB disconnect",
            )),
            Fault::CheckCondition => TransportError::Status {
                status: TransportError::CHECK_CONDITION,
                host_status: 0,
                driver_status: 0,
                sense_key: 0x03,
            },
        }
    }
}

#[derive(Debug)]
struct SimState {
    config: EmulatorConfig,
    memory: Framebuffer,
    panel: Framebuffer,
    events: VecDeque<EmulatorEvent>,
    stats: DisplayStats,
    open: bool,
    wedged: bool,
    fail_reopen: bool,
    faults: VecDeque<Fault>,
    frames_written: u32,
}

fn reject(reason: impl Display) -> TransportError {
    tracing::debug!(%reason, "Emulated IT8951 rejected command");
    TransportError::illegal_request()
}

impl SimState {
    fn new(config: EmulatorConfig) -> Self {
        let PanelSpec { width, height, .. } = config.panel;
        Self {
            memory: Framebuffer::new(width, height),
            panel: Framebuffer::new(width, height),
            config,
            events: VecDeque::new(),
            stats: DisplayStats::default(),
            open: true,
            wedged: false,
            fail_reopen: false,
            faults: VecDeque::new(),
            frames_written: 0,
        }
    }

    fn record(&mut self, event: EmulatorEvent) {
        if let Some(limit) = self.config.event_limit {
            if limit == 0 {
                return;
            }
            while self.events.len() >= limit {
                self.events.pop_front();
            }
        }
        self.events.push_back(event);
    }

    fn spec(&self) -> &PanelSpec {
        &self.config.panel
    }

    /// Execute one command. Returns the response and how long the waveform takes.
    fn execute(&mut self, cdb: &[u8], phase: DataPhase<'_>) -> Result<(Vec<u8>, Duration), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if self.wedged {
            return Err(TransportError::Timeout {
                timeout_ms: WEDGED_TIMEOUT_MS,
            });
        }
        if let Some(fault) = self.faults.pop_front() {
            tracing::debug!(?fault, "Emulated IT8951 injected fault");
            return Err(fault.into_error());
        }

        let opcode = Opcode::parse(cdb).map_err(reject)?;
        tracing::trace!(?opcode, len = phase.len(), "Emulated IT8951 command");
        match (opcode, phase) {
            (Opcode::QueryDeviceInfo, DataPhase::Read(DEVICE_INFO_LEN)) => {
                Ok((self.query(), Duration::ZERO))
            }
            (Opcode::LoadImageArea, DataPhase::Write(payload)) => {
                self.load(payload)?;
                Ok((Vec::new(), Duration::ZERO))
            }
            (Opcode::DisplayArea, DataPhase::Write(payload)) => {
                let pace = self.refresh(payload)?;
                Ok((Vec::new(), pace))
            }
            (opcode, phase) => Err(reject(format_args!("{opcode:?} with {phase:?}"))),
        }
    }

    fn query(&mut self) -> Vec<u8> {
        let spec = self.spec();
        let record = DeviceInfoRecord::for_panel(spec.width, spec.height, spec.buffer_addr);
        self.record(EmulatorEvent::Query);
        record.encode().to_vec()
    }

    fn check_target(&self, addr: u32, rect: Rect) -> Result<(), TransportError> {
        if addr != self.spec().buffer_addr {
            return Err(reject(format_args!("buffer address {addr:#010x}")));
        }
        if rect.is_empty() || !rect.fits_within(self.spec().width, self.spec().height) {
            return Err(reject(format_args!("rectangle {rect} off panel")));
        }
        Ok(())
    }

    fn load(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let (header, pixels) = LoadAreaHeader::split_payload(payload).map_err(reject)?;
        let rect = header.rect().map_err(reject)?;
        self.check_target(header.addr, rect)?;
        if pixels.len() != rect.area() {
            return Err(reject(format_args!(
                "{} pixel bytes for {rect}",
                pixels.len()
            )));
        }
        if pixels.len() > TRANSFER_CEILING {
            return Err(reject(format_args!(
                "{} bytes exceeds the transfer ceiling",
                pixels.len()
            )));
        }

        self.memory.blit(rect, pixels);
        self.stats.record_upload(pixels.len());
        self.record(EmulatorEvent::Upload { rect });
        Ok(())
    }

    fn refresh(&mut self, payload: &[u8]) -> Result<Duration, TransportError> {
        if payload.len() != DISPLAY_AREA_HEADER_LEN {
            return Err(reject(format_args!(
                "display-area payload of {} bytes",
                payload.len()
            )));
        }
        let header = DisplayAreaHeader::decode(payload).map_err(reject)?;
        let mode = header.refresh_mode().map_err(reject)?;
        let rect = header.rect().map_err(reject)?;
        self.check_target(header.addr, rect)?;

        self.panel.copy_rect_from(&self.memory, rect);
        let duration_ms = self.spec().refresh_ms(mode);
        self.stats.record_refresh(mode, duration_ms);
        self.record(EmulatorEvent::Refresh { rect, mode });
        tracing::trace!(%rect, %mode, duration_ms, "Emulated refresh");
        self.write_frame();

        Ok(if self.config.paced {
            Duration::from_millis(u64::from(duration_ms))
        } else {
            Duration::ZERO
        })
    }

    fn write_frame(&mut self) {
        let Some(dir) = &self.config.frame_dir else {
            return;
        };
        let path = dir.join(format!("frame_{:04}.png", self.frames_written));
        match self.panel.save_png(&path) {
            Ok(()) => {
                self.frames_written += 1;
                tracing::debug!(path = %path.display(), "Wrote simulator frame");
            }
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "Cannot write simulator frame"),
        }
    }
}

fn lock(shared: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory IT8951 reachable through [`Transport`].
#[derive(Debug)]
pub struct EmulatedIt8951 {
    shared: Arc<Mutex<SimState>>,
}

impl EmulatedIt8951 {
    /// Power up a controller with a white panel and an open handle.
    pub fn new(config: EmulatorConfig) -> Self {
        tracing::debug!(
            panel = config.panel.name,
            width = config.panel.width,
            height = config.panel.height,
            "Emulated IT8951 created"
        );
        Self {
            shared: Arc::new(Mutex::new(SimState::new(config))),
        }
    }

    /// Emulate `spec` with default options.
    pub fn with_panel(spec: PanelSpec) -> Self {
        Self::new(EmulatorConfig::new(spec))
    }

    /// Handle for inspecting and steering this controller.
    pub fn probe(&self) -> EmulatorProbe {
        EmulatorProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Transport for EmulatedIt8951 {
    fn send(&mut self, cdb: &[u8], phase: DataPhase<'_>) -> Result<Vec<u8>, TransportError> {
        let (response, pace) = lock(&self.shared).execute(cdb, phase)?;
        if !pace.is_zero() {
            std::thread::sleep(pace);
        }
        Ok(response)
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        let mut state = lock(&self.shared);
        state.open = false;
        if state.fail_reopen {
            return Err(TransportError::Open {
                path: "emulated-it8951".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "emulated controller unplugged"),
            });
        }
        state.open = true;
        state.wedged = false;
        state.record(EmulatorEvent::Reopen);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = lock(&self.shared);
        if state.open {
            state.open = false;
            state.record(EmulatorEvent::Close);
        }
    }

    fn is_open(&self) -> bool {
        lock(&self.shared).open
    }
}

/// Shared view of an [`EmulatedIt8951`].
#[derive(Debug, Clone)]
pub struct EmulatorProbe {
    shared: Arc<Mutex<SimState>>,
}

impl EmulatorProbe {
    /// Emulated panel.
    pub fn panel(&self) -> PanelSpec {
        lock(&self.shared).config.panel
    }

    /// Visible pixel, `None` off panel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        lock(&self.shared).panel.get_pixel(x, y)
    }

    /// Snapshot of the visible panel.
    pub fn framebuffer(&self) -> Framebuffer {
        lock(&self.shared).panel.clone()
    }

    /// Snapshot of controller memory (staged, possibly not yet visible).
    pub fn staged(&self) -> Framebuffer {
        lock(&self.shared).memory.clone()
    }

    /// Visible bytes of `rect`.
    pub fn region(&self, rect: Rect) -> Vec<u8> {
        lock(&self.shared).panel.region(rect)
    }

    /// Every event since creation or the last [`clear_events`](Self::clear_events).
    pub fn events(&self) -> Vec<EmulatorEvent> {
        lock(&self.shared).events.iter().copied().collect()
    }

    /// Forget logged events.
    pub fn clear_events(&self) {
        lock(&self.shared).events.clear();
    }

    /// Refreshes only, in order.
    pub fn refreshes(&self) -> Vec<(Rect, RefreshMode)> {
        lock(&self.shared)
            .events
            .iter()
            .filter_map(|event| match *event {
                EmulatorEvent::Refresh { rect, mode } => Some((rect, mode)),
                _ => None,
            })
            .collect()
    }

    /// Staged rectangles only, in order.
    pub fn uploads(&self) -> Vec<Rect> {
        lock(&self.shared)
            .events
            .iter()
            .filter_map(|event| match *event {
                EmulatorEvent::Upload { rect } => Some(rect),
                _ => None,
            })
            .collect()
    }

    /// Counters since creation.
    pub fn stats(&self) -> DisplayStats {
        lock(&self.shared).stats
    }

    /// PNG frames written so far.
    pub fn frames_written(&self) -> u32 {
        lock(&self.shared).frames_written
    }

    /// True while the handle is open.
    pub fn is_open(&self) -> bool {
        lock(&self.shared).open
    }

    /// Fail the next command with `fault`. Faults queue in order.
    pub fn inject(&self, fault: Fault) {
        lock(&self.shared).faults.push_back(fault);
    }

    /// Freeze the controller: every command times out until the handle is reopened.
    pub fn wedge(&self) {
        lock(&self.shared).wedged = true;
    }

    /// True while wedged.
    pub fn is_wedged(&self) -> bool {
        lock(&self.shared).wedged
    }

    /// Make reopening fail (device unplugged) or succeed again.
    pub fn set_fail_reopen(&self, fail: bool) {
        lock(&self.shared).fail_reopen = fail;
    }

    /// Paint the visible panel directly, bypassing the protocol (pre-reset
    /// garbage in tests).
    pub fn scribble(&self, value: u8) {
        let mut state = lock(&self.shared);
        state.panel.fill(value);
        state.memory.fill(value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::WHITE;

    fn emulator(width: u32, height: u32) -> (EmulatedIt8951, EmulatorProbe) {
        let device = EmulatedIt8951::new(EmulatorConfig::with_size(width, height));
        let probe = device.probe();
        (device, probe)
    }

    fn load(device: &mut EmulatedIt8951, rect: Rect, pixels: &[u8]) -> Result<Vec<u8>, TransportError> {
        let addr = device.probe().panel().buffer_addr;
        let payload = LoadAreaHeader::new(addr, rect).unwrap().payload(pixels);
        device.send(&Opcode::LoadImageArea.cdb(), DataPhase::Write(&payload))
    }

    fn refresh(device: &mut EmulatedIt8951, rect: Rect, mode: RefreshMode) -> Result<Vec<u8>, TransportError> {
        let addr = device.probe().panel().buffer_addr;
        let header = DisplayAreaHeader::new(addr, rect, mode).unwrap();
        device.send(&Opcode::DisplayArea.cdb(), DataPhase::Write(&header.encode()))
    }

    fn is_illegal_request(err: &TransportError) -> bool {
        matches!(
            err,
            TransportError::Status {
                sense_key: TransportError::SENSE_ILLEGAL_REQUEST,
                ..
            }
        )
    }

    #[test]
    fn test_query_reports_panel() {
        let (mut device, probe) = emulator(200, 150);
        let response = device
            .send(&Opcode::QueryDeviceInfo.cdb(), DataPhase::Read(DEVICE_INFO_LEN))
            .unwrap();
        let info = DeviceInfoRecord::decode(&response).unwrap().device_info().unwrap();
        assert_eq!((info.width, info.height), (200, 150));
        assert_eq!(info.buffer_addr, probe.panel().buffer_addr);
        assert_eq!(probe.events(), vec![EmulatorEvent::Query]);
    }

    #[test]
    fn test_upload_is_invisible_until_refresh() {
        let (mut device, probe) = emulator(20, 20);
        let rect = Rect::new(2, 2, 4, 4);
        load(&mut device, rect, &[0u8; 16]).unwrap();
        assert_eq!(probe.pixel(2, 2), Some(WHITE));
        assert_eq!(probe.staged().get_pixel(2, 2), Some(0));

        refresh(&mut device, rect, RefreshMode::FastBinary).unwrap();
        assert_eq!(probe.pixel(2, 2), Some(0));
        assert_eq!(probe.pixel(6, 6), Some(WHITE));
        assert_eq!(probe.refreshes(), vec![(rect, RefreshMode::FastBinary)]);
    }

    #[test]
    fn test_rejects_oversize_transfer() {
        let (mut device, probe) = emulator(1872, 40);
        let rect = Rect::new(0, 0, 1872, 33);
        let err = load(&mut device, rect, &vec![0u8; rect.area()]).unwrap_err();
        assert!(is_illegal_request(&err));
        assert!(probe.uploads().is_empty());
    }

    #[test]
    fn test_rejects_off_panel_and_bad_address() {
        let (mut device, probe) = emulator(10, 10);
        let err = load(&mut device, Rect::new(8, 8, 4, 4), &[0u8; 16]).unwrap_err();
        assert!(is_illegal_request(&err));

        let header = LoadAreaHeader::new(0xDEAD, Rect::new(0, 0, 1, 1)).unwrap();
        let err = device
            .send(&Opcode::LoadImageArea.cdb(), DataPhase::Write(&header.payload(&[0])))
            .unwrap_err();
        assert!(is_illegal_request(&err));
        assert!(probe.staged().is_uniform(WHITE));
    }

    #[test]
    fn test_rejects_mismatched_data_phase() {
        let (mut device, _probe) = emulator(10, 10);
        let err = device
            .send(&Opcode::QueryDeviceInfo.cdb(), DataPhase::Read(64))
            .unwrap_err();
        assert!(is_illegal_request(&err));
        let err = device.send(&Opcode::DisplayArea.cdb(), DataPhase::None).unwrap_err();
        assert!(is_illegal_request(&err));
    }

    #[test]
    fn test_injected_fault_fails_one_command() {
        let (mut device, probe) = emulator(10, 10);
        probe.inject(Fault::Timeout);
        let err = refresh(&mut device, Rect::new(0, 0, 10, 10), RefreshMode::FullInit).unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
        refresh(&mut device, Rect::new(0, 0, 10, 10), RefreshMode::FullInit).unwrap();
    }

    #[test]
    fn test_wedge_cleared_by_reopen() {
        let (mut device, probe) = emulator(10, 10);
        probe.wedge();
        assert!(refresh(&mut device, Rect::new(0, 0, 1, 1), RefreshMode::DirectUpdate).is_err());
        device.reopen().unwrap();
        assert!(!probe.is_wedged());
        refresh(&mut device, Rect::new(0, 0, 1, 1), RefreshMode::DirectUpdate).unwrap();
    }

    #[test]
    fn test_closed_handle() {
        let (mut device, probe) = emulator(10, 10);
        device.close();
        device.close();
        assert!(!probe.is_open());
        assert!(matches!(
            refresh(&mut device, Rect::new(0, 0, 1, 1), RefreshMode::DirectUpdate),
            Err(TransportError::Closed)
        ));
        assert_eq!(probe.events(), vec![EmulatorEvent::Close]);

        probe.set_fail_reopen(true);
        assert!(matches!(device.reopen(), Err(TransportError::Open { .. })));
        probe.set_fail_reopen(false);
        device.reopen().unwrap();
        assert!(device.is_open());
    }

    #[test]
    fn test_frame_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut device =
            EmulatedIt8951::new(EmulatorConfig::with_size(8, 8).frame_dir(dir.path()));
        let probe = device.probe();
        refresh(&mut device, Rect::new(0, 0, 8, 8), RefreshMode::FullInit).unwrap();
        refresh(&mut device, Rect::new(0, 0, 8, 8), RefreshMode::HighQualityGrayscale).unwrap();
        assert_eq!(probe.frames_written(), 2);
        assert!(dir.path().join("frame_0000.png").exists());
        assert!(dir.path().join("frame_0001.png").exists());
    }

    #[test]
    fn test_event_limit_drops_oldest() {
        let mut device = EmulatedIt8951::new(EmulatorConfig::with_size(8, 8).event_limit(2));
        let probe = device.probe();
        let rect = Rect::new(0, 0, 8, 8);
        refresh(&mut device, rect, RefreshMode::FullInit).unwrap();
        refresh(&mut device, rect, RefreshMode::HighQualityGrayscale).unwrap();
        refresh(&mut device, rect, RefreshMode::FastBinary).unwrap();
        assert_eq!(
            probe.refreshes(),
            vec![(rect, RefreshMode::HighQualityGrayscale), (rect, RefreshMode::FastBinary)]
        );

        let mut device = EmulatedIt8951::new(EmulatorConfig::with_size(8, 8).event_limit(0));
        let probe = device.probe();
        refresh(&mut device, rect, RefreshMode::FullInit).unwrap();
        assert!(probe.events().is_empty());
        assert_eq!(probe.stats().full_init_count, 1);
    }
}
