//! Protocol tests: the exact command sequence the façade sends.
//!
//! A recording transport stands in for the SG_IO node and answers the
//! device-info query with a canned record.
//!
//! Run with: cargo test -p it8951 --test protocol

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use it8951::wire::{
    DeviceInfoRecord, DisplayAreaHeader, LoadAreaHeader, Opcode, DEVICE_INFO_LEN,
};
use it8951::{Controller, Display, SessionState, TRANSFER_CEILING};
use platform::{
    DataPhase, DisplayDriver, DisplayError, ImageSource, Rect, RefreshMode, Transport,
    TransportError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ADDR: u32 = 0x0012_36E0;

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Query,
    Load { header: LoadAreaHeader, pixels: Vec<u8> },
    Refresh(DisplayAreaHeader),
}

/// Transport that records every command and answers queries with a fixed panel.
#[derive(Debug)]
struct RecordingTransport {
    record: DeviceInfoRecord,
    sent: Vec<Sent>,
    open: bool,
    reopens: usize,
    fail_after: Option<usize>,
    fail_reopen: bool,
}

impl RecordingTransport {
    fn panel(width: u32, height: u32) -> Self {
        Self {
            record: DeviceInfoRecord::for_panel(width, height, ADDR),
            sent: Vec::new(),
            open: true,
            reopens: 0,
            fail_after: None,
            fail_reopen: false,
        }
    }

    fn loads(&self) -> Vec<&LoadAreaHeader> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Load { header, .. } => Some(header),
                _ => None,
            })
            .collect()
    }

    fn refreshes(&self) -> Vec<&DisplayAreaHeader> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Refresh(header) => Some(header),
                _ => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, cdb: &[u8], phase: DataPhase<'_>) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if self.fail_after.is_some_and(|n| self.sent.len() >= n) {
            return Err(TransportError::Timeout { timeout_ms: 10_000 });
        }
        match (Opcode::parse(cdb).unwrap(), phase) {
            (Opcode::QueryDeviceInfo, DataPhase::Read(len)) => {
                assert_eq!(len, DEVICE_INFO_LEN);
                self.sent.push(Sent::Query);
                Ok(self.record.encode().to_vec())
            }
            (Opcode::LoadImageArea, DataPhase::Write(payload)) => {
                let (header, pixels) = LoadAreaHeader::split_payload(payload).unwrap();
                self.sent.push(Sent::Load {
                    header,
                    pixels: pixels.to_vec(),
                });
                Ok(Vec::new())
            }
            (Opcode::DisplayArea, DataPhase::Write(payload)) => {
                self.sent
                    .push(Sent::Refresh(DisplayAreaHeader::decode(payload).unwrap()));
                Ok(Vec::new())
            }
            (opcode, phase) => panic!("unexpected {opcode:?} with {phase:?}"),
        }
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        self.reopens += 1;
        if self.fail_reopen {
            self.open = false;
            return Err(TransportError::Open {
                path: "/dev/sg0".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

fn opened(width: u32, height: u32) -> Display<RecordingTransport> {
    let mut display = Display::new(RecordingTransport::panel(width, height)).unwrap();
    display.transport_mut().sent.clear();
    display
}

// ---------------------------------------------------------------------------
// Test: controller protocol
// ---------------------------------------------------------------------------

#[test]
fn test_query_device_info_parses_geometry() {
    let mut controller = Controller::new(RecordingTransport::panel(1872, 1404));
    assert_eq!(controller.info(), None);

    let info = controller.query_device_info().unwrap();
    assert_eq!((info.width, info.height, info.buffer_addr), (1872, 1404, ADDR));
    assert_eq!(controller.info(), Some(info));
}

#[test]
fn test_stage_before_query_is_not_ready() {
    let mut controller = Controller::new(RecordingTransport::panel(10, 10));
    let err = controller
        .trigger_refresh(Rect::new(0, 0, 10, 10), RefreshMode::FullInit)
        .unwrap_err();
    assert!(matches!(err, DisplayError::NotReady));
    assert!(controller.transport().sent.is_empty());
}

#[test]
fn test_zero_geometry_is_malformed() {
    let mut transport = RecordingTransport::panel(10, 10);
    transport.record.width = 0;
    let err = Controller::new(transport).query_device_info().unwrap_err();
    assert!(matches!(err, DisplayError::MalformedResponse(_)));
}

// ---------------------------------------------------------------------------
// Test: open sequence
// ---------------------------------------------------------------------------

/// Open = query, then a FullInit clear of the whole panel.
#[test]
fn test_open_queries_then_clears_full_init() {
    let display = Display::new(RecordingTransport::panel(200, 150)).unwrap();
    let sent = &display.transport().sent;
    assert_eq!(sent[0], Sent::Query);

    let refreshes = display.transport().refreshes();
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].refresh_mode().unwrap(), RefreshMode::FullInit);
    assert_eq!(refreshes[0].rect().unwrap(), Rect::new(0, 0, 200, 150));
    assert!(matches!(sent.last(), Some(Sent::Refresh(_))));
    assert_eq!(display.session(), SessionState::Live);
}

// ---------------------------------------------------------------------------
// Test: display validation and chunking
// ---------------------------------------------------------------------------

#[test]
fn test_length_mismatch_sends_nothing() {
    let mut display = opened(100, 100);
    let err = display
        .display(&[0u8; 99], Rect::new(0, 0, 10, 10), RefreshMode::HighQualityGrayscale)
        .unwrap_err();
    assert!(err.is_contract_violation());
    assert!(display.transport().sent.is_empty());
}

#[test]
fn test_out_of_bounds_sends_nothing() {
    let mut display = opened(100, 100);
    let err = display
        .display(&[0u8; 100], Rect::new(95, 0, 10, 10), RefreshMode::FastBinary)
        .unwrap_err();
    assert!(matches!(err, DisplayError::OutOfBounds { .. }));
    assert!(display.transport().sent.is_empty());
}

#[test]
fn test_small_region_single_upload_single_refresh() {
    let mut display = opened(100, 100);
    display
        .display(&[0u8; 100], Rect::new(5, 5, 10, 10), RefreshMode::FastBinary)
        .unwrap();

    let loads = display.transport().loads();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].addr, ADDR);
    assert_eq!(loads[0].rect().unwrap(), Rect::new(5, 5, 10, 10));

    let refreshes = display.transport().refreshes();
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].wait_ready, 1);
    assert_eq!(refreshes[0].refresh_mode().unwrap(), RefreshMode::FastBinary);
}

/// Full 1872×1404 frame: 32 lines per chunk, 44 chunks, refresh only at the end.
#[test]
fn test_full_panel_chunked_under_ceiling() {
    let mut display = opened(1872, 1404);
    let frame: Vec<u8> = (0..1872 * 1404).map(|i| (i % 251) as u8).collect();
    display
        .display(&frame, display.panel(), RefreshMode::HighQualityGrayscale)
        .unwrap();

    let sent = &display.transport().sent;
    assert_eq!(sent.len(), 45);
    assert!(matches!(sent.last(), Some(Sent::Refresh(_))));

    let mut reassembled = Vec::with_capacity(frame.len());
    let mut next_y = 0;
    for s in &sent[..44] {
        let Sent::Load { header, pixels } = s else {
            panic!("refresh before all chunks were staged");
        };
        assert!(pixels.len() <= TRANSFER_CEILING);
        assert_eq!(header.x, 0);
        assert_eq!(header.y, next_y);
        assert_eq!(header.width, 1872);
        next_y += header.height;
        reassembled.extend_from_slice(pixels);
    }
    assert_eq!(next_y, 1404);
    assert_eq!(reassembled, frame);
}

#[test]
fn test_region_wider_than_ceiling_rejected() {
    // A 64-byte ceiling moves one 64-pixel scan-line per write.
    let mut display =
        Display::with_transfer_ceiling(RecordingTransport::panel(64, 4), 64).unwrap();
    display.transport_mut().sent.clear();
    display
        .display(&[0u8; 128], Rect::new(0, 0, 64, 2), RefreshMode::DirectUpdate)
        .unwrap();
    assert_eq!(display.transport().loads().len(), 2);
    assert_eq!(display.transport().refreshes().len(), 1);

    // A scan-line wider than the ceiling is never split.
    let err = Display::with_transfer_ceiling(RecordingTransport::panel(16, 1), 8).unwrap_err();
    assert!(matches!(
        err,
        DisplayError::RegionTooWide {
            width: 16,
            ceiling: 8
        }
    ));
}

#[test]
fn test_show_image_resizes_to_panel() {
    let mut display = opened(40, 30);
    let bitmap = image::DynamicImage::new_luma8(400, 300);
    display
        .show_image(ImageSource::bitmap(bitmap), RefreshMode::HighQualityGrayscale)
        .unwrap();
    let loads = display.transport().loads();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].rect().unwrap(), Rect::new(0, 0, 40, 30));
}

// ---------------------------------------------------------------------------
// Test: transport faults propagate, reset recovers
// ---------------------------------------------------------------------------

#[test]
fn test_transport_fault_propagates_without_reset() {
    let mut display = opened(100, 100);
    display.transport_mut().fail_after = Some(0);
    let err = display.clear(RefreshMode::FullInit).unwrap_err();
    assert!(matches!(
        err,
        DisplayError::Transport(TransportError::Timeout { .. })
    ));
    assert_eq!(display.transport().reopens, 0);
    assert_eq!(display.session(), SessionState::Live);
}

#[test]
fn test_reset_reopens_requeries_and_clears() {
    let mut display = opened(1872, 1404);
    display.close();
    assert!(!display.transport().is_open());

    let info = display.reset().unwrap();
    assert_eq!((info.width, info.height), (1872, 1404));
    assert_eq!(display.transport().reopens, 1);

    let sent = &display.transport().sent;
    assert_eq!(sent[0], Sent::Query);
    let refreshes = display.transport().refreshes();
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].refresh_mode().unwrap(), RefreshMode::FullInit);
    assert!(display
        .transport()
        .sent
        .iter()
        .all(|s| !matches!(s, Sent::Load { pixels, .. } if pixels.iter().any(|&p| p != 0xFF))));
    assert_eq!(display.session(), SessionState::Live);
}

#[test]
fn test_failed_reset_leaves_session_recovering() {
    let mut display = opened(50, 50);
    display.transport_mut().fail_reopen = true;
    assert!(display.reset().is_err());
    assert_eq!(
        display.session(),
        SessionState::Recovering { failed_attempts: 1 }
    );

    let err = display
        .display(&[0u8; 4], Rect::new(0, 0, 2, 2), RefreshMode::FastBinary)
        .unwrap_err();
    assert!(matches!(err, DisplayError::NotReady));

    display.transport_mut().fail_reopen = false;
    display.reset().unwrap();
    assert!(display.session().is_live());
    display
        .display(&[0u8; 4], Rect::new(0, 0, 2, 2), RefreshMode::FastBinary)
        .unwrap();
}

#[test]
fn test_close_twice_is_harmless() {
    let mut display = opened(10, 10);
    display.close();
    display.close();
    let err = display.clear(RefreshMode::FullInit).unwrap_err();
    assert!(matches!(err, DisplayError::Transport(TransportError::Closed)));
}
