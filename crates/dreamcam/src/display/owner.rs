//! Display owner thread
//!
//! The panel is a slow, stateful peripheral with blocking ioctls. One OS
//! thread owns the [`DisplayDriver`] outright and executes requests in
//! arrival order; async tasks hold a cloneable [`DisplayClient`] and await a
//! one-shot reply per request. Dropping every client (or sending
//! [`DisplayClient::close`]) ends the thread and releases the device.

use std::io;
use std::thread::JoinHandle;

use platform::{DeviceInfo, DisplayDriver, DisplayError, ImageSource, Rect, RefreshMode, TransportError};
use tokio::sync::{mpsc, oneshot, watch};

type Reply<T> = oneshot::Sender<Result<T, DisplayError>>;

/// Work for the owner thread.
enum DisplayRequest {
    ShowImage {
        source: ImageSource,
        mode: RefreshMode,
        reply: Reply<()>,
    },
    Region {
        data: Vec<u8>,
        rect: Rect,
        mode: RefreshMode,
        reply: Reply<()>,
    },
    Clear {
        mode: RefreshMode,
        reply: Reply<()>,
    },
    Reset {
        reply: Reply<DeviceInfo>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Handle for submitting display work from async code.
#[derive(Clone)]
pub struct DisplayClient {
    tx: mpsc::UnboundedSender<DisplayRequest>,
    info: watch::Receiver<DeviceInfo>,
}

/// Join handle of the owner thread.
pub struct DisplayOwner {
    handle: JoinHandle<()>,
}

/// Move `driver` onto a dedicated thread and return a client for it.
pub fn spawn<D>(driver: D) -> io::Result<(DisplayClient, DisplayOwner)>
where
    D: DisplayDriver + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let (info_tx, info) = watch::channel(driver.info());
    let handle = std::thread::Builder::new()
        .name("display-owner".into())
        .spawn(move || run(driver, rx, info_tx))?;
    Ok((DisplayClient { tx, info }, DisplayOwner { handle }))
}

fn run<D: DisplayDriver>(
    mut driver: D,
    mut rx: mpsc::UnboundedReceiver<DisplayRequest>,
    info_tx: watch::Sender<DeviceInfo>,
) {
    tracing::debug!("Display owner started");
    while let Some(request) = rx.blocking_recv() {
        match request {
            DisplayRequest::ShowImage { source, mode, reply } => {
                tracing::debug!(%mode, "show_image");
                let _ = reply.send(driver.show_image(source, mode));
            }
            DisplayRequest::Region { data, rect, mode, reply } => {
                tracing::debug!(?rect, %mode, "display");
                let _ = reply.send(driver.display(&data, rect, mode));
            }
            DisplayRequest::Clear { mode, reply } => {
                tracing::debug!(%mode, "clear");
                let _ = reply.send(driver.clear(mode));
            }
            DisplayRequest::Reset { reply } => {
                let result = driver.reset();
                if let Ok(info) = &result {
                    info_tx.send_replace(*info);
                }
                let _ = reply.send(result);
            }
            DisplayRequest::Close { reply } => {
                driver.close();
                let _ = reply.send(());
                break;
            }
        }
    }
    driver.close();
    tracing::debug!("Display owner stopped");
}

fn closed() -> DisplayError {
    DisplayError::Transport(TransportError::Closed)
}

impl DisplayClient {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> DisplayRequest) -> Result<T, DisplayError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| closed())?;
        rx.await.map_err(|_| closed())?
    }

    /// Geometry as of the last successful open or reset.
    pub fn info(&self) -> DeviceInfo {
        *self.info.borrow()
    }

    /// Rectangle covering the whole panel.
    pub fn panel(&self) -> Rect {
        self.info().panel()
    }

    /// See [`DisplayDriver::show_image`].
    pub async fn show_image(&self, source: ImageSource, mode: RefreshMode) -> Result<(), DisplayError> {
        self.request(|reply| DisplayRequest::ShowImage { source, mode, reply })
            .await
    }

    /// See [`DisplayDriver::display`]. The bytes are moved to the owner thread.
    pub async fn display(&self, data: Vec<u8>, rect: Rect, mode: RefreshMode) -> Result<(), DisplayError> {
        self.request(|reply| DisplayRequest::Region { data, rect, mode, reply })
            .await
    }

    /// See [`DisplayDriver::clear`].
    pub async fn clear(&self, mode: RefreshMode) -> Result<(), DisplayError> {
        self.request(|reply| DisplayRequest::Clear { mode, reply }).await
    }

    /// See [`DisplayDriver::reset`].
    pub async fn reset(&self) -> Result<DeviceInfo, DisplayError> {
        self.request(|reply| DisplayRequest::Reset { reply }).await
    }

    /// Release the device and stop the owner thread. Later requests fail
    /// with [`TransportError::Closed`].
    pub async fn close(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(DisplayRequest::Close { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

impl DisplayOwner {
    /// Wait for the owner thread to exit.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("Display owner thread panicked");
        }
    }
}
