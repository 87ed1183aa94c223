//! Dream camera application
//!
//! Owns the mode state machine and the capture pipeline:
//!
//! ```text
//! capture ─▶ preview (A2) ─▶ worker + spinner ─▶ final (GC16) or text screen
//!         ─▶ save ─▶ count ─▶ every N captures: reset + redisplay last image
//! ```
//!
//! All panel work goes through the [`DisplayClient`]; nothing here blocks
//! the runtime.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use image::{DynamicImage, GrayImage};
use platform::{DisplayError, ImageSource, Rect};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::camera::Camera;
use crate::config::AppConfig;
use crate::display::DisplayClient;
use crate::gallery::Gallery;
use crate::input::InputEvent;
use crate::policy::{AutoResetPolicy, GhostingGuard, Purpose};
use crate::screens;
use crate::styles::{self, Style, STYLES};
use crate::transform::{self, TransformError, Transformer};
use crate::worker::{run_with_spinner, Spinner, WorkerError, WorkerStatus};

/// Height of the status overlay band.
const OVERLAY_HEIGHT: u32 = 160;

/// Top-level operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Take dream photos.
    Capture,
    /// Browse saved dreams by hand.
    Gallery,
    /// Auto-advance through saved dreams.
    Slideshow,
}

impl Mode {
    /// Carousel order.
    pub const ALL: [Mode; 3] = [Mode::Capture, Mode::Gallery, Mode::Slideshow];

    /// Display name.
    pub fn title(self) -> &'static str {
        match self {
            Mode::Capture => "Capture",
            Mode::Gallery => "Gallery",
            Mode::Slideshow => "Slideshow",
        }
    }

    /// One-line description for the mode carousel.
    pub fn description(self) -> &'static str {
        match self {
            Mode::Capture => "Take AI dream photos",
            Mode::Gallery => "Browse dreams manually",
            Mode::Slideshow => "Auto-play saved dreams",
        }
    }

    fn index(self) -> usize {
        match self {
            Mode::Capture => 0,
            Mode::Gallery => 1,
            Mode::Slideshow => 2,
        }
    }

    /// Following mode, wrapping around.
    pub fn next(self) -> Mode {
        Mode::ALL[(self.index() + 1) % Mode::ALL.len()]
    }

    fn shows_gallery(self) -> bool {
        matches!(self, Mode::Gallery | Mode::Slideshow)
    }
}

/// Carousel currently on screen, if any.
#[derive(Debug, Clone, Copy)]
enum Browse {
    Idle,
    Styles {
        index: usize,
        before: &'static Style,
        next_at: Instant,
    },
    Modes {
        index: usize,
        next_at: Instant,
    },
}

/// What a capture produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DreamOutcome {
    /// A transformed image is on the panel.
    Image,
    /// Generated text is on the panel.
    Text(String),
    /// The transformer failed; the preview stays up.
    Failed(String),
}

/// Summary of one capture cycle.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    /// Style used.
    pub style: &'static str,
    /// Result of the transformation.
    pub outcome: DreamOutcome,
    /// Files written to the save directory.
    pub saved: Vec<PathBuf>,
    /// Whether this capture triggered a preventive reset.
    pub auto_reset: bool,
    /// Time spent in the transformer.
    pub elapsed: Duration,
}

/// Result of the transformer, ready to display and save.
enum Dream {
    Image(Arc<DynamicImage>),
    Text(String),
}

/// The camera application.
pub struct DreamCamera {
    display: DisplayClient,
    camera: Arc<dyn Camera>,
    transformer: Arc<dyn Transformer>,
    config: AppConfig,
    style: &'static Style,
    save_dir: Option<PathBuf>,
    gallery: Gallery,
    auto_reset: AutoResetPolicy,
    last_image: Option<Arc<DynamicImage>>,
    status: watch::Sender<WorkerStatus>,
    mode: Mode,
    paused: bool,
    next_advance: Option<Instant>,
    browse: Browse,
}

impl DreamCamera {
    /// Wire the application together. Creates `save_dir` when given.
    pub fn new(
        display: DisplayClient,
        camera: Arc<dyn Camera>,
        transformer: Arc<dyn Transformer>,
        config: AppConfig,
        save_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let info = display.info();
        config.check_panel(info.width, info.height)?;
        if let Some(dir) = &save_dir {
            std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
            tracing::info!(dir = %dir.display(), "Saving dreams");
        }
        if !transformer.is_available() {
            tracing::warn!("AI not available; captures will only show the preview");
        }
        let gallery = Gallery::new(save_dir.clone(), GhostingGuard::new(config.gallery_refresh()));
        let auto_reset = AutoResetPolicy::new(config.auto_reset());
        Ok(Self {
            display,
            camera,
            transformer,
            config,
            style: styles::default_style(),
            save_dir,
            gallery,
            auto_reset,
            last_image: None,
            status: watch::Sender::new(WorkerStatus::Idle),
            mode: Mode::Capture,
            paused: false,
            next_advance: None,
            browse: Browse::Idle,
        })
    }

    /// Start with `style` selected.
    pub fn with_style(mut self, style: &'static Style) -> Self {
        self.style = style;
        self
    }

    /// Selected style.
    pub fn style(&self) -> &'static Style {
        self.style
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the slideshow is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Gallery state.
    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Last image the panel should return to after a reset.
    pub fn last_image(&self) -> Option<&Arc<DynamicImage>> {
        self.last_image.as_ref()
    }

    /// Captures counted towards the next preventive reset.
    pub fn captures(&self) -> u32 {
        self.auto_reset.captures()
    }

    /// Follow the worker status.
    pub fn status(&self) -> watch::Receiver<WorkerStatus> {
        self.status.subscribe()
    }

    /// Display client in use.
    pub fn display(&self) -> &DisplayClient {
        &self.display
    }

    // --- Pipeline ---

    /// Take a photo, dream it and show the result.
    ///
    /// A transformer failure is not an error: the preview stays on the panel
    /// and the report says [`DreamOutcome::Failed`]. Display and camera
    /// failures are.
    pub async fn capture(&mut self) -> anyhow::Result<CaptureReport> {
        let info = self.display.info();
        tracing::info!(style = self.style.name, "Capturing");

        let camera = Arc::clone(&self.camera);
        let photo = tokio::task::spawn_blocking(move || camera.capture(info.width, info.height))
            .await
            .context("capture task failed")?
            .context("capture failed")?;

        self.display
            .show_image(ImageSource::bitmap(Arc::clone(&photo)), Purpose::Preview.mode())
            .await
            .context("preview failed")?;

        self.dream_and_display(photo).await
    }

    async fn dream_and_display(&mut self, photo: Arc<DynamicImage>) -> anyhow::Result<CaptureReport> {
        let style = self.style;
        let (dream, elapsed) = self.run_transform(Arc::clone(&photo)).await;

        let (outcome, saved) = match dream {
            Ok(dream) => {
                tracing::info!(style = style.name, ?elapsed, "Dream ready");
                let outcome = match &dream {
                    Dream::Image(image) => {
                        self.display
                            .show_image(ImageSource::bitmap(Arc::clone(image)), Purpose::Final.mode())
                            .await
                            .context("final image failed")?;
                        self.last_image = Some(Arc::clone(image));
                        DreamOutcome::Image
                    }
                    Dream::Text(text) => {
                        let info = self.display.info();
                        let screen = screens::text_result(info.width, info.height, style.name, text);
                        self.show_screen(screen).await.context("text screen failed")?;
                        self.last_image = None;
                        DreamOutcome::Text(text.clone())
                    }
                };
                (outcome, self.save(style, photo, dream).await)
            }
            Err(e) => {
                tracing::warn!(style = style.name, error = %e, "Dream failed");
                (DreamOutcome::Failed(e.to_string()), Vec::new())
            }
        };

        let auto_reset = self.auto_reset.record_capture();
        if auto_reset {
            self.preventive_reset().await?;
        }

        Ok(CaptureReport {
            style: style.name,
            outcome,
            saved,
            auto_reset,
            elapsed,
        })
    }

    async fn run_transform(&self, photo: Arc<DynamicImage>) -> (Result<Dream, WorkerError<TransformError>>, Duration) {
        let style = self.style;
        let transformer = Arc::clone(&self.transformer);
        let info = self.display.info();
        let mut spinner = Spinner::top_right(
            info.width,
            self.config.spinner_size,
            self.config.spinner_margin,
            self.config.spinner_frame(),
        );

        let job = move || {
            if style.is_text() {
                transformer.describe(&photo, style).map(Dream::Text)
            } else {
                transformer.dream(&photo, style).map(|image| Dream::Image(Arc::new(image)))
            }
        };
        run_with_spinner(job, &self.status, &mut spinner, &self.display).await
    }

    async fn preventive_reset(&mut self) -> anyhow::Result<()> {
        tracing::info!(captures = self.auto_reset.captures(), "Preventive display reset");
        self.display.reset().await.context("preventive reset failed")?;
        if let Some(image) = &self.last_image {
            self.display
                .show_image(ImageSource::bitmap(Arc::clone(image)), Purpose::Final.mode())
                .await
                .context("redisplay after reset failed")?;
        }
        Ok(())
    }

    async fn save(&self, style: &'static Style, photo: Arc<DynamicImage>, dream: Dream) -> Vec<PathBuf> {
        let Some(dir) = self.save_dir.clone() else {
            return Vec::new();
        };
        let task = tokio::task::spawn_blocking(move || save_dream(&dir, &timestamp(), style.name, &photo, &dream));
        match task.await {
            Ok(Ok(saved)) => {
                for path in &saved {
                    tracing::info!(file = %path.display(), "Saved");
                }
                saved
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %format!("{e:#}"), "Could not save dream");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Save task failed");
                Vec::new()
            }
        }
    }

    // --- Screens ---

    /// Full-panel persistent screen: `FullInit` clear, then GC16.
    async fn show_screen(&self, screen: GrayImage) -> Result<(), DisplayError> {
        self.display.clear(Purpose::SessionStart.mode()).await?;
        self.display
            .display(screen.into_raw(), self.display.panel(), Purpose::Screen.mode())
            .await
    }

    async fn show_capture_screen(&self) -> Result<(), DisplayError> {
        let info = self.display.info();
        let screen = screens::text_screen(
            info.width,
            info.height,
            Mode::Capture.title(),
            Some("Press to capture"),
            Some("2x: styles | Hold: switch mode"),
        );
        self.show_screen(screen).await
    }

    async fn show_overlay(&self, text: &str) -> Result<(), DisplayError> {
        let info = self.display.info();
        let height = OVERLAY_HEIGHT.min(info.height);
        let band = screens::overlay_band(info.width, height, text);
        let rect = Rect::new(0, (info.height - height) / 2, info.width, height);
        self.display.display(band.into_raw(), rect, Purpose::Carousel.mode()).await
    }

    async fn show_carousel(&self, names: &[&str], descriptions: &[&str], index: usize, first: bool) -> Result<(), DisplayError> {
        if first {
            self.display.clear(Purpose::SessionStart.mode()).await?;
        }
        let info = self.display.info();
        let image = screens::carousel(info.width, info.height, names, descriptions, index);
        self.display
            .display(image.into_raw(), self.display.panel(), Purpose::Carousel.mode())
            .await
    }

    async fn show_style_carousel(&self, index: usize, first: bool) -> Result<(), DisplayError> {
        let names: Vec<&str> = STYLES.iter().map(|s| s.name).collect();
        let prompts: Vec<&str> = STYLES.iter().map(|s| s.prompt).collect();
        self.show_carousel(&names, &prompts, index, first).await
    }

    async fn show_mode_carousel(&self, index: usize, first: bool) -> Result<(), DisplayError> {
        let names = Mode::ALL.map(Mode::title);
        let descriptions = Mode::ALL.map(Mode::description);
        self.show_carousel(&names, &descriptions, index, first).await
    }

    // --- Mode state machine ---

    /// First screen of an interactive session.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        tracing::info!(
            width = self.display.info().width,
            height = self.display.info().height,
            style = self.style.name,
            "Dream camera ready"
        );
        self.show_capture_screen().await.context("start screen failed")?;
        Ok(())
    }

    /// Interactive loop until [`InputEvent::Quit`] or the event stream ends.
    ///
    /// Failures while handling an event are logged and the loop goes on;
    /// the panel keeps whatever the last successful refresh left on it.
    pub async fn run(&mut self, mut events: mpsc::Receiver<InputEvent>) -> anyhow::Result<()> {
        self.start().await?;
        loop {
            let event = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                () = sleep_until(self.next_deadline()) => {
                    if let Err(e) = self.on_timer().await {
                        tracing::error!(error = %format!("{e:#}"), "Timer action failed");
                    }
                    continue;
                }
            };
            match self.handle(event).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => tracing::error!(?event, error = %format!("{e:#}"), "Event failed"),
            }
        }
        tracing::info!("Quitting");
        Ok(())
    }

    fn next_deadline(&self) -> Option<Instant> {
        let carousel = match self.browse {
            Browse::Idle => None,
            Browse::Styles { next_at, .. } | Browse::Modes { next_at, .. } => Some(next_at),
        };
        let slideshow = if self.mode == Mode::Slideshow && !self.paused && !self.gallery.is_empty() {
            self.next_advance
        } else {
            None
        };
        match (carousel, slideshow) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Auto-advance whatever is due.
    pub async fn on_timer(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let carousel_period = self.config.carousel_interval();
        match self.browse {
            Browse::Styles { index, before, next_at } if now >= next_at => {
                let index = (index + 1) % STYLES.len();
                self.browse = Browse::Styles {
                    index,
                    before,
                    next_at: now + carousel_period,
                };
                self.show_style_carousel(index, false).await?;
            }
            Browse::Modes { index, next_at } if now >= next_at => {
                let index = (index + 1) % Mode::ALL.len();
                self.browse = Browse::Modes {
                    index,
                    next_at: now + carousel_period,
                };
                tracing::info!(mode = Mode::ALL[index].title(), "Mode carousel");
                self.show_mode_carousel(index, false).await?;
            }
            _ => {}
        }

        if self.mode == Mode::Slideshow && !self.paused && self.next_advance.is_some_and(|at| now >= at) {
            self.next_advance = Some(now + self.config.slideshow_interval());
            self.gallery.next(&self.display).await?;
        }
        Ok(())
    }

    /// React to one input event. Returns `false` when the application should quit.
    pub async fn handle(&mut self, event: InputEvent) -> anyhow::Result<bool> {
        let now = Instant::now();
        let carousel_period = self.config.carousel_interval();

        if event == InputEvent::Quit {
            return Ok(false);
        }

        match self.browse {
            Browse::Idle if event == InputEvent::Hold => {
                let index = self.mode.next().index();
                self.browse = Browse::Modes {
                    index,
                    next_at: now + carousel_period,
                };
                tracing::info!(mode = Mode::ALL[index].title(), "Mode carousel");
                self.show_mode_carousel(index, true).await?;
                return Ok(true);
            }
            Browse::Idle => {}
            Browse::Modes { index, .. } => {
                match event {
                    InputEvent::Click => {
                        self.browse = Browse::Idle;
                        self.switch_mode(Mode::ALL[index]).await?;
                    }
                    InputEvent::DoubleClick => {
                        self.browse = Browse::Idle;
                        tracing::info!("Mode carousel cancelled");
                        self.switch_mode(self.mode).await?;
                    }
                    _ => {}
                }
                return Ok(true);
            }
            Browse::Styles { index, before, .. } => {
                match event {
                    InputEvent::Click => {
                        self.browse = Browse::Idle;
                        self.style = &STYLES[index];
                        tracing::info!(style = self.style.name, "Style selected");
                        self.show_capture_screen().await?;
                    }
                    InputEvent::DoubleClick => {
                        self.browse = Browse::Idle;
                        self.style = before;
                        tracing::info!(style = self.style.name, "Style browse cancelled");
                        self.show_capture_screen().await?;
                    }
                    _ => {}
                }
                return Ok(true);
            }
        }

        match event {
            InputEvent::Click => match self.mode {
                Mode::Capture => {
                    let report = self.capture().await?;
                    tracing::info!(
                        style = report.style,
                        outcome = ?report.outcome,
                        saved = report.saved.len(),
                        "Capture finished"
                    );
                }
                Mode::Gallery => {
                    self.gallery.next(&self.display).await?;
                }
                Mode::Slideshow if !self.gallery.is_empty() => {
                    self.paused = !self.paused;
                    if self.paused {
                        tracing::info!("Slideshow paused");
                        self.show_overlay("Paused").await?;
                    } else {
                        tracing::info!("Slideshow resumed");
                        self.next_advance = Some(now + self.config.slideshow_interval());
                        self.gallery.show_current(&self.display).await?;
                    }
                }
                Mode::Slideshow => {}
            },
            InputEvent::DoubleClick => match self.mode {
                Mode::Capture => {
                    let index = STYLES.iter().position(|s| s.name == self.style.name).unwrap_or(0);
                    self.browse = Browse::Styles {
                        index,
                        before: self.style,
                        next_at: now + carousel_period,
                    };
                    tracing::info!("Style browse");
                    self.show_style_carousel(index, true).await?;
                }
                Mode::Gallery => {
                    self.gallery.prev(&self.display).await?;
                }
                Mode::Slideshow => {}
            },
            InputEvent::NextMode => self.switch_mode(self.mode.next()).await?,
            InputEvent::NextStyle => {
                self.style = styles::next_after(self.style);
                tracing::info!(style = self.style.name, prompt = self.style.prompt, "Style");
            }
            InputEvent::Clear => {
                self.display.clear(Purpose::SessionStart.mode()).await?;
                self.enter_capture_screen().await?;
            }
            InputEvent::Reset => {
                self.display.reset().await?;
                self.enter_capture_screen().await?;
            }
            InputEvent::Hold | InputEvent::Quit => {}
        }
        Ok(true)
    }

    async fn enter_capture_screen(&mut self) -> Result<(), DisplayError> {
        self.mode = Mode::Capture;
        self.paused = false;
        self.next_advance = None;
        self.show_capture_screen().await
    }

    /// Switch to `selected`. Gallery modes fall back to capture when no
    /// dreams are saved.
    pub async fn switch_mode(&mut self, selected: Mode) -> anyhow::Result<()> {
        let now = Instant::now();
        self.paused = false;
        self.next_advance = None;

        if selected == Mode::Capture {
            self.mode = Mode::Capture;
            tracing::info!("Capture mode");
            match &self.last_image {
                Some(image) => {
                    self.display
                        .show_image(ImageSource::bitmap(Arc::clone(image)), Purpose::Final.mode())
                        .await?
                }
                None => self.show_capture_screen().await?,
            }
            return Ok(());
        }

        if !(self.mode.shows_gallery() && !self.gallery.is_empty()) && self.gallery.load().is_empty() {
            tracing::info!("No dreams saved");
            self.enter_capture_screen().await?;
            return Ok(());
        }

        self.mode = selected;
        tracing::info!(mode = selected.title(), images = self.gallery.images().len(), "Mode");
        if selected == Mode::Slideshow {
            self.next_advance = Some(now + self.config.slideshow_interval());
        }
        self.gallery.show_current(&self.display).await?;
        Ok(())
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Local wall-clock stamp used in saved file names, UTC when the local
/// offset is unknown.
pub fn timestamp() -> String {
    let format = time::macros::format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    static UTC_FALLBACK_LOGGED: AtomicBool = AtomicBool::new(false);
    let now = local_or_utc(time::OffsetDateTime::now_local(), &UTC_FALLBACK_LOGGED);
    now.format(format).unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// `local`, or UTC on failure; the first fallback is logged through `logged`.
fn local_or_utc<E: std::fmt::Display>(local: Result<time::OffsetDateTime, E>, logged: &AtomicBool) -> time::OffsetDateTime {
    local.unwrap_or_else(|e| {
        if !logged.swap(true, Ordering::Relaxed) {
            tracing::debug!(error = %e, "Local offset unknown; file names use UTC");
        }
        time::OffsetDateTime::now_utc()
    })
}

fn save_dream(dir: &Path, stamp: &str, style: &str, photo: &DynamicImage, dream: &Dream) -> anyhow::Result<Vec<PathBuf>> {
    let original = dir.join(format!("{stamp}_original.jpg"));
    std::fs::write(&original, transform::encode_jpeg(photo)?)
        .with_context(|| format!("cannot write {}", original.display()))?;

    let result = match dream {
        Dream::Image(image) => {
            let path = dir.join(format!("{stamp}_{style}.jpg"));
            std::fs::write(&path, transform::encode_jpeg(image)?)
                .with_context(|| format!("cannot write {}", path.display()))?;
            path
        }
        Dream::Text(text) => {
            let path = dir.join(format!("{stamp}_{style}.txt"));
            std::fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))?;
            path
        }
    };
    Ok(vec![original, result])
}
