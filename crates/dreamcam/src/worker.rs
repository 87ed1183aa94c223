//! Background AI work with a spinner in the foreground
//!
//! The transformation runs on the blocking pool. The calling task `select!`s
//! between its completion and a spinner tick and submits one spinner frame
//! per tick, so a slow network call never stalls the display. There is no
//! cancellation: once started the job runs to completion or failure.

use std::time::{Duration, Instant};

use platform::Rect;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::display::DisplayClient;
use crate::policy::Purpose;
use crate::screens;

/// Observable state of the current job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkerStatus {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// A job is in flight.
    Running,
    /// The last job succeeded.
    Done,
    /// The last job failed with this message.
    Failed(String),
}

impl WorkerStatus {
    /// True while a job is in flight.
    pub fn is_running(&self) -> bool {
        matches!(self, WorkerStatus::Running)
    }
}

/// Failure of a job, or of the task running it.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError<E> {
    /// The job returned an error.
    #[error("{0}")]
    Job(E),
    /// The job panicked or its task was dropped.
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Spinner geometry and animation state.
#[derive(Debug, Clone)]
pub struct Spinner {
    rect: Rect,
    period: Duration,
    frame: u32,
}

impl Spinner {
    /// A `size` square `margin` pixels in from the top-right corner of a
    /// `panel_width` panel.
    pub fn top_right(panel_width: u32, size: u32, margin: u32, period: Duration) -> Self {
        let x = panel_width.saturating_sub(size.saturating_add(margin));
        Self {
            rect: Rect::new(x, margin, size, size),
            period,
            frame: 0,
        }
    }

    /// Where frames are drawn.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u32 {
        self.frame
    }

    /// Render and submit the next frame.
    pub async fn tick(&mut self, display: &DisplayClient) -> Result<(), platform::DisplayError> {
        let image = screens::spinner_frame(self.rect.width, self.frame);
        self.frame = self.frame.wrapping_add(1);
        display.display(image.into_raw(), self.rect, Purpose::Spinner.mode()).await
    }
}

/// Run `job` on the blocking pool and animate `spinner` until it finishes.
///
/// Spinner failures are logged and do not affect the job. Returns the job
/// result and the elapsed time.
pub async fn run_with_spinner<T, E, F>(
    job: F,
    status: &watch::Sender<WorkerStatus>,
    spinner: &mut Spinner,
    display: &DisplayClient,
) -> (Result<T, WorkerError<E>>, Duration)
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let started = Instant::now();
    status.send_replace(WorkerStatus::Running);

    let mut handle = tokio::task::spawn_blocking(job);
    let mut ticks = tokio::time::interval(spinner.period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let joined = loop {
        tokio::select! {
            biased;
            joined = &mut handle => break joined,
            _ = ticks.tick() => {
                if let Err(e) = spinner.tick(display).await {
                    tracing::warn!(error = %e, "Spinner frame failed");
                }
            }
        }
    };

    let result = match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(WorkerError::Job(e)),
        Err(e) => Err(WorkerError::Join(e)),
    };
    status.send_replace(match &result {
        Ok(_) => WorkerStatus::Done,
        Err(e) => WorkerStatus::Failed(e.to_string()),
    });

    let elapsed = started.elapsed();
    tracing::debug!(frames = spinner.frames(), ?elapsed, "Worker finished");
    (result, elapsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::display;
    use eink_testing::TestPanel;
    use platform::RefreshMode;

    fn spinner() -> Spinner {
        Spinner::top_right(200, 40, 10, Duration::from_millis(5))
    }

    #[test]
    fn test_spinner_geometry() {
        let s = Spinner::top_right(1872, 120, 30, Duration::from_millis(200));
        assert_eq!(s.rect(), Rect::new(1722, 30, 120, 120));
    }

    #[test]
    fn test_spinner_geometry_saturates() {
        let s = Spinner::top_right(1872, 4_000_000_000, 400_000_000, Duration::from_millis(200));
        assert_eq!(s.rect().x, 0);
        assert_eq!(s.rect().y, 400_000_000);
    }

    #[tokio::test]
    async fn test_spinner_animates_until_job_finishes() {
        let (panel, probe) = TestPanel::new(200, 100).into_parts();
        let (client, _owner) = display::spawn(panel).unwrap();
        let (status, rx) = watch::channel(WorkerStatus::Idle);
        let mut spinner = spinner();
        probe.clear_events();

        let job = || {
            std::thread::sleep(Duration::from_millis(60));
            Ok::<_, String>(42)
        };
        let (result, elapsed) = run_with_spinner(job, &status, &mut spinner, &client).await;

        assert_eq!(result.unwrap(), 42);
        assert!(elapsed >= Duration::from_millis(60));
        assert_eq!(*rx.borrow(), WorkerStatus::Done);
        assert!(spinner.frames() >= 1);

        let refreshes = probe.refreshes();
        assert!(!refreshes.is_empty());
        assert!(refreshes.iter().all(|&(rect, mode)| rect == spinner.rect() && mode == RefreshMode::FastBinary));
        // Everything outside the spinner square is untouched.
        assert_eq!(probe.pixel(0, 0), Some(platform::WHITE));
    }

    #[tokio::test]
    async fn test_job_error_is_reported() {
        let (panel, _probe) = TestPanel::new(100, 60).into_parts();
        let (client, _owner) = display::spawn(panel).unwrap();
        let (status, rx) = watch::channel(WorkerStatus::Idle);

        let (result, _) = run_with_spinner(
            || Err::<(), _>("AI not available".to_owned()),
            &status,
            &mut spinner(),
            &client,
        )
        .await;

        match result {
            Err(WorkerError::Job(message)) => assert_eq!(message, "AI not available"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*rx.borrow(), WorkerStatus::Failed("AI not available".into()));
    }

    #[tokio::test]
    async fn test_spinner_errors_do_not_stop_the_job() {
        // Spinner square hangs off a 30-pixel-wide panel, so every frame is rejected.
        let (panel, _probe) = TestPanel::new(30, 30).into_parts();
        let (client, _owner) = display::spawn(panel).unwrap();
        let (status, _rx) = watch::channel(WorkerStatus::Idle);
        let mut spinner = Spinner::top_right(200, 40, 10, Duration::from_millis(5));

        let job = || {
            std::thread::sleep(Duration::from_millis(20));
            Ok::<_, String>("text")
        };
        let (result, _) = run_with_spinner(job, &status, &mut spinner, &client).await;
        assert_eq!(result.unwrap(), "text");
    }
}
