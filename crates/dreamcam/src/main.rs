// Application binary: public items are not a library surface.
#![allow(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dreamcam::camera::{Camera, LibcameraStill, StillFile};
use dreamcam::display::{self, Backend};
use dreamcam::input::{self, ButtonTiming, InputConfig};
use dreamcam::styles::{self, Style};
use dreamcam::transform::{CommandTransformer, Transformer, Unavailable};
use dreamcam::{AppConfig, DreamCamera};
use eink_emulator::EmulatorConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// IT8951 over USB (SG_IO)
    Usb,
    /// In-memory controller
    Sim,
}

#[derive(Debug, Parser)]
#[command(name = platform::config::APP_NAME_SHORT)]
#[command(about = "E-ink dream camera: capture, reinterpret, repaint", long_about = None)]
#[command(version = platform::config::APP_VERSION)]
struct Cli {
    /// Generic-SCSI node of the IT8951 controller
    #[arg(default_value = platform::config::DEFAULT_DEVICE_PATH)]
    device: PathBuf,

    /// Display backend
    #[arg(long, value_enum, default_value_t = BackendKind::Usb)]
    backend: BackendKind,

    /// Write every simulated refresh as a PNG here (implies --backend sim)
    #[arg(long)]
    sim_dir: Option<PathBuf>,

    /// Simulated panel size, WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size, default_value = "1872x1404")]
    sim_size: (u32, u32),

    /// Capture once and exit
    #[arg(long)]
    once: bool,

    /// GPIO line of the push button
    #[arg(long, default_value_t = 17)]
    gpio: u32,

    /// Keyboard only
    #[arg(long)]
    no_button: bool,

    /// Initial style
    #[arg(long, value_parser = styles::parse_style)]
    style: Option<&'static Style>,

    /// Where dreams are saved
    #[arg(long, default_value = "~/dreams")]
    save: PathBuf,

    /// Do not save anything
    #[arg(long)]
    no_save: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use this photo instead of the camera
    #[arg(long)]
    photo: Option<PathBuf>,

    /// Program that performs the AI transformation
    #[arg(long)]
    transform_command: Option<PathBuf>,
}

/// Events the simulated controller keeps for a long-running session.
const SIM_EVENT_LIMIT: usize = 4096;

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".into());
    }
    Ok((w, h))
}

fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path,
    }
}

impl Cli {
    fn backend(&self, config: &AppConfig) -> Backend {
        if self.backend == BackendKind::Sim || self.sim_dir.is_some() {
            let (width, height) = self.sim_size;
            let mut sim = EmulatorConfig::with_size(width, height).event_limit(SIM_EVENT_LIMIT);
            if let Some(dir) = &self.sim_dir {
                sim = sim.frame_dir(dir);
            }
            Backend::Sim(sim)
        } else {
            Backend::Usb {
                path: self.device.clone(),
                timeout_ms: config.transport_timeout_ms,
            }
        }
    }

    fn camera(&self) -> anyhow::Result<Arc<dyn Camera>> {
        Ok(match &self.photo {
            Some(path) => Arc::new(StillFile::open(path).context("cannot load --photo")?),
            None => Arc::new(LibcameraStill::default()),
        })
    }

    fn transformer(&self) -> Arc<dyn Transformer> {
        match &self.transform_command {
            Some(program) => Arc::new(CommandTransformer::new(program)),
            None => Arc::new(Unavailable),
        }
    }

    fn save_dir(&self) -> Option<PathBuf> {
        (!self.no_save).then(|| expand_home(self.save.clone()))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("{}", platform::config::banner());
    let config = AppConfig::load_or_default(cli.config.as_deref()).context("configuration")?;

    let driver = display::open(&cli.backend(&config))?;
    let (client, owner) = display::spawn(driver).context("cannot start display thread")?;

    let mut app = DreamCamera::new(client.clone(), cli.camera()?, cli.transformer(), config.clone(), cli.save_dir())?;
    if let Some(style) = cli.style {
        app = app.with_style(style);
    }

    let result = if cli.once {
        app.capture().await.map(|report| {
            tracing::info!(
                style = report.style,
                outcome = ?report.outcome,
                elapsed = ?report.elapsed,
                "Done"
            );
        })
    } else {
        let events = input::spawn_sources(InputConfig {
            gpio_pin: (!cli.no_button).then_some(cli.gpio),
            poll_interval: config.poll_interval(),
            timing: ButtonTiming::default(),
        });
        app.run(events).await
    };

    drop(app);
    client.close().await;
    drop(client);
    tokio::task::spawn_blocking(move || owner.join())
        .await
        .context("display thread join failed")?;
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1872x1404").unwrap(), (1872, 1404));
        assert_eq!(parse_size("400X300").unwrap(), (400, 300));
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("wide").is_err());
    }

    #[test]
    fn test_sim_dir_implies_sim() {
        let cli = Cli::parse_from(["dreamcam", "--sim-dir", "/tmp/frames"]);
        match cli.backend(&AppConfig::default()) {
            Backend::Sim(sim) => assert_eq!(sim.event_limit, Some(SIM_EVENT_LIMIT)),
            other => panic!("expected Sim, got {other:?}"),
        }
        let cli = Cli::parse_from(["dreamcam", "/dev/sg1"]);
        assert!(matches!(cli.backend(&AppConfig::default()), Backend::Usb { .. }));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_save() {
        let cli = Cli::parse_from(["dreamcam", "--no-save"]);
        assert!(cli.save_dir().is_none());
    }
}
