//! Dream camera
//!
//! Takes a photo, hands it to an AI transformer and repaints the result on an
//! IT8951 e-paper panel, keeping the panel responsive (preview, spinner) while
//! the transformer works.
//!
//! # Architecture
//!
//! ```text
//! input (stdin, GPIO, Ctrl-C) ──▶ app::DreamCamera ──▶ display::DisplayClient
//!                                     │                      │ mpsc + oneshot
//!                                     ├─ worker (spinner)    ▼
//!                                     ├─ gallery        display-owner thread
//!                                     └─ camera / transform      │
//!                                                         it8951::Display
//! ```
//!
//! The display driver lives on one OS thread; everything else is async and
//! talks to it through [`display::DisplayClient`].

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod camera;
pub mod config;
pub mod display;
pub mod gallery;
pub mod input;
pub mod policy;
pub mod screens;
pub mod styles;
pub mod transform;
pub mod worker;

pub use app::{CaptureReport, DreamCamera, DreamOutcome, Mode};
pub use config::{AppConfig, ConfigError};
pub use input::InputEvent;
pub use styles::{Style, StyleCategory, STYLES};
