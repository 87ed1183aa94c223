//! Application identity constants
//!
//! Naming shared by the binary and its startup banner. Reference these
//! rather than hardcoding strings.

/// The application short name (binary and log target)
pub const APP_NAME_SHORT: &str = "dreamcam";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default generic-SCSI node of the panel's USB controller
pub const DEFAULT_DEVICE_PATH: &str = "/dev/sg0";

/// Startup banner
pub const fn banner() -> &'static str {
    "=== AI Dream Camera ==="
}
