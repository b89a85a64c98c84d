//! Command-line options shared by every lumos program.
//!
//! Host programs add their own flags by flattening [`Options`] into their
//! parser:
//!
//! ```ignore
//! #[derive(Parser)]
//! struct Args {
//!     #[arg(long)]
//!     my_algo: bool,
//!     #[command(flatten)]
//!     common: lumos::Options,
//! }
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Primary configuration file shipped with the package.
pub const DEFAULT_CONFIG_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml");
/// Resource directory shipped with the package.
pub const DEFAULT_RES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/res");
/// Log file used when `--log auto`.
pub const DEFAULT_LOG_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/logs/lumos.log");
/// Update delay applied in GUI mode when `--delay` is not given.
pub const DEFAULT_GUI_DELAY_MS: u64 = 10;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "An awesome computer vision application", long_about = None)]
pub struct Options {
    /// Configuration filename
    #[arg(long = "config", value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Path to resource directory
    #[arg(long = "res", value_name = "DIR", default_value = DEFAULT_RES_PATH)]
    pub res_path: PathBuf,

    /// Where to log messages ('auto' for the default file, 'none' to turn off logging)
    #[arg(long = "log", value_name = "FILE", default_value = "auto")]
    pub log_file: String,

    /// Show debug output
    #[arg(long)]
    pub debug: bool,

    /// Run RPC server at specified (or default) port
    #[arg(long = "rpc", value_name = "PORT")]
    pub rpc_port: Option<Option<u16>>,

    /// Display GUI interface/windows (default)
    #[arg(long, conflicts_with = "no_gui")]
    pub gui: bool,

    /// Suppress GUI interface/windows
    #[arg(long = "no_gui")]
    pub no_gui: bool,

    /// Delay between subsequent update iterations, in ms (default: 10ms for GUI mode, none otherwise)
    #[arg(long, value_name = "MS")]
    pub delay: Option<u64>,

    /// Keep replaying video
    #[arg(long = "loop_video")]
    pub loop_video: bool,

    /// Synchronize video playback to real-time
    #[arg(long = "sync_video")]
    pub sync_video: bool,

    /// Desired video frame rate (for sync)
    #[arg(long = "video_fps", default_value = "auto")]
    pub video_fps: String,

    /// Desired camera frame width
    #[arg(long = "camera_width", default_value = "auto")]
    pub camera_width: String,

    /// Desired camera frame height
    #[arg(long = "camera_height", default_value = "auto")]
    pub camera_height: String,

    /// Input image/video/directory, camera device number or network endpoint
    #[arg(default_value = "0")]
    pub input_source: String,
}

impl Options {
    pub fn gui_enabled(&self) -> bool {
        !self.no_gui
    }

    pub fn delay_duration(&self) -> Option<Duration> {
        self.delay.map(Duration::from_millis)
    }

    /// Fill in defaults that depend on other options.
    pub(crate) fn resolve_delay(&mut self) {
        if self.delay.is_none() && self.gui_enabled() {
            self.delay = Some(DEFAULT_GUI_DELAY_MS);
        }
    }

    /// `"auto"` values parse to `None`.
    pub fn video_fps_hint(&self) -> Option<f64> {
        self.video_fps.parse().ok()
    }

    pub fn camera_size_hint(&self) -> (Option<u32>, Option<u32>) {
        (self.camera_width.parse().ok(), self.camera_height.parse().ok())
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::parse_from(["lumos"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.input_source, "0");
        assert_eq!(options.log_file, "auto");
        assert!(options.gui_enabled());
        assert!(options.rpc_port.is_none());
        assert!(options.delay.is_none());
        assert_eq!(options.config_file, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(options.camera_size_hint(), (None, None));
    }

    #[test]
    fn test_rpc_port_is_optional_value() {
        let bare = Options::parse_from(["lumos", "--rpc"]);
        assert_eq!(bare.rpc_port, Some(None));

        let explicit = Options::parse_from(["lumos", "--rpc", "7000"]);
        assert_eq!(explicit.rpc_port, Some(Some(7000)));
    }

    #[test]
    fn test_gui_flags_are_exclusive() {
        assert!(Options::try_parse_from(["lumos", "--gui", "--no_gui"]).is_err());
        assert!(!Options::parse_from(["lumos", "--no_gui"]).gui_enabled());
    }

    #[test]
    fn test_gui_mode_defaults_delay() {
        let mut gui = Options::parse_from(["lumos"]);
        gui.resolve_delay();
        assert_eq!(gui.delay, Some(DEFAULT_GUI_DELAY_MS));

        let mut headless = Options::parse_from(["lumos", "--no_gui"]);
        headless.resolve_delay();
        assert_eq!(headless.delay, None);

        let mut explicit = Options::parse_from(["lumos", "--delay", "40"]);
        explicit.resolve_delay();
        assert_eq!(explicit.delay_duration(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_positional_input_and_hints() {
        let options = Options::parse_from([
            "lumos",
            "--camera_width",
            "640",
            "--video_fps",
            "29.97",
            "clip.mp4",
        ]);
        assert_eq!(options.input_source, "clip.mp4");
        assert_eq!(options.camera_size_hint(), (Some(640), None));
        assert_eq!(options.video_fps_hint(), Some(29.97));
    }
}
