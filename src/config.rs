//! Command line configuration

use crate::app::SessionOptions;
use crate::canvas::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::tui::FeedbackLevel;
use clap::Parser;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// Largest accepted backing dimension
const MAX_CANVAS_SIDE: u32 = 2048;

/// Terminal client for DraWar, the drawing-and-guessing game
#[derive(Debug, Parser)]
#[command(name = "drawar", version, about)]
pub struct Args {
    /// Server base URL
    #[arg(long, env = "DRAWAR_SERVER", default_value = "http://127.0.0.1:5003")]
    pub server: String,

    /// Authenticate automatically as this name on every connect
    #[arg(long, env = "DRAWAR_USERNAME")]
    pub username: Option<String>,

    /// Canvas backing width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub canvas_width: u32,

    /// Canvas backing height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub canvas_height: u32,

    /// Interval between draw updates while a stroke is in progress
    #[arg(long, default_value_t = 150)]
    pub throttle_ms: u64,

    /// Which events ring the terminal bell
    #[arg(long, value_enum, default_value_t = FeedbackLevel::Rich)]
    pub feedback: FeedbackLevel,

    /// Do not number rounds locally when the server omits the number
    #[arg(long)]
    pub no_round_fallback: bool,

    /// Where tracing output goes (defaults to the data directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("canvas size {width}x{height} must be between 1 and 2048 on each side")]
    CanvasSize { width: u32, height: u32 },
    #[error("throttle interval must be at least 1 ms")]
    Throttle,
    #[error("username must not be blank")]
    BlankUsername,
    #[error("no data directory available; pass --log-file")]
    NoDataDirectory,
}

/// Validated settings consumed by the binary
#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub feedback: FeedbackLevel,
    pub log_file: PathBuf,
    pub session: SessionOptions,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let side_ok = |side: u32| (1..=MAX_CANVAS_SIDE).contains(&side);
        if !side_ok(args.canvas_width) || !side_ok(args.canvas_height) {
            return Err(ConfigError::CanvasSize {
                width: args.canvas_width,
                height: args.canvas_height,
            });
        }
        if args.throttle_ms == 0 {
            return Err(ConfigError::Throttle);
        }

        let username = match args.username {
            Some(name) if name.trim().is_empty() => return Err(ConfigError::BlankUsername),
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let log_file = match args.log_file {
            Some(path) => path,
            None => data_dir()
                .ok_or(ConfigError::NoDataDirectory)?
                .join("drawar.log"),
        };

        Ok(Self {
            server: args.server,
            feedback: args.feedback,
            log_file,
            session: SessionOptions {
                username,
                round_fallback: !args.no_round_fallback,
                canvas_width: args.canvas_width,
                canvas_height: args.canvas_height,
                throttle: Duration::from_millis(args.throttle_ms),
            },
        })
    }
}

/// OS-standard data directory for the client
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "drawar").map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["drawar"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(parse(&["--log-file", "/tmp/drawar.log"])).unwrap();
        assert_eq!(config.feedback, FeedbackLevel::Rich);
        assert_eq!(config.log_file, PathBuf::from("/tmp/drawar.log"));
        assert!(config.session.round_fallback);
        assert_eq!(config.session.canvas_width, 400);
        assert_eq!(config.session.canvas_height, 400);
        assert_eq!(config.session.throttle, Duration::from_millis(150));
    }

    #[test]
    fn test_flags() {
        let config = Config::from_args(parse(&[
            "--server",
            "https://draw.example.com",
            "--username",
            " Ann ",
            "--throttle-ms",
            "50",
            "--feedback",
            "minimal",
            "--no-round-fallback",
            "--canvas-width",
            "200",
            "--log-file",
            "/tmp/x.log",
        ]))
        .unwrap();
        assert_eq!(config.server, "https://draw.example.com");
        assert_eq!(config.session.username.as_deref(), Some("Ann"));
        assert_eq!(config.session.throttle, Duration::from_millis(50));
        assert_eq!(config.feedback, FeedbackLevel::Minimal);
        assert!(!config.session.round_fallback);
        assert_eq!(config.session.canvas_width, 200);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = Config::from_args(parse(&["--canvas-width", "0", "--log-file", "x"])).unwrap_err();
        assert_eq!(err, ConfigError::CanvasSize { width: 0, height: 400 });

        let err = Config::from_args(parse(&["--throttle-ms", "0", "--log-file", "x"])).unwrap_err();
        assert_eq!(err, ConfigError::Throttle);

        let err = Config::from_args(parse(&["--username", "  ", "--log-file", "x"])).unwrap_err();
        assert_eq!(err, ConfigError::BlankUsername);
    }

    #[test]
    fn test_data_dir() {
        // Might be unavailable in odd environments
        if let Some(path) = data_dir() {
            assert!(path.to_string_lossy().contains("drawar"));
        }
    }
}
