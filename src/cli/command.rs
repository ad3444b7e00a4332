use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

/// X-PAD application type commonly used for the MOT slideshow.
pub const DEFAULT_MOT_APP_TYPE: u8 = 12;

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Tools for decoding DAB+ programme associated data (labels and slides)",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode dynamic labels and slideshow images from a DAB+ sub-channel.
    Decode(DecodeArgs),

    /// Print audio format, FEC statistics and PAD summary
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Input DAB+ sub-channel dump (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Sub-channel bitrate in kbit/s (multiple of 8).
    #[arg(long, value_name = "KBPS")]
    pub bitrate: usize,

    /// X-PAD application type carrying the MOT slideshow.
    #[arg(long, value_name = "TYPE", default_value_t = DEFAULT_MOT_APP_TYPE,
          value_parser = clap::value_parser!(u8).range(4..30))]
    pub mot_app_type: u8,

    /// Disable MOT slideshow decoding.
    #[arg(long)]
    pub no_mot: bool,

    /// Accept PAD from non-compliant encoders.
    #[arg(long)]
    pub loose: bool,

    /// Output directory for slideshow images.
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Write all decoded events to a YAML file.
    #[arg(long, value_name = "FILE")]
    pub events: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input DAB+ sub-channel dump.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Sub-channel bitrate in kbit/s (multiple of 8).
    #[arg(long, value_name = "KBPS")]
    pub bitrate: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

impl Cli {
    /// Level at which library validation messages become errors.
    pub fn fail_level(&self) -> log::Level {
        if self.strict {
            log::Level::Warn
        } else {
            log::Level::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decode_arguments() {
        let cli = Cli::parse_from([
            "dabpadd",
            "--strict",
            "decode",
            "ensemble.dab",
            "--bitrate",
            "72",
            "--loose",
            "--events",
            "events.yaml",
        ]);

        assert_eq!(cli.fail_level(), log::Level::Warn);
        let Commands::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.bitrate, 72);
        assert_eq!(args.mot_app_type, DEFAULT_MOT_APP_TYPE);
        assert!(args.loose && !args.no_mot);
        assert_eq!(args.events, Some(PathBuf::from("events.yaml")));
    }

    #[test]
    fn rejects_reserved_mot_app_types() {
        for app_type in ["0", "1", "31"] {
            let result = Cli::try_parse_from([
                "dabpadd",
                "decode",
                "-",
                "--bitrate",
                "48",
                "--mot-app-type",
                app_type,
            ]);
            assert!(result.is_err(), "app type {app_type} accepted");
        }
    }
}
