// motionsift-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand, ValueEnum};
use motionsift_core::config::{DisposalMode, FrameFormat};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Motionsift: recover the video inside motion photos and keep the sharp frames",
    long_about = "Locates the video clip embedded in motion photos, repairs it with ffmpeg, \
                  samples its frames and sorts them by sharpness and face presence."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Optional: Also write the log to a timestamped file in this directory
    #[arg(long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extracts and curates frames from motion photos
    Extract(ExtractArgs),
    /// Reports where the embedded video sits in each file without decoding it
    Inspect(InspectArgs),
}

/// Frame disposal mode as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisposalArg {
    /// Move rejected frames into filtered_out/
    Discard,
    /// Keep every frame in place and only log the reasons
    Annotate,
}

impl From<DisposalArg> for DisposalMode {
    fn from(arg: DisposalArg) -> Self {
        match arg {
            DisposalArg::Discard => DisposalMode::Discard,
            DisposalArg::Annotate => DisposalMode::Annotate,
        }
    }
}

/// Frame image format as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for FrameFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => FrameFormat::Png,
            FormatArg::Jpeg => FrameFormat::Jpeg,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Input motion photo or directory (may also come from the config file)
    #[arg(value_name = "INPUT_PATH")]
    pub input_path: Option<PathBuf>,

    /// Root directory for the per-file frame folders (may also come from the config file)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Optional: JSON config file (defaults to ./motionsift.json, then ~/.motionsift.json)
    #[arg(short = 'c', long = "config", value_name = "CONFIG", env = "MOTIONSIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Process subdirectories too
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    // --- Sampling ---
    /// Keep every N-th decoded frame
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub interval: Option<u32>,

    /// Safety cap on sampled frames per file
    #[arg(short, long = "max-frames", value_name = "COUNT", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_frames: Option<u32>,

    // --- Classification ---
    /// Laplacian variance below which a frame counts as blurry
    #[arg(short = 't', long = "blur-threshold", value_name = "VARIANCE")]
    pub blur_threshold: Option<f64>,

    /// Do not require a detected face
    #[arg(long, default_value_t = false)]
    pub no_face_detect: bool,

    /// Optional: Haar cascade XML for the OpenCV face detector
    #[arg(long, value_name = "XML")]
    pub face_cascade: Option<PathBuf>,

    // --- Output ---
    /// What to do with frames that fail classification
    #[arg(long = "disposal-mode", value_enum, value_name = "MODE")]
    pub disposal_mode: Option<DisposalArg>,

    /// Shorthand for --disposal-mode annotate
    #[arg(long, default_value_t = false, conflicts_with = "disposal_mode")]
    pub annotate: bool,

    /// Image format for persisted frames
    #[arg(long = "frame-format", value_enum, value_name = "FORMAT")]
    pub frame_format: Option<FormatArg>,

    /// Write blur_info.txt with the score of every sampled frame
    #[arg(long, default_value_t = false)]
    pub keep_blur_info: bool,

    // --- Repair ---
    /// Elementary stream format tried by the last repair stage (e.g. h264, hevc)
    #[arg(long = "raw-format", value_name = "FORMAT")]
    pub raw_format: Option<String>,

    /// Optional: Directory for temporary files (defaults to OUTPUT_DIR)
    #[arg(long, value_name = "TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Motion photos or directories to inspect
    #[arg(required = true, value_name = "INPUT_PATH")]
    pub inputs: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_flags() {
        let cli = Cli::try_parse_from([
            "motionsift",
            "extract",
            "photos",
            "-o",
            "frames",
            "--annotate",
            "--frame-format",
            "jpg",
            "-i",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract(args) => {
                assert_eq!(args.input_path, Some(PathBuf::from("photos")));
                assert_eq!(args.output_dir, Some(PathBuf::from("frames")));
                assert!(args.annotate);
                assert_eq!(args.frame_format, Some(FormatArg::Jpeg));
                assert_eq!(args.interval, Some(3));
                assert!(args.blur_threshold.is_none());
            }
            Commands::Inspect(_) => panic!("expected extract"),
        }
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["motionsift", "extract", "in", "-i", "0"]).is_err());
    }

    #[test]
    fn test_annotate_conflicts_with_disposal_mode() {
        assert!(
            Cli::try_parse_from([
                "motionsift",
                "extract",
                "in",
                "--annotate",
                "--disposal-mode",
                "discard"
            ])
            .is_err()
        );
    }
}
