//! Configuration structures and constants for the motionsift-core library.
//!
//! The core consumes plain values: thresholds, limits and modes are resolved by
//! the caller (CLI flags merged over an optional JSON file) and handed over as
//! a validated [`CoreConfig`].

mod builder;
pub mod file;

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use builder::CoreConfigBuilder;
pub use file::ConfigFile;

// Default constants

/// Default Laplacian-variance threshold. Frames scoring below it are blurry.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

/// Face detection is on unless explicitly disabled.
pub const DEFAULT_DETECT_FACES: bool = true;

/// Keep every decoded frame by default.
pub const DEFAULT_EXTRACTION_INTERVAL: u32 = 1;

/// Safety cap on sampled frames. Also the fallback bound when the declared
/// frame count of a stream is implausible.
pub const DEFAULT_MAX_FRAMES: u32 = 500;

/// Elementary stream format tried by the last-resort repair stage.
pub const DEFAULT_RAW_STREAM_FORMAT: &str = "h264";

/// CRF used by the re-encoding repair stages (libx264 scale, 0-51).
pub const DEFAULT_REENCODE_CRF: u8 = 23;

/// AAC bitrate used by the re-encoding repair stages.
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";

/// What happens to frames that fail classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisposalMode {
    /// Kept frames in the output root, discarded ones in `filtered_out/`.
    #[default]
    Discard,
    /// Every frame in the output root; discard reasons only go to the log.
    Annotate,
}

impl fmt::Display for DisposalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisposalMode::Discard => write!(f, "discard"),
            DisposalMode::Annotate => write!(f, "annotate"),
        }
    }
}

/// Image format used to persist frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Png,
    Jpeg,
}

impl FrameFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Png => "png",
            FrameFormat::Jpeg => "jpg",
        }
    }
}

/// Main configuration structure for the motionsift-core library.
///
/// All fields have defaults; the builder is the intended way to construct one.
///
/// # Examples
///
/// ```rust,no_run
/// use motionsift_core::config::{CoreConfigBuilder, DisposalMode};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/path/to/frames"))
///     .blur_threshold(120.0)
///     .detect_faces(false)
///     .disposal_mode(DisposalMode::Annotate)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Root directory; each source file gets `<output_dir>/<stem>/`
    pub output_dir: PathBuf,

    /// Optional directory for temporary files (defaults to `output_dir`)
    pub temp_dir: Option<PathBuf>,

    /// Frames with a Laplacian variance below this are discarded as blurry
    pub blur_threshold: f64,

    /// Discard frames without a detected face
    pub detect_faces: bool,

    /// Keep every N-th successfully decoded frame
    pub extraction_interval: u32,

    /// Safety cap M: working frame bound fallback; decode attempts stop at 2×M
    pub max_frames: u32,

    pub disposal_mode: DisposalMode,

    pub frame_format: FrameFormat,

    /// Write `blur_info.txt` with the score of every sampled frame
    pub keep_blur_info: bool,

    /// ffmpeg demuxer name for the raw elementary-stream repair stage
    pub raw_stream_format: String,

    /// CRF for the re-encoding repair stages
    pub reencode_crf: u8,

    /// Audio bitrate for the re-encoding repair stages
    pub audio_bitrate: String,

    /// Haar cascade XML used by the OpenCV face detector
    pub face_cascade_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            temp_dir: None,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            detect_faces: DEFAULT_DETECT_FACES,
            extraction_interval: DEFAULT_EXTRACTION_INTERVAL,
            max_frames: DEFAULT_MAX_FRAMES,
            disposal_mode: DisposalMode::default(),
            frame_format: FrameFormat::default(),
            keep_blur_info: false,
            raw_stream_format: DEFAULT_RAW_STREAM_FORMAT.to_string(),
            reencode_crf: DEFAULT_REENCODE_CRF,
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            face_cascade_path: None,
        }
    }
}

impl CoreConfig {
    /// Creates a configuration with defaults and the given output root.
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Default::default()
        }
    }

    /// Validates value ranges.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.blur_threshold.is_finite() || self.blur_threshold <= 0.0 {
            return Err(CoreError::Config(format!(
                "blur threshold must be a positive number, got {}",
                self.blur_threshold
            )));
        }

        if self.extraction_interval == 0 {
            return Err(CoreError::Config(
                "extraction interval must be at least 1".to_string(),
            ));
        }

        if self.max_frames == 0 {
            return Err(CoreError::Config(
                "max frames must be at least 1".to_string(),
            ));
        }

        if self.reencode_crf > 51 {
            return Err(CoreError::Config(format!(
                "re-encode CRF must be between 0 and 51, got {}",
                self.reencode_crf
            )));
        }

        if self.raw_stream_format.trim().is_empty() {
            return Err(CoreError::Config(
                "raw stream format must not be empty".to_string(),
            ));
        }

        if self.audio_bitrate.trim().is_empty() {
            return Err(CoreError::Config(
                "audio bitrate must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Directory where per-run temporary directories are created.
    pub fn temp_base_dir(&self) -> &PathBuf {
        self.temp_dir.as_ref().unwrap_or(&self.output_dir)
    }
}
