// ============================================================================
// motionsift-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// This module implements the builder pattern for the CoreConfig structure,
// providing a fluent API for creating and configuring CoreConfig instances.
// Every field has a default, so a bare `CoreConfigBuilder::new().build()` is a
// usable configuration writing into the current directory.

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- Internal crate imports ----
use super::{CoreConfig, DisposalMode, FrameFormat};

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use motionsift_core::config::{CoreConfigBuilder, FrameFormat};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/path/to/frames"))
///     .blur_threshold(80.0)
///     .extraction_interval(2)
///     .max_frames(300)
///     .frame_format(FrameFormat::Jpeg)
///     .build();
///
/// assert_eq!(config.extraction_interval, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new CoreConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output root directory.
    ///
    /// # Arguments
    ///
    /// * `output_dir` - Directory that receives one subdirectory per source file
    ///
    /// # Returns
    ///
    /// * Self for method chaining
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.config.output_dir = output_dir;
        self
    }

    /// Sets the temporary files directory.
    ///
    /// # Arguments
    ///
    /// * `temp_dir` - The directory for payload and repair-stage files
    ///
    /// # Returns
    ///
    /// * Self for method chaining
    pub fn temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.config.temp_dir = Some(temp_dir);
        self
    }

    /// Sets the blur threshold.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Minimum Laplacian variance for a frame to count as sharp
    ///
    /// # Returns
    ///
    /// * Self for method chaining
    pub fn blur_threshold(mut self, threshold: f64) -> Self {
        self.config.blur_threshold = threshold;
        self
    }

    /// Sets whether frames without a detected face are discarded.
    pub fn detect_faces(mut self, enable: bool) -> Self {
        self.config.detect_faces = enable;
        self
    }

    /// Keeps every `interval`-th decoded frame.
    pub fn extraction_interval(mut self, interval: u32) -> Self {
        self.config.extraction_interval = interval;
        self
    }

    /// Sets the max-frame safety cap.
    pub fn max_frames(mut self, max_frames: u32) -> Self {
        self.config.max_frames = max_frames;
        self
    }

    pub fn disposal_mode(mut self, mode: DisposalMode) -> Self {
        self.config.disposal_mode = mode;
        self
    }

    pub fn frame_format(mut self, format: FrameFormat) -> Self {
        self.config.frame_format = format;
        self
    }

    pub fn keep_blur_info(mut self, keep: bool) -> Self {
        self.config.keep_blur_info = keep;
        self
    }

    /// Sets the demuxer used when the payload is reinterpreted as an
    /// elementary stream (e.g. "h264", "hevc").
    pub fn raw_stream_format(mut self, format: &str) -> Self {
        self.config.raw_stream_format = format.to_string();
        self
    }

    pub fn reencode_crf(mut self, crf: u8) -> Self {
        self.config.reencode_crf = crf;
        self
    }

    pub fn audio_bitrate(mut self, bitrate: &str) -> Self {
        self.config.audio_bitrate = bitrate.to_string();
        self
    }

    /// Sets the Haar cascade file for the OpenCV face detector.
    pub fn face_cascade_path(mut self, path: PathBuf) -> Self {
        self.config.face_cascade_path = Some(path);
        self
    }

    /// Builds a CoreConfig instance from the builder.
    ///
    /// The result is not validated; call [`CoreConfig::validate`] before use.
    pub fn build(self) -> CoreConfig {
        self.config
    }
}
