//! FFprobe integration for stream metadata.
//!
//! The frame sampler treats everything reported here as untrusted: frame
//! counts and rates only feed the working-bound validation and the report.

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Video stream properties as declared by the container.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamMetadata {
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `nb_frames`, verbatim. May be missing, zero or nonsense.
    pub declared_frames: Option<i64>,
    /// Average frame rate, falling back to the real base rate.
    pub declared_fps: Option<f64>,
    pub duration_secs: Option<f64>,
}

/// Reads stream metadata from a media file.
pub trait StreamProber {
    /// Probes the first video stream of `input_path`.
    ///
    /// Fails if the file cannot be probed or has no video stream.
    fn probe_video(&self, input_path: &Path) -> CoreResult<StreamMetadata>;
}

/// `StreamProber` backed by the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct CrateStreamProber;

impl CrateStreamProber {
    pub fn new() -> Self {
        Self
    }
}

impl StreamProber for CrateStreamProber {
    fn probe_video(&self, input_path: &Path) -> CoreResult<StreamMetadata> {
        log::debug!(
            "Running ffprobe (via crate) for stream metadata on: {}",
            input_path.display()
        );
        let metadata = ffprobe(input_path).map_err(|err| {
            log::error!("ffprobe failed on {}: {:?}", input_path.display(), err);
            map_ffprobe_error(err, "stream metadata")
        })?;

        let stream = metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| {
                CoreError::FfprobeParse(format!(
                    "No video stream found in {}",
                    input_path.display()
                ))
            })?;

        let declared_fps = parse_frame_rate(&stream.avg_frame_rate)
            .or_else(|| parse_frame_rate(&stream.r_frame_rate));

        let duration_secs = stream
            .duration
            .as_deref()
            .or(metadata.format.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok());

        Ok(StreamMetadata {
            codec_name: stream.codec_name.clone(),
            width: stream.width.and_then(|w| u32::try_from(w).ok()),
            height: stream.height.and_then(|h| u32::try_from(h).ok()),
            declared_frames: stream
                .nb_frames
                .as_deref()
                .and_then(|n| n.trim().parse::<i64>().ok()),
            declared_fps,
            duration_secs,
        })
    }
}

/// Parses an ffprobe rate such as `30000/1001` or `25`.
///
/// Returns `None` for `0/0` and anything unparsable.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::FfprobeParse(format!("ffprobe {context} output deserialization: {err}"))
        }
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}
