//! The four repair strategies, from least to most invasive.

use super::transcoder::{CodecMode, TranscodeRequest};
use crate::config::CoreConfig;
use std::path::Path;

/// Container format the payload is declared to be.
pub const DECLARED_CONTAINER_FORMAT: &str = "mp4";

/// One strategy in the repair chain.
pub trait RepairStage {
    /// Short stable name used in logs and reports.
    fn name(&self) -> &'static str;

    /// The transcode this stage performs for `input`, writing to `output`.
    fn request(&self, input: &Path, output: &Path) -> TranscodeRequest;
}

/// Stage A: remux as MP4, ignore edit lists, copy streams, fast start.
#[derive(Debug, Clone, Default)]
pub struct StructuralRemux;

impl RepairStage for StructuralRemux {
    fn name(&self) -> &'static str {
        "structural-remux"
    }

    fn request(&self, input: &Path, output: &Path) -> TranscodeRequest {
        TranscodeRequest {
            input: input.to_path_buf(),
            input_format: Some(DECLARED_CONTAINER_FORMAT.to_string()),
            mode: CodecMode::Copy,
            ignore_editlist: true,
            regenerate_pts: false,
            faststart: true,
            output: output.to_path_buf(),
            overwrite: true,
        }
    }
}

/// Stage B: re-encode to H.264/AAC at a fixed quality, fast start.
#[derive(Debug, Clone)]
pub struct CompatibilityReencode {
    pub crf: u8,
    pub audio_bitrate: String,
}

impl RepairStage for CompatibilityReencode {
    fn name(&self) -> &'static str {
        "compatibility-reencode"
    }

    fn request(&self, input: &Path, output: &Path) -> TranscodeRequest {
        TranscodeRequest {
            input: input.to_path_buf(),
            input_format: None,
            mode: CodecMode::Reencode {
                crf: self.crf,
                audio_bitrate: Some(self.audio_bitrate.clone()),
            },
            ignore_editlist: false,
            regenerate_pts: false,
            faststart: true,
            output: output.to_path_buf(),
            overwrite: true,
        }
    }
}

/// Stage C: force MP4 demuxing, ignore edit lists, regenerate timestamps,
/// then re-encode like stage B.
#[derive(Debug, Clone)]
pub struct ForcedFormatReencode {
    pub crf: u8,
    pub audio_bitrate: String,
}

impl RepairStage for ForcedFormatReencode {
    fn name(&self) -> &'static str {
        "forced-format-reencode"
    }

    fn request(&self, input: &Path, output: &Path) -> TranscodeRequest {
        TranscodeRequest {
            input: input.to_path_buf(),
            input_format: Some(DECLARED_CONTAINER_FORMAT.to_string()),
            mode: CodecMode::Reencode {
                crf: self.crf,
                audio_bitrate: Some(self.audio_bitrate.clone()),
            },
            ignore_editlist: true,
            regenerate_pts: true,
            faststart: true,
            output: output.to_path_buf(),
            overwrite: true,
        }
    }
}

/// Stage D: read the bytes as a headerless elementary stream and re-encode.
///
/// An elementary stream carries no audio, so none is requested.
#[derive(Debug, Clone)]
pub struct RawElementaryStream {
    /// Demuxer name, e.g. `h264` or `hevc`.
    pub format: String,
    pub crf: u8,
}

impl RepairStage for RawElementaryStream {
    fn name(&self) -> &'static str {
        "raw-elementary-stream"
    }

    fn request(&self, input: &Path, output: &Path) -> TranscodeRequest {
        TranscodeRequest {
            input: input.to_path_buf(),
            input_format: Some(self.format.clone()),
            mode: CodecMode::Reencode {
                crf: self.crf,
                audio_bitrate: None,
            },
            ignore_editlist: false,
            regenerate_pts: true,
            faststart: true,
            output: output.to_path_buf(),
            overwrite: true,
        }
    }
}

/// Stages A to D configured from `config`, in chain order.
pub fn standard_stages(config: &CoreConfig) -> Vec<Box<dyn RepairStage>> {
    vec![
        Box::new(StructuralRemux),
        Box::new(CompatibilityReencode {
            crf: config.reencode_crf,
            audio_bitrate: config.audio_bitrate.clone(),
        }),
        Box::new(ForcedFormatReencode {
            crf: config.reencode_crf,
            audio_bitrate: config.audio_bitrate.clone(),
        }),
        Box::new(RawElementaryStream {
            format: config.raw_stream_format.clone(),
            crf: config.reencode_crf,
        }),
    ]
}
