// ============================================================================
// motionsift-core/src/repair/transcoder.rs
// ============================================================================
//
// TRANSCODER: One ffmpeg Invocation per Repair Stage
//
// A `TranscodeRequest` carries everything a stage varies: forced input
// format, copy or re-encode, edit-list and timestamp flags, output path and
// overwrite behavior. `SidecarTranscoder` turns it into an ffmpeg command and
// runs it to completion; only the exit status and error lines are inspected.

use crate::error::{CoreResult, command_failed_error};
use crate::external::{FfmpegProcess, FfmpegSpawner, collect_diagnostics};
use ffmpeg_sidecar::command::FfmpegCommand;
use std::path::PathBuf;

/// Video codec used by every re-encoding stage.
pub const REENCODE_VIDEO_CODEC: &str = "libx264";

/// Audio codec used when a re-encoding stage keeps audio.
pub const REENCODE_AUDIO_CODEC: &str = "aac";

/// x264 preset for the re-encoding stages.
pub const REENCODE_PRESET: &str = "fast";

/// How streams are carried into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecMode {
    /// Copy every stream verbatim.
    Copy,
    /// Re-encode video; audio is re-encoded at `audio_bitrate` or dropped.
    Reencode {
        crf: u8,
        audio_bitrate: Option<String>,
    },
}

/// Parameters for one transcoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    /// Demuxer forced with `-f`, if any.
    pub input_format: Option<String>,
    pub mode: CodecMode,
    pub ignore_editlist: bool,
    pub regenerate_pts: bool,
    /// Move the index to the front of the output.
    pub faststart: bool,
    pub output: PathBuf,
    pub overwrite: bool,
}

impl TranscodeRequest {
    /// Arguments passed to ffmpeg, in order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut push = |items: &[&str]| args.extend(items.iter().map(|s| s.to_string()));

        push(&["-hide_banner", if self.overwrite { "-y" } else { "-n" }]);

        if self.regenerate_pts {
            push(&["-fflags", "+genpts"]);
        }
        if self.ignore_editlist {
            push(&["-ignore_editlist", "1"]);
        }
        if let Some(format) = &self.input_format {
            push(&["-f", format.as_str()]);
        }
        let input = self.input.to_string_lossy();
        push(&["-i", &*input]);

        match &self.mode {
            CodecMode::Copy => push(&["-c", "copy"]),
            CodecMode::Reencode { crf, audio_bitrate } => {
                let crf = crf.to_string();
                push(&[
                    "-c:v",
                    REENCODE_VIDEO_CODEC,
                    "-crf",
                    crf.as_str(),
                    "-preset",
                    REENCODE_PRESET,
                    "-pix_fmt",
                    "yuv420p",
                ]);
                match audio_bitrate {
                    Some(bitrate) => push(&["-c:a", REENCODE_AUDIO_CODEC, "-b:a", bitrate.as_str()]),
                    None => push(&["-an"]),
                }
            }
        }

        if self.faststart {
            push(&["-movflags", "+faststart"]);
        }
        let output = self.output.to_string_lossy();
        push(&[&*output]);
        args
    }

    /// Builds the ffmpeg command.
    pub fn to_command(&self) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new();
        cmd.args(self.to_args());
        cmd
    }

    /// Human readable command line for logs and attempt records.
    pub fn describe(&self) -> String {
        format!("ffmpeg {}", self.to_args().join(" "))
    }
}

/// Runs a transcode to completion.
pub trait Transcoder {
    /// Succeeds iff the transcoder exited with status 0.
    ///
    /// Failures carry the transcoder's error output. Whether the output file is
    /// usable is checked by the caller.
    fn transcode(&self, request: &TranscodeRequest) -> CoreResult<()>;
}

/// `Transcoder` running ffmpeg through an `FfmpegSpawner`.
#[derive(Debug, Clone, Default)]
pub struct SidecarTranscoder<S: FfmpegSpawner> {
    spawner: S,
}

impl<S: FfmpegSpawner> SidecarTranscoder<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }
}

impl<S: FfmpegSpawner> Transcoder for SidecarTranscoder<S> {
    fn transcode(&self, request: &TranscodeRequest) -> CoreResult<()> {
        log::debug!("Running repair command: {}", request.describe());

        let mut process = self.spawner.spawn(request.to_command())?;
        let diagnostics = collect_diagnostics(&mut process)?;
        let status = process.wait()?;

        if status.success() {
            Ok(())
        } else {
            Err(command_failed_error(
                "ffmpeg (repair)",
                status,
                diagnostics.join("\n"),
            ))
        }
    }
}
