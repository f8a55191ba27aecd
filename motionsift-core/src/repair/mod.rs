// ============================================================================
// motionsift-core/src/repair/mod.rs
// ============================================================================
//
// STREAM REPAIR CHAIN: Graduated Fallback from Remux to Re-encode
//
// Extracted payload bytes often are not a playable, correctly indexed
// stream. The chain runs its stages in order, each writing to its own
// temporary file. A stage succeeds when the transcoder exits with status 0
// and leaves a non-empty output. The first success is moved to the caller's
// output path and no further stage runs. Every failed stage's output is
// deleted before the next stage starts.
//
// KEY COMPONENTS:
// - RepairStage: strategy object producing a TranscodeRequest
// - Transcoder: runs one request (ffmpeg via SidecarTranscoder)
// - RepairChain: ordered stages plus the orchestration loop
// - RepairAttempt / RepairedVideo: what happened, and the result

pub mod stages;
pub mod transcoder;

pub use stages::{
    CompatibilityReencode, ForcedFormatReencode, RawElementaryStream, RepairStage,
    StructuralRemux, standard_stages,
};
pub use transcoder::{CodecMode, SidecarTranscoder, TranscodeRequest, Transcoder};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::temp_files;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The stage produced a usable file at this path.
    Succeeded(PathBuf),
    /// The stage failed; carries diagnostic text.
    Failed(String),
}

/// One executed stage of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairAttempt {
    pub stage: &'static str,
    /// Command line the stage ran.
    pub command: String,
    pub outcome: AttemptOutcome,
}

impl RepairAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded(_))
    }
}

/// The validated stream produced by the first successful stage.
#[derive(Debug, Clone)]
pub struct RepairedVideo {
    pub path: PathBuf,
    /// Name of the stage that produced it.
    pub stage: &'static str,
    /// Every stage that ran, in order. The last one succeeded.
    pub attempts: Vec<RepairAttempt>,
}

/// Ordered list of repair stages.
pub struct RepairChain {
    stages: Vec<Box<dyn RepairStage>>,
}

impl RepairChain {
    pub fn new(stages: Vec<Box<dyn RepairStage>>) -> Self {
        Self { stages }
    }

    /// Stages A through D, configured from `config`.
    pub fn standard(config: &CoreConfig) -> Self {
        Self::new(standard_stages(config))
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Repairs `input` into `output`.
    ///
    /// Stage outputs are written under `work_dir`. On success exactly one file
    /// exists at `output` and no stage output is left in `work_dir`.
    ///
    /// # Returns
    ///
    /// * `Ok(RepairedVideo)` - From the first stage that succeeded
    /// * `Err(CoreError::RepairChainExhausted)` - Every stage failed; carries
    ///   the last stage's diagnostics
    /// * `Err(CoreError::Io)` - The successful output could not be moved
    pub fn run<T: Transcoder>(
        &self,
        transcoder: &T,
        input: &Path,
        work_dir: &Path,
        output: &Path,
    ) -> CoreResult<RepairedVideo> {
        let mut attempts = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_output =
                temp_files::create_temp_file_path(work_dir, &format!("repair_{}", stage.name()), "mp4");
            let request = stage.request(input, &stage_output);
            let command = request.describe();

            log::debug!("Repair stage '{}' starting", stage.name());
            match run_stage(transcoder, &request) {
                Ok(()) => {
                    promote(&stage_output, output)?;
                    log::info!("Repair stage '{}' produced a usable stream", stage.name());
                    attempts.push(RepairAttempt {
                        stage: stage.name(),
                        command,
                        outcome: AttemptOutcome::Succeeded(output.to_path_buf()),
                    });
                    return Ok(RepairedVideo {
                        path: output.to_path_buf(),
                        stage: stage.name(),
                        attempts,
                    });
                }
                Err(diagnostics) => {
                    discard(&stage_output);
                    log::warn!(
                        "Repair stage '{}' failed: {}",
                        stage.name(),
                        last_lines(&diagnostics, 3)
                    );
                    attempts.push(RepairAttempt {
                        stage: stage.name(),
                        command,
                        outcome: AttemptOutcome::Failed(diagnostics),
                    });
                }
            }
        }

        let (last_stage, diagnostics) = attempts
            .last()
            .map(|attempt| {
                let text = match &attempt.outcome {
                    AttemptOutcome::Failed(text) => text.clone(),
                    AttemptOutcome::Succeeded(_) => String::new(),
                };
                (attempt.stage.to_string(), text)
            })
            .unwrap_or_else(|| ("none".to_string(), "no repair stages configured".to_string()));

        Err(CoreError::RepairChainExhausted {
            stages: attempts.len(),
            last_stage,
            diagnostics,
        })
    }
}

/// Runs one stage and validates its output. Errors become diagnostic text.
fn run_stage<T: Transcoder>(transcoder: &T, request: &TranscodeRequest) -> Result<(), String> {
    transcoder.transcode(request).map_err(|e| match e {
        CoreError::CommandFailed(_, status, stderr) if !stderr.trim().is_empty() => {
            format!("{status}: {}", stderr.trim())
        }
        other => other.to_string(),
    })?;

    match fs::metadata(&request.output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err("transcoder exited successfully but wrote an empty file".to_string()),
        Err(_) => Err("transcoder exited successfully but wrote no output".to_string()),
    }
}

/// Moves the surviving stage output to its final location.
fn promote(from: &Path, to: &Path) -> CoreResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_err() {
        // Cross-device move
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to delete repair output {}: {}", path.display(), e);
        }
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join(" | ")
}
