// ============================================================================
// motionsift-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// This module provides abstractions for spawning and interacting with FFmpeg
// processes. Both the repair chain (remux/re-encode to a file) and the frame
// sampler (raw frames on stdout) drive ffmpeg through these traits, so tests
// can swap in scripted processes.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active FFmpeg process
// - FfmpegSpawner: Trait for creating new FFmpeg processes
// - SidecarSpawner: Concrete implementation using ffmpeg-sidecar
// - collect_diagnostics: Gathers error lines from the event stream

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::process::ExitStatus;

/// Boxed stream of events pulled lazily from a running process.
pub type FfmpegEventStream = Box<dyn Iterator<Item = FfmpegEvent>>;

// --- FFmpeg Execution Abstraction ---

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Takes the event stream of the running command.
    ///
    /// Can only be called once per process.
    fn events(&mut self) -> CoreResult<FfmpegEventStream>;

    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        for event in self.events()? {
            handler(event)?;
        }
        Ok(())
    }

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;

    /// Terminates the command early.
    fn kill(&mut self) -> CoreResult<()>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    /// Spawns the ffmpeg command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn events(&mut self) -> CoreResult<FfmpegEventStream> {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            command_failed_error(
                "ffmpeg (sidecar - get iter)",
                ExitStatus::default(),
                e.to_string(),
            )
        })?;
        Ok(Box::new(iterator))
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.0
            .kill()
            .map_err(|e| command_wait_error("ffmpeg (sidecar - kill)", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))
    }
}

// --- Diagnostics ---

/// Maximum number of diagnostic lines kept per process.
pub const MAX_DIAGNOSTIC_LINES: usize = 20;

/// Returns the text of an event that belongs in a failure report.
///
/// Only error-level log lines and sidecar errors qualify.
pub fn diagnostic_line(event: &FfmpegEvent) -> Option<&str> {
    match event {
        FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, line) => Some(line.as_str()),
        FfmpegEvent::Error(line) => Some(line.as_str()),
        _ => None,
    }
}

/// Drains a process's events and returns the last error lines it printed.
pub fn collect_diagnostics<P: FfmpegProcess>(process: &mut P) -> CoreResult<Vec<String>> {
    let mut lines: Vec<String> = Vec::new();
    process.handle_events(|event| {
        if let Some(line) = diagnostic_line(&event) {
            log::trace!("ffmpeg: {}", line);
            if lines.len() == MAX_DIAGNOSTIC_LINES {
                lines.remove(0);
            }
            lines.push(line.to_string());
        }
        Ok(())
    })?;
    Ok(lines)
}
