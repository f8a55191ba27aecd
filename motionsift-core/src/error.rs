// ============================================================================
// motionsift-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for motionsift-core
//
// This module defines the error types used throughout the library, built on
// thiserror. The pipeline distinguishes errors that end the processing of one
// file (a missing container, an empty payload, an exhausted repair chain, a
// stream that cannot be opened) from errors that only degrade a single frame.
//
// KEY COMPONENTS:
// - CoreError: Enum of all error kinds
// - CoreResult: Result alias used across the crate
// - Helper constructors for external command failures

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by motionsift-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("Failed to wait for command '{0}': {1}")]
    CommandWait(String, #[source] io::Error),

    #[error("Command '{0}' failed with status {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("Required dependency '{0}' not found")]
    DependencyNotFound(String),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration file: {0}")]
    ConfigParse(String),

    #[error("No processable files found")]
    NoFilesFound,

    #[error("ffprobe error: {0}")]
    FfprobeParse(String),

    // ---- Fatal for a single file ----
    #[error("No embedded video container found in {}", .0.display())]
    ContainerNotFound(PathBuf),

    #[error("Located video payload in {} is empty", .0.display())]
    EmptyPayload(PathBuf),

    #[error("All {stages} repair stages failed (last: {last_stage}): {diagnostics}")]
    RepairChainExhausted {
        stages: usize,
        last_stage: String,
        diagnostics: String,
    },

    #[error("Cannot open repaired stream for decoding: {0}")]
    DecodeOpenFailure(String),

    // ---- Recoverable, per frame ----
    #[error("Frame decode error: {0}")]
    FrameDecode(String),

    #[error("Frame classification failed: {0}")]
    Classification(String),

    #[error("Failed to write {}: {1}", .0.display())]
    Persist(PathBuf, String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl CoreError {
    /// True for errors that abort the pipeline for the current file.
    ///
    /// Everything else is either handled inside the pipeline (frame decode,
    /// classification, persistence) or is a setup problem reported before any
    /// file is touched.
    pub fn is_fatal_for_file(&self) -> bool {
        matches!(
            self,
            CoreError::ContainerNotFound(_)
                | CoreError::EmptyPayload(_)
                | CoreError::RepairChainExhausted { .. }
                | CoreError::DecodeOpenFailure(_)
                | CoreError::Io(_)
        )
    }
}

/// Result type for motionsift-core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds a `CommandStart` error.
pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Builds a `CommandWait` error.
pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

/// Builds a `CommandFailed` error.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(CoreError::ContainerNotFound(PathBuf::from("a.jpg")).is_fatal_for_file());
        assert!(CoreError::EmptyPayload(PathBuf::from("a.jpg")).is_fatal_for_file());
        assert!(
            CoreError::RepairChainExhausted {
                stages: 4,
                last_stage: "raw-elementary".to_string(),
                diagnostics: String::new(),
            }
            .is_fatal_for_file()
        );
        assert!(CoreError::DecodeOpenFailure("x".into()).is_fatal_for_file());

        assert!(!CoreError::FrameDecode("x".into()).is_fatal_for_file());
        assert!(!CoreError::Classification("x".into()).is_fatal_for_file());
        assert!(!CoreError::Persist(PathBuf::from("f.png"), "x".into()).is_fatal_for_file());
    }

    #[test]
    fn test_error_messages_name_the_file() {
        let err = CoreError::ContainerNotFound(PathBuf::from("/photos/IMG_1.jpg"));
        assert!(err.to_string().contains("/photos/IMG_1.jpg"));
    }
}
