// ============================================================================
// motionsift-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg and ffprobe
//
// The transcoder and the frame decoder are ffmpeg subprocesses; stream
// metadata comes from ffprobe. Both sit behind traits so the pipeline can be
// exercised with scripted stand-ins.
//
// KEY COMPONENTS:
// - FfmpegSpawner / FfmpegProcess (ffmpeg-sidecar)
// - StreamProber (ffprobe crate)
// - Dependency checking
// - Mock implementations (feature `test-mocks`)

use crate::error::{CoreError, CoreResult};

use std::io;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Contains traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;

/// Contains the stream metadata prober
pub mod ffprobe_executor;

#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{
    FfmpegEventStream, FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner,
    collect_diagnostics,
};

pub use ffprobe_executor::{CrateStreamProber, StreamMetadata, StreamProber, parse_frame_rate};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// External commands the pipeline cannot run without.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Checks if a required external command is available and executable.
///
/// Runs `<cmd> -version` and only looks at whether the process could start.
///
/// # Returns
///
/// * `Ok(())` - The command was found
/// * `Err(CoreError::DependencyNotFound)` - If the command is not found
/// * `Err(CoreError::CommandStart)` - If the command exists but fails to start
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd_name);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd_name);
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd_name, e);
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}

/// Checks every tool in [`REQUIRED_TOOLS`].
pub fn check_required_tools() -> CoreResult<()> {
    REQUIRED_TOOLS.iter().try_for_each(|tool| check_dependency(tool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_is_reported() {
        let err = check_dependency("motionsift-definitely-not-a-real-tool").unwrap_err();
        assert!(matches!(err, CoreError::DependencyNotFound(name) if name.contains("motionsift")));
    }
}
