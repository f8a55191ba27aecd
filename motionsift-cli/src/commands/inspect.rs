//! Implementation of the 'inspect' subcommand.
//!
//! Runs only the container locator over each input. No ffmpeg is needed.

use crate::cli::InspectArgs;
use crate::commands::extract::discover_input_files;
use crate::error::CliResult;
use crate::terminal;

use motionsift_core::utils::file_name_lossy;
use motionsift_core::{CoreResult, LocatedPayload, MotionPhotoFile, format_bytes, locate_payload};

use std::path::{Path, PathBuf};

/// Counts from an inspect run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectSummary {
    pub located: usize,
    pub failed: usize,
}

/// Locates the embedded video in one file.
pub fn inspect_file(path: &Path) -> CoreResult<(MotionPhotoFile, LocatedPayload)> {
    let file = MotionPhotoFile::open(path)?;
    let payload = locate_payload(&file)?;
    Ok((file, payload))
}

fn display_payload(file: &MotionPhotoFile, payload: &LocatedPayload) {
    terminal::print_status("Marker", payload.vendor_marker().unwrap_or("none"), false);
    terminal::print_status("Strategy", &payload.strategy().to_string(), false);
    terminal::print_status("Offset", &payload.offset().to_string(), false);
    terminal::print_status(
        "Length",
        &format!(
            "{} ({:.1}% of {})",
            format_bytes(payload.length() as u64),
            payload.length() as f64 * 100.0 / file.len().max(1) as f64,
            format_bytes(file.len() as u64)
        ),
        true,
    );
}

/// Inspects every input and prints what was found.
pub fn run_inspect(args: InspectArgs) -> CliResult<InspectSummary> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in &args.inputs {
        files.extend(discover_input_files(input, args.recursive)?);
    }

    terminal::print_section("Inspect");
    let mut summary = InspectSummary::default();
    for path in &files {
        terminal::print_subsection(&file_name_lossy(path));
        match inspect_file(path) {
            Ok((file, payload)) => {
                display_payload(&file, &payload);
                summary.located += 1;
            }
            Err(e) => {
                terminal::print_warning(&e.to_string());
                summary.failed += 1;
            }
        }
    }

    terminal::print_success(&format!(
        "Located video in {} of {} file(s)",
        summary.located,
        files.len()
    ));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motionsift_core::{CoreError, LocatorStrategy};
    use tempfile::tempdir;

    fn motion_photo_bytes() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(&[0u8; 64]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x18]);
        bytes.extend_from_slice(b"ftypmp42");
        bytes.extend_from_slice(&[0u8; 100]);
        bytes
    }

    #[test]
    fn test_inspect_motion_photo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_0001.jpg");
        std::fs::write(&path, motion_photo_bytes()).unwrap();

        let (file, payload) = inspect_file(&path).unwrap();
        assert_eq!(payload.strategy(), LocatorStrategy::IsoBox);
        assert_eq!(payload.offset(), 72);
        assert_eq!(payload.offset() + payload.length(), file.len());
    }

    #[test]
    fn test_inspect_counts_failures() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("good.jpg"), motion_photo_bytes()).unwrap();
        std::fs::write(dir.path().join("plain.jpg"), [0xFF, 0xD8, 0x00, 0x01]).unwrap();

        let summary = run_inspect(InspectArgs {
            inputs: vec![dir.path().to_path_buf()],
            recursive: false,
        })
        .unwrap();
        assert_eq!(summary, InspectSummary { located: 1, failed: 1 });
    }

    #[test]
    fn test_still_without_video() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("still.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0x00, 0x01]).unwrap();
        assert!(matches!(inspect_file(&path), Err(CoreError::ContainerNotFound(_))));
    }
}
