//! File discovery module for finding motion photos to process.
//!
//! Motion photos usually carry a `.jpg`/`.jpeg` or `.heic` extension. Plain
//! `.mp4`/`.mov` clips are accepted too; the locator finds their `ftyp` box at
//! offset zero and the rest of the pipeline treats them the same way.

use crate::error::{CoreError, CoreResult};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Extensions (lowercase, without dot) picked up by discovery.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "mp4", "mov"];

/// Returns true if the path has one of the supported extensions (case-insensitive).
pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Finds files eligible for processing in the specified directory.
///
/// Only the top level is scanned unless `recursive` is set. Results are
/// de-duplicated and sorted so batch order is stable between runs.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths of the discovered files
/// * `Err(CoreError::Io)` - If the directory cannot be read
/// * `Err(CoreError::NoFilesFound)` - If nothing matched
///
/// # Examples
///
/// ```rust,no_run
/// use motionsift_core::find_processable_files;
/// use std::path::Path;
///
/// match find_processable_files(Path::new("/path/to/photos"), false) {
///     Ok(files) => println!("Found {} motion photos", files.len()),
///     Err(e) => println!("Error finding files: {}", e),
/// }
/// ```
pub fn find_processable_files(input_dir: &Path, recursive: bool) -> CoreResult<Vec<PathBuf>> {
    let mut found = BTreeSet::new();
    collect_files(input_dir, recursive, &mut found)?;

    if found.is_empty() {
        Err(CoreError::NoFilesFound)
    } else {
        Ok(found.into_iter().collect())
    }
}

fn collect_files(dir: &Path, recursive: bool, found: &mut BTreeSet<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();

        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, found)?;
            }
        } else if path.is_file() && is_supported_file(&path) {
            found.insert(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_file() {
        assert!(is_supported_file(Path::new("IMG_0001.JPG")));
        assert!(is_supported_file(Path::new("a/b/photo.heic")));
        assert!(is_supported_file(Path::new("clip.MOV")));
        assert!(!is_supported_file(Path::new("notes.txt")));
        assert!(!is_supported_file(Path::new("no_extension")));
    }
}
