//! Temporary file management utilities.
//!
//! Each processed file gets its own temporary directory holding the raw
//! payload and every repair-stage output. The directory is a `tempfile::TempDir`,
//! so it is removed when the per-file run drops it, on success and on every
//! early return alike.

use crate::config::CoreConfig;
use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempDir};

/// Creates a temporary directory with prefix. Auto-cleaned when dropped.
pub fn create_temp_dir(config: &CoreConfig, prefix: &str) -> CoreResult<TempDir> {
    let temp_base_dir = config.temp_base_dir();
    std::fs::create_dir_all(temp_base_dir)?;

    Ok(TempFileBuilder::new()
        .prefix(prefix)
        .tempdir_in(temp_base_dir)?)
}

/// Returns a temporary file path with random suffix. Does not create the file.
pub fn create_temp_file_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    use rand::distributions::Alphanumeric;
    use rand::{Rng, thread_rng};

    let random_suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    let filename = format!("{prefix}_{random_suffix}.{extension}");
    dir.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_temp_dir_is_removed_on_drop() {
        let base = tempdir().unwrap();
        let config = CoreConfig::new(base.path().to_path_buf());

        let temp = create_temp_dir(&config, "run_").unwrap();
        let temp_path = temp.path().to_path_buf();
        assert!(temp_path.starts_with(base.path()));
        assert!(temp_path.is_dir());

        drop(temp);
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_temp_file_path_shape() {
        let path = create_temp_file_path(Path::new("/tmp/x"), "stage", "mp4");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("stage_"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(name.len(), "stage_".len() + 6 + ".mp4".len());
        assert!(!path.exists());
    }
}
