//! JSON configuration file support.
//!
//! Every key is optional. Values present in the file override built-in
//! defaults; command-line flags override the file. Lookup order is an explicit
//! path, then `./motionsift.json`, then `$HOME/.motionsift.json`.

use super::{CoreConfig, DisposalMode, FrameFormat};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for in the working directory.
pub const LOCAL_CONFIG_NAME: &str = "motionsift.json";

/// File name searched for in the home directory.
pub const HOME_CONFIG_NAME: &str = ".motionsift.json";

/// Contents of a motionsift JSON configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub recursive: Option<bool>,
    pub blur_threshold: Option<f64>,
    pub detect_faces: Option<bool>,
    pub interval: Option<u32>,
    pub max_frames: Option<u32>,
    pub disposal_mode: Option<DisposalMode>,
    pub frame_format: Option<FrameFormat>,
    pub keep_blur_info: Option<bool>,
    pub raw_stream_format: Option<String>,
    pub face_cascade_path: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Parses a configuration file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigParse(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| CoreError::ConfigParse(format!("{}: {}", path.display(), e)))
    }

    /// Parses configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Finds and loads the configuration file, if any.
    ///
    /// An explicit path must exist. The implicit locations are optional.
    pub fn discover(explicit: Option<&Path>) -> CoreResult<Option<(PathBuf, Self)>> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(CoreError::ConfigParse(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Ok(Some((path.to_path_buf(), Self::load(path)?)));
        }

        for candidate in Self::default_locations() {
            if candidate.is_file() {
                log::debug!("Using config file {}", candidate.display());
                let parsed = Self::load(&candidate)?;
                return Ok(Some((candidate, parsed)));
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(None)
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(LOCAL_CONFIG_NAME)];
        if let Some(home) = std::env::var_os("HOME") {
            locations.push(PathBuf::from(home).join(HOME_CONFIG_NAME));
        }
        locations
    }

    /// Overlays the values present in this file onto `config`.
    pub fn apply_to(&self, config: &mut CoreConfig) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(temp_dir) = &self.temp_dir {
            config.temp_dir = Some(temp_dir.clone());
        }
        if let Some(threshold) = self.blur_threshold {
            config.blur_threshold = threshold;
        }
        if let Some(detect) = self.detect_faces {
            config.detect_faces = detect;
        }
        if let Some(interval) = self.interval {
            config.extraction_interval = interval;
        }
        if let Some(max_frames) = self.max_frames {
            config.max_frames = max_frames;
        }
        if let Some(mode) = self.disposal_mode {
            config.disposal_mode = mode;
        }
        if let Some(format) = self.frame_format {
            config.frame_format = format;
        }
        if let Some(keep) = self.keep_blur_info {
            config.keep_blur_info = keep;
        }
        if let Some(raw) = &self.raw_stream_format {
            config.raw_stream_format = raw.clone();
        }
        if let Some(cascade) = &self.face_cascade_path {
            config.face_cascade_path = Some(cascade.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed = ConfigFile::from_json(r#"{ "blur_threshold": 55.5, "disposal_mode": "annotate" }"#)
            .unwrap();
        let mut config = CoreConfig::default();
        parsed.apply_to(&mut config);

        assert_eq!(config.blur_threshold, 55.5);
        assert_eq!(config.disposal_mode, DisposalMode::Annotate);
        assert!(config.detect_faces);
        assert_eq!(config.max_frames, super::super::DEFAULT_MAX_FRAMES);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(ConfigFile::from_json(r#"{ "blur": 1.0 }"#).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            ConfigFile::discover(Some(&missing)),
            Err(CoreError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{ "input": "photos", "output": "frames", "interval": 2, "frame_format": "jpeg", "recursive": true }"#,
        )
        .unwrap();

        let (found, parsed) = ConfigFile::discover(Some(&path)).unwrap().unwrap();
        assert_eq!(found, path);
        assert_eq!(parsed.input, Some(PathBuf::from("photos")));
        assert_eq!(parsed.recursive, Some(true));

        let mut config = CoreConfig::default();
        parsed.apply_to(&mut config);
        assert_eq!(config.output_dir, PathBuf::from("frames"));
        assert_eq!(config.extraction_interval, 2);
        assert_eq!(config.frame_format, FrameFormat::Jpeg);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ConfigFile::load(&path), Err(CoreError::ConfigParse(_))));
    }
}
