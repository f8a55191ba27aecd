// ============================================================================
// motionsift-core/src/classify/face.rs
// ============================================================================
//
// FACE DETECTION: Pluggable Face-Presence Signal
//
// The classifier only needs "how many faces are in this grayscale frame".
// Detectors are constructed once per run and handed to the classifier.
// The bundled backend is an OpenCV Haar cascade, compiled in with the
// `opencv` feature. Without it, enabling face detection is a configuration
// error.

use crate::config::CoreConfig;
use crate::error::CoreResult;
use image::GrayImage;

/// A detected face, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Detector tuning shared by all backends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Image pyramid scale step.
    pub scale_factor: f64,
    /// Overlapping candidates needed to accept a region.
    pub min_neighbors: i32,
    /// Smallest face edge in pixels.
    pub min_size: i32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 30,
        }
    }
}

/// Finds faces in a grayscale frame.
pub trait FaceDetector {
    fn name(&self) -> &'static str;

    /// Returns every region that meets the detector's size and neighbor
    /// constraints.
    fn detect(&mut self, gray: &GrayImage) -> CoreResult<Vec<FaceRegion>>;
}

/// Well-known install locations of the frontal-face cascade.
pub const DEFAULT_CASCADE_PATHS: &[&str] = &[
    "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml",
    "/usr/local/share/opencv4/haarcascades/haarcascade_frontalface_default.xml",
    "/usr/share/opencv/haarcascades/haarcascade_frontalface_default.xml",
    "/opt/homebrew/share/opencv4/haarcascades/haarcascade_frontalface_default.xml",
];

/// Builds the face detector for a run.
///
/// Returns `Ok(None)` when detection is disabled. Fails with `Config` when
/// detection is enabled but no backend is compiled in, or when the cascade
/// cannot be loaded.
pub fn create_face_detector(config: &CoreConfig) -> CoreResult<Option<Box<dyn FaceDetector>>> {
    if !config.detect_faces {
        return Ok(None);
    }

    backend(config)
}

#[cfg(feature = "opencv")]
fn backend(config: &CoreConfig) -> CoreResult<Option<Box<dyn FaceDetector>>> {
    let detector = haar::HaarCascadeDetector::load(
        config.face_cascade_path.as_deref(),
        DetectorParams::default(),
    )?;
    Ok(Some(Box::new(detector)))
}

#[cfg(not(feature = "opencv"))]
fn backend(_config: &CoreConfig) -> CoreResult<Option<Box<dyn FaceDetector>>> {
    Err(crate::error::CoreError::Config(
        "face detection is enabled but no face detector is available; \
         build with the `opencv` feature or disable face detection"
            .to_string(),
    ))
}

#[cfg(feature = "opencv")]
pub mod haar {
    //! OpenCV Haar-cascade backend.

    use super::{DEFAULT_CASCADE_PATHS, DetectorParams, FaceDetector, FaceRegion};
    use crate::error::{CoreError, CoreResult};
    use image::GrayImage;
    use opencv::core::{CV_8UC1, Mat, Rect, Scalar, Size, Vector};
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use std::path::{Path, PathBuf};

    pub struct HaarCascadeDetector {
        classifier: CascadeClassifier,
        params: DetectorParams,
    }

    impl HaarCascadeDetector {
        /// Loads `cascade`, or the first default location that exists.
        pub fn load(cascade: Option<&Path>, params: DetectorParams) -> CoreResult<Self> {
            let path: PathBuf = match cascade {
                Some(path) => path.to_path_buf(),
                None => DEFAULT_CASCADE_PATHS
                    .iter()
                    .map(PathBuf::from)
                    .find(|p| p.is_file())
                    .ok_or_else(|| {
                        CoreError::Config(
                            "no Haar cascade found; set face_cascade_path".to_string(),
                        )
                    })?,
            };

            let classifier = CascadeClassifier::new(&path.to_string_lossy())
                .map_err(|e| CoreError::Config(format!("cannot load {}: {}", path.display(), e)))?;
            if classifier.empty().unwrap_or(true) {
                return Err(CoreError::Config(format!(
                    "Haar cascade {} is empty",
                    path.display()
                )));
            }
            log::debug!("Loaded Haar cascade {}", path.display());
            Ok(Self { classifier, params })
        }
    }

    fn cv_err(e: opencv::Error) -> CoreError {
        CoreError::Classification(format!("opencv: {e}"))
    }

    impl FaceDetector for HaarCascadeDetector {
        fn name(&self) -> &'static str {
            "opencv-haar"
        }

        fn detect(&mut self, gray: &GrayImage) -> CoreResult<Vec<FaceRegion>> {
            let (width, height) = gray.dimensions();
            let mut mat = Mat::new_rows_cols_with_default(
                height as i32,
                width as i32,
                CV_8UC1,
                Scalar::all(0.0),
            )
            .map_err(cv_err)?;
            mat.data_bytes_mut()
                .map_err(cv_err)?
                .copy_from_slice(gray.as_raw());

            let mut faces = Vector::<Rect>::new();
            let min = Size::new(self.params.min_size, self.params.min_size);
            self.classifier
                .detect_multi_scale(
                    &mat,
                    &mut faces,
                    self.params.scale_factor,
                    self.params.min_neighbors,
                    0,
                    min,
                    Size::new(0, 0),
                )
                .map_err(cv_err)?;

            Ok(faces
                .iter()
                .map(|r| FaceRegion {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_disabled_detection_builds_nothing() {
        let config = CoreConfig {
            detect_faces: false,
            ..Default::default()
        };
        assert!(create_face_detector(&config).unwrap().is_none());
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_enabled_detection_without_backend_is_config_error() {
        let config = CoreConfig::default();
        assert!(config.detect_faces);
        match create_face_detector(&config) {
            Err(CoreError::Config(msg)) => assert!(msg.contains("opencv")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn test_default_params() {
        let params = DetectorParams::default();
        assert_eq!(params.min_neighbors, 5);
        assert_eq!(params.min_size, 30);
    }
}
