// ============================================================================
// motionsift-core/src/classify/mod.rs
// ============================================================================
//
// FRAME CLASSIFIER: Blur Score, Face Presence and Disposition
//
// Each sampled frame is scored by Laplacian variance of its luminance and,
// when enabled, checked for at least one face. `decide` turns those two
// signals into keep or discard. It is a pure function of its inputs.
//
// DECISION POLICY:
// discard iff blur < threshold, or detection is enabled and no face was
// found. Both reasons are recorded when both apply. A frame that cannot be
// scored gets blur 0.0 and presence `Skipped`, so it is discarded as blurry.
// With detection enabled and no detector attached, no face can be found and
// presence is `NotDetected`.

pub mod blur;
pub mod face;

pub use blur::{laplacian_variance, luma};
pub use face::{DetectorParams, FaceDetector, FaceRegion, create_face_detector};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::sampling::SampledFrame;
use image::RgbImage;
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of the face check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacePresence {
    Detected,
    NotDetected,
    /// Detection disabled, or the frame could not be scored.
    Skipped,
}

impl fmt::Display for FacePresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacePresence::Detected => write!(f, "detected"),
            FacePresence::NotDetected => write!(f, "not detected"),
            FacePresence::Skipped => write!(f, "skipped"),
        }
    }
}

/// Why a frame was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiscardReason {
    Blurry,
    NoFace,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::Blurry => "blurry",
            DiscardReason::NoFace => "no face",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keep, or discard with a non-empty set of reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Discard(BTreeSet<DiscardReason>),
}

impl Disposition {
    pub fn is_keep(&self) -> bool {
        matches!(self, Disposition::Keep)
    }

    /// Discard reasons; empty for kept frames.
    pub fn reasons(&self) -> Vec<DiscardReason> {
        match self {
            Disposition::Keep => Vec::new(),
            Disposition::Discard(reasons) => reasons.iter().copied().collect(),
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Keep => write!(f, "keep"),
            Disposition::Discard(reasons) => {
                let labels: Vec<&str> = reasons.iter().map(DiscardReason::as_str).collect();
                write!(f, "discard: {}", labels.join(", "))
            }
        }
    }
}

/// Decides a frame's disposition.
///
/// A NaN score never passes the threshold.
pub fn decide(blur_score: f64, face: FacePresence, threshold: f64, detect_faces: bool) -> Disposition {
    let mut reasons = BTreeSet::new();
    if !(blur_score >= threshold) {
        reasons.insert(DiscardReason::Blurry);
    }
    if detect_faces && face == FacePresence::NotDetected {
        reasons.insert(DiscardReason::NoFace);
    }

    if reasons.is_empty() {
        Disposition::Keep
    } else {
        Disposition::Discard(reasons)
    }
}

/// A classified frame.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub index: u32,
    pub image: RgbImage,
    pub blur_score: f64,
    pub face: FacePresence,
    pub disposition: Disposition,
}

/// Scores frames and applies the decision policy.
pub struct FrameClassifier {
    threshold: f64,
    detect_faces: bool,
    detector: Option<Box<dyn FaceDetector>>,
}

impl FrameClassifier {
    pub fn new(threshold: f64, detect_faces: bool, detector: Option<Box<dyn FaceDetector>>) -> Self {
        Self {
            threshold,
            detect_faces,
            detector,
        }
    }

    /// Builds a classifier with the run's detector.
    pub fn from_config(config: &CoreConfig) -> CoreResult<Self> {
        let detector = create_face_detector(config)?;
        if let Some(detector) = &detector {
            log::debug!("Using face detector '{}'", detector.name());
        }
        Ok(Self::new(config.blur_threshold, config.detect_faces, detector))
    }

    /// Blur score and face presence for one frame.
    pub fn score(&mut self, image: &RgbImage) -> CoreResult<(f64, FacePresence)> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(CoreError::Classification("frame has no pixels".to_string()));
        }

        let gray = luma(image);
        let blur_score = laplacian_variance(&gray);

        let face = match (&mut self.detector, self.detect_faces) {
            (_, false) => FacePresence::Skipped,
            (None, true) => FacePresence::NotDetected,
            (Some(detector), true) => {
                if detector.detect(&gray)?.is_empty() {
                    FacePresence::NotDetected
                } else {
                    FacePresence::Detected
                }
            }
        };
        Ok((blur_score, face))
    }

    /// Classifies a sampled frame. Never fails.
    pub fn classify(&mut self, frame: SampledFrame) -> FrameRecord {
        let (blur_score, face) = self.score(&frame.image).unwrap_or_else(|e| {
            log::warn!("Frame {} could not be classified: {}", frame.index, e);
            (0.0, FacePresence::Skipped)
        });
        let disposition = decide(blur_score, face, self.threshold, self.detect_faces);

        FrameRecord {
            index: frame.index,
            image: frame.image,
            blur_score,
            face,
            disposition,
        }
    }
}
