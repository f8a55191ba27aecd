// ============================================================================
// motionsift-core/src/sampling/mod.rs
// ============================================================================
//
// FRAME SAMPLER: Bounded Iteration over Decoded Frames
//
// The sampler pulls decode steps from a `FrameSource` and yields every N-th
// successfully decoded frame with a fresh sequential index. Declared stream
// metadata is never trusted directly: `WorkingBound::validate` turns it into
// an explicit loop bound before iteration starts.
//
// STOP CONDITIONS:
// - decode attempts reach 2 x max_frames (checked first)
// - decode attempts reach the working bound
// - the source reports end of stream
// - 5 consecutive decode failures
// - 10 consecutive empty frames
//
// A successful decode resets both streak counters. Hitting a limit ends the
// sampling loop only; frames yielded so far stay valid.

mod ffmpeg_source;

pub use ffmpeg_source::{FfmpegFrameDecoder, FfmpegFrameSource};

use crate::error::{CoreError, CoreResult};
use image::RgbImage;
use std::fmt;
use std::path::Path;

/// Consecutive decode failures that end sampling.
pub const FAILURE_STREAK_LIMIT: u32 = 5;

/// Consecutive empty frames that end sampling.
pub const EMPTY_STREAK_LIMIT: u32 = 10;

/// Declared frame counts above `max_frames` times this factor are implausible.
pub const PLAUSIBLE_FRAME_FACTOR: u64 = 10;

/// Frame rate reported when the declared one is unusable.
pub const DEFAULT_REPORTING_FPS: f64 = 30.0;

/// Declared rates at or above this are treated as garbage.
pub const MAX_PLAUSIBLE_FPS: f64 = 100.0;

// ============================================================================
// FRAME SOURCES
// ============================================================================

/// Outcome of one decode call.
#[derive(Debug, Clone)]
pub enum DecodeStep {
    /// A complete RGB frame.
    Frame(RgbImage),
    /// The decoder returned a zero-size frame.
    Empty,
    /// The decode call failed.
    Failed(String),
    /// No more frames.
    EndOfStream,
}

/// A stream that yields one decode step per call.
pub trait FrameSource {
    fn next_step(&mut self) -> DecodeStep;
}

/// Opens a repaired video for decoding.
pub trait StreamDecoder {
    type Source: FrameSource;

    /// Fails with `DecodeOpenFailure` if the stream cannot be opened.
    fn open(&self, video: &Path) -> CoreResult<Self::Source>;
}

// ============================================================================
// WORKING BOUND
// ============================================================================

/// Validated iteration bound derived from untrusted stream metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingBound {
    /// Maximum decode attempts before the loop ends normally.
    pub frames: u64,
    /// Frame rate used for reporting only.
    pub fps: f64,
    /// False when `frames` fell back to `max_frames`.
    pub declared_count_trusted: bool,
    /// False when `fps` fell back to the default.
    pub declared_fps_trusted: bool,
}

impl WorkingBound {
    /// Derives the working bound.
    ///
    /// The declared count is used when `0 < declared <= 10 * max_frames`;
    /// otherwise the bound is `max_frames`. The rate falls back to 30 fps when
    /// it is missing, non-positive, non-finite or at least 100.
    pub fn validate(declared_frames: Option<i64>, declared_fps: Option<f64>, max_frames: u32) -> Self {
        let cap = u64::from(max_frames);
        let plausible_limit = cap.saturating_mul(PLAUSIBLE_FRAME_FACTOR);

        let trusted_count = declared_frames
            .and_then(|n| u64::try_from(n).ok())
            .filter(|&n| n > 0 && n <= plausible_limit);

        let trusted_fps = declared_fps.filter(|&fps| fps.is_finite() && fps > 0.0 && fps < MAX_PLAUSIBLE_FPS);

        if trusted_count.is_none() {
            log::warn!(
                "Declared frame count {:?} is not plausible, using {} as the working bound",
                declared_frames,
                cap
            );
        }

        Self {
            frames: trusted_count.unwrap_or(cap),
            fps: trusted_fps.unwrap_or(DEFAULT_REPORTING_FPS),
            declared_count_trusted: trusted_count.is_some(),
            declared_fps_trusted: trusted_fps.is_some(),
        }
    }

    /// Estimated clip duration in seconds, for reporting.
    pub fn estimated_duration_secs(&self) -> f64 {
        self.frames as f64 / self.fps
    }
}

// ============================================================================
// SAMPLER
// ============================================================================

/// Why the sampling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    WorkingBoundReached,
    FailureStreak,
    EmptyStreak,
    HardStop,
}

impl StopReason {
    /// True if sampling ended before the stream was exhausted.
    pub fn is_early(&self) -> bool {
        matches!(
            self,
            StopReason::FailureStreak | StopReason::EmptyStreak | StopReason::HardStop
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::EndOfStream => "end of stream",
            StopReason::WorkingBoundReached => "working bound reached",
            StopReason::FailureStreak => "too many consecutive decode failures",
            StopReason::EmptyStreak => "too many consecutive empty frames",
            StopReason::HardStop => "decode attempt limit reached",
        };
        f.write_str(text)
    }
}

/// A retained frame, not yet classified.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Sequential index among retained frames, starting at 0.
    pub index: u32,
    /// Zero-based decode attempt that produced the frame.
    pub decode_position: u64,
    pub image: RgbImage,
}

/// Counters collected while sampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    pub attempts: u64,
    pub decoded: u64,
    pub failures: u64,
    pub empty: u64,
    pub retained: u32,
    pub stop_reason: Option<StopReason>,
}

/// Lazy, finite, non-restartable sequence of sampled frames.
pub struct FrameSampler<S: FrameSource> {
    source: S,
    interval: u64,
    bound: u64,
    hard_limit: u64,
    failure_streak: u32,
    empty_streak: u32,
    last_failure: Option<CoreError>,
    stats: SamplingStats,
}

impl<S: FrameSource> FrameSampler<S> {
    /// Creates a sampler. `interval` and `max_frames` are clamped to at least 1.
    pub fn new(source: S, bound: &WorkingBound, interval: u32, max_frames: u32) -> Self {
        Self {
            source,
            interval: u64::from(interval.max(1)),
            bound: bound.frames,
            hard_limit: u64::from(max_frames.max(1)) * 2,
            failure_streak: 0,
            empty_streak: 0,
            last_failure: None,
            stats: SamplingStats::default(),
        }
    }

    pub fn stats(&self) -> &SamplingStats {
        &self.stats
    }

    /// The most recent failed decode call, if any.
    pub fn last_failure(&self) -> Option<&CoreError> {
        self.last_failure.as_ref()
    }

    /// Ends sampling and releases the source.
    pub fn finish(self) -> SamplingStats {
        self.stats
    }

    fn stop(&mut self, reason: StopReason) -> Option<SampledFrame> {
        match reason {
            StopReason::EndOfStream | StopReason::WorkingBoundReached => {
                log::debug!("Sampling finished: {}", reason)
            }
            StopReason::FailureStreak => log::warn!(
                "Sampling stopped early after {} attempts: {} ({})",
                self.stats.attempts,
                reason,
                self.last_failure
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            ),
            _ => log::warn!(
                "Sampling stopped early after {} attempts: {}",
                self.stats.attempts,
                reason
            ),
        }
        self.stats.stop_reason = Some(reason);
        None
    }
}

impl<S: FrameSource> Iterator for FrameSampler<S> {
    type Item = SampledFrame;

    fn next(&mut self) -> Option<SampledFrame> {
        if self.stats.stop_reason.is_some() {
            return None;
        }

        loop {
            if self.stats.attempts >= self.hard_limit {
                return self.stop(StopReason::HardStop);
            }
            if self.stats.attempts >= self.bound {
                return self.stop(StopReason::WorkingBoundReached);
            }

            let position = self.stats.attempts;
            let step = self.source.next_step();
            if !matches!(step, DecodeStep::EndOfStream) {
                self.stats.attempts += 1;
            }

            match step {
                DecodeStep::EndOfStream => return self.stop(StopReason::EndOfStream),
                DecodeStep::Failed(reason) => {
                    self.stats.failures += 1;
                    self.failure_streak += 1;
                    let error = CoreError::FrameDecode(reason);
                    log::debug!("Position {}: {}", position, error);
                    self.last_failure = Some(error);
                    if self.failure_streak >= FAILURE_STREAK_LIMIT {
                        return self.stop(StopReason::FailureStreak);
                    }
                }
                DecodeStep::Empty => {
                    self.stats.empty += 1;
                    self.empty_streak += 1;
                    if self.empty_streak >= EMPTY_STREAK_LIMIT {
                        return self.stop(StopReason::EmptyStreak);
                    }
                }
                DecodeStep::Frame(image) => {
                    self.failure_streak = 0;
                    self.empty_streak = 0;
                    let ordinal = self.stats.decoded;
                    self.stats.decoded += 1;

                    if ordinal % self.interval == 0 {
                        let index = self.stats.retained;
                        self.stats.retained += 1;
                        return Some(SampledFrame {
                            index,
                            decode_position: position,
                            image,
                        });
                    }
                }
            }
        }
    }
}
