//! Core library for recovering the video clip embedded in motion photos and
//! curating its frames.
//!
//! The pipeline locates the video payload inside the container bytes,
//! repairs it with a chain of ffmpeg remux/re-encode stages, samples decoded
//! frames under safety limits, and sorts each frame by sharpness and face
//! presence into a per-file output directory.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use motionsift_core::config::CoreConfigBuilder;
//! use motionsift_core::external::{CrateStreamProber, SidecarSpawner};
//! use motionsift_core::repair::SidecarTranscoder;
//! use motionsift_core::sampling::FfmpegFrameDecoder;
//! use motionsift_core::{find_processable_files, process_files};
//! use std::path::{Path, PathBuf};
//!
//! let config = CoreConfigBuilder::new()
//!     .output_dir(PathBuf::from("/path/to/frames"))
//!     .blur_threshold(120.0)
//!     .build();
//!
//! let files = find_processable_files(Path::new("/path/to/photos"), true).unwrap();
//!
//! let summary = process_files(
//!     &SidecarTranscoder::new(SidecarSpawner),
//!     &CrateStreamProber::new(),
//!     &FfmpegFrameDecoder::new(SidecarSpawner),
//!     &config,
//!     &files,
//!     |_, report| println!("{}: {}", report.source.display(), report.success),
//! )
//! .unwrap();
//! println!("{} of {} files recovered", summary.succeeded, summary.total());
//! ```

pub mod classify;
pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod external;
pub mod output;
pub mod processing;
pub mod repair;
pub mod sampling;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use classify::{DiscardReason, Disposition, FacePresence, FrameClassifier, FrameRecord, decide};
pub use config::{CoreConfig, CoreConfigBuilder, DisposalMode, FrameFormat};
pub use container::{LocatedPayload, LocatorStrategy, MotionPhotoFile, locate_payload};
pub use discovery::find_processable_files;
pub use error::{CoreError, CoreResult};
pub use output::{OutputLayout, OutputOrganizer};
pub use processing::{BatchSummary, FileReport, ReasonTally, process_files, process_motion_photo};
pub use repair::{RepairAttempt, RepairChain, RepairedVideo};
pub use sampling::{FrameSampler, SampledFrame, StopReason, WorkingBound};
pub use temp_files::{create_temp_dir, create_temp_file_path};
pub use utils::{format_bytes, format_duration};
