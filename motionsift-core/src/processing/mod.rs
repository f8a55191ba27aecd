//! Batch driver and per-file pipeline.
//!
//! `process_motion_photo` runs one file through locate, repair, sample,
//! classify and persist. `process_files` runs a list of files one after the
//! other and aggregates their reports. A failed file never stops the batch.

pub mod pipeline;

pub use pipeline::{process_files, process_motion_photo};

use crate::classify::{DiscardReason, Disposition};
use crate::container::LocatorStrategy;
use crate::sampling::{SamplingStats, StopReason, WorkingBound};
use std::path::PathBuf;
use std::time::Duration;

/// Count of discarded frames per reason. A frame with both reasons counts
/// once in each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReasonTally {
    pub blurry: u32,
    pub no_face: u32,
}

impl ReasonTally {
    pub fn record(&mut self, disposition: &Disposition) {
        for reason in disposition.reasons() {
            match reason {
                DiscardReason::Blurry => self.blurry += 1,
                DiscardReason::NoFace => self.no_face += 1,
            }
        }
    }

    pub fn merge(&mut self, other: &ReasonTally) {
        self.blurry += other.blurry;
        self.no_face += other.no_face;
    }
}

/// Outcome of one file.
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    pub source: PathBuf,
    pub success: bool,
    /// Set when the pipeline stopped on a fatal error.
    pub error: Option<String>,

    // Locator
    pub strategy: Option<LocatorStrategy>,
    pub vendor_marker: Option<&'static str>,
    pub payload_offset: usize,
    pub payload_length: usize,

    // Repair
    pub repaired_by: Option<&'static str>,
    pub repair_attempts: usize,

    // Sampling
    pub bound: Option<WorkingBound>,
    pub sampling: SamplingStats,

    // Classification and output
    pub output_dir: Option<PathBuf>,
    /// Kept frames written to disk.
    pub kept: u32,
    /// Discarded frames written to disk.
    pub discarded: u32,
    pub reasons: ReasonTally,
    pub persist_failures: u32,
    pub blur_report: Option<PathBuf>,

    pub duration: Duration,
}

impl FileReport {
    pub fn new(source: PathBuf) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    /// Frames handed to the classifier.
    pub fn sampled(&self) -> u32 {
        self.sampling.retained
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.sampling.stop_reason
    }

    /// True when sampling hit a safety limit.
    pub fn ended_early(&self) -> bool {
        self.stop_reason().is_some_and(|r| r.is_early())
    }
}

/// Aggregate over a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub reports: Vec<FileReport>,
    pub succeeded: usize,
    pub failed: usize,
    pub frames_sampled: u64,
    pub frames_kept: u64,
    pub frames_discarded: u64,
    pub reasons: ReasonTally,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn add(&mut self, report: FileReport) {
        if report.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.frames_sampled += u64::from(report.sampled());
        self.frames_kept += u64::from(report.kept);
        self.frames_discarded += u64::from(report.discarded);
        self.reasons.merge(&report.reasons);
        self.reports.push(report);
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_tally_counts_each_reason() {
        let mut tally = ReasonTally::default();
        tally.record(&Disposition::Keep);
        tally.record(&Disposition::Discard(BTreeSet::from([
            DiscardReason::Blurry,
            DiscardReason::NoFace,
        ])));
        tally.record(&Disposition::Discard(BTreeSet::from([DiscardReason::Blurry])));
        assert_eq!(tally, ReasonTally { blurry: 2, no_face: 1 });
    }

    #[test]
    fn test_summary_aggregates() {
        let mut summary = BatchSummary::default();
        let mut ok = FileReport::new(PathBuf::from("a.jpg"));
        ok.success = true;
        ok.sampling.retained = 4;
        ok.kept = 3;
        ok.discarded = 1;
        ok.reasons.blurry = 1;
        summary.add(ok);
        summary.add(FileReport::new(PathBuf::from("b.jpg")));

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.frames_sampled, 4);
        assert_eq!(summary.reasons.blurry, 1);
    }
}
