// ============================================================================
// motionsift-core/src/processing/pipeline.rs
// ============================================================================
//
// PIPELINE: Per-File Recovery and Curation, and the Batch Loop
//
// WORKFLOW (one file):
// 1. Read the file and locate the embedded payload
// 2. Write the payload into a per-file temporary directory
// 3. Run the repair chain into the same directory
// 4. Probe the repaired stream and derive the working bound
// 5. Sample frames, classify each one, persist it
// 6. Drop the temporary directory
//
// Only the fatal kinds (no container, empty payload, exhausted chain, stream
// that cannot be opened, I/O on the input) end a file early. Persist and
// classification problems are logged per frame, and a frame counts as kept
// or discarded only once it is on disk. A file whose frames all failed to
// persist is failed.
//
// The collaborators (transcoder, prober, decoder) are passed in, so the same
// code runs against ffmpeg or against the mocks in `external::mocks`.

use super::{BatchSummary, FileReport};
use crate::classify::FrameClassifier;
use crate::config::CoreConfig;
use crate::container::{MotionPhotoFile, locate_payload};
use crate::error::{CoreError, CoreResult};
use crate::external::StreamProber;
use crate::output::{OutputLayout, OutputOrganizer};
use crate::repair::{RepairChain, Transcoder};
use crate::sampling::{FrameSampler, StreamDecoder, WorkingBound};
use crate::temp_files;
use crate::utils::{file_name_lossy, format_bytes};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Name of the payload file inside the per-file temporary directory.
const PAYLOAD_FILE: &str = "payload.bin";

/// Name of the repaired stream inside the per-file temporary directory.
const REPAIRED_FILE: &str = "repaired.mp4";

/// Runs one motion photo through the whole pipeline.
///
/// Never returns `Err` for a per-file problem: fatal errors are recorded in
/// the report with `success == false`. Temporary files are gone by the time
/// this returns.
pub fn process_motion_photo<T, P, D>(
    transcoder: &T,
    prober: &P,
    decoder: &D,
    chain: &RepairChain,
    classifier: &mut FrameClassifier,
    config: &CoreConfig,
    input: &Path,
) -> FileReport
where
    T: Transcoder,
    P: StreamProber,
    D: StreamDecoder,
{
    let started = Instant::now();
    let mut report = FileReport::new(input.to_path_buf());

    match run(transcoder, prober, decoder, chain, classifier, config, input, &mut report) {
        Ok(()) => {
            report.success = true;
            if report.sampled() == 0 {
                log::warn!("{}: no frames could be sampled", file_name_lossy(input));
            }
        }
        Err(e) => {
            // Fatal kinds come from the input itself
            if e.is_fatal_for_file() {
                log::warn!("{}: skipped: {}", file_name_lossy(input), e);
            } else {
                log::error!("{}: {}", file_name_lossy(input), e);
            }
            report.success = false;
            report.error = Some(e.to_string());
        }
    }

    report.duration = started.elapsed();
    report
}

#[allow(clippy::too_many_arguments)]
fn run<T, P, D>(
    transcoder: &T,
    prober: &P,
    decoder: &D,
    chain: &RepairChain,
    classifier: &mut FrameClassifier,
    config: &CoreConfig,
    input: &Path,
    report: &mut FileReport,
) -> CoreResult<()>
where
    T: Transcoder,
    P: StreamProber,
    D: StreamDecoder,
{
    let name = file_name_lossy(input);

    // ---- Locate ----
    let file = MotionPhotoFile::open(input)?;
    let payload = locate_payload(&file)?;
    report.strategy = Some(payload.strategy());
    report.vendor_marker = payload.vendor_marker();
    report.payload_offset = payload.offset();
    report.payload_length = payload.length();
    log::info!(
        "{}: payload at offset {} ({}) via {}",
        name,
        payload.offset(),
        format_bytes(payload.length() as u64),
        payload.strategy()
    );

    let temp_dir = temp_files::create_temp_dir(config, "motionsift_")?;
    let payload_path = temp_dir.path().join(PAYLOAD_FILE);
    fs::write(&payload_path, payload.slice(&file))?;
    drop(file);

    // ---- Repair ----
    let attempts_dir = temp_dir.path().join("attempts");
    fs::create_dir_all(&attempts_dir)?;
    let repaired_path = temp_dir.path().join(REPAIRED_FILE);
    let repaired = chain.run(transcoder, &payload_path, &attempts_dir, &repaired_path);
    let repaired = match repaired {
        Ok(repaired) => repaired,
        Err(e) => {
            if let CoreError::RepairChainExhausted { stages, .. } = &e {
                report.repair_attempts = *stages;
            }
            return Err(e);
        }
    };
    report.repaired_by = Some(repaired.stage);
    report.repair_attempts = repaired.attempts.len();

    // ---- Open for decode ----
    let metadata = prober
        .probe_video(&repaired.path)
        .map_err(|e| CoreError::DecodeOpenFailure(format!("{}: {}", name, e)))?;
    let bound = WorkingBound::validate(metadata.declared_frames, metadata.declared_fps, config.max_frames);
    report.bound = Some(bound);
    log::info!(
        "{}: {}x{} {:.2} fps, up to {} frames (~{:.1}s)",
        name,
        metadata.width.unwrap_or(0),
        metadata.height.unwrap_or(0),
        bound.fps,
        bound.frames,
        bound.estimated_duration_secs()
    );

    let source = decoder.open(&repaired.path).map_err(|e| match e {
        CoreError::DecodeOpenFailure(_) => e,
        other => CoreError::DecodeOpenFailure(format!("{}: {}", name, other)),
    })?;

    // ---- Sample, classify, persist ----
    let layout = OutputLayout::claim(&config.output_dir, input)?;
    let output_root = layout.root.clone();
    report.output_dir = Some(output_root.clone());
    let mut organizer = OutputOrganizer::create(
        layout,
        config.disposal_mode,
        config.frame_format,
        config.keep_blur_info,
    )?;

    let mut sampler = FrameSampler::new(source, &bound, config.extraction_interval, config.max_frames);
    for frame in sampler.by_ref() {
        let record = classifier.classify(frame);
        if let Err(e) = organizer.persist(&record) {
            report.persist_failures += 1;
            log::warn!("{}: {}", name, e);
            continue;
        }

        if record.disposition.is_keep() {
            report.kept += 1;
            log::debug!("frame {:04}: keep (blur {:.2}, face {})", record.index, record.blur_score, record.face);
        } else {
            report.discarded += 1;
            report.reasons.record(&record.disposition);
            log::debug!(
                "frame {:04}: {} (blur {:.2}, face {})",
                record.index,
                record.disposition,
                record.blur_score,
                record.face
            );
        }
    }
    report.sampling = sampler.finish();

    if report.persist_failures > 0 && report.kept + report.discarded == 0 {
        return Err(CoreError::Persist(
            output_root,
            format!("none of {} sampled frames could be written", report.sampled()),
        ));
    }

    match organizer.finish() {
        Ok(path) => report.blur_report = path,
        Err(e) => {
            report.persist_failures += 1;
            log::warn!("{}: {}", name, e);
        }
    }

    log::info!(
        "{}: sampled {}, kept {}, discarded {} (blurry {}, no face {})",
        name,
        report.sampled(),
        report.kept,
        report.discarded,
        report.reasons.blurry,
        report.reasons.no_face
    );

    drop(temp_dir);
    Ok(())
}

/// Processes files one after the other.
///
/// `on_file` sees each report after that file's temporary files are removed.
///
/// # Arguments
///
/// * `transcoder` - Runs repair stages
/// * `prober` - Reads repaired-stream metadata
/// * `decoder` - Opens repaired streams for frame decoding
/// * `config` - Validated run configuration
/// * `files` - Inputs, processed in order
/// * `on_file` - Progress callback
///
/// # Returns
///
/// * `Ok(BatchSummary)` - Aggregate counts plus every file's report
/// * `Err(CoreError)` - Invalid configuration, or the face detector could not
///   be built; no file was touched
pub fn process_files<T, P, D, F>(
    transcoder: &T,
    prober: &P,
    decoder: &D,
    config: &CoreConfig,
    files: &[PathBuf],
    mut on_file: F,
) -> CoreResult<BatchSummary>
where
    T: Transcoder,
    P: StreamProber,
    D: StreamDecoder,
    F: FnMut(usize, &FileReport),
{
    config.validate()?;
    let started = Instant::now();
    let chain = RepairChain::standard(config);
    let mut classifier = FrameClassifier::from_config(config)?;

    let mut summary = BatchSummary::default();
    for (index, file) in files.iter().enumerate() {
        log::info!("Processing [{}/{}] {}", index + 1, files.len(), file.display());
        let report = process_motion_photo(
            transcoder,
            prober,
            decoder,
            &chain,
            &mut classifier,
            config,
            file,
        );
        on_file(index, &report);
        summary.add(report);
    }

    summary.duration = started.elapsed();
    Ok(summary)
}
