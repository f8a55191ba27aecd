//! Implementation of the 'extract' subcommand.
//!
//! Resolves the run configuration (flags over config file over defaults),
//! discovers the input files, checks that a face detector and ffmpeg/ffprobe
//! are available and hands the batch to motionsift-core. Per-file results are printed once the batch is done.

use crate::cli::ExtractArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::terminal;

use motionsift_core::classify::create_face_detector;
use motionsift_core::config::{ConfigFile, DisposalMode};
use motionsift_core::external::{CrateStreamProber, SidecarSpawner, check_required_tools};
use motionsift_core::repair::SidecarTranscoder;
use motionsift_core::sampling::FfmpegFrameDecoder;
use motionsift_core::{BatchSummary, CoreConfig, CoreError, FileReport, format_duration};

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

/// Everything a run needs once flags and config file are merged.
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    pub input_path: PathBuf,
    pub recursive: bool,
    pub config: CoreConfig,
    pub config_file: Option<PathBuf>,
}

/// Merges flags over the config file over built-in defaults.
pub fn resolve_run(args: &ExtractArgs, file: Option<(PathBuf, ConfigFile)>) -> CliResult<ResolvedRun> {
    let (config_file, file) = match file {
        Some((path, parsed)) => (Some(path), parsed),
        None => (None, ConfigFile::default()),
    };

    let input_path = args
        .input_path
        .clone()
        .or_else(|| file.input.clone())
        .cli_with_context(|| "No input path given (pass INPUT_PATH or set \"input\" in the config file)")?;

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| file.output.clone())
        .cli_with_context(|| "No output directory given (pass --output or set \"output\" in the config file)")?;

    let mut config = CoreConfig::new(output_dir.clone());
    file.apply_to(&mut config);
    config.output_dir = output_dir;

    if let Some(interval) = args.interval {
        config.extraction_interval = interval;
    }
    if let Some(max_frames) = args.max_frames {
        config.max_frames = max_frames;
    }
    if let Some(threshold) = args.blur_threshold {
        config.blur_threshold = threshold;
    }
    if args.no_face_detect {
        config.detect_faces = false;
    }
    if let Some(cascade) = &args.face_cascade {
        config.face_cascade_path = Some(cascade.clone());
    }
    if args.annotate {
        config.disposal_mode = DisposalMode::Annotate;
    } else if let Some(mode) = args.disposal_mode {
        config.disposal_mode = mode.into();
    }
    if let Some(format) = args.frame_format {
        config.frame_format = format.into();
    }
    if args.keep_blur_info {
        config.keep_blur_info = true;
    }
    if let Some(raw) = &args.raw_format {
        config.raw_stream_format = raw.clone();
    }
    if let Some(temp_dir) = &args.temp_dir {
        config.temp_dir = Some(temp_dir.clone());
    }

    config.validate()?;

    Ok(ResolvedRun {
        input_path,
        recursive: args.recursive || file.recursive.unwrap_or(false),
        config,
        config_file,
    })
}

/// Expands the input path into the list of files to process.
///
/// A directory is scanned for supported extensions; a single file is taken
/// as-is whatever its extension.
pub fn discover_input_files(input: &Path, recursive: bool) -> CliResult<Vec<PathBuf>> {
    let input_path = input
        .canonicalize()
        .cli_with_context(|| format!("Invalid input path '{}'", input.display()))?;

    let metadata = fs::metadata(&input_path)
        .cli_with_context(|| format!("Failed to access input path '{}'", input_path.display()))?;

    if metadata.is_dir() {
        motionsift_core::find_processable_files(&input_path, recursive)
    } else if metadata.is_file() {
        Ok(vec![input_path])
    } else {
        Err(CoreError::OperationFailed(format!(
            "Input path '{}' is neither a file nor a directory",
            input_path.display()
        )))
    }
}

/// Message explaining a non-zero exit, if the batch warrants one.
pub fn failure_message(summary: &BatchSummary) -> Option<String> {
    if summary.failed > 0 {
        Some(format!(
            "{} of {} file(s) could not be processed",
            summary.failed,
            summary.total()
        ))
    } else if summary.succeeded == 0 {
        Some("No files were processed".to_string())
    } else {
        None
    }
}

fn display_run_info(run: &ResolvedRun, file_count: usize, log_file: Option<&Path>) {
    let config = &run.config;
    terminal::print_section("Initialization");
    terminal::print_status("Input", &run.input_path.display().to_string(), false);
    terminal::print_status("Output", &config.output_dir.display().to_string(), false);
    terminal::print_status("Files", &file_count.to_string(), true);
    if let Some(path) = &run.config_file {
        terminal::print_status("Config file", &path.display().to_string(), false);
    }
    if let Some(path) = log_file {
        terminal::print_status("Log file", &path.display().to_string(), false);
    }
    terminal::print_status("Blur threshold", &format!("{:.1}", config.blur_threshold), false);
    terminal::print_status(
        "Face detection",
        if config.detect_faces { "on" } else { "off" },
        false,
    );
    terminal::print_status("Interval", &config.extraction_interval.to_string(), false);
    terminal::print_status("Max frames", &config.max_frames.to_string(), false);
    terminal::print_status("Disposal", &config.disposal_mode.to_string(), false);
}

fn display_file_report(report: &FileReport) {
    let name = motionsift_core::utils::file_name_lossy(&report.source);
    terminal::print_subsection(&name);

    if !report.success {
        terminal::print_status(
            "Failed",
            report.error.as_deref().unwrap_or("unknown error"),
            true,
        );
        return;
    }

    if let Some(strategy) = report.strategy {
        terminal::print_status("Located by", &strategy.to_string(), false);
    }
    if let Some(stage) = report.repaired_by {
        terminal::print_status("Repaired by", stage, false);
    }
    terminal::print_status("Sampled", &report.sampled().to_string(), false);
    terminal::print_status("Kept", &report.kept.to_string(), true);
    terminal::print_status(
        "Discarded",
        &format!(
            "{} (blurry {}, no face {})",
            report.discarded, report.reasons.blurry, report.reasons.no_face
        ),
        false,
    );
    if report.ended_early() {
        if let Some(reason) = report.stop_reason() {
            terminal::print_warning(&format!("Sampling ended early: {reason}"));
        }
    }
    if report.persist_failures > 0 {
        terminal::print_warning(&format!("{} frame(s) could not be written", report.persist_failures));
    }
    if let Some(dir) = &report.output_dir {
        terminal::print_status("Frames", &dir.display().to_string(), false);
    }
}

fn display_summary(summary: &BatchSummary) {
    terminal::print_section("Summary");
    for report in &summary.reports {
        display_file_report(report);
    }

    if summary.succeeded > 0 {
        terminal::print_success(&format!(
            "Processed {} of {} file(s)",
            summary.succeeded,
            summary.total()
        ));
    }
    if summary.failed > 0 {
        terminal::print_warning(&format!("{} file(s) failed", summary.failed));
    }
    terminal::print_status("Frames sampled", &summary.frames_sampled.to_string(), false);
    terminal::print_status("Frames kept", &summary.frames_kept.to_string(), true);
    terminal::print_status(
        "Discarded",
        &format!(
            "{} (blurry {}, no face {})",
            summary.frames_discarded, summary.reasons.blurry, summary.reasons.no_face
        ),
        false,
    );
    terminal::print_status("Total time", &format_duration(summary.duration), true);
}

/// Runs the extraction pipeline and reports results.
pub fn run_extract(args: ExtractArgs, log_file: Option<&Path>) -> CliResult<BatchSummary> {
    let discovered = ConfigFile::discover(args.config.as_deref())?;
    let run = resolve_run(&args, discovered)?;
    let files = discover_input_files(&run.input_path, run.recursive)?;

    display_run_info(&run, files.len(), log_file);
    debug!("Resolved configuration: {:?}", run.config);

    if let Err(e) = create_face_detector(&run.config) {
        terminal::print_error(
            "Face detection unavailable",
            &e.to_string(),
            Some("Pass --no-face-detect, or build motionsift with `--features opencv`"),
        );
        return Err(e);
    }

    check_required_tools()?;
    info!("External dependency check passed.");

    fs::create_dir_all(&run.config.output_dir).cli_with_context(|| {
        format!(
            "Failed to create output directory '{}'",
            run.config.output_dir.display()
        )
    })?;

    let progress = terminal::batch_progress_bar(files.len());
    let result = motionsift_core::process_files(
        &SidecarTranscoder::new(SidecarSpawner),
        &CrateStreamProber::new(),
        &FfmpegFrameDecoder::new(SidecarSpawner),
        &run.config,
        &files,
        |_, report| {
            progress.inc(1);
            progress.set_message(motionsift_core::utils::file_name_lossy(&report.source));
        },
    );
    progress.finish_and_clear();

    match result {
        Ok(summary) => {
            display_summary(&summary);
            Ok(summary)
        }
        Err(e) => {
            terminal::print_error("Fatal error during processing", &e.to_string(), None);
            Err(e)
        }
    }
}
