// motionsift-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// This module is only compiled for tests or with the "test-mocks" feature.

use super::{FfmpegEventStream, FfmpegProcess, FfmpegSpawner, StreamMetadata, StreamProber};
use crate::error::{CoreError, CoreResult};
use crate::sampling::{DecodeStep, FrameSource, StreamDecoder};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

/// Bytes written by the mock spawner when it fakes an output file.
pub const DUMMY_OUTPUT: &[u8] = b"\x00\x00\x00\x18ftypisom mock output";

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

/// Mock implementation of FfmpegProcess.
#[derive(Clone)]
pub struct MockFfmpegProcess {
    /// Events to emit when the event stream is taken.
    pub events_to_emit: Rc<RefCell<Vec<FfmpegEvent>>>,
    /// Exit status to return when wait is called.
    pub exit_status: ExitStatus,
    /// Set once `kill` was called.
    pub killed: Rc<RefCell<bool>>,
}

impl MockFfmpegProcess {
    /// A process that emits `events` and exits with status 0.
    pub fn with_events(events: Vec<FfmpegEvent>) -> Self {
        Self {
            events_to_emit: Rc::new(RefCell::new(events)),
            exit_status: exit_status(0),
            killed: Rc::new(RefCell::new(false)),
        }
    }
}

impl FfmpegProcess for MockFfmpegProcess {
    fn events(&mut self) -> CoreResult<FfmpegEventStream> {
        let events = std::mem::take(&mut *self.events_to_emit.borrow_mut());
        Ok(Box::new(events.into_iter()))
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(self.exit_status)
    }

    fn kill(&mut self) -> CoreResult<()> {
        *self.killed.borrow_mut() = true;
        Ok(())
    }
}

/// What the mock writes to the command's output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyOutput {
    None,
    Empty,
    NonEmpty,
}

/// Represents an expected ffmpeg command call and its mock result.
pub struct MockFfmpegExpectation {
    pub arg_pattern: String,
    pub result: CoreResult<MockFfmpegProcess>,
    pub output: DummyOutput,
}

/// Mock implementation of FfmpegSpawner supporting multiple expectations.
///
/// Each spawn consumes the first expectation whose pattern is contained in
/// any argument. A spawn without a matching expectation panics.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_expectation(
        &self,
        arg_pattern: &str,
        result: CoreResult<MockFfmpegProcess>,
        output: DummyOutput,
    ) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result,
            output,
        });
    }

    fn process(events: Vec<FfmpegEvent>, exit_code: i32) -> MockFfmpegProcess {
        MockFfmpegProcess {
            events_to_emit: Rc::new(RefCell::new(events)),
            exit_status: exit_status(exit_code),
            killed: Rc::new(RefCell::new(false)),
        }
    }

    /// Exit 0 and a non-empty output file.
    pub fn add_success_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>) {
        self.add_expectation(arg_pattern, Ok(Self::process(events, 0)), DummyOutput::NonEmpty);
    }

    /// Exit 0 but a zero-byte output file.
    pub fn add_empty_output_expectation(&self, arg_pattern: &str) {
        self.add_expectation(arg_pattern, Ok(Self::process(Vec::new(), 0)), DummyOutput::Empty);
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.add_expectation(arg_pattern, Err(error), DummyOutput::None);
    }

    /// Non-zero exit. `stderr` lines are emitted as error-level log events.
    pub fn add_exit_error_expectation(&self, arg_pattern: &str, stderr: &[&str], exit_code: i32) {
        let events = stderr
            .iter()
            .map(|line| FfmpegEvent::Log(LogLevel::Error, line.to_string()))
            .collect();
        self.add_expectation(
            arg_pattern,
            Ok(Self::process(events, exit_code)),
            DummyOutput::None,
        );
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }

    pub fn pending_expectations(&self) -> usize {
        self.expectations.borrow().len()
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let args: Vec<String> = cmd
            .get_args()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        self.received_calls.borrow_mut().push(args.clone());

        let mut expectations = self.expectations.borrow_mut();
        let found_index = expectations
            .iter()
            .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)));

        let Some(index) = found_index else {
            panic!("MockFfmpegSpawner: No expectation found for command args: {:?}", args);
        };
        let expectation = expectations.remove(index);
        log::info!(
            "MockFfmpegSpawner: Matched expectation with pattern '{}'",
            expectation.arg_pattern
        );

        let process = expectation.result?;
        let contents: Option<&[u8]> = match expectation.output {
            DummyOutput::None => None,
            DummyOutput::Empty => Some(&[]),
            DummyOutput::NonEmpty => Some(DUMMY_OUTPUT),
        };
        if let (Some(contents), Some(output)) = (contents, args.last()) {
            let output_path = PathBuf::from(output);
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output_path, contents)?;
            log::info!("MockFfmpegSpawner created dummy output file: {:?}", output_path);
        }
        Ok(process)
    }
}

/// Mock implementation of StreamProber.
#[derive(Clone, Default)]
pub struct MockStreamProber {
    results: Rc<RefCell<HashMap<PathBuf, StreamMetadata>>>,
    fallback: Rc<RefCell<Option<StreamMetadata>>>,
    calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl MockStreamProber {
    pub fn new() -> Self {
        Default::default()
    }

    /// Metadata returned for any path without a specific expectation.
    pub fn with_default(metadata: StreamMetadata) -> Self {
        let prober = Self::new();
        *prober.fallback.borrow_mut() = Some(metadata);
        prober
    }

    pub fn expect_metadata(&self, input_path: &Path, metadata: StreamMetadata) {
        self.results
            .borrow_mut()
            .insert(input_path.to_path_buf(), metadata);
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.borrow().clone()
    }
}

impl StreamProber for MockStreamProber {
    fn probe_video(&self, input_path: &Path) -> CoreResult<StreamMetadata> {
        self.calls.borrow_mut().push(input_path.to_path_buf());
        if let Some(metadata) = self.results.borrow().get(input_path) {
            return Ok(metadata.clone());
        }
        self.fallback.borrow().clone().ok_or_else(|| {
            CoreError::FfprobeParse(format!(
                "MockStreamProber: No expectation set for path {}",
                input_path.display()
            ))
        })
    }
}

/// Frame source replaying a fixed list of decode steps, then end of stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFrameSource {
    steps: VecDeque<DecodeStep>,
    repeat_last: bool,
    calls: u64,
}

impl ScriptedFrameSource {
    pub fn new(steps: Vec<DecodeStep>) -> Self {
        Self {
            steps: steps.into(),
            repeat_last: false,
            calls: 0,
        }
    }

    /// Keeps returning the final step forever instead of ending the stream.
    pub fn never_ending(steps: Vec<DecodeStep>) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(steps)
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl FrameSource for ScriptedFrameSource {
    fn next_step(&mut self) -> DecodeStep {
        self.calls += 1;
        if self.repeat_last && self.steps.len() == 1 {
            if let Some(step) = self.steps.front() {
                return step.clone();
            }
        }
        self.steps.pop_front().unwrap_or(DecodeStep::EndOfStream)
    }
}

/// Decoder handing out a copy of one script per opened stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecoder {
    script: ScriptedFrameSource,
    fail_open: bool,
    opened: Rc<RefCell<Vec<PathBuf>>>,
}

impl ScriptedDecoder {
    pub fn new(script: ScriptedFrameSource) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    /// Every `open` fails with `DecodeOpenFailure`.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }
}

impl StreamDecoder for ScriptedDecoder {
    type Source = ScriptedFrameSource;

    fn open(&self, video: &Path) -> CoreResult<Self::Source> {
        self.opened.borrow_mut().push(video.to_path_buf());
        if self.fail_open {
            return Err(CoreError::DecodeOpenFailure(format!(
                "ScriptedDecoder: cannot open {}",
                video.display()
            )));
        }
        Ok(self.script.clone())
    }
}
