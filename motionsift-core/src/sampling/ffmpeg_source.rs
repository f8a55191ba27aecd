//! Frame decoding through an ffmpeg subprocess.
//!
//! ffmpeg writes `rgb24` raw video to stdout; ffmpeg-sidecar slices it into
//! `OutputFrame` events. A damaged frame makes ffmpeg print several error
//! lines and usually still emit a concealed frame, so every error line seen
//! between two frames is merged into a single failed decode call.

use super::{DecodeStep, FrameSource, StreamDecoder};
use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg_executor::{FfmpegEventStream, FfmpegProcess, FfmpegSpawner, diagnostic_line};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, OutputVideoFrame};
use image::RgbImage;
use std::path::Path;

/// Opens repaired videos with an ffmpeg decode process.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameDecoder<S: FfmpegSpawner> {
    spawner: S,
}

impl<S: FfmpegSpawner> FfmpegFrameDecoder<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

/// Builds the rawvideo decode command for `video`.
pub fn build_decode_command(video: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new();
    cmd.arg("-hide_banner");
    cmd.input(video.to_string_lossy().as_ref());
    cmd.args(["-an", "-sn", "-f", "rawvideo", "-pix_fmt", "rgb24"]);
    cmd.output("-");
    cmd
}

impl<S: FfmpegSpawner> StreamDecoder for FfmpegFrameDecoder<S> {
    type Source = FfmpegFrameSource<S::Process>;

    fn open(&self, video: &Path) -> CoreResult<Self::Source> {
        let cmd = build_decode_command(video);
        log::debug!("Running frame decode command: {:?}", cmd);

        let mut process = self.spawner.spawn(cmd).map_err(|e| {
            CoreError::DecodeOpenFailure(format!("{}: {}", video.display(), e))
        })?;
        let events = process.events().map_err(|e| {
            CoreError::DecodeOpenFailure(format!("{}: {}", video.display(), e))
        })?;

        Ok(FfmpegFrameSource {
            process,
            events,
            diagnostics: Vec::new(),
            pending: None,
            drained: false,
            finished: false,
        })
    }
}

/// A running ffmpeg decode. The process is killed if dropped before the end.
pub struct FfmpegFrameSource<P: FfmpegProcess> {
    process: P,
    events: FfmpegEventStream,
    /// Error lines since the last frame.
    diagnostics: Vec<String>,
    /// Frame held back while its diagnostics are reported.
    pending: Option<DecodeStep>,
    /// The event stream has ended.
    drained: bool,
    /// The process has been waited on.
    finished: bool,
}

impl<P: FfmpegProcess> FfmpegFrameSource<P> {
    /// One failed step for everything collected since the last frame.
    fn take_diagnostics(&mut self) -> Option<String> {
        if self.diagnostics.is_empty() {
            return None;
        }
        let text = self.diagnostics.join(" | ");
        self.diagnostics.clear();
        Some(text)
    }

    fn frame_step(frame: OutputVideoFrame) -> DecodeStep {
        if frame.width == 0 || frame.height == 0 || frame.data.is_empty() {
            return DecodeStep::Empty;
        }
        let (width, height) = (frame.width, frame.height);
        match RgbImage::from_raw(width, height, frame.data) {
            Some(image) => DecodeStep::Frame(image),
            None => DecodeStep::Failed(format!(
                "frame {} is truncated for {}x{} rgb24",
                frame.frame_num, width, height
            )),
        }
    }
}

impl<P: FfmpegProcess> FrameSource for FfmpegFrameSource<P> {
    fn next_step(&mut self) -> DecodeStep {
        if let Some(step) = self.pending.take() {
            return step;
        }
        if self.finished {
            return DecodeStep::EndOfStream;
        }

        if !self.drained {
            while let Some(event) = self.events.next() {
                match event {
                    FfmpegEvent::OutputFrame(frame) => {
                        let step = Self::frame_step(frame);
                        return match (self.take_diagnostics(), step) {
                            (None, step) => step,
                            (Some(text), DecodeStep::Failed(reason)) => {
                                DecodeStep::Failed(format!("{text} | {reason}"))
                            }
                            (Some(text), step) => {
                                self.pending = Some(step);
                                DecodeStep::Failed(text)
                            }
                        };
                    }
                    FfmpegEvent::Done => break,
                    other => {
                        if let Some(line) = diagnostic_line(&other) {
                            log::trace!("ffmpeg decode: {}", line);
                            self.diagnostics.push(line.to_string());
                        }
                    }
                }
            }

            self.drained = true;
            if let Some(text) = self.take_diagnostics() {
                return DecodeStep::Failed(text);
            }
        }

        self.finished = true;
        if let Err(e) = self.process.wait() {
            log::debug!("Decoder exit not observed: {}", e);
        }
        DecodeStep::EndOfStream
    }
}

impl<P: FfmpegProcess> Drop for FfmpegFrameSource<P> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.process.kill() {
                log::debug!("Failed to stop decoder: {}", e);
            }
            let _ = self.process.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::{DummyOutput, MockFfmpegProcess, MockFfmpegSpawner};
    use crate::sampling::{FrameSampler, StopReason, WorkingBound};
    use ffmpeg_sidecar::event::LogLevel;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn rgb_frame(frame_num: u32) -> FfmpegEvent {
        FfmpegEvent::OutputFrame(OutputVideoFrame {
            width: 4,
            height: 2,
            pix_fmt: "rgb24".to_string(),
            output_index: 0,
            data: vec![128; 4 * 2 * 3],
            frame_num,
            timestamp: frame_num as f32 / 30.0,
        })
    }

    fn error_line(text: &str) -> FfmpegEvent {
        FfmpegEvent::Log(LogLevel::Error, text.to_string())
    }

    /// Decoder whose only process emits `events`; returns the kill flag too.
    fn decoder_with(events: Vec<FfmpegEvent>) -> (FfmpegFrameDecoder<MockFfmpegSpawner>, Rc<RefCell<bool>>) {
        let process = MockFfmpegProcess::with_events(events);
        let killed = process.killed.clone();
        let spawner = MockFfmpegSpawner::new();
        spawner.add_expectation("rawvideo", Ok(process), DummyOutput::None);
        (FfmpegFrameDecoder::new(spawner), killed)
    }

    fn label(step: &DecodeStep) -> String {
        match step {
            DecodeStep::Frame(image) => format!("frame {}x{}", image.width(), image.height()),
            DecodeStep::Empty => "empty".to_string(),
            DecodeStep::Failed(reason) => format!("failed: {reason}"),
            DecodeStep::EndOfStream => "end".to_string(),
        }
    }

    fn bound(frames: u64) -> WorkingBound {
        WorkingBound {
            frames,
            fps: 30.0,
            declared_count_trusted: true,
            declared_fps_trusted: true,
        }
    }

    #[test]
    fn test_decode_command_writes_rgb24_to_stdout() {
        let args: Vec<String> = build_decode_command(Path::new("/tmp/repaired.mp4"))
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.windows(2).any(|w| w == ["-i", "/tmp/repaired.mp4"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "rgb24"]));
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_events_map_to_steps() {
        let truncated = FfmpegEvent::OutputFrame(OutputVideoFrame {
            width: 4,
            height: 2,
            pix_fmt: "rgb24".to_string(),
            output_index: 0,
            data: vec![0; 5],
            frame_num: 2,
            timestamp: 0.0,
        });
        let empty = FfmpegEvent::OutputFrame(OutputVideoFrame {
            width: 0,
            height: 0,
            pix_fmt: "rgb24".to_string(),
            output_index: 0,
            data: Vec::new(),
            frame_num: 3,
            timestamp: 0.0,
        });
        let (decoder, killed) = decoder_with(vec![
            FfmpegEvent::Log(LogLevel::Info, "Stream #0:0: Video: h264".to_string()),
            rgb_frame(0),
            rgb_frame(1),
            truncated,
            empty,
            FfmpegEvent::Done,
        ]);

        let mut source = decoder.open(Path::new("repaired.mp4")).unwrap();
        let steps: Vec<String> = (0..6).map(|_| label(&source.next_step())).collect();
        assert_eq!(
            steps,
            vec![
                "frame 4x2",
                "frame 4x2",
                "failed: frame 2 is truncated for 4x2 rgb24",
                "empty",
                "end",
                "end"
            ]
        );
        drop(source);
        // The process ran to completion, so nothing was killed
        assert!(!*killed.borrow());
    }

    #[test]
    fn test_error_lines_before_a_frame_count_once() {
        let (decoder, _) = decoder_with(vec![
            rgb_frame(0),
            error_line("error while decoding MB 12 4, bytestream -7"),
            error_line("concealing 310 DC, 310 AC, 310 MV errors in P frame"),
            rgb_frame(1),
            error_line("error while decoding MB 3 9"),
        ]);

        let mut source = decoder.open(Path::new("repaired.mp4")).unwrap();
        assert_eq!(label(&source.next_step()), "frame 4x2");
        assert_eq!(
            label(&source.next_step()),
            "failed: error while decoding MB 12 4, bytestream -7 | \
             concealing 310 DC, 310 AC, 310 MV errors in P frame"
        );
        // The concealed frame is still delivered
        assert_eq!(label(&source.next_step()), "frame 4x2");
        // Trailing errors without a frame are one failure, then the end
        assert_eq!(label(&source.next_step()), "failed: error while decoding MB 3 9");
        assert_eq!(label(&source.next_step()), "end");
    }

    #[test]
    fn test_concealed_frames_do_not_end_sampling() {
        let mut events = vec![rgb_frame(0)];
        events.extend((0..5).map(|i| error_line(&format!("error while decoding MB {i} 0"))));
        events.extend((1..20).map(rgb_frame));
        events.push(FfmpegEvent::Done);
        let (decoder, _) = decoder_with(events);

        let source = decoder.open(Path::new("repaired.mp4")).unwrap();
        let mut sampler = FrameSampler::new(source, &bound(100), 1, 500);
        assert_eq!(sampler.by_ref().count(), 20);
        let stats = sampler.finish();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.stop_reason, Some(StopReason::EndOfStream));
    }

    #[test]
    fn test_early_stop_kills_decoder() {
        let truncated = |frame_num| {
            FfmpegEvent::OutputFrame(OutputVideoFrame {
                width: 4,
                height: 2,
                pix_fmt: "rgb24".to_string(),
                output_index: 0,
                data: vec![0; 3],
                frame_num,
                timestamp: 0.0,
            })
        };
        let mut events = vec![rgb_frame(0)];
        events.extend((1..8).map(truncated));
        events.extend((8..12).map(rgb_frame));
        let (decoder, killed) = decoder_with(events);

        let source = decoder.open(Path::new("repaired.mp4")).unwrap();
        let mut sampler = FrameSampler::new(source, &bound(100), 1, 500);
        assert_eq!(sampler.by_ref().count(), 1);
        assert!(!*killed.borrow());

        let stats = sampler.finish();
        assert_eq!(stats.stop_reason, Some(StopReason::FailureStreak));
        assert!(*killed.borrow());
    }

    #[test]
    fn test_spawn_failure_is_open_failure() {
        let spawner = MockFfmpegSpawner::new();
        spawner.add_spawn_error_expectation(
            "rawvideo",
            CoreError::DependencyNotFound("ffmpeg".to_string()),
        );
        let decoder = FfmpegFrameDecoder::new(spawner);
        match decoder.open(Path::new("repaired.mp4")) {
            Err(CoreError::DecodeOpenFailure(msg)) => assert!(msg.contains("repaired.mp4")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an open failure"),
        }
    }
}
