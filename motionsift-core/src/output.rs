// ============================================================================
// motionsift-core/src/output.rs
// ============================================================================
//
// OUTPUT ORGANIZER: Persisting Classified Frames
//
// Layout per source file:
//
//   <output_root>/<source_stem>/frame_0000.png           kept frames
//   <output_root>/<source_stem>/filtered_out/frame_0001.png   discarded (discard mode)
//   <output_root>/<source_stem>/blur_info.txt            optional score report
//
// Every frame goes to exactly one location. In annotate mode everything is
// written to the root and discard reasons only reach the log and the report.
// Frame files are created with `create_new`, so an existing file is never
// overwritten.
//
// Each source claims a root that did not exist before. When `<source_stem>`
// is taken (same stem in another directory, `IMG_1.jpg` next to
// `IMG_1.heic`, or an earlier run) the root becomes `<source_stem>_1`,
// `<source_stem>_2`, and so on.

use crate::classify::{Disposition, FrameRecord};
use crate::config::{DisposalMode, FrameFormat};
use crate::error::{CoreError, CoreResult};
use crate::utils::file_stem_safe;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Subdirectory for discarded frames.
pub const FILTERED_OUT_DIR: &str = "filtered_out";

/// Name of the per-file blur report.
pub const BLUR_INFO_FILE: &str = "blur_info.txt";

/// JPEG quality for persisted frames.
pub const JPEG_QUALITY: u8 = 95;

/// Suffixed roots tried before giving up on a stem.
pub const MAX_ROOT_SUFFIX: u32 = 9999;

/// `frame_0007.png` style file name.
pub fn frame_file_name(index: u32, format: FrameFormat) -> String {
    format!("frame_{:04}.{}", index, format.extension())
}

/// Directory layout for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub filtered_out: PathBuf,
}

impl OutputLayout {
    /// Layout for `source` under `output_root`. Nothing is created.
    pub fn for_source(output_root: &Path, source: &Path) -> CoreResult<Self> {
        Ok(Self::with_root(output_root.join(file_stem_safe(source)?)))
    }

    /// Creates a fresh root for `source` and returns its layout.
    ///
    /// The root is created with `create_dir`, so two sources can never end
    /// up sharing one.
    pub fn claim(output_root: &Path, source: &Path) -> CoreResult<Self> {
        let stem = file_stem_safe(source)?;
        fs::create_dir_all(output_root)?;

        for suffix in 0..=MAX_ROOT_SUFFIX {
            let name = if suffix == 0 {
                stem.clone()
            } else {
                format!("{stem}_{suffix}")
            };
            let root = output_root.join(&name);
            match fs::create_dir(&root) {
                Ok(()) => {
                    if suffix > 0 {
                        log::info!(
                            "Output directory for '{}' already taken, using {}",
                            stem,
                            root.display()
                        );
                    }
                    return Ok(Self::with_root(root));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(CoreError::Persist(root, e.to_string())),
            }
        }

        Err(CoreError::Persist(
            output_root.join(&stem),
            format!("no free output directory after {MAX_ROOT_SUFFIX} attempts"),
        ))
    }

    fn with_root(root: PathBuf) -> Self {
        let filtered_out = root.join(FILTERED_OUT_DIR);
        Self { root, filtered_out }
    }
}

/// Writes frames into an `OutputLayout`.
pub struct OutputOrganizer {
    layout: OutputLayout,
    mode: DisposalMode,
    format: FrameFormat,
    keep_blur_info: bool,
    blur_lines: Vec<String>,
}

impl OutputOrganizer {
    /// Creates the layout root. `filtered_out` is created on first use.
    pub fn create(
        layout: OutputLayout,
        mode: DisposalMode,
        format: FrameFormat,
        keep_blur_info: bool,
    ) -> CoreResult<Self> {
        fs::create_dir_all(&layout.root)?;
        Ok(Self {
            layout,
            mode,
            format,
            keep_blur_info,
            blur_lines: Vec::new(),
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Directory a record belongs in under the current mode.
    pub fn target_dir(&self, disposition: &Disposition) -> &Path {
        match (self.mode, disposition) {
            (DisposalMode::Discard, Disposition::Discard(_)) => &self.layout.filtered_out,
            _ => &self.layout.root,
        }
    }

    /// Writes one frame and returns its path.
    ///
    /// Fails with `Persist` if the file exists or cannot be encoded; the
    /// caller is expected to log and move on.
    pub fn persist(&mut self, record: &FrameRecord) -> CoreResult<PathBuf> {
        let name = frame_file_name(record.index, self.format);
        if self.keep_blur_info {
            self.blur_lines.push(blur_line(&name, record));
        }

        let dir = self.target_dir(&record.disposition).to_path_buf();
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(|e| CoreError::Persist(dir.clone(), e.to_string()))?;
        }
        let path = dir.join(&name);

        if let (DisposalMode::Annotate, Disposition::Discard(_)) = (self.mode, &record.disposition) {
            log::info!(
                "{}: blur {:.2}, would be discarded ({})",
                name,
                record.blur_score,
                record.disposition
            );
        }

        self.write_image(&path, record)
            .map_err(|e| CoreError::Persist(path.clone(), e))?;
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }

    fn write_image(&self, path: &Path, record: &FrameRecord) -> Result<(), String> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| e.to_string())?;
        let mut writer = BufWriter::new(file);
        let (width, height) = record.image.dimensions();

        let encoded = match self.format {
            FrameFormat::Png => PngEncoder::new(&mut writer).write_image(
                record.image.as_raw(),
                width,
                height,
                ColorType::Rgb8,
            ),
            FrameFormat::Jpeg => JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
                .write_image(record.image.as_raw(), width, height, ColorType::Rgb8),
        };

        let result = encoded
            .map_err(|e| e.to_string())
            .and_then(|()| writer.flush().map_err(|e| e.to_string()));
        if result.is_err() {
            drop(writer);
            let _ = fs::remove_file(path);
        }
        result
    }

    /// Writes the blur report, if enabled, and returns its path.
    pub fn finish(self) -> CoreResult<Option<PathBuf>> {
        if !self.keep_blur_info {
            return Ok(None);
        }
        let path = self.layout.root.join(BLUR_INFO_FILE);
        let mut contents = self.blur_lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&path, contents).map_err(|e| CoreError::Persist(path.clone(), e.to_string()))?;
        Ok(Some(path))
    }
}

fn blur_line(name: &str, record: &FrameRecord) -> String {
    match &record.disposition {
        Disposition::Keep => format!("{}: Blur Variance = {:.2}", name, record.blur_score),
        discard => format!(
            "{}: Blur Variance = {:.2} [{}]",
            name, record.blur_score, discard
        ),
    }
}
