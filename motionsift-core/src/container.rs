// ============================================================================
// motionsift-core/src/container.rs
// ============================================================================
//
// CONTAINER LOCATOR: Finding the Embedded Video in a Motion Photo
//
// A motion photo is a still image with a video clip appended after the image
// data or nested as an ISO base-media box. This module scans the raw bytes of
// such a file and returns the byte range believed to hold the video.
//
// DETECTION ORDER (first match wins):
// 1. Vendor marker in the first 1 KiB. Confirms the container type only and
//    never provides an offset.
// 2. An `ftyp` box declaring an MP4-family brand. The payload starts four
//    bytes before the box type, at the box size field.
// 3. The JPEG end-of-image marker. The payload is everything after it.
//
// The box scan wins over the end-of-image scan because it lands on an exact
// box boundary, while the JPEG heuristic assumes every trailing byte belongs
// to the video.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Size of the header region searched for vendor markers.
pub const VENDOR_MARKER_WINDOW: usize = 1024;

/// Vendor tags that identify a file as a motion photo.
pub const VENDOR_MARKERS: &[&str] = &["MI LIVE PHOTO", "MicroVideo", "MotionPhoto"];

/// The four-byte box type of an ISO base-media file type box.
pub const FTYP: &[u8; 4] = b"ftyp";

/// Major brands accepted as a video payload.
///
/// HEIF brands (`heic`, `mif1`, ...) are deliberately absent: a HEIC still
/// image opens with its own `ftyp` box at offset 4.
pub const MP4_FAMILY_BRANDS: &[&[u8; 4]] = &[
    b"mp41", b"mp42", b"isom", b"iso2", b"iso4", b"iso5", b"iso6", b"avc1", b"M4V ", b"qt  ",
    b"3gp4", b"3gp5", b"3g2a", b"MSNV", b"dash",
];

/// JPEG end-of-image marker.
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Which strategy produced the payload offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    IsoBox,
    JpegEndMarker,
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorStrategy::IsoBox => write!(f, "iso-box"),
            LocatorStrategy::JpegEndMarker => write!(f, "jpeg-eoi"),
        }
    }
}

/// Immutable view over a file's raw bytes plus its declared extension.
#[derive(Debug, Clone)]
pub struct MotionPhotoFile {
    path: PathBuf,
    extension: Option<String>,
    bytes: Vec<u8>,
}

impl MotionPhotoFile {
    /// Reads the whole file into memory.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(path, bytes))
    }

    /// Wraps bytes that were already read.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        Self {
            path: path.to_path_buf(),
            extension,
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension, if the file has one.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Byte range of the candidate embedded video. Length is never zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedPayload {
    offset: usize,
    length: usize,
    strategy: LocatorStrategy,
    vendor_marker: Option<&'static str>,
}

impl LocatedPayload {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn strategy(&self) -> LocatorStrategy {
        self.strategy
    }

    /// Vendor tag found in the header, if any.
    pub fn vendor_marker(&self) -> Option<&'static str> {
        self.vendor_marker
    }

    /// The payload bytes inside `file`.
    pub fn slice<'a>(&self, file: &'a MotionPhotoFile) -> &'a [u8] {
        &file.bytes()[self.offset..self.offset + self.length]
    }
}

/// Locates the embedded video payload of a motion photo.
///
/// # Returns
///
/// * `Ok(LocatedPayload)` - Non-empty range starting at the payload
/// * `Err(CoreError::ContainerNotFound)` - No signature matched
/// * `Err(CoreError::EmptyPayload)` - A signature matched but nothing follows it
pub fn locate_payload(file: &MotionPhotoFile) -> CoreResult<LocatedPayload> {
    let bytes = file.bytes();
    let vendor_marker = find_vendor_marker(bytes);
    if let Some(marker) = vendor_marker {
        log::debug!("Vendor marker '{}' found in {}", marker, file.path().display());
    }

    let (offset, strategy) = if let Some(box_pos) = find_iso_box(bytes) {
        (iso_payload_start(box_pos), LocatorStrategy::IsoBox)
    } else if let Some(eoi_pos) = find_jpeg_eoi(bytes) {
        (eoi_pos + JPEG_EOI.len(), LocatorStrategy::JpegEndMarker)
    } else {
        return Err(CoreError::ContainerNotFound(file.path().to_path_buf()));
    };

    let length = bytes.len().saturating_sub(offset);
    if length == 0 {
        return Err(CoreError::EmptyPayload(file.path().to_path_buf()));
    }

    log::debug!(
        "Payload located in {} via {}: offset={} length={}",
        file.path().display(),
        strategy,
        offset,
        length
    );

    Ok(LocatedPayload {
        offset,
        length,
        strategy,
        vendor_marker,
    })
}

/// Payload start for an `ftyp` box type found at `box_type_pos`.
///
/// Backs up over the four-byte box size field, clamped at zero.
pub fn iso_payload_start(box_type_pos: usize) -> usize {
    box_type_pos.saturating_sub(4)
}

/// Searches the header window for a known vendor tag.
pub fn find_vendor_marker(bytes: &[u8]) -> Option<&'static str> {
    let header = &bytes[..bytes.len().min(VENDOR_MARKER_WINDOW)];
    VENDOR_MARKERS
        .iter()
        .copied()
        .find(|marker| find_subslice(header, marker.as_bytes(), 0).is_some())
}

/// Position of the first `ftyp` box type followed by an MP4-family brand.
pub fn find_iso_box(bytes: &[u8]) -> Option<usize> {
    let mut from = 0;
    while let Some(pos) = find_subslice(bytes, FTYP, from) {
        let brand_start = pos + FTYP.len();
        if let Some(brand) = bytes.get(brand_start..brand_start + 4) {
            if MP4_FAMILY_BRANDS.iter().any(|b| b.as_slice() == brand) {
                return Some(pos);
            }
        }
        from = pos + 1;
    }
    None
}

/// Position of the first JPEG end-of-image marker after the start-of-image.
pub fn find_jpeg_eoi(bytes: &[u8]) -> Option<usize> {
    find_subslice(bytes, &JPEG_EOI, 2)
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_prefix() -> Vec<u8> {
        // SOI, an APP0 stub, some scan data, EOI
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(b"JFIF\0");
        bytes.extend(std::iter::repeat(0x55).take(64));
        bytes.extend_from_slice(&JPEG_EOI);
        bytes
    }

    fn mp4_box(brand: &[u8; 4]) -> Vec<u8> {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(FTYP);
        bytes.extend_from_slice(brand);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(b"isomiso2");
        bytes.extend(std::iter::repeat(0xAB).take(100));
        bytes
    }

    fn file(bytes: Vec<u8>) -> MotionPhotoFile {
        MotionPhotoFile::from_bytes(Path::new("/photos/IMG_1.jpg"), bytes)
    }

    #[test]
    fn test_iso_box_payload_starts_at_size_field() {
        let prefix = jpeg_prefix();
        let mut bytes = prefix.clone();
        bytes.extend(mp4_box(b"mp42"));
        let photo = file(bytes);

        let payload = locate_payload(&photo).unwrap();
        assert_eq!(payload.strategy(), LocatorStrategy::IsoBox);
        assert_eq!(payload.offset(), prefix.len());
        assert_eq!(payload.length(), photo.len() - prefix.len());
        assert_eq!(&payload.slice(&photo)[4..8], FTYP);
    }

    #[test]
    fn test_iso_payload_start_clamps_at_zero() {
        for pos in 0..4 {
            assert_eq!(iso_payload_start(pos), 0);
        }
        for pos in [4usize, 5, 100, 4096] {
            assert_eq!(iso_payload_start(pos), pos - 4);
        }
    }

    #[test]
    fn test_box_at_file_start_gives_whole_file() {
        let photo = file(mp4_box(b"isom"));
        let payload = locate_payload(&photo).unwrap();
        assert_eq!(payload.offset(), 0);
        assert_eq!(payload.length(), photo.len());
    }

    #[test]
    fn test_ftyp_at_offset_two_clamps() {
        let mut bytes = vec![0x00, 0x00];
        bytes.extend_from_slice(FTYP);
        bytes.extend_from_slice(b"mp41");
        bytes.extend_from_slice(&[1, 2, 3]);
        let photo = file(bytes);
        let payload = locate_payload(&photo).unwrap();
        assert_eq!(payload.offset(), 0);
    }

    #[test]
    fn test_eoi_fallback_returns_trailing_bytes() {
        let mut bytes = jpeg_prefix();
        let trailing: Vec<u8> = (0..500u32).map(|i| (i % 200) as u8 + 1).collect();
        bytes.extend_from_slice(&trailing);
        let photo = file(bytes);

        let payload = locate_payload(&photo).unwrap();
        assert_eq!(payload.strategy(), LocatorStrategy::JpegEndMarker);
        assert_eq!(payload.length(), 500);
        assert_eq!(payload.slice(&photo), trailing.as_slice());
    }

    #[test]
    fn test_box_preferred_over_eoi() {
        let mut bytes = jpeg_prefix();
        bytes.extend_from_slice(&[0x11; 32]);
        let box_start = bytes.len();
        bytes.extend(mp4_box(b"mp41"));
        let photo = file(bytes);

        let payload = locate_payload(&photo).unwrap();
        assert_eq!(payload.strategy(), LocatorStrategy::IsoBox);
        assert_eq!(payload.offset(), box_start);
    }

    #[test]
    fn test_heif_brand_is_not_a_payload() {
        // A HEIC still opens with ftypheic; the clip follows later.
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(FTYP);
        bytes.extend_from_slice(b"heic");
        bytes.extend(std::iter::repeat(0x42).take(40));
        let clip_start = bytes.len();
        bytes.extend(mp4_box(b"mp42"));
        let photo = file(bytes);

        let payload = locate_payload(&photo).unwrap();
        assert_eq!(payload.offset(), clip_start);
    }

    #[test]
    fn test_eoi_at_end_is_empty_payload() {
        let photo = file(jpeg_prefix());
        assert!(matches!(locate_payload(&photo), Err(CoreError::EmptyPayload(_))));
    }

    #[test]
    fn test_no_signature_is_container_not_found() {
        let photo = file(vec![0x10; 256]);
        assert!(matches!(
            locate_payload(&photo),
            Err(CoreError::ContainerNotFound(_))
        ));
        assert!(matches!(
            locate_payload(&file(Vec::new())),
            Err(CoreError::ContainerNotFound(_))
        ));
    }

    #[test]
    fn test_vendor_marker_confirms_but_does_not_move_offset() {
        let mut bytes = jpeg_prefix();
        // Marker placed after EOI but still inside the header window
        let eoi_end = bytes.len();
        bytes.extend_from_slice(b"MI LIVE PHOTO");
        bytes.extend_from_slice(&[0x01; 20]);
        let photo = file(bytes);

        let payload = locate_payload(&photo).unwrap();
        assert_eq!(payload.vendor_marker(), Some("MI LIVE PHOTO"));
        assert_eq!(payload.offset(), eoi_end);
    }

    #[test]
    fn test_vendor_marker_outside_window_is_ignored() {
        let mut bytes = vec![0u8; VENDOR_MARKER_WINDOW + 10];
        bytes.extend_from_slice(b"MotionPhoto");
        assert_eq!(find_vendor_marker(&bytes), None);
    }

    #[test]
    fn test_soi_bytes_are_not_mistaken_for_eoi() {
        // FF D9 at offset 0 would be before the SOI skip window
        let bytes = vec![0xFF, 0xD9, 0x00, 0x00];
        assert_eq!(find_jpeg_eoi(&bytes), None);
    }

    #[test]
    fn test_extension_is_lowercased() {
        let photo = MotionPhotoFile::from_bytes(Path::new("IMG.JPEG"), vec![1]);
        assert_eq!(photo.extension(), Some("jpeg"));
    }
}
