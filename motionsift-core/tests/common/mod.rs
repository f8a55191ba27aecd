// motionsift-core/tests/common/mod.rs
//
// Shared fixtures for the integration tests.

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// JPEG still: SOI, a JFIF APP0 stub, filler scan data, EOI.
pub fn jpeg_still() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    bytes.extend_from_slice(b"JFIF\0");
    bytes.extend(std::iter::repeat(0x37).take(200));
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

/// Minimal MP4 head: an `ftyp` box followed by opaque data.
pub fn mp4_clip(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
    bytes.extend_from_slice(b"ftypmp42");
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(b"isommp42");
    while bytes.len() < len {
        bytes.push((bytes.len() % 251) as u8 | 1);
    }
    bytes
}

/// Writes a file and returns its path.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write fixture");
    path
}

/// A motion photo: JPEG still with an MP4 clip appended.
pub fn motion_photo(dir: &Path, name: &str) -> PathBuf {
    let mut bytes = jpeg_still();
    bytes.extend(mp4_clip(600));
    write_file(dir, name, &bytes)
}

/// High-contrast frame, far above any sane blur threshold.
pub fn sharp_frame() -> RgbImage {
    RgbImage::from_fn(64, 48, |x, y| {
        if (x / 2 + y / 2) % 2 == 0 {
            Rgb([250, 250, 250])
        } else {
            Rgb([5, 5, 5])
        }
    })
}

/// Uniform frame with zero Laplacian variance.
pub fn flat_frame() -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([120, 120, 120]))
}

/// Sorted file names in a directory.
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
