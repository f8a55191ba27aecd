//! Laplacian-variance sharpness score.
//!
//! The frame's luminance is convolved with the 4-neighbour Laplacian kernel
//!
//! ```text
//!  0  1  0
//!  1 -4  1
//!  0  1  0
//! ```
//!
//! using reflect-101 borders, and the population variance of the response is
//! returned. Higher means sharper.
//!
//! Luminance uses the BT.601 weights (0.299, 0.587, 0.114). The default blur
//! threshold of 100 is calibrated against that conversion.

use image::{GrayImage, Luma, RgbImage};

const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Converts an RGB frame to its BT.601 luminance channel.
pub fn luma(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let value = LUMA_R * f64::from(r) + LUMA_G * f64::from(g) + LUMA_B * f64::from(b);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Variance of the Laplacian response over `gray`. Zero for an empty image.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let (w, h) = (width as i64, height as i64);
    let px = |x: i64, y: i64| -> f64 {
        f64::from(gray.get_pixel(reflect_101(x, w) as u32, reflect_101(y, h) as u32).0[0])
    };

    let count = (w * h) as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let response = px(x, y - 1) + px(x - 1, y) + px(x + 1, y) + px(x, y + 1) - 4.0 * px(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

/// Reflects an out-of-range coordinate without repeating the edge pixel.
fn reflect_101(i: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = i.rem_euclid(period);
    if m < len { m } else { period - m }
}
