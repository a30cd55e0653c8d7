//! Colour-space conversions in 8-bit channel scales.
//!
//! Scales follow the usual 8-bit conventions so range filters read naturally:
//! hue is halved into `0..=180`, saturation/value and L* are stretched to
//! `0..=255`, chroma channels are offset by 128.

use image::{GrayImage, Luma, RgbImage};
use palette::{FromColor, Hsv, Lab, Srgb};

fn to_srgb(rgb: [u8; 3]) -> Srgb<f32> {
    Srgb::new(rgb[0], rgb[1], rgb[2]).into_format::<f32>()
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// `(H 0–180, S 0–255, V 0–255)`.
pub fn hsv_u8(rgb: [u8; 3]) -> [u8; 3] {
    let hsv = Hsv::from_color(to_srgb(rgb));
    let hue = hsv.hue.into_positive_degrees();
    [
        clamp_u8(hue / 2.0),
        clamp_u8(hsv.saturation * 255.0),
        clamp_u8(hsv.value * 255.0),
    ]
}

/// `(Y, Cr, Cb)` with BT.601 luma weights.
pub fn ycrcb_u8(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    [clamp_u8(y), clamp_u8(cr), clamp_u8(cb)]
}

/// CIE L* (D65) stretched from `0..=100` to `0..=255`.
pub fn lightness_u8(rgb: [u8; 3]) -> u8 {
    let lab: Lab = Lab::from_color(to_srgb(rgb));
    clamp_u8(lab.l * 255.0 / 100.0)
}

/// Per-pixel [`lightness_u8`] of a whole image.
pub fn lightness_channel(image: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        out.put_pixel(x, y, Luma([lightness_u8(px.0)]));
    }
    out
}

/// Mask (0/255) of pixels whose converted channels all fall inside
/// `lower..=upper`.
pub fn in_range<F>(image: &RgbImage, convert: F, lower: [u8; 3], upper: [u8; 3]) -> GrayImage
where
    F: Fn([u8; 3]) -> [u8; 3],
{
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, px) in image.enumerate_pixels() {
        let c = convert(px.0);
        let inside = (0..3).all(|i| c[i] >= lower[i] && c[i] <= upper[i]);
        if inside {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}
