//! Rendering of classified spots onto the source image.
//!
//! Each spot paints a soft disk in its kind's tint: a filled disk of the
//! spot's radius blurred with `sigma = radius / 3`. Overlapping footprints
//! keep the strongest weight. Labeled kinds also get a small caption above
//! the spot.

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect;

use crate::config::OverlayConfig;
use crate::landmarks::LandmarkSet;
use crate::types::Spot;

const LABEL_FG: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_BG: Rgb<u8> = Rgb([20, 20, 20]);
const LANDMARK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const GLYPH_W: i32 = 3;
const GLYPH_H: i32 = 5;

/// Composite `spots` over a copy of `image`.
///
/// Pixels outside every footprint are left untouched.
pub fn render(image: &RgbImage, spots: &[Spot], config: &OverlayConfig) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut weights = vec![0.0f32; w as usize * h as usize];
    let mut tints = vec![[0u8; 3]; w as usize * h as usize];

    for spot in spots {
        paint_footprint(&mut weights, &mut tints, w, h, spot);
    }

    let alpha = config.alpha.clamp(0.0, 1.0);
    let mut out = image.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let idx = (y * w + x) as usize;
        let a = alpha * weights[idx];
        if a <= 0.0 {
            continue;
        }
        let tint = tints[idx];
        for c in 0..3 {
            let v = px[c] as f32 * (1.0 - a) + tint[c] as f32 * a;
            px[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }

    if config.draw_labels {
        for spot in spots.iter().filter(|s| s.kind.is_labeled()) {
            draw_label(&mut out, spot);
        }
    }
    out
}

/// Blur a disk for `spot` and fold it into the weight map by maximum.
fn paint_footprint(weights: &mut [f32], tints: &mut [[u8; 3]], w: u32, h: u32, spot: &Spot) {
    let r = spot.radius as i32;
    let sigma = spot.radius as f32 / 3.0;
    let pad = (3.0 * sigma).ceil() as i32 + 1;
    let half = r + pad;
    let side = (2 * half + 1) as u32;

    let mut patch: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::new(side, side);
    for (x, y, px) in patch.enumerate_pixels_mut() {
        let dx = x as i32 - half;
        let dy = y as i32 - half;
        if dx * dx + dy * dy <= r * r {
            px[0] = 1.0;
        }
    }
    // A zero-radius spot is a single pixel; nothing to soften.
    if sigma > 0.0 {
        patch = gaussian_blur_f32(&patch, sigma);
    }

    let tint = spot.kind.tint();
    let (cx, cy) = spot.center;
    for (px_x, px_y, v) in patch.enumerate_pixels() {
        let x = cx + px_x as i32 - half;
        let y = cy + px_y as i32 - half;
        if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
            continue;
        }
        let idx = (y as u32 * w + x as u32) as usize;
        if v[0] > weights[idx] {
            weights[idx] = v[0].min(1.0);
            tints[idx] = tint;
        }
    }
}

/// Upper-case kind name on a dark box just above the spot.
fn draw_label(image: &mut RgbImage, spot: &Spot) {
    let text = spot.kind.name().to_uppercase();
    let text_w = text.chars().count() as i32 * (GLYPH_W + 1) - 1;
    let (cx, cy) = spot.center;
    let x = cx - text_w / 2 - 1;
    let y = cy - spot.radius as i32 - GLYPH_H - 4;

    draw_filled_rect_mut(
        image,
        Rect::at(x, y).of_size((text_w + 2) as u32, (GLYPH_H + 2) as u32),
        LABEL_BG,
    );
    draw_text(image, x + 1, y + 1, &text, LABEL_FG);
}

fn draw_text(image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let mut cursor = x;
    for ch in text.chars() {
        draw_char(image, cursor, y, ch, color);
        cursor += GLYPH_W + 1;
    }
}

fn draw_char(image: &mut RgbImage, x: i32, y: i32, ch: char, color: Rgb<u8>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    for (row, bits) in glyph(ch).iter().enumerate() {
        for col in 0..GLYPH_W {
            if (bits >> (GLYPH_W - 1 - col)) & 1 == 0 {
                continue;
            }
            let px = x + col;
            let py = y + row as i32;
            if px >= 0 && py >= 0 && px < w && py < h {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// 3×5 bitmap, one row per entry, MSB on the left.
fn glyph(ch: char) -> [u8; 5] {
    match ch {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        _ => [0; 5],
    }
}

/// Mark every landmark with a small dot.
pub fn draw_landmarks(image: &mut RgbImage, landmarks: &LandmarkSet) {
    let (w, h) = image.dimensions();
    for (_, p) in landmarks.iter() {
        draw_filled_circle_mut(image, p.to_pixel(w, h), 1, LANDMARK_COLOR);
    }
}
