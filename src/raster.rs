//! Raster operations shared by the pipeline stages.
//!
//! Binary rasters are `GrayImage`s holding 0 or 255.

use image::{GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::integral_image::integral_image;

pub const ON: u8 = 255;

/// Pixel-wise AND of two binary rasters of equal size.
pub fn and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let mut out = GrayImage::new(a.width(), a.height());
    for ((o, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        if pa[0] != 0 && pb[0] != 0 {
            *o = Luma([ON]);
        }
    }
    out
}

/// Keep `image` where `mask` is set, zero elsewhere.
pub fn apply_mask(image: &GrayImage, mask: &GrayImage) -> GrayImage {
    debug_assert_eq!(image.dimensions(), mask.dimensions());
    let mut out = GrayImage::new(image.width(), image.height());
    for ((o, p), m) in out.pixels_mut().zip(image.pixels()).zip(mask.pixels()) {
        if m[0] != 0 {
            *o = *p;
        }
    }
    out
}

/// Number of set pixels.
pub fn count_set(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != 0).count()
}

/// Whether `(x, y)` is inside the raster and set. Out-of-bounds is unset.
pub fn is_set(mask: &GrayImage, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 || x >= mask.width() as i32 || y >= mask.height() as i32 {
        return false;
    }
    mask.get_pixel(x as u32, y as u32)[0] != 0
}

/// Candidates at or below the Otsu level of `image` (dark side of the split).
pub fn otsu_inverted(image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    tracing::trace!(level, "otsu level");
    threshold(image, level, ThresholdType::BinaryInverted)
}

/// Candidates at or below `mean(block × block) - offset`.
///
/// The neighbourhood is clipped at the image border, so edge pixels average
/// over the part of the window that lies inside the image.
pub fn adaptive_mean_inverted(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    // (w + 1) × (h + 1); entry (x, y) sums the pixels above and left of it.
    let integral = integral_image::<_, u64>(image);
    let sat = |x: u32, y: u32| integral.get_pixel(x, y)[0];
    let half = block_size / 2;

    for y in 0..h {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half).min(h - 1) + 1;
        for x in 0..w {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half).min(w - 1) + 1;
            let sum = sat(x1, y1) + sat(x0, y0) - sat(x1, y0) - sat(x0, y1);
            let area = ((x1 - x0) * (y1 - y0)) as f64;
            let mean = sum as f64 / area;
            let value = image.get_pixel(x, y)[0] as f64;
            if value <= mean - offset as f64 {
                out.put_pixel(x, y, Luma([ON]));
            }
        }
    }
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles × tiles` grid of equal tiles, padding
/// the right and bottom edges by reflection (`dcb|abcd|cba`) when the size
/// is not a multiple of the grid. Each tile's histogram is clipped at
/// `clip_limit · tile_area / 256`, the excess spread evenly over all bins,
/// and the resulting CDF used as a lookup table. Output pixels interpolate
/// bilinearly between the four nearest tile tables.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || tiles == 0 {
        return image.clone();
    }
    let tiles_x = tiles.min(w);
    let tiles_y = tiles.min(h);
    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let tile = TileBounds {
                x0: tx * tile_w,
                y0: ty * tile_h,
                width: tile_w,
                height: tile_h,
            };
            luts[(ty * tiles_x + tx) as usize] = tile_lut(image, &tile, clip_limit);
        }
    }

    let mut out = GrayImage::new(w, h);
    let last_x = tiles_x as i64 - 1;
    let last_y = tiles_y as i64 - 1;
    for y in 0..h {
        let tyf = y as f32 / tile_h as f32 - 0.5;
        let ty = tyf.floor();
        let ya = tyf - ty;
        let ty1 = (ty as i64).clamp(0, last_y) as usize;
        let ty2 = (ty as i64 + 1).clamp(0, last_y) as usize;
        for x in 0..w {
            let txf = x as f32 / tile_w as f32 - 0.5;
            let tx = txf.floor();
            let xa = txf - tx;
            let tx1 = (tx as i64).clamp(0, last_x) as usize;
            let tx2 = (tx as i64 + 1).clamp(0, last_x) as usize;

            let v = image.get_pixel(x, y)[0] as usize;
            let lut = |tyi: usize, txi: usize| luts[tyi * tiles_x as usize + txi][v] as f32;
            let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
            let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
            let value = top * (1.0 - ya) + bottom * ya;
            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// One CLAHE tile in padded coordinates; may extend past the image.
struct TileBounds {
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
}

/// Mirror `i` back into `0..len` without repeating the edge sample.
fn reflect(i: u32, len: u32) -> u32 {
    if i < len || len == 1 {
        i.min(len - 1)
    } else {
        (2 * (len - 1)).saturating_sub(i)
    }
}

fn tile_lut(image: &GrayImage, tile: &TileBounds, clip_limit: f32) -> [u8; 256] {
    let (w, h) = image.dimensions();
    let mut hist = [0usize; 256];
    for y in tile.y0..tile.y0 + tile.height {
        let sy = reflect(y, h);
        for x in tile.x0..tile.x0 + tile.width {
            hist[image.get_pixel(reflect(x, w), sy)[0] as usize] += 1;
        }
    }
    let area = (tile.width * tile.height) as usize;

    let clip = ((clip_limit * area as f32 / 256.0) as usize).max(1);
    let mut excess = 0usize;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let batch = excess / 256;
    let mut residual = excess - batch * 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1);
        let mut i = 0;
        while i < 256 && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0usize;
    for (i, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Linear-interpolated percentile (`p` in `0..=100`) of `values`.
///
/// Returns `None` for an empty population.
pub fn percentile(values: &mut [u8], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let rank = (p / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(values[lo] as f64 + (values[hi] as f64 - values[lo] as f64) * frac)
}

/// Population mean and standard deviation.
pub fn mean_std<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for v in values {
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    Some((mean, var.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn and_requires_both() {
        let mut a = filled(2, 1, 0);
        let mut b = filled(2, 1, 0);
        a.put_pixel(0, 0, Luma([ON]));
        a.put_pixel(1, 0, Luma([ON]));
        b.put_pixel(1, 0, Luma([ON]));
        let c = and(&a, &b);
        assert_eq!(c.get_pixel(0, 0)[0], 0);
        assert_eq!(c.get_pixel(1, 0)[0], ON);
        assert_eq!(count_set(&c), 1);
    }

    #[test]
    fn is_set_handles_out_of_bounds() {
        let mask = filled(3, 3, ON);
        assert!(is_set(&mask, 0, 0));
        assert!(is_set(&mask, 2, 2));
        assert!(!is_set(&mask, -1, 0));
        assert!(!is_set(&mask, 3, 1));
    }

    #[test]
    fn otsu_marks_dark_cluster() {
        let mut image = filled(20, 20, 200);
        for y in 5..8 {
            for x in 5..8 {
                image.put_pixel(x, y, Luma([40]));
            }
        }
        let dark = otsu_inverted(&image);
        assert_eq!(count_set(&dark), 9);
        assert_eq!(dark.get_pixel(6, 6)[0], ON);
        assert_eq!(dark.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn adaptive_flat_image_has_no_candidates() {
        let image = filled(30, 30, 120);
        let dark = adaptive_mean_inverted(&image, 11, 2);
        assert_eq!(count_set(&dark), 0);
    }

    #[test]
    fn adaptive_marks_local_dip() {
        let mut image = filled(30, 30, 120);
        image.put_pixel(15, 15, Luma([60]));
        let dark = adaptive_mean_inverted(&image, 11, 2);
        assert_eq!(count_set(&dark), 1);
        assert_eq!(dark.get_pixel(15, 15)[0], ON);
    }

    #[test]
    fn clahe_keeps_flat_image_flat() {
        let image = filled(64, 48, 90);
        let eq = clahe(&image, 2.0, 8);
        let first = eq.get_pixel(0, 0)[0];
        assert!(eq.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn clahe_keeps_flat_image_flat_off_grid() {
        for (w, h) in [(41, 41), (49, 49), (9, 17), (33, 25)] {
            let image = filled(w, h, 90);
            let eq = clahe(&image, 2.0, 8);
            let first = eq.get_pixel(0, 0)[0];
            assert!(
                eq.pixels().all(|p| p[0] == first),
                "{w}x{h}: corner {} interior {}",
                eq.get_pixel(w - 1, h - 1)[0],
                eq.get_pixel(w / 2, h / 2)[0]
            );
        }
    }

    #[test]
    fn clahe_handles_images_smaller_than_grid() {
        let image = filled(3, 1, 150);
        let eq = clahe(&image, 2.0, 8);
        assert_eq!(eq.dimensions(), (3, 1));
        assert!(eq.pixels().all(|p| p[0] == eq.get_pixel(0, 0)[0]));
    }

    #[test]
    fn reflect_mirrors_without_repeating_edge() {
        assert_eq!(reflect(3, 5), 3);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(7, 5), 1);
        assert_eq!(reflect(4, 1), 0);
    }

    #[test]
    fn clahe_preserves_order_of_two_levels() {
        let mut image = filled(64, 64, 200);
        for y in 28..36 {
            for x in 28..36 {
                image.put_pixel(x, y, Luma([60]));
            }
        }
        let eq = clahe(&image, 2.0, 8);
        assert!(eq.get_pixel(31, 31)[0] < eq.get_pixel(2, 2)[0]);
        assert!(eq.get_pixel(31, 31)[0] < eq.get_pixel(40, 31)[0]);
    }

    #[test]
    fn percentile_interpolates() {
        let mut values = vec![10, 20, 30, 40, 50];
        assert_eq!(percentile(&mut values, 50.0), Some(30.0));
        assert_eq!(percentile(&mut values, 100.0), Some(50.0));
        assert!((percentile(&mut values, 90.0).unwrap() - 46.0).abs() < 1e-9);
        assert_eq!(percentile(&mut [], 90.0), None);
    }

    #[test]
    fn mean_std_of_two_levels() {
        let (mean, std) = mean_std([0.0, 10.0, 0.0, 10.0]).unwrap();
        assert!((mean - 5.0).abs() < 1e-9);
        assert!((std - 5.0).abs() < 1e-9);
        assert!(mean_std(std::iter::empty()).is_none());
    }
}
