//! Skin-health scores on a 0–100 scale.
//!
//! Every score is "higher is better" and is measured only over face-mask
//! pixels. Gradient-based measures (texture, wrinkles, pores) sample an
//! eroded copy of the mask so the artificial mask edge is never scored.
//!
//! | Metric       | Basis                                                 |
//! |--------------|-------------------------------------------------------|
//! | Spots        | `100 - (5·count + Σ radius)`                          |
//! | Texture      | `100 - min(100, var(Laplacian))`                      |
//! | Redness      | `100 - 2·(R - (G + B) / 2)` from mean colour          |
//! | Oiliness     | share of pixels above the 90th luminance percentile   |
//! | Acne         | `100 - 10·acne count`                                 |
//! | Wrinkles     | Canny edge density                                    |
//! | Pores        | white top-hat density                                 |
//! | Skin Health  | weighted mean of the seven above                      |
//! | Dark Circles | `0.9 · Skin Health` (placeholder)                     |
//! | Eye bags     | `0.95 · Skin Health` (placeholder)                    |
//! | Moisture     | `(Texture + (100 - Oiliness)) / 2`                    |

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{erode, grayscale_open, Mask};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::color;
use crate::config::MetricsConfig;
use crate::mask::FaceMask;
use crate::raster;
use crate::types::{Spot, SpotKind};

/// The reported metrics, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Spots,
    Texture,
    Redness,
    Oiliness,
    Acne,
    Wrinkles,
    Pores,
    SkinHealth,
    DarkCircles,
    EyeBags,
    Moisture,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::Spots,
        Metric::Texture,
        Metric::Redness,
        Metric::Oiliness,
        Metric::Acne,
        Metric::Wrinkles,
        Metric::Pores,
        Metric::SkinHealth,
        Metric::DarkCircles,
        Metric::EyeBags,
        Metric::Moisture,
    ];

    /// Display name, also used as the serialized key.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Spots => "Spots",
            Metric::Texture => "Texture",
            Metric::Redness => "Redness",
            Metric::Oiliness => "Oiliness",
            Metric::Acne => "Acne",
            Metric::Wrinkles => "Wrinkles",
            Metric::Pores => "Pores",
            Metric::SkinHealth => "Skin Health",
            Metric::DarkCircles => "Dark Circles",
            Metric::EyeBags => "Eye bags",
            Metric::Moisture => "Moisture",
        }
    }

    /// Whether the value is derived from other scores rather than measured.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Metric::DarkCircles | Metric::EyeBags)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per [`Metric`], each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsReport {
    values: [u8; 11],
}

impl MetricsReport {
    pub fn get(&self, metric: Metric) -> u8 {
        self.values[metric.index()]
    }

    /// `(metric, value)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, u8)> + '_ {
        Metric::ALL.iter().map(move |&m| (m, self.get(m)))
    }

    /// Scores are truncated toward zero, so 99.6 reports as 99.
    fn set(&mut self, metric: Metric, value: f64) {
        self.values[metric.index()] = value.clamp(0.0, 100.0) as u8;
    }

    /// Placeholder estimates are rounded to the nearest integer instead.
    fn set_rounded(&mut self, metric: Metric, value: f64) {
        self.set(metric, value.round());
    }
}

impl Serialize for MetricsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Metric::ALL.len()))?;
        for (metric, value) in self.iter() {
            map.serialize_entry(metric.name(), &value)?;
        }
        map.end()
    }
}

/// Score the face region of `image`.
pub fn score(image: &RgbImage, face: &FaceMask, spots: &[Spot], config: &MetricsConfig) -> MetricsReport {
    let mask = face.as_image();
    let total = face.pixel_count();
    if total == 0 {
        tracing::warn!("empty face mask, area-based metrics default to 100");
    }

    let gray = image::imageops::grayscale(image);
    let masked_gray = raster::apply_mask(&gray, mask);
    let interior = if config.interior_margin > 0 {
        erode(mask, Norm::LInf, config.interior_margin)
    } else {
        mask.clone()
    };

    let mut report = MetricsReport { values: [0; 11] };
    report.set(Metric::Spots, spots_score(spots, config));
    report.set(Metric::Texture, texture_score(&masked_gray, &interior));
    report.set(Metric::Redness, redness_score(image, mask, config));
    report.set(Metric::Oiliness, oiliness_score(image, mask, total, config));
    report.set(Metric::Acne, acne_score(spots, config));
    report.set(Metric::Wrinkles, wrinkles_score(&masked_gray, &interior, total, config));
    report.set(Metric::Pores, pores_score(&masked_gray, &interior, total, config));

    let w = &config.health_weights;
    let weighted = [
        (w.spots, Metric::Spots),
        (w.texture, Metric::Texture),
        (w.redness, Metric::Redness),
        (w.oiliness, Metric::Oiliness),
        (w.acne, Metric::Acne),
        (w.wrinkles, Metric::Wrinkles),
        (w.pores, Metric::Pores),
    ];
    let weight_sum: u32 = weighted.iter().map(|(w, _)| w).sum();
    let health = if weight_sum == 0 {
        0
    } else {
        weighted
            .iter()
            .map(|&(w, m)| w * report.get(m) as u32)
            .sum::<u32>()
            / weight_sum
    };
    report.set(Metric::SkinHealth, health as f64);
    report.set_rounded(Metric::DarkCircles, config.dark_circles_factor * health as f64);
    report.set_rounded(Metric::EyeBags, config.eye_bags_factor * health as f64);

    let moisture = (report.get(Metric::Texture) as u32 + 100 - report.get(Metric::Oiliness) as u32) / 2;
    report.set(Metric::Moisture, moisture as f64);

    tracing::debug!(?report, face_pixels = total, "metrics");
    report
}

fn spots_score(spots: &[Spot], config: &MetricsConfig) -> f64 {
    let penalty: i64 = spots
        .iter()
        .map(|s| config.spot_penalty as i64 + s.radius as i64)
        .sum();
    (100 - penalty).max(0) as f64
}

fn acne_score(spots: &[Spot], config: &MetricsConfig) -> f64 {
    let acne = spots.iter().filter(|s| s.kind == SpotKind::Acne).count() as i64;
    (100 - config.acne_penalty as i64 * acne).max(0) as f64
}

fn texture_score(masked_gray: &GrayImage, interior: &GrayImage) -> f64 {
    let laplacian = imageproc::filter::laplacian_filter(masked_gray);
    let samples = interior
        .enumerate_pixels()
        .filter(|(_, _, m)| m[0] != 0)
        .map(|(x, y, _)| laplacian.get_pixel(x, y)[0] as f64);
    match raster::mean_std(samples) {
        Some((_, std)) => 100.0 - (std * std).min(100.0),
        None => 100.0,
    }
}

fn redness_score(image: &RgbImage, mask: &GrayImage, config: &MetricsConfig) -> f64 {
    let mut sum = [0.0f64; 3];
    let mut n = 0usize;
    for (px, m) in image.pixels().zip(mask.pixels()) {
        if m[0] == 0 {
            continue;
        }
        for c in 0..3 {
            sum[c] += px[c] as f64;
        }
        n += 1;
    }
    if n == 0 {
        return 100.0;
    }
    let [r, g, b] = sum.map(|s| s / n as f64);
    (100.0 - config.redness_scale * (r - (g + b) / 2.0)).max(0.0)
}

fn oiliness_score(image: &RgbImage, mask: &GrayImage, total: usize, config: &MetricsConfig) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let lightness = color::lightness_channel(image);
    let mut lit: Vec<u8> = lightness
        .pixels()
        .zip(mask.pixels())
        .filter(|(l, m)| m[0] != 0 && l[0] > 0)
        .map(|(l, _)| l[0])
        .collect();
    let Some(threshold) = raster::percentile(&mut lit, config.oily_percentile) else {
        return 100.0;
    };
    let oily = lit.iter().filter(|&&v| v as f64 > threshold).count();
    100.0 - (oily as f64 / total as f64 * config.density_scale).min(100.0)
}

fn wrinkles_score(masked_gray: &GrayImage, interior: &GrayImage, total: usize, config: &MetricsConfig) -> f64 {
    let edges = imageproc::edges::canny(masked_gray, config.canny_low, config.canny_high);
    density_score(&edges, interior, total, |v| v > 0, config)
}

fn pores_score(masked_gray: &GrayImage, interior: &GrayImage, total: usize, config: &MetricsConfig) -> f64 {
    let opened = grayscale_open(masked_gray, &Mask::diamond(1));
    let mut tophat = GrayImage::new(masked_gray.width(), masked_gray.height());
    for (x, y, px) in tophat.enumerate_pixels_mut() {
        let v = masked_gray.get_pixel(x, y)[0].saturating_sub(opened.get_pixel(x, y)[0]);
        *px = Luma([v]);
    }
    let threshold = config.tophat_threshold;
    density_score(&tophat, interior, total, |v| v > threshold, config)
}

/// `100 - density_scale · hits / total`, counting hits in the interior only.
/// An empty face scores 100.
fn density_score<F>(
    response: &GrayImage,
    interior: &GrayImage,
    total: usize,
    hit: F,
    config: &MetricsConfig,
) -> f64
where
    F: Fn(u8) -> bool,
{
    if total == 0 {
        return 100.0;
    }
    let hits = response
        .pixels()
        .zip(interior.pixels())
        .filter(|(r, m)| m[0] != 0 && hit(r[0]))
        .count();
    (100.0 - config.density_scale * hits as f64 / total as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn full_face(w: u32, h: u32) -> FaceMask {
        FaceMask::from_raster(GrayImage::from_pixel(w, h, Luma([raster::ON])))
    }

    fn centered_face(w: u32, h: u32, margin: u32) -> FaceMask {
        let mut mask = GrayImage::new(w, h);
        for y in margin..h - margin {
            for x in margin..w - margin {
                mask.put_pixel(x, y, Luma([raster::ON]));
            }
        }
        FaceMask::from_raster(mask)
    }

    fn spot(kind: SpotKind, radius: u32) -> Spot {
        Spot {
            id: 1,
            center: (10, 10),
            radius,
            kind,
            darkness: 100,
            redness: 0,
            circularity: 0.8,
        }
    }

    #[test]
    fn names_and_order() {
        let names: Vec<_> = Metric::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "Spots",
                "Texture",
                "Redness",
                "Oiliness",
                "Acne",
                "Wrinkles",
                "Pores",
                "Skin Health",
                "Dark Circles",
                "Eye bags",
                "Moisture"
            ]
        );
        assert!(Metric::EyeBags.is_placeholder());
        assert!(!Metric::Pores.is_placeholder());
    }

    #[test]
    fn flat_gray_face_scores_perfect_texture() {
        let image = RgbImage::from_pixel(60, 60, Rgb([128, 128, 128]));
        let report = score(&image, &centered_face(60, 60, 10), &[], &MetricsConfig::default());
        assert_eq!(report.get(Metric::Spots), 100);
        assert_eq!(report.get(Metric::Texture), 100);
        assert_eq!(report.get(Metric::Wrinkles), 100);
        assert_eq!(report.get(Metric::Pores), 100);
        assert_eq!(report.get(Metric::Acne), 100);
        assert_eq!(report.get(Metric::Redness), 100);
        assert_eq!(report.get(Metric::Oiliness), 100);
        assert_eq!(report.get(Metric::SkinHealth), 100);
        assert_eq!(report.get(Metric::DarkCircles), 90);
        assert_eq!(report.get(Metric::EyeBags), 95);
        assert_eq!(report.get(Metric::Moisture), 50);
    }

    #[test]
    fn spot_and_acne_penalties() {
        let image = RgbImage::from_pixel(30, 30, Rgb([128, 128, 128]));
        let spots = [spot(SpotKind::Mole, 6), spot(SpotKind::Acne, 4), spot(SpotKind::Acne, 5)];
        let report = score(&image, &full_face(30, 30), &spots, &MetricsConfig::default());
        assert_eq!(report.get(Metric::Spots), 100 - (15 + 15));
        assert_eq!(report.get(Metric::Acne), 80);
    }

    #[test]
    fn spot_score_floors_at_zero() {
        let image = RgbImage::from_pixel(30, 30, Rgb([128, 128, 128]));
        let spots: Vec<_> = (0..20).map(|_| spot(SpotKind::Acne, 10)).collect();
        let report = score(&image, &full_face(30, 30), &spots, &MetricsConfig::default());
        assert_eq!(report.get(Metric::Spots), 0);
        assert_eq!(report.get(Metric::Acne), 0);
    }

    #[test]
    fn reddish_skin_lowers_redness_score() {
        // R - (G + B) / 2 = 60 → 100 - 120, floored.
        let image = RgbImage::from_pixel(30, 30, Rgb([200, 150, 130]));
        let report = score(&image, &full_face(30, 30), &[], &MetricsConfig::default());
        assert_eq!(report.get(Metric::Redness), 0);

        // Excess 20 → 60.
        let image = RgbImage::from_pixel(30, 30, Rgb([150, 130, 130]));
        let report = score(&image, &full_face(30, 30), &[], &MetricsConfig::default());
        assert_eq!(report.get(Metric::Redness), 60);
    }

    #[test]
    fn fractional_scores_truncate() {
        // Mean excess 0.2 → 100 - 0.4 = 99.6.
        let mut image = RgbImage::from_pixel(10, 1, Rgb([100, 100, 100]));
        image.put_pixel(3, 0, Rgb([101, 100, 100]));
        image.put_pixel(7, 0, Rgb([101, 100, 100]));
        let report = score(&image, &full_face(10, 1), &[], &MetricsConfig::default());
        assert_eq!(report.get(Metric::Redness), 99);
    }

    #[test]
    fn placeholder_estimates_round() {
        let config = MetricsConfig {
            dark_circles_factor: 0.997,
            eye_bags_factor: 0.904,
            ..MetricsConfig::default()
        };
        let image = RgbImage::from_pixel(60, 60, Rgb([128, 128, 128]));
        let report = score(&image, &centered_face(60, 60, 10), &[], &config);
        assert_eq!(report.get(Metric::SkinHealth), 100);
        assert_eq!(report.get(Metric::DarkCircles), 100);
        assert_eq!(report.get(Metric::EyeBags), 90);
    }

    #[test]
    fn pixels_outside_face_are_ignored() {
        let mut image = RgbImage::from_pixel(60, 60, Rgb([128, 128, 128]));
        // Strong red and checkerboard texture only outside the face.
        for y in 0..60 {
            for x in 0..8 {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                image.put_pixel(x, y, Rgb([255, v, v]));
            }
        }
        let report = score(&image, &centered_face(60, 60, 10), &[], &MetricsConfig::default());
        assert_eq!(report.get(Metric::Redness), 100);
        assert_eq!(report.get(Metric::Texture), 100);
        assert_eq!(report.get(Metric::Wrinkles), 100);
    }

    #[test]
    fn bright_patch_raises_oiliness_penalty() {
        let mut image = RgbImage::from_pixel(60, 60, Rgb([120, 120, 120]));
        for y in 20..30 {
            for x in 20..30 {
                image.put_pixel(x, y, Rgb([250, 250, 250]));
            }
        }
        let report = score(&image, &full_face(60, 60), &[], &MetricsConfig::default());
        // 100 of 3600 pixels above the 90th percentile → 27.7 points.
        assert_eq!(report.get(Metric::Oiliness), 72);
    }

    #[test]
    fn busy_texture_scores_low() {
        let mut image = RgbImage::new(60, 60);
        for (x, y, px) in image.enumerate_pixels_mut() {
            let v = if (x / 8 + y / 8) % 2 == 0 { 60 } else { 200 };
            *px = Rgb([v, v, v]);
        }
        let report = score(&image, &full_face(60, 60), &[], &MetricsConfig::default());
        assert_eq!(report.get(Metric::Texture), 0);
        assert!(report.get(Metric::Wrinkles) < 50);
    }

    #[test]
    fn isolated_bright_dots_count_as_pores() {
        let mut image = RgbImage::from_pixel(60, 60, Rgb([100, 100, 100]));
        for y in (12..48).step_by(6) {
            for x in (12..48).step_by(6) {
                image.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        let report = score(&image, &full_face(60, 60), &[], &MetricsConfig::default());
        assert!(report.get(Metric::Pores) < 100);
    }

    #[test]
    fn empty_face_defaults_to_perfect_area_metrics() {
        let image = RgbImage::from_pixel(20, 20, Rgb([200, 100, 100]));
        let face = FaceMask::from_raster(GrayImage::new(20, 20));
        let report = score(&image, &face, &[], &MetricsConfig::default());
        for metric in [
            Metric::Texture,
            Metric::Redness,
            Metric::Oiliness,
            Metric::Wrinkles,
            Metric::Pores,
        ] {
            assert_eq!(report.get(metric), 100, "{metric}");
        }
    }

    #[test]
    fn all_values_in_range() {
        let mut image = RgbImage::new(50, 50);
        for (x, y, px) in image.enumerate_pixels_mut() {
            *px = Rgb([(x * 5) as u8, (y * 5) as u8, ((x * y) % 256) as u8]);
        }
        let spots = [spot(SpotKind::Freckle, 2)];
        let report = score(&image, &centered_face(50, 50, 5), &spots, &MetricsConfig::default());
        for (_, v) in report.iter() {
            assert!(v <= 100);
        }
    }

    #[test]
    fn serializes_as_ordered_map() {
        let image = RgbImage::from_pixel(30, 30, Rgb([128, 128, 128]));
        let report = score(&image, &full_face(30, 30), &[], &MetricsConfig::default());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.starts_with(r#"{"Spots":100,"Texture":100"#), "{json}");
        assert!(json.contains(r#""Skin Health":100"#));
        assert!(json.ends_with(r#""Moisture":50}"#), "{json}");
    }
}
