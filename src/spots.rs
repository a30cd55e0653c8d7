//! Dark-spot candidate extraction and classification.
//!
//! ## Algorithm Overview
//!
//! 1. Take CIE L* of the image and equalize it with CLAHE
//! 2. Build two candidate rasters from the equalized channel, each clipped
//!    to the skin mask:
//!    - global: at or below the Otsu level
//!    - local: at or below the 11×11 neighbourhood mean minus 2
//! 3. Trace the outer border of every candidate blob; keep blobs whose
//!    border area lies strictly inside `(min_area, max_area)` and whose
//!    enclosing-circle centre is inside the face
//! 4. Measure colour statistics over the circle's bounding square
//! 5. Run the ordered rule cascade; unmatched blobs are dropped
//!
//! Both passes run independently, so one blemish can be reported once per
//! pass. Ids follow detection order: all global-pass spots first.

use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};

use crate::color;
use crate::config::{ClassifierConfig, SpotConfig};
use crate::geometry;
use crate::mask::FaceMask;
use crate::overlay;
use crate::raster;
use crate::types::{Spot, SpotKind};

/// Measurements a classification rule can look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotFeatures {
    /// `255 - mean(R, G, B)`, truncated, `0..=255`.
    pub darkness: i32,
    /// `R - (G + B) / 2`, truncated.
    pub redness: i32,
    /// Standard deviation of grayscale intensity over the region.
    pub contrast: f32,
    pub radius: u32,
    pub circularity: f32,
}

type Predicate = Box<dyn Fn(&SpotFeatures) -> bool + Send + Sync>;

/// One predicate → label entry of the cascade.
pub struct ClassificationRule {
    kind: SpotKind,
    predicate: Predicate,
}

impl ClassificationRule {
    pub fn new<F>(kind: SpotKind, predicate: F) -> Self
    where
        F: Fn(&SpotFeatures) -> bool + Send + Sync + 'static,
    {
        Self {
            kind,
            predicate: Box::new(predicate),
        }
    }

    pub fn kind(&self) -> SpotKind {
        self.kind
    }

    pub fn matches(&self, features: &SpotFeatures) -> bool {
        (self.predicate)(features)
    }
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Prioritized list of rules; the first match wins.
#[derive(Debug, Default)]
pub struct RuleCascade {
    rules: Vec<ClassificationRule>,
}

impl RuleCascade {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Mole, then Freckle, then Acne, with thresholds from `config`.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mole = config.mole.clone();
        let freckle = config.freckle.clone();
        let acne = config.acne.clone();

        Self::new()
            .with_rule(ClassificationRule::new(SpotKind::Mole, move |f| {
                f.darkness > mole.min_darkness
                    && f.radius > mole.min_radius
                    && f.radius < mole.max_radius
                    && f.circularity > mole.min_circularity
            }))
            .with_rule(ClassificationRule::new(SpotKind::Freckle, move |f| {
                f.darkness > freckle.min_darkness
                    && f.radius < freckle.max_radius
                    && f.circularity > freckle.min_circularity
            }))
            .with_rule(ClassificationRule::new(SpotKind::Acne, move |f| {
                f.redness > acne.min_redness
                    && f.contrast > acne.min_contrast
                    && f.radius > acne.min_radius
                    && f.radius < acne.max_radius
                    && f.circularity > acne.min_circularity
            }))
    }

    /// Append a rule with the lowest priority so far.
    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: ClassificationRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn classify(&self, features: &SpotFeatures) -> Option<SpotKind> {
        self.rules
            .iter()
            .find(|rule| rule.matches(features))
            .map(|rule| rule.kind)
    }
}

/// A candidate blob that passed the area and face checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub center: (i32, i32),
    pub radius: u32,
    pub circularity: f32,
}

/// Spots plus the annotated composite.
#[derive(Debug, Clone)]
pub struct SpotDetection {
    pub spots: Vec<Spot>,
    pub overlay: RgbImage,
}

/// Detect, classify and render skin irregularities.
pub fn detect_spots(
    image: &RgbImage,
    face: &FaceMask,
    skin: &GrayImage,
    config: &SpotConfig,
    cascade: &RuleCascade,
) -> SpotDetection {
    let lightness = color::lightness_channel(image);
    let equalized = raster::clahe(&lightness, config.clahe_clip_limit, config.clahe_tiles);

    let passes = [
        ("otsu", raster::and(&raster::otsu_inverted(&equalized), skin)),
        (
            "adaptive",
            raster::and(
                &raster::adaptive_mean_inverted(
                    &equalized,
                    config.adaptive_block_size,
                    config.adaptive_offset,
                ),
                skin,
            ),
        ),
    ];

    let gray = image::imageops::grayscale(image);
    let mut spots = Vec::new();
    for (name, candidates_raster) in &passes {
        let candidates = extract_candidates(candidates_raster, face, config);
        let before = spots.len();
        for candidate in &candidates {
            let Some(features) = measure(image, &gray, candidate) else {
                tracing::debug!(?candidate.center, "empty region, skipping candidate");
                continue;
            };
            if let Some(kind) = cascade.classify(&features) {
                spots.push(Spot {
                    id: spots.len() as u32 + 1,
                    center: candidate.center,
                    radius: candidate.radius,
                    kind,
                    darkness: features.darkness as u8,
                    redness: features.redness,
                    circularity: candidate.circularity,
                });
            }
        }
        tracing::debug!(
            pass = *name,
            candidates = candidates.len(),
            classified = spots.len() - before,
            "threshold pass"
        );
    }

    let overlay = overlay::render(image, &spots, &config.overlay);
    SpotDetection { spots, overlay }
}

/// Trace outer borders of `raster` and keep plausible spot candidates, in
/// tracing order.
pub fn extract_candidates(raster: &GrayImage, face: &FaceMask, config: &SpotConfig) -> Vec<Candidate> {
    let contours = find_contours::<i32>(raster);
    let mut out = Vec::new();
    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        let area = geometry::contour_area(&contour.points);
        if !(area > config.min_area && area < config.max_area) {
            continue;
        }
        let perimeter = geometry::closed_perimeter(&contour.points);
        let circularity = geometry::circularity(area as f64, perimeter) as f32;

        let Some(circle) = geometry::min_enclosing_circle(&contour.points) else {
            continue;
        };
        let center = (circle.cx as i32, circle.cy as i32);
        if !face.contains(center.0, center.1) {
            tracing::trace!(?center, "candidate centre outside face");
            continue;
        }
        out.push(Candidate {
            center,
            radius: circle.radius as u32,
            circularity,
        });
    }
    out
}

/// Colour statistics over the square `[c - r, c + r]²`, clipped to the image.
///
/// Returns `None` when the clipped square is empty.
pub fn measure(image: &RgbImage, gray: &GrayImage, candidate: &Candidate) -> Option<SpotFeatures> {
    let (w, h) = image.dimensions();
    let r = candidate.radius as i64;
    let (cx, cy) = (candidate.center.0 as i64, candidate.center.1 as i64);
    let x0 = (cx - r).max(0);
    let y0 = (cy - r).max(0);
    let x1 = (cx + r).min(w as i64 - 1);
    let y1 = (cy + r).min(h as i64 - 1);
    if x0 > x1 || y0 > y1 {
        return None;
    }

    let mut sum = [0.0f64; 3];
    let mut n = 0.0f64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let px = image.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                sum[c] += px[c] as f64;
            }
            n += 1.0;
        }
    }
    let [mr, mg, mb] = sum.map(|s| s / n);

    let intensities = (y0..=y1)
        .flat_map(|y| (x0..=x1).map(move |x| (x, y)))
        .map(|(x, y)| gray.get_pixel(x as u32, y as u32)[0] as f64);
    let (_, contrast) = raster::mean_std(intensities)?;

    let darkness = (255.0 - (mr + mg + mb) / 3.0).clamp(0.0, 255.0) as i32;
    let redness = (mr - (mg + mb) / 2.0) as i32;

    Some(SpotFeatures {
        darkness,
        redness,
        contrast: contrast as f32,
        radius: candidate.radius,
        circularity: candidate.circularity,
    })
}
