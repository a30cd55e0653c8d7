//! Tunable numeric thresholds for every pipeline stage.
//!
//! Defaults reproduce the empirically tuned values. All structs deserialize
//! with `#[serde(default)]`, so a JSON file only needs the fields it changes:
//!
//! ```json
//! { "spots": { "classifier": { "mole": { "min_darkness": 100 } } } }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete configuration for one [`crate::SkinAnalyzer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub face_mask: FaceMaskConfig,
    pub skin: SkinConfig,
    pub spots: SpotConfig,
    pub metrics: MetricsConfig,
}

impl AnalysisConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the raster operations rely on.
    pub fn validate(&self) -> Result<()> {
        if self.face_mask.eyebrow_radius < 0 {
            return Err(Error::InvalidConfig("eyebrow_radius must be >= 0".into()));
        }
        for range in &self.face_mask.eyebrow_ranges {
            if range[0] > range[1] {
                return Err(Error::InvalidConfig(format!(
                    "eyebrow range {}..={} is empty",
                    range[0], range[1]
                )));
            }
        }
        let spots = &self.spots;
        if spots.clahe_tiles == 0 {
            return Err(Error::InvalidConfig("clahe_tiles must be > 0".into()));
        }
        if spots.clahe_clip_limit <= 0.0 {
            return Err(Error::InvalidConfig("clahe_clip_limit must be > 0".into()));
        }
        if spots.adaptive_block_size < 3 || spots.adaptive_block_size % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "adaptive_block_size must be odd and >= 3, got {}",
                spots.adaptive_block_size
            )));
        }
        if spots.min_area >= spots.max_area {
            return Err(Error::InvalidConfig(format!(
                "min_area {} must be below max_area {}",
                spots.min_area, spots.max_area
            )));
        }
        if !(0.0..=1.0).contains(&spots.overlay.alpha) {
            return Err(Error::InvalidConfig(format!(
                "overlay alpha must be within [0, 1], got {}",
                spots.overlay.alpha
            )));
        }
        if !(0.0..=100.0).contains(&self.metrics.oily_percentile) {
            return Err(Error::InvalidConfig(format!(
                "oily_percentile must be within [0, 100], got {}",
                self.metrics.oily_percentile
            )));
        }
        Ok(())
    }
}

/// Face-region mask construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceMaskConfig {
    /// Inclusive landmark index ranges, one per eyebrow. Points in these
    /// ranges are excluded from the hull and carve disks out of the mask.
    pub eyebrow_ranges: Vec<[usize; 2]>,
    /// Radius in pixels of the disk removed around each eyebrow landmark.
    pub eyebrow_radius: i32,
}

impl Default for FaceMaskConfig {
    fn default() -> Self {
        Self {
            eyebrow_ranges: vec![[46, 55], [276, 285]],
            eyebrow_radius: 15,
        }
    }
}

impl FaceMaskConfig {
    pub fn is_eyebrow(&self, idx: usize) -> bool {
        self.eyebrow_ranges
            .iter()
            .any(|r| (r[0]..=r[1]).contains(&idx))
    }
}

/// Skin-colour range filters, in OpenCV 8-bit channel scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    /// Inclusive lower bound on (H 0–180, S 0–255, V 0–255).
    pub hsv_lower: [u8; 3],
    pub hsv_upper: [u8; 3],
    /// Inclusive lower bound on (Y, Cr, Cb).
    pub ycrcb_lower: [u8; 3],
    pub ycrcb_upper: [u8; 3],
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            hsv_lower: [0, 20, 70],
            hsv_upper: [20, 255, 255],
            ycrcb_lower: [0, 135, 85],
            ycrcb_upper: [255, 180, 135],
        }
    }
}

/// Candidate extraction, classification and overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotConfig {
    /// CLAHE clip limit, relative to a flat histogram (`tile_area / 256`).
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid size along each axis.
    pub clahe_tiles: u32,
    /// Side of the square neighbourhood for the adaptive mean threshold.
    pub adaptive_block_size: u32,
    /// Constant subtracted from the neighbourhood mean.
    pub adaptive_offset: i32,
    /// Candidate border area must be strictly above this...
    pub min_area: f32,
    /// ...and strictly below this.
    pub max_area: f32,
    pub classifier: ClassifierConfig,
    pub overlay: OverlayConfig,
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            adaptive_block_size: 11,
            adaptive_offset: 2,
            min_area: 3.0,
            max_area: 500.0,
            classifier: ClassifierConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

/// Thresholds for the ordered classification rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub mole: MoleThresholds,
    pub freckle: FreckleThresholds,
    pub acne: AcneThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoleThresholds {
    pub min_darkness: i32,
    pub min_radius: u32,
    pub max_radius: u32,
    pub min_circularity: f32,
}

impl Default for MoleThresholds {
    fn default() -> Self {
        Self {
            min_darkness: 110,
            min_radius: 2,
            max_radius: 12,
            min_circularity: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreckleThresholds {
    pub min_darkness: i32,
    pub max_radius: u32,
    pub min_circularity: f32,
}

impl Default for FreckleThresholds {
    fn default() -> Self {
        Self {
            min_darkness: 50,
            max_radius: 4,
            min_circularity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcneThresholds {
    pub min_redness: i32,
    pub min_contrast: f32,
    pub min_radius: u32,
    pub max_radius: u32,
    pub min_circularity: f32,
}

impl Default for AcneThresholds {
    fn default() -> Self {
        Self {
            min_redness: 20,
            min_contrast: 30.0,
            min_radius: 3,
            max_radius: 8,
            min_circularity: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Blend weight of the tint at the centre of a footprint.
    pub alpha: f32,
    /// Draw type labels above labeled kinds.
    pub draw_labels: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alpha: 0.45,
            draw_labels: true,
        }
    }
}

/// Skin-health scoring constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Points deducted per detected spot (plus its radius).
    pub spot_penalty: i32,
    /// Points deducted per acne spot.
    pub acne_penalty: i32,
    /// Multiplier on the mean redness excess.
    pub redness_scale: f64,
    /// Percentile of masked luminance above which a pixel counts as oily.
    pub oily_percentile: f64,
    /// Multiplier turning a pixel fraction into score points.
    pub density_scale: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Top-hat response above which a pixel counts as a pore.
    pub tophat_threshold: u8,
    /// Erosion (pixels) of the face mask before sampling gradient-based
    /// metrics, so the mask's own edge is not scored as texture.
    pub interior_margin: u8,
    pub health_weights: HealthWeights,
    pub dark_circles_factor: f64,
    pub eye_bags_factor: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            spot_penalty: 5,
            acne_penalty: 10,
            redness_scale: 2.0,
            oily_percentile: 90.0,
            density_scale: 1000.0,
            canny_low: 50.0,
            canny_high: 150.0,
            tophat_threshold: 20,
            interior_margin: 4,
            health_weights: HealthWeights::default(),
            dark_circles_factor: 0.9,
            eye_bags_factor: 0.95,
        }
    }
}

/// Skin Health weights as integer percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthWeights {
    pub spots: u32,
    pub texture: u32,
    pub redness: u32,
    pub oiliness: u32,
    pub acne: u32,
    pub wrinkles: u32,
    pub pores: u32,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            spots: 15,
            texture: 15,
            redness: 10,
            oiliness: 10,
            acne: 20,
            wrinkles: 15,
            pores: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn default_health_weights_sum_to_100() {
        let w = HealthWeights::default();
        let sum = w.spots + w.texture + w.redness + w.oiliness + w.acne + w.wrinkles + w.pores;
        assert_eq!(sum, 100);
    }

    #[test]
    fn eyebrow_ranges_are_inclusive() {
        let cfg = FaceMaskConfig::default();
        assert!(cfg.is_eyebrow(46));
        assert!(cfg.is_eyebrow(55));
        assert!(cfg.is_eyebrow(280));
        assert!(!cfg.is_eyebrow(45));
        assert!(!cfg.is_eyebrow(56));
        assert!(!cfg.is_eyebrow(0));
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let json = r#"{ "spots": { "classifier": { "mole": { "min_darkness": 100 } } } }"#;
        let cfg: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.spots.classifier.mole.min_darkness, 100);
        assert_eq!(cfg.spots.classifier.mole.max_radius, 12);
        assert_eq!(cfg.spots.adaptive_block_size, 11);
        assert_eq!(cfg.face_mask, FaceMaskConfig::default());
    }

    #[test]
    fn rejects_even_block_size() {
        let mut cfg = AnalysisConfig::default();
        cfg.spots.adaptive_block_size = 10;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_area_bounds() {
        let mut cfg = AnalysisConfig::default();
        cfg.spots.min_area = 600.0;
        assert!(cfg.validate().is_err());
    }
}
