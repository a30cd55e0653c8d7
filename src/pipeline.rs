//! End-to-end analysis of one photo.

use image::RgbImage;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::landmarks::{LandmarkDetector, LandmarkSet};
use crate::mask::FaceMask;
use crate::metrics::{self, Metric, MetricsReport};
use crate::skin::segment_skin;
use crate::spots::{detect_spots, ClassificationRule, RuleCascade};
use crate::types::{count_by_kind, Spot, SpotKind};

/// Output of one analysis run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Input with spot footprints and labels drawn on it; an unchanged copy
    /// when no face was found.
    pub composite_image: RgbImage,
    /// Classified spots in detection order.
    pub spots: Vec<Spot>,
    /// Scores, or `None` when no face was found.
    pub metrics: Option<MetricsReport>,
}

impl PipelineResult {
    fn no_face(image: &RgbImage) -> Self {
        Self {
            composite_image: image.clone(),
            spots: Vec::new(),
            metrics: None,
        }
    }

    pub fn face_detected(&self) -> bool {
        self.metrics.is_some()
    }

    pub fn count(&self, kind: SpotKind) -> usize {
        self.spots.iter().filter(|s| s.kind == kind).count()
    }
}

/// Runs face masking, skin segmentation, spot detection and scoring.
///
/// An analyzer holds only configuration and is safe to share across
/// threads; each call works on its own buffers.
#[derive(Debug)]
pub struct SkinAnalyzer {
    config: AnalysisConfig,
    cascade: RuleCascade,
}

impl SkinAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        SkinAnalyzerBuilder::new().config(config).build()
    }

    pub fn builder() -> SkinAnalyzerBuilder {
        SkinAnalyzerBuilder::new()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Detect landmarks with `detector`, then analyze.
    pub fn analyze<D>(&self, image: &RgbImage, detector: &D) -> Result<PipelineResult>
    where
        D: LandmarkDetector + ?Sized,
    {
        validate_image(image)?;
        let landmarks = detector.detect(image);
        self.analyze_with_landmarks(image, landmarks.as_ref())
    }

    /// Analyze with pre-computed landmarks; `None` means no face.
    pub fn analyze_with_landmarks(
        &self,
        image: &RgbImage,
        landmarks: Option<&LandmarkSet>,
    ) -> Result<PipelineResult> {
        validate_image(image)?;
        if let Some(set) = landmarks {
            set.validate()?;
        }

        let (width, height) = image.dimensions();
        let Some(face) = FaceMask::from_landmarks(width, height, landmarks, &self.config.face_mask)
        else {
            tracing::info!(width, height, "no face detected");
            return Ok(PipelineResult::no_face(image));
        };

        let skin = segment_skin(image, &face, &self.config.skin);
        let detection = detect_spots(image, &face, &skin, &self.config.spots, &self.cascade);
        let report = metrics::score(image, &face, &detection.spots, &self.config.metrics);

        let [(_, moles), (_, freckles), (_, acne)] = count_by_kind(&detection.spots);
        tracing::info!(
            width,
            height,
            face_pixels = face.pixel_count(),
            spots = detection.spots.len(),
            moles,
            freckles,
            acne,
            skin_health = report.get(Metric::SkinHealth),
            "analysis complete"
        );

        Ok(PipelineResult {
            composite_image: detection.overlay,
            spots: detection.spots,
            metrics: Some(report),
        })
    }
}

/// Builder for [`SkinAnalyzer`] with a custom rule cascade.
#[derive(Debug, Default)]
pub struct SkinAnalyzerBuilder {
    config: Option<AnalysisConfig>,
    extra_rules: Vec<ClassificationRule>,
}

impl SkinAnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Append a rule after the built-in Mole, Freckle and Acne rules.
    pub fn add_rule(mut self, rule: ClassificationRule) -> Self {
        self.extra_rules.push(rule);
        self
    }

    pub fn build(self) -> Result<SkinAnalyzer> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut cascade = RuleCascade::from_config(&config.spots.classifier);
        for rule in self.extra_rules {
            cascade.push(rule);
        }
        Ok(SkinAnalyzer { config, cascade })
    }
}

/// Reject images the raster stages cannot work on.
pub fn validate_image(image: &RgbImage) -> Result<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::StaticLandmarks;
    use crate::types::Point;
    use image::Rgb;

    const SKIN: Rgb<u8> = Rgb([235, 190, 165]);

    fn square_landmarks() -> LandmarkSet {
        LandmarkSet::new(vec![
            Point::new(0.1, 0.1),
            Point::new(0.9, 0.1),
            Point::new(0.9, 0.9),
            Point::new(0.1, 0.9),
        ])
    }

    #[test]
    fn empty_image_is_rejected() {
        let analyzer = SkinAnalyzer::new(AnalysisConfig::default()).unwrap();
        let image = RgbImage::new(0, 10);
        let err = analyzer.analyze_with_landmarks(&image, None).unwrap_err();
        assert!(matches!(err, Error::InvalidImage { width: 0, height: 10 }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.spots.clahe_tiles = 0;
        assert!(SkinAnalyzer::new(config).is_err());
    }

    #[test]
    fn non_finite_landmarks_are_rejected() {
        let analyzer = SkinAnalyzer::new(AnalysisConfig::default()).unwrap();
        let image = RgbImage::from_pixel(20, 20, SKIN);
        let set = LandmarkSet::new(vec![Point::new(f32::INFINITY, 0.5); 3]);
        assert!(matches!(
            analyzer.analyze_with_landmarks(&image, Some(&set)),
            Err(Error::InvalidLandmarks(_))
        ));
    }

    #[test]
    fn no_face_returns_input_unchanged() {
        let analyzer = SkinAnalyzer::new(AnalysisConfig::default()).unwrap();
        let image = RgbImage::from_fn(30, 30, |x, y| Rgb([x as u8, y as u8, 7]));
        let result = analyzer.analyze(&image, &StaticLandmarks::none()).unwrap();
        assert!(!result.face_detected());
        assert!(result.spots.is_empty());
        assert!(result.metrics.is_none());
        assert_eq!(result.composite_image, image);
    }

    #[test]
    fn clean_skin_has_no_spots() {
        let analyzer = SkinAnalyzer::new(AnalysisConfig::default()).unwrap();
        let image = RgbImage::from_pixel(80, 80, SKIN);
        let detector = StaticLandmarks::new(Some(square_landmarks()));
        let result = analyzer.analyze(&image, &detector).unwrap();
        assert!(result.face_detected());
        assert!(result.spots.is_empty());
        assert_eq!(result.composite_image, image);
        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.get(Metric::Spots), 100);
        assert_eq!(metrics.get(Metric::Acne), 100);
    }

    #[test]
    fn extra_rules_run_after_builtin_ones() {
        let analyzer = SkinAnalyzer::builder()
            .add_rule(ClassificationRule::new(SpotKind::Freckle, |_| true))
            .build()
            .unwrap();
        assert_eq!(analyzer.cascade.len(), 4);
        assert_eq!(analyzer.config(), &AnalysisConfig::default());
    }

    #[test]
    fn analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SkinAnalyzer>();
    }
}
