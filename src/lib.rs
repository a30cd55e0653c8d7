//! # skin-analysis
//!
//! Pure Rust detection of skin irregularities in facial photos.
//!
//! This crate provides:
//! - **Face Masking**: face region from dense landmarks, with eyebrows removed
//! - **Skin Segmentation**: HSV and YCrCb colour gating inside the face
//! - **Spot Detection**: moles, freckles and acne from a dual threshold pass
//!   and an ordered, configurable rule cascade
//! - **Scoring**: eleven 0–100 skin-health metrics
//! - **Overlay**: a tinted, labeled composite for visual inspection
//!
//! Landmark inference is pluggable: implement [`LandmarkDetector`] for your
//! backend, or feed pre-computed landmarks through [`StaticLandmarks`].
//!
//! ## Algorithm Overview
//!
//! 1. Build a face mask from the convex hull of the landmarks
//! 2. Intersect it with HSV and YCrCb skin-colour ranges
//! 3. Equalize luminance (CLAHE) and threshold it twice (Otsu and local mean)
//! 4. Trace candidate blobs, measure their colour, and classify them
//! 5. Score the face region and render the composite
//!
//! ## Quick Start
//!
//! ```rust
//! use skin_analysis::{AnalysisConfig, LandmarkSet, Metric, Point, SkinAnalyzer, StaticLandmarks};
//! use image::{Rgb, RgbImage};
//!
//! let analyzer = SkinAnalyzer::new(AnalysisConfig::default()).unwrap();
//!
//! let image = RgbImage::from_pixel(120, 120, Rgb([235, 190, 165]));
//! let landmarks = LandmarkSet::new(vec![
//!     Point::new(0.2, 0.2),
//!     Point::new(0.8, 0.2),
//!     Point::new(0.8, 0.8),
//!     Point::new(0.2, 0.8),
//! ]);
//!
//! let result = analyzer
//!     .analyze(&image, &StaticLandmarks::new(Some(landmarks)))
//!     .unwrap();
//!
//! assert!(result.face_detected());
//! let metrics = result.metrics.unwrap();
//! println!("Skin Health: {}", metrics.get(Metric::SkinHealth));
//! ```
//!
//! ## Custom Rules
//!
//! Rules appended through the builder only see spots the built-in
//! Mole, Freckle and Acne rules did not claim:
//!
//! ```rust
//! use skin_analysis::{ClassificationRule, SkinAnalyzer, SpotKind};
//!
//! let analyzer = SkinAnalyzer::builder()
//!     .add_rule(ClassificationRule::new(SpotKind::Freckle, |f| {
//!         f.darkness > 30 && f.radius < 3
//!     }))
//!     .build()
//!     .unwrap();
//! # let _ = analyzer;
//! ```

pub mod color;
pub mod config;
mod error;
pub mod geometry;
pub mod landmarks;
pub mod mask;
pub mod metrics;
pub mod overlay;
mod pipeline;
pub mod raster;
pub mod skin;
pub mod spots;
mod types;

pub use config::{AnalysisConfig, MetricsConfig, OverlayConfig, SkinConfig, SpotConfig};
pub use error::{Error, Result};
pub use landmarks::{LandmarkDetector, LandmarkSet, StaticLandmarks, MESH_LANDMARK_COUNT};
pub use mask::FaceMask;
pub use metrics::{Metric, MetricsReport};
pub use pipeline::{validate_image, PipelineResult, SkinAnalyzer, SkinAnalyzerBuilder};
pub use spots::{ClassificationRule, RuleCascade, SpotFeatures};
pub use types::{count_by_kind, Point, Spot, SpotKind};
