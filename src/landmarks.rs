//! Facial landmark contract consumed by the pipeline.
//!
//! Landmark inference itself lives outside this crate. A detector hands back
//! at most one face as a [`LandmarkSet`]: an index-stable list of normalized
//! points (index = mesh index, coordinates in `[0,1]×[0,1]`).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Point;

/// Number of points in the dense face-mesh format (indices 0..=467).
pub const MESH_LANDMARK_COUNT: usize = 468;

/// One face's landmarks in normalized image coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn num_landmarks(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, idx: usize) -> Option<&Point> {
        self.points.get(idx)
    }

    /// Iterate `(index, point)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Point)> {
        self.points.iter().enumerate()
    }

    /// Load a landmark set from a JSON file of the form `{"points": [{"x":..,"y":..}, ..]}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let set: Self = serde_json::from_reader(reader)?;
        set.validate()?;
        Ok(set)
    }

    /// Reject non-finite coordinates. Points outside `[0,1]` are allowed;
    /// detectors report landmarks slightly past the frame edge.
    pub fn validate(&self) -> Result<()> {
        if let Some((idx, p)) = self
            .iter()
            .find(|(_, p)| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(Error::InvalidLandmarks(format!(
                "landmark {} has non-finite coordinates ({}, {})",
                idx, p.x, p.y
            )));
        }
        Ok(())
    }
}

impl std::ops::Index<usize> for LandmarkSet {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

/// Pluggable facial landmark detection backend.
///
/// The pipeline receives a detector per call and never holds one globally.
/// Implementations that are not reentrant must be serialized by the caller.
pub trait LandmarkDetector: Send + Sync {
    /// Return the landmarks of the single most prominent face, or `None`.
    fn detect(&self, image: &RgbImage) -> Option<LandmarkSet>;
}

/// A detector that returns a fixed, pre-computed result for any image.
///
/// Useful when landmarks were produced out of process (for example loaded
/// from JSON next to the photo).
#[derive(Debug, Clone, Default)]
pub struct StaticLandmarks {
    landmarks: Option<LandmarkSet>,
}

impl StaticLandmarks {
    pub fn new(landmarks: Option<LandmarkSet>) -> Self {
        Self { landmarks }
    }

    pub fn none() -> Self {
        Self { landmarks: None }
    }
}

impl LandmarkDetector for StaticLandmarks {
    fn detect(&self, _image: &RgbImage) -> Option<LandmarkSet> {
        self.landmarks.clone()
    }
}
