//! Face-region mask from landmarks.
//!
//! The mask is the filled convex hull of every non-eyebrow landmark, with a
//! disk carved out around each eyebrow landmark. Eyebrow hair is dark and
//! would otherwise dominate the darkness statistics downstream.

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point as PixelPoint;

use crate::config::FaceMaskConfig;
use crate::geometry;
use crate::landmarks::LandmarkSet;
use crate::raster::{self, ON};

/// Binary face-region raster, same size as the analysed image.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMask {
    mask: GrayImage,
}

impl FaceMask {
    /// Build the mask for a `width × height` image.
    ///
    /// Returns `None` (no face) when `landmarks` is absent or fewer than
    /// three non-eyebrow landmarks span a proper hull.
    pub fn from_landmarks(
        width: u32,
        height: u32,
        landmarks: Option<&LandmarkSet>,
        config: &FaceMaskConfig,
    ) -> Option<Self> {
        let landmarks = landmarks?;

        let (eyebrow, contour): (Vec<_>, Vec<_>) = landmarks
            .iter()
            .partition(|(idx, _)| config.is_eyebrow(*idx));

        let contour: Vec<PixelPoint<i32>> = contour
            .into_iter()
            .map(|(_, p)| {
                let (x, y) = p.to_pixel(width, height);
                PixelPoint::new(x, y)
            })
            .collect();
        if contour.len() < 3 {
            tracing::debug!(points = contour.len(), "too few contour landmarks for a hull");
            return None;
        }

        let hull = imageproc::geometry::convex_hull(contour.as_slice());
        if hull.len() < 3 || geometry::contour_area(&hull) <= 0.0 {
            tracing::debug!(vertices = hull.len(), "degenerate face hull");
            return None;
        }

        let mut mask = GrayImage::new(width, height);
        draw_polygon_mut(&mut mask, &hull, Luma([ON]));

        for (_, p) in eyebrow {
            let center = p.to_pixel(width, height);
            draw_filled_circle_mut(&mut mask, center, config.eyebrow_radius, Luma([0]));
        }

        Some(Self { mask })
    }

    /// Wrap an existing 0/255 raster.
    pub fn from_raster(mask: GrayImage) -> Self {
        Self { mask }
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.mask
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    /// Whether pixel `(x, y)` lies inside the face region.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        raster::is_set(&self.mask, x, y)
    }

    /// Number of face pixels.
    pub fn pixel_count(&self) -> usize {
        raster::count_set(&self.mask)
    }
}
