//! Planar geometry over traced contours.

use imageproc::point::Point as PixelPoint;

use crate::types::Point;

/// Calculate the area of a polygon using the shoelace formula.
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = points.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }

    (area / 2.0).abs()
}

/// Shoelace area of a traced pixel border.
pub fn contour_area(points: &[PixelPoint<i32>]) -> f32 {
    let polygon: Vec<Point> = points
        .iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect();
    polygon_area(&polygon)
}

/// Length of the closed polyline through `points`.
pub fn closed_perimeter(points: &[PixelPoint<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    imageproc::geometry::arc_length(points, true)
}

/// `4π·area / perimeter²`; 1.0 for a disk, 0 when the perimeter is 0.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

/// A circle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

/// Relative slack on containment tests and the reported radius, so points
/// exactly on the circle stay inside despite rounding.
const CIRCLE_EPS: f64 = 1e-4;

impl Circle {
    fn contains(&self, p: [f64; 2]) -> bool {
        let dx = p[0] - self.cx;
        let dy = p[1] - self.cy;
        (dx * dx + dy * dy).sqrt() <= self.radius * (1.0 + CIRCLE_EPS) + CIRCLE_EPS
    }

    fn from_point(p: [f64; 2]) -> Self {
        Self {
            cx: p[0],
            cy: p[1],
            radius: 0.0,
        }
    }

    fn from_diameter(a: [f64; 2], b: [f64; 2]) -> Self {
        let cx = (a[0] + b[0]) / 2.0;
        let cy = (a[1] + b[1]) / 2.0;
        let radius = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt() / 2.0;
        Self { cx, cy, radius }
    }

    /// Circle through three points; falls back to the widest diameter
    /// circle when they are collinear.
    fn from_triangle(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Self {
        let bx = b[0] - a[0];
        let by = b[1] - a[1];
        let cx = c[0] - a[0];
        let cy = c[1] - a[1];
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < 1e-12 {
            let candidates = [
                Self::from_diameter(a, b),
                Self::from_diameter(a, c),
                Self::from_diameter(b, c),
            ];
            return candidates
                .into_iter()
                .fold(candidates[0], |best, c| if c.radius > best.radius { c } else { best });
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        Self {
            cx: a[0] + ux,
            cy: a[1] + uy,
            radius: (ux * ux + uy * uy).sqrt(),
        }
    }
}

/// Smallest circle enclosing every point, or `None` for an empty set.
///
/// Runs the incremental algorithm over the convex hull, which has the same
/// enclosing circle and far fewer points than a traced border. The reported
/// radius carries a small relative margin so integer truncation never
/// undershoots an exact integer radius.
pub fn min_enclosing_circle(points: &[PixelPoint<i32>]) -> Option<Circle> {
    if points.is_empty() {
        return None;
    }
    let hull = imageproc::geometry::convex_hull(points);
    let pts: Vec<[f64; 2]> = if hull.is_empty() {
        points.iter().map(|p| [p.x as f64, p.y as f64]).collect()
    } else {
        hull.iter().map(|p| [p.x as f64, p.y as f64]).collect()
    };

    let mut circle = Circle::from_point(pts[0]);
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle::from_point(pts[i]);
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::from_diameter(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = Circle::from_triangle(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    circle.radius *= 1.0 + CIRCLE_EPS;
    Some(circle)
}
