use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
///
/// Landmarks use normalized `[0,1]` coordinates; contour geometry uses pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert a normalized point to integer pixel coordinates
    /// (`round(x * width)`, `round(y * height)`).
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        (
            (self.x * width as f32).round() as i32,
            (self.y * height as f32).round() as i32,
        )
    }
}

/// Category assigned to a detected skin irregularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpotKind {
    Mole,
    Freckle,
    Acne,
}

impl SpotKind {
    pub const ALL: [SpotKind; 3] = [SpotKind::Mole, SpotKind::Freckle, SpotKind::Acne];

    pub fn name(&self) -> &'static str {
        match self {
            SpotKind::Mole => "Mole",
            SpotKind::Freckle => "Freckle",
            SpotKind::Acne => "Acne",
        }
    }

    /// Whether the overlay draws a text label for this kind.
    ///
    /// Freckles are the most numerous kind and stay unlabeled.
    pub fn is_labeled(&self) -> bool {
        !matches!(self, SpotKind::Freckle)
    }

    /// Overlay tint (RGB).
    pub fn tint(&self) -> [u8; 3] {
        match self {
            SpotKind::Mole => [220, 40, 40],
            SpotKind::Freckle => [139, 90, 43],
            SpotKind::Acne => [255, 140, 0],
        }
    }
}

impl std::fmt::Display for SpotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified skin irregularity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spot {
    /// Sequential id in detection order, starting at 1.
    pub id: u32,
    /// Center of the minimal enclosing circle, in pixels.
    pub center: (i32, i32),
    /// Radius of the minimal enclosing circle, in pixels.
    pub radius: u32,
    #[serde(rename = "type")]
    pub kind: SpotKind,
    /// `255 - mean(R, G, B)` over the spot's region.
    pub darkness: u8,
    /// `R - (G + B) / 2` over the spot's region; positive is redder than neutral.
    pub redness: i32,
    /// `4π·area / perimeter²` of the traced border.
    pub circularity: f32,
}

/// Number of spots of each kind, in [`SpotKind::ALL`] order.
pub fn count_by_kind(spots: &[Spot]) -> [(SpotKind, usize); 3] {
    SpotKind::ALL.map(|kind| (kind, spots.iter().filter(|s| s.kind == kind).count()))
}
