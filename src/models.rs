use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::InvalidInputError;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Binary image: every pixel is either foreground (255) or background (0)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// All-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Build a mask from a per-pixel predicate
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([if f(x, y) { FOREGROUND } else { BACKGROUND }])
        });
        Self { image }
    }

    /// Any non-zero pixel becomes foreground
    pub fn from_image(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y)[0] > 0)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] == FOREGROUND
    }

    /// Number of foreground pixels
    pub fn count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v == FOREGROUND).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.image.as_raw().contains(&FOREGROUND)
    }

    /// Coordinates of every foreground pixel in row-major order
    pub fn foreground_pixels(&self) -> Vec<(u32, u32)> {
        self.image
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == FOREGROUND)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    pub fn union(&self, other: &Mask) -> Result<Mask, InvalidInputError> {
        self.combine(other, |a, b| a || b)
    }

    pub fn intersection(&self, other: &Mask) -> Result<Mask, InvalidInputError> {
        self.combine(other, |a, b| a && b)
    }

    /// Pixels set in `self` but not in `other`
    pub fn difference(&self, other: &Mask) -> Result<Mask, InvalidInputError> {
        self.combine(other, |a, b| a && !b)
    }

    /// Band of pixels straddling the foreground boundary: dilation minus erosion.
    ///
    /// Pixels beyond the frame are not treated as background, so a mask that
    /// covers the whole image has an empty outline.
    pub fn outline(&self) -> Mask {
        let grown = dilate(&self.image, Norm::L1, 1);
        let shrunk = erode(&self.image, Norm::L1, 1);
        Self::from_fn(self.width(), self.height(), |x, y| {
            grown.get_pixel(x, y)[0] > 0 && shrunk.get_pixel(x, y)[0] == 0
        })
    }

    fn combine(
        &self,
        other: &Mask,
        op: impl Fn(bool, bool) -> bool,
    ) -> Result<Mask, InvalidInputError> {
        if self.dimensions() != other.dimensions() {
            return Err(InvalidInputError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(Self::from_fn(self.width(), self.height(), |x, y| {
            op(self.get(x, y), other.get(x, y))
        }))
    }
}

/// Which population a detected cell belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellClass {
    Infected,
    Normal,
}

impl CellClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellClass::Infected => "infected",
            CellClass::Normal => "normal",
        }
    }
}

/// A circular cell detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub class: CellClass,
    /// Fraction of the circle covered by voting evidence, in [0, 1]
    pub score: f32,
}

impl Circle {
    pub fn center(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn distance_to(&self, other: &Circle) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Ranking used wherever detections are ordered: strongest first, then
    /// larger radius, then lower x, then lower y.
    pub fn rank(&self, other: &Circle) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.radius.total_cmp(&self.radius))
            .then_with(|| self.x.total_cmp(&other.x))
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

/// Final counts and coordinates of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub infected: Vec<Circle>,
    pub normal: Vec<Circle>,
    pub parasitemia_rate: f64,
}

impl DetectionResult {
    pub fn infected_count(&self) -> usize {
        self.infected.len()
    }

    pub fn normal_count(&self) -> usize {
        self.normal.len()
    }

    pub fn total_count(&self) -> usize {
        self.infected.len() + self.normal.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(width: u32, height: u32, cx: f32, cy: f32, r: f32) -> Mask {
        Mask::from_fn(width, height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            dx * dx + dy * dy <= r * r
        })
    }

    #[test]
    fn test_set_operations() {
        let a = Mask::from_fn(4, 1, |x, _| x < 2);
        let b = Mask::from_fn(4, 1, |x, _| x >= 1 && x < 3);

        assert_eq!(a.union(&b).unwrap().count(), 3);
        assert_eq!(a.intersection(&b).unwrap().count(), 1);
        let diff = a.difference(&b).unwrap();
        assert!(diff.get(0, 0));
        assert!(!diff.get(1, 0));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let a = Mask::new(4, 4);
        let b = Mask::new(4, 5);
        assert!(matches!(
            a.union(&b),
            Err(InvalidInputError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_outline_of_full_frame_is_empty() {
        let full = Mask::from_fn(20, 20, |_, _| true);
        assert!(full.outline().is_empty());
    }

    #[test]
    fn test_outline_surrounds_disk_boundary() {
        let mask = disk(60, 60, 30.0, 30.0, 15.0);
        let outline = mask.outline();

        assert!(!outline.is_empty());
        // Deep interior and far exterior are not part of the band
        assert!(!outline.get(30, 30));
        assert!(!outline.get(2, 2));
        for (x, y) in outline.foreground_pixels() {
            let d = ((x as f32 - 30.0).powi(2) + (y as f32 - 30.0).powi(2)).sqrt();
            assert!((d - 15.0).abs() < 2.0, "outline pixel ({x}, {y}) at distance {d}");
        }
    }

    #[test]
    fn test_rank_orders_by_score_then_radius_then_position() {
        let make = |x: f32, y: f32, radius: f32, score: f32| Circle {
            x,
            y,
            radius,
            class: CellClass::Normal,
            score,
        };
        let mut circles = vec![
            make(5.0, 0.0, 10.0, 0.5),
            make(1.0, 3.0, 12.0, 0.5),
            make(1.0, 2.0, 12.0, 0.5),
            make(9.0, 9.0, 8.0, 0.9),
        ];
        circles.sort_by(Circle::rank);

        assert_eq!(circles[0].score, 0.9);
        assert_eq!((circles[1].x, circles[1].y), (1.0, 2.0));
        assert_eq!((circles[2].x, circles[2].y), (1.0, 3.0));
        assert_eq!(circles[3].radius, 10.0);
    }
}
