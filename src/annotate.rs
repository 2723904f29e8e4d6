use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

use crate::models::DetectionResult;

const DARK_GREEN: Rgb<u8> = Rgb([0, 120, 0]);
const NEON_GREEN: Rgb<u8> = Rgb([0, 255, 80]);
const CYAN: Rgb<u8> = Rgb([0, 255, 255]);

/// Grayscale copy of `img` with each normal cell ringed in green and each
/// infected cell marked with a cyan X.
pub fn render(img: &DynamicImage, result: &DetectionResult) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(img.to_luma8()).to_rgb8();

    for cell in &result.normal {
        let center = (cell.x.round() as i32, cell.y.round() as i32);
        let radius = cell.radius.round() as i32;
        // Darker outline just outside the bright ring
        draw_hollow_circle_mut(&mut canvas, center, radius + 1, DARK_GREEN);
        draw_hollow_circle_mut(&mut canvas, center, radius, NEON_GREEN);
    }

    for cell in &result.infected {
        let arm = (cell.radius * 0.25).max(5.0);
        let (x, y) = cell.center();
        for offset in [-1.0f32, 0.0, 1.0] {
            draw_line_segment_mut(
                &mut canvas,
                (x - arm + offset, y - arm),
                (x + arm + offset, y + arm),
                CYAN,
            );
            draw_line_segment_mut(
                &mut canvas,
                (x - arm + offset, y + arm),
                (x + arm + offset, y - arm),
                CYAN,
            );
        }
    }

    canvas
}
