use image::DynamicImage;

use crate::config::ColorThreshold;
use crate::models::Mask;

/// RGB in [0, 1] to HSV with hue normalized to [0, 1)
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max } else { 0.0 };
    let hue = if delta <= 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    [hue, saturation, max]
}

/// Pixels whose hue, saturation and value all fall inside `threshold`
pub fn segment(img: &DynamicImage, threshold: &ColorThreshold) -> Mask {
    let rgb = img.to_rgb32f();
    Mask::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        threshold.matches(rgb_to_hsv(r, g, b))
    })
}
