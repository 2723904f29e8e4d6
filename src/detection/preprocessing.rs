use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::morphology::{close, open};

use crate::config::EdgeParams;
use crate::models::Mask;

/// Intermediate products of edge preprocessing, kept for stage dumps
#[derive(Debug, Clone)]
pub struct EdgeStages {
    pub grayscale: GrayImage,
    /// Gradient magnitude rescaled so the strongest edge is 255
    pub magnitude: GrayImage,
    /// Thresholded magnitude before morphology
    pub binary: Mask,
    /// Final mask after closing and opening
    pub mask: Mask,
}

/// Convert image to grayscale (Rec. 709 luminance weights)
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Sobel gradient magnitude per pixel, row-major
pub fn gradient_magnitude(gray: &GrayImage) -> Vec<f32> {
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    gx.as_raw()
        .iter()
        .zip(gy.as_raw())
        .map(|(&gx, &gy)| {
            let gx = gx as f32;
            let gy = gy as f32;
            (gx * gx + gy * gy).sqrt()
        })
        .collect()
}

/// Foreground where magnitude exceeds `ratio` times the image maximum.
/// A flat image has no maximum to speak of and yields an empty mask.
pub fn binarize(magnitude: &[f32], width: u32, height: u32, ratio: f32) -> Mask {
    let max = magnitude.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Mask::new(width, height);
    }
    let cutoff = max * ratio;
    Mask::from_fn(width, height, |x, y| {
        magnitude[(y * width + x) as usize] > cutoff
    })
}

/// Closing fills gaps in cell boundaries, opening then drops isolated specks
pub fn clean_mask(mask: &Mask, closing_radius: u8, opening_radius: u8) -> Mask {
    let mut image = mask.as_image().clone();
    if closing_radius > 0 {
        image = close(&image, Norm::L1, closing_radius);
    }
    if opening_radius > 0 {
        image = open(&image, Norm::L1, opening_radius);
    }
    Mask::from_image(&image)
}

/// Run every preprocessing stage and keep the intermediates
pub fn preprocess_stages(img: &DynamicImage, params: &EdgeParams) -> EdgeStages {
    let grayscale = to_grayscale(img);
    let (width, height) = grayscale.dimensions();
    let magnitude = gradient_magnitude(&grayscale);

    let binary = binarize(&magnitude, width, height, params.threshold_ratio);
    let mask = clean_mask(&binary, params.closing_radius, params.opening_radius);

    EdgeStages {
        magnitude: magnitude_image(&magnitude, width, height),
        grayscale,
        binary,
        mask,
    }
}

/// Cleaned binary edge mask of a color image
pub fn preprocess(img: &DynamicImage, params: &EdgeParams) -> Mask {
    preprocess_stages(img, params).mask
}

fn magnitude_image(magnitude: &[f32], width: u32, height: u32) -> GrayImage {
    let max = magnitude.iter().copied().fold(0.0f32, f32::max);
    let scale = if max > 0.0 { 255.0 / max } else { 0.0 };
    GrayImage::from_fn(width, height, |x, y| {
        let v = magnitude[(y * width + x) as usize] * scale;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}
