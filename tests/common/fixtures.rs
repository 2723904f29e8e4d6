use image::{DynamicImage, Rgb, RgbImage};
use malaria_scan::{ColorThreshold, Interval, Mask, PipelineParameters};

/// Color constants for synthetic smears
pub const PURPLE: Rgb<u8> = Rgb([128, 0, 128]);
pub const RED: Rgb<u8> = Rgb([220, 40, 40]);
pub const PINK: Rgb<u8> = Rgb([230, 120, 140]);
pub const PALE: Rgb<u8> = Rgb([240, 235, 235]);

/// A filled disk on a synthetic image
pub struct Disk {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub color: Rgb<u8>,
}

fn inside(x: u32, y: u32, cx: f32, cy: f32, radius: f32) -> bool {
    let dx = x as f32 - cx;
    let dy = y as f32 - cy;
    dx * dx + dy * dy <= radius * radius
}

/// Creates an RGB image of flat-colored disks on a flat background.
/// Later disks are painted over earlier ones.
pub fn smear(width: u32, height: u32, background: Rgb<u8>, disks: &[Disk]) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        disks
            .iter()
            .rev()
            .find(|d| inside(x, y, d.cx, d.cy, d.radius))
            .map(|d| d.color)
            .unwrap_or(background)
    });
    DynamicImage::ImageRgb8(img)
}

/// Creates a binary mask that is the union of the given disks
pub fn disks_mask(width: u32, height: u32, disks: &[(f32, f32, f32)]) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        disks.iter().any(|&(cx, cy, r)| inside(x, y, cx, cy, r))
    })
}

/// Parameters that also treat pink cell bodies as candidate normal cells
pub fn cell_params() -> PipelineParameters {
    PipelineParameters {
        cell_color: Some(ColorThreshold {
            hue: Interval::new(0.9, 1.0),
            saturation: Interval::new(0.3, 1.0),
            value: Interval::new(0.3, 1.0),
        }),
        ..PipelineParameters::default()
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
