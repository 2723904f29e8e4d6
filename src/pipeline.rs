use image::{DynamicImage, GenericImageView};
use log::debug;
use std::path::{Path, PathBuf};

use crate::annotate;
use crate::config::PipelineParameters;
use crate::detection::{self, DetectionStages};
use crate::error::{ConfigurationError, InvalidInputError, Result, ScanError};
use crate::models::DetectionResult;

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for stage images
    pub output_dir: PathBuf,
}

/// Reject images the stages cannot work on: empty frames, images without
/// color channels, and float images holding NaN or infinity.
pub fn validate_input(img: &DynamicImage) -> std::result::Result<(), InvalidInputError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(InvalidInputError::Empty { width, height });
    }
    if !img.color().has_color() {
        return Err(InvalidInputError::NotColor(img.color()));
    }

    let non_finite = match img {
        DynamicImage::ImageRgb32F(buf) => buf
            .enumerate_pixels()
            .find(|(_, _, p)| p.0.iter().any(|v| !v.is_finite()))
            .map(|(x, y, _)| (x, y)),
        DynamicImage::ImageRgba32F(buf) => buf
            .enumerate_pixels()
            .find(|(_, _, p)| p.0.iter().any(|v| !v.is_finite()))
            .map(|(x, y, _)| (x, y)),
        _ => None,
    };
    if let Some((x, y)) = non_finite {
        return Err(InvalidInputError::NonFinite { x, y });
    }
    Ok(())
}

/// Blood-smear scanning pipeline with a fixed, validated parameter set
#[derive(Clone, Debug)]
pub struct Pipeline {
    params: PipelineParameters,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    /// Validate `params` and build a pipeline around them
    pub fn new(params: PipelineParameters) -> std::result::Result<Self, ConfigurationError> {
        params.validate()?;
        Ok(Self {
            params,
            debug: None,
        })
    }

    pub fn params(&self) -> &PipelineParameters {
        &self.params
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(ScanError::DebugDirNotEmpty(output_dir));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });

        Ok(self)
    }

    /// Scan one image
    pub fn run(&self, input: &DynamicImage) -> Result<DetectionResult> {
        Ok(self.run_stages(input, None)?.result)
    }

    /// Scan one image; stage images go to a sub-directory named `label`
    /// when debug mode is on
    pub fn run_labeled(&self, input: &DynamicImage, label: &str) -> Result<DetectionResult> {
        Ok(self.run_stages(input, Some(label))?.result)
    }

    /// Scan one image and keep every intermediate artifact
    pub fn run_stages(&self, input: &DynamicImage, label: Option<&str>) -> Result<DetectionStages> {
        validate_input(input)?;
        self.params.check_frame(input.width(), input.height())?;

        let stages = detection::detect(input, &self.params)?;

        if let Some(debug_config) = &self.debug {
            let dir = match label {
                Some(label) => debug_config.output_dir.join(label),
                None => debug_config.output_dir.clone(),
            };
            save_stage_images(&dir, input, &stages)?;
        }

        Ok(stages)
    }
}

/// Write the six stage visualisations of one run into `dir`
pub fn save_stage_images(
    dir: &Path,
    input: &DynamicImage,
    stages: &DetectionStages,
) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let images = [
        ("grayscale", DynamicImage::ImageLuma8(stages.edges.grayscale.clone())),
        ("edge_magnitude", DynamicImage::ImageLuma8(stages.edges.magnitude.clone())),
        ("edge_mask", DynamicImage::ImageLuma8(stages.edges.mask.as_image().clone())),
        (
            "infected_mask",
            DynamicImage::ImageLuma8(stages.classes.infected.as_image().clone()),
        ),
        ("normal_mask", DynamicImage::ImageLuma8(stages.classes.normal.as_image().clone())),
        ("annotated", DynamicImage::ImageRgb8(annotate::render(input, &stages.result))),
    ];

    for (idx, (name, image)) in images.iter().enumerate() {
        let path = dir.join(format!("{:02}_{}.png", idx + 1, name));
        image.save(&path)?;
    }
    debug!("saved {} stage images to {}", images.len(), dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, Rgb32FImage, RgbImage};

    #[test]
    fn test_rejects_empty_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        assert_eq!(
            validate_input(&img),
            Err(InvalidInputError::Empty { width: 0, height: 10 })
        );
    }

    #[test]
    fn test_rejects_grayscale_image() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        assert!(matches!(validate_input(&img), Err(InvalidInputError::NotColor(_))));
    }

    #[test]
    fn test_rejects_non_finite_pixels() {
        let mut buf = Rgb32FImage::from_pixel(4, 4, Rgb([0.2, 0.3, 0.4]));
        buf.put_pixel(2, 3, Rgb([f32::NAN, 0.0, 0.0]));
        let img = DynamicImage::ImageRgb32F(buf);
        assert_eq!(
            validate_input(&img),
            Err(InvalidInputError::NonFinite { x: 2, y: 3 })
        );
    }

    #[test]
    fn test_new_rejects_invalid_params() {
        let mut params = PipelineParameters::default();
        params.overlap_factor = 0.0;
        assert!(Pipeline::new(params).is_err());
    }

    #[test]
    fn test_debug_dir_must_be_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("stale.txt"), "x").unwrap();
        let pipeline = Pipeline::new(PipelineParameters::default()).unwrap();
        assert!(matches!(
            pipeline.with_debug(dir.path().to_path_buf()),
            Err(ScanError::DebugDirNotEmpty(_))
        ));
    }

    #[test]
    fn test_debug_mode_writes_six_stage_images() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("stages");
        let params = PipelineParameters {
            infected_radius: crate::config::RadiusRange::new(5, 6),
            normal_radius: crate::config::RadiusRange::new(5, 8),
            ..PipelineParameters::default()
        };
        let pipeline = Pipeline::new(params).unwrap().with_debug(out.clone()).unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([220, 40, 40])));

        pipeline.run_labeled(&img, "field").unwrap();

        let mut names: Vec<String> = std::fs::read_dir(out.join("field"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "01_grayscale.png",
                "02_edge_magnitude.png",
                "03_edge_mask.png",
                "04_infected_mask.png",
                "05_normal_mask.png",
                "06_annotated.png",
            ]
        );
    }

    #[test]
    fn test_unlabeled_run_writes_into_debug_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("stages");
        let params = PipelineParameters {
            infected_radius: crate::config::RadiusRange::new(5, 6),
            normal_radius: crate::config::RadiusRange::new(5, 8),
            ..PipelineParameters::default()
        };
        let pipeline = Pipeline::new(params).unwrap().with_debug(out.clone()).unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([220, 40, 40])));

        pipeline.run(&img).unwrap();

        assert!(out.join("01_grayscale.png").exists());
        assert!(out.join("06_annotated.png").exists());
    }
}
