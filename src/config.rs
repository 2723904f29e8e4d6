//! Pipeline parameters and their validation.
//!
//! Every threshold the detector uses lives here. Parameters are plain data:
//! they are validated once when a [`crate::Pipeline`] is built and read-only
//! afterwards. All sections use `#[serde(default)]`, so a JSON file only
//! needs to name the values it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ConfigurationError, ScanError};
use crate::models::CellClass;

/// Closed interval on one HSV channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f32,
    pub upper: f32,
}

impl Interval {
    pub const fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.lower && v <= self.upper
    }

    fn validate(&self, channel: &'static str) -> Result<(), ConfigurationError> {
        let in_unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.lower) || !in_unit(self.upper) {
            return Err(ConfigurationError::IntervalOutOfRange {
                channel,
                lower: self.lower,
                upper: self.upper,
            });
        }
        if self.lower > self.upper {
            return Err(ConfigurationError::InvertedInterval {
                channel,
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }
}

/// Per-channel HSV bounds; a pixel matches when all three channels match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorThreshold {
    pub hue: Interval,
    pub saturation: Interval,
    pub value: Interval,
}

impl ColorThreshold {
    /// Purple/blue parasite staining.
    pub const PARASITE: ColorThreshold = ColorThreshold {
        hue: Interval::new(0.55, 0.95),
        saturation: Interval::new(0.15, 1.0),
        value: Interval::new(0.1, 0.75),
    };

    pub fn matches(&self, hsv: [f32; 3]) -> bool {
        self.hue.contains(hsv[0])
            && self.saturation.contains(hsv[1])
            && self.value.contains(hsv[2])
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.hue.validate("hue")?;
        self.saturation.validate("saturation")?;
        self.value.validate("value")
    }
}

impl Default for ColorThreshold {
    fn default() -> Self {
        Self::PARASITE
    }
}

/// Inclusive range of circle radii (pixels) searched by the Hough detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusRange {
    pub min: u32,
    pub max: u32,
}

impl RadiusRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Number of radii in the range.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            ((self.max - self.min) as usize).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.min..=self.max
    }

    pub fn validate(&self, class: CellClass) -> Result<(), ConfigurationError> {
        if self.min == 0 || self.min > self.max {
            return Err(ConfigurationError::InvalidRadiusRange {
                class: class.as_str(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Bytes needed by a `u32` accumulator over a `width`x`height` frame.
    pub fn accumulator_bytes(&self, width: u32, height: u32) -> u64 {
        (width as u64 * height as u64)
            .saturating_mul(self.len() as u64)
            .saturating_mul(std::mem::size_of::<u32>() as u64)
    }
}

/// Edge preprocessing: Sobel magnitude threshold and mask cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeParams {
    /// Foreground when magnitude exceeds this fraction of the image maximum.
    pub threshold_ratio: f32,
    /// Closing radius (L1 structuring element); 0 disables closing.
    pub closing_radius: u8,
    /// Opening radius (L1 structuring element); 0 disables opening.
    pub opening_radius: u8,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            threshold_ratio: 0.05,
            closing_radius: 1,
            opening_radius: 1,
        }
    }
}

/// Hough peak extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Minimum fraction of a circle that must be covered by evidence.
    pub vote_threshold: f32,
    /// Half-width (pixels) of the spatial non-maximum window.
    pub peak_window: u32,
    /// Optional cap on candidates per class, applied after ranking.
    pub max_candidates: Option<usize>,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            vote_threshold: 0.35,
            peak_window: 2,
            max_candidates: None,
        }
    }
}

fn default_infected_radius() -> RadiusRange {
    RadiusRange::new(75, 80)
}

fn default_normal_radius() -> RadiusRange {
    RadiusRange::new(70, 100)
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParameters {
    pub edge: EdgeParams,
    /// Color of parasite-stained regions.
    pub infected_color: ColorThreshold,
    /// Optional color of cell bodies, unioned with the edge mask to form the
    /// candidate region for normal cells.
    pub cell_color: Option<ColorThreshold>,
    pub infected_radius: RadiusRange,
    pub normal_radius: RadiusRange,
    pub hough: HoughParams,
    /// Two circles overlap when their centers are closer than
    /// `(r_a + r_b) * overlap_factor`.
    pub overlap_factor: f32,
    /// Upper bound on a single Hough accumulator allocation.
    pub max_accumulator_bytes: u64,
}

impl Default for PipelineParameters {
    fn default() -> Self {
        Self {
            edge: EdgeParams::default(),
            infected_color: ColorThreshold::PARASITE,
            cell_color: None,
            infected_radius: default_infected_radius(),
            normal_radius: default_normal_radius(),
            hough: HoughParams::default(),
            overlap_factor: 0.5,
            max_accumulator_bytes: 512 * 1024 * 1024,
        }
    }
}

impl PipelineParameters {
    /// Radius range searched for the given class.
    pub fn radius_range(&self, class: CellClass) -> RadiusRange {
        match class {
            CellClass::Infected => self.infected_radius,
            CellClass::Normal => self.normal_radius,
        }
    }

    /// Check every field; image-independent.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let ratio = self.edge.threshold_ratio;
        if !ratio.is_finite() || !(0.0..1.0).contains(&ratio) {
            return Err(ConfigurationError::OutOfRange {
                name: "edge.threshold_ratio",
                value: ratio,
                expected: "0 <= ratio < 1",
            });
        }
        self.infected_color.validate()?;
        if let Some(cell) = &self.cell_color {
            cell.validate()?;
        }
        self.infected_radius.validate(CellClass::Infected)?;
        self.normal_radius.validate(CellClass::Normal)?;

        let vote = self.hough.vote_threshold;
        if !vote.is_finite() || vote <= 0.0 || vote > 1.0 {
            return Err(ConfigurationError::OutOfRange {
                name: "hough.vote_threshold",
                value: vote,
                expected: "0 < threshold <= 1",
            });
        }
        if !self.overlap_factor.is_finite() || self.overlap_factor <= 0.0 {
            return Err(ConfigurationError::OutOfRange {
                name: "overlap_factor",
                value: self.overlap_factor,
                expected: "factor > 0",
            });
        }
        // The smallest possible frame still has to fit one accumulator per class.
        for class in [CellClass::Infected, CellClass::Normal] {
            let range = self.radius_range(class);
            self.check_accumulator(class, range, 1, 1)?;
        }
        Ok(())
    }

    /// Check both class accumulators against the memory ceiling for a frame.
    pub fn check_frame(&self, width: u32, height: u32) -> Result<(), ConfigurationError> {
        for class in [CellClass::Infected, CellClass::Normal] {
            self.check_accumulator(class, self.radius_range(class), width, height)?;
        }
        Ok(())
    }

    fn check_accumulator(
        &self,
        class: CellClass,
        range: RadiusRange,
        width: u32,
        height: u32,
    ) -> Result<(), ConfigurationError> {
        let required = range.accumulator_bytes(width, height);
        if required > self.max_accumulator_bytes {
            return Err(ConfigurationError::AccumulatorTooLarge {
                class: class.as_str(),
                width,
                height,
                required,
                limit: self.max_accumulator_bytes,
            });
        }
        Ok(())
    }

    /// Load parameters from a JSON file and validate them.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let raw = fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&raw)?;
        params.validate()?;
        Ok(params)
    }

    /// Write parameters to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
